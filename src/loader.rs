//! Loading stage: idempotent upsert into the primary store, with the
//! fallback CSV artifact as the degraded path.
//!
//! Store unavailability is a degraded success, never a failure: the
//! batch lands in the fallback store and the report says so. The only
//! fatal condition is malformed input, meaning the same `id` appearing
//! twice with conflicting non-key data; callers must resolve the
//! conflict before calling `load`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Instant;

use tracing::{info, instrument, warn};

use crate::errors::PipelineError;
use crate::models::{StageOutcome, StructuredArticle};
use crate::outputs::csv::FallbackStore;
use crate::store::{ArticleRow, ArticleStore};

/// Outcome of one `load` call.
#[derive(Debug)]
pub struct LoadReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub mode: StageOutcome,
    /// Set when the fallback path was used.
    pub fallback_path: Option<PathBuf>,
}

/// Convert articles to tabular rows, collapsing byte-identical
/// duplicates and rejecting conflicting ones.
///
/// Two records with the same `id` but different non-key data mean the
/// caller handed over an unresolved conflict; silently picking a winner
/// would hide a structuring bug, so that is `InvalidInput`.
pub fn to_rows(articles: &[StructuredArticle]) -> Result<Vec<ArticleRow>, PipelineError> {
    let mut rows: Vec<ArticleRow> = Vec::with_capacity(articles.len());
    let mut seen: HashMap<String, usize> = HashMap::new();

    for article in articles {
        let row = ArticleRow::from(article);
        match seen.get(&row.id) {
            None => {
                seen.insert(row.id.clone(), rows.len());
                rows.push(row);
            }
            Some(&existing) => {
                if rows[existing] == row {
                    // exact re-occurrence; collapse
                    continue;
                }
                return Err(PipelineError::InvalidInput(format!(
                    "duplicate id {} with conflicting data",
                    row.id
                )));
            }
        }
    }
    Ok(rows)
}

/// Load the batch: primary upsert, or fallback CSV append.
///
/// `store` is `None` when credentials are absent or the run is offline;
/// the batch then goes straight to the fallback store. A reachable
/// store receives the whole batch as one upsert keyed by `id`.
#[instrument(level = "info", skip_all, fields(articles = articles.len()))]
pub async fn load(
    store: Option<&dyn ArticleStore>,
    fallback: &FallbackStore,
    articles: &[StructuredArticle],
) -> Result<LoadReport, PipelineError> {
    let t0 = Instant::now();
    let rows = to_rows(articles)?;
    let attempted = rows.len();

    if let Some(store) = store {
        match store.upsert(&rows).await {
            Ok(succeeded) => {
                info!(
                    attempted,
                    succeeded,
                    elapsed_ms = t0.elapsed().as_millis(),
                    "Loaded batch into primary store"
                );
                return Ok(LoadReport {
                    attempted,
                    succeeded,
                    mode: StageOutcome::Primary,
                    fallback_path: None,
                });
            }
            Err(e) => {
                warn!(error = %e, "Primary store unavailable; writing fallback artifact");
            }
        }
    } else {
        info!("No primary store configured; writing fallback artifact");
    }

    let path = fallback.append(&rows).await?;
    info!(
        attempted,
        path = %path.display(),
        elapsed_ms = t0.elapsed().as_millis(),
        "Loaded batch into fallback store"
    );
    Ok(LoadReport {
        attempted,
        succeeded: attempted,
        mode: StageOutcome::Fallback,
        fallback_path: Some(path),
    })
}
