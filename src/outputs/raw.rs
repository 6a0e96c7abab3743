//! Raw-text artifact: the collected article blob.
//!
//! The blob is plain UTF-8 with one `=== ARTICLE n ===` marker per
//! segment, followed by `TITLE:` / `URL:` / `SCRAPED:` provenance lines
//! and the article body. Writing it is a Collector side effect, so
//! later stages never need to re-fetch.

use std::path::{Path, PathBuf};

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::fs;
use tracing::{info, instrument};

use crate::errors::PipelineError;
use crate::models::RawBatch;

pub const RAW_BLOB_FILE: &str = "raw_blob.txt";

static URL_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^URL:\s*(\S+)\s*$").unwrap());

/// Write the raw blob artifact under `data_dir`.
#[instrument(level = "info", skip_all, fields(data_dir = %data_dir.display()))]
pub async fn write_raw_blob(batch: &RawBatch, data_dir: &Path) -> Result<PathBuf, PipelineError> {
    fs::create_dir_all(data_dir).await?;
    let path = data_dir.join(RAW_BLOB_FILE);
    fs::write(&path, &batch.text).await?;
    info!(path = %path.display(), bytes = batch.text.len(), "Wrote raw blob artifact");
    Ok(path)
}

/// Rebuild a [`RawBatch`] from the last raw blob artifact.
///
/// Sources are recovered from the blob's `URL:` provenance lines. The
/// collection timestamp of the original run is not stored in the blob,
/// so the rebuilt batch is stamped with the read time; `extracted_at`
/// monotonicity is preserved relative to that stamp.
#[instrument(level = "info", skip_all, fields(data_dir = %data_dir.display()))]
pub async fn read_raw_batch(data_dir: &Path) -> Result<RawBatch, PipelineError> {
    let path = data_dir.join(RAW_BLOB_FILE);
    let text = fs::read_to_string(&path).await?;
    let sources = URL_LINE
        .captures_iter(&text)
        .map(|c| c[1].to_string())
        .collect::<Vec<_>>();
    info!(path = %path.display(), sources = sources.len(), "Read raw blob artifact");
    Ok(RawBatch {
        text,
        sources,
        collected_at: Utc::now(),
    })
}
