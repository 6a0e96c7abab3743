//! Fallback tabular artifact: delimited rows appended when the primary
//! store is unreachable.
//!
//! The file carries a header matching the store's columns; `key_topics`
//! is flattened into a semicolon-joined sub-list inside one field.
//! Appending (rather than truncating) keeps earlier degraded batches
//! around until someone replays them into the store.

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument};

use crate::errors::PipelineError;
use crate::store::ArticleRow;

pub const FALLBACK_FILE: &str = "articles_backup.csv";

const HEADER: &str =
    "id,title,summary,sentiment,sentiment_score,key_topics,market_impact,source_url,extracted_at";

/// Durable fail-safe sink for article rows.
#[derive(Debug, Clone)]
pub struct FallbackStore {
    path: PathBuf,
}

impl FallbackStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(FALLBACK_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append the batch, writing the header first if the file is new.
    #[instrument(level = "info", skip_all, fields(path = %self.path.display(), rows = rows.len()))]
    pub async fn append(&self, rows: &[ArticleRow]) -> Result<PathBuf, PipelineError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let is_new = !fs::try_exists(&self.path).await.unwrap_or(false);

        let mut out = String::new();
        if is_new {
            out.push_str(HEADER);
            out.push('\n');
        }
        for row in rows {
            out.push_str(&encode_row(row));
            out.push('\n');
        }

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(out.as_bytes()).await?;
        file.flush().await?;

        info!(rows = rows.len(), new_file = is_new, "Appended batch to fallback store");
        Ok(self.path.clone())
    }
}

fn encode_row(row: &ArticleRow) -> String {
    [
        escape(&row.id),
        escape(&row.title),
        escape(&row.summary),
        escape(row.sentiment.as_str()),
        format!("{}", row.sentiment_score),
        escape(&row.key_topics.join(";")),
        escape(row.market_impact.as_str()),
        escape(&row.source_url),
        escape(&row.extracted_at.to_rfc3339()),
    ]
    .join(",")
}

/// Minimal CSV quoting: wrap in double quotes when the field contains a
/// delimiter, quote, or newline; inner quotes are doubled.
fn escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MarketImpact, Sentiment};
    use chrono::Utc;

    fn row(id: &str, title: &str) -> ArticleRow {
        ArticleRow {
            id: id.to_string(),
            title: title.to_string(),
            summary: "Summary text.".to_string(),
            sentiment: Sentiment::Negative,
            sentiment_score: -0.5,
            key_topics: vec!["energy".to_string(), "climate policy".to_string()],
            market_impact: MarketImpact::Bearish,
            source_url: "https://example.com/a".to_string(),
            extracted_at: Utc::now(),
        }
    }

    #[test]
    fn test_escape_quotes_and_commas() {
        assert_eq!(escape("plain"), "plain");
        assert_eq!(escape("a,b"), "\"a,b\"");
        assert_eq!(escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_encode_row_joins_topics_with_semicolons() {
        let encoded = encode_row(&row("id1", "Title"));
        assert!(encoded.contains("energy;climate policy"));
        assert!(encoded.contains("bearish"));
        assert!(encoded.contains("-0.5"));
    }

    #[tokio::test]
    async fn test_append_writes_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = FallbackStore::new(dir.path());

        store.append(&[row("a", "One")]).await.unwrap();
        store.append(&[row("b", "Two"), row("c", "Three")]).await.unwrap();

        let content = tokio::fs::read_to_string(store.path()).await.unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 4); // header + 3 rows
        assert_eq!(lines[0], HEADER);
        assert_eq!(content.matches("id,title").count(), 1);
    }

    #[tokio::test]
    async fn test_append_one_row_per_article() {
        let dir = tempfile::tempdir().unwrap();
        let store = FallbackStore::new(dir.path());
        let rows: Vec<ArticleRow> = (0..5).map(|i| row(&format!("id{i}"), "T")).collect();

        store.append(&rows).await.unwrap();

        let content = tokio::fs::read_to_string(store.path()).await.unwrap();
        assert_eq!(content.lines().count(), 6);
    }

    #[tokio::test]
    async fn test_titles_with_commas_survive() {
        let dir = tempfile::tempdir().unwrap();
        let store = FallbackStore::new(dir.path());
        store
            .append(&[row("a", "Stocks, Bonds, and a \"Caution\" Signal")])
            .await
            .unwrap();
        let content = tokio::fs::read_to_string(store.path()).await.unwrap();
        assert!(content.contains("\"Stocks, Bonds, and a \"\"Caution\"\" Signal\""));
    }
}
