//! Structured-data artifact: the ordered article records as JSON.
//!
//! A top-level object with the records under `articles` plus a
//! `generated_at` timestamp. Written by the Structurer before it
//! returns, read back for standalone `load` runs.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{info, instrument};

use crate::errors::PipelineError;
use crate::models::ArticleSet;

pub const STRUCTURED_FILE: &str = "structured_articles.json";

/// Write the structured-data artifact under `data_dir`.
#[instrument(level = "info", skip_all, fields(data_dir = %data_dir.display()))]
pub async fn write_article_set(
    set: &ArticleSet,
    data_dir: &Path,
) -> Result<PathBuf, PipelineError> {
    fs::create_dir_all(data_dir).await?;
    let json = serde_json::to_string_pretty(set).map_err(std::io::Error::other)?;
    let path = data_dir.join(STRUCTURED_FILE);
    fs::write(&path, json).await?;
    info!(
        path = %path.display(),
        articles = set.articles.len(),
        "Wrote structured-data artifact"
    );
    Ok(path)
}

/// Read the last structured-data artifact back.
///
/// A missing file is an I/O error; a present-but-unparsable file is a
/// caller problem (`InvalidInput`), since `load` must not guess at
/// half-valid records.
#[instrument(level = "info", skip_all, fields(data_dir = %data_dir.display()))]
pub async fn read_article_set(data_dir: &Path) -> Result<ArticleSet, PipelineError> {
    let path = data_dir.join(STRUCTURED_FILE);
    let json = fs::read_to_string(&path).await?;
    let set: ArticleSet = serde_json::from_str(&json).map_err(|e| {
        PipelineError::InvalidInput(format!(
            "structured artifact {} is not parsable: {e}",
            path.display()
        ))
    })?;
    info!(path = %path.display(), articles = set.articles.len(), "Read structured-data artifact");
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MarketImpact, Sentiment, StructuredArticle};
    use chrono::Utc;

    fn article(id: &str) -> StructuredArticle {
        StructuredArticle {
            id: id.to_string(),
            title: "Fed Signals Caution".to_string(),
            summary: "Officials indicated a measured approach to rate changes.".to_string(),
            sentiment: Sentiment::Neutral,
            sentiment_score: 0.1,
            key_topics: vec!["federal reserve".to_string(), "interest rates".to_string()],
            market_impact: MarketImpact::Mixed,
            source_url: "https://www.wsj.com/articles/sample-fed-rates".to_string(),
            extracted_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_article_set_artifact_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let set = ArticleSet::new(vec![article("aaaa000011112222"), article("bbbb000011112222")]);

        write_article_set(&set, dir.path()).await.unwrap();
        let read_back = read_article_set(dir.path()).await.unwrap();

        // field-for-field equality, order preserved
        assert_eq!(read_back.articles, set.articles);
    }

    #[tokio::test]
    async fn test_corrupt_artifact_is_invalid_input() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join(STRUCTURED_FILE), "{not json")
            .await
            .unwrap();
        let err = read_article_set(dir.path()).await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));
    }
}
