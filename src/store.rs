//! Primary store: keyed upsert over a PostgREST-style API.
//!
//! The store is a remote table keyed by `id`; `created_at`/`updated_at`
//! are server-managed. The [`ArticleStore`] trait is the seam between
//! the Loader and the wire, so upsert semantics can be tested against
//! an in-memory implementation without a network.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::config::StoreConfig;
use crate::errors::PipelineError;
use crate::models::{MarketImpact, Sentiment, StructuredArticle};

/// One tabular row, flattened for the store.
///
/// `key_topics` stays an array; PostgREST maps a JSON array onto a
/// `text[]` column. The CSV fallback flattens it further on write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleRow {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub sentiment: Sentiment,
    pub sentiment_score: f64,
    pub key_topics: Vec<String>,
    pub market_impact: MarketImpact,
    pub source_url: String,
    pub extracted_at: DateTime<Utc>,
}

impl From<&StructuredArticle> for ArticleRow {
    fn from(a: &StructuredArticle) -> Self {
        Self {
            id: a.id.clone(),
            title: a.title.clone(),
            summary: a.summary.clone(),
            sentiment: a.sentiment,
            sentiment_score: a.sentiment_score,
            key_topics: a.key_topics.clone(),
            market_impact: a.market_impact,
            source_url: a.source_url.clone(),
            extracted_at: a.extracted_at,
        }
    }
}

/// Keyed upsert sink for article rows.
///
/// Implementations write the whole batch in one operation: rows whose
/// `id` already exists have their non-key fields overwritten, others
/// are inserted. Errors mean the store is unreachable, never that a
/// subset of rows was written.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Upsert the batch; returns the number of rows written.
    async fn upsert(&self, rows: &[ArticleRow]) -> Result<usize, PipelineError>;
}

/// PostgREST client for a Supabase-hosted table.
pub struct SupabaseStore {
    http: reqwest::Client,
    config: StoreConfig,
}

impl SupabaseStore {
    pub fn new(config: StoreConfig) -> Result<Self, PipelineError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("market_news_etl/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(4))
            .timeout(config.timeout)
            .build()
            .map_err(|e| PipelineError::StoreUnavailable(e.to_string()))?;
        Ok(Self { http, config })
    }
}

#[async_trait]
impl ArticleStore for SupabaseStore {
    /// Single batched request: `POST /rest/v1/<table>?on_conflict=id`
    /// with `Prefer: resolution=merge-duplicates`, which is PostgREST's
    /// insert-or-update by primary key.
    #[instrument(level = "info", skip_all, fields(table = %self.config.table, rows = rows.len()))]
    async fn upsert(&self, rows: &[ArticleRow]) -> Result<usize, PipelineError> {
        if rows.is_empty() {
            return Ok(0);
        }
        let t0 = Instant::now();
        let url = format!(
            "{}/rest/v1/{}?on_conflict=id",
            self.config.url, self.config.table
        );

        let response = self
            .http
            .post(&url)
            .header("apikey", &self.config.key)
            .bearer_auth(&self.config.key)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(rows)
            .send()
            .await
            .map_err(|e| PipelineError::StoreUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, elapsed_ms = t0.elapsed().as_millis(), "Upsert rejected by store");
            return Err(PipelineError::StoreUnavailable(format!(
                "status {status}: {}",
                crate::utils::truncate_for_log(&body, 200)
            )));
        }

        info!(
            rows = rows.len(),
            elapsed_ms = t0.elapsed().as_millis(),
            "Upserted batch into primary store"
        );
        Ok(rows.len())
    }
}

/// In-memory store used by tests to assert upsert semantics.
#[cfg(test)]
pub struct MemoryStore {
    pub rows: std::sync::Mutex<std::collections::HashMap<String, ArticleRow>>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        Self {
            rows: std::sync::Mutex::new(std::collections::HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn get(&self, id: &str) -> Option<ArticleRow> {
        self.rows.lock().unwrap().get(id).cloned()
    }
}

#[cfg(test)]
#[async_trait]
impl ArticleStore for MemoryStore {
    async fn upsert(&self, rows: &[ArticleRow]) -> Result<usize, PipelineError> {
        let mut map = self.rows.lock().unwrap();
        for row in rows {
            map.insert(row.id.clone(), row.clone());
        }
        Ok(rows.len())
    }
}

/// A store that is always unreachable; used by tests to force the
/// Loader's fallback path.
#[cfg(test)]
pub struct UnreachableStore;

#[cfg(test)]
#[async_trait]
impl ArticleStore for UnreachableStore {
    async fn upsert(&self, _rows: &[ArticleRow]) -> Result<usize, PipelineError> {
        Err(PipelineError::StoreUnavailable("connection refused".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, score: f64) -> ArticleRow {
        ArticleRow {
            id: id.to_string(),
            title: "Title".to_string(),
            summary: "Summary".to_string(),
            sentiment: Sentiment::Positive,
            sentiment_score: score,
            key_topics: vec!["markets".to_string()],
            market_impact: MarketImpact::Bullish,
            source_url: "https://example.com/a".to_string(),
            extracted_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_memory_store_upsert_overwrites_by_id() {
        let store = MemoryStore::new();
        store.upsert(&[row("a", 0.4), row("b", 0.5)]).await.unwrap();
        store.upsert(&[row("a", 0.9)]).await.unwrap();

        assert_eq!(store.len(), 2);
        let updated = store.get("a").unwrap();
        assert_eq!(updated.sentiment_score, 0.9);
    }

    #[test]
    fn test_row_serializes_store_columns() {
        let json = serde_json::to_value(row("abc", 0.4)).unwrap();
        assert_eq!(json["id"], "abc");
        assert_eq!(json["sentiment"], "positive");
        assert_eq!(json["market_impact"], "bullish");
        assert!(json["key_topics"].is_array());
    }
}
