//! Structuring stage: raw text blob in, validated sentiment records out.
//!
//! The batch is partitioned into per-article segments, each segment is
//! submitted to the structuring service, and the raw attempt is parsed
//! and pushed through a repair pass. Every segment yields exactly one
//! record, accepted or heuristic when the service is unavailable,
//! unless the repair pass rejects it as unrepairable (empty title or
//! summary), in which case that single record is logged and dropped.
//!
//! The repair pass is a pure function over the raw attempt, so it can
//! be unit-tested without the network.
//!
//! Segments may be structured concurrently, but results are returned in
//! source order: downstream consumers rely on list order matching
//! article appearance order.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::api::StructureAsync;
use crate::errors::PipelineError;
use crate::models::{
    ArticleSet, MarketImpact, RawBatch, Sentiment, StageOutcome, StructuredArticle,
    MAX_SUMMARY_CHARS,
};
use crate::outputs::json;
use crate::utils::{article_id, first_line, looks_truncated, truncate_chars, truncate_for_log};

/// Bounded worker pool for per-segment structuring calls. Results are
/// re-ordered back into source order by the order-preserving stream.
const STRUCTURE_CONCURRENCY: usize = 4;

/// Character bound for heuristic summaries.
const HEURISTIC_SUMMARY_CHARS: usize = 500;

static ARTICLE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^=== ARTICLE \d+ ===[ \t]*$").unwrap());

/// Two or more consecutive blank lines; the boundary heuristic for
/// marker-less input.
static BLANK_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n[ \t]*\n(?:[ \t]*\n)+").unwrap());

/// One article segment plus its positionally inferred source URL.
#[derive(Debug, Clone)]
pub struct Segment {
    pub text: String,
    pub source_url: String,
}

/// Partition the batch text into per-article segments.
///
/// Splits on `=== ARTICLE n ===` markers when present, otherwise on
/// runs of blank lines. Source URLs are matched positionally against
/// the batch's sources; on a count mismatch every segment gets the
/// `"unknown"` placeholder.
pub fn split_segments(batch: &RawBatch) -> Vec<Segment> {
    let chunks: Vec<String> = if ARTICLE_MARKER.is_match(&batch.text) {
        ARTICLE_MARKER
            .split(&batch.text)
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(String::from)
            .collect()
    } else {
        BLANK_RUN
            .split(&batch.text)
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(String::from)
            .collect()
    };

    let positional = chunks.len() == batch.sources.len();
    if !positional && !chunks.is_empty() {
        warn!(
            segments = chunks.len(),
            sources = batch.sources.len(),
            "Segment/source count mismatch; using placeholder sources"
        );
    }

    chunks
        .into_iter()
        .enumerate()
        .map(|(i, text)| Segment {
            text,
            source_url: if positional {
                batch.sources[i].clone()
            } else {
                "unknown".to_string()
            },
        })
        .collect()
}

/// A raw schema attempt as returned by the structuring service. Every
/// field is optional; the repair pass decides what survives.
#[derive(Debug, Default, Deserialize)]
pub struct RawAttempt {
    pub id: Option<String>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub sentiment: Option<String>,
    pub sentiment_score: Option<f64>,
    pub key_topics: Option<Vec<String>>,
    pub market_impact: Option<String>,
    pub source_url: Option<String>,
    pub extracted_at: Option<String>,
}

/// Parse the service output into a [`RawAttempt`].
///
/// Markdown code fences are stripped; a top-level `{"articles": [...]}`
/// wrapper (the whole-blob shape) is unwrapped to its first element.
pub fn parse_attempt(raw: &str) -> Result<RawAttempt, serde_json::Error> {
    let cleaned = strip_fences(raw);
    let value: serde_json::Value = serde_json::from_str(cleaned)?;
    let object = match value.get("articles").and_then(|a| a.as_array()) {
        Some(list) if !list.is_empty() => list[0].clone(),
        _ => value,
    };
    serde_json::from_value(object)
}

fn strip_fences(raw: &str) -> &str {
    let mut s = raw.trim();
    if let Some(rest) = s.strip_prefix("```json") {
        s = rest;
    } else if let Some(rest) = s.strip_prefix("```") {
        s = rest;
    }
    if let Some(rest) = s.strip_suffix("```") {
        s = rest;
    }
    s.trim()
}

fn sentiment_for_score(score: f64) -> Sentiment {
    if score >= 0.7 {
        Sentiment::VeryPositive
    } else if score > 0.3 {
        Sentiment::Positive
    } else if score >= -0.3 {
        Sentiment::Neutral
    } else if score >= -0.7 {
        Sentiment::Negative
    } else {
        Sentiment::VeryNegative
    }
}

/// Repair a raw attempt into a schema-valid record, or reject it.
///
/// Deterministic coercions, applied in order:
/// - missing sentiment is inferred from the score (neutral if both absent)
/// - the score is clamped into [-1, 1], then into the sentiment's band
///   when its sign-class disagrees; a missing score becomes the band midpoint
/// - missing `key_topics` default to empty; entries are trimmed and deduped
/// - missing `market_impact` defaults to neutral
/// - an absent or implausibly short `id` is regenerated from title + source
/// - `extracted_at` is bumped up to the batch's collection time
/// - the summary is truncated to the schema bound
///
/// Rejection happens only when `title` or `summary` cannot be made
/// non-empty.
pub fn repair(
    attempt: RawAttempt,
    segment_source: &str,
    collected_at: DateTime<Utc>,
) -> Result<StructuredArticle, PipelineError> {
    let title = attempt
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| PipelineError::MalformedStructuredOutput("unrepairable: empty title".into()))?
        .to_string();

    let summary = attempt
        .summary
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| truncate_chars(s, MAX_SUMMARY_CHARS))
        .ok_or_else(|| {
            PipelineError::MalformedStructuredOutput("unrepairable: empty summary".into())
        })?;

    let sentiment = attempt
        .sentiment
        .as_deref()
        .and_then(Sentiment::parse)
        .unwrap_or_else(|| sentiment_for_score(attempt.sentiment_score.unwrap_or(0.0)));

    let (band_lo, band_hi) = sentiment.score_band();
    let sentiment_score = match attempt.sentiment_score {
        Some(score) => {
            let clamped = score.clamp(-1.0, 1.0);
            if sentiment.score_agrees(clamped) {
                clamped
            } else {
                clamped.clamp(band_lo, band_hi)
            }
        }
        None => (band_lo + band_hi) / 2.0,
    };

    let key_topics: Vec<String> = attempt
        .key_topics
        .unwrap_or_default()
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unique()
        .collect();

    let market_impact = attempt
        .market_impact
        .as_deref()
        .and_then(MarketImpact::parse)
        .unwrap_or(MarketImpact::Neutral);

    let source_url = attempt
        .source_url
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(segment_source)
        .to_string();

    let id = attempt
        .id
        .as_deref()
        .map(str::trim)
        .filter(|i| i.len() >= 5)
        .map(String::from)
        .unwrap_or_else(|| article_id(&title, &source_url));

    let extracted_at = attempt
        .extracted_at
        .as_deref()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
        .max(collected_at);

    let article = StructuredArticle {
        id,
        title,
        summary,
        sentiment,
        sentiment_score,
        key_topics,
        market_impact,
        source_url,
        extracted_at,
    };
    article.validate()?;
    Ok(article)
}

/// Best-effort record for a segment the structuring service never saw.
///
/// Title is the segment's first line (a `TITLE:` provenance prefix is
/// stripped), summary is the truncated segment body, and every analysed
/// field takes its neutral value.
pub fn heuristic_record(
    segment: &Segment,
    collected_at: DateTime<Utc>,
) -> StructuredArticle {
    let raw_first = first_line(&segment.text);
    let title = raw_first
        .strip_prefix("TITLE:")
        .map(str::trim)
        .unwrap_or(raw_first);
    let title = if title.is_empty() {
        "Untitled article".to_string()
    } else {
        title.to_string()
    };

    let body = segment
        .text
        .split_once("CONTENT:")
        .map(|(_, b)| b.trim())
        .unwrap_or(segment.text.trim());

    StructuredArticle {
        id: article_id(&title, &segment.source_url),
        title,
        summary: truncate_chars(body, HEURISTIC_SUMMARY_CHARS),
        sentiment: Sentiment::Neutral,
        sentiment_score: 0.0,
        key_topics: Vec::new(),
        market_impact: MarketImpact::Neutral,
        source_url: segment.source_url.clone(),
        extracted_at: Utc::now().max(collected_at),
    }
}

/// Regenerate ids the structuring service reused across segments.
///
/// Services sometimes echo the schema example's placeholder id for
/// every segment. Exact re-occurrences of a record are left alone (the
/// Loader collapses those), but a reused id on a materially different
/// record is replaced with the content-derived id so distinct articles
/// never collide in the store.
fn resolve_id_collisions(articles: &mut [StructuredArticle]) {
    let mut first_by_id: HashMap<String, usize> = HashMap::new();
    for i in 0..articles.len() {
        match first_by_id.get(&articles[i].id) {
            None => {
                first_by_id.insert(articles[i].id.clone(), i);
            }
            Some(&first) if articles[first] == articles[i] => {}
            Some(_) => {
                let mut fresh = article_id(&articles[i].title, &articles[i].source_url);
                if first_by_id.contains_key(&fresh) {
                    fresh = article_id(
                        &format!("{}#{i}", articles[i].title),
                        &articles[i].source_url,
                    );
                }
                warn!(
                    index = i,
                    old_id = %articles[i].id,
                    new_id = %fresh,
                    "Service reused an id across distinct articles; regenerated"
                );
                articles[i].id = fresh.clone();
                first_by_id.insert(fresh, i);
            }
        }
    }
}

enum SegmentResult {
    Accepted(StructuredArticle),
    Heuristic(StructuredArticle),
    Rejected,
}

async fn structure_segment<S: StructureAsync>(
    client: Option<&S>,
    index: usize,
    segment: &Segment,
    collected_at: DateTime<Utc>,
) -> SegmentResult {
    let Some(client) = client else {
        return SegmentResult::Heuristic(heuristic_record(segment, collected_at));
    };

    let raw = match client.structure(&segment.text).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!(index, error = %e, "Structuring unavailable; using heuristic record");
            return SegmentResult::Heuristic(heuristic_record(segment, collected_at));
        }
    };

    let mut parsed = parse_attempt(&raw);

    // A truncated response (token limit) is worth one re-ask.
    if let Err(ref e) = parsed {
        if looks_truncated(e) {
            warn!(index, error = %e, "EOF while parsing; re-asking once");
            match client.structure(&segment.text).await {
                Ok(raw2) => parsed = parse_attempt(&raw2),
                Err(e2) => {
                    warn!(index, error = %e2, "Re-ask failed; using heuristic record");
                    return SegmentResult::Heuristic(heuristic_record(segment, collected_at));
                }
            }
        }
    }

    match parsed {
        Ok(attempt) => match repair(attempt, &segment.source_url, collected_at) {
            Ok(article) => SegmentResult::Accepted(article),
            Err(e) => {
                warn!(index, error = %e, "Record unrepairable; discarding");
                SegmentResult::Rejected
            }
        },
        Err(e) => {
            warn!(
                index,
                error = %e,
                response_preview = %truncate_for_log(&raw, 300),
                "Non-JSON structuring output; using heuristic record"
            );
            SegmentResult::Heuristic(heuristic_record(segment, collected_at))
        }
    }
}

/// Structure the whole batch into an ordered record sequence.
///
/// `client` is `None` when structuring credentials are absent or the
/// run is offline; every segment then takes the heuristic path. Ids the
/// service reused across distinct articles are regenerated, so the
/// returned records satisfy the Loader's no-conflicting-duplicates
/// precondition. The structured-data artifact is persisted before
/// returning. The only errors that propagate are artifact I/O failures.
#[instrument(level = "info", skip_all, fields(sources = batch.sources.len()))]
pub async fn structure_batch<S: StructureAsync>(
    client: Option<&S>,
    batch: RawBatch,
    data_dir: &Path,
) -> Result<(Vec<StructuredArticle>, StageOutcome), PipelineError> {
    let collected_at = batch.collected_at;
    let segments = split_segments(&batch);
    let total = segments.len();
    info!(segments = total, "Structuring batch");

    let results: Vec<SegmentResult> = stream::iter(segments.iter().enumerate())
        .map(|(i, segment)| async move {
            structure_segment(client, i, segment, collected_at).await
        })
        .buffered(STRUCTURE_CONCURRENCY)
        .collect()
        .await;

    let mut articles = Vec::with_capacity(total);
    let mut heuristic_count = 0usize;
    let mut rejected_count = 0usize;
    for result in results {
        match result {
            SegmentResult::Accepted(article) => articles.push(article),
            SegmentResult::Heuristic(article) => {
                heuristic_count += 1;
                articles.push(article);
            }
            SegmentResult::Rejected => rejected_count += 1,
        }
    }

    resolve_id_collisions(&mut articles);

    let outcome = if client.is_none() || heuristic_count > 0 {
        StageOutcome::Fallback
    } else {
        StageOutcome::Primary
    };

    info!(
        segments = total,
        accepted = articles.len() - heuristic_count,
        heuristic = heuristic_count,
        rejected = rejected_count,
        outcome = outcome.as_str(),
        "Structuring complete"
    );

    json::write_article_set(&ArticleSet::new(articles.clone()), data_dir).await?;

    Ok((articles, outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::sample_batch;

    /// Always fails, as if the service is down.
    struct DownClient;

    impl StructureAsync for DownClient {
        async fn structure(&self, _segment: &str) -> Result<String, PipelineError> {
            Err(PipelineError::StructuringUnavailable("down".into()))
        }
    }

    /// Echoes the schema example's placeholder id, with distinct
    /// content per call.
    struct EchoIdClient {
        calls: std::sync::Mutex<usize>,
    }

    impl StructureAsync for EchoIdClient {
        async fn structure(&self, _segment: &str) -> Result<String, PipelineError> {
            let mut n = self.calls.lock().unwrap();
            *n += 1;
            Ok(format!(
                r#"{{"id": "generated-unique-id", "title": "Headline {n}", "summary": "Summary {n}.", "sentiment": "neutral", "sentiment_score": 0.0}}"#
            ))
        }
    }

    /// Answers every segment with the same fixed payload.
    struct FixedClient(&'static str);

    impl StructureAsync for FixedClient {
        async fn structure(&self, _segment: &str) -> Result<String, PipelineError> {
            Ok(self.0.to_string())
        }
    }

    const GOOD_PAYLOAD: &str = r#"```json
    {
        "id": "fixed-0001",
        "title": "Tech Stocks Rally",
        "summary": "Stocks went up on AI optimism.",
        "sentiment": "positive",
        "sentiment_score": 0.6,
        "key_topics": ["ai", "stocks", "ai"],
        "market_impact": "bullish",
        "source_url": "https://www.wsj.com/articles/sample-tech-rally",
        "extracted_at": "2025-09-24T12:00:00Z"
    }
    ```"#;

    #[test]
    fn test_split_segments_on_markers() {
        let batch = sample_batch();
        let segments = split_segments(&batch);
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].source_url, batch.sources[0]);
        assert!(segments[0].text.contains("Tech Stocks Rally"));
        assert!(segments[2].text.contains("Energy Sector"));
    }

    #[test]
    fn test_split_segments_blank_line_fallback() {
        let batch = RawBatch {
            text: "First article text.\nSecond line.\n\n\nSecond article text.".to_string(),
            sources: vec!["https://a".to_string(), "https://b".to_string()],
            collected_at: Utc::now(),
        };
        let segments = split_segments(&batch);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].source_url, "https://b");
    }

    #[test]
    fn test_split_segments_count_mismatch_uses_placeholder() {
        let batch = RawBatch {
            text: "Only one segment here.".to_string(),
            sources: vec!["https://a".to_string(), "https://b".to_string()],
            collected_at: Utc::now(),
        };
        let segments = split_segments(&batch);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].source_url, "unknown");
    }

    #[test]
    fn test_parse_attempt_strips_fences_and_unwraps_articles() {
        let attempt = parse_attempt(GOOD_PAYLOAD).unwrap();
        assert_eq!(attempt.title.as_deref(), Some("Tech Stocks Rally"));

        let wrapped = r#"{"articles": [{"title": "Wrapped", "summary": "s"}]}"#;
        let attempt = parse_attempt(wrapped).unwrap();
        assert_eq!(attempt.title.as_deref(), Some("Wrapped"));
    }

    #[test]
    fn test_repair_clamps_score_into_range() {
        let attempt = RawAttempt {
            title: Some("T".into()),
            summary: Some("S".into()),
            sentiment: Some("positive".into()),
            sentiment_score: Some(3.5),
            ..Default::default()
        };
        let article = repair(attempt, "https://a", Utc::now()).unwrap();
        assert_eq!(article.sentiment_score, 1.0);
        assert!(article.validate().is_ok());
    }

    #[test]
    fn test_repair_coerces_sign_mismatch_into_band() {
        let attempt = RawAttempt {
            title: Some("T".into()),
            summary: Some("S".into()),
            sentiment: Some("negative".into()),
            sentiment_score: Some(0.5),
            ..Default::default()
        };
        let article = repair(attempt, "https://a", Utc::now()).unwrap();
        assert_eq!(article.sentiment, Sentiment::Negative);
        assert_eq!(article.sentiment_score, -0.3);
        assert!(article.validate().is_ok());
    }

    #[test]
    fn test_repair_defaults_topics_impact_and_id() {
        let attempt = RawAttempt {
            title: Some("Some Headline".into()),
            summary: Some("A summary.".into()),
            ..Default::default()
        };
        let article = repair(attempt, "https://a", Utc::now()).unwrap();
        assert!(article.key_topics.is_empty());
        assert_eq!(article.market_impact, MarketImpact::Neutral);
        assert_eq!(article.id, article_id("Some Headline", "https://a"));
        assert_eq!(article.sentiment, Sentiment::Neutral);
        assert_eq!(article.sentiment_score, 0.0);
    }

    #[test]
    fn test_repair_dedupes_topics_preserving_order() {
        let attempt = RawAttempt {
            title: Some("T".into()),
            summary: Some("S".into()),
            key_topics: Some(vec![
                "ai".into(),
                " stocks ".into(),
                "ai".into(),
                "".into(),
            ]),
            ..Default::default()
        };
        let article = repair(attempt, "https://a", Utc::now()).unwrap();
        assert_eq!(article.key_topics, vec!["ai".to_string(), "stocks".to_string()]);
    }

    #[test]
    fn test_repair_rejects_empty_title() {
        let attempt = RawAttempt {
            title: Some("   ".into()),
            summary: Some("S".into()),
            ..Default::default()
        };
        assert!(repair(attempt, "https://a", Utc::now()).is_err());
    }

    #[test]
    fn test_repair_bumps_extracted_at_to_collection_time() {
        let collected_at = Utc::now();
        let attempt = RawAttempt {
            title: Some("T".into()),
            summary: Some("S".into()),
            extracted_at: Some("2001-01-01T00:00:00Z".into()),
            ..Default::default()
        };
        let article = repair(attempt, "https://a", collected_at).unwrap();
        assert!(article.extracted_at >= collected_at);
    }

    #[tokio::test]
    async fn test_heuristic_scenario_service_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let batch = RawBatch {
            text: "Tech stocks surged as AI investments showed promise...\nMore detail here."
                .to_string(),
            sources: vec!["https://www.wsj.com/articles/sample-tech-rally".to_string()],
            collected_at: Utc::now(),
        };

        let (articles, outcome) =
            structure_batch(Some(&DownClient), batch, dir.path()).await.unwrap();

        assert_eq!(outcome, StageOutcome::Fallback);
        assert_eq!(articles.len(), 1);
        let a = &articles[0];
        assert_eq!(a.title, "Tech stocks surged as AI investments showed promise...");
        assert_eq!(a.sentiment, Sentiment::Neutral);
        assert_eq!(a.sentiment_score, 0.0);
        assert_eq!(a.market_impact, MarketImpact::Neutral);
        assert!(a.key_topics.is_empty());
        assert!(a.validate().is_ok());
    }

    #[tokio::test]
    async fn test_structure_batch_accepts_valid_output_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let batch = sample_batch();
        let client = FixedClient(GOOD_PAYLOAD);

        let (articles, outcome) =
            structure_batch(Some(&client), batch.clone(), dir.path()).await.unwrap();

        assert_eq!(outcome, StageOutcome::Primary);
        assert_eq!(articles.len(), 3);
        assert!(articles.iter().all(|a| a.validate().is_ok()));
        // repair dedupes the service's repeated topic
        assert_eq!(articles[0].key_topics, vec!["ai".to_string(), "stocks".to_string()]);

        // artifact persisted before returning
        let set = json::read_article_set(dir.path()).await.unwrap();
        assert_eq!(set.articles, articles);
    }

    #[tokio::test]
    async fn test_structure_batch_without_client_yields_one_record_per_segment() {
        let dir = tempfile::tempdir().unwrap();
        let batch = sample_batch();

        let (articles, outcome) =
            structure_batch::<DownClient>(None, batch, dir.path()).await.unwrap();

        assert_eq!(outcome, StageOutcome::Fallback);
        assert_eq!(articles.len(), 3);
        for a in &articles {
            assert!(!a.title.is_empty());
            assert!(!a.summary.is_empty());
            assert!((-1.0..=1.0).contains(&a.sentiment_score));
            assert!(a.sentiment.score_agrees(a.sentiment_score));
        }
        // titles come from the segment provenance lines, in source order
        assert!(articles[0].title.contains("Tech Stocks Rally"));
        assert!(articles[1].title.contains("Federal Reserve"));
        assert!(articles[2].title.contains("Energy Sector"));
    }

    #[tokio::test]
    async fn test_structure_batch_non_json_output_falls_back_per_segment() {
        let dir = tempfile::tempdir().unwrap();
        let batch = sample_batch();
        let client = FixedClient("I am not JSON at all");

        let (articles, outcome) =
            structure_batch(Some(&client), batch, dir.path()).await.unwrap();

        assert_eq!(outcome, StageOutcome::Fallback);
        assert_eq!(articles.len(), 3);
        assert!(articles.iter().all(|a| a.sentiment == Sentiment::Neutral));
    }

    #[tokio::test]
    async fn test_reused_service_ids_are_regenerated_per_article() {
        let dir = tempfile::tempdir().unwrap();
        let batch = sample_batch();
        let client = EchoIdClient {
            calls: std::sync::Mutex::new(0),
        };

        let (articles, _) = structure_batch(Some(&client), batch, dir.path()).await.unwrap();

        assert_eq!(articles.len(), 3);
        let distinct: std::collections::HashSet<&str> =
            articles.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(distinct.len(), 3);
        // first occurrence keeps the echoed id; the rest become content-derived
        assert_eq!(articles[0].id, "generated-unique-id");
        for a in &articles[1..] {
            assert_eq!(a.id, article_id(&a.title, &a.source_url));
        }
        // the batch now satisfies the Loader's duplicate policy
        assert!(crate::loader::to_rows(&articles).is_ok());
    }

    #[test]
    fn test_resolve_id_collisions_leaves_exact_duplicates_alone() {
        let collected_at = Utc::now();
        let attempt = |title: &str| RawAttempt {
            id: Some("shared-id".into()),
            title: Some(title.into()),
            summary: Some("Summary.".into()),
            extracted_at: Some("2001-01-01T00:00:00Z".into()),
            ..Default::default()
        };
        let a = repair(attempt("Same"), "https://a", collected_at).unwrap();
        let mut articles = vec![a.clone(), a, repair(attempt("Other"), "https://a", collected_at).unwrap()];

        resolve_id_collisions(&mut articles);

        // exact re-occurrence keeps the shared id for the Loader to collapse
        assert_eq!(articles[0].id, "shared-id");
        assert_eq!(articles[1].id, "shared-id");
        // the materially different record gets its own id
        assert_eq!(articles[2].id, article_id("Other", "https://a"));
    }
}
