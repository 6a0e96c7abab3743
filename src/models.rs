//! Data models for raw batches, structured sentiment records, and run reports.
//!
//! This module defines the core data structures used throughout the pipeline:
//! - [`RawBatch`]: unprocessed article text plus provenance, produced by the Collector
//! - [`StructuredArticle`]: validated, schema-conformant sentiment record
//! - [`ArticleSet`]: the structured-data artifact written between stages
//! - [`PipelineRun`] / [`StageReport`]: per-run summary of timings, counts,
//!   and which path (primary or fallback) each stage took
//!
//! Field names are snake_case to match both the JSON schema sent to the
//! structuring service and the primary store's column names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::PipelineError;

/// Maximum summary length after the repair pass, in characters.
pub const MAX_SUMMARY_CHARS: usize = 1000;

/// Scores with an absolute value at or below this count as "near zero"
/// for the neutral sentiment's sign-class check.
pub const NEUTRAL_SCORE_BOUND: f64 = 0.3;

/// Unprocessed article text collected in one run.
///
/// Immutable once produced; handed off to the Structurer exactly once.
/// `sources` holds one URL per article segment in `text`, in appearance
/// order, so segments can be matched to their origin positionally.
#[derive(Debug, Clone)]
pub struct RawBatch {
    /// Concatenated article segments with `=== ARTICLE n ===` boundary markers.
    pub text: String,
    /// Source URL per segment, in the same order as the segments.
    pub sources: Vec<String>,
    /// When the batch was collected.
    pub collected_at: DateTime<Utc>,
}

/// A single article as fetched from a news source, before blob assembly.
#[derive(Debug)]
pub struct FetchedArticle {
    pub title: String,
    pub content: String,
    pub url: String,
}

/// Overall article sentiment, from the structuring service's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    VeryPositive,
    Positive,
    Neutral,
    Negative,
    VeryNegative,
}

/// Sign class a sentiment's score must fall into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignClass {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::VeryPositive => "very_positive",
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
            Sentiment::VeryNegative => "very_negative",
        }
    }

    pub fn parse(s: &str) -> Option<Sentiment> {
        match s.trim() {
            "very_positive" => Some(Sentiment::VeryPositive),
            "positive" => Some(Sentiment::Positive),
            "neutral" => Some(Sentiment::Neutral),
            "negative" => Some(Sentiment::Negative),
            "very_negative" => Some(Sentiment::VeryNegative),
            _ => None,
        }
    }

    pub fn sign_class(&self) -> SignClass {
        match self {
            Sentiment::VeryPositive | Sentiment::Positive => SignClass::Positive,
            Sentiment::Negative | Sentiment::VeryNegative => SignClass::Negative,
            Sentiment::Neutral => SignClass::Neutral,
        }
    }

    /// Inclusive score band for this sentiment, matching the guidance
    /// given to the structuring service.
    pub fn score_band(&self) -> (f64, f64) {
        match self {
            Sentiment::VeryPositive => (0.7, 1.0),
            Sentiment::Positive => (0.3, 0.7),
            Sentiment::Neutral => (-NEUTRAL_SCORE_BOUND, NEUTRAL_SCORE_BOUND),
            Sentiment::Negative => (-0.7, -0.3),
            Sentiment::VeryNegative => (-1.0, -0.7),
        }
    }

    /// Whether `score` agrees in sign-class with this sentiment.
    ///
    /// Positive sentiments require a strictly positive score, negative
    /// sentiments a strictly negative one, and neutral a score within
    /// [`NEUTRAL_SCORE_BOUND`] of zero.
    pub fn score_agrees(&self, score: f64) -> bool {
        match self.sign_class() {
            SignClass::Positive => score > 0.0,
            SignClass::Negative => score < 0.0,
            SignClass::Neutral => score.abs() <= NEUTRAL_SCORE_BOUND,
        }
    }
}

/// Expected market-direction impact of an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketImpact {
    Bullish,
    Bearish,
    Neutral,
    Mixed,
}

impl MarketImpact {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketImpact::Bullish => "bullish",
            MarketImpact::Bearish => "bearish",
            MarketImpact::Neutral => "neutral",
            MarketImpact::Mixed => "mixed",
        }
    }

    pub fn parse(s: &str) -> Option<MarketImpact> {
        match s.trim() {
            "bullish" => Some(MarketImpact::Bullish),
            "bearish" => Some(MarketImpact::Bearish),
            "neutral" => Some(MarketImpact::Neutral),
            "mixed" => Some(MarketImpact::Mixed),
            _ => None,
        }
    }
}

/// Validated, schema-conformant sentiment record for one article segment.
///
/// Only records that pass [`StructuredArticle::validate`] leave the
/// Structurer; the Loader trusts the schema from that point on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredArticle {
    /// Stable unique identifier; primary key in the store.
    pub id: String,
    pub title: String,
    pub summary: String,
    pub sentiment: Sentiment,
    pub sentiment_score: f64,
    /// Ordered, deduplicated topic tags. May be empty, never null.
    pub key_topics: Vec<String>,
    pub market_impact: MarketImpact,
    pub source_url: String,
    pub extracted_at: DateTime<Utc>,
}

impl StructuredArticle {
    /// Check every field constraint, including the cross-field
    /// sentiment/score sign invariant.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.id.trim().is_empty() {
            return Err(PipelineError::MalformedStructuredOutput("empty id".into()));
        }
        if self.title.trim().is_empty() {
            return Err(PipelineError::MalformedStructuredOutput(
                "empty title".into(),
            ));
        }
        if self.summary.trim().is_empty() {
            return Err(PipelineError::MalformedStructuredOutput(
                "empty summary".into(),
            ));
        }
        if self.summary.chars().count() > MAX_SUMMARY_CHARS {
            return Err(PipelineError::MalformedStructuredOutput(format!(
                "summary exceeds {MAX_SUMMARY_CHARS} chars"
            )));
        }
        if !(-1.0..=1.0).contains(&self.sentiment_score) {
            return Err(PipelineError::MalformedStructuredOutput(format!(
                "sentiment_score {} outside [-1.0, 1.0]",
                self.sentiment_score
            )));
        }
        if !self.sentiment.score_agrees(self.sentiment_score) {
            return Err(PipelineError::MalformedStructuredOutput(format!(
                "sentiment_score {} disagrees with sentiment {}",
                self.sentiment_score,
                self.sentiment.as_str()
            )));
        }
        if self.source_url.trim().is_empty() {
            return Err(PipelineError::MalformedStructuredOutput(
                "empty source_url".into(),
            ));
        }
        Ok(())
    }
}

/// The structured-data artifact written by the Structurer: an ordered
/// list of records plus a generation timestamp.
#[derive(Debug, Serialize, Deserialize)]
pub struct ArticleSet {
    pub articles: Vec<StructuredArticle>,
    pub generated_at: DateTime<Utc>,
}

impl ArticleSet {
    pub fn new(articles: Vec<StructuredArticle>) -> Self {
        Self {
            articles,
            generated_at: Utc::now(),
        }
    }
}

/// Pipeline stage names, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Collect,
    Structure,
    Load,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Collect => "collect",
            Stage::Structure => "structure",
            Stage::Load => "load",
        }
    }
}

/// Which path a stage took: the primary dependency, or its fallback.
///
/// A first-class value rather than something inferred from control
/// flow, so degraded runs are transparent in the run summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageOutcome {
    Primary,
    Fallback,
}

impl StageOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageOutcome::Primary => "primary",
            StageOutcome::Fallback => "fallback",
        }
    }
}

/// One stage's contribution to the run summary.
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub stage: Stage,
    pub elapsed_ms: u128,
    pub items: usize,
    pub outcome: StageOutcome,
}

/// How a run ended. Fatal errors propagate as `Err` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Completed,
    Aborted,
}

/// Ephemeral record of one end-to-end execution. Lives only for the
/// duration of the run; reported via the log, never persisted.
#[derive(Debug, Serialize)]
pub struct PipelineRun {
    pub started_at: DateTime<Utc>,
    pub stages: Vec<StageReport>,
    pub outcome: RunOutcome,
}

impl PipelineRun {
    pub fn stage(&self, stage: Stage) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.stage == stage)
    }

    pub fn used_fallback(&self, stage: Stage) -> bool {
        self.stage(stage)
            .map(|s| s.outcome == StageOutcome::Fallback)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_article() -> StructuredArticle {
        StructuredArticle {
            id: "a1b2c3d4e5f60718".to_string(),
            title: "Tech Stocks Rally as AI Investments Show Promise".to_string(),
            summary: "Technology stocks surged on renewed AI confidence.".to_string(),
            sentiment: Sentiment::Positive,
            sentiment_score: 0.7,
            key_topics: vec![
                "artificial intelligence".to_string(),
                "tech stocks".to_string(),
            ],
            market_impact: MarketImpact::Bullish,
            source_url: "https://www.wsj.com/articles/sample-tech-rally".to_string(),
            extracted_at: Utc::now(),
        }
    }

    #[test]
    fn test_sentiment_serde_snake_case() {
        let json = serde_json::to_string(&Sentiment::VeryNegative).unwrap();
        assert_eq!(json, "\"very_negative\"");
        let parsed: Sentiment = serde_json::from_str("\"very_positive\"").unwrap();
        assert_eq!(parsed, Sentiment::VeryPositive);
    }

    #[test]
    fn test_sentiment_parse_round_trip() {
        for s in [
            Sentiment::VeryPositive,
            Sentiment::Positive,
            Sentiment::Neutral,
            Sentiment::Negative,
            Sentiment::VeryNegative,
        ] {
            assert_eq!(Sentiment::parse(s.as_str()), Some(s));
        }
        assert_eq!(Sentiment::parse("bogus"), None);
    }

    #[test]
    fn test_score_agreement() {
        assert!(Sentiment::Positive.score_agrees(0.5));
        assert!(!Sentiment::Positive.score_agrees(-0.5));
        assert!(!Sentiment::Positive.score_agrees(0.0));
        assert!(Sentiment::Negative.score_agrees(-0.4));
        assert!(!Sentiment::Negative.score_agrees(0.4));
        assert!(Sentiment::Neutral.score_agrees(0.0));
        assert!(Sentiment::Neutral.score_agrees(-0.3));
        assert!(!Sentiment::Neutral.score_agrees(0.8));
    }

    #[test]
    fn test_validate_accepts_good_record() {
        assert!(sample_article().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range_score() {
        let mut article = sample_article();
        article.sentiment_score = 1.5;
        assert!(article.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_sign_mismatch() {
        let mut article = sample_article();
        article.sentiment = Sentiment::Negative;
        // score stays +0.7
        let err = article.validate().unwrap_err();
        assert!(err.to_string().contains("disagrees"));
    }

    #[test]
    fn test_validate_rejects_empty_title() {
        let mut article = sample_article();
        article.title = "   ".to_string();
        assert!(article.validate().is_err());
    }

    #[test]
    fn test_article_set_round_trip() {
        let set = ArticleSet::new(vec![sample_article()]);
        let json = serde_json::to_string(&set).unwrap();
        let parsed: ArticleSet = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.articles, set.articles);
    }

    #[test]
    fn test_pipeline_run_fallback_lookup() {
        let run = PipelineRun {
            started_at: Utc::now(),
            stages: vec![
                StageReport {
                    stage: Stage::Collect,
                    elapsed_ms: 10,
                    items: 3,
                    outcome: StageOutcome::Fallback,
                },
                StageReport {
                    stage: Stage::Load,
                    elapsed_ms: 5,
                    items: 3,
                    outcome: StageOutcome::Primary,
                },
            ],
            outcome: RunOutcome::Completed,
        };
        assert!(run.used_fallback(Stage::Collect));
        assert!(!run.used_fallback(Stage::Load));
        assert!(!run.used_fallback(Stage::Structure));
    }
}
