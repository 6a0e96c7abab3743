//! Orchestration: sequence collect → structure → load and report.
//!
//! The orchestrator's job is sequencing and reporting, not recovery:
//! each stage carries its own fallback, so there is no whole-pipeline
//! retry here. A cancellation flag is checked at stage boundaries;
//! mid-stage cancellation is not supported.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::api::{OpenAiStructurer, RetryStructure};
use crate::collector;
use crate::config::PipelineConfig;
use crate::errors::PipelineError;
use crate::loader::{self, LoadReport};
use crate::models::{PipelineRun, RunOutcome, Stage, StageReport};
use crate::outputs::csv::FallbackStore;
use crate::outputs::{json, raw};
use crate::store::{ArticleStore, SupabaseStore};
use crate::structurer;

/// Cooperative abort signal, checked between stages.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

fn build_structuring_client(
    config: &PipelineConfig,
) -> Option<RetryStructure<OpenAiStructurer>> {
    if config.offline {
        return None;
    }
    let cfg = config.structuring.clone()?;
    match OpenAiStructurer::new(cfg) {
        Ok(client) => Some(RetryStructure::new(client, 3, Duration::from_secs(1))),
        Err(e) => {
            warn!(error = %e, "Could not build structuring client; heuristic records forced");
            None
        }
    }
}

fn build_store(config: &PipelineConfig) -> Option<SupabaseStore> {
    if config.offline {
        return None;
    }
    let cfg = config.store.clone()?;
    match SupabaseStore::new(cfg) {
        Ok(store) => Some(store),
        Err(e) => {
            warn!(error = %e, "Could not build store client; fallback CSV forced");
            None
        }
    }
}

/// Run the full pipeline, collecting up to `limit` articles.
///
/// Returns the run summary; the only errors that propagate are the
/// Loader's `InvalidInput` and artifact I/O failures.
#[instrument(level = "info", skip(config, cancel))]
pub async fn run_pipeline(
    config: &PipelineConfig,
    limit: u32,
    cancel: &CancelFlag,
) -> Result<PipelineRun, PipelineError> {
    let started_at = Utc::now();
    let mut stages: Vec<StageReport> = Vec::with_capacity(3);

    // ---- Stage 1: collect ----
    let t = Instant::now();
    let (batch, collect_outcome) = collector::collect(config, limit).await?;
    stages.push(StageReport {
        stage: Stage::Collect,
        elapsed_ms: t.elapsed().as_millis(),
        items: batch.sources.len(),
        outcome: collect_outcome,
    });

    if cancel.is_cancelled() {
        info!("Run cancelled after collection");
        return Ok(PipelineRun {
            started_at,
            stages,
            outcome: RunOutcome::Aborted,
        });
    }

    // ---- Stage 2: structure ----
    let t = Instant::now();
    let client = build_structuring_client(config);
    let (articles, structure_outcome) =
        structurer::structure_batch(client.as_ref(), batch, &config.data_dir).await?;
    stages.push(StageReport {
        stage: Stage::Structure,
        elapsed_ms: t.elapsed().as_millis(),
        items: articles.len(),
        outcome: structure_outcome,
    });

    if cancel.is_cancelled() {
        info!("Run cancelled after structuring");
        return Ok(PipelineRun {
            started_at,
            stages,
            outcome: RunOutcome::Aborted,
        });
    }

    // ---- Stage 3: load ----
    let t = Instant::now();
    let store = build_store(config);
    let store_ref = store.as_ref().map(|s| s as &dyn ArticleStore);
    let fallback = FallbackStore::new(&config.data_dir);
    let report = loader::load(store_ref, &fallback, &articles).await?;
    stages.push(StageReport {
        stage: Stage::Load,
        elapsed_ms: t.elapsed().as_millis(),
        items: report.succeeded,
        outcome: report.mode,
    });

    let run = PipelineRun {
        started_at,
        stages,
        outcome: RunOutcome::Completed,
    };
    log_summary(&run);
    Ok(run)
}

/// Re-run the structuring stage against the last raw-text artifact.
#[instrument(level = "info", skip(config))]
pub async fn run_structure_stage(config: &PipelineConfig) -> Result<usize, PipelineError> {
    let batch = raw::read_raw_batch(&config.data_dir).await?;
    let client = build_structuring_client(config);
    let (articles, outcome) =
        structurer::structure_batch(client.as_ref(), batch, &config.data_dir).await?;
    info!(
        articles = articles.len(),
        outcome = outcome.as_str(),
        "Standalone structuring complete"
    );
    Ok(articles.len())
}

/// Re-run the load stage against the last structured-data artifact.
#[instrument(level = "info", skip(config))]
pub async fn run_load_stage(config: &PipelineConfig) -> Result<LoadReport, PipelineError> {
    let set = json::read_article_set(&config.data_dir).await?;
    let store = build_store(config);
    let store_ref = store.as_ref().map(|s| s as &dyn ArticleStore);
    let fallback = FallbackStore::new(&config.data_dir);
    let report = loader::load(store_ref, &fallback, &set.articles).await?;
    info!(
        attempted = report.attempted,
        mode = report.mode.as_str(),
        "Standalone load complete"
    );
    Ok(report)
}

/// Log the per-stage summary so degraded runs are transparent rather
/// than silently "successful".
pub fn log_summary(run: &PipelineRun) {
    for stage in &run.stages {
        info!(
            stage = stage.stage.as_str(),
            items = stage.items,
            elapsed_ms = stage.elapsed_ms,
            path = stage.outcome.as_str(),
            "Stage summary"
        );
    }
    info!(outcome = ?run.outcome, stages = run.stages.len(), "Run summary");
}
