//! Pipeline configuration assembled from CLI arguments and environment.
//!
//! Credential presence is checked once here, at startup. A missing
//! credential group deterministically forces that stage's fallback path
//! for the whole run; it never surfaces as a mid-run error.

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::cli::Cli;

/// Connection settings for the external structuring service.
#[derive(Debug, Clone)]
pub struct StructuringConfig {
    /// Base URL of an OpenAI-compatible chat-completions endpoint.
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
}

/// Connection settings for the primary store (PostgREST upsert API).
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub url: String,
    pub key: String,
    pub table: String,
    pub timeout: Duration,
}

/// Everything the pipeline needs for one run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// `None` forces the Structurer's heuristic path for every segment.
    pub structuring: Option<StructuringConfig>,
    /// `None` forces the Loader's fallback CSV path.
    pub store: Option<StoreConfig>,
    pub data_dir: PathBuf,
    pub section_url: String,
    pub politeness_delay: Duration,
    pub fetch_timeout: Duration,
    /// Test mode: no network at all; every stage takes its fallback.
    pub offline: bool,
}

impl PipelineConfig {
    pub fn from_cli(args: &Cli, offline: bool) -> Self {
        let timeout = Duration::from_secs(args.request_timeout_secs);

        let structuring = match (&args.openai_endpoint, &args.openai_api_key) {
            (Some(endpoint), Some(api_key)) => Some(StructuringConfig {
                endpoint: endpoint.trim_end_matches('/').to_string(),
                api_key: api_key.clone(),
                model: args.openai_model.clone(),
                timeout,
            }),
            _ => {
                if !offline {
                    warn!(
                        "Structuring credentials absent (OPENAI_ENDPOINT/OPENAI_API_KEY); \
                         heuristic records forced for this run"
                    );
                }
                None
            }
        };

        let store = match (&args.supabase_url, &args.supabase_key) {
            (Some(url), Some(key)) => Some(StoreConfig {
                url: url.trim_end_matches('/').to_string(),
                key: key.clone(),
                table: args.supabase_table.clone(),
                timeout,
            }),
            _ => {
                if !offline {
                    warn!(
                        "Store credentials absent (SUPABASE_URL/SUPABASE_KEY); \
                         fallback CSV forced for this run"
                    );
                }
                None
            }
        };

        Self {
            structuring,
            store,
            data_dir: PathBuf::from(&args.data_dir),
            section_url: args.section_url.clone(),
            politeness_delay: Duration::from_millis(args.politeness_delay_ms),
            fetch_timeout: timeout,
            offline,
        }
    }

    /// A fully-offline configuration for exercising the pipeline
    /// end to end without credentials or network.
    pub fn offline_fixture(data_dir: PathBuf) -> Self {
        Self {
            structuring: None,
            store: None,
            data_dir,
            section_url: String::new(),
            politeness_delay: Duration::from_millis(0),
            fetch_timeout: Duration::from_secs(1),
            offline: true,
        }
    }
}
