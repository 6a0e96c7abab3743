//! Command-line interface definitions for the pipeline.
//!
//! All credentials can be provided via command-line flags or environment
//! variables. Missing credentials never abort a run: they force the
//! corresponding stage's fallback path instead.

use clap::{Parser, Subcommand};

/// Command-line arguments for the news sentiment pipeline.
///
/// # Examples
///
/// ```sh
/// # Full pipeline, up to 3 articles
/// market_news_etl run 3
///
/// # Everything offline against the built-in fixture
/// market_news_etl test
///
/// # Re-run a single stage against the last persisted artifact
/// market_news_etl structure
/// market_news_etl load
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Directory for pipeline artifacts (raw blob, structured JSON, fallback CSV)
    #[arg(short, long, default_value = "data")]
    pub data_dir: String,

    /// Base URL of the OpenAI-compatible structuring service
    #[arg(long, env = "OPENAI_ENDPOINT")]
    pub openai_endpoint: Option<String>,

    /// API key for the structuring service
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Model name for the structuring service
    #[arg(long, env = "OPENAI_MODEL", default_value = "gpt-4o-mini")]
    pub openai_model: String,

    /// Base URL of the primary store (Supabase project URL)
    #[arg(long, env = "SUPABASE_URL")]
    pub supabase_url: Option<String>,

    /// Service key for the primary store
    #[arg(long, env = "SUPABASE_KEY", hide_env_values = true)]
    pub supabase_key: Option<String>,

    /// Table name in the primary store
    #[arg(long, env = "SUPABASE_TABLE", default_value = "news_articles")]
    pub supabase_table: String,

    /// News section page to index article links from
    #[arg(long, default_value = "https://www.wsj.com/news/business")]
    pub section_url: String,

    /// Minimum delay between successive article fetches, in milliseconds
    #[arg(long, default_value_t = 2000)]
    pub politeness_delay_ms: u64,

    /// Per-request timeout for network calls, in seconds
    #[arg(long, default_value_t = 15)]
    pub request_timeout_secs: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run every stage against the built-in sample corpus, no network
    Test,
    /// Run the full pipeline, collecting up to <LIMIT> articles
    Run {
        /// Number of articles to collect (keep it single-digit; each
        /// fetch waits out the politeness delay)
        #[arg(value_parser = clap::value_parser!(u32).range(1..), default_value_t = 3)]
        limit: u32,
    },
    /// Re-run the structuring stage against the last raw-text artifact
    Structure,
    /// Re-run the load stage against the last structured-data artifact
    Load,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_run_with_limit() {
        let cli = Cli::parse_from(["market_news_etl", "run", "5"]);
        match cli.command {
            Command::Run { limit } => assert_eq!(limit, 5),
            other => panic!("expected Run, got {other:?}"),
        }
        assert_eq!(cli.data_dir, "data");
    }

    #[test]
    fn test_cli_run_default_limit() {
        let cli = Cli::parse_from(["market_news_etl", "run"]);
        match cli.command {
            Command::Run { limit } => assert_eq!(limit, 3),
            other => panic!("expected Run, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_rejects_zero_limit() {
        assert!(Cli::try_parse_from(["market_news_etl", "run", "0"]).is_err());
    }

    #[test]
    fn test_cli_test_mode_and_data_dir() {
        let cli = Cli::parse_from(["market_news_etl", "-d", "/tmp/etl", "test"]);
        assert!(matches!(cli.command, Command::Test));
        assert_eq!(cli.data_dir, "/tmp/etl");
    }
}
