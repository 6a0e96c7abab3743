//! Durable artifacts written between pipeline stages.
//!
//! Each stage persists its output before handing off, so any stage can
//! be re-run standalone against the last artifact and a failure later
//! in the run never forces a re-fetch.
//!
//! # Artifact layout
//!
//! ```text
//! data_dir/
//! ├── raw_blob.txt              # Collector: UTF-8 blob with article markers
//! ├── structured_articles.json  # Structurer: ordered records + generated_at
//! └── articles_backup.csv       # Loader: fallback rows when the store is down
//! ```

pub mod csv;
pub mod json;
pub mod raw;
