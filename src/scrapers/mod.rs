//! News source scraping for the collection stage.
//!
//! Follows a two-phase pattern:
//!
//! 1. **Indexing**: discover article URLs from the source's section page
//! 2. **Fetching**: download and parse article content from each URL
//!
//! Fetch failures are reported to the Collector, which decides whether
//! the run can still proceed on the sample corpus; nothing in here
//! aborts a run on its own.

pub mod wsj;
