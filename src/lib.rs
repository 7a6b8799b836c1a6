// src/lib.rs
// =============================================================================
// Library root. The binary in main.rs is a thin wrapper around this; the
// integration tests in tests/ drive the same code with a fake GitHub.
// =============================================================================

pub mod checker;
pub mod config;
pub mod crawl;
pub mod error;
pub mod github;
pub mod models;
pub mod output;

pub use config::{ClientConfig, CrawlConfig};
pub use crawl::Crawler;
pub use error::{ApiError, CrawlError};
pub use models::{CandidateUser, CoAuthorRecord};
pub use output::emit_records;
