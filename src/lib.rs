//! Market Data Fetcher Library
//!
//! This library materializes a selected subset of a historical market data
//! Git repository: it derives non-cone sparse checkout patterns from the
//! configured exchanges, trading modes and timeframes, registers them in a
//! blobless shallow clone, and checks out exactly the matching feather
//! files.
//!
//! The pipeline stages are:
//! - Configuration and validation: FetchConfig
//! - Pattern derivation: PatternPlan
//! - Git execution: GitClient over a GitRunner
//! - Orchestration: DataFetcher
//! - Reporting: DataSummary and FetchReport

pub mod config;
pub mod error;
pub mod fetcher;
pub mod git;
pub mod pattern;
pub mod summary;

// Re-export commonly used types
pub use config::{FetchConfig, DEFAULT_DATA_DIR, DEFAULT_REPO_URL};
pub use error::{FetchError, GitFailure};
pub use fetcher::{DataFetcher, FetchOutcome};
pub use git::{GitClient, GitOutput, GitRunner, SystemGit};
pub use pattern::{expand_patterns, market_subdir, sparse_pattern, PatternPlan};
pub use summary::{DataSummary, FetchReport, MarketSummary};
