//! Error types for the fetch pipeline
//!
//! Each pipeline stage has its own error variant so callers can tell a
//! rejected configuration from a failed clone, a failed pattern
//! registration, or a failed checkout.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Captured outcome of a git invocation that did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitFailure {
    /// Exit code reported by git, `None` if it was terminated by a signal.
    pub code: Option<i32>,
    /// Trimmed stderr output of the failing invocation.
    pub stderr: String,
}

impl fmt::Display for GitFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit code {}", code)?,
            None => write!(f, "terminated by signal")?,
        }
        if !self.stderr.is_empty() {
            write!(f, ": {}", self.stderr)?;
        }
        Ok(())
    }
}

/// Errors produced while fetching market data.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The configuration was rejected before any filesystem or git work.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The git executable could not be found or refused to run.
    #[error("git is not available: {0}")]
    GitUnavailable(String),

    /// The sparse clone (or its sparse-checkout re-initialization) failed.
    #[error("sparse clone failed: {0}")]
    CloneFailed(GitFailure),

    /// Registering a sparse checkout pattern failed.
    #[error("failed to register sparse pattern {pattern:?}: {failure}")]
    PatternRegistrationFailed { pattern: String, failure: GitFailure },

    /// The final checkout that materializes the selected files failed.
    #[error("checkout failed: {0}")]
    CheckoutFailed(GitFailure),

    /// Filesystem work outside of git failed.
    #[error("filesystem error on {}: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FetchError {
    /// Process exit code for this failure: git's own exit code where one
    /// was captured, 2 for configuration problems, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            FetchError::Config(_) => 2,
            FetchError::CloneFailed(failure)
            | FetchError::CheckoutFailed(failure)
            | FetchError::PatternRegistrationFailed { failure, .. } => failure.code.unwrap_or(1),
            _ => 1,
        }
    }
}
