//! Fetch pipeline
//!
//! Drives the sparse checkout lifecycle against the data repository:
//! reset the target directory, clone without blobs or checkout, switch the
//! sparse rules to pattern mode, register the derived patterns, then
//! materialize the working tree. The stages run strictly in order and the
//! first git failure aborts the run.

use std::fs;
use std::io;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::config::FetchConfig;
use crate::error::FetchError;
use crate::git::{GitClient, GitRunner};
use crate::pattern::PatternPlan;

/// Counts from a completed fetch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOutcome {
    pub primary_patterns: usize,
    pub helper_patterns: usize,
}

impl FetchOutcome {
    pub fn patterns_registered(&self) -> usize {
        self.primary_patterns + self.helper_patterns
    }
}

/// Orchestrates one fetch run against a validated configuration.
pub struct DataFetcher<'a, R> {
    config: &'a FetchConfig,
    git: GitClient<R>,
}

impl<'a, R: GitRunner> DataFetcher<'a, R> {
    pub fn new(config: &'a FetchConfig, runner: R) -> Self {
        Self {
            config,
            git: GitClient::new(runner),
        }
    }

    /// Run the full pipeline. Re-running is safe: the target directory is
    /// reset first, so every run starts from the same state.
    pub async fn fetch(&self) -> Result<FetchOutcome, FetchError> {
        let plan = PatternPlan::derive(self.config);

        // Probe git before touching the existing data directory.
        let version = self.git.version().await?;
        info!("Using {}", version);

        self.reset_target()?;
        self.initialize_clone().await?;
        self.register_patterns("primary", &plan.primary).await?;
        self.register_patterns("helper", &plan.helper).await?;
        self.materialize().await?;

        info!(
            "Sparse checkout complete: {} patterns registered",
            plan.total()
        );
        Ok(FetchOutcome {
            primary_patterns: plan.primary.len(),
            helper_patterns: plan.helper.len(),
        })
    }

    /// Remove any previous clone so the upcoming clone sees a clean slate.
    fn reset_target(&self) -> Result<(), FetchError> {
        let dir = &self.config.data_dir;
        if dir.exists() {
            info!("Removing previous data directory {}", dir.display());
            fs::remove_dir_all(dir).map_err(|e| FetchError::Filesystem {
                path: dir.clone(),
                source: e,
            })?;
        } else {
            info!("No previous data directory at {}", dir.display());
        }
        if dir.exists() {
            return Err(FetchError::Filesystem {
                path: dir.clone(),
                source: io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    "target directory still present after reset",
                ),
            });
        }
        Ok(())
    }

    async fn initialize_clone(&self) -> Result<(), FetchError> {
        info!(
            "Cloning {} into {} (no blobs, no checkout, depth 1)",
            self.config.repo_url,
            self.config.data_dir.display()
        );
        self.git
            .sparse_clone(&self.config.repo_url, &self.config.data_dir)
            .await?;

        info!("Switching sparse checkout to pattern matching");
        self.git
            .sparse_checkout_init_no_cone(&self.config.data_dir)
            .await?;
        Ok(())
    }

    async fn register_patterns(
        &self,
        label: &str,
        patterns: &[String],
    ) -> Result<(), FetchError> {
        if patterns.is_empty() {
            info!("No {} timeframe patterns to register", label);
            return Ok(());
        }

        info!(
            "Registering {} {} timeframe patterns",
            patterns.len(),
            label
        );
        let progress_bar = ProgressBar::new(patterns.len() as u64);
        progress_bar.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} patterns - {msg}")
                .unwrap()
                .progress_chars("#>-"),
        );

        for pattern in patterns {
            progress_bar.set_message(pattern.clone());
            if let Err(e) = self
                .git
                .sparse_checkout_add(&self.config.data_dir, pattern)
                .await
            {
                progress_bar.finish_with_message("Registration failed!");
                return Err(e);
            }
            progress_bar.inc(1);
        }
        progress_bar.finish_with_message(format!("{} {} patterns registered", patterns.len(), label));
        Ok(())
    }

    async fn materialize(&self) -> Result<(), FetchError> {
        info!(
            "Materializing selected files into {}",
            self.config.data_dir.display()
        );
        self.git.checkout(&self.config.data_dir).await
    }
}
