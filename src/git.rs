//! Git client
//!
//! Wraps the `git` command line tool behind a small execution seam so the
//! pipeline can be driven by scripted invocations in tests. All transfer
//! mechanics (blob filtering, shallow history, sparse matching) belong to
//! git itself; this module only assembles invocations and interprets their
//! exit status.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::{FetchError, GitFailure};

/// Captured result of one git invocation.
#[derive(Debug, Clone)]
pub struct GitOutput {
    /// Exit code, `None` when git was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl GitOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).trim().to_string()
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_string()
    }

    fn failure(&self) -> GitFailure {
        GitFailure {
            code: self.code,
            stderr: self.stderr_text(),
        }
    }
}

/// Executes git invocations, capturing their output.
///
/// Implemented by [`SystemGit`] in production; tests substitute scripted
/// runners to exercise the pipeline without a git binary.
#[async_trait]
pub trait GitRunner: Send + Sync {
    /// Run git with `args`, optionally inside the working directory `cwd`.
    async fn run(&self, args: &[String], cwd: Option<&Path>) -> io::Result<GitOutput>;
}

/// Runs the real `git` executable.
pub struct SystemGit {
    program: PathBuf,
}

impl SystemGit {
    /// Use the `git` found on `PATH`.
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("git"),
        }
    }

    /// Use an explicit git executable.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for SystemGit {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GitRunner for SystemGit {
    async fn run(&self, args: &[String], cwd: Option<&Path>) -> io::Result<GitOutput> {
        let mut command = Command::new(&self.program);
        command.args(args);
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }
        let output = command.output().await?;
        Ok(GitOutput {
            code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

/// High-level git operations used by the fetch pipeline.
pub struct GitClient<R> {
    runner: R,
}

impl<R: GitRunner> GitClient<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    async fn run_git(&self, args: &[String], cwd: Option<&Path>) -> Result<GitOutput, FetchError> {
        debug!("Running git {}", args.join(" "));
        let output = self
            .runner
            .run(args, cwd)
            .await
            .map_err(|e| FetchError::GitUnavailable(format!("failed to run git: {}", e)))?;
        if !output.stderr.is_empty() {
            debug!("git stderr: {}", output.stderr_text());
        }
        Ok(output)
    }

    /// Probe that a working git executable is present, returning its
    /// version banner.
    pub async fn version(&self) -> Result<String, FetchError> {
        let output = self.run_git(&string_args(&["--version"]), None).await?;
        if !output.success() {
            return Err(FetchError::GitUnavailable(output.stderr_text()));
        }
        Ok(output.stdout_text())
    }

    /// Clone `url` into `dir` without checking anything out: blob download
    /// deferred, history truncated to the latest commit, sparse checkout
    /// enabled from the start.
    pub async fn sparse_clone(&self, url: &str, dir: &Path) -> Result<(), FetchError> {
        let args = string_args(&[
            "clone",
            "--filter=blob:none",
            "--no-checkout",
            "--depth",
            "1",
            "--sparse",
            url,
            &dir.to_string_lossy(),
        ]);
        let output = self.run_git(&args, None).await?;
        if !output.success() {
            return Err(FetchError::CloneFailed(output.failure()));
        }
        Ok(())
    }

    /// Switch the sparse checkout of `dir` to non-cone mode so arbitrary
    /// glob patterns are honored. The toplevel rules installed by the
    /// sparse clone stay in place and are reinterpreted as patterns.
    pub async fn sparse_checkout_init_no_cone(&self, dir: &Path) -> Result<(), FetchError> {
        let args = string_args(&["sparse-checkout", "init", "--no-cone"]);
        let output = self.run_git(&args, Some(dir)).await?;
        if !output.success() {
            return Err(FetchError::CloneFailed(output.failure()));
        }
        Ok(())
    }

    /// Append one pattern to the sparse checkout rules of `dir`.
    pub async fn sparse_checkout_add(&self, dir: &Path, pattern: &str) -> Result<(), FetchError> {
        let args = string_args(&["sparse-checkout", "add", pattern]);
        let output = self.run_git(&args, Some(dir)).await?;
        if !output.success() {
            return Err(FetchError::PatternRegistrationFailed {
                pattern: pattern.to_string(),
                failure: output.failure(),
            });
        }
        Ok(())
    }

    /// Materialize the working tree of `dir` according to the registered
    /// sparse checkout rules, downloading the matching blobs.
    pub async fn checkout(&self, dir: &Path) -> Result<(), FetchError> {
        let args = string_args(&["checkout"]);
        let output = self.run_git(&args, Some(dir)).await?;
        if !output.success() {
            return Err(FetchError::CheckoutFailed(output.failure()));
        }
        Ok(())
    }
}

fn string_args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|part| part.to_string()).collect()
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// One recorded git invocation.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) struct RecordedCall {
        pub args: Vec<String>,
        pub cwd: Option<PathBuf>,
    }

    /// Scripted [`GitRunner`]: answers invocations from a queue and records
    /// every call. Once the queue is exhausted every invocation succeeds
    /// with empty output.
    pub(crate) struct ScriptedGit {
        pub calls: Arc<Mutex<Vec<RecordedCall>>>,
        responses: Mutex<VecDeque<io::Result<GitOutput>>>,
    }

    impl ScriptedGit {
        pub fn succeeding() -> Self {
            Self::with_responses(Vec::new())
        }

        pub fn with_responses(responses: Vec<io::Result<GitOutput>>) -> Self {
            Self {
                calls: Arc::new(Mutex::new(Vec::new())),
                responses: Mutex::new(responses.into()),
            }
        }

        pub fn ok() -> GitOutput {
            GitOutput {
                code: Some(0),
                stdout: Vec::new(),
                stderr: Vec::new(),
            }
        }

        pub fn failed(code: i32, stderr: &str) -> GitOutput {
            GitOutput {
                code: Some(code),
                stdout: Vec::new(),
                stderr: stderr.as_bytes().to_vec(),
            }
        }
    }

    #[async_trait]
    impl GitRunner for ScriptedGit {
        async fn run(&self, args: &[String], cwd: Option<&Path>) -> io::Result<GitOutput> {
            self.calls.lock().unwrap().push(RecordedCall {
                args: args.to_vec(),
                cwd: cwd.map(Path::to_path_buf),
            });
            match self.responses.lock().unwrap().pop_front() {
                Some(response) => response,
                None => Ok(Self::ok()),
            }
        }
    }
}
