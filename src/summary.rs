//! Data directory summary
//!
//! Walks the materialized data directory and aggregates its feather files
//! per market directory. Backs the `status` subcommand and the optional
//! JSON run report.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use walkdir::WalkDir;

use crate::config::FetchConfig;
use crate::error::FetchError;

/// Aggregated view of one market directory, e.g. `binance` or
/// `binance/futures`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarketSummary {
    pub market: String,
    pub files: usize,
    pub bytes: u64,
}

/// Aggregated view of a whole data directory.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DataSummary {
    pub total_files: usize,
    pub total_bytes: u64,
    pub markets: Vec<MarketSummary>,
}

impl DataSummary {
    /// Scan `data_dir` for feather files, grouping them by the directory
    /// they live in relative to `data_dir`. The `.git` directory of the
    /// clone is skipped.
    pub fn scan(data_dir: &Path) -> Result<DataSummary, FetchError> {
        let mut markets: BTreeMap<String, (usize, u64)> = BTreeMap::new();
        let mut total_files = 0;
        let mut total_bytes = 0;

        let walker = WalkDir::new(data_dir)
            .into_iter()
            .filter_entry(|entry| entry.file_name() != std::ffi::OsStr::new(".git"));
        for entry in walker {
            let entry = entry.map_err(|e| walk_error(data_dir, e))?;
            if !entry.file_type().is_file() {
                continue;
            }
            if entry.path().extension().and_then(|ext| ext.to_str()) != Some("feather") {
                continue;
            }
            let bytes = entry.metadata().map_err(|e| walk_error(data_dir, e))?.len();
            let market = market_key(data_dir, entry.path());
            let slot = markets.entry(market).or_insert((0, 0));
            slot.0 += 1;
            slot.1 += bytes;
            total_files += 1;
            total_bytes += bytes;
        }

        let markets = markets
            .into_iter()
            .map(|(market, (files, bytes))| MarketSummary {
                market,
                files,
                bytes,
            })
            .collect();
        Ok(DataSummary {
            total_files,
            total_bytes,
            markets,
        })
    }
}

/// Market key of a data file: its parent directory relative to the data
/// directory, `.` for files at the top level.
fn market_key(data_dir: &Path, file: &Path) -> String {
    let parent = file.parent().unwrap_or(data_dir);
    let relative = parent.strip_prefix(data_dir).unwrap_or(parent);
    if relative.as_os_str().is_empty() {
        ".".to_string()
    } else {
        relative.to_string_lossy().replace('\\', "/")
    }
}

fn walk_error(data_dir: &Path, err: walkdir::Error) -> FetchError {
    let path = err
        .path()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| data_dir.to_path_buf());
    FetchError::Filesystem {
        path,
        source: err.into(),
    }
}

/// JSON artifact describing one completed fetch run.
#[derive(Debug, Serialize)]
pub struct FetchReport {
    pub fetched_at: DateTime<Utc>,
    pub repo_url: String,
    pub data_dir: PathBuf,
    pub exchanges: Vec<String>,
    pub trading_modes: Vec<String>,
    pub timeframes: Vec<String>,
    pub helper_timeframes: Vec<String>,
    pub patterns_registered: usize,
    pub summary: DataSummary,
}

impl FetchReport {
    pub fn new(config: &FetchConfig, patterns_registered: usize, summary: &DataSummary) -> Self {
        FetchReport {
            fetched_at: Utc::now(),
            repo_url: config.repo_url.clone(),
            data_dir: config.data_dir.clone(),
            exchanges: config.exchanges.clone(),
            trading_modes: config.trading_modes.clone(),
            timeframes: config.timeframes.clone(),
            helper_timeframes: config.helper_timeframes.clone(),
            patterns_registered,
            summary: summary.clone(),
        }
    }
}
