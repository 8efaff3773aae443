//! Fetch configuration
//!
//! Turns the raw whitespace-separated selection lists from the CI
//! environment (`EXCHANGE`, `TRADING_MODE`, `TIMEFRAME`,
//! `HELPER_TIME_FRAMES`) into a validated configuration. All rejection
//! happens here, before any filesystem or git work starts.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::Serialize;

use crate::error::FetchError;

/// Default remote repository holding the historical candle data.
pub const DEFAULT_REPO_URL: &str = "https://github.com/iterativv/NostalgiaForInfinityData";

/// Default clone target, matching the freqtrade data directory layout.
pub const DEFAULT_DATA_DIR: &str = "user_data/data";

/// Validated selection of market data to fetch.
#[derive(Debug, Clone, Serialize)]
pub struct FetchConfig {
    /// Exchange directories to select, e.g. `["binance", "kucoin"]`
    pub exchanges: Vec<String>,
    /// Trading modes to select, `"spot"` and/or `"futures"`
    pub trading_modes: Vec<String>,
    /// Timeframes the strategy trades on, e.g. `["5m"]`
    pub timeframes: Vec<String>,
    /// Additional informative timeframes, e.g. `["15m", "1h", "4h", "1d"]`
    pub helper_timeframes: Vec<String>,
    /// Remote repository URL to clone from
    pub repo_url: String,
    /// Local directory the data is materialized into
    pub data_dir: PathBuf,
}

impl FetchConfig {
    /// Build a configuration from the raw whitespace-separated lists.
    ///
    /// Splitting follows shell word splitting: runs of whitespace collapse
    /// and leading/trailing whitespace is ignored. Duplicate tokens are
    /// dropped, keeping the first occurrence. `helper_time_frames` may be
    /// empty, the other lists must each yield at least one token.
    pub fn from_lists(
        exchange: &str,
        trading_mode: &str,
        timeframe: &str,
        helper_time_frames: &str,
        repo_url: String,
        data_dir: PathBuf,
    ) -> Result<FetchConfig, FetchError> {
        let exchanges = split_list(exchange);
        let trading_modes = split_list(trading_mode);
        let timeframes = split_list(timeframe);
        let helper_timeframes = split_list(helper_time_frames);

        if exchanges.is_empty() {
            return Err(FetchError::Config(
                "EXCHANGE must list at least one exchange".to_string(),
            ));
        }
        if trading_modes.is_empty() {
            return Err(FetchError::Config(
                "TRADING_MODE must list at least one trading mode".to_string(),
            ));
        }
        if timeframes.is_empty() {
            return Err(FetchError::Config(
                "TIMEFRAME must list at least one timeframe".to_string(),
            ));
        }

        for exchange in &exchanges {
            if !is_valid_exchange(exchange) {
                return Err(FetchError::Config(format!(
                    "invalid exchange name {:?}: expected lowercase letters, digits, '-' or '_'",
                    exchange
                )));
            }
        }
        for trading_mode in &trading_modes {
            if trading_mode != "spot" && trading_mode != "futures" {
                return Err(FetchError::Config(format!(
                    "unknown trading mode {:?}: expected \"spot\" or \"futures\"",
                    trading_mode
                )));
            }
        }
        for timeframe in timeframes.iter().chain(helper_timeframes.iter()) {
            if !is_valid_timeframe(timeframe) {
                return Err(FetchError::Config(format!(
                    "invalid timeframe {:?}: expected digits followed by one of m, h, d, w, M",
                    timeframe
                )));
            }
        }

        if repo_url.trim().is_empty() {
            return Err(FetchError::Config(
                "DATA_REPO_URL must not be empty".to_string(),
            ));
        }
        if data_dir.as_os_str().is_empty() {
            return Err(FetchError::Config("DATA_DIR must not be empty".to_string()));
        }
        if data_dir.parent().is_none() {
            return Err(FetchError::Config(format!(
                "DATA_DIR must not be a filesystem root, got {:?}",
                data_dir
            )));
        }

        Ok(FetchConfig {
            exchanges,
            trading_modes,
            timeframes,
            helper_timeframes,
            repo_url,
            data_dir,
        })
    }
}

/// Split a raw list on whitespace, dropping duplicate tokens.
fn split_list(raw: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut seen = HashSet::new();
    for token in raw.split_whitespace() {
        if seen.insert(token) {
            tokens.push(token.to_string());
        }
    }
    tokens
}

/// Exchange directory names are lowercase ascii with digits, '-' and '_'.
fn is_valid_exchange(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
}

/// Timeframes are a positive number of minutes, hours, days, weeks or
/// months, e.g. `5m`, `1h`, `4h`, `1d`, `1w`, `1M`.
fn is_valid_timeframe(timeframe: &str) -> bool {
    let Some(unit) = timeframe.chars().last() else {
        return false;
    };
    if !matches!(unit, 'm' | 'h' | 'd' | 'w' | 'M') {
        return false;
    }
    let digits = &timeframe[..timeframe.len() - unit.len_utf8()];
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}
