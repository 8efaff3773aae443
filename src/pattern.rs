//! Sparse checkout pattern derivation
//!
//! Pure string work with no filesystem or git access. Every configured
//! (exchange, trading mode, timeframe) combination maps to one non-cone
//! sparse checkout pattern selecting the feather files for that market.

use std::collections::HashSet;

use crate::config::FetchConfig;

/// Repository subdirectory for an exchange and trading mode.
///
/// Spot data lives directly under the exchange directory, futures data in
/// a `futures` subdirectory, e.g. `binance` vs `binance/futures`.
pub fn market_subdir(exchange: &str, trading_mode: &str) -> String {
    if trading_mode == "futures" {
        format!("{}/futures", exchange)
    } else {
        exchange.to_string()
    }
}

/// Root-anchored sparse checkout pattern for one market and timeframe,
/// e.g. `/binance/futures/*-5m*.feather`.
///
/// The timeframe is matched as an infix so that suffixed futures files
/// (funding rate, mark price) are selected along with the plain candles.
pub fn sparse_pattern(exchange: &str, trading_mode: &str, timeframe: &str) -> String {
    format!(
        "/{}/*-{}*.feather",
        market_subdir(exchange, trading_mode),
        timeframe
    )
}

/// Expand every (exchange, trading mode, timeframe) combination into its
/// pattern, exchange outermost and timeframe innermost, dropping duplicates
/// while keeping the first occurrence.
///
/// Duplicates arise when two trading modes map to the same directory; the
/// registration is additive, so repeating a pattern would only waste a git
/// invocation.
pub fn expand_patterns(
    exchanges: &[String],
    trading_modes: &[String],
    timeframes: &[String],
) -> Vec<String> {
    let mut patterns = Vec::new();
    let mut seen = HashSet::new();
    for exchange in exchanges {
        for trading_mode in trading_modes {
            for timeframe in timeframes {
                let pattern = sparse_pattern(exchange, trading_mode, timeframe);
                if seen.insert(pattern.clone()) {
                    patterns.push(pattern);
                }
            }
        }
    }
    patterns
}

/// Full registration plan for one fetch run: primary timeframe patterns
/// first, then the helper timeframe patterns not already covered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternPlan {
    pub primary: Vec<String>,
    pub helper: Vec<String>,
}

impl PatternPlan {
    /// Derive the plan from a validated configuration.
    pub fn derive(config: &FetchConfig) -> PatternPlan {
        let primary = expand_patterns(
            &config.exchanges,
            &config.trading_modes,
            &config.timeframes,
        );
        let helper_all = expand_patterns(
            &config.exchanges,
            &config.trading_modes,
            &config.helper_timeframes,
        );
        let primary_set: HashSet<&String> = primary.iter().collect();
        let helper = helper_all
            .into_iter()
            .filter(|pattern| !primary_set.contains(pattern))
            .collect();
        PatternPlan { primary, helper }
    }

    /// Number of patterns the plan will register.
    pub fn total(&self) -> usize {
        self.primary.len() + self.helper.len()
    }

    /// All patterns in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.primary
            .iter()
            .chain(self.helper.iter())
            .map(String::as_str)
    }
}
