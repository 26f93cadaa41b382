//! Default engine settings, read from the environment.

use std::num::NonZeroUsize;

/// Number of `DuckDB` worker threads for the default engine.
pub const THREADS_ENV: &str = "SUCCESS_RATES_THREADS";

/// `DuckDB` memory limit for the default engine, e.g. `512MB`.
pub const MEMORY_LIMIT_ENV: &str = "SUCCESS_RATES_MEMORY_LIMIT";

/// Settings applied to an engine when it is opened. `None` keeps the
/// `DuckDB` default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineConfig {
    /// Worker thread count.
    pub threads: Option<NonZeroUsize>,
    /// Memory limit in `DuckDB` size syntax (`512MB`, `4GB`, ...).
    pub memory_limit: Option<String>,
}

impl EngineConfig {
    /// Reads [`THREADS_ENV`] and [`MEMORY_LIMIT_ENV`]. Values that don't
    /// parse are logged and ignored.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let threads = lookup(THREADS_ENV).and_then(|raw| {
            raw.trim()
                .parse::<NonZeroUsize>()
                .inspect_err(|e| log::warn!("Ignoring {THREADS_ENV}={raw:?}: {e}"))
                .ok()
        });

        let memory_limit = lookup(MEMORY_LIMIT_ENV).and_then(|raw| {
            let value = raw.trim();
            if is_valid_memory_limit(value) {
                Some(value.to_string())
            } else {
                log::warn!("Ignoring {MEMORY_LIMIT_ENV}={raw:?}: expected a size such as 512MB");
                None
            }
        });

        Self {
            threads,
            memory_limit,
        }
    }

    /// `SET` statements that apply this config, or `None` if there is
    /// nothing to set.
    #[must_use]
    pub fn to_sql(&self) -> Option<String> {
        let mut statements = Vec::new();
        if let Some(threads) = self.threads {
            statements.push(format!("SET threads = {threads};"));
        }
        if let Some(limit) = &self.memory_limit {
            statements.push(format!("SET memory_limit = '{limit}';"));
        }

        if statements.is_empty() {
            None
        } else {
            Some(statements.join("\n"))
        }
    }
}

/// Digits first, then an optional unit made of letters and spaces.
fn is_valid_memory_limit(value: &str) -> bool {
    let unit_start = value
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(value.len());
    let (number, unit) = value.split_at(unit_start);

    number.parse::<f64>().is_ok_and(|n| n > 0.0)
        && unit.chars().all(|c| c.is_ascii_alphabetic() || c == ' ')
}
