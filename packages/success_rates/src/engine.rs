//! The process-wide default `DuckDB` engine used for file sources.
//!
//! The engine is an in-memory database opened on first use with
//! [`EngineConfig::from_env`] and kept for the rest of the process. It is
//! never closed explicitly.
//!
//! `duckdb::Connection` is `Send` but not `Sync`, so the engine sits behind a
//! `Mutex`: concurrent callers without their own connection run one at a time
//! and share engine-level state (settings, temporary objects).

use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use duckdb::Connection;

use crate::config::EngineConfig;

static DEFAULT_ENGINE: OnceLock<Mutex<Connection>> = OnceLock::new();

/// Opens a standalone in-memory engine with `config` applied.
///
/// # Errors
///
/// Returns a [`duckdb::Error`] if the database can't be opened or a setting
/// is rejected.
pub fn open(config: &EngineConfig) -> Result<Connection, duckdb::Error> {
    let conn = Connection::open_in_memory()?;
    if let Some(settings) = config.to_sql() {
        conn.execute_batch(&settings)?;
    }
    Ok(conn)
}

/// Locks the default engine, opening it on first use.
///
/// A poisoned lock is recovered: a panicking caller can't leave the
/// connection half-updated on the Rust side.
///
/// # Errors
///
/// Returns a [`duckdb::Error`] if the engine has to be opened and opening
/// fails. The next call tries again.
pub fn default_engine() -> Result<MutexGuard<'static, Connection>, duckdb::Error> {
    let engine = if let Some(engine) = DEFAULT_ENGINE.get() {
        engine
    } else {
        let config = EngineConfig::from_env();
        let conn = open(&config)?;
        log::info!("Opened default DuckDB engine ({config:?})");
        DEFAULT_ENGINE.get_or_init(|| Mutex::new(conn))
    };

    Ok(engine.lock().unwrap_or_else(PoisonError::into_inner))
}
