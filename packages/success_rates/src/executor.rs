//! Query execution and backend error classification.

use std::path::{Component, Path, PathBuf};

use duckdb::Connection;
use duckdb::types::Value;
use strum_macros::{AsRefStr, EnumString};

use crate::{Sources, SuccessRatesError};

/// Raw query output: column names and rows of backend values, both in the
/// order the engine produced them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryTable {
    /// Column names.
    pub columns: Vec<String>,
    /// One entry per row, one value per column.
    pub rows: Vec<Vec<Value>>,
}

/// Runs `query` on `conn` and collects the full result.
///
/// # Errors
///
/// Returns the backend's [`duckdb::Error`] untouched; see
/// [`translate_error`] for classification.
pub fn execute(conn: &Connection, query: &str) -> Result<QueryTable, duckdb::Error> {
    let mut stmt = conn.prepare(query)?;
    stmt.raw_execute()?;

    let columns = stmt.column_names();
    let mut table = QueryTable {
        columns,
        rows: Vec::new(),
    };

    let mut rows = stmt.raw_query();
    while let Some(row) = rows.next()? {
        let values = (0..table.columns.len())
            .map(|idx| row.get::<_, Value>(idx))
            .collect::<Result<Vec<_>, _>>()?;
        table.rows.push(values);
    }

    Ok(table)
}

/// Error class taken from the prefix of a `DuckDB` error message
/// (`"Catalog Error: ..."`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr)]
pub enum BackendErrorClass {
    /// Unknown table, or a path no replacement scan recognizes.
    #[strum(serialize = "Catalog")]
    Catalog,
    /// A file couldn't be found or opened.
    #[strum(serialize = "IO")]
    Io,
    /// Input the engine couldn't parse, e.g. a failed CSV sniff.
    #[strum(serialize = "Invalid Input")]
    InvalidInput,
    /// Unknown column or type mismatch. Also raised for a path no reader
    /// claims (`No extension found that is capable of reading the file`).
    #[strum(serialize = "Binder")]
    Binder,
    /// Malformed SQL.
    #[strum(serialize = "Parser")]
    Parser,
    /// Value cast failure.
    #[strum(serialize = "Conversion")]
    Conversion,
    /// The reader for a file's format lives in an extension that isn't
    /// compiled in and couldn't be installed.
    #[strum(serialize = "Extension Autoloading")]
    ExtensionAutoloading,
}

impl BackendErrorClass {
    /// Classifies `error` by its message prefix. `None` for errors that
    /// don't carry one of the known prefixes.
    #[must_use]
    pub fn of(error: &duckdb::Error) -> Option<Self> {
        Self::from_message(&error.to_string())
    }

    fn from_message(message: &str) -> Option<Self> {
        let (prefix, _) = message.split_once(" Error:")?;
        prefix.trim().parse().ok()
    }

    /// Whether a failure of this class, with this message, can mean a file
    /// source exists but has content the engine can't read.
    fn is_unreadable_file(self, message: &str) -> bool {
        match self {
            Self::Catalog | Self::InvalidInput | Self::ExtensionAutoloading => true,
            Self::Binder => message.contains(NO_READER_MESSAGE),
            Self::Io | Self::Parser | Self::Conversion => false,
        }
    }
}

/// Part of the binder message `DuckDB` gives for a path none of its readers
/// claims, e.g. a `.txt` file.
const NO_READER_MESSAGE: &str = "capable of reading";

/// Characters that make `DuckDB` expand a file path as a glob.
const GLOB_CHARS: [char; 3] = ['*', '?', '['];

/// Maps a backend failure onto a domain error.
///
/// * tables + catalog failure: [`SuccessRatesError::TableNotFound`]
/// * files + IO failure: [`SuccessRatesError::FileNotFound`]
/// * files + catalog, invalid-input or extension-autoloading failure, or a
///   binder failure because no reader claims the file:
///   [`SuccessRatesError::FileNotFound`] if any listed path is missing on
///   disk, otherwise [`SuccessRatesError::UnsupportedFileFormat`]
///
/// Glob paths (`runs/*.parquet`) are expanded by the engine, so only the
/// directory in front of the first wildcard is checked for existence.
///
/// Everything else, including binder failures about the data itself (a
/// missing `vehicle_type` column), is returned as
/// [`SuccessRatesError::Database`] unchanged.
#[must_use]
pub fn translate_error(error: duckdb::Error, sources: &Sources<'_>) -> SuccessRatesError {
    let message = error.to_string();
    let Some(class) = BackendErrorClass::from_message(&message) else {
        return error.into();
    };
    log::debug!("Backend {} error for {sources:?}: {message}", class.as_ref());

    match (sources, class) {
        (Sources::Tables { .. }, BackendErrorClass::Catalog) => {
            SuccessRatesError::TableNotFound { message }
        }
        (Sources::Files(_), BackendErrorClass::Io) => SuccessRatesError::FileNotFound { message },
        (Sources::Files(paths), class) if class.is_unreadable_file(&message) => {
            match first_missing(paths) {
                Some(path) => SuccessRatesError::FileNotFound {
                    message: format!("{}: {message}", path.display()),
                },
                None => SuccessRatesError::UnsupportedFileFormat { message },
            }
        }
        _ => error.into(),
    }
}

/// First path that doesn't exist. Paths whose existence can't be checked
/// count as missing.
fn first_missing(paths: &[PathBuf]) -> Option<&Path> {
    paths
        .iter()
        .find(|path| !existence_root(path).try_exists().unwrap_or(false))
        .map(PathBuf::as_path)
}

/// The path itself, or for a glob the directory in front of its first
/// wildcard component (`.` for a relative glob like `*.csv`).
fn existence_root(path: &Path) -> PathBuf {
    let mut root = PathBuf::new();
    for component in path.components() {
        let wildcard = matches!(
            component,
            Component::Normal(part) if part.to_string_lossy().contains(GLOB_CHARS)
        );
        if wildcard {
            if root.as_os_str().is_empty() {
                root.push(".");
            }
            return root;
        }
        root.push(component);
    }
    root
}
