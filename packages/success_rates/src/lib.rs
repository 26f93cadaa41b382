#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Vehicle detection success rates per distance bucket.
//!
//! Input rows carry a `vehicle_type`, an integer `distance` in
//! `1..=MAX_DISTANCE` and a boolean-ish `detection` flag. Sources are either
//! files (anything `DuckDB` can scan by path: Parquet, CSV, ...) read through a
//! process-wide default engine, or tables in a caller-owned `DuckDB`
//! connection. All sources are unioned and grouped by vehicle type, producing
//! one average detection rate per distance bucket.
//!
//! ```no_run
//! use success_rates::{QueryRequest, get_success_rates};
//!
//! let request = QueryRequest::files(["data/run_1.parquet", "data/run_2.parquet"])
//!     .with_bucket_size(50);
//! for record in get_success_rates(&request)? {
//!     println!("{}", serde_json::to_string(&record)?);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod engine;
pub mod executor;
pub mod query;
pub mod records;

use std::path::PathBuf;
use std::time::Instant;

use duckdb::Connection;
use thiserror::Error;

pub use success_rates_models::{
    Bucket, DEFAULT_BUCKET_SIZE, InvalidBucketSizeError, MAX_DISTANCE, RecordValue, ResultRecord,
    VEHICLE_TYPE_COLUMN, partition,
};

pub use config::EngineConfig;
pub use executor::{QueryTable, execute, translate_error};
pub use query::build_query;
pub use records::{to_json, to_records};

/// Errors that can occur while computing success rates.
#[derive(Debug, Error)]
pub enum SuccessRatesError {
    /// Bucket size outside `1..=MAX_DISTANCE`. Raised before touching the
    /// database.
    #[error(transparent)]
    InvalidBucketSize(#[from] InvalidBucketSizeError),

    /// A file source doesn't exist or couldn't be opened.
    #[error("File not found: {message}")]
    FileNotFound {
        /// Backend message, prefixed with the offending path when known.
        message: String,
    },

    /// A file source exists but its content isn't a format the engine can
    /// read.
    #[error("Unsupported file format: {message}")]
    UnsupportedFileFormat {
        /// Backend message.
        message: String,
    },

    /// A table reference doesn't exist in the caller's connection.
    #[error("Table not found: {message}")]
    TableNotFound {
        /// Backend message.
        message: String,
    },

    /// The request names no files or tables.
    #[error("No files or tables were given")]
    NoSources,

    /// A result cell had a type that has no [`RecordValue`] counterpart.
    #[error("Conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },

    /// Any other database failure, passed through unchanged.
    #[error("Database error: {0}")]
    Database(#[from] duckdb::Error),
}

/// Where the detection rows come from.
#[derive(Clone)]
pub enum Sources<'conn> {
    /// File paths, scanned by the default engine. Paths containing `*`, `?`
    /// or `[` are expanded as globs by the engine.
    Files(Vec<PathBuf>),
    /// Tables that already exist in `connection`'s catalog.
    Tables {
        /// Caller-owned connection, borrowed for one query.
        connection: &'conn Connection,
        /// Table names, optionally schema-qualified (`schema.table`). Every
        /// `.` separates qualifier parts, so a table whose own name contains a
        /// dot can't be referenced.
        names: Vec<String>,
    },
}

impl Sources<'_> {
    /// Number of files or tables.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Files(paths) => paths.len(),
            Self::Tables { names, .. } => names.len(),
        }
    }

    /// Whether no files or tables were given.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for Sources<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Files(paths) => f.debug_tuple("Files").field(paths).finish(),
            Self::Tables { names, .. } => f
                .debug_struct("Tables")
                .field("names", names)
                .finish_non_exhaustive(),
        }
    }
}

/// A single success-rates computation: the sources plus a bucket size.
#[derive(Debug, Clone)]
pub struct QueryRequest<'conn> {
    sources: Sources<'conn>,
    bucket_size: i64,
}

impl<'conn> QueryRequest<'conn> {
    /// Builds a request over file sources, using [`DEFAULT_BUCKET_SIZE`].
    #[must_use]
    pub fn files<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            sources: Sources::Files(paths.into_iter().map(Into::into).collect()),
            bucket_size: DEFAULT_BUCKET_SIZE,
        }
    }

    /// Builds a request over tables in `connection`, using
    /// [`DEFAULT_BUCKET_SIZE`].
    ///
    /// Names are split on `.` into `catalog.schema.table` parts; see
    /// [`Sources::Tables`].
    #[must_use]
    pub fn tables<I, S>(connection: &'conn Connection, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sources: Sources::Tables {
                connection,
                names: names.into_iter().map(Into::into).collect(),
            },
            bucket_size: DEFAULT_BUCKET_SIZE,
        }
    }

    /// Overrides the bucket size. Validated when the request runs.
    #[must_use]
    pub fn with_bucket_size(mut self, bucket_size: i64) -> Self {
        self.bucket_size = bucket_size;
        self
    }

    /// The requested bucket size.
    #[must_use]
    pub const fn bucket_size(&self) -> i64 {
        self.bucket_size
    }

    /// The requested sources.
    #[must_use]
    pub const fn sources(&self) -> &Sources<'conn> {
        &self.sources
    }
}

/// Computes the detection success rate of each vehicle type in each distance
/// bucket.
///
/// Returns one record per distinct vehicle type, with a `vehicle_type` column
/// followed by one `from{start}to{end}` column per bucket in ascending order.
/// A bucket without any rows for a vehicle type is `null`. Row order is
/// whatever the engine produces.
///
/// # Errors
///
/// * [`SuccessRatesError::InvalidBucketSize`] if the bucket size is not in
///   `1..=MAX_DISTANCE`
/// * [`SuccessRatesError::NoSources`] if no files or tables were given
/// * [`SuccessRatesError::FileNotFound`],
///   [`SuccessRatesError::UnsupportedFileFormat`] or
///   [`SuccessRatesError::TableNotFound`] if a source can't be resolved
/// * [`SuccessRatesError::Database`] for any other database failure
pub fn get_success_rates(
    request: &QueryRequest<'_>,
) -> Result<Vec<ResultRecord>, SuccessRatesError> {
    let buckets = partition(request.bucket_size(), MAX_DISTANCE)?;
    let sources = request.sources();
    if sources.is_empty() {
        return Err(SuccessRatesError::NoSources);
    }

    let query = build_query(sources, &buckets);
    log::debug!("Success rates query over {} source(s):\n{query}", sources.len());

    let started = Instant::now();
    let table = match sources {
        Sources::Tables { connection, .. } => execute(connection, &query),
        Sources::Files(_) => {
            let engine = engine::default_engine()?;
            execute(&engine, &query)
        }
    }
    .map_err(|e| translate_error(e, sources))?;

    log::debug!(
        "Success rates query returned {} row(s) in {:?}",
        table.rows.len(),
        started.elapsed()
    );

    to_records(table)
}
