//! SQL generation for the success-rates aggregate.
//!
//! For two file sources and a bucket size of 50 the generated query is:
//!
//! ```sql
//! SELECT
//!     vehicle_type,
//!     AVG(CASE WHEN distance BETWEEN 1 AND 50 THEN detection::INT END) AS from1to50,
//!     AVG(CASE WHEN distance BETWEEN 51 AND 100 THEN detection::INT END) AS from51to100
//! FROM (
//!     SELECT * FROM 'a.parquet'
//!     UNION ALL
//!     SELECT * FROM 'b.parquet'
//! ) AS detections
//! GROUP BY vehicle_type;
//! ```
//!
//! Identifiers are never spliced in raw: file paths become string literals
//! and table names become quoted identifiers.

use success_rates_models::{Bucket, VEHICLE_TYPE_COLUMN};

use crate::Sources;

/// Alias of the unioned row set.
const UNION_ALIAS: &str = "detections";

/// Builds the aggregate query over `sources`, with one average column per
/// bucket.
#[must_use]
pub fn build_query(sources: &Sources<'_>, buckets: &[Bucket]) -> String {
    let mut columns = Vec::with_capacity(buckets.len() + 1);
    columns.push(VEHICLE_TYPE_COLUMN.to_string());
    columns.extend(buckets.iter().map(bucket_average));

    let scans: Vec<String> = match sources {
        Sources::Files(paths) => paths
            .iter()
            .map(|path| format!("SELECT * FROM {}", quote_literal(&path.to_string_lossy())))
            .collect(),
        Sources::Tables { names, .. } => names
            .iter()
            .map(|name| format!("SELECT * FROM {}", quote_qualified_identifier(name)))
            .collect(),
    };

    format!(
        "SELECT\n    {}\nFROM (\n    {}\n) AS {UNION_ALIAS}\nGROUP BY {VEHICLE_TYPE_COLUMN};",
        columns.join(",\n    "),
        scans.join("\n    UNION ALL\n    "),
    )
}

/// Average of the detection flag over rows inside `bucket`. Rows outside
/// the bucket produce `NULL` and are skipped by `AVG`.
fn bucket_average(bucket: &Bucket) -> String {
    format!(
        "AVG(CASE WHEN distance BETWEEN {} AND {} THEN detection::INT END) AS {}",
        bucket.start,
        bucket.end,
        bucket.column_name()
    )
}

/// Quotes `value` as a SQL string literal.
fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Quotes `name` as an identifier, one part per `.`-separated segment.
///
/// Dots are never part of a name: `a.b` is table `b` in schema `a`, and a
/// table literally called `a.b` has no spelling that reaches it.
fn quote_qualified_identifier(name: &str) -> String {
    name.split('.')
        .map(|part| format!("\"{}\"", part.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use success_rates_models::{MAX_DISTANCE, partition};

    use super::*;

    #[test]
    fn builds_file_query() {
        let sources = Sources::Files(vec![PathBuf::from("a.parquet"), PathBuf::from("b.parquet")]);
        let buckets = partition(50, MAX_DISTANCE).unwrap();

        assert_eq!(
            build_query(&sources, &buckets),
            "SELECT
    vehicle_type,
    AVG(CASE WHEN distance BETWEEN 1 AND 50 THEN detection::INT END) AS from1to50,
    AVG(CASE WHEN distance BETWEEN 51 AND 100 THEN detection::INT END) AS from51to100
FROM (
    SELECT * FROM 'a.parquet'
    UNION ALL
    SELECT * FROM 'b.parquet'
) AS detections
GROUP BY vehicle_type;"
        );
    }

    #[test]
    fn one_average_per_bucket() {
        let sources = Sources::Files(vec![PathBuf::from("runs.csv")]);
        let buckets = partition(30, MAX_DISTANCE).unwrap();
        let query = build_query(&sources, &buckets);

        assert_eq!(query.matches("AVG(").count(), 4);
        assert!(query.contains("BETWEEN 91 AND 100 THEN detection::INT END) AS from91to100"));
        assert!(!query.contains("UNION ALL"));
    }

    #[test]
    fn escapes_file_paths() {
        assert_eq!(quote_literal("it's.csv"), "'it''s.csv'");
        assert_eq!(
            quote_literal("x'; DROP TABLE t; --"),
            "'x''; DROP TABLE t; --'"
        );
    }

    #[test]
    fn quotes_table_names() {
        assert_eq!(quote_qualified_identifier("interview_table"), "\"interview_table\"");
        assert_eq!(quote_qualified_identifier("fleet.detections"), "\"fleet\".\"detections\"");
        assert_eq!(quote_qualified_identifier("odd\"name"), "\"odd\"\"name\"");
    }

    #[test]
    fn dots_always_separate_qualifiers() {
        assert_eq!(
            quote_qualified_identifier("memory.fleet.detections"),
            "\"memory\".\"fleet\".\"detections\""
        );
        assert_eq!(quote_qualified_identifier("\"a.b\""), "\"\"\"a\".\"b\"\"\"");
    }
}
