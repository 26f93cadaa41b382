#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Distance buckets and result record types for vehicle detection success
//! rates.
//!
//! Detections are recorded at integer distances in `1..=MAX_DISTANCE`. The
//! distance range is tiled into [`Bucket`]s, and each bucket becomes one
//! `from{start}to{end}` column of a [`ResultRecord`].
//!
//! Distances and bucket sizes are `i64` throughout. Sizes come from callers
//! unchecked, so zero and negative values have to be representable in order
//! to be rejected by [`partition`].

use serde::ser::SerializeMap as _;
use serde::{Serialize, Serializer};

/// Largest distance a detection can be recorded at.
pub const MAX_DISTANCE: i64 = 100;

/// Bucket size used when the caller doesn't pick one.
pub const DEFAULT_BUCKET_SIZE: i64 = 10;

/// Name of the grouping column in every result record.
pub const VEHICLE_TYPE_COLUMN: &str = "vehicle_type";

/// A closed distance interval `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Bucket {
    /// First distance in the bucket (inclusive).
    pub start: i64,
    /// Last distance in the bucket (inclusive).
    pub end: i64,
}

impl Bucket {
    /// Returns the result column name for this bucket, e.g. `from1to50`.
    #[must_use]
    pub fn column_name(&self) -> String {
        format!("from{}to{}", self.start, self.end)
    }

    /// Number of distances covered by this bucket.
    #[must_use]
    pub const fn width(&self) -> i64 {
        self.end - self.start + 1
    }
}

impl std::fmt::Display for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// Error returned when a bucket size falls outside `1..=max_distance`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidBucketSizeError {
    /// The bucket size that was provided.
    pub bucket_size: i64,
    /// The largest bucket size that would have been accepted.
    pub max_distance: i64,
}

impl std::fmt::Display for InvalidBucketSizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Bucket size must be between 1 and {}, got {}",
            self.max_distance, self.bucket_size
        )
    }
}

impl std::error::Error for InvalidBucketSizeError {}

/// Tiles `1..=max_distance` into buckets of `bucket_size` distances.
///
/// Buckets come back in ascending order. The last one is truncated at
/// `max_distance` when `bucket_size` doesn't divide it evenly.
///
/// # Errors
///
/// Returns [`InvalidBucketSizeError`] if `bucket_size` is not in
/// `1..=max_distance`.
pub fn partition(
    bucket_size: i64,
    max_distance: i64,
) -> Result<Vec<Bucket>, InvalidBucketSizeError> {
    if !(1..=max_distance).contains(&bucket_size) {
        return Err(InvalidBucketSizeError {
            bucket_size,
            max_distance,
        });
    }

    let mut buckets = Vec::new();
    let mut start = 1_i64;
    while start <= max_distance {
        buckets.push(Bucket {
            start,
            end: start.saturating_add(bucket_size - 1).min(max_distance),
        });
        let Some(next) = start.checked_add(bucket_size) else {
            break;
        };
        start = next;
    }

    Ok(buckets)
}

/// A single cell of a result record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RecordValue {
    /// SQL `NULL`, e.g. an average over a bucket with no detections.
    Null,
    /// Boolean cell.
    Boolean(bool),
    /// Integer cell.
    Integer(i64),
    /// Floating point cell, e.g. a success rate.
    Float(f64),
    /// Text cell, e.g. the vehicle type.
    Text(String),
}

impl RecordValue {
    /// Returns the value as a float, widening integers. `None` for nulls,
    /// booleans and text.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(value) => Some(*value),
            Self::Integer(value) => Some(*value as f64),
            Self::Null | Self::Boolean(_) | Self::Text(_) => None,
        }
    }

    /// Returns the value as a string slice if it is text.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }

    /// Whether this cell is SQL `NULL`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// One result row: column name to value, in the backend's column order.
///
/// Serializes as a JSON object such as
/// `{"vehicle_type": "car", "from1to50": 0.5, "from51to100": null}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultRecord {
    entries: Vec<(String, RecordValue)>,
}

impl ResultRecord {
    /// Creates an empty record.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Appends a column. Column order is insertion order.
    pub fn push(&mut self, column: impl Into<String>, value: RecordValue) {
        self.entries.push((column.into(), value));
    }

    /// Looks up a column by name.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&RecordValue> {
        self.entries
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// The `vehicle_type` cell, if present and textual.
    #[must_use]
    pub fn vehicle_type(&self) -> Option<&str> {
        self.get(VEHICLE_TYPE_COLUMN).and_then(RecordValue::as_str)
    }

    /// The success rate in `bucket`. Outer `None` means the column is absent,
    /// inner `None` means no detections fell inside the bucket.
    #[must_use]
    pub fn rate(&self, bucket: &Bucket) -> Option<Option<f64>> {
        self.get(&bucket.column_name()).map(RecordValue::as_f64)
    }

    /// Column names in order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// `(column, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RecordValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the record has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, RecordValue)> for ResultRecord {
    fn from_iter<I: IntoIterator<Item = (String, RecordValue)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl Serialize for ResultRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (column, value) in &self.entries {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partitions_evenly_divisible_range() {
        let buckets = partition(50, MAX_DISTANCE).unwrap();
        assert_eq!(
            buckets,
            vec![Bucket { start: 1, end: 50 }, Bucket { start: 51, end: 100 }]
        );
    }

    #[test]
    fn truncates_final_bucket() {
        let buckets = partition(30, MAX_DISTANCE).unwrap();
        let names: Vec<String> = buckets.iter().map(Bucket::column_name).collect();
        assert_eq!(names, ["from1to30", "from31to60", "from61to90", "from91to100"]);
        assert_eq!(buckets[3].width(), 10);
    }

    #[test]
    fn single_bucket_covers_everything() {
        assert_eq!(
            partition(100, MAX_DISTANCE).unwrap(),
            vec![Bucket { start: 1, end: 100 }]
        );
    }

    #[test]
    fn every_valid_size_tiles_the_range() {
        for size in 1..=MAX_DISTANCE {
            let buckets = partition(size, MAX_DISTANCE).unwrap();

            assert_eq!(buckets.first().map(|b| b.start), Some(1), "size {size}");
            assert_eq!(
                buckets.last().map(|b| b.end),
                Some(MAX_DISTANCE),
                "size {size}"
            );
            for pair in buckets.windows(2) {
                assert_eq!(pair[0].end + 1, pair[1].start, "size {size}");
            }
            for bucket in &buckets {
                assert!(bucket.start <= bucket.end, "size {size}: {bucket}");
                assert!(bucket.width() <= size, "size {size}: {bucket}");
            }
        }
    }

    #[test]
    fn rejects_out_of_range_sizes() {
        for size in [i64::MIN, -1, 0, 101, 200, i64::MAX] {
            let err = partition(size, MAX_DISTANCE).unwrap_err();
            assert_eq!(err.bucket_size, size);
            assert_eq!(err.max_distance, MAX_DISTANCE);
        }
    }

    #[test]
    fn bucket_sizes_compare_without_casts() {
        let size: i64 = DEFAULT_BUCKET_SIZE;
        let buckets = partition(size, MAX_DISTANCE).unwrap();

        assert_eq!(buckets.len(), 10);
        assert!(buckets.iter().all(|bucket| bucket.width() == size));
        assert_eq!(buckets.last().map(|b| b.end), Some(MAX_DISTANCE));
    }

    #[test]
    fn partitions_wide_ranges_without_overflow() {
        let buckets = partition(i64::MAX / 2 + 1, i64::MAX).unwrap();
        assert_eq!(
            buckets,
            vec![
                Bucket {
                    start: 1,
                    end: i64::MAX / 2 + 1
                },
                Bucket {
                    start: i64::MAX / 2 + 2,
                    end: i64::MAX
                },
            ]
        );
    }

    #[test]
    fn invalid_bucket_size_message() {
        let err = partition(0, MAX_DISTANCE).unwrap_err();
        assert_eq!(err.to_string(), "Bucket size must be between 1 and 100, got 0");
    }

    #[test]
    fn record_serializes_as_object() {
        let record: ResultRecord = [
            (VEHICLE_TYPE_COLUMN.to_string(), RecordValue::Text("car".into())),
            ("from1to50".to_string(), RecordValue::Float(0.5)),
            ("from51to100".to_string(), RecordValue::Null),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r#"{"vehicle_type":"car","from1to50":0.5,"from51to100":null}"#
        );
    }

    #[test]
    fn record_lookups() {
        let mut record = ResultRecord::new();
        record.push(VEHICLE_TYPE_COLUMN, RecordValue::Text("truck".into()));
        record.push("from1to50", RecordValue::Integer(1));
        record.push("from51to100", RecordValue::Null);

        assert_eq!(record.vehicle_type(), Some("truck"));
        assert_eq!(record.rate(&Bucket { start: 1, end: 50 }), Some(Some(1.0)));
        assert_eq!(record.rate(&Bucket { start: 51, end: 100 }), Some(None));
        assert_eq!(record.rate(&Bucket { start: 1, end: 10 }), None);
        assert_eq!(
            record.columns().collect::<Vec<_>>(),
            [VEHICLE_TYPE_COLUMN, "from1to50", "from51to100"]
        );
    }
}
