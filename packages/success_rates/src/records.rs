//! Maps query tables onto [`ResultRecord`]s.

use duckdb::types::Value;
use success_rates_models::{RecordValue, ResultRecord};

use crate::SuccessRatesError;
use crate::executor::QueryTable;

/// Turns every row of `table` into a record keyed by column name. Row and
/// column order are kept; an empty table gives an empty vector.
///
/// # Errors
///
/// Returns [`SuccessRatesError::Conversion`] if a cell has a type with no
/// [`RecordValue`] counterpart (lists, structs, blobs, dates, ...).
pub fn to_records(table: QueryTable) -> Result<Vec<ResultRecord>, SuccessRatesError> {
    let QueryTable { columns, rows } = table;

    rows.into_iter()
        .map(|row| {
            columns
                .iter()
                .cloned()
                .zip(row)
                .map(|(column, value)| to_record_value(value).map(|value| (column, value)))
                .collect::<Result<ResultRecord, _>>()
        })
        .collect()
}

fn to_record_value(value: Value) -> Result<RecordValue, SuccessRatesError> {
    Ok(match value {
        Value::Null => RecordValue::Null,
        Value::Boolean(b) => RecordValue::Boolean(b),
        Value::TinyInt(i) => RecordValue::Integer(i.into()),
        Value::SmallInt(i) => RecordValue::Integer(i.into()),
        Value::Int(i) => RecordValue::Integer(i.into()),
        Value::BigInt(i) => RecordValue::Integer(i),
        Value::UTinyInt(i) => RecordValue::Integer(i.into()),
        Value::USmallInt(i) => RecordValue::Integer(i.into()),
        Value::UInt(i) => RecordValue::Integer(i.into()),
        Value::UBigInt(i) => RecordValue::Integer(out_of_range(i64::try_from(i), i)?),
        Value::HugeInt(i) => RecordValue::Integer(out_of_range(i64::try_from(i), i)?),
        Value::Float(f) => RecordValue::Float(f.into()),
        Value::Double(f) => RecordValue::Float(f),
        Value::Text(s) | Value::Enum(s) => RecordValue::Text(s),
        other => {
            return Err(SuccessRatesError::Conversion {
                message: format!("unsupported result value {other:?}"),
            });
        }
    })
}

fn out_of_range<T: std::fmt::Display, E>(
    result: Result<i64, E>,
    original: T,
) -> Result<i64, SuccessRatesError> {
    result.map_err(|_| SuccessRatesError::Conversion {
        message: format!("integer {original} does not fit in i64"),
    })
}

/// Renders records as a JSON array of objects using [`ResultRecord`]'s
/// `Serialize` impl. Non-finite floats become `null`.
///
/// # Errors
///
/// Returns a [`serde_json::Error`] if serialization fails.
pub fn to_json(records: &[ResultRecord]) -> Result<serde_json::Value, serde_json::Error> {
    serde_json::to_value(records)
}
