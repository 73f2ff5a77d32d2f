//! Conversion between JSON values and SQLite storage classes

use crate::error::{CompositorError, CompositorResult};
use rusqlite::types::{Value as SqlValue, ValueRef};
use serde_json::{Map, Number, Value};

/// One fetched row, in projected column order
pub type Row = Vec<Value>;

/// One fetched row keyed by column name
pub type MappedRow = Map<String, Value>;

/// Convert a JSON value into the SQLite value that gets bound.
///
/// Booleans become integers; arrays and objects are stored as JSON text.
pub fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => n.as_f64().map(SqlValue::Real).unwrap_or(SqlValue::Null),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

/// Reject values SQLite cannot store losslessly. Integers above
/// `i64::MAX` have no INTEGER representation.
pub fn check_bindable(column: &str, value: &Value) -> CompositorResult<()> {
    match value {
        Value::Number(n) if n.is_u64() && n.as_i64().is_none() => Err(CompositorError::InvalidInput(
            format!("Value {n} for column {column} is out of the 64-bit signed integer range"),
        )),
        _ => Ok(()),
    }
}

/// Convert a fetched SQLite value into JSON. Blobs become lowercase hex.
pub fn from_sql_ref(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(hex::encode(bytes)),
    }
}

/// Key a positional row by column name
pub fn map_row(columns: &[String], row: Row) -> MappedRow {
    columns.iter().cloned().zip(row).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_to_sql_value() {
        assert_eq!(to_sql_value(&json!(null)), SqlValue::Null);
        assert_eq!(to_sql_value(&json!(true)), SqlValue::Integer(1));
        assert_eq!(to_sql_value(&json!(42)), SqlValue::Integer(42));
        assert_eq!(to_sql_value(&json!(1.5)), SqlValue::Real(1.5));
        assert_eq!(to_sql_value(&json!("hi")), SqlValue::Text("hi".into()));
        assert_eq!(
            to_sql_value(&json!({"a": 1})),
            SqlValue::Text("{\"a\":1}".into())
        );
    }

    #[test]
    fn test_check_bindable() {
        assert!(check_bindable("n", &json!(i64::MAX)).is_ok());
        assert!(check_bindable("n", &json!(i64::MIN)).is_ok());
        assert!(check_bindable("n", &json!(1.5e300)).is_ok());

        let err = check_bindable("n", &json!(u64::MAX)).unwrap_err();
        assert!(matches!(err, CompositorError::InvalidInput(_)));
        assert!(err.to_string().contains("18446744073709551615"));
    }

    #[test]
    fn test_from_sql_ref() {
        assert_eq!(from_sql_ref(ValueRef::Integer(7)), json!(7));
        assert_eq!(from_sql_ref(ValueRef::Real(f64::NAN)), Value::Null);
        assert_eq!(from_sql_ref(ValueRef::Text(b"abc")), json!("abc"));
        assert_eq!(from_sql_ref(ValueRef::Blob(&[0xde, 0xad])), json!("dead"));
    }

    #[test]
    fn test_map_row_stops_at_shorter_side() {
        let columns = vec!["a".to_string(), "b".to_string()];
        let mapped = map_row(&columns, vec![json!(1)]);
        assert_eq!(mapped.len(), 1);
        assert_eq!(mapped["a"], json!(1));
    }
}
