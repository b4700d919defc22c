use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::{ToSqlOutput, Value as SqlValue, ValueRef};
use rusqlite::ToSql;

/// Core value types for column fields.
///
/// `Date` holds a calendar date only; converting from a timestamp truncates
/// the time of day, and dates are rendered as `YYYY-MM-DD` literals in SQL.
/// This is a deliberate, lossy simplification.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    Boolean(bool),
    Date(NaiveDate),
}

impl Value {
    /// Render as a SQL literal for WHERE-clause construction.
    ///
    /// Text is single-quoted with embedded quotes doubled; dates become
    /// quoted `YYYY-MM-DD` strings; blobs use `X'..'` hex notation.
    pub fn to_sql_literal(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Real(r) => r.to_string(),
            Value::Text(s) => format!("'{}'", s.replace('\'', "''")),
            Value::Blob(b) => {
                let hex: String = b.iter().map(|byte| format!("{byte:02X}")).collect();
                format!("X'{hex}'")
            }
            Value::Boolean(b) => if *b { "1" } else { "0" }.to_string(),
            Value::Date(d) => format!("'{}'", d.format("%Y-%m-%d")),
        }
    }

    /// Truthiness in the delete-predicate sense: zero, empty text, empty
    /// blobs, `false` and NULL do not count.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Integer(i) => *i != 0,
            Value::Real(r) => *r != 0.0,
            Value::Text(s) => !s.is_empty(),
            Value::Blob(b) => !b.is_empty(),
            Value::Boolean(b) => *b,
            Value::Date(_) => true,
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Integer(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            Value::Real(r) => ToSqlOutput::Owned(SqlValue::Real(*r)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
            Value::Boolean(b) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*b))),
            Value::Date(d) => {
                ToSqlOutput::Owned(SqlValue::Text(d.format("%Y-%m-%d").to_string()))
            }
        })
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Date(v.date())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literals_render_deterministically() {
        assert_eq!(Value::Integer(7).to_sql_literal(), "7");
        assert_eq!(Value::Real(1.5).to_sql_literal(), "1.5");
        assert_eq!(Value::Text("it's".into()).to_sql_literal(), "'it''s'");
        assert_eq!(Value::Boolean(true).to_sql_literal(), "1");
        assert_eq!(Value::Null.to_sql_literal(), "NULL");
        assert_eq!(Value::Blob(vec![0xAB, 0x01]).to_sql_literal(), "X'AB01'");
        let d = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(Value::Date(d).to_sql_literal(), "'2024-03-09'");
    }

    #[test]
    fn datetime_conversion_truncates_to_day() {
        let dt = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(13, 45, 12)
            .unwrap();
        assert_eq!(
            Value::from(dt),
            Value::Date(NaiveDate::from_ymd_opt(2024, 3, 9).unwrap())
        );
    }

    #[test]
    fn truthiness_excludes_zero_and_empty() {
        assert!(!Value::Integer(0).is_truthy());
        assert!(!Value::Real(0.0).is_truthy());
        assert!(!Value::Text(String::new()).is_truthy());
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Boolean(false).is_truthy());
        assert!(Value::Integer(-1).is_truthy());
        assert!(Value::Text("x".into()).is_truthy());
        assert!(Value::Date(NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()).is_truthy());
    }
}
