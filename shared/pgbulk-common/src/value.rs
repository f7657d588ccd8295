//! Column values of generated statements

use std::fmt;

use chrono::NaiveDateTime;
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// Canonical text format for timestamps (PostgreSQL input syntax)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Keys of the single-entry maps that carry typed literals
const TYPED_KEYS: &[&str] = &["uuid", "timestamp"];

/// A primitive literal
///
/// Serialized as the plain JSON value. Strings always stay text, typed
/// literals need an explicit single-entry map:
///
/// ```json
/// {"uuid": "67e55044-10b1-426f-9247-bb680e5fe0c8"}
/// {"timestamp": "2024-01-02T03:04:05"}
/// ```
///
/// Integers outside the `i64` range are rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Uuid(Uuid),
    Timestamp(NaiveDateTime),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// Canonical textual form, without any quoting
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(value) => write!(f, "{}", value),
            Value::Int(value) => write!(f, "{}", value),
            Value::Float(value) => write!(f, "{}", value),
            Value::Uuid(value) => write!(f, "{}", value.hyphenated()),
            Value::Timestamp(value) => write!(f, "{}", value.format(TIMESTAMP_FORMAT)),
            Value::Text(value) => write!(f, "{}", value),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(value) => serializer.serialize_bool(*value),
            Value::Int(value) => serializer.serialize_i64(*value),
            Value::Float(value) => serializer.serialize_f64(*value),
            Value::Text(value) => serializer.serialize_str(value),
            Value::Uuid(value) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("uuid", value)?;
                map.end()
            }
            Value::Timestamp(value) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("timestamp", value)?;
                map.end()
            }
        }
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON scalar or a {\"uuid\"} / {\"timestamp\"} literal")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_bool<E: de::Error>(self, value: bool) -> Result<Value, E> {
        Ok(Value::Bool(value))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Value, E> {
        Ok(Value::Int(value))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Value, E> {
        i64::try_from(value)
            .map(Value::Int)
            .map_err(|_| E::custom(format!("integer {} is out of range", value)))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<Value, E> {
        Ok(Value::Float(value))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Value, E> {
        Ok(Value::Text(value.to_string()))
    }

    fn visit_string<E: de::Error>(self, value: String) -> Result<Value, E> {
        Ok(Value::Text(value))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Value, A::Error> {
        let key: String = map
            .next_key()?
            .ok_or_else(|| de::Error::invalid_length(0, &self))?;
        let value = match key.as_str() {
            "uuid" => Value::Uuid(map.next_value()?),
            "timestamp" => Value::Timestamp(map.next_value()?),
            other => return Err(de::Error::unknown_field(other, TYPED_KEYS)),
        };
        if map.next_key::<String>()?.is_some() {
            return Err(de::Error::invalid_length(2, &self));
        }
        Ok(value)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<Uuid> for Value {
    fn from(value: Uuid) -> Self {
        Value::Uuid(value)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Value::Timestamp(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// The expression assigned to a column in an insert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnExpression {
    /// A literal that can be written to a bulk file
    Primitive(Value),
    /// A raw SQL fragment (function call, sequence lookup, sub select)
    Plain { sql: String },
}

impl ColumnExpression {
    /// Create a literal expression
    pub fn literal(value: impl Into<Value>) -> Self {
        ColumnExpression::Primitive(value.into())
    }

    /// Create a raw SQL expression
    pub fn plain(sql: impl Into<String>) -> Self {
        ColumnExpression::Plain { sql: sql.into() }
    }

    pub fn is_plain(&self) -> bool {
        matches!(self, ColumnExpression::Plain { .. })
    }
}

impl From<Value> for ColumnExpression {
    fn from(value: Value) -> Self {
        ColumnExpression::Primitive(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_canonical_text() {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_micro_opt(3, 4, 5, 600)
            .unwrap();

        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Int(-42).to_string(), "-42");
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
        assert_eq!(Value::Timestamp(ts).to_string(), "2024-01-02 03:04:05.000600");
        assert_eq!(Value::Text("a'b".into()).to_string(), "a'b");
    }

    #[test]
    fn test_deserialize_expressions_from_json() {
        let values: Vec<ColumnExpression> = serde_json::from_str(
            r#"[null, true, 7, 1.5, "hello", {"sql": "now()"}, -9223372036854775808]"#,
        )
        .unwrap();

        assert_eq!(values[0], ColumnExpression::Primitive(Value::Null));
        assert_eq!(values[1], ColumnExpression::Primitive(Value::Bool(true)));
        assert_eq!(values[2], ColumnExpression::Primitive(Value::Int(7)));
        assert_eq!(values[3], ColumnExpression::Primitive(Value::Float(1.5)));
        assert_eq!(values[4], ColumnExpression::literal("hello"));
        assert_eq!(values[5], ColumnExpression::plain("now()"));
        assert!(values[5].is_plain());
        assert_eq!(values[6], ColumnExpression::literal(i64::MIN));
    }

    #[test]
    fn test_strings_stay_text() {
        let values: Vec<Value> = serde_json::from_str(
            r#"["67E55044-10B1-426F-9247-BB680E5FE0C8", "2024-01-02T03:04:05"]"#,
        )
        .unwrap();

        assert_eq!(
            values[0],
            Value::Text("67E55044-10B1-426F-9247-BB680E5FE0C8".into())
        );
        assert_eq!(values[1], Value::Text("2024-01-02T03:04:05".into()));
    }

    #[test]
    fn test_typed_literals_need_a_key() {
        let values: Vec<Value> = serde_json::from_str(
            r#"[{"uuid": "67E55044-10B1-426F-9247-BB680E5FE0C8"}, {"timestamp": "2024-01-02T03:04:05"}]"#,
        )
        .unwrap();

        assert_eq!(
            values[0],
            Value::Uuid(Uuid::parse_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap())
        );
        let ts = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        assert_eq!(values[1], Value::Timestamp(ts));

        assert!(serde_json::from_str::<Value>(r#"{"date": "2024-01-02"}"#).is_err());
        assert!(serde_json::from_str::<Value>(r#"{"uuid": "not-a-uuid"}"#).is_err());
    }

    #[test]
    fn test_out_of_range_integer_is_rejected() {
        assert!(serde_json::from_str::<Value>("18446744073709551615").is_err());
        assert!(serde_json::from_str::<ColumnExpression>("18446744073709551615").is_err());
        assert_eq!(
            serde_json::from_str::<Value>("9223372036854775807").unwrap(),
            Value::Int(i64::MAX)
        );
    }

    #[test]
    fn test_serialized_form_reads_back() {
        let id = Uuid::parse_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
        let values = vec![Value::Null, Value::Text("x".into()), Value::Uuid(id)];

        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(
            json,
            r#"[null,"x",{"uuid":"67e55044-10b1-426f-9247-bb680e5fe0c8"}]"#
        );
        assert_eq!(serde_json::from_str::<Vec<Value>>(&json).unwrap(), values);
    }

    #[test]
    fn test_option_maps_to_null() {
        let missing: Option<i64> = None;
        assert!(Value::from(missing).is_null());
        assert_eq!(Value::from(Some(3)), Value::Int(3));
    }
}
