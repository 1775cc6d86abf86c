//! Typed document field values.
//!
//! The document store encodes every field as a single-key object naming its
//! type, e.g. `{"stringValue": "Ana"}` or `{"integerValue": "3"}` (64-bit
//! integers travel as strings). [`Value`] models that encoding and converts
//! to and from plain `serde_json::Value`, so domain records can derive serde
//! and never see the wire format.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, json};

/// A single document field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    Timestamp(DateTime<Utc>),
    String(String),
    Array(Vec<Self>),
    Map(BTreeMap<String, Self>),
}

impl Value {
    /// Encode into the wire representation.
    #[must_use]
    pub fn to_wire(&self) -> serde_json::Value {
        match self {
            Self::Null => json!({ "nullValue": null }),
            Self::Boolean(b) => json!({ "booleanValue": b }),
            Self::Integer(i) => json!({ "integerValue": i.to_string() }),
            Self::Double(d) => json!({ "doubleValue": d }),
            Self::Timestamp(t) => {
                json!({ "timestampValue": t.to_rfc3339_opts(SecondsFormat::Micros, true) })
            }
            Self::String(s) => json!({ "stringValue": s }),
            Self::Array(values) => {
                let values: Vec<_> = values.iter().map(Self::to_wire).collect();
                json!({ "arrayValue": { "values": values } })
            }
            Self::Map(fields) => {
                let fields: Map<_, _> = fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_wire()))
                    .collect();
                json!({ "mapValue": { "fields": fields } })
            }
        }
    }

    /// Decode from the wire representation.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem when the object does not hold
    /// exactly one known value type or the payload is malformed.
    pub fn from_wire(raw: &serde_json::Value) -> Result<Self, String> {
        let object = raw
            .as_object()
            .ok_or_else(|| format!("expected a value object, got {raw}"))?;
        let (kind, payload) = object
            .iter()
            .next()
            .ok_or_else(|| "empty value object".to_string())?;

        match kind.as_str() {
            "nullValue" => Ok(Self::Null),
            "booleanValue" => payload
                .as_bool()
                .map(Self::Boolean)
                .ok_or_else(|| format!("invalid booleanValue: {payload}")),
            "integerValue" => match payload {
                serde_json::Value::String(s) => s
                    .parse()
                    .map(Self::Integer)
                    .map_err(|e| format!("invalid integerValue {s:?}: {e}")),
                other => other
                    .as_i64()
                    .map(Self::Integer)
                    .ok_or_else(|| format!("invalid integerValue: {other}")),
            },
            "doubleValue" => payload
                .as_f64()
                .map(Self::Double)
                .ok_or_else(|| format!("invalid doubleValue: {payload}")),
            "timestampValue" => payload
                .as_str()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|t| Self::Timestamp(t.with_timezone(&Utc)))
                .ok_or_else(|| format!("invalid timestampValue: {payload}")),
            "stringValue" => payload
                .as_str()
                .map(|s| Self::String(s.to_string()))
                .ok_or_else(|| format!("invalid stringValue: {payload}")),
            "arrayValue" => payload
                .get("values")
                .and_then(serde_json::Value::as_array)
                .map_or_else(|| Ok(Vec::new()), |vs| vs.iter().map(Self::from_wire).collect())
                .map(Self::Array),
            "mapValue" => payload
                .get("fields")
                .and_then(serde_json::Value::as_object)
                .map_or_else(
                    || Ok(BTreeMap::new()),
                    |fs| {
                        fs.iter()
                            .map(|(k, v)| Self::from_wire(v).map(|v| (k.clone(), v)))
                            .collect()
                    },
                )
                .map(Self::Map),
            other => Err(format!("unsupported value type {other}")),
        }
    }

    /// Convert into plain JSON. Timestamps become RFC 3339 strings.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Boolean(b) => serde_json::Value::Bool(*b),
            Self::Integer(i) => serde_json::Value::Number((*i).into()),
            Self::Double(d) => Number::from_f64(*d).map_or(serde_json::Value::Null, serde_json::Value::Number),
            Self::Timestamp(t) => {
                serde_json::Value::String(t.to_rfc3339_opts(SecondsFormat::Micros, true))
            }
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::Array(values) => serde_json::Value::Array(values.iter().map(Self::to_json).collect()),
            Self::Map(fields) => serde_json::Value::Object(
                fields.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }

    /// Convert from plain JSON. Integers that fit in `i64` stay integers.
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Boolean(*b),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map_or_else(|| Self::Double(n.as_f64().unwrap_or(f64::NAN)), Self::Integer),
            serde_json::Value::String(s) => Self::String(s.clone()),
            serde_json::Value::Array(values) => Self::Array(values.iter().map(Self::from_json).collect()),
            serde_json::Value::Object(fields) => Self::Map(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), Self::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_wire().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Self::from_wire(&raw).map_err(D::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_travels_as_string() {
        assert_eq!(Value::Integer(3).to_wire(), json!({"integerValue": "3"}));
        assert_eq!(
            Value::from_wire(&json!({"integerValue": "42"})).unwrap(),
            Value::Integer(42)
        );
    }

    #[test]
    fn test_decode_nested_document_fields() {
        let raw = json!({
            "mapValue": {"fields": {
                "uid": {"stringValue": "uid-1"},
                "cantidad": {"integerValue": "2"},
                "items": {"arrayValue": {"values": [
                    {"mapValue": {"fields": {"id": {"integerValue": "7"}}}}
                ]}},
                "fecha": {"timestampValue": "2024-03-01T15:04:05.123456Z"}
            }}
        });

        let value = Value::from_wire(&raw).unwrap();
        let plain = value.to_json();

        assert_eq!(plain["uid"], "uid-1");
        assert_eq!(plain["cantidad"], 2);
        assert_eq!(plain["items"][0]["id"], 7);
        assert_eq!(plain["fecha"], "2024-03-01T15:04:05.123456Z");
    }

    #[test]
    fn test_empty_collections_omit_members() {
        assert_eq!(Value::from_wire(&json!({"arrayValue": {}})).unwrap(), Value::Array(vec![]));
        assert_eq!(
            Value::from_wire(&json!({"mapValue": {}})).unwrap(),
            Value::Map(BTreeMap::new())
        );
    }

    #[test]
    fn test_from_json_keeps_integers() {
        assert_eq!(Value::from_json(&json!(5)), Value::Integer(5));
        assert_eq!(Value::from_json(&json!(2.5)), Value::Double(2.5));
        assert_eq!(Value::from_json(&json!(null)), Value::Null);
    }

    #[test]
    fn test_rejects_unknown_type() {
        assert!(Value::from_wire(&json!({"geoPointValue": {}})).is_err());
        assert!(Value::from_wire(&json!("bare")).is_err());
        assert!(Value::from_wire(&json!({"integerValue": "abc"})).is_err());
    }

    #[test]
    fn test_serde_uses_wire_format() {
        let json = serde_json::to_value(Value::from("hola")).unwrap();
        assert_eq!(json, json!({"stringValue": "hola"}));
        let back: Value = serde_json::from_value(json).unwrap();
        assert_eq!(back, Value::String("hola".to_string()));
    }
}
