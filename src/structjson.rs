use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

/// A protobuf `Value` as it appears on the wire:
/// `{ "kind": "stringValue", "stringValue": "..." }` and friends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum WireValue {
    Null,
    Number(Number),
    String(String),
    Bool(bool),
    Struct(WireStruct),
    List(Vec<WireValue>),
    /// Missing or unrecognized `kind`. Decodes to null.
    Unknown,
}

/// A protobuf `Struct`: `{ "fields": { name: Value } }`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub struct WireStruct {
    pub fields: BTreeMap<String, WireValue>,
}

impl WireStruct {
    /// Build a struct from optional entries. `None` entries are left out
    /// rather than encoded as kind-less records.
    pub fn from_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Option<Value>)>,
        K: Into<String>,
    {
        let fields = entries
            .into_iter()
            .filter_map(|(name, value)| value.map(|v| (name.into(), encode(&v))))
            .collect();
        Self { fields }
    }
}

impl From<&Value> for WireValue {
    fn from(value: &Value) -> Self {
        let kind = match value.get("kind").and_then(Value::as_str) {
            Some(kind) => kind,
            None => return WireValue::Unknown,
        };
        let payload = value.get(kind);

        match (kind, payload) {
            ("nullValue", _) => WireValue::Null,
            ("numberValue", Some(Value::Number(n))) => WireValue::Number(n.clone()),
            ("stringValue", Some(Value::String(s))) => WireValue::String(s.clone()),
            ("boolValue", Some(Value::Bool(b))) => WireValue::Bool(*b),
            ("structValue", Some(inner)) => WireValue::Struct(WireStruct::from(inner)),
            ("listValue", Some(inner)) => WireValue::List(
                inner
                    .get("values")
                    .and_then(Value::as_array)
                    .map(|values| values.iter().map(WireValue::from).collect())
                    .unwrap_or_default(),
            ),
            _ => WireValue::Unknown,
        }
    }
}

impl From<Value> for WireValue {
    fn from(value: Value) -> Self {
        WireValue::from(&value)
    }
}

impl From<&WireValue> for Value {
    fn from(value: &WireValue) -> Self {
        fn tagged(kind: &str, payload: Value) -> Value {
            let mut map = Map::new();
            map.insert("kind".to_string(), Value::String(kind.to_string()));
            map.insert(kind.to_string(), payload);
            Value::Object(map)
        }

        match value {
            WireValue::Null => tagged("nullValue", Value::String("NULL_VALUE".to_string())),
            WireValue::Number(n) => tagged("numberValue", Value::Number(n.clone())),
            WireValue::String(s) => tagged("stringValue", Value::String(s.clone())),
            WireValue::Bool(b) => tagged("boolValue", Value::Bool(*b)),
            WireValue::Struct(s) => tagged("structValue", Value::from(s)),
            WireValue::List(items) => {
                let mut list = Map::new();
                list.insert(
                    "values".to_string(),
                    Value::Array(items.iter().map(Value::from).collect()),
                );
                tagged("listValue", Value::Object(list))
            }
            WireValue::Unknown => Value::Object(Map::new()),
        }
    }
}

impl From<WireValue> for Value {
    fn from(value: WireValue) -> Self {
        Value::from(&value)
    }
}

impl From<&Value> for WireStruct {
    fn from(value: &Value) -> Self {
        let fields = value
            .get("fields")
            .and_then(Value::as_object)
            .map(|fields| {
                fields
                    .iter()
                    .map(|(name, v)| (name.clone(), WireValue::from(v)))
                    .collect()
            })
            .unwrap_or_default();
        Self { fields }
    }
}

impl From<Value> for WireStruct {
    fn from(value: Value) -> Self {
        WireStruct::from(&value)
    }
}

impl From<&WireStruct> for Value {
    fn from(value: &WireStruct) -> Self {
        let fields: Map<String, Value> = value
            .fields
            .iter()
            .map(|(name, v)| (name.clone(), Value::from(v)))
            .collect();
        let mut map = Map::new();
        map.insert("fields".to_string(), Value::Object(fields));
        Value::Object(map)
    }
}

impl From<WireStruct> for Value {
    fn from(value: WireStruct) -> Self {
        Value::from(&value)
    }
}

/// Unwrap a wire value into plain JSON.
pub fn decode(value: &WireValue) -> Value {
    match value {
        WireValue::Null | WireValue::Unknown => Value::Null,
        WireValue::Number(n) => Value::Number(n.clone()),
        WireValue::String(s) => Value::String(s.clone()),
        WireValue::Bool(b) => Value::Bool(*b),
        WireValue::Struct(s) => decode_struct(s),
        WireValue::List(items) => Value::Array(items.iter().map(decode).collect()),
    }
}

pub fn decode_struct(value: &WireStruct) -> Value {
    Value::Object(
        value
            .fields
            .iter()
            .map(|(name, v)| (name.clone(), decode(v)))
            .collect(),
    )
}

/// Wrap plain JSON into its wire form.
pub fn encode(value: &Value) -> WireValue {
    match value {
        Value::Null => WireValue::Null,
        Value::Number(n) => WireValue::Number(n.clone()),
        Value::String(s) => WireValue::String(s.clone()),
        Value::Bool(b) => WireValue::Bool(*b),
        Value::Object(map) => WireValue::Struct(encode_struct(map)),
        Value::Array(items) => WireValue::List(items.iter().map(encode).collect()),
    }
}

pub fn encode_struct(map: &Map<String, Value>) -> WireStruct {
    WireStruct {
        fields: map
            .iter()
            .map(|(name, v)| (name.clone(), encode(v)))
            .collect(),
    }
}

/// Convert a wire-format struct (`{ "fields": ... }`) to plain JSON.
pub fn struct_to_json(value: &Value) -> Value {
    decode_struct(&WireStruct::from(value))
}

/// Convert a plain JSON object to its wire-format struct.
/// Anything other than an object encodes to an empty struct.
pub fn json_to_struct(value: &Value) -> Value {
    let wire = match value {
        Value::Object(map) => encode_struct(map),
        _ => WireStruct::default(),
    };
    Value::from(wire)
}
