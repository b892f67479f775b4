use serde_json::Value;

use crate::structjson;

/// Key that marks an object as a wire-format struct.
pub const STRUCT_MARKER: &str = "fields";

/// Walk a JSON tree and replace every embedded wire-format struct with
/// its plain JSON form. Returns a new tree; the input is left untouched.
///
/// Decoded structs are not walked again, since decoding already recursed
/// into their children.
pub fn normalize(value: &Value) -> Value {
    match value {
        Value::Object(map) if map.contains_key(STRUCT_MARKER) => structjson::struct_to_json(value),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, child)| (key.clone(), normalize(child)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(normalize).collect()),
        scalar => scalar.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalars_unchanged() {
        assert_eq!(normalize(&Value::Null), Value::Null);
        assert_eq!(normalize(&json!("foo bar")), json!("foo bar"));
        assert_eq!(normalize(&json!(42)), json!(42));
    }

    #[test]
    fn test_tree_without_marker_unchanged() {
        let obj = json!({ "queryResult": { "parameters": {} }, "foo": "bar" });
        assert_eq!(normalize(&obj), obj);
    }

    #[test]
    fn test_empty_fields_becomes_empty_object() {
        let obj = json!({ "queryResult": { "parameters": { "fields": {} } } });
        assert_eq!(
            normalize(&obj),
            json!({ "queryResult": { "parameters": {} } })
        );
    }

    #[test]
    fn test_struct_inside_array_is_decoded() {
        let obj = json!({
            "queryResult": {
                "fulfillmentMessages": [{
                    "platform": "FACEBOOK",
                    "payload": {
                        "fields": {
                            "facebook": {
                                "kind": "structValue",
                                "structValue": {
                                    "fields": {
                                        "text": { "kind": "stringValue", "stringValue": "Welcome!" },
                                        "buttons": {
                                            "kind": "listValue",
                                            "listValue": {
                                                "values": [{
                                                    "kind": "structValue",
                                                    "structValue": {
                                                        "fields": {
                                                            "title": { "kind": "stringValue", "stringValue": "Button 1" },
                                                            "type": { "kind": "stringValue", "stringValue": "postback" }
                                                        }
                                                    }
                                                }]
                                            }
                                        }
                                    }
                                }
                            }
                        }
                    }
                }]
            }
        });
        let expected = json!({
            "queryResult": {
                "fulfillmentMessages": [{
                    "platform": "FACEBOOK",
                    "payload": {
                        "facebook": {
                            "text": "Welcome!",
                            "buttons": [{ "title": "Button 1", "type": "postback" }]
                        }
                    }
                }]
            }
        });
        assert_eq!(normalize(&obj), expected);
    }

    #[test]
    fn test_input_is_not_mutated() {
        let obj = json!({ "payload": { "fields": { "a": { "kind": "boolValue", "boolValue": true } } } });
        let before = obj.clone();
        let normalized = normalize(&obj);
        assert_eq!(obj, before);
        assert_eq!(normalized, json!({ "payload": { "a": true } }));
    }
}
