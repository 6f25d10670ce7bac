//! Provider payloads are open-ended JSON objects.
//!
//! Only the canonical side of a conversion is statically typed. Provider
//! records stay as string-keyed maps; fields a mapper does not understand are
//! carried through `CanonicalCustomField`s or a record's `extra` map.

use serde_json::{Map, Value};

pub type Payload = Map<String, Value>;

pub trait PayloadExt {
    fn get_str(&self, key: &str) -> Option<&str>;
    /// String lookup that also renders numbers and booleans as text.
    fn get_string(&self, key: &str) -> Option<String>;
    fn get_i64(&self, key: &str) -> Option<i64>;
    fn get_u64(&self, key: &str) -> Option<u64>;
    fn get_bool(&self, key: &str) -> Option<bool>;
    fn get_array(&self, key: &str) -> Option<&Vec<Value>>;
    fn get_object(&self, key: &str) -> Option<&Payload>;
    fn insert_opt(&mut self, key: &str, value: Option<Value>);
}

impl PayloadExt for Payload {
    fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    fn get_string(&self, key: &str) -> Option<String> {
        value_to_string(self.get(key)?)
    }

    fn get_i64(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            Value::Number(number) => number.as_i64(),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    fn get_u64(&self, key: &str) -> Option<u64> {
        match self.get(key)? {
            Value::Number(number) => number.as_u64(),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            Value::Bool(value) => Some(*value),
            Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    fn get_array(&self, key: &str) -> Option<&Vec<Value>> {
        self.get(key).and_then(Value::as_array)
    }

    fn get_object(&self, key: &str) -> Option<&Payload> {
        self.get(key).and_then(Value::as_object)
    }

    fn insert_opt(&mut self, key: &str, value: Option<Value>) {
        if let Some(value) = value {
            self.insert(key.to_string(), value);
        }
    }
}

/// Renders scalar JSON values as text; `null`, arrays and objects yield `None`.
pub fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

/// Builds a payload from a JSON value, returning `None` when it is not an object.
pub fn payload_from_value(value: Value) -> Option<Payload> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Payload {
        payload_from_value(value).expect("fixture should be an object")
    }

    #[test]
    fn get_string_renders_numbers_and_strings() {
        let payload = payload(json!({ "id": 42, "key": "TC-1", "flag": true, "none": null }));
        assert_eq!(payload.get_string("id").as_deref(), Some("42"));
        assert_eq!(payload.get_string("key").as_deref(), Some("TC-1"));
        assert_eq!(payload.get_string("flag").as_deref(), Some("true"));
        assert_eq!(payload.get_string("none"), None);
    }

    #[test]
    fn numeric_lookups_accept_numeric_strings() {
        let payload = payload(json!({ "order": "3", "size": 1024, "bad": "x" }));
        assert_eq!(payload.get_i64("order"), Some(3));
        assert_eq!(payload.get_u64("size"), Some(1024));
        assert_eq!(payload.get_i64("bad"), None);
    }

    #[test]
    fn insert_opt_skips_none() {
        let mut payload = Payload::new();
        payload.insert_opt("a", None);
        payload.insert_opt("b", Some(json!(1)));
        assert!(!payload.contains_key("a"));
        assert_eq!(payload.get("b"), Some(&json!(1)));
    }
}
