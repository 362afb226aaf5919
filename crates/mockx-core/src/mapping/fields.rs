//! Typed reads from loosely shaped JSON objects.

use serde_json::{Map, Value};

use crate::GatewayError;

/// A JSON object being mapped, named for error messages.
pub(crate) struct Fields<'a> {
    what: &'static str,
    object: &'a Map<String, Value>,
}

impl<'a> Fields<'a> {
    pub fn new(what: &'static str, value: &'a Value) -> Result<Self, GatewayError> {
        value
            .as_object()
            .map(|object| Self { what, object })
            .ok_or_else(|| {
                GatewayError::mapping(format!("{what} payload is not a JSON object"))
                    .with_info(value.clone())
            })
    }

    fn present(&self, key: &str) -> Option<&'a Value> {
        self.object.get(key).filter(|value| !value.is_null())
    }

    fn missing(&self, key: &str) -> GatewayError {
        GatewayError::mapping(format!("{} payload has no '{key}' field", self.what))
            .with_info(Value::Object(self.object.clone()))
    }

    fn wrong_type(&self, key: &str, expected: &str) -> GatewayError {
        GatewayError::mapping(format!(
            "{} field '{key}' is not {expected}",
            self.what
        ))
        .with_info(Value::Object(self.object.clone()))
    }

    pub fn opt_str(&self, key: &str) -> Result<Option<&'a str>, GatewayError> {
        match self.present(key) {
            None => Ok(None),
            Some(Value::String(text)) => Ok(Some(text.as_str())),
            Some(_) => Err(self.wrong_type(key, "a string")),
        }
    }

    pub fn str(&self, key: &str) -> Result<&'a str, GatewayError> {
        self.opt_str(key)?.ok_or_else(|| self.missing(key))
    }

    /// Strings or numbers rendered as a string, for identifiers.
    pub fn opt_id(&self, key: &str) -> Result<Option<String>, GatewayError> {
        match self.present(key) {
            None => Ok(None),
            Some(Value::String(text)) => Ok(Some(text.clone())),
            Some(Value::Number(number)) => Ok(Some(number.to_string())),
            Some(_) => Err(self.wrong_type(key, "a string or number")),
        }
    }

    /// Numbers, or strings holding a number.
    pub fn opt_f64(&self, key: &str) -> Result<Option<f64>, GatewayError> {
        let parsed = match self.present(key) {
            None => return Ok(None),
            Some(Value::Number(number)) => number.as_f64(),
            Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
            Some(_) => None,
        };
        match parsed {
            Some(value) if value.is_finite() => Ok(Some(value)),
            _ => Err(self.wrong_type(key, "a finite number")),
        }
    }

    pub fn f64(&self, key: &str) -> Result<f64, GatewayError> {
        self.opt_f64(key)?.ok_or_else(|| self.missing(key))
    }

    pub fn opt_bool(&self, key: &str) -> Result<Option<bool>, GatewayError> {
        match self.present(key) {
            None => Ok(None),
            Some(Value::Bool(flag)) => Ok(Some(*flag)),
            Some(_) => Err(self.wrong_type(key, "a boolean")),
        }
    }

    /// Epoch timestamp in milliseconds. Values small enough to be seconds are scaled.
    pub fn opt_millis(&self, key: &str) -> Result<Option<i64>, GatewayError> {
        Ok(self.opt_f64(key)?.map(normalize_millis))
    }

    pub fn first_f64(&self, keys: &[&str]) -> Result<Option<f64>, GatewayError> {
        for key in keys {
            if let Some(value) = self.opt_f64(key)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }
}

// below this an epoch value is taken to be seconds (ms 100_000_000_000 is 1973-03-03)
const SECONDS_THRESHOLD: f64 = 100_000_000_000.0;

fn normalize_millis(raw: f64) -> i64 {
    let millis = if raw.abs() < SECONDS_THRESHOLD {
        raw * 1_000.0
    } else {
        raw
    };
    millis.round() as i64
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn numbers_may_arrive_as_strings() {
        let raw = json!({"price": "101.5", "amount": 2, "bad": "x"});
        let fields = Fields::new("order", &raw).expect("object");

        assert_eq!(fields.f64("price").expect("numeric string"), 101.5);
        assert_eq!(fields.f64("amount").expect("number"), 2.0);
        assert!(fields.f64("bad").is_err());
        assert!(fields.f64("missing").is_err());
        assert_eq!(fields.opt_f64("missing").expect("absent is fine"), None);
    }

    #[test]
    fn nulls_count_as_absent() {
        let raw = json!({"bid": null});
        let fields = Fields::new("ticker", &raw).expect("object");
        assert_eq!(fields.opt_f64("bid").expect("null"), None);
    }

    #[test]
    fn second_resolution_timestamps_are_scaled() {
        let raw = json!({"a": 1_700_000_000, "b": 1_700_000_000_123_i64});
        let fields = Fields::new("ticker", &raw).expect("object");
        assert_eq!(fields.opt_millis("a").expect("seconds"), Some(1_700_000_000_000));
        assert_eq!(fields.opt_millis("b").expect("millis"), Some(1_700_000_000_123));
    }

    #[test]
    fn ids_accept_numbers() {
        let raw = json!({"id": 42});
        let fields = Fields::new("order", &raw).expect("object");
        assert_eq!(fields.opt_id("id").expect("numeric id"), Some(String::from("42")));
    }

    #[test]
    fn non_objects_are_mapping_errors() {
        let raw = json!([1, 2]);
        assert!(Fields::new("ticker", &raw).is_err());
    }
}
