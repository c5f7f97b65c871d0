use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An opaque mapping supplied by the domain layer. The ledger core treats it
/// as data except where the currency/asset domain operations read specific
/// fields (`category`, `issue`, `amount`, `account`, `previous`, `trader`,
/// `asset`). Represented as a JSON object so arbitrary domain schemas can be
/// carried without the ledger core knowing their shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(pub Value);

impl Payload {
    pub fn empty() -> Self {
        Payload(Value::Object(Default::default()))
    }

    pub fn from_value(v: Value) -> Self {
        Payload(v)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn category(&self) -> Option<&str> {
        self.get_str("category")
    }

    pub fn issue(&self) -> Option<&str> {
        self.get_str("issue")
    }

    pub fn set(&mut self, key: &str, value: Value) {
        if let Value::Object(map) = &mut self.0 {
            map.insert(key.to_string(), value);
        }
    }

    pub fn set_str(&mut self, key: &str, value: &str) {
        self.set(key, Value::String(value.to_string()));
    }
}

impl Default for Payload {
    fn default() -> Self {
        Self::empty()
    }
}
