use serde::Serialize;
use serde_json::Value;

use bigchain_core::LedgerError;

/// Serialize `value` to its canonical byte representation: JSON with object
/// keys sorted at every level and no insignificant whitespace.
///
/// Two values that are `==` after `serde_json` round-tripping always produce
/// identical canonical bytes, independent of field declaration order or
/// map insertion order.
pub fn canonical_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, LedgerError> {
    let raw = serde_json::to_value(value).map_err(|e| LedgerError::Serialization(e.to_string()))?;
    let sorted = sort_value(raw);
    serde_json::to_vec(&sorted).map_err(|e| LedgerError::Serialization(e.to_string()))
}

fn sort_value(value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.into_iter().map(sort_value).collect()),
        Value::Object(map) => {
            let mut sorted: Vec<(String, Value)> =
                map.into_iter().map(|(k, v)| (k, sort_value(v))).collect();
            sorted.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(sorted.into_iter().collect())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sorts_keys_at_every_level() {
        let a = json!({"b": 1, "a": {"z": 1, "y": 2}});
        let b = json!({"a": {"y": 2, "z": 1}, "b": 1});
        assert_eq!(
            canonical_bytes(&a).unwrap(),
            canonical_bytes(&b).unwrap()
        );
    }

    #[test]
    fn array_order_is_preserved() {
        let a = json!({"xs": [3, 1, 2]});
        let b = json!({"xs": [1, 2, 3]});
        assert_ne!(canonical_bytes(&a).unwrap(), canonical_bytes(&b).unwrap());
    }
}
