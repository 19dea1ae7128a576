//! Pure JSON reshaping used by platform clients that pass responses through untyped.

use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Keys tried by [`unwrap_envelope`] when the caller has no better idea.
pub const DEFAULT_ENVELOPE_KEYS: [&str; 2] = ["data", "result"];

/// `created_at` -> `createdAt`. Leading underscores survive; camelCase input is unchanged.
pub fn snake_to_camel(key: &str) -> String {
    let rest = key.trim_start_matches('_');
    let mut out = String::with_capacity(key.len());
    out.push_str(&key[..key.len() - rest.len()]);
    let mut upper_next = false;
    for c in rest.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Recursively renames every object key with [`snake_to_camel`].
pub fn camelize_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (snake_to_camel(&k), camelize_keys(v)))
                .collect::<Map<String, Value>>(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(camelize_keys).collect()),
        other => other,
    }
}

/// Returns the first of `keys` present on an object, or `value` unchanged.
pub fn unwrap_envelope(value: Value, keys: &[&str]) -> Value {
    match value {
        Value::Object(mut map) => {
            for key in keys {
                if let Some(inner) = map.remove(*key) {
                    return inner;
                }
            }
            Value::Object(map)
        }
        other => other,
    }
}

/// Extracts one required field, e.g. `droplets` from `{"droplets": [...], "meta": {...}}`.
pub fn take_field(value: Value, key: &str) -> Result<Value> {
    match value {
        Value::Object(mut map) => map
            .remove(key)
            .ok_or_else(|| Error::InvalidResponse(format!("missing field `{key}`"))),
        _ => Err(Error::InvalidResponse(format!(
            "expected an object containing `{key}`"
        ))),
    }
}

/// [`take_field`] followed by typed decoding.
pub fn take_typed<T: serde::de::DeserializeOwned>(value: Value, key: &str) -> Result<T> {
    serde_json::from_value(take_field(value, key)?).map_err(Error::Decode)
}
