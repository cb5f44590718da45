use serde_json::Value;

const SENSITIVE_MARKERS: &[&str] = &["token"];

fn is_sensitive(key: &str) -> bool {
    let key = key.to_lowercase();
    SENSITIVE_MARKERS.iter().any(|m| key.contains(m))
}

/// Returns a copy of `blob` without sensitive top-level keys.
///
/// Only the first level is inspected; nested objects are copied untouched.
/// Non-object values are returned as they are.
pub fn redact(blob: &Value) -> Value {
    match blob {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(key, _)| !is_sensitive(key))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn drops_token_keys_in_any_case() {
        let blob = json!({
            "api-token": "secret",
            "TOKEN": "secret",
            "refreshTokenValue": "secret",
            "volume": 0.5,
        });
        assert_eq!(redact(&blob), json!({ "volume": 0.5 }));
    }

    #[test]
    fn keeps_nested_objects_verbatim() {
        let blob = json!({
            "account": { "token": "still here" },
            "theme": "dark",
        });
        assert_eq!(redact(&blob), blob);
    }

    #[test]
    fn non_objects_pass_through() {
        assert_eq!(redact(&json!([1, 2])), json!([1, 2]));
        assert_eq!(redact(&json!("token")), json!("token"));
    }

    #[test]
    fn preserves_key_order() {
        let blob = json!({ "z": 1, "token": 2, "a": 3 });
        let keys: Vec<_> = redact(&blob)
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect();
        assert_eq!(keys, ["z", "a"]);
    }
}
