//! Key/path lookups over the untyped metadata blobs the storefront embeds
//! in its pages. Everything here degrades to `None`; malformed JSON from a
//! third-party page is a normal negative result, never an error.

use serde_json::Value;

/// Parse JSON, returning `None` instead of an error when it fails.
pub fn parse_safe(text: &str) -> Option<Value> {
    serde_json::from_str(text).ok()
}

/// Walk a fixed path of object keys, returning the value at the end.
pub fn probe_path<'a>(data: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = data;
    for key in path {
        current = current.get(key)?;
    }
    Some(current)
}

/// Walk a fixed path and coerce the leaf to a string. Only string and number
/// leaves count; the blobs use empty strings for unset ids, so an empty
/// string is treated as not found and the caller moves to its next fallback.
pub fn probe_string(data: &Value, path: &[&str]) -> Option<String> {
    probe_path(data, path).and_then(|leaf| match leaf {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn as_scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Depth-first, pre-order search for the first string or number value stored
/// under `key`, coerced to a string. Arrays are walked in order; objects are
/// walked in document order; first hit wins, no backtracking.
///
/// One quirk to be aware of: before descending into a child object, the
/// search checks whether that child repeats its own name as a scalar field
/// (`{"ad": {"ad": "123"}}` matches a search for anything). This one-level
/// redirection means a differently named field can satisfy the search when
/// its name equals an ancestor's key. Several ad-config blobs resolve only
/// through this shape, so it stays.
pub fn deep_search_key_value(data: &Value, key: &str) -> Option<String> {
    match data {
        Value::Array(items) => items
            .iter()
            .find_map(|item| deep_search_key_value(item, key)),
        Value::Object(map) => {
            // A directly owned scalar wins immediately; an owned non-scalar
            // falls through to the descent below.
            if let Some(hit) = map.get(key).and_then(as_scalar_string) {
                return Some(hit);
            }
            map.iter().find_map(|(child_key, child)| {
                if let Value::Object(child_map) = child {
                    if let Some(hit) = child_map.get(child_key).and_then(as_scalar_string) {
                        return Some(hit);
                    }
                }
                deep_search_key_value(child, key)
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_safe_swallows_garbage() {
        assert!(parse_safe("{not json").is_none());
        assert!(parse_safe("{\"a\": 1}").is_some());
    }

    #[test]
    fn test_probe_string_coerces_numbers() {
        let data = json!({"a": {"b": {"storeId": 42}}});
        assert_eq!(
            probe_string(&data, &["a", "b", "storeId"]),
            Some("42".to_string())
        );
    }

    #[test]
    fn test_probe_string_skips_empty_and_missing() {
        let data = json!({"a": {"storeId": ""}});
        assert_eq!(probe_string(&data, &["a", "storeId"]), None);
        assert_eq!(probe_string(&data, &["a", "missing"]), None);
    }

    #[test]
    fn test_deep_search_nested_object() {
        let data = json!({"a": {"b": {"storeId": 42}}});
        assert_eq!(
            deep_search_key_value(&data, "storeId"),
            Some("42".to_string())
        );
    }

    #[test]
    fn test_deep_search_array_in_order() {
        let data = json!({"list": [{"x": 1}, {"storeId": "S1"}, {"storeId": "S2"}]});
        assert_eq!(
            deep_search_key_value(&data, "storeId"),
            Some("S1".to_string())
        );
    }

    #[test]
    fn test_deep_search_direct_hit_wins_over_descent() {
        let data = json!({"storeId": "top", "nested": {"storeId": "deep"}});
        assert_eq!(
            deep_search_key_value(&data, "storeId"),
            Some("top".to_string())
        );
    }

    #[test]
    fn test_non_scalar_direct_value_falls_through() {
        // The owned key holds an object, so the search descends into it.
        let data = json!({"storeId": {"storeId": "inner"}});
        assert_eq!(
            deep_search_key_value(&data, "storeId"),
            Some("inner".to_string())
        );
    }

    // Pins the one-level redirection: a child object repeating its own name
    // as a scalar field matches before the descent finds the target key.
    #[test]
    fn test_redirects_to_child_keys() {
        let data = json!({
            "wrapper": {
                "storeId": "hidden",
                "wrapper": "redirected"
            }
        });
        assert_eq!(
            deep_search_key_value(&data, "storeId"),
            Some("redirected".to_string())
        );
    }

    #[test]
    fn test_scalar_root_is_absent() {
        assert_eq!(deep_search_key_value(&json!("just text"), "storeId"), None);
        assert_eq!(deep_search_key_value(&json!(null), "storeId"), None);
    }
}
