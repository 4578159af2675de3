use serde_json::Value;

/// Parses a captured fragment. Only syntax is checked here; the extractors
/// validate shape.
pub fn parse_fragment(raw: &str) -> serde_json::Result<Value> {
    serde_json::from_str(raw)
}

/// Returns the scalar of a `{"lit": ...}` token rendered as a string.
///
/// Arrays, objects, `null` and tokens without a `lit` key are not literals.
pub fn literal(token: &Value) -> Option<String> {
    match token.get("lit")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_fragment_rejects_truncated_object() {
        assert!(parse_fragment(r#"{"a":1"#).is_err());
        assert_eq!(parse_fragment(r#"{"a":1}"#).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_literal_scalars() {
        assert_eq!(literal(&json!({"lit": "org/dep"})), Some("org/dep".to_string()));
        assert_eq!(literal(&json!({"lit": 0})), Some("0".to_string()));
        assert_eq!(literal(&json!({"lit": true})), Some("true".to_string()));
        assert_eq!(literal(&json!({"expr": "github.ref"})), None);
        assert_eq!(literal(&json!({"lit": null})), None);
    }
}
