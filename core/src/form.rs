//! URL-encoding of field bodies.
//!
//! Nested values are flattened with bracket keys (`a[b]=1`, `list[0]=x`),
//! booleans become `1`/`0` and nulls are dropped, which is the shape form
//! parsers on the server side expect.

use serde_json::{Map, Value};
use url::form_urlencoded;

/// Encode `fields` as an `application/x-www-form-urlencoded` string.
pub fn encode(fields: &Map<String, Value>) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs(fields) {
        serializer.append_pair(&key, &value);
    }
    serializer.finish()
}

/// Flatten `fields` into ordered key/value string pairs.
pub fn pairs(fields: &Map<String, Value>) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for (key, value) in fields {
        flatten(key.clone(), value, &mut out);
    }
    out
}

fn flatten(key: String, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::Bool(b) => out.push((key, if *b { "1" } else { "0" }.to_string())),
        Value::Number(n) => out.push((key, n.to_string())),
        Value::String(s) => out.push((key, s.clone())),
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                flatten(format!("{key}[{i}]"), item, out);
            }
        }
        Value::Object(map) => {
            for (sub, item) in map {
                flatten(format!("{key}[{sub}]"), item, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn fields(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn flat_fields_keep_order() {
        let body = fields(json!({"title": "good", "age": 11}));
        assert_eq!(encode(&body), "title=good&age=11");
    }

    #[test]
    fn reserved_characters_are_escaped() {
        let body = fields(json!({"q": "a&b=c", "path": "/x?y"}));
        assert_eq!(encode(&body), "q=a%26b%3Dc&path=%2Fx%3Fy");
    }

    #[test]
    fn nested_values_use_bracket_keys() {
        let body = fields(json!({
            "user": {"name": "Mary", "admin": true},
            "tags": ["a", "b"],
            "missing": null
        }));
        assert_eq!(
            pairs(&body),
            vec![
                ("user[name]".to_string(), "Mary".to_string()),
                ("user[admin]".to_string(), "1".to_string()),
                ("tags[0]".to_string(), "a".to_string()),
                ("tags[1]".to_string(), "b".to_string()),
            ]
        );
        assert_eq!(
            encode(&body),
            "user%5Bname%5D=Mary&user%5Badmin%5D=1&tags%5B0%5D=a&tags%5B1%5D=b"
        );
    }

    #[test]
    fn empty_fields_encode_to_empty_string() {
        assert_eq!(encode(&Map::new()), "");
    }
}
