//! Filter to query-string conversion.

use serde::Serialize;
use serde_json::Value;

use crate::error::ClientError;

/// Serialize `filter` into query pairs.
///
/// The filter must serialize to a JSON object. Null fields are skipped,
/// strings are passed through unquoted and other scalars use their JSON
/// text. `format=json` is always appended last.
pub fn query_pairs<F: Serialize>(filter: &F) -> Result<Vec<(String, String)>, ClientError> {
    let mut pairs = Vec::new();
    match serde_json::to_value(filter)? {
        Value::Object(fields) => {
            for (name, value) in fields {
                match value {
                    Value::Null => {}
                    Value::String(s) => pairs.push((name, s)),
                    other => pairs.push((name, other.to_string())),
                }
            }
        }
        Value::Null => {}
        other => {
            return Err(ClientError::Config(format!(
                "query filter must serialize to an object, got {other}"
            )))
        }
    }
    pairs.push(("format".to_string(), "json".to_string()));
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_filter_only_sets_format() {
        assert_eq!(
            query_pairs(&json!({})).unwrap(),
            [("format".to_string(), "json".to_string())]
        );
    }

    #[test]
    fn nulls_skipped_and_numbers_rendered_decimal() {
        let pairs = query_pairs(&json!({ "project": "test", "plate": 3, "location": null })).unwrap();
        assert_eq!(
            pairs,
            [
                ("project".to_string(), "test".to_string()),
                ("plate".to_string(), "3".to_string()),
                ("format".to_string(), "json".to_string()),
            ]
        );
    }

    #[test]
    fn non_object_filter_rejected() {
        assert!(query_pairs(&json!([1, 2])).is_err());
    }
}
