//! crates/contract_core/src/serde_ext.rs
//!
//! Deserializers for loosely typed JSON. Model replies and browser forms
//! send numbers where strings are expected (and `null` where a field is
//! simply unknown), so these accept any scalar and normalize it to text.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

fn text_of(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        // Models sometimes wrap a list item in an object; take its first text field.
        Value::Object(map) => map.into_iter().find_map(|(_, v)| match v {
            Value::String(s) if !s.trim().is_empty() => Some(s),
            _ => None,
        }),
        Value::Null | Value::Array(_) => None,
    }
}

fn scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        // Arrays and objects are flattened to their JSON text.
        other => Some(other.to_string()),
    }
}

/// Deserializes any scalar into a `String`, mapping `null` to `""`.
pub fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_to_string(value).unwrap_or_default())
}

/// Deserializes any scalar into `Some(String)`, mapping `null` to `None`.
pub fn optional_lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_to_string(value))
}

/// Deserializes a `bool`, accepting `"true"`/`"yes"`/`1` and mapping `null`
/// or anything unrecognized to `false`.
pub fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "yes" | "sim" | "1"
        ),
        _ => false,
    })
}

/// Deserializes `T`, mapping `null` to `T::default()`.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Deserializes a list of strings. `null` is an empty list, a bare scalar is
/// a one-item list, and object items contribute their first text field.
pub fn lenient_string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let items = match value {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => vec![other],
    };
    Ok(items.into_iter().filter_map(text_of).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Amounts {
        #[serde(default, deserialize_with = "optional_lenient_string")]
        amount: Option<String>,
        #[serde(default, deserialize_with = "lenient_string")]
        label: String,
    }

    #[test]
    fn numbers_and_nulls_are_normalized() {
        let parsed: Amounts = serde_json::from_str(r#"{"amount": 1500.5, "label": null}"#).unwrap();
        assert_eq!(parsed.amount.as_deref(), Some("1500.5"));
        assert_eq!(parsed.label, "");

        let parsed: Amounts = serde_json::from_str(r#"{"amount": "10000"}"#).unwrap();
        assert_eq!(parsed.amount.as_deref(), Some("10000"));

        let parsed: Amounts = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.amount, None);
    }

    #[derive(Default, Deserialize)]
    struct Inner {
        #[serde(default)]
        note: String,
    }

    #[derive(Deserialize)]
    struct Loose {
        #[serde(default, deserialize_with = "lenient_bool")]
        flag: bool,
        #[serde(default, deserialize_with = "null_as_default")]
        inner: Inner,
        #[serde(default, deserialize_with = "null_as_default")]
        numbers: Vec<u32>,
        #[serde(default, deserialize_with = "lenient_string_list")]
        clauses: Vec<String>,
    }

    #[test]
    fn nulls_fall_back_to_defaults() {
        let loose: Loose = serde_json::from_str(
            r#"{"flag": null, "inner": null, "numbers": null, "clauses": null}"#,
        )
        .unwrap();
        assert!(!loose.flag);
        assert_eq!(loose.inner.note, "");
        assert!(loose.numbers.is_empty());
        assert!(loose.clauses.is_empty());
    }

    #[test]
    fn booleans_accept_common_spellings() {
        for (raw, expected) in [("true", true), ("\"yes\"", true), ("1", true), ("\"no\"", false), ("0", false)] {
            let loose: Loose = serde_json::from_str(&format!(r#"{{"flag": {raw}}}"#)).unwrap();
            assert_eq!(loose.flag, expected, "input {raw}");
        }
    }

    #[test]
    fn string_lists_take_text_from_objects() {
        let loose: Loose = serde_json::from_str(
            r#"{"clauses": ["Force majeure", {"clause": "Governing law"}, 3, null]}"#,
        )
        .unwrap();
        assert_eq!(loose.clauses, vec!["Force majeure", "Governing law", "3"]);

        let loose: Loose = serde_json::from_str(r#"{"clauses": "Arbitration"}"#).unwrap();
        assert_eq!(loose.clauses, vec!["Arbitration"]);
    }
}
