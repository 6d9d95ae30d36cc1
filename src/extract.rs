//! Best-effort JSON extraction from free-text model replies.
//!
//! Each strategy yields `Option` and never panics; [`extract_array`] tries them
//! in order and stops at the first hit.
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static ARRAY_OF_OBJECTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\[\s*\{.*\}\s*\]").expect("array pattern compiles"));

static SINGLE_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("object pattern compiles"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractStrategy {
    /// The whole reply is a JSON array
    Strict,
    /// First `[ { ... } ]` span in the reply
    ArraySlice,
    /// First `{ ... }` span, wrapped into a one-element array
    ObjectWrap,
}

/// Strategies used for recommendations and grocery lists.
pub const ARRAY_ONLY: &[ExtractStrategy] = &[ExtractStrategy::Strict, ExtractStrategy::ArraySlice];

/// Strategies used for weekly menus.
pub const ARRAY_OR_OBJECT: &[ExtractStrategy] = &[
    ExtractStrategy::Strict,
    ExtractStrategy::ArraySlice,
    ExtractStrategy::ObjectWrap,
];

impl ExtractStrategy {
    pub fn apply(&self, text: &str) -> Option<Vec<Value>> {
        match self {
            ExtractStrategy::Strict => as_array(serde_json::from_str(text.trim()).ok()?),
            ExtractStrategy::ArraySlice => {
                let m = ARRAY_OF_OBJECTS.find(text)?;
                as_array(serde_json::from_str(m.as_str()).ok()?)
            }
            ExtractStrategy::ObjectWrap => {
                let m = SINGLE_OBJECT.find(text)?;
                match serde_json::from_str::<Value>(m.as_str()).ok()? {
                    obj @ Value::Object(_) => Some(vec![obj]),
                    _ => None,
                }
            }
        }
    }
}

fn as_array(value: Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        _ => None,
    }
}

/// True when the reply has a bracketed span that merely failed to parse.
pub fn looks_like_json(text: &str) -> bool {
    ARRAY_OF_OBJECTS.is_match(text) || SINGLE_OBJECT.is_match(text)
}

/// Try each strategy in turn; `None` when none of them yields an array.
pub fn extract_array(text: &str, strategies: &[ExtractStrategy]) -> Option<Vec<Value>> {
    strategies.iter().find_map(|s| {
        let found = s.apply(text);
        if found.is_some() {
            tracing::debug!("JSON extracted with {:?} strategy", s);
        }
        found
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_whole_reply() {
        let got = extract_array(r#" [{"a": 1}, {"a": 2}] "#, ARRAY_ONLY).expect("array");
        assert_eq!(got.len(), 2);
    }

    #[test]
    fn test_strict_accepts_empty_array() {
        // emptiness is a validation concern, not an extraction one
        let got = extract_array("[]", ARRAY_ONLY).expect("array");
        assert!(got.is_empty());
    }

    #[test]
    fn test_array_slice_inside_prose_and_fences() {
        let reply = "Sure! Here you go:\n```json\n[\n  {\"title\": \"x\"}\n]\n```\nEnjoy.";
        let got = extract_array(reply, ARRAY_ONLY).expect("array");
        assert_eq!(got[0]["title"], "x");
    }

    #[test]
    fn test_no_json_yields_none() {
        assert!(extract_array("I cannot help with that.", ARRAY_OR_OBJECT).is_none());
    }

    #[test]
    fn test_malformed_array_yields_none() {
        assert!(extract_array("[{\"title\": \"x\",}]", ARRAY_ONLY).is_none());
    }

    #[test]
    fn test_looks_like_json() {
        assert!(looks_like_json("[{\"title\": \"x\",}]"));
        assert!(!looks_like_json("plain prose"));
    }

    #[test]
    fn test_object_wrap_only_when_enabled() {
        let reply = "Menu: {\"day\": \"Monday\", \"meals\": {}} done";
        assert!(extract_array(reply, ARRAY_ONLY).is_none());
        let got = extract_array(reply, ARRAY_OR_OBJECT).expect("wrapped");
        assert_eq!(got.len(), 1);
        assert_eq!(got[0]["day"], "Monday");
    }

    #[test]
    fn test_strict_object_is_not_an_array() {
        assert!(ExtractStrategy::Strict.apply("{\"a\": 1}").is_none());
    }
}
