//! First-JSON-object extraction from free-form model output.
//!
//! Reasoning backends are asked to reply with a JSON object, but the schema
//! is requested via prompt only, so responses routinely arrive wrapped in
//! prose, markdown fences, or with stray braces. This module isolates the
//! brace-matching into a narrow utility so it can be tested against
//! malformed fixtures independently of any network orchestration.

use serde_json::Value;

/// Extract the first top-level balanced-brace JSON object from `text`.
///
/// Scans forward from each `{`, tracking string literals and escapes so
/// braces inside strings don't count. A balanced slice that fails to parse
/// is skipped and the scan continues, so `oops {not json} but {"ok": true}`
/// still yields the second object. Returns `None` when no parseable object
/// exists.
pub fn first_json_object(text: &str) -> Option<Value> {
    let mut search_from = 0;

    while let Some(rel) = text[search_from..].find('{') {
        let start = search_from + rel;
        if let Some(len) = balanced_object_len(&text[start..]) {
            if let Ok(value) = serde_json::from_str::<Value>(&text[start..start + len]) {
                if value.is_object() {
                    return Some(value);
                }
            }
        }
        search_from = start + 1;
    }

    None
}

/// Length of the balanced `{...}` slice starting at the first byte of `s`,
/// or `None` if the braces never balance.
fn balanced_object_len(s: &str) -> Option<usize> {
    let mut depth: usize = 0;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in s.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_object() {
        let v = first_json_object(r#"{"valid": true, "score": 80}"#).unwrap();
        assert_eq!(v["valid"], true);
        assert_eq!(v["score"], 80);
    }

    #[test]
    fn test_object_wrapped_in_prose() {
        let text = r#"Sure! Here is my assessment: {"valid": false, "score": 40} Hope that helps."#;
        let v = first_json_object(text).unwrap();
        assert_eq!(v["valid"], false);
    }

    #[test]
    fn test_markdown_fenced_object() {
        let text = "Here you go:\n```json\n{\"valid\": true, \"flags\": []}\n```\n";
        let v = first_json_object(text).unwrap();
        assert_eq!(v["valid"], true);
    }

    #[test]
    fn test_nested_objects_balanced() {
        let text = r#"{"outer": {"inner": {"deep": 1}}, "score": 5} trailing { brace"#;
        let v = first_json_object(text).unwrap();
        assert_eq!(v["outer"]["inner"]["deep"], 1);
        assert_eq!(v["score"], 5);
    }

    #[test]
    fn test_braces_inside_strings_ignored() {
        let text = r#"{"reason": "uses } and { freely", "valid": true}"#;
        let v = first_json_object(text).unwrap();
        assert_eq!(v["reason"], "uses } and { freely");
    }

    #[test]
    fn test_escaped_quote_inside_string() {
        let text = r#"{"reason": "she said \"no\" {", "valid": false}"#;
        let v = first_json_object(text).unwrap();
        assert_eq!(v["valid"], false);
    }

    #[test]
    fn test_skips_invalid_candidate_finds_later_object() {
        let text = r#"set {x} first, then {"valid": true}"#;
        let v = first_json_object(text).unwrap();
        assert_eq!(v["valid"], true);
    }

    #[test]
    fn test_no_json_at_all() {
        assert!(first_json_object("I cannot evaluate this content.").is_none());
    }

    #[test]
    fn test_unbalanced_braces() {
        assert!(first_json_object(r#"{"valid": true, "score": 80"#).is_none());
    }

    #[test]
    fn test_empty_input() {
        assert!(first_json_object("").is_none());
    }

    #[test]
    fn test_empty_object() {
        let v = first_json_object("result: {}").unwrap();
        assert!(v.as_object().unwrap().is_empty());
    }

    #[test]
    fn test_first_of_two_objects_wins() {
        let text = r#"{"which": "first"} {"which": "second"}"#;
        let v = first_json_object(text).unwrap();
        assert_eq!(v["which"], "first");
    }

    #[test]
    fn test_unterminated_string_is_not_an_object() {
        assert!(first_json_object(r#"{"reason": "never closes"#).is_none());
    }
}
