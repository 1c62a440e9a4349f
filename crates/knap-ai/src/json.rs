//! Best-effort extraction of a JSON object from free-form model output.

/// Locate the first JSON-object-shaped substring: everything from the
/// first `{` through the last `}`, tolerating surrounding prose. Fragile
/// by nature — callers treat `None` (and any subsequent parse error) as
/// the operation's defined failure mode rather than hardening this step.
pub fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&raw[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_bare_objects_through() {
        let raw = r#"{"score": 80, "reason": "fits"}"#;
        assert_eq!(extract_json_object(raw), Some(raw));
    }

    #[test]
    fn strips_surrounding_prose() {
        let raw = "Sure, here is the result:\n{\"start_date\": \"2026-03-01\", \"end_date\": \"null\"}\nLet me know!";
        assert_eq!(
            extract_json_object(raw),
            Some("{\"start_date\": \"2026-03-01\", \"end_date\": \"null\"}")
        );
    }

    #[test]
    fn spans_nested_braces() {
        let raw = "x {\"a\": {\"b\": 1}} y";
        assert_eq!(extract_json_object(raw), Some("{\"a\": {\"b\": 1}}"));
    }

    #[test]
    fn rejects_text_without_an_object() {
        assert_eq!(extract_json_object("no dates found"), None);
        assert_eq!(extract_json_object("} backwards {"), None);
        assert_eq!(extract_json_object(""), None);
    }
}
