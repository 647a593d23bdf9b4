//! JSON Repair Grammar
//!
//! Generators emit almost-JSON. This module isolates the outer object from
//! surrounding prose and applies a fixed, ordered set of textual repairs for
//! the defects observed in practice:
//!
//! 1. Missing `,` between adjacent scene objects (`}{"id": 2`)
//! 2. A dangling extra `}` before a closing `]` (`}}]`)
//! 3. Trailing `,` before `}` or `]`
//!
//! Repairs are applied once, in this order. Nothing here decides whether the
//! result is acceptable; the caller decodes it strictly.

use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

/// Remove a UTF-8 BOM and surrounding whitespace
pub fn preprocess(raw: &str) -> &str {
    raw.trim().trim_start_matches('\u{feff}').trim()
}

/// Span from the first `{` to the last `}`, inclusive
pub fn outer_object_span(s: &str) -> Option<&str> {
    let start = s.find('{')?;
    let end = s.rfind('}')?;
    (end > start).then(|| &s[start..=end])
}

/// Apply every repair rule once, in order
pub fn repair(span: &str) -> String {
    let mut result = insert_missing_scene_commas(span);
    result = collapse_dangling_braces(&result);
    result = strip_trailing_commas(&result);

    if result != span {
        debug!(
            before = span.len(),
            after = result.len(),
            "Applied JSON repairs"
        );
    }
    result
}

/// `}` directly followed by `{` whose first key identifies a scene
fn insert_missing_scene_commas(s: &str) -> String {
    static ADJACENT_SCENES: OnceLock<Regex> = OnceLock::new();
    let re = ADJACENT_SCENES.get_or_init(|| {
        Regex::new(r#"\}\s*\{\s*"(scene_number|id|number)""#)
            .expect("adjacent scene regex should compile")
    });
    replace_outside_strings(re, s, r#"},{"$1""#, usize::MAX)
}

/// Collapse `}}]` into `}]`, but only while there are more closing than
/// opening braces. Well-formed nested objects are left alone.
fn collapse_dangling_braces(s: &str) -> String {
    static DANGLING: OnceLock<Regex> = OnceLock::new();
    let re = DANGLING.get_or_init(|| {
        Regex::new(r"\}\s*\}\s*\]").expect("dangling brace regex should compile")
    });

    let excess = brace_excess(s);
    if excess == 0 {
        return s.to_string();
    }
    replace_outside_strings(re, s, "}]", excess)
}

/// `,` followed only by whitespace before `}` or `]`
fn strip_trailing_commas(s: &str) -> String {
    static TRAILING: OnceLock<Regex> = OnceLock::new();
    let re = TRAILING
        .get_or_init(|| Regex::new(r",\s*([}\]])").expect("trailing comma regex should compile"));
    replace_outside_strings(re, s, "$1", usize::MAX)
}

/// Replace at most `limit` matches of `re`, skipping any match that starts
/// inside a string literal
fn replace_outside_strings(re: &Regex, s: &str, replacement: &str, limit: usize) -> String {
    let quoted = quoted_bytes(s);
    let mut out = String::with_capacity(s.len());
    let mut last = 0;
    let mut replaced = 0;

    for caps in re.captures_iter(s) {
        if replaced == limit {
            break;
        }
        let Some(m) = caps.get(0) else { continue };
        if quoted[m.start()] {
            continue;
        }
        out.push_str(&s[last..m.start()]);
        caps.expand(replacement, &mut out);
        last = m.end();
        replaced += 1;
    }

    out.push_str(&s[last..]);
    out
}

/// Per-byte flag: true when the byte sits inside a string literal.
/// The closing quote counts as inside, the opening quote does not.
fn quoted_bytes(s: &str) -> Vec<bool> {
    let mut quoted = vec![false; s.len()];
    let mut in_string = false;
    let mut escape = false;

    for (i, ch) in s.char_indices() {
        quoted[i..i + ch.len_utf8()].fill(in_string);
        if escape {
            escape = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape = true,
            '"' => in_string = !in_string,
            _ => {}
        }
    }
    quoted
}

/// Closing braces minus opening braces, ignoring braces inside strings
fn brace_excess(s: &str) -> usize {
    let quoted = quoted_bytes(s);
    let (open, close) = s
        .bytes()
        .zip(quoted)
        .filter(|(_, inside)| !inside)
        .fold((0usize, 0usize), |(open, close), (b, _)| match b {
            b'{' => (open + 1, close),
            b'}' => (open, close + 1),
            _ => (open, close),
        });

    close.saturating_sub(open)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preprocess_strips_bom() {
        assert_eq!(preprocess("\u{feff}  {\"a\":1}\n"), "{\"a\":1}");
    }

    #[test]
    fn test_outer_span_from_prose() {
        let text = r#"Here's the story: {"title": "T", "scenes": []} Hope this helps!"#;
        assert_eq!(
            outer_object_span(text),
            Some(r#"{"title": "T", "scenes": []}"#)
        );
        assert_eq!(outer_object_span("no json"), None);
        assert_eq!(outer_object_span("} backwards {"), None);
    }

    #[test]
    fn test_insert_missing_scene_commas() {
        let input = r#"[{"id":1,"description":"a"}{"id":2,"description":"b"}]"#;
        assert_eq!(
            insert_missing_scene_commas(input),
            r#"[{"id":1,"description":"a"},{"id":2,"description":"b"}]"#
        );

        let spaced = "{\"scene_number\":1}\n  {\"scene_number\":2}";
        assert_eq!(
            insert_missing_scene_commas(spaced),
            r#"{"scene_number":1},{"scene_number":2}"#
        );
    }

    #[test]
    fn test_missing_comma_ignores_other_keys() {
        let input = r#"{"a":{"x":1}}{"title":"t"}"#;
        assert_eq!(insert_missing_scene_commas(input), input);
    }

    #[test]
    fn test_collapse_only_when_unbalanced() {
        let nested = r#"{"scenes":[{"meta":{"k":1}}]}"#;
        assert_eq!(collapse_dangling_braces(nested), nested);

        let dangling = r#"{"scenes":[{"id":1}}]}"#;
        assert_eq!(collapse_dangling_braces(dangling), r#"{"scenes":[{"id":1}]}"#);
    }

    #[test]
    fn test_strip_trailing_commas() {
        assert_eq!(
            strip_trailing_commas(r#"{"scenes":[{"id":1,},],}"#),
            r#"{"scenes":[{"id":1}]}"#
        );
    }

    #[test]
    fn test_brace_excess_ignores_strings() {
        assert_eq!(brace_excess(r#"{"text":"}}}"}"#), 0);
        assert_eq!(brace_excess(r#"{"a":1}}"#), 1);
        assert_eq!(brace_excess(r#"{"a":"\"}"}"#), 0);
    }

    #[test]
    fn test_rules_skip_string_contents() {
        let comma = r#"{"text":"wait, }"}"#;
        assert_eq!(strip_trailing_commas(comma), comma);

        let dangling = r#"{"scenes":[{"text":"x}}]"},{"id":2}}]}"#;
        assert_eq!(
            collapse_dangling_braces(dangling),
            r#"{"scenes":[{"text":"x}}]"},{"id":2}]}"#
        );

        let escaped = r#"{"text":"say \"}{\"id\"\" ok"}{"id":2}"#;
        assert_eq!(
            insert_missing_scene_commas(escaped),
            r#"{"text":"say \"}{\"id\"\" ok"},{"id":2}"#
        );
    }

    #[test]
    fn test_quoted_bytes_tracks_escapes() {
        let mask = quoted_bytes(r#"{"a\"b":1}"#);
        assert_eq!(
            mask,
            vec![false, false, true, true, true, true, true, false, false, false]
        );
    }

    #[test]
    fn test_repair_applies_all_rules() {
        let broken = r#"{"scenes":[{"id":1,"text":"a",}{"id":2,"text":"b"}}]}"#;
        let repaired = repair(broken);
        assert!(serde_json::from_str::<serde_json::Value>(&repaired).is_ok());
    }
}
