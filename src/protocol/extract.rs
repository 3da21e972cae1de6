// src/protocol/extract.rs

//! Pulls a JSON object out of free-form model output.
//!
//! Models routinely wrap the payload in commentary, code fences or
//! `<think>` blocks. Extraction never fails: callers get `None` and pick their
//! own fallback.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static THINK_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<think>.*?(</think>|$)").expect("valid think-block regex"));

static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*```[A-Za-z]*\s*$").expect("valid code-fence regex"));

static WIDEST_OBJECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{[\s\S]*\}").expect("valid object regex"));

/// Removes reasoning blocks and markdown fences.
pub fn clean(raw: &str) -> String {
    let without_think = THINK_BLOCK.replace_all(raw, "");
    CODE_FENCE.replace_all(&without_think, "").into_owned()
}

/// Returns the first balanced `{...}` span that decodes to a JSON object,
/// else the widest `{...}` span if that decodes, else `None`.
pub fn extract_json_object(raw: &str) -> Option<Value> {
    let text = clean(raw);

    for (start, _) in text.match_indices('{') {
        let Some(end) = balanced_end(&text[start..]) else {
            continue;
        };
        if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(&text[start..start + end]) {
            return Some(value);
        }
    }

    WIDEST_OBJECT
        .find(&text)
        .and_then(|m| serde_json::from_str::<Value>(m.as_str()).ok())
        .filter(Value::is_object)
}

/// Byte length of the brace-balanced prefix of `text`, which must start with
/// `{`. Braces inside JSON strings are ignored.
fn balanced_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, ch) in text.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(idx + 1);
                }
            }
            _ => {}
        }
    }
    None
}
