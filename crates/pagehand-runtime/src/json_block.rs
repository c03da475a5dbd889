//! Lenient extraction of a JSON object embedded in model output.

use serde_json::Value;

/// Find the first JSON object in `text`.
///
/// Tries a fenced code block first, then the first balanced `{...}` span.
pub(crate) fn extract_json_object(text: &str) -> Option<Value> {
    if let Some(block) = fenced_block(text) {
        if let Some(value) = first_object(block) {
            return Some(value);
        }
    }
    first_object(text)
}

fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after = &text[start + 3..];
    let body_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after[body_start..];
    let end = body.find("```")?;
    Some(&body[..end])
}

/// Scan for balanced braces, skipping over string literals.
fn first_object(text: &str) -> Option<Value> {
    let bytes = text.as_bytes();
    let mut search_from = 0;

    while let Some(offset) = text[search_from..].find('{') {
        let start = search_from + offset;
        let mut depth = 0usize;
        let mut in_string = false;
        let mut escaped = false;

        for (i, &b) in bytes.iter().enumerate().skip(start) {
            if in_string {
                match b {
                    _ if escaped => escaped = false,
                    b'\\' => escaped = true,
                    b'"' => in_string = false,
                    _ => {}
                }
                continue;
            }
            match b {
                b'"' => in_string = true,
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        let candidate = serde_json::from_str::<Value>(&text[start..=i]);
                        if let Ok(value @ Value::Object(_)) = candidate {
                            return Some(value);
                        }
                        break;
                    }
                }
                _ => {}
            }
        }

        search_from = start + 1;
    }

    None
}
