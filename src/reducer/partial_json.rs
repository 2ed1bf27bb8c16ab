//! Best-effort parsing of truncated JSON.
//!
//! Tool input arrives as a JSON document split into arbitrary text deltas.
//! To show the input while it streams, the received prefix is completed:
//! an open string value is closed, a dangling key/literal/separator is cut
//! back to the last complete value, and open containers are closed.

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Container {
    Object,
    Array,
}

impl Container {
    fn closer(self) -> char {
        match self {
            Container::Object => '}',
            Container::Array => ']',
        }
    }
}

fn close(prefix: &str, stack: &[Container]) -> String {
    let mut out = String::with_capacity(prefix.len() + stack.len());
    out.push_str(prefix);
    out.extend(stack.iter().rev().map(|c| c.closer()));
    out
}

/// Candidate completions of `input`, most complete first.
fn completions(input: &str) -> Vec<String> {
    let mut stack: Vec<Container> = Vec::new();
    // End offset and open containers after the last complete value.
    let mut checkpoint: Option<(usize, Vec<Container>)> = None;
    let mut in_string = false;
    let mut string_is_key = false;
    let mut escape = false;
    let mut expecting_key = false;
    let mut literal = String::new();

    for (i, c) in input.char_indices() {
        if in_string {
            if escape {
                escape = false;
            } else if c == '\\' {
                escape = true;
            } else if c == '"' {
                in_string = false;
                if !string_is_key {
                    checkpoint = Some((i + 1, stack.clone()));
                }
            }
            continue;
        }

        if c.is_ascii_alphabetic() {
            literal.push(c);
            if matches!(literal.as_str(), "true" | "false" | "null") {
                checkpoint = Some((i + 1, stack.clone()));
            }
            continue;
        }
        literal.clear();

        match c {
            '{' => {
                stack.push(Container::Object);
                expecting_key = true;
                checkpoint = Some((i + 1, stack.clone()));
            }
            '[' => {
                stack.push(Container::Array);
                expecting_key = false;
                checkpoint = Some((i + 1, stack.clone()));
            }
            '}' | ']' => {
                stack.pop();
                expecting_key = false;
                checkpoint = Some((i + 1, stack.clone()));
            }
            '"' => {
                in_string = true;
                string_is_key = expecting_key && stack.last() == Some(&Container::Object);
            }
            ':' => expecting_key = false,
            ',' => expecting_key = stack.last() == Some(&Container::Object),
            '0'..='9' => checkpoint = Some((i + 1, stack.clone())),
            _ => {}
        }
    }

    let mut candidates = Vec::new();
    if in_string && !string_is_key {
        let body = if escape {
            &input[..input.len() - 1]
        } else {
            input
        };
        candidates.push(close(&format!("{body}\""), &stack));
    }
    if let Some((end, open)) = checkpoint {
        candidates.push(close(&input[..end], &open));
    }
    candidates
}

/// Parse possibly truncated JSON. Returns `None` when nothing usable has
/// arrived yet.
pub fn parse_partial_json(input: &str) -> Option<Value> {
    if input.trim().is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str(input) {
        return Some(value);
    }
    completions(input)
        .into_iter()
        .find_map(|candidate| serde_json::from_str(&candidate).ok())
}
