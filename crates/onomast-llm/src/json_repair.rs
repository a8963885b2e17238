//! Recovering JSON objects from model output.
//!
//! Even in JSON mode, models sometimes wrap the object in a markdown fence,
//! prefix it with a sentence, leave a trailing comma, or stop mid-object
//! when they hit the token limit. [`parse_object`] tries the raw text first
//! and only then runs the repair pass:
//!
//! 1. strip `` ```json `` fences
//! 2. keep the span from the first `{` to the last `}` (or to the end when
//!    the object was cut off)
//! 3. drop commas directly before `}` / `]`
//! 4. close an unterminated string and any open brackets

use serde::de::DeserializeOwned;

/// Parse `input` as `T`, repairing it if the plain parse fails.
pub fn parse_object<T: DeserializeOwned>(input: &str) -> Result<T, serde_json::Error> {
    if let Ok(value) = serde_json::from_str(input) {
        return Ok(value);
    }
    serde_json::from_str(&repair_json(input))
}

/// Apply every repair step to `input`.
pub fn repair_json(input: &str) -> String {
    let unfenced = strip_markdown_fences(input);
    let object = outermost_object(unfenced);
    let no_trailing = drop_trailing_commas(object);
    close_truncated(&no_trailing)
}

fn strip_markdown_fences(input: &str) -> &str {
    let trimmed = input.trim();
    let Some(after_open) = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
    else {
        return trimmed;
    };
    let body = after_open.trim_start();
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

fn outermost_object(input: &str) -> &str {
    let Some(start) = input.find('{') else {
        return input;
    };
    match input.rfind('}') {
        Some(end) if end > start => &input[start..=end],
        _ => &input[start..],
    }
}

/// Tracks whether a scan position sits inside a string literal.
#[derive(Default)]
struct Lexer {
    in_string: bool,
    escaped: bool,
}

impl Lexer {
    /// Feed one char; returns true when it is structural (outside strings).
    fn structural(&mut self, c: char) -> bool {
        if self.in_string {
            if self.escaped {
                self.escaped = false;
            } else if c == '\\' {
                self.escaped = true;
            } else if c == '"' {
                self.in_string = false;
            }
            return false;
        }
        if c == '"' {
            self.in_string = true;
            return false;
        }
        true
    }
}

fn drop_trailing_commas(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut lexer = Lexer::default();

    for (i, &c) in chars.iter().enumerate() {
        if lexer.structural(c) && c == ',' {
            let next = chars[i + 1..].iter().find(|ch| !ch.is_whitespace());
            if matches!(next, Some('}') | Some(']')) {
                continue;
            }
        }
        out.push(c);
    }
    out
}

fn close_truncated(input: &str) -> String {
    let mut closers: Vec<char> = Vec::new();
    let mut lexer = Lexer::default();

    for c in input.chars() {
        if !lexer.structural(c) {
            continue;
        }
        match c {
            '{' => closers.push('}'),
            '[' => closers.push(']'),
            '}' | ']' if closers.last() == Some(&c) => {
                closers.pop();
            }
            _ => {}
        }
    }

    let mut out = input.trim_end().to_string();
    if lexer.in_string {
        out.push('"');
    }
    while !lexer.in_string && out.ends_with(',') {
        out.pop();
        out.truncate(out.trim_end().len());
    }
    out.extend(closers.into_iter().rev());
    out
}
