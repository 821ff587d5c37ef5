//! JSON repair for malformed LLM output.
//!
//! The generator, summarizer and entity recognizer are all asked for JSON,
//! and all of them occasionally answer with something that is almost JSON:
//!
//! - Wrapped in markdown fences (`` ```json ... ``` ``)
//! - Preceded or followed by prose ("Here are the responses: [...]")
//! - Trailing commas after the last element in objects/arrays
//! - Unquoted keys (`{response: "..."}`)
//! - Truncated output (missing closing brackets, braces or quotes)
//!
//! [`repair_json`] fixes these cases before the text reaches
//! `serde_json::from_str`. It is not a JSON parser and does not try to fix
//! anything else.
//!
//! # Usage
//!
//! ```ignore
//! use lexrag_core::json_repair::parse_with_repair;
//!
//! let raw = "Sure! ```json\n[{\"response\": \"Section 13 applies\",}]\n```";
//! let value = parse_with_repair(raw)?;
//! ```

/// Attempt to repair malformed JSON from LLM output.
///
/// Steps, in order:
///
/// 1. Strip markdown fences.
/// 2. Cut away prose around the outermost JSON value.
/// 3. Close truncated strings, arrays and objects.
/// 4. Drop trailing commas before `]` and `}`.
/// 5. Quote bare object keys.
pub fn repair_json(input: &str) -> String {
    let stripped = strip_markdown_fences(input);
    let extracted = extract_json_span(&stripped);
    let closed = close_truncated(extracted);
    let no_trailing = fix_trailing_commas(&closed);
    fix_unquoted_keys(&no_trailing)
}

/// Parse JSON, repairing it first only if the plain parse fails.
pub fn parse_with_repair(input: &str) -> Result<serde_json::Value, serde_json::Error> {
    if let Ok(value) = serde_json::from_str(input) {
        return Ok(value);
    }
    serde_json::from_str(&repair_json(input))
}

/// Tracks whether the scanner is inside a string literal.
#[derive(Debug, Default)]
struct StringTracker {
    in_string: bool,
    escaped: bool,
}

impl StringTracker {
    /// Feed one character. Returns `true` when `c` sits outside any string
    /// literal and is not itself a quote.
    fn structural(&mut self, c: char) -> bool {
        if self.escaped {
            self.escaped = false;
            return false;
        }
        if self.in_string {
            match c {
                '\\' => self.escaped = true,
                '"' => self.in_string = false,
                _ => {}
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

// ── Step 1: markdown fences ─────────────────────────────────────────────

fn strip_markdown_fences(input: &str) -> String {
    let trimmed = input.trim();

    let Some(fence_start) = trimmed.find("```") else {
        return trimmed.to_string();
    };
    let after_open = &trimmed[fence_start + 3..];
    let after_open = after_open
        .strip_prefix("json")
        .or_else(|| after_open.strip_prefix("JSON"))
        .unwrap_or(after_open);
    let after_open = after_open.trim_start_matches([' ', '\t']);
    let after_open = after_open.strip_prefix('\n').unwrap_or(after_open);

    match after_open.find("```") {
        Some(close) => after_open[..close].trim_end().to_string(),
        None => after_open.trim_end().to_string(),
    }
}

// ── Step 2: surrounding prose ───────────────────────────────────────────

/// Slice from the first `[` or `{` to the last `]` or `}`.
///
/// If no closer follows the opener, the rest of the input is kept so that
/// truncated output can still be closed.
fn extract_json_span(input: &str) -> &str {
    let Some(start) = input.find(['[', '{']) else {
        return input;
    };
    let tail = &input[start..];
    match tail.rfind([']', '}']) {
        Some(end) => &tail[..=end],
        None => tail,
    }
}

// ── Step 3: truncation ──────────────────────────────────────────────────

fn close_truncated(input: &str) -> String {
    let mut tracker = StringTracker::default();
    let mut stack: Vec<char> = Vec::new();

    for c in input.chars() {
        if !tracker.structural(c) {
            continue;
        }
        match c {
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                if stack.last() == Some(&c) {
                    stack.pop();
                }
            }
            _ => {}
        }
    }

    if !tracker.in_string && stack.is_empty() {
        return input.to_string();
    }

    let mut result = input.to_string();
    if tracker.in_string {
        // A dangling backslash would escape the closing quote.
        if tracker.escaped {
            result.pop();
        }
        result.push('"');
    }
    result.extend(stack.into_iter().rev());
    result
}

// ── Step 4: trailing commas ─────────────────────────────────────────────

fn fix_trailing_commas(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut tracker = StringTracker::default();
    let mut result = String::with_capacity(chars.len());

    for (i, &c) in chars.iter().enumerate() {
        if tracker.structural(c) && c == ',' {
            let next = chars[i + 1..].iter().find(|ch| !ch.is_whitespace());
            if matches!(next, Some(']') | Some('}')) {
                continue;
            }
        }
        result.push(c);
    }
    result
}

// ── Step 5: unquoted keys ───────────────────────────────────────────────

fn fix_unquoted_keys(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let len = chars.len();
    let mut tracker = StringTracker::default();
    let mut result = String::with_capacity(len + 16);
    let mut i = 0;

    while i < len {
        let c = chars[i];
        if tracker.structural(c) && is_key_start_char(c) {
            let start = i;
            while i < len && is_key_char(chars[i]) {
                i += 1;
            }
            let next = chars[i..].iter().find(|ch| !ch.is_whitespace());
            if next == Some(&':') {
                result.push('"');
                result.extend(&chars[start..i]);
                result.push('"');
            } else {
                // A bare value such as `true` or `null`.
                result.extend(&chars[start..i]);
            }
            continue;
        }
        result.push(c);
        i += 1;
    }
    result
}

fn is_key_start_char(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
