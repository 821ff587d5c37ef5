//! Entity anonymization.
//!
//! [`Anonymizer::anonymize`] replaces recognized entities with placeholders.
//! Each unique person name gets a stable `[Person N]` numbered by first
//! appearance; phone numbers, emails, locations and organizations get fixed
//! placeholders. Entities match as whole words only and the longest entity
//! wins where two overlap.
//!
//! Placeholders already present in the input are never touched, so running
//! the anonymizer on its own output changes nothing.

use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Entity classes the anonymizer knows how to replace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Person,
    Location,
    Organization,
    Phone,
    Email,
}

impl EntityKind {
    /// Fixed placeholder for non-person entities.
    fn placeholder(&self) -> Option<&'static str> {
        match self {
            Self::Person => None,
            Self::Phone => Some("[PHONE]"),
            Self::Email => Some("[EMAIL]"),
            Self::Location => Some("[LOCATION]"),
            Self::Organization => Some("[ORGANIZATION]"),
        }
    }

    /// Replacement order after person names.
    const FIXED_ORDER: [EntityKind; 4] = [
        EntityKind::Phone,
        EntityKind::Email,
        EntityKind::Location,
        EntityKind::Organization,
    ];
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Person => "person",
            Self::Location => "location",
            Self::Organization => "organization",
            Self::Phone => "phone",
            Self::Email => "email",
        };
        f.write_str(s)
    }
}

impl FromStr for EntityKind {
    type Err = String;

    /// Accepts plain names and NER tags (`PER`, `B-LOC`, `I-ORG`, `GPE`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let tag = upper
            .strip_prefix("B-")
            .or_else(|| upper.strip_prefix("I-"))
            .unwrap_or(upper.as_str());
        match tag {
            "PER" | "PERSON" | "NAME" => Ok(Self::Person),
            "LOC" | "LOCATION" | "GPE" | "ADDRESS" => Ok(Self::Location),
            "ORG" | "ORGANIZATION" | "ORGANISATION" => Ok(Self::Organization),
            "PHONE" | "PHONE_NUMBER" | "MOBILE" => Ok(Self::Phone),
            "EMAIL" | "EMAIL_ADDRESS" => Ok(Self::Email),
            other => Err(format!("unknown entity kind: {other}")),
        }
    }
}

/// An entity found by the recognizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Exact surface text as it appears in the input.
    pub text: String,
    pub kind: EntityKind,
}

impl Entity {
    pub fn new(text: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            text: text.into(),
            kind,
        }
    }
}

/// Anonymizer output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anonymized {
    pub text: String,
    /// Whether at least one replacement was made.
    pub redacted: bool,
}

/// A run of text; protected runs are placeholders and are never rewritten.
#[derive(Debug)]
struct Segment {
    text: String,
    protected: bool,
    /// Index of the person name this run replaced, numbered at the end.
    person: Option<usize>,
}

impl Segment {
    fn plain(text: &str) -> Self {
        Self {
            text: text.to_string(),
            protected: false,
            person: None,
        }
    }

    fn placeholder(text: &str) -> Self {
        Self {
            text: text.to_string(),
            protected: true,
            person: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Target {
    Person(usize),
    Fixed(&'static str),
}

/// Stateless entity anonymizer.
#[derive(Debug, Clone, Copy, Default)]
pub struct Anonymizer;

impl Anonymizer {
    pub fn new() -> Self {
        Self
    }

    /// Replace `entities` in `text` with placeholders.
    ///
    /// Entities only match as whole words, and longer entities are replaced
    /// before shorter ones, so "Raj" never eats into "Rajasthan".
    pub fn anonymize(&self, text: &str, entities: &[Entity]) -> Anonymized {
        let mut segments = split_placeholders(text);
        let first_free = segments
            .iter()
            .filter(|s| s.protected)
            .filter_map(|s| person_number(&s.text))
            .max()
            .unwrap_or(0)
            + 1;

        // Persons before fixed kinds so a text tagged as both stays a person.
        let mut targets: Vec<(&str, Target)> = Vec::new();
        let mut persons = 0;
        let ordered = entities
            .iter()
            .filter(|e| e.kind == EntityKind::Person)
            .chain(
                EntityKind::FIXED_ORDER
                    .into_iter()
                    .flat_map(|kind| entities.iter().filter(move |e| e.kind == kind)),
            );
        for entity in ordered {
            let needle = entity.text.trim();
            if !is_replaceable(needle) || targets.iter().any(|(t, _)| *t == needle) {
                continue;
            }
            let target = match entity.kind.placeholder() {
                Some(placeholder) => Target::Fixed(placeholder),
                None => {
                    persons += 1;
                    Target::Person(persons - 1)
                }
            };
            targets.push((needle, target));
        }
        targets.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        let mut redacted = false;
        for (needle, target) in &targets {
            let Some(pattern) = whole_word_pattern(needle) else {
                continue;
            };
            redacted |= replace_unprotected(&mut segments, &pattern, *target);
        }

        // Person numbers follow first appearance in the output.
        let mut numbers: Vec<Option<usize>> = vec![None; persons];
        let mut next = first_free;
        for segment in &mut segments {
            if let Some(index) = segment.person {
                let number = *numbers[index].get_or_insert_with(|| {
                    next += 1;
                    next - 1
                });
                segment.text = format!("[Person {number}]");
            }
        }

        let text: String = segments.into_iter().map(|s| s.text).collect();
        debug!(redacted, entities = entities.len(), "anonymization complete");
        Anonymized { text, redacted }
    }
}

/// `needle` as a literal, anchored on word boundaries where it starts or
/// ends with a word character.
fn whole_word_pattern(needle: &str) -> Option<Regex> {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let mut pattern = String::new();
    if needle.chars().next().is_some_and(is_word) {
        pattern.push_str(r"\b");
    }
    pattern.push_str(&regex::escape(needle));
    if needle.chars().next_back().is_some_and(is_word) {
        pattern.push_str(r"\b");
    }
    match Regex::new(&pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            debug!(error = %e, "skipping entity with unusable pattern");
            None
        }
    }
}

fn is_replaceable(text: &str) -> bool {
    !text.is_empty() && !text.contains('[') && !text.contains(']')
}

fn is_placeholder_body(body: &str) -> bool {
    matches!(
        body,
        "PHONE" | "EMAIL" | "LOCATION" | "ORGANIZATION" | "REDACTED"
    ) || person_number_body(body).is_some()
}

fn person_number_body(body: &str) -> Option<usize> {
    let digits = body.strip_prefix("Person ")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn person_number(placeholder: &str) -> Option<usize> {
    placeholder
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .and_then(person_number_body)
}

/// Split `text` into plain and placeholder runs.
fn split_placeholders(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut plain_start = 0;
    let mut cursor = 0;

    while let Some(open_rel) = text[cursor..].find('[') {
        let open = cursor + open_rel;
        let Some(close_rel) = text[open..].find(']') else {
            break;
        };
        let close = open + close_rel;
        if is_placeholder_body(&text[open + 1..close]) {
            if open > plain_start {
                segments.push(Segment::plain(&text[plain_start..open]));
            }
            segments.push(Segment::placeholder(&text[open..=close]));
            plain_start = close + 1;
            cursor = close + 1;
        } else {
            cursor = open + 1;
        }
    }

    if plain_start < text.len() {
        segments.push(Segment::plain(&text[plain_start..]));
    }
    segments
}

/// Replace every whole-word match of `pattern` in unprotected segments.
/// Returns whether anything was replaced.
fn replace_unprotected(segments: &mut Vec<Segment>, pattern: &Regex, target: Target) -> bool {
    let mut replaced = false;
    let mut out = Vec::with_capacity(segments.len());

    for segment in segments.drain(..) {
        if segment.protected || !pattern.is_match(&segment.text) {
            out.push(segment);
            continue;
        }
        replaced = true;
        let mut last = 0;
        for m in pattern.find_iter(&segment.text) {
            if m.start() > last {
                out.push(Segment::plain(&segment.text[last..m.start()]));
            }
            out.push(match target {
                Target::Fixed(placeholder) => Segment::placeholder(placeholder),
                Target::Person(index) => Segment {
                    text: String::new(),
                    protected: true,
                    person: Some(index),
                },
            });
            last = m.end();
        }
        if last < segment.text.len() {
            out.push(Segment::plain(&segment.text[last..]));
        }
    }

    *segments = out;
    replaced
}
