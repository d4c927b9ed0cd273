//! Locate a JSON candidate inside free-form model output.
//!
//! Nothing here parses JSON. The extractors only return the substring that
//! the normalizer should try to parse.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex_lite::Regex;

static OBJECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("valid regex"));
static LIST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\[.*\]").expect("valid regex"));

/// How the object candidate is cut out of the completion text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractionStrategy {
    /// First brace-balanced object, string and escape aware.
    #[default]
    Balanced,
    /// First `{` through last `}`.
    Greedy,
}

impl ExtractionStrategy {
    pub fn extract<'a>(&self, text: &'a str) -> Option<&'a str> {
        match self {
            Self::Balanced => extract_balanced_object(text),
            Self::Greedy => extract_json_object(text),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Balanced => "balanced",
            Self::Greedy => "greedy",
        }
    }
}

impl fmt::Display for ExtractionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExtractionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "balanced" => Ok(Self::Balanced),
            "greedy" => Ok(Self::Greedy),
            other => Err(format!("unknown extraction strategy '{other}'")),
        }
    }
}

/// Greedy object span: first `{` through last `}`.
///
/// Not nesting-aware, so two independent objects come back as one span.
pub fn extract_json_object(text: &str) -> Option<&str> {
    OBJECT_RE.find(text).map(|m| m.as_str())
}

/// Greedy list span: first `[` through last `]`.
pub fn extract_json_list(text: &str) -> Option<&str> {
    LIST_RE.find(text).map(|m| m.as_str())
}

/// First brace-balanced object in `text`.
///
/// Braces inside string literals are ignored. Openers that never close are
/// skipped, so the earliest object that does close wins. One pass over the
/// text, however many openers are left dangling.
pub fn extract_balanced_object(text: &str) -> Option<&str> {
    let mut open: Vec<usize> = Vec::new();
    let mut earliest: Option<(usize, usize)> = None;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            // Quotes in prose before the first opener are not strings.
            '"' if !open.is_empty() => in_string = true,
            '{' => open.push(i),
            '}' => {
                let Some(start) = open.pop() else {
                    continue;
                };
                let end = i + c.len_utf8();
                if open.is_empty() {
                    // Nothing earlier is still open, so nothing can beat it.
                    return Some(&text[start..end]);
                }
                if earliest.map_or(true, |(best, _)| start < best) {
                    earliest = Some((start, end));
                }
            }
            _ => {}
        }
    }

    earliest.map(|(start, end)| &text[start..end])
}
