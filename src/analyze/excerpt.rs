//! Excerpt formatting for subject classification.
//!
//! Long inputs are reduced to their high-signal lines before they are shown to
//! the model. Priority order: title, headings, math notation, measurement
//! units, definitional keywords, then the leading lines. Each line appears
//! once; the result is capped at [`EXCERPT_CHAR_BUDGET`] characters.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::language::truncate_chars;

pub const EXCERPT_CHAR_BUDGET: usize = 4000;
pub const LEADING_LINES: usize = 10;
const TITLE_MAX_CHARS: usize = 120;
const HEADING_MAX_CHARS: usize = 80;

static RE_MD_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#{1,6}\s+\S").expect("heading regex"));
static RE_NUMBERED_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\d+(?:\.\d+)*|[IVX]+)[.)]?\s+\p{Lu}").expect("numbered heading regex")
});

static RE_MATH: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // x = 2y, f(x) ≤ 3
        r"[\w)\]]\s*[=≈≠≤≥]\s*[\w(\[\-√]",
        // 3 + 4, 2^8, 6 × 7
        r"\d\s*[+\-*/^×÷]\s*\d",
        r"[∑∫√π∞∂Δθλσ]",
        r"(?i)\b(?:sin|cos|tan|log|ln|lim|exp)\s*\(",
        r"\w\^\d",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("math regex"))
    .collect()
});

static RE_UNITS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b\d+(?:[.,]\d+)?\s?(?:°c|°f|(?:mm|cm|km|m|kg|mg|g|ms|ns|s|khz|mhz|hz|kn|n|kj|j|kw|w|mv|v|ma|kpa|pa|mol|ml|l|k)(?:/s²|/s2|/s|²|³)?\b)",
    )
    .expect("units regex")
});

static RE_DEFINITION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:theorem|proof|lemma|corollary|definition|defined as|algorithm|reaction|equation|formula|hypothesis|law of|principle|axiom)\b",
    )
    .expect("definition regex")
});

fn is_heading(line: &str) -> bool {
    if RE_MD_HEADING.is_match(line) {
        return true;
    }
    let short = line.chars().count() <= HEADING_MAX_CHARS;
    if !short {
        return false;
    }
    if line.ends_with(':') {
        return true;
    }
    let letters: Vec<char> = line.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.len() >= 3 && letters.iter().all(|c| c.is_uppercase()) {
        return true;
    }
    RE_NUMBERED_HEADING.is_match(line)
}

fn has_math(line: &str) -> bool {
    RE_MATH.iter().any(|re| re.is_match(line))
}

fn has_units(line: &str) -> bool {
    RE_UNITS.is_match(line)
}

fn has_definition(line: &str) -> bool {
    RE_DEFINITION.is_match(line)
}

struct ExcerptBuilder<'a> {
    lines: Vec<&'a str>,
    taken: Vec<bool>,
    seen: HashSet<String>,
    out: Vec<String>,
    chars: usize,
}

impl<'a> ExcerptBuilder<'a> {
    fn new(lines: Vec<&'a str>) -> Self {
        let taken = vec![false; lines.len()];
        Self {
            lines,
            taken,
            seen: HashSet::new(),
            out: Vec::new(),
            chars: 0,
        }
    }

    fn full(&self) -> bool {
        self.chars >= EXCERPT_CHAR_BUDGET
    }

    fn take(&mut self, idx: usize, text: &str) {
        if self.taken[idx] || self.full() {
            return;
        }
        self.taken[idx] = true;
        // repeated lines keep their first position only
        if !self.seen.insert(text.to_string()) {
            return;
        }
        // +1 for the joining newline
        self.chars += text.chars().count() + 1;
        self.out.push(text.to_string());
    }

    fn take_matching(&mut self, pred: fn(&str) -> bool) {
        for idx in 0..self.lines.len() {
            if self.full() {
                return;
            }
            let line = self.lines[idx];
            if pred(line) {
                self.take(idx, line);
            }
        }
    }

    fn finish(self) -> String {
        let joined = self.out.join("\n");
        truncate_chars(&joined, EXCERPT_CHAR_BUDGET).to_string()
    }
}

/// Builds the prioritized excerpt of `text`.
pub fn format_excerpt(text: &str) -> String {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    if lines.is_empty() {
        return String::new();
    }

    let mut b = ExcerptBuilder::new(lines);

    let title = truncate_chars(b.lines[0], TITLE_MAX_CHARS).to_string();
    b.take(0, &title);

    b.take_matching(is_heading);
    b.take_matching(has_math);
    b.take_matching(has_units);
    b.take_matching(has_definition);

    for idx in 0..b.lines.len().min(LEADING_LINES) {
        let line = b.lines[idx];
        b.take(idx, line);
    }

    b.finish()
}
