//! AmountLexer - money mention detection
//!
//! Finds monetary amounts in free text in three surface forms:
//! - Symbol-prefixed: `$5`, `£ 1,200.50`, `€1.2m`, `$3 thousand`
//! - Number-then-code: `250 USD`, `4.5bn EUR`
//! - Code-then-number: `GBP 40`, `JPY 1,000k`
//!
//! The scan is a small combinator pipeline rather than one big alternation:
//! at each candidate offset the first character picks the form, and each
//! form is assembled from atom parsers (symbol, number, scale, code). Matches
//! never overlap; scanning resumes after the end of the previous match.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ops::Range;

// ==================== PATTERNS ====================

/// Comma-grouped thousands, optional decimals
static GROUPED_NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\A[0-9]{1,3}(?:,[0-9]{3})+(?:\.[0-9]+)?").unwrap()
});

/// Plain digit run, optional decimals
static PLAIN_NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\A[0-9]+(?:\.[0-9]+)?").unwrap());

/// Word-like scales may be separated from the number by whitespace
static WORD_SCALE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\A\s*(thousand|million|billion|trillion|mn|bn|tn)\b").unwrap()
});

/// Single-letter scales must touch the number (`5k`, not `5 k`)
static LETTER_SCALE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\A(k|m|b|t)").unwrap());

static CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\A[A-Z]{3}\b").unwrap());

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\A\s+").unwrap());

pub const CURRENCY_SYMBOLS: &[char] = &[
    '$', '£', '€', '¥', '₹', '₩', '₽', '₺', '₦', '₱', '₪', '₫', '฿', '₴',
];

pub const CURRENCY_CODES: &[&str] = &[
    "USD", "EUR", "GBP", "JPY", "CNY", "INR", "AUD", "CAD", "CHF", "NZD", "SEK",
    "NOK", "DKK", "HKD", "SGD", "KRW", "ZAR", "BRL", "MXN", "RUB", "PLN", "TRY",
];

// ==================== TYPE DEFINITIONS ====================

/// Shorthand multiplier following a number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scale {
    Thousand,
    Million,
    Billion,
    Trillion,
}

impl Scale {
    pub fn factor(&self) -> f64 {
        match self {
            Scale::Thousand => 1e3,
            Scale::Million => 1e6,
            Scale::Billion => 1e9,
            Scale::Trillion => 1e12,
        }
    }

    fn from_word(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "k" | "thousand" => Some(Scale::Thousand),
            "m" | "mn" | "million" => Some(Scale::Million),
            "b" | "bn" | "billion" => Some(Scale::Billion),
            "t" | "tn" | "trillion" => Some(Scale::Trillion),
            _ => None,
        }
    }
}

/// Which surface form matched, with that form's own sub-captures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "form", rename_all = "camelCase")]
pub enum MoneyKind {
    Symbol { symbol: char, number: String, scale: Option<Scale> },
    CodeSuffix { code: String, number: String, scale: Option<Scale> },
    CodePrefix { code: String, number: String, scale: Option<Scale> },
}

impl MoneyKind {
    pub fn number(&self) -> &str {
        match self {
            MoneyKind::Symbol { number, .. }
            | MoneyKind::CodeSuffix { number, .. }
            | MoneyKind::CodePrefix { number, .. } => number,
        }
    }

    pub fn scale(&self) -> Option<Scale> {
        match self {
            MoneyKind::Symbol { scale, .. }
            | MoneyKind::CodeSuffix { scale, .. }
            | MoneyKind::CodePrefix { scale, .. } => *scale,
        }
    }

    /// Currency symbol or ISO code as written
    pub fn currency(&self) -> String {
        match self {
            MoneyKind::Symbol { symbol, .. } => symbol.to_string(),
            MoneyKind::CodeSuffix { code, .. } | MoneyKind::CodePrefix { code, .. } => code.clone(),
        }
    }
}

/// A single money mention
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoneyMatch {
    /// Byte offset of the first matched char
    pub start: usize,
    /// Byte offset one past the last matched char
    pub end: usize,
    pub raw: String,
    /// NaN or infinite when the numeric part does not parse to a usable value
    pub amount: f64,
    #[serde(flatten)]
    pub kind: MoneyKind,
}

impl MoneyMatch {
    pub fn span(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn is_convertible(&self) -> bool {
        self.amount.is_finite() && self.amount >= 0.0
    }
}

// ==================== ATOM PARSERS ====================
//
// Each parser takes the unconsumed input and returns the parsed value plus
// the number of bytes it consumed.

fn symbol(input: &str) -> Option<(char, usize)> {
    let c = input.chars().next()?;
    CURRENCY_SYMBOLS.contains(&c).then(|| (c, c.len_utf8()))
}

/// Groups are exactly three digits: `1,2345` falls back to the plain run `1`
fn number(input: &str) -> Option<(&str, usize)> {
    if let Some(m) = GROUPED_NUMBER_RE.find(input) {
        if !input[m.end()..].starts_with(|c: char| c.is_ascii_digit()) {
            return Some((m.as_str(), m.end()));
        }
    }
    PLAIN_NUMBER_RE.find(input).map(|m| (m.as_str(), m.end()))
}

fn scale(input: &str) -> Option<(Scale, usize)> {
    if let Some(cap) = WORD_SCALE_RE.captures(input) {
        let word = cap.get(1)?.as_str();
        let end = cap.get(0)?.end();
        return Scale::from_word(word).map(|s| (s, end));
    }
    let cap = LETTER_SCALE_RE.captures(input)?;
    let letter = cap.get(1)?.as_str();
    if !ends_letter_scale(input[letter.len()..].chars().next()) {
        return None;
    }
    Scale::from_word(letter).map(|s| (s, letter.len()))
}

/// `5k.` and `5k ` close a letter scale; `5t-shirt` and `5to` do not
fn ends_letter_scale(next: Option<char>) -> bool {
    match next {
        None => true,
        Some(c) => !(c.is_alphanumeric() || c == '-' || c == '_'),
    }
}

fn code(input: &str) -> Option<(&str, usize)> {
    let m = CODE_RE.find(input)?;
    CURRENCY_CODES.contains(&m.as_str()).then(|| (m.as_str(), m.end()))
}

fn whitespace(input: &str) -> Option<usize> {
    WHITESPACE_RE.find(input).map(|m| m.end())
}

fn optional_whitespace(input: &str) -> usize {
    whitespace(input).unwrap_or(0)
}

/// Strip separators, parse, apply scale. NaN when the digits do not parse.
pub fn parse_amount(number: &str, scale: Option<Scale>) -> f64 {
    let digits: String = number.chars().filter(|c| *c != ',').collect();
    match digits.parse::<f64>() {
        Ok(value) => value * scale.map_or(1.0, |s| s.factor()),
        Err(_) => f64::NAN,
    }
}

// ==================== FORMS ====================

/// `$ 1,200.50k`
fn symbol_form(input: &str) -> Option<(MoneyKind, usize)> {
    let (sym, mut pos) = symbol(input)?;
    pos += optional_whitespace(&input[pos..]);
    let (num, len) = number(&input[pos..])?;
    pos += len;
    let scale = scale(&input[pos..]).map(|(s, len)| {
        pos += len;
        s
    });
    Some((MoneyKind::Symbol { symbol: sym, number: num.to_string(), scale }, pos))
}

/// `4.5bn EUR`
fn code_suffix_form(input: &str) -> Option<(MoneyKind, usize)> {
    let (num, mut pos) = number(input)?;
    let scale = scale(&input[pos..]).map(|(s, len)| {
        pos += len;
        s
    });
    pos += whitespace(&input[pos..])?;
    let (cur, len) = code(&input[pos..])?;
    pos += len;
    Some((
        MoneyKind::CodeSuffix { code: cur.to_string(), number: num.to_string(), scale },
        pos,
    ))
}

/// `GBP 40k`
fn code_prefix_form(input: &str) -> Option<(MoneyKind, usize)> {
    let (cur, mut pos) = code(input)?;
    pos += whitespace(&input[pos..])?;
    let (num, len) = number(&input[pos..])?;
    pos += len;
    let scale = scale(&input[pos..]).map(|(s, len)| {
        pos += len;
        s
    });
    Some((
        MoneyKind::CodePrefix { code: cur.to_string(), number: num.to_string(), scale },
        pos,
    ))
}

/// A bare number or code may not start in the middle of a word or number
fn starts_token(prev: Option<char>) -> bool {
    match prev {
        None => true,
        Some(c) => !(c.is_alphanumeric() || c == '.' || c == ',' || c == '_'),
    }
}

// ==================== MAIN ENTRY ====================

/// Find all non-overlapping money mentions, left to right.
pub fn find_amounts(text: &str) -> Vec<MoneyMatch> {
    let mut matches = Vec::new();
    let mut consumed = 0;
    let mut prev: Option<char> = None;

    for (offset, c) in text.char_indices() {
        if offset < consumed {
            prev = Some(c);
            continue;
        }

        let rest = &text[offset..];
        let found = if CURRENCY_SYMBOLS.contains(&c) {
            symbol_form(rest)
        } else if c.is_ascii_digit() && starts_token(prev) {
            code_suffix_form(rest)
        } else if c.is_ascii_uppercase() && starts_token(prev) {
            code_prefix_form(rest)
        } else {
            None
        };

        if let Some((kind, len)) = found {
            let end = offset + len;
            let amount = parse_amount(kind.number(), kind.scale());
            matches.push(MoneyMatch {
                start: offset,
                end,
                raw: text[offset..end].to_string(),
                amount,
                kind,
            });
            consumed = end;
        }
        prev = Some(c);
    }

    matches
}

// ==================== TESTS ====================
