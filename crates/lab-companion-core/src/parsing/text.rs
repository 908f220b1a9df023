//! OCR text clean-up helpers.

use std::sync::LazyLock;

use regex::Regex;

/// (pattern, replacement) pairs fixing letter/digit confusions next to digits.
static OCR_DIGIT_FIXES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        // lowercase L read for 1
        (r"(\d)l(\d)", "${1}1${2}"),
        (r"\bl(\d)", "1${1}"),
        (r"(\d)l\b", "${1}1"),
        // capital O read for 0
        (r"(\d)O(\d)", "${1}0${2}"),
        (r"\bO(\d)", "0${1}"),
        (r"(\d)O\b", "${1}0"),
        // capital I read for 1
        (r"(\d)I(\d)", "${1}1${2}"),
        (r"\bI(\d)", "1${1}"),
        (r"(\d)I\b", "${1}1"),
        // S read for 5
        (r"(\d)S(\d)", "${1}5${2}"),
        (r"(\d)S\b", "${1}5"),
        // B read for 8
        (r"(\d)B(\d)", "${1}8${2}"),
    ]
    .into_iter()
    .map(|(pattern, replacement)| (Regex::new(pattern).unwrap(), replacement))
    .collect()
});

static EXCESS_BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());
static INLINE_WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+").unwrap());
static NAME_DISALLOWED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s\-()]").unwrap());
static ANY_WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static FIRST_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+\.?\d*)").unwrap());

fn is_zero_width(c: char) -> bool {
    matches!(c, '\u{200b}'..='\u{200f}' | '\u{feff}')
}

/// Clean raw OCR output before line parsing.
pub fn clean_ocr_text(raw_text: &str) -> String {
    if raw_text.is_empty() {
        return String::new();
    }

    let text = raw_text.replace("\r\n", "\n").replace('\r', "\n");
    let text = EXCESS_BLANK_LINES.replace_all(&text, "\n\n");
    let mut text = text
        .split('\n')
        .map(|line| INLINE_WHITESPACE.replace_all(line, " "))
        .collect::<Vec<_>>()
        .join("\n");

    for (pattern, replacement) in OCR_DIGIT_FIXES.iter() {
        text = pattern.replace_all(&text, *replacement).into_owned();
    }

    let text: String = text.chars().filter(|c| !is_zero_width(*c)).collect();

    text.split('\n')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Lower-case a test name and strip punctuation other than `-` and parentheses.
pub fn normalize_test_name(test_name: &str) -> String {
    let lower = test_name.to_lowercase();
    let stripped = NAME_DISALLOWED.replace_all(&lower, "");
    ANY_WHITESPACE.replace_all(&stripped, " ").trim().to_string()
}

/// Split the first number from the text that follows it.
///
/// `"7.2 mg/dL"` gives `(7.2, "mg/dL")`.
pub fn extract_numeric_value(value_str: &str) -> Option<(f64, String)> {
    let m = FIRST_NUMBER.find(value_str)?;
    let value = m.as_str().parse::<f64>().ok()?;
    Some((value, value_str[m.end()..].trim().to_string()))
}

/// True when every cased character is upper-case and at least one exists.
pub(crate) fn is_all_caps(line: &str) -> bool {
    let mut cased = false;
    for c in line.chars() {
        if c.is_lowercase() {
            return false;
        }
        if c.is_uppercase() {
            cased = true;
        }
    }
    cased
}

/// Quick filter for lines that could hold a name and a value.
pub fn is_likely_test_result_line(line: &str) -> bool {
    if line.trim().chars().count() < 3 {
        return false;
    }
    if !line.chars().any(|c| c.is_ascii_alphabetic()) {
        return false;
    }
    if !line.chars().any(|c| c.is_ascii_digit()) {
        return false;
    }
    let starts_with_digit = line.chars().next().is_some_and(|c| c.is_ascii_digit());
    !(is_all_caps(line) && !starts_with_digit)
}
