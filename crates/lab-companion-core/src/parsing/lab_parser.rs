//! Line-oriented parser for lab report text.

use std::sync::LazyLock;

use regex::Regex;

use super::text::{clean_ocr_text, is_all_caps, normalize_test_name};
use super::ParsedTest;

const NAME: &str = r"([A-Za-z0-9][A-Za-z0-9\s\-]*?)";
const UNIT: &str = r"([A-Za-z0-9/^µ%°\-\+]+)";
/// A unit glued to its value cannot start with a digit, or "250" would split into 25 and "0".
const GLUED_UNIT: &str = r"([A-Za-z/^µ%°\-\+][A-Za-z0-9/^µ%°\-\+]*)";

/// Line layouts, tried in order. The first match whose value parses wins.
static LINE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // WBC 7.2 10^3/µL
        format!(r"^{NAME}\s+([\d.]+)\s+{UNIT}$"),
        // Glucose: 95 mg/dL
        format!(r"^{NAME}:\s*([\d.]+)\s+{UNIT}$"),
        // Hemoglobin 14.5g/dL
        format!(r"^{NAME}\s+([\d.]+){GLUED_UNIT}$"),
        // Hematocrit: 42.5
        format!(r"^{NAME}:\s*([\d.]+)\s*$"),
        // Platelets 250
        format!(r"^{NAME}\s+([\d.]+)\s*$"),
        // WBC    7.2    10^3/µL
        format!(r"^{NAME}\s{{2,}}([\d.]+)\s{{2,}}{UNIT}$"),
        // WBC\t7.2\t10^3/µL
        format!(r"^{NAME}\t+([\d.]+)\t+{UNIT}$"),
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

const CBC_KEYWORDS: &[&str] = &[
    "wbc", "white blood", "leukocyte",
    "rbc", "red blood", "erythrocyte",
    "hemoglobin", "haemoglobin", "hgb", "hb",
    "hematocrit", "haematocrit", "hct",
    "platelet", "plt", "thrombocyte",
    "mcv", "mean corpuscular", "mean cell volume",
];

const METABOLIC_KEYWORDS: &[&str] = &[
    "glucose", "glu", "blood sugar", "fasting glucose",
    "bun", "urea nitrogen", "urea",
    "creatinine", "creat",
    "sodium", "na",
    "potassium", "k",
    "chloride", "cl",
    "co2", "carbon dioxide", "bicarbonate", "hco3",
    "calcium",
];

const LIPID_KEYWORDS: &[&str] = &[
    "cholesterol", "chol",
    "ldl", "low density",
    "hdl", "high density",
    "triglyceride", "trig", "tg",
];

/// Tests outside the supported panels whose names overlap a keyword.
const EXCLUDED_TERMS: &[&str] = &[
    "hba1c", "a1c", "hemoglobin a1c",
    "vitamin", "vit",
    "tsh", "thyroid",
    "t3", "t4",
    "ferritin",
    "b12", "cobalamin",
    "folate", "folic acid",
    "psa", "prostate",
    "crp", "c-reactive",
    "albumin",
    "bilirubin",
    "alt", "ast", "alp",
    "ggt",
    "protein",
    "magnesium", "mg",
    "phosphorus", "phosphate",
];

/// Excluded terms short enough to need whole-word matching.
const WORD_BOUNDARY_TERMS: &[&str] = &["alt", "ast", "alp", "mg", "na", "k"];

static WORD_BOUNDARY_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    WORD_BOUNDARY_TERMS
        .iter()
        .map(|term| (*term, Regex::new(&format!(r"\b{}\b", regex::escape(term))).unwrap()))
        .collect()
});

/// Keywords recognised for each supported panel.
pub fn supported_test_keywords() -> Vec<(&'static str, Vec<&'static str>)> {
    let mut metabolic = METABOLIC_KEYWORDS.to_vec();
    metabolic.push("ca");
    vec![
        ("CBC", CBC_KEYWORDS.to_vec()),
        ("METABOLIC", metabolic),
        ("LIPID", LIPID_KEYWORDS.to_vec()),
    ]
}

fn is_excluded(normalized_name: &str) -> bool {
    EXCLUDED_TERMS.iter().any(|term| {
        match WORD_BOUNDARY_PATTERNS.iter().find(|(t, _)| t == term) {
            Some((_, re)) => re.is_match(normalized_name),
            None => normalized_name.contains(term),
        }
    })
}

/// Whether a normalised name looks like a test from a supported panel.
pub fn is_supported_test(normalized_name: &str) -> bool {
    let name = normalized_name.trim().to_lowercase();
    if name.is_empty() {
        return false;
    }
    let has_keyword = CBC_KEYWORDS
        .iter()
        .chain(METABOLIC_KEYWORDS)
        .chain(LIPID_KEYWORDS)
        .any(|k| name.contains(k));
    has_keyword && !is_excluded(&name)
}

/// Parse one cleaned line.
pub fn parse_line(line: &str) -> Option<ParsedTest> {
    let line = line.trim();
    if line.chars().count() < 3 {
        return None;
    }
    // Section headers
    if is_all_caps(line) && !line.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    if !line.chars().any(|c| c.is_ascii_alphabetic()) || !line.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    for pattern in LINE_PATTERNS.iter() {
        let Some(caps) = pattern.captures(line) else {
            continue;
        };
        let Ok(value) = caps[2].parse::<f64>() else {
            continue;
        };
        let name = caps[1].trim();
        let unit = caps.get(3).map(|m| m.as_str().trim()).unwrap_or_default();

        if is_supported_test(&normalize_test_name(name)) {
            return Some(ParsedTest::new(name, value, unit));
        }
    }
    None
}

/// Extract test results from raw OCR text.
pub fn parse_lab_report(raw_text: &str) -> Vec<ParsedTest> {
    if raw_text.is_empty() {
        return Vec::new();
    }
    clean_ocr_text(raw_text)
        .lines()
        .filter_map(parse_line)
        .collect()
}
