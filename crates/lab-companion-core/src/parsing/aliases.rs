//! Raw test-name aliases and fuzzy alias matching.

use strsim::jaro_winkler;

/// Seeded aliases per test key. Stored lower-case.
pub const DEFAULT_ALIASES: &[(&str, &[&str])] = &[
    ("WBC", &["wbc", "white blood cell", "white blood cells", "leukocytes", "leukocyte count"]),
    ("RBC", &["rbc", "red blood cell", "red blood cells", "erythrocytes", "erythrocyte count"]),
    ("HGB", &["hgb", "hemoglobin", "hb", "haemoglobin"]),
    ("HCT", &["hct", "hematocrit", "haematocrit", "hct%"]),
    ("PLT", &["plt", "platelet", "platelets", "platelet count", "thrombocytes"]),
    ("MCV", &["mcv", "mean corpuscular volume", "mean cell volume"]),
    ("GLUCOSE", &["glucose", "glu", "blood glucose", "blood sugar", "fasting glucose"]),
    ("BUN", &["bun", "blood urea nitrogen", "urea nitrogen", "urea"]),
    ("CREATININE", &["creatinine", "creat", "cr", "serum creatinine"]),
    ("SODIUM", &["sodium", "na", "na+", "serum sodium"]),
    ("POTASSIUM", &["potassium", "k", "k+", "serum potassium"]),
    ("CHLORIDE", &["chloride", "cl", "cl-", "serum chloride"]),
    ("CO2", &["co2", "carbon dioxide", "bicarbonate", "hco3", "total co2"]),
    ("CALCIUM", &["calcium", "ca", "ca++", "serum calcium", "total calcium"]),
    ("TC", &["tc", "total cholesterol", "cholesterol", "chol", "total chol"]),
    ("LDL", &["ldl", "ldl cholesterol", "ldl-c", "low density lipoprotein", "bad cholesterol"]),
    ("HDL", &["hdl", "hdl cholesterol", "hdl-c", "high density lipoprotein", "good cholesterol"]),
    ("TRIG", &["trig", "triglycerides", "triglyceride", "trigs", "tg"]),
];

/// Names shorter than this are never fuzzily matched.
pub const MIN_FUZZY_LEN: usize = 6;

/// Canonical lookup form of a raw test name.
pub fn alias_key(raw_name: &str) -> String {
    raw_name.trim().to_lowercase()
}

/// Flattened (alias, test key) pairs.
pub fn default_alias_pairs() -> impl Iterator<Item = (&'static str, &'static str)> {
    DEFAULT_ALIASES
        .iter()
        .flat_map(|(key, aliases)| aliases.iter().map(move |alias| (*alias, *key)))
}

/// Best fuzzy alias for `name` among `(alias, test_key)` candidates.
///
/// Requires a Jaro-Winkler score of at least `threshold` and the same first
/// character, which keeps "hdl" and "ldl" style pairs apart. Ratios never
/// match: "total cholesterol/hdl ratio" is not total cholesterol.
pub fn best_fuzzy_alias<'a, I>(name: &str, candidates: I, threshold: f64) -> Option<(String, f64)>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let name = alias_key(name);
    if name.chars().count() < MIN_FUZZY_LEN || is_ratio_name(&name) {
        return None;
    }
    let first = name.chars().next()?;

    candidates
        .into_iter()
        .filter(|(alias, _)| alias.chars().count() >= MIN_FUZZY_LEN && alias.starts_with(first))
        .map(|(alias, key)| (key, jaro_winkler(&name, alias)))
        .filter(|(_, score)| *score >= threshold)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(key, score)| (key.to_string(), score))
}

fn is_ratio_name(name: &str) -> bool {
    name.contains('/') || name.contains("ratio")
}
