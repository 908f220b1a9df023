//! Static reference-range table for the supported panels.

use crate::models::{Panel, TestType};

/// Seed row for a panel.
#[derive(Debug, Clone, Copy)]
pub struct PanelSeed {
    pub key: &'static str,
    pub display_name: &'static str,
}

/// Seed row for a test type with its default adult range.
#[derive(Debug, Clone, Copy)]
pub struct TestSeed {
    pub panel_key: &'static str,
    pub key: &'static str,
    pub display_name: &'static str,
    pub unit: &'static str,
    pub ref_low: f64,
    pub ref_high: f64,
}

pub const PANEL_SEEDS: &[PanelSeed] = &[
    PanelSeed { key: "CBC", display_name: "Complete Blood Count" },
    PanelSeed { key: "METABOLIC", display_name: "Metabolic Panel" },
    PanelSeed { key: "LIPID", display_name: "Lipid Panel" },
];

pub const TEST_SEEDS: &[TestSeed] = &[
    // CBC
    TestSeed { panel_key: "CBC", key: "WBC", display_name: "White Blood Cells", unit: "10^3/µL", ref_low: 4.5, ref_high: 11.0 },
    TestSeed { panel_key: "CBC", key: "RBC", display_name: "Red Blood Cells", unit: "10^6/µL", ref_low: 4.5, ref_high: 5.9 },
    TestSeed { panel_key: "CBC", key: "HGB", display_name: "Hemoglobin", unit: "g/dL", ref_low: 13.5, ref_high: 17.5 },
    TestSeed { panel_key: "CBC", key: "HCT", display_name: "Hematocrit", unit: "%", ref_low: 38.8, ref_high: 50.0 },
    TestSeed { panel_key: "CBC", key: "PLT", display_name: "Platelets", unit: "10^3/µL", ref_low: 150.0, ref_high: 400.0 },
    TestSeed { panel_key: "CBC", key: "MCV", display_name: "Mean Corpuscular Volume", unit: "fL", ref_low: 80.0, ref_high: 100.0 },
    // Metabolic
    TestSeed { panel_key: "METABOLIC", key: "GLUCOSE", display_name: "Glucose", unit: "mg/dL", ref_low: 70.0, ref_high: 100.0 },
    TestSeed { panel_key: "METABOLIC", key: "BUN", display_name: "Blood Urea Nitrogen", unit: "mg/dL", ref_low: 7.0, ref_high: 20.0 },
    TestSeed { panel_key: "METABOLIC", key: "CREATININE", display_name: "Creatinine", unit: "mg/dL", ref_low: 0.7, ref_high: 1.3 },
    TestSeed { panel_key: "METABOLIC", key: "SODIUM", display_name: "Sodium", unit: "mmol/L", ref_low: 136.0, ref_high: 145.0 },
    TestSeed { panel_key: "METABOLIC", key: "POTASSIUM", display_name: "Potassium", unit: "mmol/L", ref_low: 3.5, ref_high: 5.0 },
    TestSeed { panel_key: "METABOLIC", key: "CHLORIDE", display_name: "Chloride", unit: "mmol/L", ref_low: 98.0, ref_high: 107.0 },
    TestSeed { panel_key: "METABOLIC", key: "CO2", display_name: "Carbon Dioxide", unit: "mmol/L", ref_low: 23.0, ref_high: 29.0 },
    TestSeed { panel_key: "METABOLIC", key: "CALCIUM", display_name: "Calcium", unit: "mg/dL", ref_low: 8.5, ref_high: 10.5 },
    // Lipid
    TestSeed { panel_key: "LIPID", key: "TC", display_name: "Total Cholesterol", unit: "mg/dL", ref_low: 0.0, ref_high: 200.0 },
    TestSeed { panel_key: "LIPID", key: "LDL", display_name: "LDL Cholesterol", unit: "mg/dL", ref_low: 0.0, ref_high: 100.0 },
    TestSeed { panel_key: "LIPID", key: "HDL", display_name: "HDL Cholesterol", unit: "mg/dL", ref_low: 40.0, ref_high: 999.0 },
    TestSeed { panel_key: "LIPID", key: "TRIG", display_name: "Triglycerides", unit: "mg/dL", ref_low: 0.0, ref_high: 150.0 },
];

/// Seeded panels in listing order.
pub fn reference_panels() -> Vec<Panel> {
    PANEL_SEEDS
        .iter()
        .enumerate()
        .map(|(i, seed)| Panel {
            key: seed.key.to_string(),
            display_name: seed.display_name.to_string(),
            position: i as u32,
        })
        .collect()
}

/// Seeded test types, positioned within their panel.
pub fn reference_tests() -> Vec<TestType> {
    let mut tests = Vec::with_capacity(TEST_SEEDS.len());
    for panel in PANEL_SEEDS {
        let in_panel = TEST_SEEDS.iter().filter(|t| t.panel_key == panel.key);
        for (i, seed) in in_panel.enumerate() {
            let mut test = TestType::new(
                seed.key.to_string(),
                seed.panel_key.to_string(),
                seed.display_name.to_string(),
                seed.unit.to_string(),
            )
            .with_range(seed.ref_low, seed.ref_high);
            test.position = i as u32;
            tests.push(test);
        }
    }
    tests
}

/// Look up a seeded test by key (case-insensitive).
pub fn reference_test(key: &str) -> Option<TestType> {
    let key = key.trim().to_uppercase();
    reference_tests().into_iter().find(|t| t.key == key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_three_panels_in_order() {
        let keys: Vec<_> = reference_panels().into_iter().map(|p| p.key).collect();
        assert_eq!(keys, vec!["CBC", "METABOLIC", "LIPID"]);
    }

    #[test]
    fn test_every_test_belongs_to_a_seeded_panel() {
        let panels: HashSet<_> = PANEL_SEEDS.iter().map(|p| p.key).collect();
        for seed in TEST_SEEDS {
            assert!(panels.contains(seed.panel_key), "{} has unknown panel", seed.key);
            assert!(seed.ref_low < seed.ref_high, "{} has inverted range", seed.key);
        }
    }

    #[test]
    fn test_keys_are_unique() {
        let keys: HashSet<_> = TEST_SEEDS.iter().map(|t| t.key).collect();
        assert_eq!(keys.len(), 18);
    }

    #[test]
    fn test_positions_restart_per_panel() {
        let tests = reference_tests();
        let lipid: Vec<_> = tests.iter().filter(|t| t.panel_key == "LIPID").collect();
        assert_eq!(lipid[0].key, "TC");
        assert_eq!(lipid[0].position, 0);
        assert_eq!(lipid[3].key, "TRIG");
        assert_eq!(lipid[3].position, 3);
    }

    #[test]
    fn test_reference_lookup() {
        let hdl = reference_test("hdl").unwrap();
        assert_eq!(hdl.ref_low, Some(40.0));
        assert_eq!(hdl.ref_high, Some(999.0));
        assert!(reference_test("TSH").is_none());
    }
}
