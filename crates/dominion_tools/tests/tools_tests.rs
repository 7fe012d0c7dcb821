//! Tests for the shipped data and the scenario runner.

use std::fs;
use std::path::{Path, PathBuf};

use dominion_core::error::InvasionError;
use dominion_core::races::RaceRegistry;
use dominion_test_utils::fixtures::races;
use dominion_tools::scenario::{InvasionOutcome, Scenario, ScenarioError};
use dominion_tools::validate::validate_data_directory;

fn data_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("data")
}

/// Scratch directory under the system temp dir, emptied first.
fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("dominion_tools_{name}_{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

const MINIMAL_RACE: &str = r#"RaceData(
    key: "KEY",
    name: "Test",
    home_terrain: Plain,
    units: [
        UnitType(slot: 1, name: "A", offense: 3.0, defense: 0.0),
        UnitType(slot: 2, name: "B", offense: 0.0, defense: 3.0),
        UnitType(slot: 3, name: "C", offense: 5.0, defense: 1.0),
        UnitType(slot: 4, name: "D", offense: 1.0, defense: 5.0, perks: [PERK]),
    ],
)"#;

fn race_file(key: &str, perk: &str) -> String {
    MINIMAL_RACE.replace("KEY", key).replace("PERK", perk)
}

// ============================================================================
// Race data validation
// ============================================================================

mod validation {
    use super::*;

    #[test]
    fn test_shipped_races_validate() {
        let report = validate_data_directory(&data_dir().join("races")).unwrap();
        assert!(report.is_ok(), "problems: {:?}", report.problems);
        assert_eq!(report.races, vec!["dwarf", "human", "orc", "undead"]);
    }

    #[test]
    fn test_shipped_races_load_into_registry() {
        let mut registry = RaceRegistry::new();
        let loaded = registry
            .load_from_directory(&data_dir().join("races"))
            .unwrap();
        assert_eq!(loaded.len(), 4);
        assert!(registry.get("undead").unwrap().converts());
    }

    #[test]
    fn test_missing_directory() {
        let result = validate_data_directory(Path::new("/nonexistent/races"));
        assert!(result.is_err());
    }

    #[test]
    fn test_collects_every_problem() {
        let dir = scratch("problems");
        fs::write(dir.join("a.ron"), race_file("alpha", "Immortal")).unwrap();
        fs::write(dir.join("b.ron"), "RaceData(key: ").unwrap();
        fs::write(
            dir.join("c.ron"),
            race_file("gamma", "Defense(VersusRace(race: \"nobody\", value: 1.0))"),
        )
        .unwrap();
        fs::write(dir.join("d.ron"), race_file("alpha", "Immortal")).unwrap();
        fs::write(dir.join("e.ron"), race_file("delta", "Carries(capacity: 0)")).unwrap();
        fs::write(dir.join("notes.txt"), "not a race").unwrap();

        let report = validate_data_directory(&dir).unwrap();
        assert!(!report.is_ok());
        assert_eq!(report.races, vec!["alpha"]);

        let failed: Vec<_> = report
            .problems
            .iter()
            .map(|p| p.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(failed.len(), 4);
        for name in ["b.ron", "c.ron", "d.ron", "e.ron"] {
            assert!(failed.iter().any(|f| f == name), "{name} not reported");
        }
        assert!(report
            .problems
            .iter()
            .any(|p| p.message.contains("nobody")));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_cross_references_resolve_within_directory() {
        let dir = scratch("refs");
        fs::write(
            dir.join("a.ron"),
            race_file("alpha", "ImmortalExceptVersus(races: [\"beta\"])"),
        )
        .unwrap();
        fs::write(dir.join("b.ron"), race_file("beta", "Immortal")).unwrap();

        let report = validate_data_directory(&dir).unwrap();
        assert!(report.is_ok(), "problems: {:?}", report.problems);
        assert_eq!(report.races, vec!["alpha", "beta"]);

        fs::remove_dir_all(&dir).unwrap();
    }
}

// ============================================================================
// Scenarios
// ============================================================================

mod scenarios {
    use super::*;

    fn sample_path() -> PathBuf {
        data_dir().join("scenarios").join("sample.ron")
    }

    fn run_sample() -> dominion_tools::scenario::ScenarioReport {
        let path = sample_path();
        let scenario = Scenario::load(&path).unwrap();
        let mut registry = RaceRegistry::new();
        registry.load_from_directory(&scenario.races_dir(&path)).unwrap();
        scenario.run(registry).unwrap()
    }

    #[test]
    fn test_sample_loads() {
        let scenario = Scenario::load(sample_path()).unwrap();
        assert_eq!(scenario.name, "Sample round");
        assert_eq!(scenario.dominions.len(), 4);
        assert_eq!(scenario.invasions.len(), 3);
        assert_eq!(scenario.invasions[2].ticks_before, 3);
        assert_eq!(scenario.config.units_per_boat, 30);
    }

    #[test]
    fn test_sample_runs() {
        let report = run_sample();
        assert_eq!(report.invasions.len(), 3);
        assert!(matches!(
            report.invasions[0].outcome,
            InvasionOutcome::Resolved { .. }
        ));
        assert_eq!(report.invasions[0].tick, 100);
        assert_eq!(report.invasions[2].tick, 103);

        match &report.invasions[1].outcome {
            InvasionOutcome::Rejected { code, .. } => {
                let expected = InvasionError::InsufficientBoats {
                    needed: 10,
                    available: 0,
                };
                assert_eq!(code, expected.code());
            }
            other => panic!("expected a rejection, got {other:?}"),
        }
        assert_eq!(report.dominions.len(), 4);
    }

    #[test]
    fn test_sample_units_come_home() {
        let report = run_sample();
        let aria = &report.dominions[0];
        assert_eq!(aria.name, "Aria");
        assert_eq!(aria.military.returning.total(), 0);
    }

    #[test]
    fn test_sample_is_repeatable() {
        assert_eq!(run_sample(), run_sample());
    }

    #[test]
    fn test_report_renders() {
        let report = run_sample();
        let text = report.render_text();
        assert!(text.starts_with("== Sample round =="));
        assert!(text.contains("Rejected [INSUFFICIENT_BOATS]"));
        assert!(text.contains("Final state:"));

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["invasions"][1]["outcome"]["status"], "rejected");
        assert_eq!(json["dominions"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_unknown_race_fails_before_running() {
        let ron = r#"Scenario(
            name: "Bad",
            races: "races",
            dominions: [(id: 1, name: "X", race: "elf", realm: 1, land: {Plain: 100})],
            invasions: [],
        )"#;
        let scenario = Scenario::from_ron_str(ron).unwrap();
        assert!(matches!(
            scenario.run(races()),
            Err(ScenarioError::Config(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Scenario::load("/nonexistent/scenario.ron"),
            Err(ScenarioError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            Scenario::from_ron_str("Scenario(name: "),
            Err(ScenarioError::ParseError(_))
        ));
    }
}
