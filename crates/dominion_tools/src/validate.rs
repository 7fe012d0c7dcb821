//! Race data validation.
//!
//! Goes further than loading a registry: every file is checked on its own,
//! problems are collected instead of skipped, and race keys referenced by
//! perks must resolve to a race in the same directory.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use dominion_core::data::RaceData;
use dominion_core::error::ConfigError;
use dominion_core::perks::{PowerPerk, UnitPerk};
use serde::Serialize;

/// One problem found in a data file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Problem {
    /// File the problem was found in.
    pub path: PathBuf,
    /// What is wrong.
    pub message: String,
}

/// Outcome of validating a data directory.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    /// Keys of races that passed every check.
    pub races: Vec<String>,
    /// Everything that failed.
    pub problems: Vec<Problem>,
}

impl ValidationReport {
    /// Whether no problem was found.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.problems.is_empty()
    }

    fn problem(&mut self, path: &Path, message: impl Into<String>) {
        self.problems.push(Problem {
            path: path.to_path_buf(),
            message: message.into(),
        });
    }
}

/// Validate every RON race file in a directory.
///
/// # Errors
///
/// Returns an error only if the directory itself cannot be read. Problems
/// in individual files end up in the report.
pub fn validate_data_directory(path: &Path) -> Result<ValidationReport, ConfigError> {
    if !path.is_dir() {
        return Err(ConfigError::DirectoryNotFound(path.display().to_string()));
    }

    let io_error = |e: std::io::Error| ConfigError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    };
    let mut files = Vec::new();
    for entry in fs::read_dir(path).map_err(io_error)? {
        let file = entry.map_err(io_error)?.path();
        if file.extension().is_some_and(|e| e == "ron") {
            files.push(file);
        }
    }
    files.sort();

    let mut report = ValidationReport::default();
    let mut loaded: BTreeMap<String, (PathBuf, RaceData)> = BTreeMap::new();
    for file in files {
        let data = match parse_race(&file) {
            Ok(data) => data,
            Err(message) => {
                report.problem(&file, message);
                continue;
            }
        };
        if let Err(e) = data.validate() {
            report.problem(&file, e.to_string());
            continue;
        }
        if let Some((first, _)) = loaded.get(&data.key) {
            report.problem(
                &file,
                format!("race key '{}' already defined in {}", data.key, first.display()),
            );
            continue;
        }
        tracing::debug!(race = %data.key, path = %file.display(), "Race data parsed");
        loaded.insert(data.key.clone(), (file, data));
    }

    for (key, (file, data)) in &loaded {
        let unknown: Vec<&str> = referenced_races(data)
            .into_iter()
            .filter(|race| !loaded.contains_key(*race))
            .collect();
        if unknown.is_empty() {
            report.races.push(key.clone());
        } else {
            report.problem(file, format!("unknown race referenced: {}", unknown.join(", ")));
        }
    }

    tracing::info!(
        races = report.races.len(),
        problems = report.problems.len(),
        "Validated race data"
    );
    Ok(report)
}

fn parse_race(file: &Path) -> Result<RaceData, String> {
    let content = fs::read_to_string(file).map_err(|e| format!("cannot read file: {e}"))?;
    ron::from_str(&content).map_err(|e| format!("cannot parse race: {e}"))
}

/// Race keys named by versus-race perks.
fn referenced_races(data: &RaceData) -> Vec<&str> {
    let mut races = Vec::new();
    for perk in data.units.iter().flat_map(|u| &u.perks) {
        match perk {
            UnitPerk::Offense(PowerPerk::VersusRace { race, .. })
            | UnitPerk::Defense(PowerPerk::VersusRace { race, .. }) => races.push(race.as_str()),
            UnitPerk::ImmortalExceptVersus { races: keys } => {
                races.extend(keys.iter().map(String::as_str));
            }
            _ => {}
        }
    }
    races
}
