//! Pre-export data checks: identifier collisions, record shape, characteristic ranges, schema files

use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::ids::ID_FIELD;
use crate::loader::RawData;
use crate::record::{display_name, Record};
use crate::writer::write_json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::path::Path;
use tracing::{info, warn};

/// Schema documents expected in the schema directory
pub const SCHEMA_FILES: &[&str] = &[
    "ability_schema.json",
    "aggregate_ability_schema.json",
    "faction_schema.json",
    "fighter_schema.json",
    "aggregate_fighter_schema.json",
    "warband_schema.json",
];

/// Plausible ranges for fighter characteristics
const RANGES: &[(&str, RangeInclusive<i64>)] = &[
    ("points", 0..=2000),
    ("movement", 1..=50),
    ("toughness", 1..=20),
    ("wounds", 1..=300),
];

/// Outcome of a validation pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub checked_at: DateTime<Utc>,
    pub items_validated: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "Validation {}: {} items, {} errors, {} warnings",
            if self.is_valid() { "PASSED" } else { "FAILED" },
            self.items_validated,
            self.errors.len(),
            self.warnings.len()
        )
    }

    /// Turn a failed report into the error a run exits with
    pub fn into_result(self) -> Result<Self> {
        if self.is_valid() {
            Ok(self)
        } else {
            Err(Error::Validation(self.errors))
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_json(path, self)
    }
}

/// Every identifier shared by more than one record of a collection
///
/// Each collision is reported once, naming every record that carries it.
pub fn duplicate_ids(records: &[Record], collection: &str) -> Vec<String> {
    let mut seen: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for (index, record) in records.iter().enumerate() {
        if let Some(id) = record.get(ID_FIELD).and_then(Value::as_str) {
            seen.entry(id)
                .or_default()
                .push(format!("#{} '{}'", index, display_name(record)));
        }
    }

    seen.into_iter()
        .filter(|(_, holders)| holders.len() > 1)
        .map(|(id, holders)| {
            format!("{} _id '{}' used by {}", collection, id, holders.join(", "))
        })
        .collect()
}

/// Records the typed constructors reject, one line per record
fn record_errors(raw: &RawData) -> Vec<String> {
    match Dataset::from_raw(raw) {
        Err(Error::InvalidRecords(errors)) => errors.iter().map(ToString::to_string).collect(),
        _ => Vec::new(),
    }
}

fn range_warnings(fighters: &[Record]) -> Vec<String> {
    let mut warnings = Vec::new();
    for record in fighters {
        for (field, range) in RANGES {
            let Some(value) = record.get(*field).and_then(Value::as_i64) else {
                continue;
            };
            if !range.contains(&value) {
                warnings.push(format!(
                    "fighter '{}': {} {} outside {}-{}",
                    display_name(record),
                    field,
                    value,
                    range.start(),
                    range.end()
                ));
            }
        }
    }
    warnings
}

fn schema_warnings(schema_dir: &Path) -> Vec<String> {
    SCHEMA_FILES
        .iter()
        .map(|name| schema_dir.join(name))
        .filter(|path| !path.is_file())
        .map(|path| format!("schema document missing: {}", path.display()))
        .collect()
}

/// Check loaded records before they are resolved
///
/// Fighters and abilities are checked for identifier collisions independently.
/// Every record that would fail typed construction is an error too.
/// Out-of-range characteristics and missing schema documents are warnings.
pub fn validate(raw: &RawData, schema_dir: &Path) -> ValidationReport {
    let mut errors = duplicate_ids(&raw.fighters, "fighters");
    errors.extend(duplicate_ids(&raw.abilities, "abilities"));
    errors.extend(record_errors(raw));

    for error in &errors {
        warn!("{}", error);
    }

    let mut warnings = range_warnings(&raw.fighters);
    warnings.extend(schema_warnings(schema_dir));

    for warning in &warnings {
        warn!("{}", warning);
    }

    let report = ValidationReport {
        checked_at: Utc::now(),
        items_validated: raw.fighters.len() + raw.abilities.len() + raw.factions.len(),
        errors,
        warnings,
    };
    info!("{}", report.summary());
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fighter::tests::fighter_value;
    use crate::resolver::tests::ability_value;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    fn obj(value: Value) -> Record {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_duplicates_reported_per_collection() {
        let mut one = fighter_value("aaaa0001", "Kruleboyz", &[]);
        one["name"] = json!("One");
        let mut two = fighter_value("aaaa0001", "Kruleboyz", &[]);
        two["name"] = json!("Two");
        let raw = RawData {
            fighters: vec![
                obj(one),
                obj(two),
                obj(fighter_value("bbbb0002", "Kruleboyz", &[])),
                obj(fighter_value("bbbb0002", "Kruleboyz", &[])),
            ],
            // Same id as a fighter: different collection, not a collision
            abilities: vec![obj(ability_value("aaaa0001", "Kruleboyz", "single", &[]))],
            ..Default::default()
        };
        let dir = tempdir().unwrap();
        let report = validate(&raw, dir.path());

        assert!(!report.is_valid());
        assert_eq!(report.errors.len(), 2);
        assert_eq!(
            report.errors[0],
            "fighters _id 'aaaa0001' used by #0 'One', #1 'Two'"
        );
        assert!(report.errors[1].contains("#2 'Fighter bbbb0002', #3 'Fighter bbbb0002'"));

        match report.into_result() {
            Err(Error::Validation(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("expected a validation failure, got {:?}", other.map(|r| r.summary())),
        }
    }

    #[test]
    fn test_records_missing_required_fields_are_errors() {
        let mut no_runemarks = fighter_value("cccc0003", "Kruleboyz", &[]);
        no_runemarks.as_object_mut().unwrap().remove("runemarks");
        let mut no_cost = ability_value("dddd0004", "Kruleboyz", "double", &[]);
        no_cost.as_object_mut().unwrap().remove("cost");
        let raw = RawData {
            fighters: vec![obj(no_runemarks)],
            abilities: vec![obj(no_cost)],
            ..Default::default()
        };

        let dir = tempdir().unwrap();
        let report = validate(&raw, dir.path());

        assert!(!report.is_valid());
        assert!(report.summary().starts_with("Validation FAILED: 2 items, 2 errors"));
        assert_eq!(
            report.errors[0],
            "fighters[0] 'Fighter cccc0003': missing field 'runemarks'"
        );
        assert_eq!(
            report.errors[1],
            "abilities[0] 'Ability dddd0004': missing field 'cost'"
        );
    }

    #[test]
    fn test_range_and_schema_warnings() {
        let mut slow = fighter_value("f1", "Kruleboyz", &[]);
        slow["movement"] = json!(0);
        slow["points"] = json!(5000);
        let raw = RawData {
            fighters: vec![obj(slow), obj(fighter_value("f2", "Kruleboyz", &[]))],
            ..Default::default()
        };

        let dir = tempdir().unwrap();
        for name in &SCHEMA_FILES[1..] {
            fs::write(dir.path().join(name), "{}").unwrap();
        }
        let report = validate(&raw, dir.path());

        assert!(report.is_valid());
        assert_eq!(report.items_validated, 2);
        assert_eq!(report.warnings.len(), 3);
        assert!(report.warnings[0].contains("points 5000 outside 0-2000"));
        assert!(report.warnings[1].contains("movement 0 outside 1-50"));
        assert!(report.warnings[2].contains("ability_schema.json"));
        assert!(report.summary().starts_with("Validation PASSED"));
    }

    #[test]
    fn test_report_saved_as_json() {
        let dir = tempdir().unwrap();
        let report = validate(&RawData::default(), dir.path());
        let path = dir.path().join("report.json");
        report.save(&path).unwrap();

        let loaded: ValidationReport =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.warnings.len(), SCHEMA_FILES.len());
        assert_eq!(loaded.checked_at, report.checked_at);
    }
}
