//! Factions and their subfactions

use crate::record::{extra_fields, opt_bool, req_objects, req_str, FieldResult, Record};
use serde_json::Value;
use std::hash::{Hash, Hasher};

const FIELDS: &[&str] = &[
    "grand_alliance",
    "warband",
    "bladeborn",
    "heroes_all",
    "subfactions",
];
const SUBFACTION_FIELDS: &[&str] = &["runemark", "bladeborn", "heroes_all"];

/// A named subgroup inside a faction, keyed by runemark
#[derive(Debug, Clone)]
pub struct SubFaction {
    pub runemark: String,
    /// Legacy/alternate-identity grouping
    pub bladeborn: bool,
    pub heroes_all: bool,
    pub extra: Record,
}

impl PartialEq for SubFaction {
    fn eq(&self, other: &Self) -> bool {
        self.runemark == other.runemark
    }
}

impl Eq for SubFaction {}

impl Hash for SubFaction {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.runemark.hash(state);
    }
}

impl SubFaction {
    pub fn from_record(record: &Record) -> FieldResult<Self> {
        Ok(Self {
            runemark: req_str(record, "runemark")?,
            bladeborn: opt_bool(record, "bladeborn")?,
            heroes_all: opt_bool(record, "heroes_all")?,
            extra: extra_fields(record, SUBFACTION_FIELDS),
        })
    }

    pub fn to_record(&self) -> Record {
        let mut record = self.extra.clone();
        record.insert("runemark".into(), Value::from(self.runemark.clone()));
        record.insert("bladeborn".into(), Value::from(self.bladeborn));
        record.insert("heroes_all".into(), Value::from(self.heroes_all));
        record
    }
}

/// A faction, the owner of a warband's subfactions
#[derive(Debug, Clone, PartialEq)]
pub struct Faction {
    pub grand_alliance: String,
    /// Unique across all factions
    pub warband: String,
    pub bladeborn: bool,
    pub heroes_all: bool,
    /// Unique by runemark, in source order
    pub subfactions: Vec<SubFaction>,
    pub extra: Record,
}

impl Faction {
    /// Build a faction from its `_faction.json` record
    pub fn from_record(record: &Record) -> FieldResult<Self> {
        let subfaction_records = match record.get("subfactions") {
            None | Some(Value::Null) => Vec::new(),
            Some(_) => req_objects(record, "subfactions")?,
        };

        let mut subfactions: Vec<SubFaction> = Vec::with_capacity(subfaction_records.len());
        for sub in subfaction_records {
            let sub = SubFaction::from_record(sub)?;
            if subfactions.contains(&sub) {
                return Err(format!("duplicate subfaction runemark '{}'", sub.runemark));
            }
            subfactions.push(sub);
        }

        Ok(Self {
            grand_alliance: req_str(record, "grand_alliance")?,
            warband: req_str(record, "warband")?,
            bladeborn: opt_bool(record, "bladeborn")?,
            heroes_all: opt_bool(record, "heroes_all")?,
            subfactions,
            extra: extra_fields(record, FIELDS),
        })
    }

    pub fn to_record(&self) -> Record {
        let mut record = self.extra.clone();
        record.insert("grand_alliance".into(), Value::from(self.grand_alliance.clone()));
        record.insert("warband".into(), Value::from(self.warband.clone()));
        record.insert("bladeborn".into(), Value::from(self.bladeborn));
        record.insert("heroes_all".into(), Value::from(self.heroes_all));
        record.insert(
            "subfactions".into(),
            Value::Array(
                self.subfactions
                    .iter()
                    .map(|s| Value::Object(s.to_record()))
                    .collect(),
            ),
        );
        record
    }

    /// Find a subfaction by runemark
    pub fn find_subfaction(&self, runemark: &str) -> Option<&SubFaction> {
        self.subfactions.iter().find(|s| s.runemark == runemark)
    }

    /// Runemarks of the subfactions flagged as bladeborn
    pub fn bladeborn_runemarks(&self) -> Vec<&str> {
        self.subfactions
            .iter()
            .filter(|s| s.bladeborn)
            .map(|s| s.runemark.as_str())
            .collect()
    }
}
