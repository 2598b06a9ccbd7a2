//! Abilities and their activation costs

use crate::record::{extra_fields, req_str, req_str_set, str_set_value, FieldResult, Record};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

/// Warband key that makes an ability available to every fighter
pub const UNIVERSAL: &str = "universal";

const FIELDS: &[&str] = &["_id", "name", "warband", "cost", "description", "runemarks"];

/// Activation cost of an ability
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cost {
    Single,
    Double,
    Triple,
    Quad,
    Reaction,
    Battletrait,
}

impl Cost {
    /// Parse the lowercase cost name used in fragment files
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "single" => Some(Self::Single),
            "double" => Some(Self::Double),
            "triple" => Some(Self::Triple),
            "quad" => Some(Self::Quad),
            "reaction" => Some(Self::Reaction),
            "battletrait" => Some(Self::Battletrait),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Double => "double",
            Self::Triple => "triple",
            Self::Quad => "quad",
            Self::Reaction => "reaction",
            Self::Battletrait => "battletrait",
        }
    }

    /// Capitalised label ("Double") as shown on fighter cards
    pub fn label(&self) -> String {
        let s = self.as_str();
        let mut chars = s.chars();
        match chars.next() {
            Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
            None => String::new(),
        }
    }
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An ability, shared by every fighter it is assigned to
#[derive(Debug, Clone, PartialEq)]
pub struct Ability {
    pub id: String,
    pub name: String,
    /// Assignment key: "universal", a warband name, or a subfaction runemark
    pub warband: String,
    pub cost: Cost,
    pub description: String,
    /// Runemarks a fighter must carry to receive this ability
    pub runemarks: BTreeSet<String>,
    /// Fields carried through untouched
    pub extra: Record,
}

impl Ability {
    /// Build an ability from its fragment record
    pub fn from_record(record: &Record) -> FieldResult<Self> {
        let cost = req_str(record, "cost")?;
        let cost = Cost::parse(&cost).ok_or_else(|| format!("unknown cost '{}'", cost))?;

        Ok(Self {
            id: req_str(record, "_id")?,
            name: req_str(record, "name")?,
            warband: req_str(record, "warband")?,
            cost,
            description: req_str(record, "description")?,
            runemarks: req_str_set(record, "runemarks")?,
            extra: extra_fields(record, FIELDS),
        })
    }

    /// Convert back into a record with every original field
    pub fn to_record(&self) -> Record {
        let mut record = self.extra.clone();
        record.insert("_id".into(), Value::from(self.id.clone()));
        record.insert("name".into(), Value::from(self.name.clone()));
        record.insert("warband".into(), Value::from(self.warband.clone()));
        record.insert("cost".into(), Value::from(self.cost.as_str()));
        record.insert("description".into(), Value::from(self.description.clone()));
        record.insert("runemarks".into(), str_set_value(&self.runemarks));
        record
    }

    pub fn is_universal(&self) -> bool {
        self.warband == UNIVERSAL
    }

    /// True when every runemark this ability requires is in `fighter_runemarks`
    pub fn is_satisfied_by(&self, fighter_runemarks: &BTreeSet<String>) -> bool {
        self.runemarks.is_subset(fighter_runemarks)
    }
}
