//! Fighter profiles

use crate::dataset::{AbilityRef, FactionRef, SubFactionRef, RESOLVED_SUBFACTION};
use crate::record::{
    extra_fields, opt_str, req_int, req_objects, req_str, req_str_set, str_set_value,
    FieldResult, Record,
};
use crate::weapon::Weapon;
use serde_json::Value;
use std::collections::BTreeSet;

/// Keys read by the constructor; the derived association keys are dropped
const FIELDS: &[&str] = &[
    "_id",
    "name",
    "warband",
    "bladeborn",
    "subfaction",
    "grand_alliance",
    "movement",
    "toughness",
    "wounds",
    "points",
    "runemarks",
    "weapons",
    "abilities",
    "faction",
    RESOLVED_SUBFACTION,
];

/// Target wound values of the kill-chance table, crossed with toughness 3 to 7
pub const TABLE_WOUNDS: [i64; 9] = [3, 4, 6, 8, 10, 12, 15, 20, 25];

/// A target profile in the kill-chance table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub toughness: i64,
    pub wounds: i64,
}

impl Target {
    /// Row label such as `T4W10`
    pub fn label(&self) -> String {
        format!("T{}W{}", self.toughness, self.wounds)
    }
}

/// Standard targets, toughness-major
pub fn table_targets() -> impl Iterator<Item = Target> {
    (3..=7).flat_map(|toughness| {
        TABLE_WOUNDS
            .iter()
            .map(move |&wounds| Target { toughness, wounds })
    })
}

/// A fighter profile and its resolved associations
#[derive(Debug, Clone, PartialEq)]
pub struct Fighter {
    pub id: String,
    pub name: String,
    pub warband: String,
    /// Legacy subfaction key, empty when the fighter has none
    pub bladeborn: String,
    /// Raw `subfaction` field as written in the fragment
    pub subfaction_field: Option<String>,
    pub grand_alliance: String,
    pub movement: i64,
    pub toughness: i64,
    pub wounds: i64,
    pub points: i64,
    pub runemarks: BTreeSet<String>,
    pub weapons: Vec<Weapon>,
    pub extra: Record,

    /// Assigned by the resolver; handles into the dataset's ability table
    pub abilities: Vec<AbilityRef>,
    pub faction: Option<FactionRef>,
    pub subfaction: Option<SubFactionRef>,
}

impl Fighter {
    /// Build a fighter from its fragment record
    pub fn from_record(record: &Record) -> FieldResult<Self> {
        let weapons = req_objects(record, "weapons")?
            .into_iter()
            .map(Weapon::from_record)
            .collect::<FieldResult<Vec<_>>>()?;

        Ok(Self {
            id: req_str(record, "_id")?,
            name: req_str(record, "name")?,
            warband: req_str(record, "warband")?,
            bladeborn: opt_str(record, "bladeborn")?.unwrap_or_default(),
            subfaction_field: opt_str(record, "subfaction")?,
            grand_alliance: req_str(record, "grand_alliance")?,
            movement: req_int(record, "movement")?,
            toughness: req_int(record, "toughness")?,
            wounds: req_int(record, "wounds")?,
            points: req_int(record, "points")?,
            runemarks: req_str_set(record, "runemarks")?,
            weapons,
            extra: extra_fields(record, FIELDS),
            abilities: Vec::new(),
            faction: None,
            subfaction: None,
        })
    }

    /// Convert the source fields back into a record (resolved associations excluded)
    pub fn to_record(&self) -> Record {
        let mut record = self.extra.clone();
        record.insert("_id".into(), Value::from(self.id.clone()));
        record.insert("name".into(), Value::from(self.name.clone()));
        record.insert("warband".into(), Value::from(self.warband.clone()));
        record.insert("bladeborn".into(), Value::from(self.bladeborn.clone()));
        if let Some(sub) = &self.subfaction_field {
            record.insert("subfaction".into(), Value::from(sub.clone()));
        }
        record.insert("grand_alliance".into(), Value::from(self.grand_alliance.clone()));
        record.insert("movement".into(), Value::from(self.movement));
        record.insert("toughness".into(), Value::from(self.toughness));
        record.insert("wounds".into(), Value::from(self.wounds));
        record.insert("points".into(), Value::from(self.points));
        record.insert("runemarks".into(), str_set_value(&self.runemarks));
        record.insert(
            "weapons".into(),
            Value::Array(
                self.weapons
                    .iter()
                    .map(|w| Value::Object(w.to_record()))
                    .collect(),
            ),
        );
        record
    }

    /// Raw subfaction channels: the `subfaction` field and the `bladeborn` field
    pub fn subfaction_hints(&self) -> impl Iterator<Item = &str> {
        self.subfaction_field
            .as_deref()
            .into_iter()
            .chain(std::iter::once(self.bladeborn.as_str()))
            .filter(|s| !s.is_empty())
    }

    /// Best kill chance among this fighter's weapons against the given target
    pub fn best_kill_chance(
        &self,
        vs_toughness: i64,
        vs_wounds: i64,
        attack_actions: u32,
    ) -> Option<(&Weapon, f64)> {
        self.weapons
            .iter()
            .map(|w| (w, w.kill_chance(vs_toughness, vs_wounds, attack_actions)))
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Best weapon's chance against every standard target, as a whole percent (rounded down)
    pub fn kill_chance_table(&self, attack_actions: u32) -> Vec<(Target, u32)> {
        table_targets()
            .map(|target| {
                let chance = self
                    .best_kill_chance(target.toughness, target.wounds, attack_actions)
                    .map_or(0.0, |(_, chance)| chance);
                (target, (chance * 100.0) as u32)
            })
            .collect()
    }

    pub(crate) fn clear_associations(&mut self) {
        self.abilities.clear();
        self.faction = None;
        self.subfaction = None;
    }
}
