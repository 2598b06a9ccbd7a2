//! The typed entity graph built from loaded records

use crate::ability::Ability;
use crate::error::{Error, RecordError, Result};
use crate::faction::{Faction, SubFaction};
use crate::fighter::Fighter;
use crate::loader::RawData;
use crate::record::{FieldResult, Record};
use serde_json::Value;

/// Key of the resolved subfaction runemark in plain-structure fighter views
pub const RESOLVED_SUBFACTION: &str = "resolved_subfaction";

/// Handle to an ability in `Dataset::abilities`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AbilityRef(pub usize);

/// Handle to a faction in `Dataset::factions`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FactionRef(pub usize);

/// Handle to a subfaction inside a faction
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubFactionRef {
    pub faction: usize,
    pub subfaction: usize,
}

/// All fighters, abilities and factions of one run
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub fighters: Vec<Fighter>,
    pub abilities: Vec<Ability>,
    pub factions: Vec<Faction>,
    /// Set by the resolver, cleared by `reset_associations`
    pub(crate) resolved: bool,
}

impl Dataset {
    /// Construct typed entities from raw records, reporting every invalid record
    pub fn from_raw(raw: &RawData) -> Result<Self> {
        let mut errors = Vec::new();

        let fighters = build_all("fighters", &raw.fighters, Fighter::from_record, &mut errors);
        let abilities = build_all("abilities", &raw.abilities, Ability::from_record, &mut errors);
        let factions = build_all("factions", &raw.factions, Faction::from_record, &mut errors);

        if !errors.is_empty() {
            return Err(Error::InvalidRecords(errors));
        }

        Ok(Self {
            fighters,
            abilities,
            factions,
            resolved: false,
        })
    }

    pub fn ability(&self, handle: AbilityRef) -> &Ability {
        &self.abilities[handle.0]
    }

    pub fn faction(&self, handle: FactionRef) -> &Faction {
        &self.factions[handle.0]
    }

    pub fn subfaction(&self, handle: SubFactionRef) -> &SubFaction {
        &self.factions[handle.faction].subfactions[handle.subfaction]
    }

    /// Abilities assigned to a fighter, in assignment order
    pub fn abilities_of<'a>(&'a self, fighter: &'a Fighter) -> impl Iterator<Item = &'a Ability> {
        fighter.abilities.iter().map(|&h| self.ability(h))
    }

    pub fn faction_of(&self, fighter: &Fighter) -> Option<&Faction> {
        fighter.faction.map(|h| self.faction(h))
    }

    pub fn subfaction_of(&self, fighter: &Fighter) -> Option<&SubFaction> {
        fighter.subfaction.map(|h| self.subfaction(h))
    }

    /// Runemark of the fighter's resolved subfaction
    pub fn subfaction_key(&self, fighter: &Fighter) -> Option<&str> {
        self.subfaction_of(fighter).map(|s| s.runemark.as_str())
    }

    /// Find a fighter by identifier, falling back to an exact name match
    pub fn find_fighter(&self, id_or_name: &str) -> Option<&Fighter> {
        self.fighters
            .iter()
            .find(|f| f.id == id_or_name)
            .or_else(|| self.fighters.iter().find(|f| f.name == id_or_name))
    }

    /// Find a faction by warband name
    pub fn find_faction(&self, warband: &str) -> Option<&Faction> {
        self.factions.iter().find(|f| f.warband == warband)
    }

    /// True once the resolver has run on this graph
    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// Drop every derived association so the graph can be resolved again
    pub fn reset_associations(&mut self) {
        for fighter in &mut self.fighters {
            fighter.clear_associations();
        }
        self.resolved = false;
    }

    /// Plain-structure view of a fighter: source fields plus resolved associations
    ///
    /// `abilities` holds the assigned ability identifiers, `faction` the faction's
    /// warband and `resolved_subfaction` the resolved subfaction runemark. The raw
    /// `subfaction` field keeps its source value.
    pub fn fighter_record(&self, fighter: &Fighter) -> Record {
        let mut record = fighter.to_record();
        record.insert(
            "abilities".into(),
            Value::Array(
                self.abilities_of(fighter)
                    .map(|a| Value::from(a.id.clone()))
                    .collect(),
            ),
        );
        if let Some(faction) = self.faction_of(fighter) {
            record.insert("faction".into(), Value::from(faction.warband.clone()));
        }
        if let Some(sub) = self.subfaction_of(fighter) {
            record.insert(RESOLVED_SUBFACTION.into(), Value::from(sub.runemark.clone()));
        }
        record
    }
}

fn build_all<T>(
    collection: &'static str,
    records: &[Record],
    build: fn(&Record) -> FieldResult<T>,
    errors: &mut Vec<RecordError>,
) -> Vec<T> {
    let mut built = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        match build(record) {
            Ok(entity) => built.push(entity),
            Err(message) => errors.push(RecordError {
                collection,
                index,
                name: record.get("name").and_then(Value::as_str).map(str::to_string),
                message,
            }),
        }
    }
    built
}
