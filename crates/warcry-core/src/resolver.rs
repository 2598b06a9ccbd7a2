//! Relationship resolver: factions and subfactions first, then abilities
//!
//! Ability matching consults each fighter's resolved subfaction, so faction
//! assignment always runs to completion before any ability is assigned.

use crate::ability::Ability;
use crate::dataset::{AbilityRef, Dataset, FactionRef, SubFactionRef};
use crate::error::{Error, Result};
use crate::fighter::Fighter;
use crate::faction::Faction;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Counts and leftovers from one resolution pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionSummary {
    pub factions_assigned: usize,
    pub subfactions_assigned: usize,
    /// Fighters whose warband matched no faction, as "id (name)"
    pub unmatched_fighters: Vec<String>,
    pub ability_assignments: usize,
    /// Abilities that reached no fighter
    pub unassigned_abilities: Vec<String>,
    /// Duplicate ability identifiers skipped on a fighter
    pub duplicate_assignments: usize,
}

/// How an ability reached a fighter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchReason {
    /// The ability is universal
    Universal,
    /// The ability's warband is the fighter's warband
    Warband,
    /// The ability's warband is the fighter's resolved subfaction runemark
    Subfaction,
}

impl std::fmt::Display for MatchReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchReason::Universal => write!(f, "universal"),
            MatchReason::Warband => write!(f, "warband"),
            MatchReason::Subfaction => write!(f, "subfaction"),
        }
    }
}

/// Resolve factions, subfactions and abilities in place
///
/// Fails without touching the graph if any fighter or ability has an empty
/// warband, if two factions share a warband, or if the graph was already
/// resolved.
pub fn resolve(data: &mut Dataset) -> Result<ResolutionSummary> {
    if data.resolved {
        return Err(Error::AlreadyResolved);
    }
    check(data)?;

    let mut summary = ResolutionSummary::default();
    assign_factions(data, &mut summary);
    assign_abilities(data, &mut summary);
    data.resolved = true;

    info!(
        factions = summary.factions_assigned,
        subfactions = summary.subfactions_assigned,
        unmatched = summary.unmatched_fighters.len(),
        assignments = summary.ability_assignments,
        "resolution complete"
    );

    Ok(summary)
}

/// Why `ability` is a candidate for `fighter`, ignoring runemarks
pub fn candidate_reason(data: &Dataset, fighter: &Fighter, ability: &Ability) -> Option<MatchReason> {
    if ability.is_universal() {
        Some(MatchReason::Universal)
    } else if ability.warband == fighter.warband {
        Some(MatchReason::Warband)
    } else if data.subfaction_key(fighter) == Some(ability.warband.as_str()) {
        Some(MatchReason::Subfaction)
    } else {
        None
    }
}

/// Whether resolution would assign `ability` to `fighter`
pub fn qualifies(data: &Dataset, fighter: &Fighter, ability: &Ability) -> Option<MatchReason> {
    candidate_reason(data, fighter, ability).filter(|_| ability.is_satisfied_by(&fighter.runemarks))
}

fn check(data: &Dataset) -> Result<()> {
    let mut problems = Vec::new();

    for (i, fighter) in data.fighters.iter().enumerate() {
        if fighter.warband.trim().is_empty() {
            problems.push(format!("fighter {} '{}' (#{}) has an empty warband", fighter.id, fighter.name, i));
        }
    }
    for (i, ability) in data.abilities.iter().enumerate() {
        if ability.warband.trim().is_empty() {
            problems.push(format!("ability {} '{}' (#{}) has an empty warband", ability.id, ability.name, i));
        }
    }

    let mut seen: HashMap<&str, usize> = HashMap::new();
    for (i, faction) in data.factions.iter().enumerate() {
        if faction.warband.trim().is_empty() {
            problems.push(format!("faction #{} has an empty warband", i));
        } else if let Some(first) = seen.insert(faction.warband.as_str(), i) {
            problems.push(format!(
                "factions #{} and #{} share warband '{}'",
                first, i, faction.warband
            ));
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(Error::Resolution(problems))
    }
}

fn assign_factions(data: &mut Dataset, summary: &mut ResolutionSummary) {
    let by_warband: HashMap<&str, usize> = data
        .factions
        .iter()
        .enumerate()
        .map(|(i, f)| (f.warband.as_str(), i))
        .collect();

    let resolved: Vec<(Option<FactionRef>, Option<SubFactionRef>)> = data
        .fighters
        .iter()
        .map(|fighter| match by_warband.get(fighter.warband.as_str()) {
            Some(&fi) => (
                Some(FactionRef(fi)),
                match_subfaction(fighter, &data.factions[fi]).map(|si| SubFactionRef {
                    faction: fi,
                    subfaction: si,
                }),
            ),
            None => (None, None),
        })
        .collect();

    for (fighter, (faction, subfaction)) in data.fighters.iter_mut().zip(resolved) {
        match faction {
            Some(_) => summary.factions_assigned += 1,
            None => {
                warn!(id = %fighter.id, name = %fighter.name, warband = %fighter.warband, "no faction for fighter");
                summary
                    .unmatched_fighters
                    .push(format!("{} ({})", fighter.id, fighter.name));
            }
        }
        if subfaction.is_some() {
            summary.subfactions_assigned += 1;
        }
        fighter.faction = faction;
        fighter.subfaction = subfaction;
    }
}

/// First subfaction, in source order, named by a runemark or a raw subfaction field
fn match_subfaction(fighter: &Fighter, faction: &Faction) -> Option<usize> {
    faction.subfactions.iter().position(|sub| {
        fighter.runemarks.contains(&sub.runemark)
            || fighter.subfaction_hints().any(|hint| hint == sub.runemark)
    })
}

fn assign_abilities(data: &mut Dataset, summary: &mut ResolutionSummary) {
    // Candidate fighters per warband / subfaction key, each fighter once per key
    let mut candidates: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, fighter) in data.fighters.iter().enumerate() {
        candidates.entry(fighter.warband.as_str()).or_default().push(i);
        if let Some(key) = data.subfaction_key(fighter) {
            if key != fighter.warband {
                candidates.entry(key).or_default().push(i);
            }
        }
    }

    let all: Vec<usize> = (0..data.fighters.len()).collect();
    let mut assigned: Vec<Vec<AbilityRef>> = vec![Vec::new(); data.fighters.len()];
    let mut seen_ids: Vec<HashSet<&str>> = vec![HashSet::new(); data.fighters.len()];

    for (ai, ability) in data.abilities.iter().enumerate() {
        let targets: &[usize] = if ability.is_universal() {
            &all
        } else {
            candidates
                .get(ability.warband.as_str())
                .map(Vec::as_slice)
                .unwrap_or(&[])
        };

        let mut reached = 0;
        for &fi in targets {
            if !ability.is_satisfied_by(&data.fighters[fi].runemarks) {
                continue;
            }
            if !seen_ids[fi].insert(ability.id.as_str()) {
                debug!(ability = %ability.id, fighter = %data.fighters[fi].id, "duplicate ability id skipped");
                summary.duplicate_assignments += 1;
                continue;
            }
            assigned[fi].push(AbilityRef(ai));
            reached += 1;
        }

        if reached == 0 {
            debug!(id = %ability.id, name = %ability.name, warband = %ability.warband, "ability reached no fighter");
            summary
                .unassigned_abilities
                .push(format!("{} ({})", ability.id, ability.name));
        }
        summary.ability_assignments += reached;
    }

    for (fighter, abilities) in data.fighters.iter_mut().zip(assigned) {
        fighter.abilities = abilities;
    }
}
