//! Exclusion rules deciding which fighters and abilities an export target receives

use crate::ability::{Ability, Cost, UNIVERSAL};
use crate::fighter::Fighter;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Warband left out of the tabletop-simulator export
pub const TTS_EXCLUDED_WARBAND: &str = "Cities of Sigmar";

/// A rule answering "leave this entity out of the export?"
pub trait ExclusionRule<T> {
    fn should_exclude(&self, entity: &T) -> bool;
}

/// Excludes entities whose warband is in the configured set
#[derive(Debug, Clone, Default)]
pub struct WarbandRule {
    warbands: BTreeSet<String>,
}

impl WarbandRule {
    pub fn new<I, S>(warbands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            warbands: warbands.into_iter().map(Into::into).collect(),
        }
    }
}

impl ExclusionRule<Fighter> for WarbandRule {
    fn should_exclude(&self, fighter: &Fighter) -> bool {
        self.warbands.contains(&fighter.warband)
    }
}

impl ExclusionRule<Ability> for WarbandRule {
    fn should_exclude(&self, ability: &Ability) -> bool {
        self.warbands.contains(&ability.warband)
    }
}

/// Excludes abilities with one of the configured costs
#[derive(Debug, Clone, Default)]
pub struct CostRule {
    costs: BTreeSet<Cost>,
}

impl CostRule {
    pub fn new<I: IntoIterator<Item = Cost>>(costs: I) -> Self {
        Self {
            costs: costs.into_iter().collect(),
        }
    }
}

impl ExclusionRule<Ability> for CostRule {
    fn should_exclude(&self, ability: &Ability) -> bool {
        self.costs.contains(&ability.cost)
    }
}

/// Excludes fighters costing more than `max_points`
#[derive(Debug, Clone, Copy)]
pub struct PointsThresholdRule {
    pub max_points: i64,
}

impl ExclusionRule<Fighter> for PointsThresholdRule {
    fn should_exclude(&self, fighter: &Fighter) -> bool {
        fighter.points > self.max_points
    }
}

/// OR of a list of rules: excluded when any rule fires, kept when the list is empty
pub struct AnyRule<T> {
    rules: Vec<Box<dyn ExclusionRule<T>>>,
}

impl<T> Default for AnyRule<T> {
    fn default() -> Self {
        Self { rules: Vec::new() }
    }
}

impl<T> fmt::Debug for AnyRule<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyRule")
            .field("rules", &self.rules.len())
            .finish()
    }
}

impl<T> AnyRule<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule, builder style
    pub fn with<R: ExclusionRule<T> + 'static>(mut self, rule: R) -> Self {
        self.push(rule);
        self
    }

    pub fn push<R: ExclusionRule<T> + 'static>(&mut self, rule: R) {
        self.rules.push(Box::new(rule));
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Entities that survive the rules, in their original order
    pub fn filter<'a, I>(&self, items: I) -> Vec<&'a T>
    where
        I: IntoIterator<Item = &'a T>,
        T: 'a,
    {
        items
            .into_iter()
            .filter(|item| !self.should_exclude(item))
            .collect()
    }
}

impl<T> ExclusionRule<T> for AnyRule<T> {
    fn should_exclude(&self, entity: &T) -> bool {
        self.rules.iter().any(|rule| rule.should_exclude(entity))
    }
}

/// Declarative form of a primitive rule, as written in configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum RuleSpec {
    /// Drop fighters of these warbands
    FighterWarband { warbands: Vec<String> },
    /// Drop fighters above a points value
    FighterPointsAbove { max_points: i64 },
    /// Drop abilities keyed to these warbands
    AbilityWarband { warbands: Vec<String> },
    /// Drop abilities with these costs
    AbilityCost { costs: Vec<Cost> },
}

/// The fighter and ability rules owned by one export target
#[derive(Debug, Default)]
pub struct TargetRules {
    pub fighters: AnyRule<Fighter>,
    pub abilities: AnyRule<Ability>,
}

impl TargetRules {
    /// Build a target's rules from their declarative form
    pub fn from_specs(specs: &[RuleSpec]) -> Self {
        let mut rules = Self::default();
        for spec in specs {
            match spec {
                RuleSpec::FighterWarband { warbands } => {
                    rules.fighters.push(WarbandRule::new(warbands.iter().cloned()))
                }
                RuleSpec::FighterPointsAbove { max_points } => {
                    rules.fighters.push(PointsThresholdRule {
                        max_points: *max_points,
                    })
                }
                RuleSpec::AbilityWarband { warbands } => {
                    rules.abilities.push(WarbandRule::new(warbands.iter().cloned()))
                }
                RuleSpec::AbilityCost { costs } => {
                    rules.abilities.push(CostRule::new(costs.iter().copied()))
                }
            }
        }
        rules
    }

    /// Rules of the tabletop-simulator target
    pub fn tabletop_sim() -> Self {
        Self::from_specs(&tabletop_sim_specs())
    }
}

/// Declarative tabletop-simulator rules: no Cities of Sigmar fighters, no
/// universal abilities, no battletraits
pub fn tabletop_sim_specs() -> Vec<RuleSpec> {
    vec![
        RuleSpec::FighterWarband {
            warbands: vec![TTS_EXCLUDED_WARBAND.to_string()],
        },
        RuleSpec::AbilityWarband {
            warbands: vec![UNIVERSAL.to_string()],
        },
        RuleSpec::AbilityCost {
            costs: vec![Cost::Battletrait],
        },
    ]
}
