//! warcry-core: Core library for merging, resolving and exporting Warcry warband data
//!
//! This library provides functionality to:
//! - Load per-warband JSON fragments (fighters, abilities, factions)
//! - Assign stable identifiers to fighters and abilities
//! - Resolve each fighter's faction, subfaction and abilities
//! - Filter export targets with composable exclusion rules
//! - Export aggregate, per-warband, tabletop-simulator, tabular and localised projections

pub mod ability;
pub mod config;
pub mod dataset;
pub mod error;
pub mod export;
pub mod faction;
pub mod fighter;
pub mod ids;
pub mod loader;
pub mod pipeline;
pub mod record;
pub mod resolver;
pub mod rules;
pub mod validation;
pub mod weapon;
pub mod writer;

pub use ability::{Ability, Cost, UNIVERSAL};
pub use config::Config;
pub use dataset::{AbilityRef, Dataset, FactionRef, SubFactionRef};
pub use error::{Error, RecordError, Result};
pub use export::{export, ExportFormat, ExportOptions, ExportSummary};
pub use faction::{Faction, SubFaction};
pub use fighter::{table_targets, Fighter, Target, TABLE_WOUNDS};
pub use ids::{assign_all, is_placeholder, IdAssignment};
pub use loader::{load_directory, Fragment, FragmentKind, RawData};
pub use pipeline::{ExplainedAbility, Explanation, LoadedFragments, WarbandPipeline};
pub use record::Record;
pub use resolver::{qualifies, resolve, MatchReason, ResolutionSummary};
pub use rules::{
    AnyRule, CostRule, ExclusionRule, PointsThresholdRule, RuleSpec, TargetRules, WarbandRule,
};
pub use validation::{validate, ValidationReport};
pub use weapon::{AverageDamage, Weapon};
