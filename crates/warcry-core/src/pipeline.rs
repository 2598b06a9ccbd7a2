//! The batch pipeline: load, assign identifiers, validate, resolve, export

use crate::config::Config;
use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::export::{export, ExportFormat, ExportOptions, ExportSummary};
use crate::ids::{assign_all, IdAssignment};
use crate::loader::{load_directory, FragmentKind, RawData};
use crate::resolver::{candidate_reason, resolve, MatchReason, ResolutionSummary};
use crate::validation::{validate, ValidationReport};
use std::path::{Path, PathBuf};

/// Fragments loaded from disk with identifiers assigned, not yet resolved
#[derive(Debug, Clone)]
pub struct LoadedFragments {
    pub config: Config,
    pub raw: RawData,
    pub assignments: Vec<IdAssignment>,
}

impl LoadedFragments {
    /// Load the fragment tree and give every fighter and ability an identifier
    pub fn load(config: &Config) -> Result<Self> {
        let mut raw = load_directory(&config.data_root, &config.file_glob)?;
        let assignments = assign_all(&mut raw);
        Ok(Self {
            config: config.clone(),
            raw,
            assignments,
        })
    }

    /// Run the pre-resolution checks
    pub fn validate(&self) -> ValidationReport {
        validate(&self.raw, &self.config.schema_dir)
    }

    /// Rewrite the fragment files that received new identifiers
    pub fn write_assigned(&self) -> Result<Vec<PathBuf>> {
        let assignments = &self.assignments;
        let raw = &self.raw;
        raw.write_fragments(|fragment| {
            assignments.iter().any(|a| {
                let kind = match a.collection {
                    "fighters" => FragmentKind::Fighters,
                    _ => FragmentKind::Abilities,
                };
                fragment.kind == kind && fragment.records.contains(&a.index)
            })
        })
    }

    /// Validate, build the typed graph and resolve it
    ///
    /// Duplicate identifiers and invalid records stop the run here, before any
    /// association exists.
    pub fn resolve(self) -> Result<WarbandPipeline> {
        let report = self.validate().into_result()?;
        let mut dataset = Dataset::from_raw(&self.raw)?;
        let summary = resolve(&mut dataset)?;

        Ok(WarbandPipeline {
            loaded: self,
            report,
            dataset,
            summary,
        })
    }
}

/// A resolved dataset ready for export
#[derive(Debug, Clone)]
pub struct WarbandPipeline {
    loaded: LoadedFragments,
    report: ValidationReport,
    dataset: Dataset,
    summary: ResolutionSummary,
}

impl WarbandPipeline {
    /// Load and resolve in one step
    pub fn new(config: &Config) -> Result<Self> {
        LoadedFragments::load(config)?.resolve()
    }

    pub fn config(&self) -> &Config {
        &self.loaded.config
    }

    pub fn raw(&self) -> &RawData {
        &self.loaded.raw
    }

    pub fn assignments(&self) -> &[IdAssignment] {
        &self.loaded.assignments
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn summary(&self) -> &ResolutionSummary {
        &self.summary
    }

    pub fn report(&self) -> &ValidationReport {
        &self.report
    }

    /// Write the selected projections into `dst`
    pub fn export(&self, dst: &Path, format: ExportFormat) -> Result<ExportSummary> {
        let config = self.config();
        let tts_rules = config.tabletop_sim_rules();
        let options = ExportOptions {
            format,
            tts_rules: &tts_rules,
            localisation_dir: config.localisation_dir.as_deref(),
        };
        export(&self.dataset, dst, &options)
    }

    /// Describe how a fighter was resolved
    pub fn explain(&self, id_or_name: &str) -> Result<Explanation> {
        let data = &self.dataset;
        let fighter = data
            .find_fighter(id_or_name)
            .ok_or_else(|| Error::FighterNotFound(id_or_name.to_string()))?;

        let abilities = data
            .abilities_of(fighter)
            .filter_map(|ability| {
                candidate_reason(data, fighter, ability).map(|reason| ExplainedAbility {
                    id: ability.id.clone(),
                    name: ability.name.clone(),
                    cost: ability.cost.label(),
                    key: ability.warband.clone(),
                    reason,
                })
            })
            .collect();

        Ok(Explanation {
            id: fighter.id.clone(),
            name: fighter.name.clone(),
            warband: fighter.warband.clone(),
            faction: data.faction_of(fighter).map(|f| f.warband.clone()),
            subfaction: data.subfaction_key(fighter).map(str::to_string),
            abilities,
        })
    }
}

/// A fighter's resolved associations
#[derive(Debug, Clone, PartialEq)]
pub struct Explanation {
    pub id: String,
    pub name: String,
    pub warband: String,
    pub faction: Option<String>,
    pub subfaction: Option<String>,
    pub abilities: Vec<ExplainedAbility>,
}

/// An assigned ability and the key through which it was reached
#[derive(Debug, Clone, PartialEq)]
pub struct ExplainedAbility {
    pub id: String,
    pub name: String,
    pub cost: String,
    pub key: String,
    pub reason: MatchReason,
}
