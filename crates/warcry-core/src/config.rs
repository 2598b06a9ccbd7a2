//! Pipeline configuration

use crate::error::{Error, Result};
use crate::rules::{tabletop_sim_specs, RuleSpec, TargetRules};
use crate::writer::write_json;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Where the data lives and how export targets filter it
///
/// Every field has a default, so a config file only needs the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root of the fragment tree
    pub data_root: PathBuf,
    /// Directory holding the JSON Schema documents
    pub schema_dir: PathBuf,
    /// Filename glob a fragment must match
    pub file_glob: String,
    /// Directory of `<lang>.json` translation files
    pub localisation_dir: Option<PathBuf>,
    /// Exclusion rules of the tabletop-simulator export
    pub tabletop_sim: Vec<RuleSpec>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("data"),
            schema_dir: PathBuf::from("schemas"),
            file_glob: "*.json".to_string(),
            localisation_dir: None,
            tabletop_sim: tabletop_sim_specs(),
        }
    }
}

impl Config {
    /// Load a config file from JSON
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| Error::FileRead {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            Error::Config(format!("{}: {}", path.as_ref().display(), e))
        })?;
        config.check()?;
        Ok(config)
    }

    /// Save the config to JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_json(path.as_ref(), self)
    }

    fn check(&self) -> Result<()> {
        glob::Pattern::new(&self.file_glob)
            .map_err(|e| Error::Config(format!("invalid file_glob '{}': {}", self.file_glob, e)))?;
        Ok(())
    }

    /// Built rules of the tabletop-simulator target
    pub fn tabletop_sim_rules(&self) -> TargetRules {
        TargetRules::from_specs(&self.tabletop_sim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.data_root, PathBuf::from("data"));
        assert_eq!(config.file_glob, "*.json");
        let rules = config.tabletop_sim_rules();
        assert_eq!(rules.fighters.len(), 1);
        assert_eq!(rules.abilities.len(), 2);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("warcry.json");
        fs::write(&path, r#"{"data_root": "fragments", "tabletop_sim": []}"#).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.data_root, PathBuf::from("fragments"));
        assert_eq!(config.schema_dir, PathBuf::from("schemas"));
        assert!(config.tabletop_sim.is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("warcry.json");
        let config = Config {
            localisation_dir: Some(PathBuf::from("localisation")),
            ..Default::default()
        };
        config.save(&path).unwrap();
        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn test_bad_glob_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("warcry.json");
        fs::write(&path, r#"{"file_glob": "[*.json"}"#).unwrap();
        assert!(matches!(Config::load(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Config::load("/nonexistent/warcry.json"),
            Err(Error::FileRead { .. })
        ));
    }
}
