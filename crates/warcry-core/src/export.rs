//! Export projections of a resolved dataset
//!
//! Every function here reads the graph and works on copies of the records it
//! writes; nothing in the dataset is modified.

use crate::ability::{Ability, Cost, UNIVERSAL};
use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::fighter::{table_targets, Fighter};
use crate::loader::load_localisation;
use crate::record::Record;
use crate::rules::{ExclusionRule, TargetRules};
use crate::writer::{write_csv, write_csv_grid, write_json, write_markdown_table};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

/// File names of the aggregate projections
pub const FIGHTERS_JSON: &str = "fighters.json";
pub const ABILITIES_JSON: &str = "abilities.json";
pub const BATTLETRAITS_JSON: &str = "battletraits.json";
pub const ABILITIES_BATTLETRAITS_JSON: &str = "abilities_battletraits.json";
pub const FIGHTERS_TTS_JSON: &str = "fighters_tts.json";
pub const FIGHTERS_CSV: &str = "fighters.csv";
pub const FIGHTERS_MD: &str = "fighters.md";
pub const KILL_CHANCES_CSV: &str = "kill_chances.csv";

/// Which projection(s) to write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    All,
    Json,
    Warbands,
    Tts,
    Csv,
    Markdown,
    Localisation,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Json => "json",
            Self::Warbands => "warbands",
            Self::Tts => "tts",
            Self::Csv => "csv",
            Self::Markdown => "markdown",
            Self::Localisation => "localisation",
        }
    }

    /// True if this selection includes `other`
    pub fn includes(&self, other: ExportFormat) -> bool {
        *self == Self::All || *self == other
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "all" => Ok(Self::All),
            "json" => Ok(Self::Json),
            "warbands" => Ok(Self::Warbands),
            "tts" => Ok(Self::Tts),
            "csv" => Ok(Self::Csv),
            "markdown" | "md" => Ok(Self::Markdown),
            "localisation" | "localization" => Ok(Self::Localisation),
            other => Err(Error::Config(format!(
                "unknown export format '{}' (expected all, json, warbands, tts, csv, markdown or localisation)",
                other
            ))),
        }
    }
}

/// Files written and warnings raised by an export
#[derive(Debug, Clone, Default)]
pub struct ExportSummary {
    pub files: Vec<PathBuf>,
    pub warnings: Vec<String>,
}

impl ExportSummary {
    fn merge(&mut self, other: ExportSummary) {
        self.files.extend(other.files);
        self.warnings.extend(other.warnings);
    }
}

/// Lower-case a name, turn spaces into underscores, drop filesystem-illegal characters
pub fn sanitise_filename(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*'))
        .map(|c| if c == ' ' { '_' } else { c })
        .collect()
}

/// Fighters in export order, weapons ordered by maximum range
pub fn fighter_records(data: &Dataset) -> Vec<Record> {
    let mut fighters: Vec<&Fighter> = data.fighters.iter().collect();
    sort_fighters(&mut fighters);
    fighters.into_iter().map(export_fighter).collect()
}

fn sort_fighters(fighters: &mut [&Fighter]) {
    fighters.sort_by(|a, b| {
        (&a.grand_alliance, &a.warband, &a.bladeborn, a.points).cmp(&(
            &b.grand_alliance,
            &b.warband,
            &b.bladeborn,
            b.points,
        ))
    });
}

fn export_fighter(fighter: &Fighter) -> Record {
    let mut weapons = fighter.weapons.clone();
    weapons.sort_by_key(|w| w.max_range);

    let mut record = fighter.to_record();
    record.insert(
        "weapons".into(),
        Value::Array(
            weapons
                .iter()
                .map(|w| Value::Object(w.to_record()))
                .collect(),
        ),
    );
    record
}

/// Abilities accepted by `select`, stably sorted by warband
pub fn ability_records<F>(data: &Dataset, select: F) -> Vec<Record>
where
    F: Fn(&Ability) -> bool,
{
    let mut abilities: Vec<&Ability> = data.abilities.iter().filter(|&a| select(a)).collect();
    abilities.sort_by(|a, b| a.warband.cmp(&b.warband));
    abilities.into_iter().map(Ability::to_record).collect()
}

/// Write the aggregate JSON projections
pub fn export_json(data: &Dataset, dst: &Path) -> Result<ExportSummary> {
    let mut summary = ExportSummary::default();

    let fighters = fighter_records(data);
    write_to(&mut summary, &dst.join(FIGHTERS_JSON), &fighters)?;

    let projections: [(&str, fn(&Ability) -> bool); 3] = [
        (ABILITIES_JSON, |a| a.cost != Cost::Battletrait),
        (BATTLETRAITS_JSON, |a| a.cost == Cost::Battletrait),
        (ABILITIES_BATTLETRAITS_JSON, |_| true),
    ];
    for (file_name, select) in projections {
        let abilities = ability_records(data, select);
        write_to(&mut summary, &dst.join(file_name), &abilities)?;
    }

    Ok(summary)
}

fn write_to(summary: &mut ExportSummary, path: &Path, records: &[Record]) -> Result<()> {
    write_json(path, records)?;
    info!(records = records.len(), "wrote {}", path.display());
    summary.files.push(path.to_path_buf());
    Ok(())
}

/// One (grand alliance, warband) bucket of the partitioned export
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WarbandPartition {
    pub grand_alliance: String,
    pub warband: String,
    pub faction: Option<Record>,
    pub fighters: Vec<Record>,
    pub abilities: Vec<Record>,
}

/// The whole partitioned export before it is written
#[derive(Debug, Clone, Default)]
pub struct Partitions {
    pub warbands: Vec<WarbandPartition>,
    pub universal: Vec<Record>,
    pub warnings: Vec<String>,
}

/// Group fighters, abilities and factions by (grand alliance, warband)
///
/// An ability key may name a warband, a subfaction runemark or a bladeborn
/// value. Keys that reach no partition are skipped with a warning; a key
/// reaching partitions of more than one grand alliance is an error.
pub fn warband_partitions(data: &Dataset) -> Result<Partitions> {
    let mut buckets: BTreeMap<(String, String), WarbandPartition> = BTreeMap::new();

    let mut fighters: Vec<&Fighter> = data.fighters.iter().collect();
    sort_fighters(&mut fighters);
    for fighter in fighters {
        bucket(&mut buckets, &fighter.grand_alliance, &fighter.warband)
            .fighters
            .push(export_fighter(fighter));
    }
    for faction in &data.factions {
        bucket(&mut buckets, &faction.grand_alliance, &faction.warband).faction =
            Some(faction.to_record());
    }

    // ability key -> warbands it stands for
    let mut keys: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for faction in &data.factions {
        keys.entry(&faction.warband).or_default().insert(&faction.warband);
        for sub in &faction.subfactions {
            keys.entry(&sub.runemark).or_default().insert(&faction.warband);
        }
    }
    for fighter in &data.fighters {
        keys.entry(&fighter.warband).or_default().insert(&fighter.warband);
        for hint in fighter.subfaction_hints() {
            keys.entry(hint).or_default().insert(&fighter.warband);
        }
    }

    let mut partitions = Partitions::default();
    let mut abilities: Vec<&Ability> = data.abilities.iter().collect();
    abilities.sort_by(|a, b| a.warband.cmp(&b.warband));

    for ability in abilities {
        if ability.is_universal() {
            partitions.universal.push(ability.to_record());
            continue;
        }

        let targets: Vec<(String, String)> = match keys.get(ability.warband.as_str()) {
            Some(warbands) => buckets
                .keys()
                .filter(|(_, warband)| warbands.contains(warband.as_str()))
                .cloned()
                .collect(),
            None => Vec::new(),
        };

        let alliances: BTreeSet<&str> = targets.iter().map(|(ga, _)| ga.as_str()).collect();
        match alliances.len() {
            0 => {
                let message = format!(
                    "no grand alliance found for ability '{}' ({}) with warband '{}'",
                    ability.name, ability.id, ability.warband
                );
                warn!("{}", message);
                partitions.warnings.push(message);
            }
            1 => {
                for target in &targets {
                    if let Some(partition) = buckets.get_mut(target) {
                        partition.abilities.push(ability.to_record());
                    }
                }
            }
            _ => {
                return Err(Error::AmbiguousGrandAlliance {
                    ability: format!("{} ({})", ability.name, ability.id),
                    key: ability.warband.clone(),
                    alliances: alliances.into_iter().map(str::to_string).collect(),
                });
            }
        }
    }

    partitions.warbands = buckets.into_values().collect();
    Ok(partitions)
}

fn bucket<'a>(
    buckets: &'a mut BTreeMap<(String, String), WarbandPartition>,
    grand_alliance: &str,
    warband: &str,
) -> &'a mut WarbandPartition {
    buckets
        .entry((grand_alliance.to_string(), warband.to_string()))
        .or_insert_with(|| WarbandPartition {
            grand_alliance: grand_alliance.to_string(),
            warband: warband.to_string(),
            ..Default::default()
        })
}

/// Write the partitioned tree: `<ga>/<warband>/<warband>_{fighters,abilities,faction}.json`
/// plus `universal/universal_abilities.json`
pub fn export_warbands(data: &Dataset, dst: &Path) -> Result<ExportSummary> {
    let partitions = warband_partitions(data)?;
    let mut summary = ExportSummary {
        warnings: partitions.warnings,
        ..Default::default()
    };

    for partition in &partitions.warbands {
        let name = sanitise_filename(&partition.warband);
        let dir = dst
            .join(sanitise_filename(&partition.grand_alliance))
            .join(&name);

        write_to(
            &mut summary,
            &dir.join(format!("{}_fighters.json", name)),
            &partition.fighters,
        )?;
        write_to(
            &mut summary,
            &dir.join(format!("{}_abilities.json", name)),
            &partition.abilities,
        )?;
        if let Some(faction) = &partition.faction {
            let path = dir.join(format!("{}_faction.json", name));
            write_json(&path, faction)?;
            summary.files.push(path);
        }
    }

    write_to(
        &mut summary,
        &dst.join(UNIVERSAL).join(format!("{}_abilities.json", UNIVERSAL)),
        &partitions.universal,
    )?;

    Ok(summary)
}

/// Tabletop-simulator projection: surviving fighters with surviving ability identifiers
pub fn tts_records(data: &Dataset, rules: &TargetRules) -> Vec<Record> {
    let kept = rules.fighters.filter(&data.fighters);
    let excluded = data.fighters.len() - kept.len();

    let records: Vec<Record> = kept
        .into_iter()
        .map(|fighter| {
            let mut record = data.fighter_record(fighter);
            let abilities = data
                .abilities_of(fighter)
                .filter(|a| !rules.abilities.should_exclude(a))
                .map(|a| Value::from(a.id.clone()))
                .collect();
            record.insert("abilities".into(), Value::Array(abilities));
            record
        })
        .collect();

    info!(
        fighters = records.len(),
        excluded, "built tabletop simulator projection"
    );
    records
}

pub fn export_tts(data: &Dataset, rules: &TargetRules, dst: &Path) -> Result<ExportSummary> {
    let mut summary = ExportSummary::default();
    write_to(&mut summary, &dst.join(FIGHTERS_TTS_JSON), &tts_records(data, rules))?;
    Ok(summary)
}

/// Overlay translated fields onto copies of every ability, sorted by warband
///
/// Abilities without an entry pass through unchanged and are reported.
pub fn localised_abilities(
    data: &Dataset,
    translations: &Map<String, Value>,
) -> (Vec<Record>, Vec<String>) {
    let mut missing = Vec::new();
    let records = ability_records(data, |_| true)
        .into_iter()
        .map(|mut record| {
            let id = record
                .get("_id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            match translations.get(&id) {
                Some(Value::Object(fields)) => {
                    for (key, value) in fields {
                        record.insert(key.clone(), value.clone());
                    }
                }
                _ => {
                    let name = record.get("name").and_then(Value::as_str).unwrap_or_default();
                    missing.push(format!("{} - {}", id, name));
                }
            }
            record
        })
        .collect();
    (records, missing)
}

/// Write `<dst>/<lang>/abilities.json` for every `<lang>.json` in `dir`
pub fn export_localisation(data: &Dataset, dir: &Path, dst: &Path) -> Result<ExportSummary> {
    let mut summary = ExportSummary::default();

    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|source| Error::FileRead {
            path: dir.to_path_buf(),
            source,
        })?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();

    for file in files {
        let Some(lang) = file.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let translations = load_localisation(&file)?;
        let (records, missing) = localised_abilities(data, &translations);
        for entry in missing {
            let message = format!("localisation '{}' has no entry for {}", lang, entry);
            warn!("{}", message);
            summary.warnings.push(message);
        }
        write_to(&mut summary, &dst.join(lang).join(ABILITIES_JSON), &records)?;
    }

    Ok(summary)
}

/// Fighters in export order with weapons spread over `weapon_<n>_<field>` columns
pub fn flattened_fighter_records(data: &Dataset) -> Vec<Record> {
    fighter_records(data)
        .into_iter()
        .map(|mut record| {
            if let Some(Value::Array(weapons)) = record.remove("weapons") {
                for (i, weapon) in weapons.into_iter().enumerate() {
                    if let Value::Object(fields) = weapon {
                        for (key, value) in fields {
                            record.insert(format!("weapon_{}_{}", i + 1, key), value);
                        }
                    }
                }
            }
            record
        })
        .collect()
}

/// Fighters' tabular profiles plus the kill-chance grid
pub fn export_csv(data: &Dataset, dst: &Path) -> Result<ExportSummary> {
    let path = dst.join(FIGHTERS_CSV);
    let rows = flattened_fighter_records(data);
    write_csv(&path, &rows)?;
    info!(rows = rows.len(), "wrote {}", path.display());

    let grid = dst.join(KILL_CHANCES_CSV);
    write_kill_chances(data, &grid)?;
    Ok(ExportSummary {
        files: vec![path, grid],
        ..Default::default()
    })
}

/// One row per standard target, one column per fighter in export order
///
/// Each cell is the percent chance that the fighter's best weapon takes the
/// target down in a single attack action.
pub fn write_kill_chances(data: &Dataset, path: &Path) -> Result<()> {
    let mut fighters: Vec<&Fighter> = data.fighters.iter().collect();
    sort_fighters(&mut fighters);

    let tables: Vec<Vec<u32>> = fighters
        .iter()
        .map(|f| f.kill_chance_table(1).into_iter().map(|(_, pct)| pct).collect())
        .collect();

    let header: Vec<String> = std::iter::once("target".to_string())
        .chain(fighters.iter().map(|f| f.name.clone()))
        .collect();
    let rows: Vec<Vec<String>> = table_targets()
        .enumerate()
        .map(|(i, target)| {
            std::iter::once(target.label())
                .chain(tables.iter().map(|t| t[i].to_string()))
                .collect()
        })
        .collect();

    write_csv_grid(path, &header, &rows)?;
    info!(targets = rows.len(), fighters = fighters.len(), "wrote {}", path.display());
    Ok(())
}

pub fn export_markdown(data: &Dataset, dst: &Path) -> Result<ExportSummary> {
    let path = dst.join(FIGHTERS_MD);
    let rows = flattened_fighter_records(data);
    write_markdown_table(&path, &rows)?;
    info!(rows = rows.len(), "wrote {}", path.display());
    Ok(ExportSummary {
        files: vec![path],
        ..Default::default()
    })
}

/// Everything an export run needs besides the dataset
#[derive(Debug)]
pub struct ExportOptions<'a> {
    pub format: ExportFormat,
    pub tts_rules: &'a TargetRules,
    pub localisation_dir: Option<&'a Path>,
}

/// Run the selected projections into `dst`
///
/// The dataset must be resolved. Localisation is skipped when no directory is
/// configured, unless it was asked for explicitly.
pub fn export(data: &Dataset, dst: &Path, options: &ExportOptions<'_>) -> Result<ExportSummary> {
    if !data.is_resolved() {
        return Err(Error::Resolution(vec![
            "dataset must be resolved before export".to_string(),
        ]));
    }

    let format = options.format;
    let mut summary = ExportSummary::default();

    if format.includes(ExportFormat::Json) {
        summary.merge(export_json(data, dst)?);
    }
    if format.includes(ExportFormat::Warbands) {
        summary.merge(export_warbands(data, dst)?);
    }
    if format.includes(ExportFormat::Tts) {
        summary.merge(export_tts(data, options.tts_rules, dst)?);
    }
    if format.includes(ExportFormat::Csv) {
        summary.merge(export_csv(data, dst)?);
    }
    if format.includes(ExportFormat::Markdown) {
        summary.merge(export_markdown(data, dst)?);
    }
    if format.includes(ExportFormat::Localisation) {
        match options.localisation_dir {
            Some(dir) => summary.merge(export_localisation(data, dir, dst)?),
            None if format == ExportFormat::Localisation => {
                return Err(Error::Config(
                    "no localisation directory configured".to_string(),
                ));
            }
            None => {}
        }
    }

    info!(
        files = summary.files.len(),
        warnings = summary.warnings.len(),
        "export to {} finished",
        dst.display()
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;
    use crate::resolver::resolve;
    use crate::resolver::tests::{ability_value, sample_raw};
    use serde_json::json;
    use tempfile::tempdir;

    fn resolved() -> Dataset {
        let mut data = Dataset::from_raw(&sample_raw()).unwrap();
        resolve(&mut data).unwrap();
        data
    }

    fn ids(records: &[Record]) -> Vec<&str> {
        records.iter().map(|r| r["_id"].as_str().unwrap()).collect()
    }

    fn read_records(path: &Path) -> Vec<Record> {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn test_sanitise_filename() {
        assert_eq!(sanitise_filename("Cities of Sigmar"), "cities_of_sigmar");
        assert_eq!(sanitise_filename("Kruleboyz: Big/Boss?"), "kruleboyz_bigboss");
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("JSON".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert_eq!("md".parse::<ExportFormat>().unwrap(), ExportFormat::Markdown);
        assert!("pdf".parse::<ExportFormat>().is_err());
        assert!(ExportFormat::All.includes(ExportFormat::Tts));
        assert!(!ExportFormat::Csv.includes(ExportFormat::Tts));
    }

    #[test]
    fn test_fighter_order_and_weapons() {
        let data = resolved();
        let records = fighter_records(&data);

        // destruction < order; within Cities, "" bladeborn sorts before "Hammerhal"
        assert_eq!(ids(&records), vec!["k1", "c2", "c1", "s1", "s2"]);

        let ranges: Vec<i64> = records[0]["weapons"]
            .as_array()
            .unwrap()
            .iter()
            .map(|w| w["max_range"].as_i64().unwrap())
            .collect();
        let mut sorted = ranges.clone();
        sorted.sort();
        assert_eq!(ranges, sorted);
        assert!(!records[0].contains_key("abilities"));
    }

    #[test]
    fn test_ability_projections() {
        let data = resolved();
        let dir = tempdir().unwrap();
        let summary = export_json(&data, dir.path()).unwrap();
        assert_eq!(summary.files.len(), 4);

        let abilities = read_records(&dir.path().join(ABILITIES_JSON));
        let battletraits = read_records(&dir.path().join(BATTLETRAITS_JSON));
        let all = read_records(&dir.path().join(ABILITIES_BATTLETRAITS_JSON));

        assert_eq!(ids(&abilities), vec!["a3", "a5", "a1", "a2"]);
        assert_eq!(ids(&battletraits), vec!["a4"]);
        assert_eq!(all.len(), 5);
    }

    #[test]
    fn test_json_export_is_byte_identical() {
        let data = resolved();
        let first = tempdir().unwrap();
        let second = tempdir().unwrap();
        export_json(&data, first.path()).unwrap();
        export_json(&resolved(), second.path()).unwrap();

        for name in [FIGHTERS_JSON, ABILITIES_JSON, ABILITIES_BATTLETRAITS_JSON] {
            let a = fs::read(first.path().join(name)).unwrap();
            let b = fs::read(second.path().join(name)).unwrap();
            assert_eq!(a, b, "{} differs", name);
        }
    }

    #[test]
    fn test_exports_leave_graph_untouched() {
        let data = resolved();
        let before = data.clone();
        let dir = tempdir().unwrap();
        let rules = TargetRules::tabletop_sim();
        let options = ExportOptions {
            format: ExportFormat::All,
            tts_rules: &rules,
            localisation_dir: None,
        };
        export(&data, dir.path(), &options).unwrap();

        assert_eq!(data.fighters, before.fighters);
        assert_eq!(data.abilities, before.abilities);
    }

    #[test]
    fn test_export_requires_resolution() {
        let data = Dataset::from_raw(&sample_raw()).unwrap();
        let dir = tempdir().unwrap();
        let rules = TargetRules::default();
        let options = ExportOptions {
            format: ExportFormat::Json,
            tts_rules: &rules,
            localisation_dir: None,
        };
        assert!(export(&data, dir.path(), &options).is_err());
    }

    #[test]
    fn test_partitions() {
        let data = resolved();
        let partitions = warband_partitions(&data).unwrap();

        let keys: Vec<(&str, &str)> = partitions
            .warbands
            .iter()
            .map(|p| (p.grand_alliance.as_str(), p.warband.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("destruction", "Kruleboyz"),
                ("order", "Cities of Sigmar"),
                ("order", "Stormcast Eternals"),
            ]
        );

        // Hammerhal is a subfaction key and lands with its faction
        let cities = &partitions.warbands[1];
        assert_eq!(ids(&cities.abilities), vec!["a4", "a3"]);
        assert!(cities.faction.is_some());
        assert!(partitions.warbands[0].faction.is_none());
        assert_eq!(ids(&partitions.universal), vec!["a2"]);
        assert!(partitions.warnings.is_empty());
    }

    #[test]
    fn test_partition_unknown_key_warns() {
        let mut raw = sample_raw();
        raw.abilities.push(
            ability_value("a9", "Nobody", "single", &[])
                .as_object()
                .unwrap()
                .clone(),
        );
        let mut data = Dataset::from_raw(&raw).unwrap();
        resolve(&mut data).unwrap();

        let partitions = warband_partitions(&data).unwrap();
        assert_eq!(partitions.warnings.len(), 1);
        assert!(partitions.warnings[0].contains("a9"));
    }

    #[test]
    fn test_partition_ambiguous_alliance() {
        let mut raw = sample_raw();
        // A destruction fighter carrying a bladeborn key that also belongs to Cities
        raw.fighters[4].insert("bladeborn".into(), json!("Hammerhal"));
        let data = Dataset::from_raw(&raw).unwrap();

        match warband_partitions(&data) {
            Err(Error::AmbiguousGrandAlliance { key, alliances, .. }) => {
                assert_eq!(key, "Hammerhal");
                assert_eq!(alliances, vec!["destruction", "order"]);
            }
            other => panic!("expected ambiguity, got {:?}", other.map(|p| p.warbands.len())),
        }
    }

    #[test]
    fn test_export_warbands_layout() {
        let data = resolved();
        let dir = tempdir().unwrap();
        export_warbands(&data, dir.path()).unwrap();

        let cities = dir.path().join("order/cities_of_sigmar");
        assert!(cities.join("cities_of_sigmar_fighters.json").is_file());
        assert!(cities.join("cities_of_sigmar_abilities.json").is_file());
        assert!(cities.join("cities_of_sigmar_faction.json").is_file());
        assert!(!dir
            .path()
            .join("destruction/kruleboyz/kruleboyz_faction.json")
            .exists());

        let universal = read_records(&dir.path().join("universal/universal_abilities.json"));
        assert_eq!(ids(&universal), vec!["a2"]);
    }

    #[test]
    fn test_tts_projection() {
        let data = resolved();
        let records = tts_records(&data, &TargetRules::tabletop_sim());

        // Cities fighters are gone, order otherwise preserved
        assert_eq!(ids(&records), vec!["s1", "s2", "k1"]);
        // universal a2 is dropped from the ability list
        assert_eq!(records[0]["abilities"], json!(["a1"]));
        assert_eq!(records[2]["abilities"], json!([]));
        assert_eq!(records[0]["faction"], "Stormcast Eternals");
    }

    #[test]
    fn test_localisation_overlay() {
        let data = resolved();
        let translations = json!({
            "a1": {"name": "Sturmangriff", "description": "Beschreibung"}
        });
        let (records, missing) =
            localised_abilities(&data, translations.as_object().unwrap());

        let a1 = records.iter().find(|r| r["_id"] == "a1").unwrap();
        assert_eq!(a1["name"], "Sturmangriff");
        assert_eq!(a1["cost"], "double");
        assert_eq!(missing.len(), 4);
        assert_eq!(data.abilities[0].name, "Ability a1");
    }

    #[test]
    fn test_export_localisation_per_language() {
        let data = resolved();
        let loc = tempdir().unwrap();
        let out = tempdir().unwrap();
        fs::write(loc.path().join("de.json"), r#"{"a1": {"name": "Angriff"}}"#).unwrap();
        fs::write(loc.path().join("fr.json"), r#"{}"#).unwrap();
        fs::write(loc.path().join("notes.txt"), "ignored").unwrap();

        let summary = export_localisation(&data, loc.path(), out.path()).unwrap();
        assert_eq!(summary.files.len(), 2);
        assert_eq!(summary.warnings.len(), 4 + 5);

        let de = read_records(&out.path().join("de").join(ABILITIES_JSON));
        assert!(de.iter().any(|r| r["name"] == "Angriff"));
    }

    #[test]
    fn test_flattened_weapons() {
        let data = resolved();
        let rows = flattened_fighter_records(&data);
        let row = &rows[0];
        assert!(!row.contains_key("weapons"));
        assert_eq!(row["weapon_1_max_range"], 2);
        assert_eq!(row["weapon_2_max_range"], 12);
        assert!(data.fighters[0].weapons.len() == 2);

        let dir = tempdir().unwrap();
        export_csv(&data, dir.path()).unwrap();
        export_markdown(&data, dir.path()).unwrap();
        let csv_text = fs::read_to_string(dir.path().join(FIGHTERS_CSV)).unwrap();
        assert_eq!(csv_text.lines().count(), 1 + data.fighters.len());
        assert!(csv_text.lines().next().unwrap().contains("weapon_2_runemark"));
    }

    #[test]
    fn test_kill_chance_grid() {
        let data = resolved();
        let dir = tempdir().unwrap();
        let summary = export_csv(&data, dir.path()).unwrap();
        assert!(summary.files.contains(&dir.path().join(KILL_CHANCES_CSV)));

        let text = fs::read_to_string(dir.path().join(KILL_CHANCES_CSV)).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 1 + 45);
        assert_eq!(
            lines[0],
            "target,Fighter k1,Fighter c2,Fighter c1,Fighter s1,Fighter s2"
        );
        // Every sample fighter carries the same weapons
        assert_eq!(lines[1], "T3W3,79,79,79,79,79");
        assert_eq!(lines[45], "T7W25,0,0,0,0,0");
    }
}
