//! Fragment loader: discovers warband JSON files and concatenates their records

use crate::error::{Error, Result};
use crate::record::Record;
use crate::writer::write_json;
use glob::Pattern;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Directory name whose contents are never treated as data
pub const SCHEMAS_DIR: &str = "schemas";

/// What a fragment file contains, decided by its filename suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FragmentKind {
    /// `*_fighters.json`: a list of fighter records
    Fighters,
    /// `*_abilities.json`: a list of ability records
    Abilities,
    /// `*_faction.json`: a single faction record
    Faction,
}

impl FragmentKind {
    /// Classify a file by name
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        if file_name.ends_with("_fighters.json") {
            Some(Self::Fighters)
        } else if file_name.ends_with("_abilities.json") {
            Some(Self::Abilities)
        } else if file_name.ends_with("_faction.json") {
            Some(Self::Faction)
        } else {
            None
        }
    }
}

/// A loaded fragment file and where its records landed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fragment {
    pub path: PathBuf,
    pub kind: FragmentKind,
    /// Positions of this file's records inside the matching collection
    pub records: Range<usize>,
    /// True when the file was not valid UTF-8 and was read as latin-1
    pub latin1: bool,
}

/// Raw records of every fragment, concatenated per collection
#[derive(Debug, Clone, Default)]
pub struct RawData {
    pub fighters: Vec<Record>,
    pub abilities: Vec<Record>,
    pub factions: Vec<Record>,
    /// Source files in load order
    pub fragments: Vec<Fragment>,
}

impl RawData {
    /// Records that came from a fragment
    pub fn fragment_records(&self, fragment: &Fragment) -> &[Record] {
        let collection = match fragment.kind {
            FragmentKind::Fighters => &self.fighters,
            FragmentKind::Abilities => &self.abilities,
            FragmentKind::Faction => &self.factions,
        };
        &collection[fragment.records.clone()]
    }

    /// The fragment holding record `index` of a collection
    pub fn fragment_of(&self, kind: FragmentKind, index: usize) -> Option<&Fragment> {
        self.fragments
            .iter()
            .find(|f| f.kind == kind && f.records.contains(&index))
    }

    /// Rewrite fragment files from the in-memory records
    ///
    /// Only fragments accepted by `select` are written. Output is UTF-8 with
    /// sorted keys, so a latin-1 source is converted on the way.
    pub fn write_fragments<F>(&self, mut select: F) -> Result<Vec<PathBuf>>
    where
        F: FnMut(&Fragment) -> bool,
    {
        let mut written = Vec::new();
        for fragment in self.fragments.iter().filter(|f| select(f)) {
            let records = self.fragment_records(fragment);
            match fragment.kind {
                FragmentKind::Faction => match records.first() {
                    Some(record) => write_json(&fragment.path, record)?,
                    None => continue,
                },
                _ => write_json(&fragment.path, &records)?,
            }
            info!(path = %fragment.path.display(), records = records.len(), "rewrote fragment");
            written.push(fragment.path.clone());
        }
        Ok(written)
    }
}

/// Load every fragment under `root` whose filename matches `file_glob`
pub fn load_directory<P: AsRef<Path>>(root: P, file_glob: &str) -> Result<RawData> {
    let root = root.as_ref();
    if !root.is_dir() {
        return Err(Error::NotADirectory(root.to_path_buf()));
    }

    let pattern = Pattern::new(file_glob)
        .map_err(|e| Error::Config(format!("invalid file glob '{}': {}", file_glob, e)))?;

    let mut data = RawData::default();

    let walker = WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !(e.depth() > 0 && e.file_type().is_dir() && is_schemas_dir(e.path())));

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let Some(file_name) = path.file_name().and_then(|s| s.to_str()) else {
            continue;
        };
        if !pattern.matches(file_name) {
            continue;
        }
        let Some(kind) = FragmentKind::from_file_name(file_name) else {
            debug!(path = %path.display(), "skipping unclassified file");
            continue;
        };

        load_fragment(&mut data, path, kind)?;
    }

    info!(
        files = data.fragments.len(),
        fighters = data.fighters.len(),
        abilities = data.abilities.len(),
        factions = data.factions.len(),
        "loaded fragments from {}",
        root.display()
    );

    Ok(data)
}

/// Load a localisation file: ability identifier -> fields to overlay
pub fn load_localisation<P: AsRef<Path>>(path: P) -> Result<Map<String, Value>> {
    let path = path.as_ref();
    let (value, _) = read_json(path)?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(Error::FileLoad {
            path: path.to_path_buf(),
            message: "expected an object keyed by ability identifier".to_string(),
        }),
    }
}

fn load_fragment(data: &mut RawData, path: &Path, kind: FragmentKind) -> Result<()> {
    let (value, latin1) = read_json(path)?;

    let collection = match kind {
        FragmentKind::Fighters => &mut data.fighters,
        FragmentKind::Abilities => &mut data.abilities,
        FragmentKind::Faction => &mut data.factions,
    };
    let start = collection.len();

    let shape_error = |message: &str| Error::FileLoad {
        path: path.to_path_buf(),
        message: message.to_string(),
    };

    match (kind, value) {
        (FragmentKind::Faction, Value::Object(record)) => collection.push(record),
        (FragmentKind::Faction, _) => return Err(shape_error("expected a single faction object")),
        (_, Value::Array(items)) => {
            for (i, item) in items.into_iter().enumerate() {
                match item {
                    Value::Object(record) => collection.push(record),
                    _ => {
                        return Err(shape_error(&format!("item {} is not an object", i)));
                    }
                }
            }
        }
        (_, _) => return Err(shape_error("expected a list of records")),
    }

    let records = start..collection.len();
    debug!(path = %path.display(), ?kind, count = records.len(), "loaded fragment");

    data.fragments.push(Fragment {
        path: path.to_path_buf(),
        kind,
        records,
        latin1,
    });
    Ok(())
}

/// Read and parse a JSON file, falling back to latin-1 when it is not UTF-8
fn read_json(path: &Path) -> Result<(Value, bool)> {
    let bytes = fs::read(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let (text, latin1) = match String::from_utf8(bytes) {
        Ok(text) => (text, false),
        Err(e) => {
            warn!(path = %path.display(), "not valid UTF-8, reading as latin-1");
            (decode_latin1(e.as_bytes()), true)
        }
    };

    let value = serde_json::from_str(text.trim_start_matches('\u{feff}')).map_err(|e| {
        Error::FileLoad {
            path: path.to_path_buf(),
            message: format!("invalid JSON: {}", e),
        }
    })?;

    Ok((value, latin1))
}

/// Every latin-1 byte maps to the code point of the same value
fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

fn is_schemas_dir(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .is_some_and(|name| name.eq_ignore_ascii_case(SCHEMAS_DIR))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(path: &Path, content: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_classify_file_names() {
        assert_eq!(
            FragmentKind::from_file_name("kruleboyz_fighters.json"),
            Some(FragmentKind::Fighters)
        );
        assert_eq!(
            FragmentKind::from_file_name("kruleboyz_abilities.json"),
            Some(FragmentKind::Abilities)
        );
        assert_eq!(
            FragmentKind::from_file_name("kruleboyz_faction.json"),
            Some(FragmentKind::Faction)
        );
        assert_eq!(FragmentKind::from_file_name("fighters.json"), None);
        assert_eq!(FragmentKind::from_file_name("notes_fighters.txt"), None);
    }

    #[test]
    fn test_load_directory_concatenates() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(
            &root.join("destruction/kruleboyz/kruleboyz_fighters.json"),
            br#"[{"name": "a"}, {"name": "b"}]"#,
        );
        write(
            &root.join("order/stormcast/stormcast_fighters.json"),
            br#"[{"name": "c"}]"#,
        );
        write(
            &root.join("universal/universal_abilities.json"),
            br#"[{"name": "onslaught"}]"#,
        );
        write(
            &root.join("destruction/kruleboyz/kruleboyz_faction.json"),
            br#"{"warband": "Kruleboyz"}"#,
        );
        write(&root.join("schemas/fighter_fighters.json"), b"not json");
        write(&root.join("readme.json"), b"{}");

        let data = load_directory(root, "*.json").unwrap();
        assert_eq!(data.fighters.len(), 3);
        assert_eq!(data.abilities.len(), 1);
        assert_eq!(data.factions.len(), 1);
        assert_eq!(data.fragments.len(), 4);

        // Sorted walk: destruction before order
        assert_eq!(data.fighters[0]["name"], "a");
        assert_eq!(data.fighters[2]["name"], "c");

        let stormcast = data.fragment_of(FragmentKind::Fighters, 2).unwrap();
        assert!(stormcast.path.ends_with("stormcast_fighters.json"));
        assert_eq!(data.fragment_records(stormcast).len(), 1);
    }

    #[test]
    fn test_glob_restricts_files() {
        let dir = tempdir().unwrap();
        write(&dir.path().join("a_fighters.json"), b"[]");
        write(&dir.path().join("b_abilities.json"), b"[]");

        let data = load_directory(dir.path(), "*_fighters.json").unwrap();
        assert_eq!(data.fragments.len(), 1);
        assert_eq!(data.fragments[0].kind, FragmentKind::Fighters);
    }

    #[test]
    fn test_invalid_json_is_fatal() {
        let dir = tempdir().unwrap();
        let bad = dir.path().join("broken_abilities.json");
        write(&bad, b"[{\"name\": ");

        match load_directory(dir.path(), "*.json") {
            Err(Error::FileLoad { path, .. }) => assert_eq!(path, bad),
            other => panic!("expected FileLoad, got {:?}", other),
        }
    }

    #[test]
    fn test_wrong_shape_is_fatal() {
        let dir = tempdir().unwrap();
        write(&dir.path().join("x_faction.json"), b"[]");
        assert!(matches!(
            load_directory(dir.path(), "*.json"),
            Err(Error::FileLoad { .. })
        ));
    }

    #[test]
    fn test_latin1_fallback() {
        let dir = tempdir().unwrap();
        // "Éclat" with É encoded as the single latin-1 byte 0xC9
        write(
            &dir.path().join("x_abilities.json"),
            b"[{\"name\": \"\xC9clat\"}]",
        );

        let data = load_directory(dir.path(), "*.json").unwrap();
        assert_eq!(data.abilities[0]["name"], "Éclat");
        assert!(data.fragments[0].latin1);
    }

    #[test]
    fn test_missing_root() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            load_directory(&missing, "*.json"),
            Err(Error::NotADirectory(_))
        ));
    }

    #[test]
    fn test_write_fragments() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("x_abilities.json");
        write(&path, br#"[{"name": "a", "_id": "PLACEHOLDER"}]"#);

        let mut data = load_directory(dir.path(), "*.json").unwrap();
        data.abilities[0].insert("_id".into(), Value::from("1234abcd"));
        let written = data.write_fragments(|_| true).unwrap();
        assert_eq!(written, vec![path.clone()]);

        let reloaded = load_directory(dir.path(), "*.json").unwrap();
        assert_eq!(reloaded.abilities[0]["_id"], "1234abcd");
    }

    #[test]
    fn test_load_localisation() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("de.json");
        write(&path, br#"{"a1": {"name": "Blitzschlag"}}"#);
        let map = load_localisation(&path).unwrap();
        assert_eq!(map["a1"]["name"], "Blitzschlag");

        write(&path, b"[]");
        assert!(load_localisation(&path).is_err());
    }
}
