//! Stable identifier assignment for fighters and abilities

use crate::loader::RawData;
use crate::record::{display_name, Record};
use rand::Rng;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::OnceLock;
use tracing::info;

/// Identifier field name in fragment records
pub const ID_FIELD: &str = "_id";

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^(PLACEHOLDER|XXXXXX)").expect("placeholder pattern is valid")
    })
}

/// True for identifiers that are stand-ins waiting for a real value
pub fn is_placeholder(id: &str) -> bool {
    placeholder_pattern().is_match(id)
}

/// A newly generated identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdAssignment {
    /// "fighters" or "abilities"
    pub collection: &'static str,
    /// Position of the record in its collection
    pub index: usize,
    pub name: String,
    /// The previous value when it was a placeholder
    pub previous: Option<String>,
    pub id: String,
}

/// Assign identifiers to fighters and abilities; factions are left alone
pub fn assign_all(raw: &mut RawData) -> Vec<IdAssignment> {
    let mut rng = rand::thread_rng();
    let mut assigned = assign_ids_with(&mut raw.fighters, "fighters", &mut rng);
    assigned.extend(assign_ids_with(&mut raw.abilities, "abilities", &mut rng));
    assigned
}

/// Give every record without a valid `_id` a fresh 8-hex-digit token
///
/// A valid identifier is a string that does not look like a placeholder. Valid
/// identifiers are never touched, so a second run changes nothing. New tokens
/// never collide with identifiers already in the collection.
pub fn assign_ids_with<R: Rng>(
    records: &mut [Record],
    collection: &'static str,
    rng: &mut R,
) -> Vec<IdAssignment> {
    let mut taken: HashSet<String> = records
        .iter()
        .filter_map(|r| r.get(ID_FIELD).and_then(Value::as_str))
        .map(str::to_string)
        .collect();

    let mut assigned = Vec::new();

    for (index, record) in records.iter_mut().enumerate() {
        let previous = match record.get(ID_FIELD) {
            Some(Value::String(id)) if !is_placeholder(id) => continue,
            Some(Value::String(id)) => Some(id.clone()),
            Some(other) => Some(other.to_string()),
            None => None,
        };

        let id = loop {
            let candidate = format!("{:08x}", rng.gen::<u32>());
            if taken.insert(candidate.clone()) {
                break candidate;
            }
        };

        let name = display_name(record).to_string();
        info!(collection, %name, %id, "assigning _id");
        record.insert(ID_FIELD.into(), Value::from(id.clone()));

        assigned.push(IdAssignment {
            collection,
            index,
            name,
            previous,
            id,
        });
    }

    assigned
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    fn records(values: Vec<Value>) -> Vec<Record> {
        values
            .into_iter()
            .map(|v| v.as_object().unwrap().clone())
            .collect()
    }

    #[test]
    fn test_placeholder_pattern() {
        assert!(is_placeholder("PLACEHOLDER1"));
        assert!(is_placeholder("placeholder"));
        assert!(is_placeholder("XXXXXX"));
        assert!(is_placeholder("xxxxxx-abc"));
        assert!(!is_placeholder("XXXXX"));
        assert!(!is_placeholder("a1b2c3d4"));
        assert!(!is_placeholder("my-PLACEHOLDER"));
    }

    #[test]
    fn test_shared_placeholders_get_distinct_ids() {
        let mut data = records(vec![
            json!({"_id": "PLACEHOLDER1", "name": "a"}),
            json!({"_id": "PLACEHOLDER1", "name": "b"}),
        ]);
        let mut rng = StdRng::seed_from_u64(7);
        let assigned = assign_ids_with(&mut data, "fighters", &mut rng);

        assert_eq!(assigned.len(), 2);
        let a = data[0]["_id"].as_str().unwrap();
        let b = data[1]["_id"].as_str().unwrap();
        assert_ne!(a, b);
        assert!(!is_placeholder(a) && !is_placeholder(b));
        assert_eq!(a.len(), 8);
        assert_eq!(assigned[0].previous.as_deref(), Some("PLACEHOLDER1"));
    }

    #[test]
    fn test_missing_and_non_string_ids() {
        let mut data = records(vec![json!({"name": "a"}), json!({"_id": 12})]);
        let mut rng = StdRng::seed_from_u64(1);
        let assigned = assign_ids_with(&mut data, "abilities", &mut rng);

        assert_eq!(assigned.len(), 2);
        assert_eq!(assigned[0].previous, None);
        assert_eq!(assigned[1].name, "unnamed");
        assert!(data.iter().all(|r| r["_id"].is_string()));
    }

    #[test]
    fn test_second_run_changes_nothing() {
        let mut data = records(vec![
            json!({"_id": "keepme01", "name": "a"}),
            json!({"_id": "XXXXXX", "name": "b"}),
            json!({"name": "c"}),
        ]);
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(assign_ids_with(&mut data, "fighters", &mut rng).len(), 2);
        let after_first = data.clone();

        assert!(assign_ids_with(&mut data, "fighters", &mut rng).is_empty());
        assert_eq!(data, after_first);
        assert_eq!(data[0]["_id"], "keepme01");
    }

    #[test]
    fn test_assign_all_skips_factions() {
        let mut raw = RawData {
            fighters: records(vec![json!({"name": "f"})]),
            abilities: records(vec![json!({"name": "a"})]),
            factions: records(vec![json!({"warband": "Kruleboyz"})]),
            fragments: vec![],
        };
        let assigned = assign_all(&mut raw);
        assert_eq!(assigned.len(), 2);
        assert!(!raw.factions[0].contains_key(ID_FIELD));
    }
}
