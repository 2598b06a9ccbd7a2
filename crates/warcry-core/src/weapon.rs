//! Weapon profiles and damage statistics

use crate::record::{extra_fields, req_int, req_str, FieldResult, Record};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const FIELDS: &[&str] = &[
    "attacks",
    "strength",
    "dmg_hit",
    "dmg_crit",
    "min_range",
    "max_range",
    "runemark",
];

/// A weapon carried by a single fighter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weapon {
    pub attacks: i64,
    pub strength: i64,
    pub dmg_hit: i64,
    pub dmg_crit: i64,
    pub min_range: i64,
    pub max_range: i64,
    /// The weapon's own runemark (e.g. "sword", "ranged")
    pub runemark: String,
    /// Fields carried through untouched
    #[serde(skip)]
    pub extra: Record,
}

/// Average damage of one attack action against lower, equal and higher toughness
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AverageDamage {
    pub vs_lower: f64,
    pub vs_same: f64,
    pub vs_higher: f64,
}

impl Weapon {
    /// Build a weapon from its fragment record
    pub fn from_record(record: &Record) -> FieldResult<Self> {
        let weapon = Self {
            attacks: req_int(record, "attacks")?,
            strength: req_int(record, "strength")?,
            dmg_hit: req_int(record, "dmg_hit")?,
            dmg_crit: req_int(record, "dmg_crit")?,
            min_range: req_int(record, "min_range")?,
            max_range: req_int(record, "max_range")?,
            runemark: req_str(record, "runemark")?,
            extra: extra_fields(record, FIELDS),
        };

        if weapon.attacks < 1 {
            return Err(format!(
                "weapon '{}' must have at least 1 attack, found {}",
                weapon.runemark, weapon.attacks
            ));
        }

        Ok(weapon)
    }

    /// Convert back into a record with every original field
    pub fn to_record(&self) -> Record {
        let mut record = self.extra.clone();
        record.insert("attacks".into(), Value::from(self.attacks));
        record.insert("strength".into(), Value::from(self.strength));
        record.insert("dmg_hit".into(), Value::from(self.dmg_hit));
        record.insert("dmg_crit".into(), Value::from(self.dmg_crit));
        record.insert("min_range".into(), Value::from(self.min_range));
        record.insert("max_range".into(), Value::from(self.max_range));
        record.insert("runemark".into(), Value::from(self.runemark.clone()));
        record
    }

    /// Expected damage of a single attack action, hitting on 3+/4+/5+ and critting on 6
    pub fn average_damage(&self) -> AverageDamage {
        AverageDamage {
            vs_lower: self.expected_damage(3),
            vs_same: self.expected_damage(4),
            vs_higher: self.expected_damage(5),
        }
    }

    /// Probability that `attack_actions` attack actions deal at least `vs_wounds`
    /// damage to a target with toughness `vs_toughness`
    pub fn kill_chance(&self, vs_toughness: i64, vs_wounds: i64, attack_actions: u32) -> f64 {
        if vs_wounds <= 0 {
            return 1.0;
        }

        let dice = self.attacks.max(0).saturating_mul(i64::from(attack_actions));
        let most = dice.saturating_mul(self.dmg_hit.max(self.dmg_crit).max(0));
        if most < vs_wounds {
            return 0.0;
        }

        let to_hit = to_hit_roll(self.strength, vs_toughness);
        let (p_miss, p_hit, p_crit) = die_odds(to_hit);

        // Damage is capped at vs_wounds; the last bucket means "lethal"
        let cap = vs_wounds as usize;
        let mut dist = vec![0.0_f64; cap + 1];
        dist[0] = 1.0;

        for _ in 0..dice {
            let mut next = vec![0.0_f64; cap + 1];
            for (dmg, &p) in dist.iter().enumerate() {
                if p == 0.0 {
                    continue;
                }
                next[dmg] += p * p_miss;
                next[add_capped(dmg, self.dmg_hit, cap)] += p * p_hit;
                next[add_capped(dmg, self.dmg_crit, cap)] += p * p_crit;
            }
            dist = next;
        }

        dist[cap]
    }

    fn expected_damage(&self, to_hit: i64) -> f64 {
        let (_, p_hit, p_crit) = die_odds(to_hit);
        self.attacks as f64 * (p_hit * self.dmg_hit as f64 + p_crit * self.dmg_crit as f64)
    }
}

/// Roll needed to hit: 3+ when stronger, 4+ when equal, 5+ when weaker
fn to_hit_roll(strength: i64, toughness: i64) -> i64 {
    match strength.cmp(&toughness) {
        std::cmp::Ordering::Greater => 3,
        std::cmp::Ordering::Equal => 4,
        std::cmp::Ordering::Less => 5,
    }
}

/// (miss, hit, crit) probabilities of one D6
fn die_odds(to_hit: i64) -> (f64, f64, f64) {
    let hit_faces = (6 - to_hit).max(0) as f64;
    let miss_faces = (to_hit - 1).max(0) as f64;
    (miss_faces / 6.0, hit_faces / 6.0, 1.0 / 6.0)
}

fn add_capped(dmg: usize, add: i64, cap: usize) -> usize {
    (dmg + add.max(0) as usize).min(cap)
}
