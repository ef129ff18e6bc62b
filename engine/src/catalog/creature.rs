use serde_yaml::{Mapping, Value};

use super::value::{as_int, as_string, as_string_list, get, scalar_or_field, string_at};
use super::{describe, Record, UNKNOWN};
use crate::rules::init_from_dex;

const ABILITY_KEYS: [&str; 6] = ["str", "dex", "con", "int", "wis", "cha"];

#[derive(Debug, Clone, PartialEq)]
pub struct CreatureRecord {
    pub id: u32,
    pub name: String,
    pub source: String,
    pub kind: String,
    /// `"1/4"`, `"3"`, or `"Unknown"`.
    pub challenge: String,
    pub environments: Vec<String>,
    /// STR, DEX, CON, INT, WIS, CHA; present only when all six are.
    pub abilities: Option<[i32; 6]>,
    pub dex: Option<i32>,
    pub hp_average: Option<u32>,
    pub hp_formula: Option<String>,
    pub ac: String,
    pub speed: String,
    pub raw: Mapping,
}

impl CreatureRecord {
    pub fn init_base(&self) -> Option<i32> {
        self.dex.map(init_from_dex)
    }
}

impl Record for CreatureRecord {
    const KEY: &'static str = "monsters";
    const NUMERIC_RANK: bool = true;

    fn from_raw(id: u32, raw: Mapping) -> Option<Self> {
        let name = string_at(&raw, "name");
        if name.is_empty() {
            return None;
        }
        let challenge = get(&raw, "cr")
            .map(|v| scalar_or_field(v, "cr"))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| UNKNOWN.to_string());
        let scores: Vec<Option<i32>> = ABILITY_KEYS
            .iter()
            .map(|k| get(&raw, k).and_then(as_int).and_then(|v| i32::try_from(v).ok()))
            .collect();
        let abilities = scores
            .iter()
            .copied()
            .collect::<Option<Vec<i32>>>()
            .and_then(|v| <[i32; 6]>::try_from(v).ok());
        let (hp_average, hp_formula) = extract_hp(get(&raw, "hp"));

        Some(Self {
            id,
            source: string_at(&raw, "source"),
            kind: get(&raw, "type").map(|v| scalar_or_field(v, "type")).unwrap_or_default(),
            challenge,
            environments: get(&raw, "environment").map(as_string_list).unwrap_or_default(),
            dex: scores[1],
            abilities,
            hp_average,
            hp_formula,
            ac: get(&raw, "ac").map(extract_ac).unwrap_or_default(),
            speed: get(&raw, "speed").map(extract_speed).unwrap_or_default(),
            name,
            raw,
        })
    }

    fn id(&self) -> u32 {
        self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn source(&self) -> &str {
        &self.source
    }
    fn rank(&self) -> &str {
        &self.challenge
    }
    fn kind(&self) -> &str {
        &self.kind
    }
    fn environments(&self) -> &[String] {
        &self.environments
    }
    fn raw(&self) -> &Mapping {
        &self.raw
    }
    fn describe(&self) -> String {
        describe::creature(self)
    }
}

/// `{average, formula}` or a bare number.
fn extract_hp(v: Option<&Value>) -> (Option<u32>, Option<String>) {
    let Some(v) = v else {
        return (None, None);
    };
    match v {
        Value::Mapping(m) => {
            let avg = get(m, "average").and_then(as_int).and_then(|n| u32::try_from(n).ok());
            let formula = string_at(m, "formula");
            (avg, (!formula.is_empty()).then_some(formula))
        }
        other => (as_int(other).and_then(|n| u32::try_from(n).ok()), None),
    }
}

/// `15`, `"15 (natural armor)"`, or a list of `{ac: ..}` / numbers joined by ", ".
fn extract_ac(v: &Value) -> String {
    fn one(v: &Value) -> String {
        match v {
            Value::Mapping(m) => string_at(m, "ac"),
            other => as_string(other),
        }
    }
    match v {
        Value::Sequence(items) => items
            .iter()
            .map(one)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        other => one(other),
    }
}

const SPEED_ORDER: [&str; 5] = ["walk", "burrow", "climb", "fly", "swim"];

fn extract_speed(v: &Value) -> String {
    let Value::Mapping(m) = v else {
        return as_string(v);
    };
    let keyed: Vec<(String, &Value)> = m.iter().map(|(k, v)| (as_string(k), v)).collect();
    let mut parts = Vec::new();
    for key in SPEED_ORDER {
        if let Some((_, val)) = keyed.iter().find(|(k, _)| k == key) {
            parts.push(speed_part(key, val));
        }
    }
    for (key, val) in &keyed {
        if key.is_empty() || key == "canHover" || SPEED_ORDER.contains(&key.as_str()) {
            continue;
        }
        parts.push(speed_part(key, val));
    }
    parts.retain(|p| !p.is_empty());
    parts.join(", ")
}

fn speed_part(key: &str, val: &Value) -> String {
    match val {
        Value::Number(_) => format!("{key} {} ft.", as_string(val)),
        Value::Mapping(m) => {
            let n = string_at(m, "number");
            let c = string_at(m, "condition");
            match (n.is_empty(), c.is_empty()) {
                (false, false) => format!("{key} {n} ft. {c}"),
                (false, true) => format!("{key} {n} ft."),
                (true, false) => format!("{key} {c}"),
                (true, true) => String::new(),
            }
        }
        other => {
            let s = as_string(other);
            if s.is_empty() { s } else { format!("{key} {s}") }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(yaml: &str) -> Option<CreatureRecord> {
        CreatureRecord::from_raw(0, serde_yaml::from_str(yaml).unwrap())
    }

    #[test]
    fn reads_nested_and_scalar_shapes() {
        let r = record(
            "{name: Ogre, type: {type: giant}, cr: {cr: '2'}, hp: {average: 59, formula: 7d10+21},
              ac: [{ac: 11, from: [hide armor]}], speed: {walk: 40, fly: {number: 30, condition: (hover)}},
              dex: 8}",
        )
        .unwrap();
        assert_eq!(r.kind, "giant");
        assert_eq!(r.challenge, "2");
        assert_eq!(r.hp_average, Some(59));
        assert_eq!(r.hp_formula.as_deref(), Some("7d10+21"));
        assert_eq!(r.ac, "11");
        assert_eq!(r.speed, "walk 40 ft., fly 30 ft. (hover)");
        assert_eq!(r.init_base(), Some(-1));
        assert_eq!(r.abilities, None);
    }

    #[test]
    fn missing_cr_is_unknown_and_nameless_is_skipped() {
        assert_eq!(record("{name: Blob}").unwrap().challenge, "Unknown");
        assert!(record("{cr: 1}").is_none());
    }
}
