use serde_yaml::{Mapping, Value};

use super::value::{as_string, get, string_at};
use super::{describe, Record, UNKNOWN};

#[derive(Debug, Clone, PartialEq)]
pub struct SpellRecord {
    pub id: u32,
    pub name: String,
    pub source: String,
    /// `"0"` for cantrips.
    pub level: String,
    pub school: String,
    pub environments: Vec<String>,
    pub raw: Mapping,
}

impl Record for SpellRecord {
    const KEY: &'static str = "spells";
    const NUMERIC_RANK: bool = true;

    fn from_raw(id: u32, raw: Mapping) -> Option<Self> {
        let name = string_at(&raw, "name");
        if name.is_empty() {
            return None;
        }
        let source = string_at(&raw, "source");
        let level = get(&raw, "level")
            .map(level_text)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| UNKNOWN.to_string());
        let school = Some(school_name(&string_at(&raw, "school")))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| UNKNOWN.to_string());

        Some(Self {
            id,
            environments: if source.is_empty() { Vec::new() } else { vec![source.clone()] },
            source,
            level,
            school,
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
        &self.level
    }
    fn kind(&self) -> &str {
        &self.school
    }
    fn environments(&self) -> &[String] {
        &self.environments
    }
    fn raw(&self) -> &Mapping {
        &self.raw
    }
    fn describe(&self) -> String {
        describe::spell(self)
    }
}

fn level_text(v: &Value) -> String {
    match v {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .map(|l| l.to_string())
            .unwrap_or_default(),
        other => as_string(other),
    }
}

/// Expand one-letter school codes; anything else passes through.
pub fn school_name(code: &str) -> String {
    let code = code.trim();
    let name = match code.to_ascii_uppercase().as_str() {
        "A" => "Abjuration",
        "C" => "Conjuration",
        "D" => "Divination",
        "E" => "Enchantment",
        "V" => "Evocation",
        "I" => "Illusion",
        "N" => "Necromancy",
        "T" => "Transmutation",
        _ => code,
    };
    name.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn school_codes_expand() {
        assert_eq!(school_name("v"), "Evocation");
        assert_eq!(school_name("Chronurgy"), "Chronurgy");
    }

    #[test]
    fn cantrip_level_is_zero() {
        let raw = serde_yaml::from_str("{name: Light, level: 0, school: V}").unwrap();
        let spell = SpellRecord::from_raw(0, raw).unwrap();
        assert_eq!(spell.level, "0");
        assert_eq!(spell.school, "Evocation");
    }
}
