use serde_yaml::Mapping;

use super::value::{as_int, as_string, flag, get, scalar_or_field, string_at};
use super::{describe, Record, UNKNOWN};

pub const ITEM_FLAGS: [&str; 9] = [
    "wondrous", "weapon", "armor", "staff", "ring", "potion", "wand", "rod", "scroll",
];

#[derive(Debug, Clone, PartialEq)]
pub struct ItemRecord {
    pub id: u32,
    pub name: String,
    pub source: String,
    pub rarity: String,
    /// `base (flag, flag)`, or `"Unknown"`.
    pub item_type: String,
    pub flags: Vec<&'static str>,
    pub value_cp: Option<i64>,
    pub attunement: Option<String>,
    pub environments: Vec<String>,
    pub raw: Mapping,
}

impl ItemRecord {
    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.contains(&flag)
    }

    /// Listed price, `"2 gp 5 sp"`, when the value is known and positive.
    pub fn price(&self) -> Option<String> {
        self.value_cp.filter(|cp| *cp > 0).map(format_copper)
    }
}

impl Record for ItemRecord {
    const KEY: &'static str = "items";
    const NUMERIC_RANK: bool = false;

    fn from_raw(id: u32, raw: Mapping) -> Option<Self> {
        let name = string_at(&raw, "name");
        if name.is_empty() {
            return None;
        }
        let source = string_at(&raw, "source");
        let rarity = Some(string_at(&raw, "rarity"))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| UNKNOWN.to_string());
        let flags: Vec<&'static str> = ITEM_FLAGS.into_iter().filter(|f| flag(&raw, f)).collect();
        let base = get(&raw, "type").map(|v| scalar_or_field(v, "type")).unwrap_or_default();
        let item_type = match (base.is_empty(), flags.is_empty()) {
            (true, true) => UNKNOWN.to_string(),
            (true, false) => flags.join(", "),
            (false, true) => base,
            (false, false) => format!("{base} ({})", flags.join(", ")),
        };
        let attunement = match get(&raw, "reqAttune") {
            Some(serde_yaml::Value::Bool(true)) => Some("required".to_string()),
            Some(v) => Some(as_string(v)).filter(|s| !s.is_empty()),
            None => None,
        };

        Some(Self {
            id,
            environments: if source.is_empty() { Vec::new() } else { vec![source.clone()] },
            source,
            rarity,
            item_type,
            flags,
            value_cp: get(&raw, "value").and_then(as_int),
            attunement,
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
        &self.rarity
    }
    fn kind(&self) -> &str {
        &self.item_type
    }
    fn environments(&self) -> &[String] {
        &self.environments
    }
    fn raw(&self) -> &Mapping {
        &self.raw
    }
    fn describe(&self) -> String {
        describe::item(self)
    }
}

/// Split copper into pp/gp/sp/cp, largest first, zero parts omitted.
pub fn format_copper(cp: i64) -> String {
    if cp <= 0 {
        return "0 cp".to_string();
    }
    let parts = [(cp / 1000, "pp"), (cp % 1000 / 100, "gp"), (cp % 100 / 10, "sp"), (cp % 10, "cp")];
    parts
        .iter()
        .filter(|(n, _)| *n > 0)
        .map(|(n, unit)| format!("{n} {unit}"))
        .collect::<Vec<_>>()
        .join(" ")
}
