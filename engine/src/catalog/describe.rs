//! Plain-text stat blocks built from a record's raw attribute map.

use std::fmt::Write as _;

use serde_yaml::{Mapping, Value};

use super::value::{as_string, get, plain};
use super::{CreatureRecord, ItemRecord, SpellRecord};
use crate::rules::ability_mod;

const FIELDS: [(&str, &str); 8] = [
    ("save", "Saving Throws"),
    ("skill", "Skills"),
    ("vulnerable", "Damage Vulnerabilities"),
    ("resist", "Damage Resistances"),
    ("immune", "Damage Immunities"),
    ("conditionImmune", "Condition Immunities"),
    ("senses", "Senses"),
    ("languages", "Languages"),
];

const SECTIONS: [(&str, &str); 6] = [
    ("trait", "Traits"),
    ("action", "Actions"),
    ("bonus", "Bonus Actions"),
    ("reaction", "Reactions"),
    ("legendary", "Legendary Actions"),
    ("mythic", "Mythic Actions"),
];

pub fn creature(m: &CreatureRecord) -> String {
    let raw = &m.raw;
    let mut b = String::new();
    line(&mut b, "Name", &m.name);
    line(&mut b, "Source", &m.source);
    line(&mut b, "Type", &m.kind);
    line(&mut b, "Challenge", &m.challenge);
    line(&mut b, "Alignment", &field(raw, "alignment"));
    line(&mut b, "Armor Class", &m.ac);
    let hp = match (m.hp_average, m.hp_formula.as_deref()) {
        (Some(avg), Some(f)) => format!("{avg} ({f})"),
        (Some(avg), None) => avg.to_string(),
        (None, Some(f)) => f.to_string(),
        (None, None) => String::new(),
    };
    line(&mut b, "Hit Points", &hp);
    line(&mut b, "Speed", &m.speed);
    if let Some(block) = m.abilities.map(ability_block) {
        let _ = write!(b, "\n{block}\n");
    }
    for (key, label) in FIELDS {
        line(&mut b, label, &field(raw, key));
    }
    for (key, label) in SECTIONS {
        let body = get(raw, key).map(section).unwrap_or_default();
        if !body.is_empty() {
            let _ = write!(b, "\n{label}\n{body}\n");
        }
    }
    b.trim().to_string()
}

pub fn item(it: &ItemRecord) -> String {
    let raw = &it.raw;
    let mut b = String::new();
    line(&mut b, "Name", &it.name);
    line(&mut b, "Source", &it.source);
    line(&mut b, "Type", &it.item_type);
    line(&mut b, "Rarity", &it.rarity);
    line(&mut b, "Price", &it.price().unwrap_or_default());
    line(&mut b, "Attunement", it.attunement.as_deref().unwrap_or_default());
    line(&mut b, "Weight", &get(raw, "weight").map(as_string).unwrap_or_default());
    block(&mut b, "Description", &field(raw, "entries"));
    b.trim().to_string()
}

pub fn spell(sp: &SpellRecord) -> String {
    let raw = &sp.raw;
    let mut b = String::new();
    line(&mut b, "Name", &sp.name);
    line(&mut b, "Source", &sp.source);
    line(&mut b, "Level", &sp.level);
    line(&mut b, "School", &sp.school);
    line(&mut b, "Casting Time", &field(raw, "time"));
    line(&mut b, "Range", &field(raw, "range"));
    line(&mut b, "Duration", &field(raw, "duration"));
    line(&mut b, "Components", &field(raw, "components"));
    block(&mut b, "Description", &field(raw, "entries"));
    block(&mut b, "At Higher Levels", &field(raw, "entriesHigherLevel"));
    b.trim().to_string()
}

/// Stat block for a hand-entered roster entry.
pub fn custom(
    name: &str,
    init_base: i32,
    init_roll: Option<i32>,
    ac: &str,
    current_hp: u32,
    max_hp: u32,
) -> String {
    let mut b = String::new();
    let _ = writeln!(b, "Name: {name}");
    let _ = writeln!(b, "Initiative: {init_base}");
    if let Some(roll) = init_roll {
        let _ = writeln!(b, "Initiative Roll: {roll}");
    }
    line(&mut b, "Armor Class", ac);
    if max_hp > 0 {
        let _ = writeln!(b, "Hit Points: {current_hp}/{max_hp}");
    } else {
        b.push_str("Hit Points: ?\n");
    }
    b.trim().to_string()
}

fn line(b: &mut String, label: &str, value: &str) {
    let value = value.trim();
    if !value.is_empty() {
        let _ = writeln!(b, "{label}: {value}");
    }
}

fn block(b: &mut String, title: &str, body: &str) {
    if !body.is_empty() {
        let _ = write!(b, "\n{title}\n{body}\n");
    }
}

fn field(raw: &Mapping, key: &str) -> String {
    get(raw, key).map(plain).unwrap_or_default()
}

fn ability_block(scores: [i32; 6]) -> String {
    let cells: Vec<String> = scores
        .iter()
        .map(|&v| format!("{v:>2} ({:+})", ability_mod(i64::from(v))))
        .collect();
    format!("STR  DEX  CON  INT  WIS  CHA\n{}", cells.join("  "))
}

/// Named entries (`{name, entries}`) one per line as `Name. body`.
fn section(v: &Value) -> String {
    let Value::Sequence(items) = v else {
        return String::new();
    };
    items
        .iter()
        .map(|it| match it {
            Value::Mapping(m) => {
                let name = get(m, "name").map(as_string).unwrap_or_default();
                let body = field(m, "entries");
                match (name.is_empty(), body.is_empty()) {
                    (false, false) => format!("{name}. {body}"),
                    (false, true) => name,
                    _ => body,
                }
            }
            other => plain(other),
        })
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
