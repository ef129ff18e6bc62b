//! Saved documents: the encounter (roster + turn), the dice log, catalog
//! filter state, and sidecar files remembering the last path used.
//!
//! Everything goes through a [`Store`] of named byte blobs. A missing blob
//! reads as an empty document.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, CreatureRecord, Filter};
use crate::dice_log::{DiceResult, DICE_LOG_CAPACITY};
use crate::error::PersistError;
use crate::roster::{next_custom_ordinal, EncounterEntry, EntrySource, RosterState};
use crate::rules::clamp_hp;
use crate::turn::TurnState;

pub const DOC_VERSION: u32 = 1;

/// Named byte blobs. Neither side interprets the bytes.
pub trait Store {
    /// `Ok(None)` when the blob does not exist.
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>, PersistError>;
    fn write(&mut self, name: &str, bytes: &[u8]) -> Result<(), PersistError>;
}

/// Files under a root directory; absolute names bypass the root.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl Store for FsStore {
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>, PersistError> {
        match fs::read(self.path(name)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(PersistError::Io { name: name.to_string(), source }),
        }
    }

    fn write(&mut self, name: &str, bytes: &[u8]) -> Result<(), PersistError> {
        let path = self.path(name);
        let io = |source| PersistError::Io { name: name.to_string(), source };
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(io)?;
        }
        fs::write(&path, bytes).map_err(io)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    blobs: HashMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.blobs.insert(name.into(), bytes.into());
    }

    pub fn text(&self, name: &str) -> Option<String> {
        self.blobs.get(name).map(|b| String::from_utf8_lossy(b).into_owned())
    }
}

impl Store for MemoryStore {
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>, PersistError> {
        Ok(self.blobs.get(name).cloned())
    }

    fn write(&mut self, name: &str, bytes: &[u8]) -> Result<(), PersistError> {
        self.blobs.insert(name.to_string(), bytes.to_vec());
        Ok(())
    }
}

fn is_default<T: Default + PartialEq>(v: &T) -> bool {
    *v == T::default()
}

pub fn read_yaml<T: DeserializeOwned>(
    store: &dyn Store,
    name: &str,
) -> Result<Option<T>, PersistError> {
    let Some(bytes) = store.read(name)? else {
        return Ok(None);
    };
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_yaml::from_slice(&bytes)
        .map(Some)
        .map_err(|source| PersistError::Yaml { name: name.to_string(), source })
}

pub fn write_yaml<T: Serialize>(
    store: &mut dyn Store,
    name: &str,
    doc: &T,
) -> Result<(), PersistError> {
    let text = serde_yaml::to_string(doc)
        .map_err(|source| PersistError::Yaml { name: name.to_string(), source })?;
    store.write(name, text.as_bytes())
}

// --- encounters ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EncountersDoc {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub items: Vec<EncounterItem>,
    #[serde(default, skip_serializing_if = "is_default")]
    pub turn_mode: bool,
    #[serde(default, skip_serializing_if = "is_default")]
    pub turn_index: i64,
    #[serde(default, skip_serializing_if = "is_default")]
    pub turn_round: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncounterItem {
    pub monster_id: i64,
    pub ordinal: i64,
    #[serde(skip_serializing_if = "is_default")]
    pub custom: bool,
    #[serde(skip_serializing_if = "is_default")]
    pub custom_name: String,
    #[serde(skip_serializing_if = "is_default")]
    pub custom_init: i32,
    #[serde(skip_serializing_if = "is_default")]
    pub custom_ac: String,
    pub base_hp: i64,
    pub current_hp: i64,
    #[serde(skip_serializing_if = "is_default")]
    pub hp_formula: String,
    #[serde(skip_serializing_if = "is_default")]
    pub use_rolled: bool,
    #[serde(skip_serializing_if = "is_default")]
    pub rolled_hp: i64,
    #[serde(skip_serializing_if = "is_default")]
    pub init_rolled: bool,
    #[serde(skip_serializing_if = "is_default")]
    pub init_roll: i32,
}

impl EncountersDoc {
    pub fn from_state(state: &RosterState) -> Self {
        let items = state
            .entries
            .iter()
            .map(|e| {
                let mut item = EncounterItem {
                    ordinal: i64::from(e.ordinal),
                    base_hp: i64::from(e.base_hp),
                    current_hp: i64::from(e.current_hp),
                    hp_formula: e.hp_formula.clone().unwrap_or_default(),
                    use_rolled: e.use_rolled_hp,
                    rolled_hp: i64::from(e.rolled_hp),
                    init_rolled: e.init_roll.is_some(),
                    init_roll: e.init_roll.unwrap_or(0),
                    ..EncounterItem::default()
                };
                match &e.source {
                    EntrySource::Catalog { record_id } => item.monster_id = i64::from(*record_id),
                    EntrySource::Custom { name, init_base, ac_text } => {
                        item.custom = true;
                        item.custom_name = name.clone();
                        item.custom_init = *init_base;
                        item.custom_ac = ac_text.clone();
                    }
                }
                item
            })
            .collect();

        let (turn_mode, turn_index, turn_round) = match state.turn {
            TurnState::On { index, round } => (true, index as i64, i64::from(round)),
            TurnState::Off => (false, 0, 0),
        };
        Self { version: DOC_VERSION, items, turn_mode, turn_index, turn_round }
    }

    /// Rebuild roster state against `catalog`. Items whose record is gone are
    /// dropped; missing ordinals and HP data are re-derived; HP is clamped.
    pub fn into_state(self, catalog: &Catalog<CreatureRecord>) -> RosterState {
        let mut entries: Vec<EncounterEntry> = Vec::with_capacity(self.items.len());
        let mut serial: BTreeMap<u32, u32> = BTreeMap::new();

        for it in self.items {
            let record = if it.custom {
                None
            } else {
                match u32::try_from(it.monster_id).ok().and_then(|id| catalog.by_id(id)) {
                    Some(r) => Some(r),
                    None => {
                        debug!(monster_id = it.monster_id, "dropping item with unknown catalog record");
                        continue;
                    }
                }
            };

            let ordinal = match u32::try_from(it.ordinal).ok().filter(|o| *o > 0) {
                Some(o) => o,
                None if it.custom => next_custom_ordinal(&entries, &it.custom_name),
                None => record.and_then(|r| serial.get(&r.id)).copied().unwrap_or(0) + 1,
            };

            let mut base_hp = u32::try_from(it.base_hp).unwrap_or(0);
            let mut hp_formula = it.hp_formula.trim().to_string();
            if let Some(r) = record {
                if base_hp == 0 {
                    base_hp = r.hp_average.unwrap_or(0);
                }
                if hp_formula.is_empty() {
                    hp_formula = r.hp_formula.clone().unwrap_or_default();
                }
            }

            let source = match record {
                Some(r) => EntrySource::Catalog { record_id: r.id },
                None => EntrySource::Custom {
                    name: it.custom_name,
                    init_base: it.custom_init,
                    ac_text: it.custom_ac,
                },
            };
            let mut entry = EncounterEntry {
                source,
                ordinal,
                base_hp,
                current_hp: 0,
                hp_formula: (!hp_formula.is_empty()).then_some(hp_formula),
                use_rolled_hp: it.use_rolled,
                rolled_hp: u32::try_from(it.rolled_hp).unwrap_or(0),
                init_roll: it.init_rolled.then_some(it.init_roll),
            };
            entry.current_hp = clamp_hp(it.current_hp, entry.max_hp());

            if let EntrySource::Catalog { record_id } = entry.source {
                let last = serial.entry(record_id).or_insert(0);
                *last = (*last).max(ordinal);
            }
            entries.push(entry);
        }

        let turn = if self.turn_mode && !entries.is_empty() {
            let index = usize::try_from(self.turn_index)
                .ok()
                .filter(|i| *i < entries.len())
                .unwrap_or(0);
            let round = u32::try_from(self.turn_round).unwrap_or(0).max(1);
            TurnState::On { index, round }
        } else {
            TurnState::Off
        };

        RosterState { entries, serial, selected: None, turn }
    }
}

pub fn load_encounters(
    store: &dyn Store,
    name: &str,
    catalog: &Catalog<CreatureRecord>,
) -> Result<RosterState, PersistError> {
    let doc: EncountersDoc = read_yaml(store, name)?.unwrap_or_default();
    let state = doc.into_state(catalog);
    info!(name, entries = state.entries.len(), "encounters loaded");
    Ok(state)
}

pub fn save_encounters(
    store: &mut dyn Store,
    name: &str,
    state: &RosterState,
) -> Result<(), PersistError> {
    write_yaml(store, name, &EncountersDoc::from_state(state))?;
    info!(name, entries = state.entries.len(), "encounters saved");
    Ok(())
}

// --- dice log ---

#[derive(Debug, Clone, Serialize)]
struct DiceDocOut<'a> {
    version: u32,
    items: &'a [DiceResult],
}

#[derive(Debug, Clone, Default, Deserialize)]
struct DiceDocIn {
    #[serde(default)]
    items: Vec<DiceItem>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum DiceItem {
    Entry(DiceResult),
    Legacy(String),
}

/// `"[black:gold]1d20+5[-:-] => 1d20(12) + 5 = 17"` -> expression and output.
fn legacy_result(line: &str) -> Option<DiceResult> {
    let text = line.trim();
    if text.is_empty() {
        return None;
    }
    Some(match text.split_once("=>") {
        Some((expr, out)) => DiceResult::new(strip_markup(expr).trim(), strip_markup(out).trim()),
        None => DiceResult::new(text, ""),
    })
}

/// Drop `[fg:bg]`-style color tags.
fn strip_markup(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(open) = rest.find('[') {
        let tail = &rest[open..];
        let tag_end = tail
            .find(']')
            .filter(|&end| {
                let inner = &tail[1..end];
                inner.contains(':') && !inner.contains(char::is_whitespace)
            });
        out.push_str(&rest[..open]);
        match tag_end {
            Some(end) => rest = &tail[end + 1..],
            None => {
                out.push('[');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Load the dice log, accepting the legacy list-of-strings form. Only the
/// newest entries up to the log capacity are kept.
pub fn load_dice(store: &dyn Store, name: &str) -> Result<Vec<DiceResult>, PersistError> {
    let doc: DiceDocIn = read_yaml(store, name)?.unwrap_or_default();
    let mut results: Vec<DiceResult> = doc
        .items
        .into_iter()
        .filter_map(|item| match item {
            DiceItem::Entry(r) => Some(r),
            DiceItem::Legacy(line) => legacy_result(&line),
        })
        .collect();
    let over = results.len().saturating_sub(DICE_LOG_CAPACITY);
    results.drain(..over);
    info!(name, entries = results.len(), "dice log loaded");
    Ok(results)
}

pub fn save_dice(
    store: &mut dyn Store,
    name: &str,
    results: &[DiceResult],
) -> Result<(), PersistError> {
    write_yaml(store, name, &DiceDocOut { version: DOC_VERSION, items: results })?;
    info!(name, entries = results.len(), "dice log saved");
    Ok(())
}

// --- filter state ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BrowseMode {
    #[default]
    Monsters,
    Items,
    Spells,
}

impl BrowseMode {
    pub fn key(self) -> &'static str {
        match self {
            BrowseMode::Monsters => "monsters",
            BrowseMode::Items => "items",
            BrowseMode::Spells => "spells",
        }
    }

    /// Unknown keys fall back to monsters.
    pub fn from_key(key: &str) -> Self {
        match key.trim().to_lowercase().as_str() {
            "items" => BrowseMode::Items,
            "spells" => BrowseMode::Spells,
            _ => BrowseMode::Monsters,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterState {
    pub version: u32,
    #[serde(skip_serializing_if = "is_default")]
    pub active: String,
    #[serde(skip_serializing_if = "is_default")]
    pub monsters: Filter,
    #[serde(skip_serializing_if = "is_default")]
    pub items: Filter,
    #[serde(skip_serializing_if = "is_default")]
    pub spells: Filter,
}

impl FilterState {
    pub fn mode(&self) -> BrowseMode {
        BrowseMode::from_key(&self.active)
    }

    pub fn filter(&self, mode: BrowseMode) -> &Filter {
        match mode {
            BrowseMode::Monsters => &self.monsters,
            BrowseMode::Items => &self.items,
            BrowseMode::Spells => &self.spells,
        }
    }

    pub fn set_filter(&mut self, mode: BrowseMode, filter: Filter) {
        self.active = mode.key().to_string();
        match mode {
            BrowseMode::Monsters => self.monsters = filter,
            BrowseMode::Items => self.items = filter,
            BrowseMode::Spells => self.spells = filter,
        }
    }
}

pub fn load_filters(store: &dyn Store, name: &str) -> Result<FilterState, PersistError> {
    Ok(read_yaml(store, name)?.unwrap_or_default())
}

pub fn save_filters(
    store: &mut dyn Store,
    name: &str,
    state: &FilterState,
) -> Result<(), PersistError> {
    let doc = FilterState { version: DOC_VERSION, ..state.clone() };
    write_yaml(store, name, &doc)
}

// --- sidecars ---

/// Remember `path` in `sidecar`. Failures are logged and ignored.
pub fn write_last_path(store: &mut dyn Store, sidecar: &str, path: &str) {
    let path = path.trim();
    if path.is_empty() {
        return;
    }
    if let Err(err) = store.write(sidecar, format!("{path}\n").as_bytes()) {
        warn!(sidecar, %err, "could not record last path");
    }
}

pub fn read_last_path(store: &dyn Store, sidecar: &str, default: &str) -> String {
    let stored = store
        .read(sidecar)
        .ok()
        .flatten()
        .map(|b| String::from_utf8_lossy(&b).trim().to_string())
        .unwrap_or_default();
    if stored.is_empty() { default.to_string() } else { stored }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markup_is_stripped() {
        assert_eq!(strip_markup("[black:gold]1d20+5[-:-] "), "1d20+5 ");
        assert_eq!(strip_markup("[not a tag] x"), "[not a tag] x");
    }

    #[test]
    fn legacy_line_without_arrow_keeps_text() {
        assert_eq!(legacy_result("  2d6 "), Some(DiceResult::new("2d6", "")));
        assert_eq!(legacy_result("   "), None);
    }
}
