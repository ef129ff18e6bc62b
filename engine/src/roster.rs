//! The live encounter: catalog-backed and custom entries with HP, initiative
//! and turn tracking. Every mutation records an undo snapshot first, and only
//! once it is known to succeed.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::catalog::{describe, Catalog, CreatureRecord, Record};
use crate::error::RosterError;
use crate::rules::{clamp_hp, roll_hp_formula};
use crate::turn::TurnState;
use crate::undo::{HistoryStep, UndoStack};
use crate::RandomSource;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntrySource {
    Catalog { record_id: u32 },
    Custom { name: String, init_base: i32, ac_text: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncounterEntry {
    pub source: EntrySource,
    pub ordinal: u32,
    /// 0 when unknown.
    pub base_hp: u32,
    pub current_hp: u32,
    pub hp_formula: Option<String>,
    pub use_rolled_hp: bool,
    pub rolled_hp: u32,
    pub init_roll: Option<i32>,
}

impl EncounterEntry {
    pub fn max_hp(&self) -> u32 {
        if self.use_rolled_hp && self.rolled_hp > 0 {
            self.rolled_hp
        } else {
            self.base_hp
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self.source, EntrySource::Custom { .. })
    }

    fn clamp_current(&mut self) {
        self.current_hp = clamp_hp(i64::from(self.current_hp), self.max_hp());
    }
}

/// Input for [`Roster::add_custom`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomEntry {
    pub name: String,
    pub init_base: i32,
    pub ac_text: String,
    pub max_hp: u32,
    pub current_hp: u32,
    pub init_roll: Option<i32>,
}

/// Everything an undo snapshot captures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterState {
    pub entries: Vec<EncounterEntry>,
    /// Last ordinal issued per catalog record.
    pub serial: BTreeMap<u32, u32>,
    pub selected: Option<usize>,
    pub turn: TurnState,
}

pub struct Roster {
    catalog: Arc<Catalog<CreatureRecord>>,
    state: RosterState,
    history: UndoStack<RosterState>,
}

impl Roster {
    pub fn new(catalog: Arc<Catalog<CreatureRecord>>) -> Self {
        Self { catalog, state: RosterState::default(), history: UndoStack::new() }
    }

    pub fn catalog(&self) -> &Catalog<CreatureRecord> {
        &self.catalog
    }

    pub fn state(&self) -> &RosterState {
        &self.state
    }

    pub fn entries(&self) -> &[EncounterEntry] {
        &self.state.entries
    }

    pub fn len(&self) -> usize {
        self.state.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.entries.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<&EncounterEntry> {
        self.state.entries.get(i)
    }

    pub fn selected(&self) -> Option<usize> {
        self.state.selected
    }

    pub fn turn(&self) -> TurnState {
        self.state.turn
    }

    /// View state; not recorded in history.
    pub fn select(&mut self, i: usize) -> bool {
        if i < self.len() {
            self.state.selected = Some(i);
            true
        } else {
            false
        }
    }

    /// Replace the whole state (after a load). History is dropped.
    pub fn replace_state(&mut self, state: RosterState) {
        self.state = state;
        self.history.clear();
    }

    pub fn undo(&mut self) -> HistoryStep {
        self.history.undo(&mut self.state)
    }

    pub fn redo(&mut self) -> HistoryStep {
        self.history.redo(&mut self.state)
    }

    // --- queries ---

    pub fn record(&self, e: &EncounterEntry) -> Option<&CreatureRecord> {
        match e.source {
            EntrySource::Catalog { record_id } => self.catalog.by_id(record_id),
            EntrySource::Custom { .. } => None,
        }
    }

    pub fn entry_name(&self, e: &EncounterEntry) -> String {
        match &e.source {
            EntrySource::Custom { name, .. } if name.trim().is_empty() => "Custom".to_string(),
            EntrySource::Custom { name, .. } => name.clone(),
            EntrySource::Catalog { .. } => self
                .record(e)
                .map(|r| r.name.clone())
                .unwrap_or_else(|| "Unknown".to_string()),
        }
    }

    /// `"Goblin #2"` for catalog entries, the bare name for custom ones.
    pub fn entry_label(&self, e: &EncounterEntry) -> String {
        let name = self.entry_name(e);
        if e.is_custom() { name } else { format!("{name} #{}", e.ordinal) }
    }

    pub fn init_base(&self, e: &EncounterEntry) -> Option<i32> {
        match &e.source {
            EntrySource::Custom { init_base, .. } => Some(*init_base),
            EntrySource::Catalog { .. } => self.record(e).and_then(CreatureRecord::init_base),
        }
    }

    pub fn ac_text(&self, e: &EncounterEntry) -> String {
        match &e.source {
            EntrySource::Custom { ac_text, .. } => ac_text.clone(),
            EntrySource::Catalog { .. } => self.record(e).map(|r| r.ac.clone()).unwrap_or_default(),
        }
    }

    pub fn describe_entry(&self, i: usize) -> Option<String> {
        let e = self.get(i)?;
        Some(match &e.source {
            EntrySource::Custom { name, init_base, ac_text } => {
                describe::custom(name, *init_base, e.init_roll, ac_text, e.current_hp, e.max_hp())
            }
            EntrySource::Catalog { .. } => self.record(e)?.describe(),
        })
    }

    // --- mutations ---

    pub fn add_from_catalog(&mut self, record_id: u32) -> Result<usize, RosterError> {
        let record = self.catalog.by_id(record_id).ok_or(RosterError::UnknownRecord(record_id))?;
        let base_hp = record.hp_average.unwrap_or(0);
        let hp_formula = record.hp_formula.clone();
        let name = record.name.clone();

        self.checkpoint();
        let serial = self.state.serial.entry(record_id).or_insert(0);
        *serial += 1;
        let ordinal = *serial;
        self.state.entries.push(EncounterEntry {
            source: EntrySource::Catalog { record_id },
            ordinal,
            base_hp,
            current_hp: base_hp,
            hp_formula,
            use_rolled_hp: false,
            rolled_hp: 0,
            init_roll: None,
        });
        let index = self.len() - 1;
        self.state.selected = Some(index);
        debug!(%name, ordinal, "added catalog entry");
        Ok(index)
    }

    pub fn add_custom(&mut self, input: CustomEntry) -> usize {
        self.checkpoint();
        let ordinal = next_custom_ordinal(&self.state.entries, &input.name);
        let mut entry = EncounterEntry {
            source: EntrySource::Custom {
                name: input.name,
                init_base: input.init_base,
                ac_text: input.ac_text,
            },
            ordinal,
            base_hp: input.max_hp,
            current_hp: input.current_hp,
            hp_formula: None,
            use_rolled_hp: false,
            rolled_hp: 0,
            init_roll: input.init_roll,
        };
        entry.clamp_current();
        self.state.entries.push(entry);
        let index = self.len() - 1;
        self.state.selected = Some(index);
        debug!(ordinal, "added custom entry");
        index
    }

    pub fn delete_at(&mut self, i: usize) -> Result<EncounterEntry, RosterError> {
        self.check_index(i)?;
        self.checkpoint();
        let removed = self.state.entries.remove(i);
        let len = self.len();
        self.state.turn.on_delete(i, len);
        self.state.selected = match self.state.selected {
            _ if len == 0 => None,
            Some(s) if s > i => Some(s - 1),
            Some(s) => Some(s.min(len - 1)),
            None => None,
        };
        debug!(index = i, remaining = len, "deleted entry");
        Ok(removed)
    }

    pub fn damage_at(&mut self, i: usize, amount: i64) -> Result<u32, RosterError> {
        self.adjust_hp(i, amount, -1)
    }

    pub fn heal_at(&mut self, i: usize, amount: i64) -> Result<u32, RosterError> {
        self.adjust_hp(i, amount, 1)
    }

    fn adjust_hp(&mut self, i: usize, amount: i64, sign: i64) -> Result<u32, RosterError> {
        let e = self.check_index(i)?;
        if amount <= 0 {
            return Err(RosterError::InvalidAmount(amount));
        }
        let max = e.max_hp();
        if max == 0 {
            return Err(RosterError::HpUnavailable(self.entry_label(e)));
        }
        let current = i64::from(e.current_hp);

        self.checkpoint();
        let e = &mut self.state.entries[i];
        e.current_hp = clamp_hp(current.saturating_add(sign * amount), max);
        debug!(index = i, current = e.current_hp, max, "hp adjusted");
        Ok(e.current_hp)
    }

    /// `d20 + init_base`, stored on the entry.
    pub fn roll_init_at<R: RandomSource + ?Sized>(
        &mut self,
        i: usize,
        rng: &mut R,
    ) -> Result<i32, RosterError> {
        let e = self.check_index(i)?;
        let base = self
            .init_base(e)
            .ok_or_else(|| RosterError::InitUnavailable(self.entry_label(e)))?;
        self.checkpoint();
        let roll = base.saturating_add(rng.die(20) as i32);
        self.state.entries[i].init_roll = Some(roll);
        debug!(index = i, roll, base, "initiative rolled");
        Ok(roll)
    }

    /// Roll for every entry with a known initiative modifier; returns how many.
    pub fn roll_init_all<R: RandomSource + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Result<usize, RosterError> {
        let bases: Vec<Option<i32>> = self.entries().iter().map(|e| self.init_base(e)).collect();
        let count = bases.iter().flatten().count();
        if count == 0 {
            return Err(RosterError::InitUnavailable("encounter".to_string()));
        }
        self.checkpoint();
        for (e, base) in self.state.entries.iter_mut().zip(bases) {
            if let Some(base) = base {
                e.init_roll = Some(base.saturating_add(rng.die(20) as i32));
            }
        }
        debug!(count, "initiative rolled for all");
        Ok(count)
    }

    /// Switch between average and rolled HP; returns the new max.
    pub fn toggle_hp_mode_at<R: RandomSource + ?Sized>(
        &mut self,
        i: usize,
        rng: &mut R,
    ) -> Result<u32, RosterError> {
        let e = self.check_index(i)?;
        if e.use_rolled_hp {
            self.checkpoint();
            let e = &mut self.state.entries[i];
            e.use_rolled_hp = false;
            e.rolled_hp = 0;
            e.clamp_current();
            return Ok(e.max_hp());
        }

        let formula = e.hp_formula.clone().unwrap_or_default();
        let rolled = roll_hp_formula(&formula, rng)
            .filter(|hp| *hp > 0)
            .ok_or(RosterError::FormulaUnsupported(formula))?;
        self.checkpoint();
        let e = &mut self.state.entries[i];
        e.use_rolled_hp = true;
        e.rolled_hp = rolled;
        e.clamp_current();
        debug!(index = i, rolled, "hp mode -> rolled");
        Ok(rolled)
    }

    /// Stable sort by initiative. Selection and the active turn follow their
    /// entries.
    pub fn sort_by_initiative(&mut self) {
        if self.len() < 2 {
            return;
        }
        let keys: Vec<SortKey> = self
            .entries()
            .iter()
            .map(|e| SortKey {
                init_roll: e.init_roll,
                init_base: self.init_base(e),
                name: self.entry_name(e).to_lowercase(),
                ordinal: e.ordinal,
            })
            .collect();
        let mut order: Vec<usize> = (0..keys.len()).collect();
        order.sort_by(|&a, &b| keys[a].cmp_initiative(&keys[b]));

        let new_pos = |old: usize| order.iter().position(|&o| o == old);
        let selected = self.state.selected.and_then(new_pos);
        let active = self.state.turn.index().and_then(new_pos);

        self.checkpoint();
        let mut old: Vec<Option<EncounterEntry>> =
            std::mem::take(&mut self.state.entries).into_iter().map(Some).collect();
        self.state.entries = order.iter().filter_map(|&i| old[i].take()).collect();
        self.state.selected = selected.or(self.state.selected);
        if let Some(idx) = active {
            self.state.turn.on_sort(idx);
        }
        debug!(entries = self.len(), "sorted by initiative");
    }

    /// Turn mode on/off. A no-op on an empty roster.
    pub fn toggle_turn_mode(&mut self) -> TurnState {
        if self.is_empty() {
            return self.state.turn;
        }
        self.checkpoint();
        if self.state.turn.is_on() {
            self.state.turn.disable();
        } else {
            let initiative: Vec<Option<i32>> = self
                .entries()
                .iter()
                .map(|e| e.init_roll.or_else(|| self.init_base(e)))
                .collect();
            self.state.turn.enable(&initiative);
            self.state.selected = self.state.turn.index();
        }
        self.state.turn
    }

    pub fn next_turn(&mut self) -> TurnState {
        self.step_turn(TurnState::next)
    }

    pub fn prev_turn(&mut self) -> TurnState {
        self.step_turn(TurnState::prev)
    }

    fn step_turn(&mut self, step: fn(&mut TurnState, usize)) -> TurnState {
        if !self.state.turn.is_on() || self.is_empty() {
            return self.state.turn;
        }
        self.checkpoint();
        let len = self.len();
        step(&mut self.state.turn, len);
        self.state.selected = self.state.turn.index();
        self.state.turn
    }

    fn check_index(&self, i: usize) -> Result<&EncounterEntry, RosterError> {
        self.state.entries.get(i).ok_or(RosterError::NoEntry(i))
    }

    fn checkpoint(&mut self) {
        self.history.push(self.state.clone());
    }
}

/// Highest ordinal among custom entries with the same trimmed, case-folded
/// name, plus one.
pub(crate) fn next_custom_ordinal(entries: &[EncounterEntry], name: &str) -> u32 {
    let key = name.trim().to_lowercase();
    entries
        .iter()
        .filter_map(|e| match &e.source {
            EntrySource::Custom { name, .. } if name.trim().to_lowercase() == key => Some(e.ordinal),
            _ => None,
        })
        .max()
        .unwrap_or(0)
        + 1
}

struct SortKey {
    init_roll: Option<i32>,
    init_base: Option<i32>,
    name: String,
    ordinal: u32,
}

impl SortKey {
    /// Rolled first (highest first), then known modifier (highest first),
    /// then name and ordinal ascending.
    fn cmp_initiative(&self, other: &Self) -> Ordering {
        fn present_desc(a: Option<i32>, b: Option<i32>) -> Ordering {
            match (a, b) {
                (Some(x), Some(y)) => y.cmp(&x),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        }
        present_desc(self.init_roll, other.init_roll)
            .then_with(|| present_desc(self.init_base, other.init_base))
            .then_with(|| self.name.cmp(&other.name))
            .then_with(|| self.ordinal.cmp(&other.ordinal))
    }
}
