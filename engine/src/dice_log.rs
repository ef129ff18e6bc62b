use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::undo::{HistoryStep, UndoStack};

pub const DICE_LOG_CAPACITY: usize = 100;

/// One evaluated expression, as shown in the log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiceResult {
    pub expression: String,
    #[serde(rename = "output")]
    pub breakdown: String,
}

impl DiceResult {
    pub fn new(expression: impl Into<String>, breakdown: impl Into<String>) -> Self {
        Self { expression: expression.into(), breakdown: breakdown.into() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiceSnapshot {
    pub entries: Vec<DiceResult>,
    pub selected: Option<usize>,
}

/// Bounded roll history with its own undo stack.
#[derive(Debug, Default)]
pub struct DiceLog {
    state: DiceSnapshot,
    history: UndoStack<DiceSnapshot>,
}

impl DiceLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[DiceResult] {
        &self.state.entries
    }

    pub fn len(&self) -> usize {
        self.state.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.entries.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<&DiceResult> {
        self.state.entries.get(i)
    }

    pub fn selected(&self) -> Option<usize> {
        self.state.selected
    }

    /// View state only; never recorded in history.
    pub fn select(&mut self, i: usize) -> bool {
        if i < self.len() {
            self.state.selected = Some(i);
            true
        } else {
            false
        }
    }

    pub fn append(&mut self, result: DiceResult) {
        self.append_all(vec![result]);
    }

    /// Append a whole batch as a single undo step. The newest entry becomes
    /// selected.
    pub fn append_all(&mut self, results: Vec<DiceResult>) {
        if results.is_empty() {
            return;
        }
        self.checkpoint();
        self.state.entries.extend(results);
        self.trim();
        self.state.selected = self.len().checked_sub(1);
    }

    /// Insert `results` before index `i` (`i == len` appends).
    pub fn insert_at(&mut self, i: usize, results: Vec<DiceResult>) -> bool {
        if i > self.len() || results.is_empty() {
            return false;
        }
        self.checkpoint();
        let n = results.len();
        self.state.entries.splice(i..i, results);
        self.state.selected = Some(i + n - 1);
        self.trim();
        true
    }

    pub fn delete_at(&mut self, i: usize) -> Option<DiceResult> {
        if i >= self.len() {
            return None;
        }
        self.checkpoint();
        let removed = self.state.entries.remove(i);
        self.state.selected = match self.state.selected {
            _ if self.state.entries.is_empty() => None,
            Some(s) if s > i => Some(s - 1),
            Some(s) => Some(s.min(self.len() - 1)),
            None => None,
        };
        Some(removed)
    }

    pub fn replace_at(&mut self, i: usize, result: DiceResult) -> bool {
        if i >= self.len() {
            return false;
        }
        self.checkpoint();
        self.state.entries[i] = result;
        true
    }

    /// Replace entry `i` with the first result and insert the rest after it,
    /// as one undo step.
    pub fn splice_at(&mut self, i: usize, mut results: Vec<DiceResult>) -> bool {
        if i >= self.len() || results.is_empty() {
            return false;
        }
        self.checkpoint();
        let rest = results.split_off(1);
        let n = rest.len();
        self.state.entries.splice(i..=i, results.into_iter().chain(rest));
        self.state.selected = Some(i + n);
        self.trim();
        true
    }

    pub fn clear(&mut self) {
        if self.is_empty() {
            return;
        }
        self.checkpoint();
        self.state = DiceSnapshot::default();
    }

    pub fn snapshot(&self) -> DiceSnapshot {
        self.state.clone()
    }

    /// Replace the whole log and forget its history (used by loads).
    pub fn restore(&mut self, snapshot: DiceSnapshot) {
        self.state = snapshot;
        self.trim();
        self.history.clear();
    }

    pub fn undo(&mut self) -> HistoryStep {
        self.history.undo(&mut self.state)
    }

    pub fn redo(&mut self) -> HistoryStep {
        self.history.redo(&mut self.state)
    }

    fn checkpoint(&mut self) {
        self.history.push(self.state.clone());
    }

    fn trim(&mut self) {
        let over = self.len().saturating_sub(DICE_LOG_CAPACITY);
        if over == 0 {
            return;
        }
        debug!(dropped = over, "dice log over capacity");
        self.state.entries.drain(..over);
        self.state.selected = self
            .state
            .selected
            .and_then(|s| s.checked_sub(over))
            .or_else(|| self.len().checked_sub(1).map(|_| 0));
    }
}
