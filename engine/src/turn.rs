//! Turn tracking over the roster: an active index plus a round counter.
//!
//! The state machine knows nothing about entries beyond the roster length
//! and each entry's initiative; the roster feeds those in and calls the
//! `on_delete` / `on_sort` hooks after reshaping itself.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnState {
    #[default]
    Off,
    On { index: usize, round: u32 },
}

impl TurnState {
    pub fn is_on(&self) -> bool {
        matches!(self, TurnState::On { .. })
    }

    pub fn index(&self) -> Option<usize> {
        match *self {
            TurnState::On { index, .. } => Some(index),
            TurnState::Off => None,
        }
    }

    pub fn round(&self) -> Option<u32> {
        match *self {
            TurnState::On { round, .. } => Some(round),
            TurnState::Off => None,
        }
    }

    /// Start at the highest initiative (first one wins ties, 0 when none is
    /// known). No-op on an empty roster.
    pub fn enable(&mut self, initiative: &[Option<i32>]) {
        if initiative.is_empty() {
            return;
        }
        let mut best: Option<(usize, i32)> = None;
        for (i, value) in initiative.iter().enumerate() {
            if let Some(v) = *value {
                if best.is_none_or(|(_, b)| v > b) {
                    best = Some((i, v));
                }
            }
        }
        *self = TurnState::On { index: best.map_or(0, |(i, _)| i), round: 1 };
    }

    pub fn disable(&mut self) {
        *self = TurnState::Off;
    }

    pub fn next(&mut self, len: usize) {
        if let TurnState::On { index, round } = self {
            if len == 0 {
                return;
            }
            if *index + 1 >= len {
                *index = 0;
                *round += 1;
            } else {
                *index += 1;
            }
        }
    }

    pub fn prev(&mut self, len: usize) {
        if let TurnState::On { index, round } = self {
            if len == 0 {
                return;
            }
            if *index == 0 {
                *index = len - 1;
                *round = round.saturating_sub(1).max(1);
            } else {
                *index -= 1;
            }
        }
    }

    /// Entry `removed` is gone; `len` is the new roster length.
    pub fn on_delete(&mut self, removed: usize, len: usize) {
        let TurnState::On { index, .. } = self else {
            return;
        };
        if len == 0 {
            *self = TurnState::Off;
            return;
        }
        if removed < *index {
            *index -= 1;
        }
        if *index >= len {
            *index = 0;
        }
    }

    /// `new_index` is where the active entry landed after a reorder.
    pub fn on_sort(&mut self, new_index: usize) {
        if let TurnState::On { index, .. } = self {
            *index = new_index;
        }
    }

    /// Bring a loaded state back into range for a roster of `len` entries.
    pub fn clamped(self, len: usize) -> Self {
        match self {
            TurnState::On { .. } if len == 0 => TurnState::Off,
            TurnState::On { index, round } => TurnState::On {
                index: index.min(len - 1),
                round: round.max(1),
            },
            TurnState::Off => TurnState::Off,
        }
    }
}
