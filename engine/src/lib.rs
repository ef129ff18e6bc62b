use std::collections::VecDeque;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub mod api;
pub mod catalog;
pub mod config;
pub mod content;
pub mod dice_log;
pub mod error;
pub mod expr;
pub mod persist;
pub mod roster;
pub mod rules;
pub mod treasure;
pub mod turn;
pub mod undo;

pub use api::{Catalogs, Session};
pub use catalog::{Catalog, CreatureRecord, ItemRecord, SpellRecord};
pub use config::SessionConfig;
pub use dice_log::{DiceLog, DiceResult};
pub use error::{CatalogError, DiceError, PersistError, RosterError, TreasureError};
pub use expr::{Expression, RollOutcome};
pub use roster::{EncounterEntry, EntrySource, Roster};
pub use turn::TurnState;
pub use undo::{HistoryStep, UndoStack};

/// Uniform integer source: `rand_int(n)` returns a value in `0..n`.
pub trait RandomSource {
    fn rand_int(&mut self, n: u32) -> u32;

    /// One face of an `S`-sided die, `1..=S`.
    fn die(&mut self, sides: u32) -> u32 {
        self.rand_int(sides.max(1)) + 1
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum AdMode {
    #[default]
    Normal,
    Advantage,
    Disadvantage,
}

impl AdMode {
    /// Pick the kept face out of a pair rolled under this mode.
    pub fn choose(self, a: u32, b: u32) -> u32 {
        match self {
            AdMode::Normal => a,
            AdMode::Advantage => a.max(b),
            AdMode::Disadvantage => a.min(b),
        }
    }
}

enum Source {
    Seeded(ChaCha8Rng),
    Scripted(VecDeque<u32>),
}

/// The engine's random source: a seeded ChaCha stream, or a fixed script of
/// die faces for deterministic tests.
pub struct Dice {
    source: Source,
}

impl Dice {
    pub fn from_seed(seed: u64) -> Self {
        Self { source: Source::Seeded(ChaCha8Rng::seed_from_u64(seed)) }
    }

    /// Replay `faces` in order. A face `f` drawn for an `n`-sided roll yields
    /// `f - 1` wrapped into `0..n`; an exhausted script yields 0.
    pub fn from_scripted(faces: Vec<u32>) -> Self {
        Self { source: Source::Scripted(faces.into()) }
    }
}

impl RandomSource for Dice {
    fn rand_int(&mut self, n: u32) -> u32 {
        let n = n.max(1);
        match &mut self.source {
            Source::Seeded(rng) => rng.gen_range(0..n),
            Source::Scripted(faces) => match faces.pop_front() {
                Some(face) => face.saturating_sub(1) % n,
                None => 0,
            },
        }
    }
}
