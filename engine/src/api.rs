use std::{fs, path::Path, sync::Arc};

use anyhow::{Context, Result};
use tracing::debug;

use crate::catalog::{Catalog, CreatureRecord, ItemRecord, SpellRecord};
use crate::config::SessionConfig;
use crate::content::{builtin_items, builtin_monsters, builtin_spells};
use crate::dice_log::{DiceLog, DiceResult, DiceSnapshot};
use crate::error::{DiceError, PersistError, RosterError, TreasureError};
use crate::expr::{expand_input, Expression};
use crate::persist::{self, FilterState, Store};
use crate::roster::Roster;
use crate::treasure::{self, TreasureKind, TreasureReport};
use crate::Dice;

/// Catalogs a session browses. Read-only once loaded.
#[derive(Debug, Clone)]
pub struct Catalogs {
    pub monsters: Arc<Catalog<CreatureRecord>>,
    pub items: Arc<Catalog<ItemRecord>>,
    pub spells: Arc<Catalog<SpellRecord>>,
}

impl Catalogs {
    pub fn builtin() -> Result<Self> {
        Ok(Self {
            monsters: Arc::new(builtin_monsters().context("embedded monsters catalog")?),
            items: Arc::new(builtin_items().context("embedded items catalog")?),
            spells: Arc::new(builtin_spells().context("embedded spells catalog")?),
        })
    }
}

/// One table session: the roster, the dice log, their random source and
/// the store documents are saved to.
pub struct Session {
    config: SessionConfig,
    catalogs: Catalogs,
    roster: Roster,
    dice_log: DiceLog,
    dice: Dice,
    store: Box<dyn Store>,
    filters: FilterState,
}

impl Session {
    pub fn new(config: SessionConfig, catalogs: Catalogs, store: Box<dyn Store>) -> Self {
        let dice = Dice::from_seed(config.seed.unwrap_or_else(rand::random));
        Self {
            roster: Roster::new(Arc::clone(&catalogs.monsters)),
            dice_log: DiceLog::new(),
            filters: FilterState::default(),
            config,
            catalogs,
            dice,
            store,
        }
    }

    pub fn with_builtin(config: SessionConfig, store: Box<dyn Store>) -> Result<Self> {
        Ok(Self::new(config, Catalogs::builtin()?, store))
    }

    /// Swap the random source, e.g. for a scripted one in tests.
    pub fn with_dice(mut self, dice: Dice) -> Self {
        self.dice = dice;
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn catalogs(&self) -> &Catalogs {
        &self.catalogs
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn roster_mut(&mut self) -> &mut Roster {
        &mut self.roster
    }

    pub fn dice_log(&self) -> &DiceLog {
        &self.dice_log
    }

    pub fn dice_log_mut(&mut self) -> &mut DiceLog {
        &mut self.dice_log
    }

    pub fn dice(&mut self) -> &mut Dice {
        &mut self.dice
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn filters_mut(&mut self) -> &mut FilterState {
        &mut self.filters
    }

    // --- dice ---

    /// Expand `input` (comma-separated, `xN` batches), roll every expression
    /// and append the results to the log as one undo step. Nothing is rolled
    /// if any expression is malformed.
    pub fn roll_input(&mut self, input: &str) -> Result<Vec<DiceResult>, DiceError> {
        let results = self.roll_all(input)?;
        self.dice_log.append_all(results.clone());
        Ok(results)
    }

    /// Roll the selected log entry again in place.
    pub fn reroll_selected(&mut self) -> Result<Option<DiceResult>, DiceError> {
        let Some(i) = self.dice_log.selected() else {
            return Ok(None);
        };
        let Some(expression) = self.dice_log.get(i).map(|r| r.expression.clone()) else {
            return Ok(None);
        };
        let out = Expression::parse(&expression)?.evaluate(&mut self.dice);
        let result = DiceResult::new(expression, out.breakdown);
        self.dice_log.replace_at(i, result.clone());
        Ok(Some(result))
    }

    /// Replace the selected entry with the rolls of `input`.
    pub fn replay_selected(&mut self, input: &str) -> Result<Option<Vec<DiceResult>>, DiceError> {
        let Some(i) = self.dice_log.selected() else {
            return Ok(None);
        };
        let results = self.roll_all(input)?;
        self.dice_log.splice_at(i, results.clone());
        Ok(Some(results))
    }

    fn roll_all(&mut self, input: &str) -> Result<Vec<DiceResult>, DiceError> {
        let parsed = expand_input(input)?
            .into_iter()
            .map(|src| Expression::parse(&src).map(|e| (src, e)))
            .collect::<Result<Vec<_>, _>>()?;
        let results: Vec<DiceResult> = parsed
            .into_iter()
            .map(|(src, expr)| {
                let out = expr.evaluate(&mut self.dice);
                debug!(expression = %src, total = out.total, "rolled");
                DiceResult::new(src, out.breakdown)
            })
            .collect();
        Ok(results)
    }

    // --- roster shortcuts needing the random source ---

    pub fn roll_init_at(&mut self, i: usize) -> Result<i32, RosterError> {
        self.roster.roll_init_at(i, &mut self.dice)
    }

    pub fn roll_init_all(&mut self) -> Result<usize, RosterError> {
        self.roster.roll_init_all(&mut self.dice)
    }

    pub fn toggle_hp_mode_at(&mut self, i: usize) -> Result<u32, RosterError> {
        self.roster.toggle_hp_mode_at(i, &mut self.dice)
    }

    // --- treasure ---

    pub fn treasure(
        &mut self,
        cr: &str,
        kind: TreasureKind,
    ) -> Result<TreasureReport, TreasureError> {
        treasure::generate(kind, cr, &mut self.dice)
    }

    pub fn sample_items(
        &mut self,
        kinds: &[String],
        count: usize,
    ) -> Result<Vec<&ItemRecord>, TreasureError> {
        treasure::sample_items(&self.catalogs.items, kinds, count, &mut self.dice)
    }

    pub fn sample_spells(
        &mut self,
        level: &str,
        school: &str,
        count: usize,
    ) -> Result<Vec<&SpellRecord>, TreasureError> {
        treasure::sample_spells(&self.catalogs.spells, level, school, count, &mut self.dice)
    }

    // --- documents ---

    /// Document name to load: the explicit path, else the sidecar's, else
    /// the configured default.
    pub fn encounters_path(&self, path: Option<&str>) -> String {
        resolve(
            &*self.store,
            path,
            &self.config.encounters_sidecar,
            &self.config.encounters_path,
        )
    }

    pub fn dice_path(&self, path: Option<&str>) -> String {
        resolve(&*self.store, path, &self.config.dice_sidecar, &self.config.dice_path)
    }

    /// Replace the roster with a saved encounter. Clears roster history.
    pub fn load_encounters(&mut self, path: Option<&str>) -> Result<String, PersistError> {
        let name = self.encounters_path(path);
        let state = persist::load_encounters(&*self.store, &name, &self.catalogs.monsters)?;
        self.roster.replace_state(state);
        Ok(name)
    }

    pub fn save_encounters(&mut self, path: Option<&str>) -> Result<String, PersistError> {
        let name = self.encounters_path(path);
        persist::save_encounters(&mut *self.store, &name, self.roster.state())?;
        persist::write_last_path(&mut *self.store, &self.config.encounters_sidecar, &name);
        Ok(name)
    }

    /// Replace the dice log with a saved one; the newest entry is selected.
    pub fn load_dice(&mut self, path: Option<&str>) -> Result<String, PersistError> {
        let name = self.dice_path(path);
        let entries = persist::load_dice(&*self.store, &name)?;
        let selected = entries.len().checked_sub(1);
        self.dice_log.restore(DiceSnapshot { entries, selected });
        Ok(name)
    }

    pub fn save_dice(&mut self, path: Option<&str>) -> Result<String, PersistError> {
        let name = self.dice_path(path);
        persist::save_dice(&mut *self.store, &name, self.dice_log.entries())?;
        persist::write_last_path(&mut *self.store, &self.config.dice_sidecar, &name);
        Ok(name)
    }

    pub fn load_filters(&mut self) -> Result<&FilterState, PersistError> {
        self.filters = persist::load_filters(&*self.store, &self.config.filters_path)?;
        Ok(&self.filters)
    }

    pub fn save_filters(&mut self) -> Result<(), PersistError> {
        persist::save_filters(&mut *self.store, &self.config.filters_path, &self.filters)
    }
}

fn resolve(store: &dyn Store, path: Option<&str>, sidecar: &str, default: &str) -> String {
    match path.map(str::trim).filter(|p| !p.is_empty()) {
        Some(p) => p.to_string(),
        None => persist::read_last_path(store, sidecar, default),
    }
}

pub fn load_config(path: impl AsRef<Path>) -> Result<SessionConfig> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    SessionConfig::from_yaml(&text)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))
}
