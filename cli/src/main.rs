use std::{fs, path::Path, path::PathBuf, sync::Arc};

use anyhow::{bail, Context};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use encoding_rs::Encoding;
use engine::api::{load_config, Catalogs};
use engine::catalog::{Filter, Record};
use engine::persist::FsStore;
use engine::roster::{CustomEntry, Roster};
use engine::rules::{parse_hp_input, parse_init_input};
use engine::treasure::{TreasureKind, TreasureReport};
use engine::{Catalog, CreatureRecord, DiceResult, Session, SessionConfig};
use serde::Serialize;
use tracing::Level;

#[derive(Copy, Clone, ValueEnum)]
enum TurnStep {
    On,
    Off,
    Next,
    Prev,
}

#[derive(Subcommand)]
enum Cmd {
    /// Roll dice expressions, e.g. "1d20c+5 >= 15 : 2d6+3, 1d4x3"
    Roll {
        input: String,
        /// RNG seed for determinism
        #[arg(long)]
        seed: Option<u64>,
        /// Dice log document to append the results to
        #[arg(long)]
        log: Option<PathBuf>,
    },
    /// List catalog monsters matching the filters
    Monsters {
        /// Name substring
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        env: Option<String>,
        /// Source book; repeat for several
        #[arg(long)]
        source: Vec<String>,
        /// Challenge rating, e.g. 1/4
        #[arg(long)]
        cr: Option<String>,
        #[arg(long = "type")]
        kind: Option<String>,
        /// Catalog YAML (defaults to the embedded one)
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
    /// Print a monster's stat block
    Show {
        name: String,
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
    /// Generate treasure for a challenge rating
    Treasure {
        cr: String,
        /// Roll on the hoard tables instead of individual treasure
        #[arg(long, default_value_t = false)]
        hoard: bool,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Edit a saved encounter and print the roster
    Encounter {
        /// Encounter document (defaults to the last one used)
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long)]
        catalog: Option<PathBuf>,
        #[arg(long)]
        seed: Option<u64>,
        #[command(subcommand)]
        action: EncounterAction,
    },
}

#[derive(Subcommand)]
enum EncounterAction {
    /// Print the roster
    List,
    /// Print one entry's stat block
    Show { index: usize },
    /// Add monsters by name
    Add {
        name: String,
        #[arg(long, default_value_t = 1)]
        count: u32,
    },
    /// Add a hand-entered combatant
    Custom {
        name: String,
        /// Initiative modifier, or "roll/modifier"
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        init: String,
        #[arg(long, default_value = "")]
        ac: String,
        /// Hit points, "max" or "current/max"
        #[arg(long, default_value = "0")]
        hp: String,
    },
    Damage { index: usize, amount: i64 },
    Heal { index: usize, amount: i64 },
    /// Roll initiative for one entry
    Init { index: usize },
    /// Roll initiative for every entry that has a modifier
    InitAll,
    /// Switch an entry between average and rolled hit points
    HpMode { index: usize },
    /// Sort by initiative
    Sort,
    Delete { index: usize },
    /// Turn tracking
    Turn {
        #[arg(value_enum)]
        step: TurnStep,
    },
}

#[derive(Parser)]
#[command(name = "lazy5e")]
#[command(about = "Encounter roster, dice roller and treasure tables for 5e sessions")]
struct Cli {
    /// Session config YAML
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Print JSON instead of text
    #[arg(long, global = true, default_value_t = false)]
    json: bool,
    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    cmd: Cmd,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn read_text_auto(path: &Path) -> anyhow::Result<String> {
    let bytes = fs::read(path)?;
    if let Some((enc, bom_len)) = Encoding::for_bom(&bytes) {
        let (cow, _, _) = enc.decode(&bytes[bom_len..]);
        Ok(cow.into_owned())
    } else {
        Ok(String::from_utf8(bytes)?)
    }
}

fn load_monsters(path: &Path) -> anyhow::Result<Catalog<CreatureRecord>> {
    let text = read_text_auto(path)
        .with_context(|| format!("Failed to read catalog file at {}", path.display()))?;
    Catalog::from_yaml(&text)
        .with_context(|| format!("Failed to parse catalog file at {}", path.display()))
}

fn session(
    config: SessionConfig,
    catalog: Option<&Path>,
    seed: Option<u64>,
) -> anyhow::Result<Session> {
    let mut catalogs = Catalogs::builtin()?;
    if let Some(path) = catalog {
        catalogs.monsters = Arc::new(load_monsters(path)?);
    }
    let config = match seed {
        Some(seed) => config.with_seed(seed),
        None => config,
    };
    Ok(Session::new(config, catalogs, Box::new(FsStore::new("."))))
}

fn path_arg(path: &Option<PathBuf>) -> Option<String> {
    path.as_ref().map(|p| p.to_string_lossy().into_owned())
}

#[derive(Serialize)]
struct MonsterRow<'a> {
    id: u32,
    name: &'a str,
    cr: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    source: &'a str,
}

#[derive(Serialize)]
struct TreasureJson<'a> {
    #[serde(flatten)]
    report: &'a TreasureReport,
    gp_equivalent: f64,
}

fn print_rolls(results: &[DiceResult], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(results)?);
    } else {
        for r in results {
            println!("{} => {}", r.expression, r.breakdown);
        }
    }
    Ok(())
}

fn print_roster(roster: &Roster) {
    let turn = roster.turn();
    if let Some(round) = turn.round() {
        println!("Round {round}");
    }
    if roster.is_empty() {
        println!("(no entries)");
        return;
    }
    for (i, e) in roster.entries().iter().enumerate() {
        let marker = if turn.index() == Some(i) { ">" } else { " " };
        let hp = if e.max_hp() > 0 {
            format!("{}/{}", e.current_hp, e.max_hp())
        } else {
            "?".to_string()
        };
        let init = e.init_roll.map_or_else(|| "-".to_string(), |r| r.to_string());
        let ac = roster.ac_text(e);
        let ac = if ac.is_empty() { "?".to_string() } else { ac };
        println!("{marker}[{i}] {}  HP {hp}  AC {ac}  Init {init}", roster.entry_label(e));
    }
}

fn apply(s: &mut Session, action: EncounterAction) -> anyhow::Result<()> {
    match action {
        EncounterAction::List | EncounterAction::Show { .. } => {}
        EncounterAction::Add { name, count } => {
            let id = s
                .roster()
                .catalog()
                .find_by_name(&name)
                .map(|r| r.id())
                .with_context(|| format!("no monster named {name:?}"))?;
            for _ in 0..count.max(1) {
                s.roster_mut().add_from_catalog(id)?;
            }
        }
        EncounterAction::Custom { name, init, ac, hp } => {
            let Some((init_roll, init_base)) = parse_init_input(&init) else {
                bail!("initiative must be a number or roll/modifier, got {init:?}");
            };
            let Some((current_hp, max_hp)) = parse_hp_input(&hp) else {
                bail!("hp must be max or current/max, got {hp:?}");
            };
            s.roster_mut().add_custom(CustomEntry {
                name,
                init_base,
                ac_text: ac,
                max_hp,
                current_hp,
                init_roll,
            });
        }
        EncounterAction::Damage { index, amount } => {
            s.roster_mut().damage_at(index, amount)?;
        }
        EncounterAction::Heal { index, amount } => {
            s.roster_mut().heal_at(index, amount)?;
        }
        EncounterAction::Init { index } => {
            s.roll_init_at(index)?;
        }
        EncounterAction::InitAll => {
            s.roll_init_all()?;
        }
        EncounterAction::HpMode { index } => {
            s.toggle_hp_mode_at(index)?;
        }
        EncounterAction::Sort => s.roster_mut().sort_by_initiative(),
        EncounterAction::Delete { index } => {
            s.roster_mut().delete_at(index)?;
        }
        EncounterAction::Turn { step } => {
            let roster = s.roster_mut();
            match step {
                TurnStep::On if !roster.turn().is_on() => {
                    roster.toggle_turn_mode();
                }
                TurnStep::Off if roster.turn().is_on() => {
                    roster.toggle_turn_mode();
                }
                TurnStep::On | TurnStep::Off => {}
                TurnStep::Next => {
                    roster.next_turn();
                }
                TurnStep::Prev => {
                    roster.prev_turn();
                }
            }
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => SessionConfig::default(),
    };

    match cli.cmd {
        Cmd::Roll { input, seed, log } => {
            let mut s = session(config, None, seed)?;
            let log = path_arg(&log);
            if log.is_some() {
                s.load_dice(log.as_deref())?;
            }
            let results = s.roll_input(&input)?;
            print_rolls(&results, cli.json)?;
            if log.is_some() {
                s.save_dice(log.as_deref())?;
            }
        }
        Cmd::Monsters { name, env, source, cr, kind, catalog } => {
            let monsters = match &catalog {
                Some(path) => load_monsters(path)?,
                None => engine::content::builtin_monsters()?,
            };
            let filter = Filter {
                name: name.unwrap_or_default(),
                env: env.unwrap_or_default(),
                sources: source,
                rank: cr.unwrap_or_default(),
                kind: kind.unwrap_or_default(),
            };
            let found = monsters.filter(&filter);
            if cli.json {
                let rows: Vec<MonsterRow> = found
                    .iter()
                    .map(|m| MonsterRow {
                        id: m.id(),
                        name: m.name(),
                        cr: m.rank(),
                        kind: m.kind(),
                        source: m.source(),
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                for m in &found {
                    println!("{}  CR {}  {}  {}", m.name(), m.rank(), m.kind(), m.source());
                }
                println!("{} of {} monsters", found.len(), monsters.len());
            }
        }
        Cmd::Show { name, catalog } => {
            let monsters = match &catalog {
                Some(path) => load_monsters(path)?,
                None => engine::content::builtin_monsters()?,
            };
            let Some(m) = monsters.find_by_name(&name) else {
                bail!("no monster named {name:?}");
            };
            println!("{}", m.describe());
        }
        Cmd::Treasure { cr, hoard, seed } => {
            let mut s = session(config, None, seed)?;
            let kind = if hoard { TreasureKind::Hoard } else { TreasureKind::Individual };
            let report = s.treasure(&cr, kind)?;
            if cli.json {
                let doc = TreasureJson { report: &report, gp_equivalent: report.gp_equivalent() };
                println!("{}", serde_json::to_string_pretty(&doc)?);
            } else {
                println!("{}", report.render());
            }
        }
        Cmd::Encounter { file, catalog, seed, action } => {
            let mut s = session(config, catalog.as_deref(), seed)?;
            let file = path_arg(&file);
            let name = s.load_encounters(file.as_deref())?;
            if let EncounterAction::Show { index } = action {
                let Some(text) = s.roster().describe_entry(index) else {
                    bail!("no entry at index {index}");
                };
                println!("{text}");
                return Ok(());
            }
            let changed = !matches!(action, EncounterAction::List);
            apply(&mut s, action)?;
            if changed {
                s.save_encounters(Some(name.as_str()))
                    .with_context(|| format!("Failed to save encounter to {name}"))?;
            }
            print_roster(s.roster());
        }
    }
    Ok(())
}
