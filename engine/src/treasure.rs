//! 5e treasure: banded individual and hoard tables keyed on CR, plus random
//! picks of catalog items and spells.

use std::fmt::{self, Write as _};

use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use crate::catalog::{rank_value, Catalog, ItemRecord, Record, SpellRecord};
use crate::error::TreasureError;
use crate::RandomSource;

pub const COIN_ORDER: [&str; 5] = ["cp", "sp", "ep", "gp", "pp"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TreasureKind {
    Individual,
    Hoard,
}

impl fmt::Display for TreasureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TreasureKind::Individual => "Individual Treasure",
            TreasureKind::Hoard => "Hoard Treasure",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreasureReport {
    pub kind: TreasureKind,
    pub cr: String,
    pub band: &'static str,
    pub d100: u32,
    /// Always holds all five coins, in `cp sp ep gp pp` order.
    pub coins: IndexMap<String, u64>,
    pub breakdown: Vec<String>,
    pub extras: Vec<String>,
}

impl TreasureReport {
    fn new(kind: TreasureKind, cr: &str, band: &'static str, d100: u32) -> Self {
        Self {
            kind,
            cr: cr.trim().to_string(),
            band,
            d100,
            coins: COIN_ORDER.iter().map(|c| (c.to_string(), 0)).collect(),
            breakdown: Vec::new(),
            extras: Vec::new(),
        }
    }

    pub fn gp_equivalent(&self) -> f64 {
        self.coins
            .iter()
            .map(|(cur, n)| *n as f64 * gp_rate(cur))
            .sum()
    }

    /// `"15 sp, 3 gp"`, or `"0 gp"` when nothing was found.
    pub fn coin_summary(&self) -> String {
        let parts: Vec<String> = self
            .coins
            .iter()
            .filter(|(_, n)| **n > 0)
            .map(|(cur, n)| format!("{n} {cur}"))
            .collect();
        if parts.is_empty() { "0 gp".to_string() } else { parts.join(", ") }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.kind);
        let _ = writeln!(out, "CR: {}", self.cr);
        let _ = writeln!(out, "Band: {}", self.band);
        let _ = writeln!(out, "d100: {}", self.d100);
        out.push_str("\nRoll Breakdown\n");
        for line in &self.breakdown {
            let _ = writeln!(out, "- {line}");
        }
        if !self.extras.is_empty() {
            out.push_str("\nExtra Loot\n");
            for line in &self.extras {
                let _ = writeln!(out, "- {line}");
            }
        }
        let _ = writeln!(out, "\nCoins: {}", self.coin_summary());
        let _ = write!(out, "GP equivalent: {:.2}", self.gp_equivalent());
        out
    }
}

fn gp_rate(cur: &str) -> f64 {
    match cur {
        "cp" => 0.01,
        "sp" => 0.1,
        "ep" => 0.5,
        "gp" => 1.0,
        "pp" => 10.0,
        _ => 0.0,
    }
}

#[derive(Debug, Clone, Copy)]
struct Coins {
    cur: &'static str,
    n: u32,
    sides: u32,
    mult: u64,
}

const fn c(cur: &'static str, n: u32, sides: u32, mult: u64) -> Coins {
    Coins { cur, n, sides, mult }
}

#[derive(Debug, Clone, Copy)]
enum Loot {
    Gems { n: u32, sides: u32, value: u32 },
    Art { n: u32, sides: u32, value: u32 },
    Magic { n: u32, sides: u32, table: char },
}

const fn gems(n: u32, sides: u32, value: u32) -> Loot {
    Loot::Gems { n, sides, value }
}
const fn art(n: u32, sides: u32, value: u32) -> Loot {
    Loot::Art { n, sides, value }
}
const fn magic(n: u32, sides: u32, table: char) -> Loot {
    Loot::Magic { n, sides, table }
}

struct Band {
    label: &'static str,
    /// `(highest d100, rows)`, ascending.
    individual: &'static [(u32, &'static [Coins])],
    hoard_coins: &'static [Coins],
    hoard: &'static [(u32, &'static [Loot])],
}

static BANDS: [Band; 4] = [
    Band {
        label: "CR 0-4",
        individual: &[
            (30, &[c("cp", 5, 6, 1)]),
            (60, &[c("sp", 4, 6, 1)]),
            (70, &[c("ep", 3, 6, 1)]),
            (95, &[c("gp", 3, 6, 1)]),
            (100, &[c("pp", 1, 6, 1)]),
        ],
        hoard_coins: &[c("cp", 6, 6, 100), c("sp", 3, 6, 100), c("gp", 2, 6, 10)],
        hoard: &[
            (6, &[]),
            (16, &[gems(2, 6, 10)]),
            (26, &[art(2, 4, 25)]),
            (36, &[gems(2, 6, 50)]),
            (44, &[gems(2, 6, 10), magic(1, 6, 'A')]),
            (52, &[art(2, 4, 25), magic(1, 6, 'A')]),
            (60, &[gems(2, 6, 50), magic(1, 6, 'A')]),
            (65, &[gems(2, 6, 10), magic(1, 4, 'B')]),
            (70, &[art(2, 4, 25), magic(1, 4, 'B')]),
            (75, &[gems(2, 6, 50), magic(1, 4, 'B')]),
            (78, &[gems(2, 6, 10), magic(1, 4, 'C')]),
            (80, &[art(2, 4, 25), magic(1, 4, 'C')]),
            (85, &[gems(2, 6, 50), magic(1, 4, 'C')]),
            (92, &[art(2, 4, 25), magic(1, 4, 'F')]),
            (97, &[gems(2, 6, 50), magic(1, 4, 'F')]),
            (99, &[art(2, 4, 25), magic(1, 4, 'G')]),
            (100, &[gems(2, 6, 50), magic(1, 4, 'G')]),
        ],
    },
    Band {
        label: "CR 5-10",
        individual: &[
            (30, &[c("cp", 4, 6, 100), c("ep", 1, 6, 10)]),
            (60, &[c("sp", 6, 6, 10), c("gp", 2, 6, 10)]),
            (70, &[c("ep", 3, 6, 10), c("gp", 2, 6, 10)]),
            (95, &[c("gp", 4, 6, 10)]),
            (100, &[c("gp", 2, 6, 10), c("pp", 3, 6, 1)]),
        ],
        hoard_coins: &[
            c("cp", 2, 6, 100),
            c("sp", 2, 6, 1000),
            c("gp", 6, 6, 100),
            c("pp", 3, 6, 10),
        ],
        hoard: &[
            (4, &[]),
            (10, &[art(2, 4, 25)]),
            (16, &[gems(3, 6, 50)]),
            (22, &[gems(3, 6, 100)]),
            (28, &[art(2, 4, 250)]),
            (44, &[gems(3, 6, 100), magic(1, 6, 'A')]),
            (63, &[art(2, 4, 250), magic(1, 4, 'B')]),
            (74, &[gems(3, 6, 100), magic(1, 4, 'C')]),
            (80, &[art(2, 4, 250), magic(1, 4, 'D')]),
            (94, &[gems(3, 6, 100), magic(1, 4, 'F')]),
            (98, &[art(2, 4, 250), magic(1, 4, 'G')]),
            (100, &[gems(3, 6, 100), magic(1, 4, 'H')]),
        ],
    },
    Band {
        label: "CR 11-16",
        individual: &[
            (20, &[c("sp", 4, 6, 100), c("gp", 1, 6, 100)]),
            (35, &[c("ep", 1, 6, 100), c("gp", 1, 6, 100)]),
            (75, &[c("gp", 2, 6, 100), c("pp", 1, 6, 10)]),
            (100, &[c("gp", 2, 6, 100), c("pp", 2, 6, 10)]),
        ],
        hoard_coins: &[c("gp", 4, 6, 1000), c("pp", 5, 6, 100)],
        hoard: &[
            (3, &[]),
            (15, &[gems(3, 6, 500), magic(1, 4, 'A'), magic(1, 6, 'B')]),
            (29, &[gems(3, 6, 1000), magic(1, 4, 'A'), magic(1, 6, 'B')]),
            (50, &[art(2, 4, 250), magic(1, 6, 'C')]),
            (66, &[gems(3, 6, 1000), magic(1, 4, 'D')]),
            (74, &[art(2, 4, 750), magic(1, 6, 'E')]),
            (82, &[gems(3, 6, 1000), magic(1, 4, 'F'), magic(1, 4, 'G')]),
            (94, &[art(2, 4, 750), magic(1, 4, 'H')]),
            (100, &[gems(3, 6, 1000), magic(1, 4, 'I')]),
        ],
    },
    Band {
        label: "CR 17+",
        individual: &[
            (15, &[c("ep", 2, 6, 1000), c("gp", 8, 6, 100)]),
            (55, &[c("gp", 1, 6, 1000), c("pp", 1, 6, 100)]),
            (100, &[c("gp", 1, 6, 1000), c("pp", 2, 6, 100)]),
        ],
        hoard_coins: &[c("gp", 12, 6, 1000), c("pp", 8, 6, 1000)],
        hoard: &[
            (2, &[]),
            (14, &[gems(3, 6, 1000), magic(1, 8, 'C')]),
            (46, &[art(1, 10, 2500), magic(1, 6, 'D')]),
            (68, &[gems(1, 8, 5000), magic(1, 6, 'E')]),
            (76, &[art(1, 4, 7500), magic(1, 4, 'F'), magic(1, 4, 'G')]),
            (93, &[gems(1, 8, 5000), magic(1, 6, 'H')]),
            (100, &[art(1, 4, 7500), magic(1, 4, 'I')]),
        ],
    },
];

fn band_for(cr: f64) -> &'static Band {
    let i = if cr <= 4.0 {
        0
    } else if cr <= 10.0 {
        1
    } else if cr <= 16.0 {
        2
    } else {
        3
    };
    &BANDS[i]
}

fn row_for<T>(rows: &'static [(u32, T)], d100: u32) -> Option<&'static T> {
    rows.iter().find(|(max, _)| d100 <= *max).map(|(_, row)| row)
}

/// `N dS x mult`, with the breakdown line `"label: NdS [x mult] = T"`.
fn roll_group<R: RandomSource + ?Sized>(
    rng: &mut R,
    label: &str,
    n: u32,
    sides: u32,
    mult: u64,
) -> (u64, String) {
    let sum: u64 = (0..n).map(|_| u64::from(rng.die(sides))).sum();
    let total = sum * mult;
    let line = if mult == 1 {
        format!("{label}: {n}d{sides} = {total}")
    } else {
        format!("{label}: {n}d{sides} x {mult} = {total}")
    };
    (total, line)
}

fn parse_cr(cr: &str) -> Result<f64, TreasureError> {
    rank_value(cr).ok_or_else(|| TreasureError::InvalidCr(cr.to_string()))
}

pub fn generate<R: RandomSource + ?Sized>(
    kind: TreasureKind,
    cr: &str,
    rng: &mut R,
) -> Result<TreasureReport, TreasureError> {
    match kind {
        TreasureKind::Individual => individual(cr, rng),
        TreasureKind::Hoard => hoard(cr, rng),
    }
}

pub fn individual<R: RandomSource + ?Sized>(
    cr: &str,
    rng: &mut R,
) -> Result<TreasureReport, TreasureError> {
    let band = band_for(parse_cr(cr)?);
    let d100 = rng.die(100);
    let mut report = TreasureReport::new(TreasureKind::Individual, cr, band.label, d100);
    for row in row_for(band.individual, d100).into_iter().flat_map(|r| r.iter()) {
        add_coins(&mut report, rng, row);
    }
    debug!(cr, band = band.label, d100, "individual treasure");
    Ok(report)
}

pub fn hoard<R: RandomSource + ?Sized>(
    cr: &str,
    rng: &mut R,
) -> Result<TreasureReport, TreasureError> {
    let band = band_for(parse_cr(cr)?);
    let d100 = rng.die(100);
    let mut report = TreasureReport::new(TreasureKind::Hoard, cr, band.label, d100);
    for row in band.hoard_coins {
        add_coins(&mut report, rng, row);
    }
    for loot in row_for(band.hoard, d100).into_iter().flat_map(|r| r.iter()) {
        add_loot(&mut report, rng, *loot);
    }
    debug!(cr, band = band.label, d100, "hoard treasure");
    Ok(report)
}

fn add_coins<R: RandomSource + ?Sized>(report: &mut TreasureReport, rng: &mut R, row: &Coins) {
    let (total, line) = roll_group(rng, row.cur, row.n, row.sides, row.mult);
    *report.coins.entry(row.cur.to_string()).or_insert(0) += total;
    report.breakdown.push(line);
}

fn add_loot<R: RandomSource + ?Sized>(report: &mut TreasureReport, rng: &mut R, loot: Loot) {
    let (label, n, sides) = match loot {
        Loot::Gems { n, sides, .. } => ("gems", n, sides),
        Loot::Art { n, sides, .. } => ("art objects", n, sides),
        Loot::Magic { n, sides, .. } => ("Magic Items", n, sides),
    };
    let (total, line) = roll_group(rng, label, n, sides, 1);
    report.breakdown.push(line);
    if total == 0 {
        return;
    }
    let (pool, header) = match loot {
        Loot::Gems { value, .. } => (gem_pool(value), format!("{total} gems ({value} gp each)")),
        Loot::Art { value, .. } => (art_pool(value), format!("{total} art objects ({value} gp each)")),
        Loot::Magic { table, .. } => {
            (magic_pool(table), format!("{total} item(s) from Magic Item Table {table}"))
        }
    };
    let picks: Vec<&str> = (0..total)
        .map(|_| pool[rng.rand_int(pool.len() as u32) as usize])
        .collect();
    report.extras.push(format!("{header}: {}", picks.join("; ")));
}

fn gem_pool(value: u32) -> &'static [&'static str] {
    match value {
        10 => &["azurite", "banded agate", "tiger eye", "hematite", "lapis lazuli", "malachite"],
        50 => &["sardonyx", "carnelian", "bloodstone", "chalcedony", "star rose quartz", "zircon"],
        100 => &["amethyst", "garnet", "pearl", "spinel", "tourmaline", "topaz"],
        500 => &["aquamarine", "black pearl", "peridot", "blue spinel", "golden topaz", "alexandrite"],
        1000 => &["emerald", "fire opal", "blue sapphire", "yellow sapphire", "star ruby", "black opal"],
        5000 => &["diamond", "jacinth", "ruby", "star sapphire", "black sapphire", "blue diamond"],
        _ => &["common gem"],
    }
}

fn art_pool(value: u32) -> &'static [&'static str] {
    match value {
        25 => &[
            "engraved silver ring",
            "embossed copper cup",
            "carved wooden ceremonial mask",
            "ivory bracelet",
            "bronze brooch",
            "bone statuette",
        ],
        250 => &[
            "silver filigree ewer",
            "necklace of small pearls",
            "fine tapestry",
            "silver hand mirror",
            "inlaid lacquered box",
            "silver holy icon",
        ],
        750 => &[
            "thin gold circlet",
            "gold and enamel chalice",
            "sapphire pendant",
            "solid gold bracelet",
            "court tapestry",
            "inlaid musical instrument",
        ],
        2500 => &[
            "jeweled diadem",
            "gold and ivory scepter",
            "ceremonial breastplate",
            "solid gold statuette",
            "gold ritual mask",
            "royal cup set with rubies",
        ],
        7500 => &[
            "royal crown set with diamonds",
            "jade and gold sculpture",
            "imperial chalice with sapphires",
            "platinum armlet",
            "jewel-encrusted royal casket",
            "gold and gem idol",
        ],
        _ => &["common art object"],
    }
}

fn magic_pool(table: char) -> &'static [&'static str] {
    match table.to_ascii_uppercase() {
        'A' => &["potion", "spell scroll", "+1 ammunition", "utility pouch", "minor wondrous item", "magic trinket"],
        'B' => &["greater potion", "+1 armor", "+1 weapon", "minor staff", "minor ring", "uncommon wondrous item"],
        'C' => &["superior scroll", "superior potion", "+1 shield", "+2 weapon", "minor rod", "rare wondrous item"],
        'D' => &["+2 armor", "rare ring", "rare staff", "rare wand", "rare wondrous item", "weapon with a special property"],
        'E' => &["high magic scroll", "supreme potion", "rare rod", "potent ring", "potent staff", "very rare wondrous item"],
        'F' => &["+1 or +2 weapon", "+2 shield", "+1 armor with a property", "weapon with extra damage", "martial wondrous item", "defensive ring"],
        'G' => &["+2 weapon", "+2 armor", "+2 shield", "offensive rod", "staff of power", "very rare wondrous item"],
        'H' => &["+3 weapon", "+3 armor", "legendary ring", "legendary staff", "legendary rod", "legendary wondrous item"],
        'I' => &["minor artifact", "relic weapon", "unique item", "legendary focus", "mythic armor", "ancient relic"],
        _ => &["magic item"],
    }
}

/// Treasure kind words matching everything.
fn is_wildcard(kind: &str) -> bool {
    matches!(kind, "" | "random" | "any" | "*")
}

fn item_matches(item: &ItemRecord, kind: &str) -> bool {
    let typ = item.item_type.to_lowercase();
    let name = item.name.to_lowercase();
    match kind {
        "potion" => item.has_flag("potion") || name.contains("potion"),
        "scroll" | "spell" => item.has_flag("scroll") || name.contains("scroll"),
        "armor" | "armour" => item.has_flag("armor") || typ.contains("armor"),
        "staff" | "wand" | "rod" | "ring" | "weapon" | "wondrous" => {
            item.has_flag(kind) || typ.contains(kind)
        }
        other => typ.contains(other) || name.contains(other),
    }
}

/// Draw `count` items (with replacement) matching any of `kinds`.
pub fn sample_items<'a, R: RandomSource + ?Sized>(
    items: &'a Catalog<ItemRecord>,
    kinds: &[String],
    count: usize,
    rng: &mut R,
) -> Result<Vec<&'a ItemRecord>, TreasureError> {
    if count < 1 {
        return Err(TreasureError::InvalidCount(count));
    }
    let kinds: Vec<String> = kinds
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();
    let everything = kinds.is_empty() || kinds.iter().any(|k| is_wildcard(k));
    let pool: Vec<&ItemRecord> = items
        .iter()
        .filter(|it| everything || kinds.iter().any(|k| item_matches(it, k)))
        .collect();
    pick(pool, count, rng, || format!("type {:?}", kinds.join(",")))
}

/// Draw `count` spells (with replacement) of `level` and `school`; blank or
/// `random` matches any.
pub fn sample_spells<'a, R: RandomSource + ?Sized>(
    spells: &'a Catalog<SpellRecord>,
    level: &str,
    school: &str,
    count: usize,
    rng: &mut R,
) -> Result<Vec<&'a SpellRecord>, TreasureError> {
    if count < 1 {
        return Err(TreasureError::InvalidCount(count));
    }
    let level = level.trim().to_lowercase();
    let school = school.trim().to_lowercase();
    let pool: Vec<&SpellRecord> = spells
        .iter()
        .filter(|sp| is_wildcard(&level) || sp.rank().trim().eq_ignore_ascii_case(&level))
        .filter(|sp| is_wildcard(&school) || sp.kind().trim().eq_ignore_ascii_case(&school))
        .collect();
    pick(pool, count, rng, || format!("level={level:?} school={school:?}"))
}

fn pick<'a, T, R: RandomSource + ?Sized>(
    pool: Vec<&'a T>,
    count: usize,
    rng: &mut R,
    describe: impl FnOnce() -> String,
) -> Result<Vec<&'a T>, TreasureError> {
    if pool.is_empty() {
        return Err(TreasureError::NoCandidates(describe()));
    }
    Ok((0..count)
        .map(|_| pool[rng.rand_int(pool.len() as u32) as usize])
        .collect())
}
