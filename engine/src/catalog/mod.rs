//! Read-only record catalogs (creatures, items, spells) with filter options.

use std::cmp::Ordering;
use std::collections::HashMap;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use tracing::info;

use crate::error::CatalogError;

mod creature;
pub mod describe;
mod item;
mod spell;
pub mod value;

pub use creature::CreatureRecord;
pub use item::ItemRecord;
pub use spell::SpellRecord;

pub const UNKNOWN: &str = "Unknown";

/// A record kind the catalog can index.
pub trait Record: Sized {
    /// Top-level key of the YAML envelope (`monsters`, `items`, `spells`).
    const KEY: &'static str;
    /// Whether the rank axis (CR, spell level) sorts by numeric value.
    const NUMERIC_RANK: bool;

    /// `None` for records without a name.
    fn from_raw(id: u32, raw: Mapping) -> Option<Self>;

    fn id(&self) -> u32;
    fn name(&self) -> &str;
    fn source(&self) -> &str;
    /// CR for creatures, rarity for items, level for spells.
    fn rank(&self) -> &str;
    /// Type for creatures and items, school for spells.
    fn kind(&self) -> &str;
    fn environments(&self) -> &[String];
    fn raw(&self) -> &Mapping;
    fn describe(&self) -> String;
}

/// Filter axes with option lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Environment,
    Source,
    Rank,
    Kind,
}

/// Catalog filter. Empty fields match everything. Doubles as the persisted
/// per-mode filter state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Filter {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub env: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
    #[serde(rename = "cr", skip_serializing_if = "String::is_empty")]
    pub rank: String,
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub kind: String,
}

impl Filter {
    pub fn matches<R: Record>(&self, r: &R) -> bool {
        let name = self.name.trim().to_lowercase();
        if !name.is_empty() && !r.name().to_lowercase().contains(&name) {
            return false;
        }
        let env = self.env.trim();
        if !env.is_empty() && !r.environments().iter().any(|e| e.eq_ignore_ascii_case(env)) {
            return false;
        }
        if !self.sources.is_empty()
            && !self.sources.iter().any(|s| s.trim().eq_ignore_ascii_case(r.source()))
        {
            return false;
        }
        if !axis_matches(r.rank(), &self.rank) {
            return false;
        }
        axis_matches(r.kind(), &self.kind)
    }
}

fn axis_matches(value: &str, query: &str) -> bool {
    let query = query.trim();
    if query.is_empty() {
        return true;
    }
    let value = value.trim();
    let value = if value.is_empty() { UNKNOWN } else { value };
    value.eq_ignore_ascii_case(query)
}

/// Numeric value of a CR or level tag: `"1/4"` -> 0.25, `"Unknown"` -> None.
pub fn rank_value(tag: &str) -> Option<f64> {
    let tag = tag.trim();
    if tag.is_empty() || tag.eq_ignore_ascii_case(UNKNOWN) {
        return None;
    }
    match tag.split_once('/') {
        Some((n, d)) => {
            let n: f64 = n.trim().parse().ok()?;
            let d: f64 = d.trim().parse().ok()?;
            (d != 0.0).then(|| n / d)
        }
        None => tag.parse().ok().filter(|v: &f64| v.is_finite()),
    }
}

/// Numeric tags ascending, then the rest case-insensitively.
pub fn compare_rank(a: &str, b: &str) -> Ordering {
    match (rank_value(a), rank_value(b)) {
        (Some(x), Some(y)) => x.total_cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.to_lowercase().cmp(&b.to_lowercase()),
    }
}

/// Records sorted by lowercase name, addressable by the id assigned at load
/// (the record's position in the source list).
#[derive(Debug, Clone)]
pub struct Catalog<R> {
    records: Vec<R>,
    by_id: HashMap<u32, usize>,
}

impl<R: Record> Catalog<R> {
    pub fn from_yaml(text: &str) -> Result<Self, CatalogError> {
        let doc: Mapping = serde_yaml::from_str(text)?;
        let list = match doc.get(R::KEY) {
            Some(Value::Sequence(items)) => items.clone(),
            _ => Vec::new(),
        };
        if list.is_empty() {
            return Err(CatalogError::Empty(R::KEY));
        }
        let catalog = Self::from_records(
            list.into_iter()
                .enumerate()
                .filter_map(|(i, v)| match v {
                    Value::Mapping(m) => R::from_raw(i as u32, m),
                    _ => None,
                })
                .collect(),
        );
        info!(kind = R::KEY, records = catalog.len(), "catalog loaded");
        Ok(catalog)
    }

    pub fn from_records(mut records: Vec<R>) -> Self {
        records.sort_by_cached_key(|r| r.name().to_lowercase());
        let by_id = records.iter().enumerate().map(|(i, r)| (r.id(), i)).collect();
        Self { records, by_id }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &R> {
        self.records.iter()
    }

    pub fn by_id(&self, id: u32) -> Option<&R> {
        self.by_id.get(&id).map(|&i| &self.records[i])
    }

    pub fn filter(&self, f: &Filter) -> Vec<&R> {
        self.records.iter().filter(|r| f.matches(*r)).collect()
    }

    /// Exact case-insensitive name match, else the first name containing
    /// `name`.
    pub fn find_by_name(&self, name: &str) -> Option<&R> {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        self.records
            .iter()
            .find(|r| r.name().to_lowercase() == needle)
            .or_else(|| self.records.iter().find(|r| r.name().to_lowercase().contains(&needle)))
    }

    pub fn options(&self, axis: Axis) -> Vec<String> {
        let mut set = IndexSet::new();
        for r in &self.records {
            match axis {
                Axis::Environment => set.extend(r.environments().iter().cloned()),
                Axis::Source => {
                    if !r.source().is_empty() {
                        set.insert(r.source().to_string());
                    }
                }
                Axis::Rank => {
                    set.insert(r.rank().to_string());
                }
                Axis::Kind => {
                    let kind = r.kind().trim();
                    set.insert(if kind.is_empty() { UNKNOWN.to_string() } else { kind.to_string() });
                }
            }
        }
        let mut out: Vec<String> = set.into_iter().collect();
        if axis == Axis::Rank && R::NUMERIC_RANK {
            out.sort_by(|a, b| compare_rank(a, b));
        } else {
            out.sort_by_cached_key(|s| s.to_lowercase());
        }
        out
    }
}
