use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use engine::content::builtin_monsters;
use engine::roster::{CustomEntry, EncounterEntry, EntrySource, Roster};
use engine::{Dice, HistoryStep, RosterError};
use proptest::prelude::*;

const KENKU: u32 = 17;
const GOBLIN: u32 = 0;
const HEARTH_SPIRIT: u32 = 19;

fn roster() -> Roster {
    Roster::new(Arc::new(builtin_monsters().unwrap()))
}

fn custom(name: &str, init: i32, hp: u32) -> CustomEntry {
    CustomEntry {
        name: name.into(),
        init_base: init,
        ac_text: "14".into(),
        max_hp: hp,
        current_hp: hp,
        init_roll: None,
    }
}

#[test]
fn encounter_lifecycle_undoes_step_by_step() {
    let mut r = roster();
    let mut dice = Dice::from_scripted(vec![3, 8, 6]);

    let i = r.add_from_catalog(KENKU).unwrap();
    assert_eq!(r.get(i).unwrap().current_hp, 13);
    assert_eq!(r.damage_at(i, 5).unwrap(), 8);
    assert_eq!(r.toggle_hp_mode_at(i, &mut dice).unwrap(), 17);
    let e = r.get(i).unwrap();
    assert_eq!((e.rolled_hp, e.current_hp, e.max_hp()), (17, 8, 17));
    assert_eq!(r.heal_at(i, 100).unwrap(), 17);
    r.delete_at(i).unwrap();
    assert!(r.is_empty());

    assert_eq!(r.undo(), HistoryStep::Applied);
    assert_eq!(r.get(0).unwrap().current_hp, 17);
    r.undo();
    let e = r.get(0).unwrap();
    assert!(e.use_rolled_hp);
    assert_eq!(e.current_hp, 8);
    r.undo();
    let e = r.get(0).unwrap();
    assert!(!e.use_rolled_hp);
    assert_eq!((e.current_hp, e.max_hp()), (8, 13));
    r.undo();
    assert_eq!(r.get(0).unwrap().current_hp, 13);
    r.undo();
    assert!(r.is_empty());
    assert_eq!(r.undo(), HistoryStep::Empty);
}

#[test]
fn ordinals_count_per_record() {
    let mut r = roster();
    r.add_from_catalog(GOBLIN).unwrap();
    r.add_from_catalog(KENKU).unwrap();
    r.add_from_catalog(GOBLIN).unwrap();
    let labels: Vec<String> = r.entries().iter().map(|e| r.entry_label(e)).collect();
    assert_eq!(labels, ["Goblin #1", "Kenku #1", "Goblin #2"]);

    r.delete_at(2).unwrap();
    r.add_from_catalog(GOBLIN).unwrap();
    assert_eq!(r.get(2).unwrap().ordinal, 3);
}

#[test]
fn custom_ordinal_is_max_plus_one() {
    let mut r = roster();
    r.add_custom(custom("Guard", 1, 11));
    r.add_custom(custom(" guard ", 1, 11));
    r.add_custom(custom("Captain", 2, 20));
    let ords: Vec<u32> = r.entries().iter().map(|e| e.ordinal).collect();
    assert_eq!(ords, [1, 2, 1]);
    assert_eq!(r.entry_label(r.get(0).unwrap()), "Guard");
}

#[test]
fn refusals_leave_history_untouched() {
    let mut r = roster();
    let mut dice = Dice::from_seed(1);
    assert_eq!(r.damage_at(0, 3), Err(RosterError::NoEntry(0)));
    let i = r.add_from_catalog(HEARTH_SPIRIT).unwrap();
    assert!(matches!(r.damage_at(i, 3), Err(RosterError::HpUnavailable(_))));
    assert_eq!(r.heal_at(i, 0), Err(RosterError::InvalidAmount(0)));
    assert!(matches!(r.toggle_hp_mode_at(i, &mut dice), Err(RosterError::FormulaUnsupported(_))));
    assert!(matches!(r.roll_init_at(i, &mut dice), Err(RosterError::InitUnavailable(_))));
    assert!(matches!(r.roll_init_all(&mut dice), Err(RosterError::InitUnavailable(_))));
    assert_eq!(r.add_from_catalog(999), Err(RosterError::UnknownRecord(999)));

    assert_eq!(r.undo(), HistoryStep::Applied);
    assert!(r.is_empty());
    assert_eq!(r.undo(), HistoryStep::Empty);
}

#[test]
fn initiative_uses_dex_modifier() {
    let mut r = roster();
    let i = r.add_from_catalog(KENKU).unwrap();
    let mut dice = Dice::from_scripted(vec![10]);
    assert_eq!(r.roll_init_at(i, &mut dice).unwrap(), 13);
    assert_eq!(r.get(i).unwrap().init_roll, Some(13));
}

#[test]
fn huge_initiative_modifier_saturates() {
    let (roll, base) = engine::rules::parse_init_input("2147483647").unwrap();
    let mut r = roster();
    r.add_custom(CustomEntry { init_roll: roll, ..custom("Avatar", base, 10) });
    r.add_custom(custom("Minion", i32::MAX - 5, 10));

    let mut dice = Dice::from_scripted(vec![20, 20]);
    assert_eq!(r.roll_init_at(0, &mut dice).unwrap(), i32::MAX);
    assert_eq!(r.roll_init_all(&mut dice).unwrap(), 2);
    assert_eq!(r.get(1).unwrap().init_roll, Some(i32::MAX));
}

#[test]
fn sort_orders_rolled_then_modifier_then_name() {
    let mut r = roster();
    r.add_custom(custom("Zed", 5, 10));
    r.add_custom(CustomEntry { init_roll: Some(12), ..custom("Amy", 0, 10) });
    r.add_custom(custom("Bob", 5, 10));
    r.add_custom(CustomEntry { init_roll: Some(18), ..custom("Cat", 0, 10) });
    r.select(1);
    r.sort_by_initiative();
    let names: Vec<String> = r.entries().iter().map(|e| r.entry_name(e)).collect();
    assert_eq!(names, ["Cat", "Amy", "Bob", "Zed"]);
    assert_eq!(r.selected(), Some(1));
    r.undo();
    assert_eq!(r.entry_name(r.get(0).unwrap()), "Zed");
}

#[test]
fn toggle_back_to_average_resets_rolled() {
    let mut r = roster();
    let mut dice = Dice::from_scripted(vec![1, 1, 1]);
    let i = r.add_from_catalog(KENKU).unwrap();
    assert_eq!(r.toggle_hp_mode_at(i, &mut dice).unwrap(), 3);
    assert_eq!(r.get(i).unwrap().current_hp, 3);
    assert_eq!(r.toggle_hp_mode_at(i, &mut dice).unwrap(), 13);
    let e = r.get(i).unwrap();
    assert_eq!((e.rolled_hp, e.current_hp, e.use_rolled_hp), (0, 3, false));
}

#[test]
fn redo_reapplies_undone_step() {
    let mut r = roster();
    let i = r.add_from_catalog(GOBLIN).unwrap();
    r.damage_at(i, 4).unwrap();
    let after = r.state().clone();
    r.undo();
    assert_ne!(r.state(), &after);
    assert_eq!(r.redo(), HistoryStep::Applied);
    assert_eq!(r.state(), &after);
    assert_eq!(r.redo(), HistoryStep::Empty);
}

#[derive(Debug, Clone)]
enum Op {
    Damage(i64),
    Heal(i64),
    Toggle,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1i64..40).prop_map(Op::Damage),
        (1i64..40).prop_map(Op::Heal),
        Just(Op::Toggle),
    ]
}

proptest! {
    #[test]
    fn hp_stays_within_bounds(ops in prop::collection::vec(op(), 1..30), seed in any::<u64>()) {
        let mut r = roster();
        let mut dice = Dice::from_seed(seed);
        let i = r.add_from_catalog(KENKU).unwrap();
        for op in ops {
            let before = r.state().clone();
            let res = match op {
                Op::Damage(n) => r.damage_at(i, n),
                Op::Heal(n) => r.heal_at(i, n),
                Op::Toggle => r.toggle_hp_mode_at(i, &mut dice),
            };
            prop_assert!(res.is_ok());
            let e = r.get(i).unwrap();
            prop_assert!(e.current_hp <= e.max_hp());

            let after = r.state().clone();
            r.undo();
            prop_assert_eq!(r.state(), &before);
            r.redo();
            prop_assert_eq!(r.state(), &after);
        }
    }
}

/// Ordering `sort_by_initiative` must produce between neighbours.
fn init_order(r: &Roster, a: &EncounterEntry, b: &EncounterEntry) -> Ordering {
    fn desc(x: Option<i32>, y: Option<i32>) -> Ordering {
        match (x, y) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
    desc(a.init_roll, b.init_roll)
        .then_with(|| desc(r.init_base(a), r.init_base(b)))
        .then_with(|| r.entry_name(a).to_lowercase().cmp(&r.entry_name(b).to_lowercase()))
        .then_with(|| a.ordinal.cmp(&b.ordinal))
}

fn ordinal_key(e: &EncounterEntry) -> String {
    match &e.source {
        EntrySource::Catalog { record_id } => format!("m{record_id}#{}", e.ordinal),
        EntrySource::Custom { name, .. } => format!("c{}#{}", name.trim().to_lowercase(), e.ordinal),
    }
}

const CUSTOM_NAMES: [&str; 4] = ["Guard", " guard", "Scout", "Captain"];

#[derive(Debug, Clone)]
enum Edit {
    Add(u32),
    Custom(usize, i32, Option<i32>),
    Delete(usize),
    Init(usize),
    InitAll,
    Sort,
    TurnMode,
    Next,
    Prev,
}

fn edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        prop::sample::select(vec![GOBLIN, 3, KENKU, HEARTH_SPIRIT]).prop_map(Edit::Add),
        (0..CUSTOM_NAMES.len(), -3i32..6, prop::option::of(1i32..25))
            .prop_map(|(n, base, roll)| Edit::Custom(n, base, roll)),
        (0usize..8).prop_map(Edit::Delete),
        (0usize..8).prop_map(Edit::Init),
        Just(Edit::InitAll),
        Just(Edit::Sort),
        Just(Edit::TurnMode),
        Just(Edit::Next),
        Just(Edit::Prev),
    ]
}

/// Whether `edit` records an undo step on `r`.
fn records_step(r: &Roster, edit: &Edit) -> bool {
    match edit {
        Edit::Add(_) | Edit::Custom(..) => true,
        Edit::Delete(i) => *i < r.len(),
        Edit::Init(i) => r.get(*i).is_some_and(|e| r.init_base(e).is_some()),
        Edit::InitAll => r.entries().iter().any(|e| r.init_base(e).is_some()),
        Edit::Sort => r.len() >= 2,
        Edit::TurnMode => !r.is_empty(),
        Edit::Next | Edit::Prev => r.turn().is_on() && !r.is_empty(),
    }
}

fn apply(r: &mut Roster, edit: &Edit, dice: &mut Dice) {
    match *edit {
        Edit::Add(id) => {
            r.add_from_catalog(id).unwrap();
        }
        Edit::Custom(n, base, roll) => {
            r.add_custom(CustomEntry { init_roll: roll, ..custom(CUSTOM_NAMES[n], base, 10) });
        }
        Edit::Delete(i) => {
            let _ = r.delete_at(i);
        }
        Edit::Init(i) => {
            let _ = r.roll_init_at(i, dice);
        }
        Edit::InitAll => {
            let _ = r.roll_init_all(dice);
        }
        Edit::Sort => r.sort_by_initiative(),
        Edit::TurnMode => {
            r.toggle_turn_mode();
        }
        Edit::Next => {
            r.next_turn();
        }
        Edit::Prev => {
            r.prev_turn();
        }
    }
}

proptest! {
    #[test]
    fn every_edit_undoes_and_redoes(edits in prop::collection::vec(edit(), 1..40), seed in any::<u64>()) {
        let mut r = roster();
        let mut dice = Dice::from_seed(seed);
        for edit in &edits {
            let before = r.state().clone();
            let recorded = records_step(&r, edit);
            apply(&mut r, edit, &mut dice);
            let after = r.state().clone();
            if !recorded {
                prop_assert_eq!(&after, &before);
                continue;
            }
            prop_assert_eq!(r.undo(), HistoryStep::Applied);
            prop_assert_eq!(r.state(), &before);
            prop_assert_eq!(r.redo(), HistoryStep::Applied);
            prop_assert_eq!(r.state(), &after);
        }
    }

    #[test]
    fn ordinals_stay_unique(edits in prop::collection::vec(edit(), 1..60)) {
        let mut r = roster();
        let mut dice = Dice::from_seed(7);
        for edit in &edits {
            apply(&mut r, edit, &mut dice);
            let mut seen = HashSet::new();
            for e in r.entries() {
                prop_assert!(seen.insert(ordinal_key(e)), "duplicate ordinal {}", ordinal_key(e));
            }
        }
    }

    #[test]
    fn sorted_neighbours_respect_order(edits in prop::collection::vec(edit(), 1..40), seed in any::<u64>()) {
        let mut r = roster();
        let mut dice = Dice::from_seed(seed);
        for edit in &edits {
            apply(&mut r, edit, &mut dice);
        }
        r.sort_by_initiative();
        for pair in r.entries().windows(2) {
            prop_assert_ne!(init_order(&r, &pair[0], &pair[1]), Ordering::Greater);
        }
    }
}
