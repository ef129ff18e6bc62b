use std::sync::Arc;

use engine::content::builtin_monsters;
use engine::persist::{
    load_dice, load_encounters, load_filters, read_last_path, save_dice, save_encounters,
    save_filters, write_last_path, BrowseMode, FilterState, FsStore, MemoryStore, Store,
};
use engine::roster::{CustomEntry, Roster};
use engine::{Catalog, CreatureRecord, Dice, DiceResult, TurnState};
use engine::catalog::Filter;

fn catalog() -> Arc<Catalog<CreatureRecord>> {
    Arc::new(builtin_monsters().unwrap())
}

#[test]
fn encounter_round_trip() {
    let cat = catalog();
    let mut r = Roster::new(Arc::clone(&cat));
    let mut dice = Dice::from_scripted(vec![2, 2, 2, 11]);
    let k = r.add_from_catalog(17).unwrap();
    r.toggle_hp_mode_at(k, &mut dice).unwrap();
    r.roll_init_at(k, &mut dice).unwrap();
    r.add_from_catalog(0).unwrap();
    r.damage_at(1, 3).unwrap();
    r.add_custom(CustomEntry {
        name: "Captain".into(),
        init_base: 2,
        ac_text: "16".into(),
        max_hp: 30,
        current_hp: 25,
        init_roll: Some(14),
    });
    r.toggle_turn_mode();
    r.next_turn();

    let mut store = MemoryStore::new();
    save_encounters(&mut store, "enc.yaml", r.state()).unwrap();
    let loaded = load_encounters(&store, "enc.yaml", &cat).unwrap();
    assert_eq!(loaded.entries, r.state().entries);
    assert_eq!(loaded.serial, r.state().serial);
    assert_eq!(loaded.turn, r.state().turn);
}

#[test]
fn document_skips_empty_optionals() {
    let cat = catalog();
    let mut r = Roster::new(cat);
    r.add_from_catalog(0).unwrap();
    let mut store = MemoryStore::new();
    save_encounters(&mut store, "enc.yaml", r.state()).unwrap();
    let text = store.text("enc.yaml").unwrap();
    assert!(text.contains("version: 1"), "{text}");
    assert!(text.contains("monster_id: 0"), "{text}");
    assert!(text.contains("hp_formula: 2d6"), "{text}");
    assert!(!text.contains("custom"), "{text}");
    assert!(!text.contains("turn_mode"), "{text}");
    assert!(!text.contains("init_roll"), "{text}");
}

#[test]
fn load_repairs_items() {
    let yaml = "\
version: 1
items:
  - {monster_id: 17, ordinal: 0, base_hp: 0, current_hp: 99}
  - {monster_id: 4242, ordinal: 1, base_hp: 10, current_hp: 10}
  - {monster_id: 17, base_hp: 13, current_hp: -4}
  - {custom: true, custom_name: Guard, custom_ac: '15', base_hp: 11, current_hp: 11}
  - {custom: true, custom_name: guard, base_hp: 11, current_hp: 5}
turn_mode: true
turn_index: 9
turn_round: 0
";
    let mut store = MemoryStore::new();
    store.insert("enc.yaml", yaml);
    let state = load_encounters(&store, "enc.yaml", &catalog()).unwrap();

    assert_eq!(state.entries.len(), 4);
    let first = &state.entries[0];
    assert_eq!((first.ordinal, first.base_hp, first.current_hp), (1, 13, 13));
    assert_eq!(first.hp_formula.as_deref(), Some("3d8"));
    assert_eq!((state.entries[1].ordinal, state.entries[1].current_hp), (2, 0));
    assert_eq!(state.entries[2].ordinal, 1);
    assert_eq!(state.entries[3].ordinal, 2);
    assert_eq!(state.serial.get(&17), Some(&2));
    assert_eq!(state.turn, TurnState::On { index: 0, round: 1 });
}

#[test]
fn turn_dropped_when_nothing_loads() {
    let mut store = MemoryStore::new();
    store.insert(
        "enc.yaml",
        "version: 1\nitems:\n  - {monster_id: 9999, ordinal: 1, base_hp: 5, current_hp: 5}\nturn_mode: true\n",
    );
    let state = load_encounters(&store, "enc.yaml", &catalog()).unwrap();
    assert!(state.entries.is_empty());
    assert_eq!(state.turn, TurnState::Off);
}

#[test]
fn out_of_range_ids_drop_only_their_item() {
    let mut store = MemoryStore::new();
    store.insert(
        "enc.yaml",
        "version: 1\nitems:\n  - {monster_id: -3, ordinal: 1, base_hp: 5, current_hp: 5}\n  - {monster_id: 5000000000, ordinal: 1, base_hp: 5, current_hp: 5}\n  - {monster_id: 0, ordinal: 1, base_hp: 7, current_hp: 6}\n",
    );
    let state = load_encounters(&store, "enc.yaml", &catalog()).unwrap();
    assert_eq!(state.entries.len(), 1);
    assert_eq!(state.entries[0].current_hp, 6);
    assert_eq!(state.serial.get(&0), Some(&1));
}

#[test]
fn missing_documents_are_empty() {
    let store = MemoryStore::new();
    assert!(load_encounters(&store, "nope.yaml", &catalog()).unwrap().entries.is_empty());
    assert!(load_dice(&store, "nope.yaml").unwrap().is_empty());
    assert_eq!(load_filters(&store, "nope.yaml").unwrap(), FilterState::default());
}

#[test]
fn broken_yaml_is_an_error() {
    let mut store = MemoryStore::new();
    store.insert("enc.yaml", "items: [unclosed");
    assert!(load_encounters(&store, "enc.yaml", &catalog()).is_err());
}

#[test]
fn dice_round_trip_and_legacy_lines() {
    let mut store = MemoryStore::new();
    let results = vec![
        DiceResult::new("2d6+3", "2d6(5+2) + 3 = 10"),
        DiceResult::new("1d20", "1d20(4) = 4"),
    ];
    save_dice(&mut store, "dice.yaml", &results).unwrap();
    assert!(store.text("dice.yaml").unwrap().contains("output: 2d6(5+2) + 3 = 10"));
    assert_eq!(load_dice(&store, "dice.yaml").unwrap(), results);

    store.insert(
        "old.yaml",
        "version: 1\nitems:\n  - '[black:gold]1d20+5[-:-] => 1d20(12) + 5 = 17'\n  - ''\n  - '2d6'\n",
    );
    let legacy = load_dice(&store, "old.yaml").unwrap();
    assert_eq!(
        legacy,
        vec![DiceResult::new("1d20+5", "1d20(12) + 5 = 17"), DiceResult::new("2d6", "")]
    );
}

#[test]
fn dice_load_keeps_newest_hundred() {
    let mut store = MemoryStore::new();
    let results: Vec<DiceResult> =
        (0..120).map(|i| DiceResult::new(format!("1d{}", i + 1), "x")).collect();
    save_dice(&mut store, "dice.yaml", &results).unwrap();
    let loaded = load_dice(&store, "dice.yaml").unwrap();
    assert_eq!(loaded.len(), 100);
    assert_eq!(loaded[0].expression, "1d21");
}

#[test]
fn filters_round_trip() {
    let mut store = MemoryStore::new();
    let mut state = FilterState::default();
    state.set_filter(
        BrowseMode::Items,
        Filter { rank: "rare".into(), sources: vec!["DMG".into()], ..Filter::default() },
    );
    save_filters(&mut store, "f.yaml", &state).unwrap();
    let text = store.text("f.yaml").unwrap();
    assert!(text.contains("active: items"), "{text}");
    assert!(text.contains("cr: rare"), "{text}");

    let loaded = load_filters(&store, "f.yaml").unwrap();
    assert_eq!(loaded.mode(), BrowseMode::Items);
    assert_eq!(loaded.filter(BrowseMode::Items).rank, "rare");
    assert_eq!(loaded.filter(BrowseMode::Spells), &Filter::default());
}

#[test]
fn sidecar_falls_back_to_default() {
    let mut store = MemoryStore::new();
    assert_eq!(read_last_path(&store, ".last", "enc.yaml"), "enc.yaml");
    write_last_path(&mut store, ".last", "fights/boss.yaml");
    assert_eq!(store.text(".last").as_deref(), Some("fights/boss.yaml\n"));
    assert_eq!(read_last_path(&store, ".last", "enc.yaml"), "fights/boss.yaml");
    store.insert(".last", "  \n");
    assert_eq!(read_last_path(&store, ".last", "enc.yaml"), "enc.yaml");
}

#[test]
fn fs_store_creates_directories() {
    let dir = std::env::temp_dir().join(format!("lazy5e-store-{}", std::process::id()));
    let mut store = FsStore::new(&dir);
    store.write("nested/doc.yaml", b"version: 1\n").unwrap();
    assert_eq!(store.read("nested/doc.yaml").unwrap().as_deref(), Some(&b"version: 1\n"[..]));
    assert_eq!(store.read("absent.yaml").unwrap(), None);
    let _ = std::fs::remove_dir_all(&dir);
}
