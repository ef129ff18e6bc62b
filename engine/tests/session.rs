use engine::persist::MemoryStore;
use engine::treasure::TreasureKind;
use engine::{Dice, HistoryStep, Session, SessionConfig};

fn session(faces: Vec<u32>) -> Session {
    Session::with_builtin(SessionConfig::default(), Box::new(MemoryStore::new()))
        .unwrap()
        .with_dice(Dice::from_scripted(faces))
}

#[test]
fn batch_roll_is_one_step() {
    let mut s = session(vec![5, 2, 1, 1, 4]);
    let results = s.roll_input("2d6+3, 1d4x3").unwrap();
    assert_eq!(results.len(), 4);
    assert_eq!(results[0].expression, "2d6+3");
    assert_eq!(results[0].breakdown, "2d6(5+2) + 3 = 10");
    assert_eq!(s.dice_log().len(), 4);
    assert_eq!(s.dice_log().selected(), Some(3));
    assert_eq!(s.dice_log_mut().undo(), HistoryStep::Applied);
    assert!(s.dice_log().is_empty());
}

#[test]
fn malformed_batch_rolls_nothing() {
    let mut s = session(vec![]);
    assert!(s.roll_input("1d6, 2d").is_err());
    assert!(s.dice_log().is_empty());
}

#[test]
fn reroll_and_replay_selected() {
    let mut s = session(vec![3, 6, 1, 2]);
    s.roll_input("1d6").unwrap();
    let again = s.reroll_selected().unwrap().unwrap();
    assert_eq!(again.breakdown, "1d6(6) = 6");
    assert_eq!(s.dice_log().len(), 1);

    let replaced = s.replay_selected("1d4x2").unwrap().unwrap();
    assert_eq!(replaced.len(), 2);
    let exprs: Vec<&str> = s.dice_log().entries().iter().map(|r| r.breakdown.as_str()).collect();
    assert_eq!(exprs, ["1d4(1) = 1", "1d4(2) = 2"]);
    s.dice_log_mut().undo();
    assert_eq!(s.dice_log().entries()[0].breakdown, "1d6(6) = 6");
}

#[test]
fn documents_go_through_store_and_sidecars() {
    let mut s = session(vec![10]);
    s.roster_mut().add_from_catalog(17).unwrap();
    s.roll_init_at(0).unwrap();
    s.roll_input("3").unwrap();
    assert_eq!(s.save_encounters(Some("fights/boss.yaml")).unwrap(), "fights/boss.yaml");
    assert_eq!(s.save_dice(None).unwrap(), "dice.yaml");

    s.roster_mut().delete_at(0).unwrap();
    s.dice_log_mut().clear();
    assert_eq!(s.encounters_path(None), "fights/boss.yaml");
    assert_eq!(s.load_encounters(None).unwrap(), "fights/boss.yaml");
    assert_eq!(s.roster().get(0).unwrap().init_roll, Some(13));
    assert_eq!(s.roster_mut().undo(), HistoryStep::Empty);

    s.roll_input("4").unwrap();
    s.load_dice(None).unwrap();
    assert_eq!(s.dice_log().len(), 1);
    assert_eq!(s.dice_log().selected(), Some(0));
    assert_eq!(s.dice_log_mut().undo(), HistoryStep::Empty);
}

#[test]
fn filters_persist() {
    let mut s = session(vec![]);
    s.filters_mut().active = "spells".into();
    s.filters_mut().spells.rank = "3".into();
    s.save_filters().unwrap();
    *s.filters_mut() = Default::default();
    assert_eq!(s.load_filters().unwrap().spells.rank, "3");
}

#[test]
fn treasure_uses_session_dice() {
    let mut s = session(vec![50, 3, 5, 1, 6]);
    let report = s.treasure("3", TreasureKind::Individual).unwrap();
    assert_eq!(report.coins["sp"], 15);
    assert!(s.treasure("x", TreasureKind::Hoard).is_err());
    assert_eq!(s.sample_spells("3", "evocation", 1).unwrap()[0].name, "Fireball");
}

#[test]
fn config_file_overrides_defaults() {
    let path = std::env::temp_dir().join(format!("lazy5e-config-{}.yaml", std::process::id()));
    std::fs::write(&path, "encounters_path: arena.yaml\nseed: 11\n").unwrap();
    let cfg = engine::api::load_config(&path).unwrap();
    let _ = std::fs::remove_file(&path);
    assert_eq!(cfg.encounters_path, "arena.yaml");
    assert_eq!(cfg.seed, Some(11));
    assert_eq!(cfg.dice_path, "dice.yaml");
    assert!(engine::api::load_config("/definitely/not/here.yaml").is_err());
}
