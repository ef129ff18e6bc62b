use engine::rules::{
    ability_mod, clamp_hp, init_from_dex, parse_hp_input, parse_init_input, roll_hp_formula,
};
use engine::Dice;
use proptest::prelude::*;

#[test]
fn one_d_one_always_one() {
    let mut dice = Dice::from_seed(77);
    for _ in 0..20 {
        assert_eq!(roll_hp_formula("1d1", &mut dice), Some(1));
    }
}

#[test]
fn formula_modifier_clamps_at_zero() {
    let mut dice = Dice::from_scripted(vec![1]);
    assert_eq!(roll_hp_formula("1d4-10", &mut dice), Some(0));
    let mut dice = Dice::from_scripted(vec![3, 8, 6]);
    assert_eq!(roll_hp_formula("3d8", &mut dice), Some(17));
    assert_eq!(roll_hp_formula("0d8", &mut dice), None);
    assert_eq!(roll_hp_formula("", &mut dice), None);
}

#[test]
fn modifiers() {
    assert_eq!(init_from_dex(16), 3);
    assert_eq!(init_from_dex(10), 0);
    assert_eq!(ability_mod(9), -1);
    assert_eq!(ability_mod(1), -5);
    assert_eq!(ability_mod(30), 10);
}

#[test]
fn form_inputs() {
    assert_eq!(parse_init_input("17/2"), Some((Some(17), 2)));
    assert_eq!(parse_init_input(" -1 "), Some((None, -1)));
    assert_eq!(parse_init_input("x"), None);
    assert_eq!(parse_hp_input("6/10"), Some((6, 10)));
    assert_eq!(parse_hp_input("12/10"), Some((10, 10)));
    assert_eq!(parse_hp_input("10"), Some((10, 10)));
    assert_eq!(parse_hp_input("-3/10"), Some((0, 10)));
    assert_eq!(parse_hp_input("5/-1"), None);
}

proptest! {
    #[test]
    fn clamp_stays_in_range(current in -1000i64..1000, max in 1u32..500) {
        let hp = clamp_hp(current, max);
        prop_assert!(hp <= max);
        if (0..=i64::from(max)).contains(&current) {
            prop_assert_eq!(i64::from(hp), current);
        }
    }

    #[test]
    fn formula_rolls_within_bounds(n in 1u32..10, s in 1u32..20, k in 0i64..10, seed in any::<u64>()) {
        let mut dice = Dice::from_seed(seed);
        let hp = roll_hp_formula(&format!("{n}d{s}+{k}"), &mut dice).unwrap();
        let lo = i64::from(n) + k;
        let hi = i64::from(n * s) + k;
        prop_assert!((lo..=hi).contains(&i64::from(hp)));
    }
}
