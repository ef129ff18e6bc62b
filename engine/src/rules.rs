//! Small 5e rules used by the roster: initiative from dex, HP formulas and
//! HP clamping.

use crate::RandomSource;

pub const MAX_FORMULA_DICE: u32 = 200;
pub const MAX_FORMULA_SIDES: u32 = 10_000;

/// Initiative modifier for a dexterity score.
pub fn init_from_dex(dex: i32) -> i32 {
    dex / 2 - 5
}

/// Ability modifier with floor semantics, used by stat blocks.
pub fn ability_mod(score: i64) -> i64 {
    score.div_euclid(2) - 5
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HpFormula {
    pub count: u32,
    pub sides: u32,
    pub modifier: i64,
}

impl HpFormula {
    /// Parse `NdM`, `NdM+K` or `NdM - K`. Whitespace is allowed around each
    /// token. Out-of-bounds formulas are rejected.
    pub fn parse(formula: &str) -> Option<Self> {
        let s = formula.trim();
        let at = s.find(['d', 'D'])?;
        let count = digits(s[..at].trim_end())?;

        let rest = s[at + 1..].trim_start();
        let split = rest.find(['+', '-']).unwrap_or(rest.len());
        let sides = digits(rest[..split].trim_end())?;

        let modifier = match rest[split..].chars().next() {
            None => 0,
            Some(sign) => {
                let k = i64::from(digits(rest[split + 1..].trim())?);
                if sign == '-' { -k } else { k }
            }
        };

        let in_bounds = (1..=MAX_FORMULA_DICE).contains(&count)
            && (1..=MAX_FORMULA_SIDES).contains(&sides);
        in_bounds.then_some(Self { count, sides, modifier })
    }

    pub fn roll<R: RandomSource + ?Sized>(&self, rng: &mut R) -> u32 {
        let dice: i64 = (0..self.count).map(|_| i64::from(rng.die(self.sides))).sum();
        u32::try_from((dice + self.modifier).max(0)).unwrap_or(u32::MAX)
    }
}

fn digits(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Roll an HP formula; `None` when it is not of the supported shape.
pub fn roll_hp_formula<R: RandomSource + ?Sized>(formula: &str, rng: &mut R) -> Option<u32> {
    HpFormula::parse(formula).map(|f| f.roll(rng))
}

/// Clamp `current` into `[0, max]`; a zero max means unknown and leaves it alone.
pub fn clamp_hp(current: i64, max: u32) -> u32 {
    let floor = current.max(0);
    let value = if max > 0 { floor.min(i64::from(max)) } else { floor };
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// `"17/2"` -> roll 17 with base 2; `"3"` -> base 3 without a roll.
pub fn parse_init_input(input: &str) -> Option<(Option<i32>, i32)> {
    let s = input.trim();
    match s.split_once('/') {
        Some((roll, base)) => {
            let roll = roll.trim().parse().ok()?;
            let base = base.trim().parse().ok()?;
            Some((Some(roll), base))
        }
        None => s.parse().ok().map(|base| (None, base)),
    }
}

/// `"6/10"` -> current 6, max 10; `"10"` -> 10/10. Current is clamped to max.
pub fn parse_hp_input(input: &str) -> Option<(u32, u32)> {
    let s = input.trim();
    let (current, max): (i64, i64) = match s.split_once('/') {
        Some((cur, max)) => (cur.trim().parse().ok()?, max.trim().parse().ok()?),
        None => {
            let max = s.parse().ok()?;
            (max, max)
        }
    };
    if max < 0 {
        return None;
    }
    let max = u32::try_from(max).ok()?;
    Some((clamp_hp(current, max), max))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formula_accepts_spacing_and_case() {
        assert_eq!(
            HpFormula::parse(" 3 D 8 - 2 "),
            Some(HpFormula { count: 3, sides: 8, modifier: -2 })
        );
        assert_eq!(HpFormula::parse("2d10+4").map(|f| f.modifier), Some(4));
    }

    #[test]
    fn formula_rejects_out_of_bounds() {
        for bad in ["0d6", "1d0", "201d6", "1d10001", "d6", "2d", "2d6+", "2x6", "abc", "+2d6", "2d6+-1"] {
            assert_eq!(HpFormula::parse(bad), None, "{bad}");
        }
    }

    #[test]
    fn dex_modifier_truncates() {
        assert_eq!(init_from_dex(14), 2);
        assert_eq!(init_from_dex(9), -1);
        assert_eq!(init_from_dex(1), -5);
    }
}
