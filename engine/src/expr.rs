//! Dice expressions: `2d6+3`, `d20v+5`, `1d20c+5 >= 15 : 2d6+3`, `1d6 x3, d8`.
//!
//! The grammar is deliberately flat: signed terms joined by `+`/`-`, an
//! optional `>`/`>=` check, and an optional follow-up expression rolled only
//! when the check succeeds. Batches (`x N`) and comma lists are expanded into
//! plain expressions before parsing.

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::error::DiceError;
use crate::{AdMode, RandomSource};

pub const MAX_DICE: u32 = 1000;
pub const MAX_SIDES: u32 = 100_000;
pub const MAX_BATCH: u32 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiceTerm {
    pub count: u32,
    pub sides: u32,
    pub mode: AdMode,
    pub crit: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermKind {
    Dice(DiceTerm),
    Constant(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Term {
    pub negative: bool,
    pub kind: TermKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Greater,
    AtLeast,
}

impl Comparison {
    pub fn holds(self, total: i64, threshold: i64) -> bool {
        match self {
            Comparison::Greater => total > threshold,
            Comparison::AtLeast => total >= threshold,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Comparison::Greater => ">",
            Comparison::AtLeast => ">=",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    pub op: Comparison,
    pub threshold: i64,
    /// Rolled as-is when the check succeeds, with dice doubled on a crit.
    pub follow: Option<Vec<Term>>,
}

/// A parsed single expression (no batch multiplier, no commas).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    pub terms: Vec<Term>,
    pub check: Option<Check>,
}

/// Result of evaluating one expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollOutcome {
    /// Primary total, clamped at 0.
    pub total: i64,
    pub breakdown: String,
    /// `None` when the expression has no check.
    pub success: Option<bool>,
    /// First term carried `c` and one of its kept dice hit the maximum.
    pub crit: bool,
    /// Total of the follow-up expression, when it was rolled.
    pub follow_total: Option<i64>,
}

impl Expression {
    pub fn parse(src: &str) -> Result<Self, DiceError> {
        let mut parser = Parser::new(src);
        let expr = parser.expression()?;
        Ok(expr)
    }

    pub fn evaluate<R: RandomSource + ?Sized>(&self, rng: &mut R) -> RollOutcome {
        let primary = roll_terms(&self.terms, rng);
        let total = primary.sum.max(0);
        let mut breakdown = format!("{} = {}", primary.text, primary.sum);
        if primary.sum < 0 {
            breakdown.push_str(" -> 0");
        }

        let Some(check) = &self.check else {
            return RollOutcome {
                total,
                breakdown,
                success: None,
                crit: primary.crit,
                follow_total: None,
            };
        };

        let success = check.op.holds(total, check.threshold);
        breakdown.push_str(&format!(
            " {} {} {}",
            check.op.symbol(),
            check.threshold,
            if success { "ok" } else { "ko" }
        ));
        if primary.crit {
            breakdown.push_str(" crit");
        }

        let mut follow_total = None;
        if let (true, Some(follow)) = (success, &check.follow) {
            let terms = if primary.crit {
                double_dice(follow)
            } else {
                follow.clone()
            };
            let rolled = roll_terms(&terms, rng);
            let value = rolled.sum.max(0);
            breakdown.push_str(&format!(" -> {} = {}", rolled.text, rolled.sum));
            if rolled.sum < 0 {
                breakdown.push_str(" -> 0");
            }
            follow_total = Some(value);
        }

        RollOutcome {
            total,
            breakdown,
            success: Some(success),
            crit: primary.crit,
            follow_total,
        }
    }
}

impl FromStr for Expression {
    type Err = DiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Expression::parse(s)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TermKind::Constant(n) => write!(f, "{n}"),
            TermKind::Dice(d) => write!(f, "{}", dice_label(&d)),
        }
    }
}

fn write_terms(f: &mut fmt::Formatter<'_>, terms: &[Term]) -> fmt::Result {
    for (i, term) in terms.iter().enumerate() {
        match (i, term.negative) {
            (0, true) => write!(f, "-")?,
            (0, false) => {}
            (_, true) => write!(f, "-")?,
            (_, false) => write!(f, "+")?,
        }
        write!(f, "{term}")?;
    }
    Ok(())
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_terms(f, &self.terms)?;
        if let Some(check) = &self.check {
            write!(f, " {} {}", check.op.symbol(), check.threshold)?;
            if let Some(follow) = &check.follow {
                write!(f, " : ")?;
                write_terms(f, follow)?;
            }
        }
        Ok(())
    }
}

/// Parse and evaluate a single expression.
pub fn roll_expression<R: RandomSource + ?Sized>(
    src: &str,
    rng: &mut R,
) -> Result<RollOutcome, DiceError> {
    let expr = Expression::parse(src)?;
    let out = expr.evaluate(rng);
    debug!(expression = src, total = out.total, "rolled dice expression");
    Ok(out)
}

/// Split a trailing batch multiplier: `"1d20+5 > 10 x3"` -> `("1d20+5 > 10", 3)`.
pub fn parse_batch(input: &str) -> Result<(String, u32), DiceError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(DiceError::syntax("empty expression"));
    }
    if let Some(at) = s.rfind(['x', 'X']) {
        let suffix = s[at + 1..].trim();
        if suffix.is_empty() {
            return Err(DiceError::syntax("missing batch multiplier after 'x'"));
        }
        if suffix.bytes().all(|b| b.is_ascii_digit()) {
            let head = s[..at].trim_end();
            if head.is_empty() {
                return Err(DiceError::syntax("missing expression before batch multiplier"));
            }
            let times: u32 = suffix
                .parse()
                .map_err(|_| DiceError::syntax(format!("batch multiplier too large: {suffix}")))?;
            if times == 0 || times > MAX_BATCH {
                return Err(DiceError::syntax(format!(
                    "batch multiplier must be in 1..={MAX_BATCH}, got {times}"
                )));
            }
            return Ok((head.to_string(), times));
        }
    }
    Ok((s.to_string(), 1))
}

/// Expand `"1d1x2,d2"` into `["1d1", "1d1", "d2"]`, preserving order.
pub fn expand_input(input: &str) -> Result<Vec<String>, DiceError> {
    let mut out = Vec::new();
    for part in input.split(',') {
        if part.trim().is_empty() {
            return Err(DiceError::syntax("empty expression in comma list"));
        }
        let (expr, times) = parse_batch(part)?;
        out.extend(std::iter::repeat_n(expr, times as usize));
    }
    Ok(out)
}

fn dice_label(d: &DiceTerm) -> String {
    let mut label = format!("{}d{}", d.count, d.sides);
    match d.mode {
        AdMode::Advantage => label.push('v'),
        AdMode::Disadvantage => label.push('s'),
        AdMode::Normal => {}
    }
    if d.crit {
        label.push('c');
    }
    label
}

/// Crit follow-up: every dice term rolls twice as many dice. The doubled
/// count may reach `2 * MAX_DICE`; the parse limit applies to written terms.
fn double_dice(terms: &[Term]) -> Vec<Term> {
    terms
        .iter()
        .map(|t| match t.kind {
            TermKind::Dice(d) => Term {
                negative: t.negative,
                kind: TermKind::Dice(DiceTerm { count: d.count * 2, ..d }),
            },
            TermKind::Constant(_) => *t,
        })
        .collect()
}

struct Rolled {
    sum: i64,
    text: String,
    crit: bool,
}

fn roll_terms<R: RandomSource + ?Sized>(terms: &[Term], rng: &mut R) -> Rolled {
    let mut sum = 0i64;
    let mut text = String::new();
    let mut crit = false;

    for (i, term) in terms.iter().enumerate() {
        let (value, rendered) = match term.kind {
            TermKind::Constant(n) => (i64::from(n), n.to_string()),
            TermKind::Dice(d) => {
                let mut faces = Vec::with_capacity(d.count as usize);
                let mut value = 0i64;
                let mut hit_max = false;
                for _ in 0..d.count {
                    let kept = match d.mode {
                        AdMode::Normal => {
                            let face = rng.die(d.sides);
                            hit_max |= face == d.sides;
                            faces.push(face.to_string());
                            face
                        }
                        mode => {
                            let a = rng.die(d.sides);
                            let b = rng.die(d.sides);
                            // a discarded maximum still counts toward the crit
                            hit_max |= a == d.sides || b == d.sides;
                            let kept = mode.choose(a, b);
                            faces.push(format!("{a}/{b}={kept}"));
                            kept
                        }
                    };
                    value += i64::from(kept);
                }
                if i == 0 && d.crit && hit_max {
                    crit = true;
                }
                let sep = if d.mode == AdMode::Normal { "+" } else { " + " };
                (value, format!("{}({})", dice_label(&d), faces.join(sep)))
            }
        };

        match (i, term.negative) {
            (0, true) => text.push('-'),
            (0, false) => {}
            (_, true) => text.push_str(" - "),
            (_, false) => text.push_str(" + "),
        }
        text.push_str(&rendered);
        if term.negative {
            sum -= value;
        } else {
            sum += value;
        }
    }

    Rolled { sum, text, crit }
}

struct Parser<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src: src.as_bytes(), pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn eat(&mut self, b: u8) -> bool {
        if self.peek() == Some(b) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.bump();
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn unexpected(&self) -> DiceError {
        match self.peek() {
            Some(b) => DiceError::syntax(format!(
                "unexpected '{}' at position {}",
                b as char,
                self.pos + 1
            )),
            None => DiceError::syntax("unexpected end of expression"),
        }
    }

    /// Unsigned decimal number; `None` when no digit is present.
    fn number(&mut self) -> Result<Option<u32>, DiceError> {
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.bump();
        }
        if start == self.pos {
            return Ok(None);
        }
        let digits = std::str::from_utf8(&self.src[start..self.pos]).unwrap_or_default();
        digits
            .parse::<u32>()
            .map(Some)
            .map_err(|_| DiceError::syntax(format!("number too large: {digits}")))
    }

    fn expression(&mut self) -> Result<Expression, DiceError> {
        self.skip_ws();
        if self.at_end() {
            return Err(DiceError::syntax("empty expression"));
        }
        let terms = self.terms()?;
        self.skip_ws();

        let mut check = None;
        if self.eat(b'>') {
            let op = if self.eat(b'=') {
                Comparison::AtLeast
            } else {
                Comparison::Greater
            };
            self.skip_ws();
            let threshold = self.threshold()?;
            self.skip_ws();
            let colon = self.eat(b':');
            self.skip_ws();
            let follow = if self.at_end() {
                if colon {
                    return Err(DiceError::syntax("missing follow-up expression after ':'"));
                }
                None
            } else {
                let follow = self.terms()?;
                self.skip_ws();
                Some(follow)
            };
            check = Some(Check { op, threshold, follow });
        }

        if !self.at_end() {
            return Err(self.unexpected());
        }
        Ok(Expression { terms, check })
    }

    fn threshold(&mut self) -> Result<i64, DiceError> {
        let negative = if self.eat(b'-') {
            true
        } else {
            self.eat(b'+');
            false
        };
        match self.number()? {
            Some(n) if negative => Ok(-i64::from(n)),
            Some(n) => Ok(i64::from(n)),
            None => Err(DiceError::syntax("invalid threshold")),
        }
    }

    fn terms(&mut self) -> Result<Vec<Term>, DiceError> {
        let mut terms = vec![self.term(true)?];
        loop {
            self.skip_ws();
            let negative = match self.peek() {
                Some(b'+') => false,
                Some(b'-') => true,
                _ => break,
            };
            self.bump();
            self.skip_ws();
            let mut term = self.term(false)?;
            term.negative = negative;
            terms.push(term);
        }
        Ok(terms)
    }

    fn term(&mut self, allow_sign: bool) -> Result<Term, DiceError> {
        let mut negative = false;
        if allow_sign {
            match self.peek() {
                Some(b'-') => {
                    negative = true;
                    self.bump();
                }
                Some(b'+') => self.bump(),
                _ => {}
            }
        }

        let count = self.number()?;
        if !matches!(self.peek(), Some(b'd' | b'D')) {
            return match count {
                Some(n) => Ok(Term { negative, kind: TermKind::Constant(n) }),
                None => Err(match self.peek() {
                    Some(b'+' | b'-') | None => DiceError::syntax("missing term"),
                    Some(_) => self.unexpected(),
                }),
            };
        }
        self.bump();

        let count = count.unwrap_or(1);
        if count == 0 || count > MAX_DICE {
            return Err(DiceError::syntax(format!(
                "dice count must be in 1..={MAX_DICE}, got {count}"
            )));
        }
        let sides = self
            .number()?
            .ok_or_else(|| DiceError::syntax("missing die faces after 'd'"))?;
        if sides == 0 || sides > MAX_SIDES {
            return Err(DiceError::syntax(format!(
                "die faces must be in 1..={MAX_SIDES}, got {sides}"
            )));
        }

        let mut mode = AdMode::Normal;
        let mut crit = false;
        while let Some(b) = self.peek() {
            match b.to_ascii_lowercase() {
                b'v' | b's' if mode != AdMode::Normal => {
                    return Err(DiceError::syntax("only one of 'v' or 's' per die term"));
                }
                b'v' => mode = AdMode::Advantage,
                b's' => mode = AdMode::Disadvantage,
                b'c' if crit => return Err(DiceError::syntax("duplicate 'c' suffix")),
                b'c' => crit = true,
                _ => break,
            }
            self.bump();
        }

        Ok(Term {
            negative,
            kind: TermKind::Dice(DiceTerm { count, sides, mode, crit }),
        })
    }
}
