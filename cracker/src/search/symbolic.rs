//! Bit-vector terms over a single 32-bit seed variable.
//!
//! Terms live in an arena and are hash-consed, so the same subterm always gets
//! the same id and operands always have smaller ids than the terms using them.
//! Operations on constants are folded while building.

use std::collections::HashMap;

use mersenne::{
    INIT_MULTIPLIER, LOWER_MASK, MATRIX_A, SHIFT_SIZE, STATE_SIZE, TEMPER_B, TEMPER_C, UPPER_MASK,
};

use crate::search::TwistModel;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TermId(u32);

impl TermId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Term {
    Seed,
    Const(u32),
    Xor(TermId, TermId),
    And(TermId, TermId),
    Or(TermId, TermId),
    Shl(TermId, u32),
    Lshr(TermId, u32),
    Add(TermId, TermId),
    Mul(TermId, TermId),
    /// The constant if the low bit of the operand is set, zero otherwise.
    LowBitSelect(TermId, u32),
}

fn apply(term: Term, value: impl Fn(TermId) -> u32, seed: u32) -> u32 {
    match term {
        Term::Seed => seed,
        Term::Const(c) => c,
        Term::Xor(a, b) => value(a) ^ value(b),
        Term::And(a, b) => value(a) & value(b),
        Term::Or(a, b) => value(a) | value(b),
        Term::Shl(a, s) => value(a) << s,
        Term::Lshr(a, s) => value(a) >> s,
        Term::Add(a, b) => value(a).wrapping_add(value(b)),
        Term::Mul(a, b) => value(a).wrapping_mul(value(b)),
        Term::LowBitSelect(a, k) => {
            if value(a) & 1 != 0 {
                k
            } else {
                0
            }
        }
    }
}

#[derive(Default)]
pub struct Formula {
    terms: Vec<Term>,
    interned: HashMap<Term, TermId>,
}

impl Formula {
    pub fn new() -> Self {
        Formula::default()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn term(&self, id: TermId) -> Term {
        self.terms[id.index()]
    }

    pub fn as_const(&self, id: TermId) -> Option<u32> {
        match self.term(id) {
            Term::Const(c) => Some(c),
            _ => None,
        }
    }

    fn intern(&mut self, term: Term) -> TermId {
        if let Some(&id) = self.interned.get(&term) {
            return id;
        }
        let id = TermId(self.terms.len() as u32);
        self.terms.push(term);
        self.interned.insert(term, id);
        id
    }

    /// Interns `term`, folding it to a constant when every operand is one.
    fn build(&mut self, term: Term, operands: &[TermId]) -> TermId {
        if operands.iter().all(|&id| self.as_const(id).is_some()) {
            let folded = apply(term, |id| self.as_const(id).unwrap_or(0), 0);
            return self.constant(folded);
        }
        self.intern(term)
    }

    pub fn seed(&mut self) -> TermId {
        self.intern(Term::Seed)
    }

    pub fn constant(&mut self, value: u32) -> TermId {
        self.intern(Term::Const(value))
    }

    pub fn xor(&mut self, a: TermId, b: TermId) -> TermId {
        match (self.as_const(a), self.as_const(b)) {
            (Some(0), _) => b,
            (_, Some(0)) => a,
            _ => self.build(Term::Xor(a, b), &[a, b]),
        }
    }

    pub fn and(&mut self, a: TermId, b: TermId) -> TermId {
        match (self.as_const(a), self.as_const(b)) {
            (Some(0), _) | (_, Some(0)) => self.constant(0),
            _ => self.build(Term::And(a, b), &[a, b]),
        }
    }

    pub fn or(&mut self, a: TermId, b: TermId) -> TermId {
        match (self.as_const(a), self.as_const(b)) {
            (Some(0), _) => b,
            (_, Some(0)) => a,
            _ => self.build(Term::Or(a, b), &[a, b]),
        }
    }

    pub fn shl(&mut self, a: TermId, shift: u32) -> TermId {
        match shift {
            0 => a,
            s if s >= 32 => self.constant(0),
            s => self.build(Term::Shl(a, s), &[a]),
        }
    }

    pub fn lshr(&mut self, a: TermId, shift: u32) -> TermId {
        match shift {
            0 => a,
            s if s >= 32 => self.constant(0),
            s => self.build(Term::Lshr(a, s), &[a]),
        }
    }

    pub fn add(&mut self, a: TermId, b: TermId) -> TermId {
        match (self.as_const(a), self.as_const(b)) {
            (Some(0), _) => b,
            (_, Some(0)) => a,
            _ => self.build(Term::Add(a, b), &[a, b]),
        }
    }

    pub fn mul(&mut self, a: TermId, b: TermId) -> TermId {
        self.build(Term::Mul(a, b), &[a, b])
    }

    pub fn low_bit_select(&mut self, a: TermId, constant: u32) -> TermId {
        self.build(Term::LowBitSelect(a, constant), &[a])
    }

    /// Evaluates `root` with the seed variable set to `seed`. Meant for tests
    /// and one-off checks; use `Program` in loops.
    pub fn eval(&self, root: TermId, seed: u32) -> u32 {
        Program::compile(self, &[root]).run(seed)[0]
    }
}

/// The terms needed for a fixed set of roots, flattened into evaluation order.
pub struct Program {
    ops: Vec<Term>,
    roots: Vec<usize>,
}

impl Program {
    pub fn compile(formula: &Formula, roots: &[TermId]) -> Program {
        let mut needed = vec![false; formula.len()];
        for root in roots {
            needed[root.index()] = true;
        }
        // operands always precede their users, so one backward sweep suffices
        for id in (0..formula.len()).rev() {
            if !needed[id] {
                continue;
            }
            match formula.terms[id] {
                Term::Seed | Term::Const(_) => {}
                Term::Shl(a, _) | Term::Lshr(a, _) | Term::LowBitSelect(a, _) => {
                    needed[a.index()] = true
                }
                Term::Xor(a, b) | Term::And(a, b) | Term::Or(a, b) | Term::Add(a, b) | Term::Mul(a, b) => {
                    needed[a.index()] = true;
                    needed[b.index()] = true;
                }
            }
        }

        let mut slot = vec![usize::max_value(); formula.len()];
        let mut ops = Vec::new();
        for (id, &term) in formula.terms.iter().enumerate() {
            if !needed[id] {
                continue;
            }
            let remap = |t: TermId| TermId(slot[t.index()] as u32);
            let op = match term {
                Term::Seed | Term::Const(_) => term,
                Term::Xor(a, b) => Term::Xor(remap(a), remap(b)),
                Term::And(a, b) => Term::And(remap(a), remap(b)),
                Term::Or(a, b) => Term::Or(remap(a), remap(b)),
                Term::Shl(a, s) => Term::Shl(remap(a), s),
                Term::Lshr(a, s) => Term::Lshr(remap(a), s),
                Term::Add(a, b) => Term::Add(remap(a), remap(b)),
                Term::Mul(a, b) => Term::Mul(remap(a), remap(b)),
                Term::LowBitSelect(a, k) => Term::LowBitSelect(remap(a), k),
            };
            slot[id] = ops.len();
            ops.push(op);
        }
        let roots = roots.iter().map(|root| slot[root.index()]).collect();
        Program { ops, roots }
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Values of the roots, in the order they were given to `compile`.
    pub fn run(&self, seed: u32) -> Vec<u32> {
        let mut scratch = Vec::with_capacity(self.ops.len());
        self.run_into(seed, &mut scratch);
        self.roots.iter().map(|&root| scratch[root]).collect()
    }

    /// True if every root evaluates to the matching entry of `expected`.
    pub fn satisfies(&self, seed: u32, expected: &[u32], scratch: &mut Vec<u32>) -> bool {
        self.run_into(seed, scratch);
        self.roots
            .iter()
            .zip(expected)
            .all(|(&root, &value)| scratch[root] == value)
    }

    fn run_into(&self, seed: u32, scratch: &mut Vec<u32>) {
        scratch.clear();
        for &op in &self.ops {
            let value = apply(op, |id| scratch[id.index()], seed);
            scratch.push(value);
        }
    }
}

/// Symbolically executes initialization, optionally the first twist, and
/// tempering for each draw index. Every index must be below `STATE_SIZE`.
pub fn encode_draws(formula: &mut Formula, indices: &[u32], model: TwistModel) -> Vec<TermId> {
    encode_words(formula, indices, model)
        .into_iter()
        .map(|word| temper(formula, word))
        .collect()
}

/// The state words behind each draw index, before tempering.
pub fn encode_words(formula: &mut Formula, indices: &[u32], model: TwistModel) -> Vec<TermId> {
    assert!(indices.iter().all(|&i| (i as usize) < STATE_SIZE));

    let mut words = Vec::with_capacity(STATE_SIZE);
    words.push(formula.seed());
    let multiplier = formula.constant(INIT_MULTIPLIER);
    for i in 1..STATE_SIZE {
        let prev = words[i - 1];
        let shifted = formula.lshr(prev, 30);
        let mixed = formula.xor(prev, shifted);
        let scaled = formula.mul(mixed, multiplier);
        let offset = formula.constant(i as u32);
        words.push(formula.add(scaled, offset));
    }

    if model == TwistModel::FirstTwist {
        let last = indices.iter().map(|&i| i as usize).max().unwrap_or(0);
        let upper = formula.constant(UPPER_MASK);
        let lower = formula.constant(LOWER_MASK);
        // in place and in order, like the concrete twist
        for i in 0..=last {
            let high = formula.and(words[i], upper);
            let low = formula.and(words[(i + 1) % STATE_SIZE], lower);
            let y = formula.or(high, low);
            let half = formula.lshr(y, 1);
            let mag = formula.low_bit_select(y, MATRIX_A);
            let mixed = formula.xor(words[(i + SHIFT_SIZE) % STATE_SIZE], half);
            words[i] = formula.xor(mixed, mag);
        }
    }

    indices.iter().map(|&i| words[i as usize]).collect()
}

pub fn temper(formula: &mut Formula, y: TermId) -> TermId {
    let b = formula.constant(TEMPER_B);
    let c = formula.constant(TEMPER_C);

    let s = formula.lshr(y, 11);
    let y = formula.xor(y, s);
    let s = formula.shl(y, 7);
    let s = formula.and(s, b);
    let y = formula.xor(y, s);
    let s = formula.shl(y, 15);
    let s = formula.and(s, c);
    let y = formula.xor(y, s);
    let s = formula.lshr(y, 18);
    formula.xor(y, s)
}
