use super::clause::{ClauseGC, CRef};
use super::{LBool, Lit, Var, VarVec};

#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Debug)]
pub struct DecisionLevel(pub usize);

pub const GROUND_LEVEL: DecisionLevel = DecisionLevel(0);

impl DecisionLevel {
    #[inline]
    pub fn offset(&self) -> usize {
        self.0
    }
}

/// Provenance of a trail literal. See DESIGN.md's "binary-conflict reason
/// reconstruction" entry: this three-way type is a deliberate departure
/// from overloading a single `CRef` sentinel for both "no reason" and "a
/// binary-clause reason", which the two meanings cannot be told apart from.
#[derive(Clone, Copy)]
pub enum Reason {
    Decision,
    Clause(CRef),
    Binary(Lit),
}

impl Reason {
    #[inline]
    pub fn is_decision(&self) -> bool {
        matches!(self, Reason::Decision)
    }
}

#[derive(Clone, Copy)]
struct VarLine {
    value: LBool,
    level: DecisionLevel,
    reason: Reason,
    polarity: bool,
}

impl Default for VarLine {
    fn default() -> Self {
        VarLine {
            value: LBool::Undef,
            level: GROUND_LEVEL,
            reason: Reason::Decision,
            polarity: true,
        }
    }
}

/// The assignment trail: a stack of literals made true, grouped into
/// decision levels, with per-variable value/level/reason/phase state.
pub struct Assignment {
    vars: VarVec<VarLine>,
    trail: Vec<Lit>,
    lim: Vec<usize>,
    qhead: usize,
}

impl Assignment {
    pub fn new() -> Assignment {
        Assignment {
            vars: VarVec::new(),
            trail: Vec::new(),
            lim: Vec::new(),
            qhead: 0,
        }
    }

    pub fn new_var(&mut self) -> Var {
        let index = self.vars.len();
        let var = Var::from_index(index);
        self.vars.init(&var);
        var
    }

    #[inline]
    pub fn number_of_vars(&self) -> usize {
        self.vars.len()
    }

    #[inline]
    pub fn number_of_assigns(&self) -> usize {
        self.trail.len()
    }

    #[inline]
    pub fn number_of_ground_assigns(&self) -> usize {
        *self.lim.first().unwrap_or(&self.trail.len())
    }

    #[inline]
    pub fn decision_level(&self) -> DecisionLevel {
        DecisionLevel(self.lim.len())
    }

    #[inline]
    pub fn is_ground_level(&self) -> bool {
        self.lim.is_empty()
    }

    pub fn new_decision_level(&mut self) {
        self.lim.push(self.trail.len());
    }

    #[inline]
    pub fn value(&self, var: Var) -> LBool {
        self.vars[var].value
    }

    #[inline]
    pub fn of_lit(&self, lit: Lit) -> LBool {
        lit.apply_sign(self.vars[lit.var()].value)
    }

    #[inline]
    pub fn is_undef(&self, var: Var) -> bool {
        self.vars[var].value == LBool::Undef
    }

    #[inline]
    pub fn is_assigned_pos(&self, lit: Lit) -> bool {
        lit.is_pos_at(self.vars[lit.var()].value)
    }

    #[inline]
    pub fn is_assigned_neg(&self, lit: Lit) -> bool {
        lit.is_neg_at(self.vars[lit.var()].value)
    }

    #[inline]
    pub fn level(&self, var: Var) -> DecisionLevel {
        self.vars[var].level
    }

    #[inline]
    pub fn reason(&self, var: Var) -> Reason {
        self.vars[var].reason
    }

    #[inline]
    pub fn polarity(&self, var: Var) -> bool {
        self.vars[var].polarity
    }

    pub fn assign_lit(&mut self, lit: Lit, reason: Reason) {
        debug_assert!(self.is_undef(lit.var()));
        let line = &mut self.vars[lit.var()];
        line.value = lit.pos_assignment();
        line.level = DecisionLevel(self.lim.len());
        line.reason = reason;
        self.trail.push(lit);
    }

    /// Rewinds the trail to `level`, clearing assignments above it. Calls
    /// `f` once per unassigned literal (in the reverse order they were
    /// pushed) so the decision heuristic can reinsert the freed variable
    /// into the order heap and update its saved polarity.
    pub fn backtrack_to<F: FnMut(Lit)>(&mut self, level: DecisionLevel, mut f: F) {
        if self.lim.len() <= level.offset() {
            return;
        }
        let target = self.lim[level.offset()];
        while self.trail.len() > target {
            let lit = self.trail.pop().unwrap();
            let line = &mut self.vars[lit.var()];
            line.polarity = !lit.sign();
            line.value = LBool::Undef;
            line.reason = Reason::Decision;
            f(lit);
        }
        self.lim.truncate(level.offset());
        self.qhead = self.trail.len();
    }

    #[inline]
    pub fn dequeue(&mut self) -> Option<Lit> {
        if self.qhead < self.trail.len() {
            let lit = self.trail[self.qhead];
            self.qhead += 1;
            Some(lit)
        } else {
            None
        }
    }

    #[inline]
    pub fn qhead(&self) -> usize {
        self.qhead
    }

    #[inline]
    pub fn is_fully_propagated(&self) -> bool {
        self.qhead == self.trail.len()
    }

    /// Trail literals assigned at or above `level`, in assignment order.
    pub fn trail_above(&self, level: DecisionLevel) -> &[Lit] {
        if level.offset() >= self.lim.len() {
            &[]
        } else {
            &self.trail[self.lim[level.offset()]..]
        }
    }

    pub fn is_reason_for(&self, cr: CRef, var: Var) -> bool {
        matches!(self.reason(var), Reason::Clause(r) if r == cr)
    }

    pub fn reloc_gc(&mut self, gc: &mut ClauseGC) {
        for i in 0..self.vars.len() {
            let var = Var::from_index(i);
            if let Reason::Clause(cr) = self.vars[var].reason {
                self.vars[var].reason = match gc.relocate(cr) {
                    Some(new_cr) => Reason::Clause(new_cr),
                    None => Reason::Decision,
                };
            }
        }
    }
}

/// Weighted by the fraction of variables assigned at each level depth,
/// deeper levels counting for exponentially less. Used only to surface a
/// rough "how far along is this run" figure in progress logging.
pub fn progress_estimate(assignment: &Assignment) -> f64 {
    let n = assignment.number_of_vars() as f64;
    if n == 0.0 {
        return 0.0;
    }
    let mut acc = 0.0;
    let mut denom = 1.0;
    let mut prev = 0usize;
    for level in 0..assignment.lim_len() {
        let hi = assignment.lim_at(level);
        let count = hi - prev;
        acc += (count as f64) / denom;
        denom *= 2.0;
        prev = hi;
    }
    let tail = assignment.number_of_assigns() - prev;
    acc += (tail as f64) / denom;
    acc / n
}

impl Assignment {
    #[inline]
    fn lim_len(&self) -> usize {
        self.lim.len()
    }

    #[inline]
    fn lim_at(&self, i: usize) -> usize {
        self.lim[i]
    }
}
