use crate::sat::formula::assignment::{Assignment, DecisionLevel, Reason, GROUND_LEVEL};
use crate::sat::formula::clause::{ClauseAllocator, CRef};
use crate::sat::formula::{Lit, Var, VarMap};

#[derive(PartialEq, Eq, Clone, Copy)]
pub enum CCMinMode {
    None,
    Basic,
    Deep,
}

impl Default for CCMinMode {
    fn default() -> Self {
        CCMinMode::Deep
    }
}

#[derive(PartialEq, Eq, Clone, Copy)]
enum Seen {
    Undef,
    Source,
    Removable,
    Failed,
}

/// The outcome of analyzing a conflict.
pub enum Conflict {
    /// The conflict persists at the top level: the formula is UNSAT.
    Ground,
    /// The learnt clause is a single literal, asserted at level 0.
    Unit(Lit),
    /// A multi-literal learnt clause, asserted at `backtrack_level` with the
    /// given literals (asserting literal first).
    Learned(DecisionLevel, Vec<Lit>),
}

/// Returns the literals of the "reason clause" for a propagated variable,
/// synthesizing the implicit two-literal clause for a binary reason.
fn reason_lits(ca: &ClauseAllocator, assigns: &Assignment, v: Var, reason: Reason) -> Vec<Lit> {
    match reason {
        Reason::Decision => Vec::new(),
        Reason::Clause(cr) => ca.view(cr).lits().to_vec(),
        Reason::Binary(other) => {
            // The propagated literal itself, plus the implicant that forced it.
            let lit = if assigns.is_assigned_pos(v.pos_lit()) { v.pos_lit() } else { v.neg_lit() };
            vec![lit, other]
        }
    }
}

/// Per-conflict working state for 1-UIP analysis, LBD computation and
/// learnt-clause minimization.
pub struct AnalyzeContext {
    ccmin_mode: CCMinMode,
    seen: VarMap<Seen>,
    analyze_toclear: Vec<Lit>,
    pub max_literals: u64,
    pub tot_literals: u64,
}

impl AnalyzeContext {
    pub fn new(ccmin_mode: CCMinMode) -> AnalyzeContext {
        AnalyzeContext {
            ccmin_mode,
            seen: VarMap::new(),
            analyze_toclear: Vec::new(),
            max_literals: 0,
            tot_literals: 0,
        }
    }

    pub fn init_var(&mut self, v: Var) {
        self.seen.insert(&v, Seen::Undef);
    }

    /// 1-UIP conflict analysis. `confl` is the literals of the violated
    /// clause (already assembled by the caller, which synthesizes the
    /// implicit binary clause for `BINARY_CONFLICT`). `bump_var`/`bump_cla`
    /// are called to update VSIDS/clause activity as literals are resolved.
    pub fn analyze<FV: FnMut(Var), FC: FnMut(CRef)>(
        &mut self,
        ca: &ClauseAllocator,
        assigns: &Assignment,
        confl0: &[Lit],
        mut bump_var: FV,
        mut bump_cla: FC,
    ) -> Conflict {
        let cur_level = assigns.decision_level();
        let mut learnt: Vec<Lit> = vec![Lit::default_placeholder()]; // reserved slot for the asserting literal
        let mut path_c = 0i32;
        let mut p: Option<Lit> = None;
        let mut clause: Vec<Lit> = confl0.to_vec();

        let trail = full_trail(assigns);
        let mut idx = trail.len();

        loop {
            for &q in clause.iter().filter(|&&q| Some(q) != p) {
                let v = q.var();
                if self.seen[&v] == Seen::Undef && assigns.level(v) > GROUND_LEVEL {
                    bump_var(v);
                    self.seen.insert(&v, Seen::Source);
                    if assigns.level(v) >= cur_level {
                        path_c += 1;
                    } else {
                        learnt.push(q);
                    }
                }
            }

            // find the next seen variable walking the trail backward
            loop {
                idx -= 1;
                let lit = trail[idx];
                if self.seen[&lit.var()] != Seen::Undef {
                    p = Some(lit);
                    break;
                }
            }

            let pv = p.unwrap().var();
            self.seen.insert(&pv, Seen::Undef);
            path_c -= 1;

            if path_c <= 0 {
                break;
            }

            clause = match assigns.reason(pv) {
                Reason::Clause(cr) => {
                    bump_cla(cr);
                    ca.view(cr).lits()[1..].to_vec()
                }
                Reason::Binary(other) => vec![other],
                Reason::Decision => Vec::new(),
            };
        }

        let asserting = !p.unwrap();
        learnt[0] = asserting;
        self.max_literals += learnt.len() as u64;

        self.analyze_toclear = learnt.clone();
        if self.ccmin_mode != CCMinMode::None {
            self.minimize(ca, assigns, &mut learnt);
        }
        self.tot_literals += learnt.len() as u64;

        // `analyze_toclear` holds every variable `seen` was set for above,
        // including ones visited only transitively while checking
        // redundancy and ones `minimize` swap-removed from `learnt` itself
        // — not just what survived into the final clause.
        for &lit in &self.analyze_toclear {
            self.seen.insert(&lit.var(), Seen::Undef);
        }
        self.analyze_toclear.clear();

        if learnt.len() == 1 {
            if cur_level == GROUND_LEVEL {
                Conflict::Ground
            } else {
                Conflict::Unit(learnt[0])
            }
        } else {
            // move the literal at the second-highest level to index 1
            let mut max_i = 1;
            let mut max_level = assigns.level(learnt[1].var());
            for i in 2..learnt.len() {
                let lvl = assigns.level(learnt[i].var());
                if lvl > max_level {
                    max_level = lvl;
                    max_i = i;
                }
            }
            learnt.swap(1, max_i);
            Conflict::Learned(max_level, learnt)
        }
    }

    fn minimize(&mut self, ca: &ClauseAllocator, assigns: &Assignment, learnt: &mut Vec<Lit>) {
        let mut i = 1;
        while i < learnt.len() {
            let v = learnt[i].var();
            let redundant = match assigns.reason(v) {
                Reason::Decision => false,
                _ => {
                    if self.ccmin_mode == CCMinMode::Deep {
                        self.lit_redundant(ca, assigns, v)
                    } else {
                        self.lit_redundant_basic(ca, assigns, v)
                    }
                }
            };
            if redundant {
                learnt.swap_remove(i);
            } else {
                i += 1;
            }
        }
    }

    fn lit_redundant_basic(&self, ca: &ClauseAllocator, assigns: &Assignment, v: Var) -> bool {
        let reason = reason_lits(ca, assigns, v, assigns.reason(v));
        reason.iter().skip(1).all(|&q| {
            assigns.level(q.var()) == GROUND_LEVEL || self.seen[&q.var()] != Seen::Undef
        })
    }

    /// Iterative (explicit-stack) redundancy check: a literal is redundant
    /// if every non-level-0 literal in its reason clause is itself already
    /// in the learnt clause or transitively redundant. Every variable
    /// `seen` is set for along the way is recorded in `analyze_toclear` so
    /// `analyze` can find it again when clearing `seen` at the end of the
    /// conflict, whether or not it ends up in the learnt clause.
    fn lit_redundant(&mut self, ca: &ClauseAllocator, assigns: &Assignment, v0: Var) -> bool {
        let top = self.analyze_toclear.len();
        let mut stack = vec![v0];

        while let Some(v) = stack.pop() {
            let reason = reason_lits(ca, assigns, v, assigns.reason(v));
            for &q in reason.iter().skip(1) {
                let qv = q.var();
                if self.seen[&qv] == Seen::Undef && assigns.level(qv) > GROUND_LEVEL {
                    match assigns.reason(qv) {
                        Reason::Decision => {
                            for &lit in &self.analyze_toclear[top..] {
                                self.seen.insert(&lit.var(), Seen::Undef);
                            }
                            self.analyze_toclear.truncate(top);
                            return false;
                        }
                        _ => {
                            self.seen.insert(&qv, Seen::Removable);
                            self.analyze_toclear.push(q);
                            stack.push(qv);
                        }
                    }
                }
            }
        }
        true
    }

    /// Computes the Literal Block Distance of a learnt clause: the number
    /// of distinct decision levels (> 0) among its literals.
    pub fn compute_lbd(&mut self, assigns: &Assignment, lits: &[Lit]) -> u32 {
        self.analyze_toclear.clear();
        let mut count = 0u32;
        let mut marked: Vec<DecisionLevel> = Vec::new();
        for &lit in lits {
            let lvl = assigns.level(lit.var());
            if lvl > GROUND_LEVEL && !marked.contains(&lvl) {
                marked.push(lvl);
                count += 1;
            }
        }
        count
    }

    /// Minimal subset of assumption literals responsible for a conflict
    /// while attempting to satisfy them (used to report UNSAT under
    /// assumptions).
    pub fn analyze_final(
        &mut self,
        ca: &ClauseAllocator,
        assigns: &Assignment,
        p: Lit,
    ) -> crate::sat::formula::LitMap<()> {
        let mut conflict = crate::sat::formula::LitMap::new();
        conflict.insert(&p, ());

        if assigns.decision_level() == GROUND_LEVEL {
            return conflict;
        }

        self.seen.insert(&p.var(), Seen::Source);

        let trail = full_trail(assigns);
        let ground = assigns.number_of_ground_assigns();
        for i in (ground..trail.len()).rev() {
            let v = trail[i].var();
            if self.seen[&v] == Seen::Source {
                match assigns.reason(v) {
                    Reason::Decision => {
                        conflict.insert(&!trail[i], ());
                    }
                    Reason::Clause(cr) => {
                        for &q in &ca.view(cr).lits()[1..] {
                            if assigns.level(q.var()) > GROUND_LEVEL {
                                self.seen.insert(&q.var(), Seen::Source);
                            }
                        }
                    }
                    Reason::Binary(other) => {
                        if assigns.level(other.var()) > GROUND_LEVEL {
                            self.seen.insert(&other.var(), Seen::Source);
                        }
                    }
                }
                self.seen.insert(&v, Seen::Undef);
            }
        }
        self.seen.insert(&p.var(), Seen::Undef);

        conflict
    }
}

fn full_trail(assigns: &Assignment) -> Vec<Lit> {
    assigns.trail_above(GROUND_LEVEL).to_vec()
}

trait LitDefault {
    fn default_placeholder() -> Self;
}

impl LitDefault for Lit {
    fn default_placeholder() -> Self {
        Var::from_index(0).pos_lit()
    }
}
