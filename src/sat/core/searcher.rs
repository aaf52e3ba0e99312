pub mod analyze;
pub mod backtrack;
pub mod bve;
pub mod clause_db;
pub mod decision;
mod luby;
mod random;
pub mod restart;
pub mod watch;

use log::{debug, info};

use crate::sat::formula::assignment::{Reason, GROUND_LEVEL};
use crate::sat::formula::clause::{ClauseAllocator, ClauseGC, CRef, BINARY_CONFLICT, INVALID};
use crate::sat::formula::{LBool, Lit, LitMap, Var};

use crate::sat::core::budget::Budget;
use analyze::{AnalyzeContext, CCMinMode, Conflict};
use backtrack::BacktrackableFormula;
use clause_db::{ClauseDb, ClauseDbSettings};
use decision::{DecisionHeuristic, DecisionHeuristicSettings};
use restart::{RestartController, RestartSettings};

#[derive(Clone)]
pub struct LearningSettings {
    pub min_learnts_lim: i32,
    pub size_factor: f64,
    pub size_inc: f64,
    pub size_adjust_start_confl: i32,
    pub size_adjust_inc: f64,
}

impl Default for LearningSettings {
    fn default() -> Self {
        LearningSettings {
            min_learnts_lim: 0,
            size_factor: 1.0 / 3.0,
            size_inc: 1.1,
            size_adjust_start_confl: 100,
            size_adjust_inc: 1.5,
        }
    }
}

/// Tracks the sliding cap on the number of learnt clauses kept around
/// before the reducer kicks in, growing it over time as minisat does.
struct LearningGuard {
    settings: LearningSettings,
    max_learnts: f64,
    size_adjust_confl: f64,
    size_adjust_cnt: i32,
}

impl LearningGuard {
    fn new(settings: LearningSettings) -> LearningGuard {
        LearningGuard {
            settings,
            max_learnts: 0.0,
            size_adjust_confl: 0.0,
            size_adjust_cnt: 0,
        }
    }

    fn reset(&mut self, num_clauses: usize) {
        self.max_learnts = (num_clauses as f64) * self.settings.size_factor;
        if self.max_learnts < self.settings.min_learnts_lim as f64 {
            self.max_learnts = self.settings.min_learnts_lim as f64;
        }
        self.size_adjust_confl = self.settings.size_adjust_start_confl as f64;
        self.size_adjust_cnt = self.settings.size_adjust_start_confl;
    }

    fn notify_conflict(&mut self) {
        self.size_adjust_cnt -= 1;
        if self.size_adjust_cnt == 0 {
            self.size_adjust_confl *= self.settings.size_adjust_inc;
            self.size_adjust_cnt = self.size_adjust_confl as i32;
            self.max_learnts *= self.settings.size_inc;
        }
    }

    fn border(&self) -> f64 {
        self.max_learnts
    }
}

/// Guards against redundantly re-running top-level unit propagation
/// simplification when nothing has changed since the last pass.
struct SimplifyGuard {
    simp_db_assigns: Option<usize>,
    simp_db_props: u64,
}

impl SimplifyGuard {
    fn new() -> SimplifyGuard {
        SimplifyGuard {
            simp_db_assigns: None,
            simp_db_props: 0,
        }
    }

    fn skip(&self, num_assigns: usize, propagations: u64) -> bool {
        Some(num_assigns) == self.simp_db_assigns || propagations < self.simp_db_props
    }

    fn set_next(&mut self, num_assigns: usize, propagations: u64) {
        self.simp_db_assigns = Some(num_assigns);
        self.simp_db_props = propagations;
    }
}

pub enum AddClauseRes {
    UnSAT,
    Consumed,
    Added(CRef),
}

pub enum SearchRes {
    UnSAT(crate::sat::Stats),
    SAT(crate::sat::formula::assignment::Assignment, crate::sat::Stats),
    Interrupted(f64, Box<Searcher>),
}

#[derive(Clone)]
pub struct SearcherSettings {
    pub garbage_frac: f64,
    pub chronological_backtrack: bool,
}

impl Default for SearcherSettings {
    fn default() -> Self {
        SearcherSettings {
            garbage_frac: 0.20,
            chronological_backtrack: false,
        }
    }
}

enum ConflictOutcome {
    /// Conflict persisted with no remaining decisions: the formula is UNSAT.
    UnSAT,
    /// A learnt clause was added and the trail backtracked; keep propagating.
    Continue,
    /// A restart was triggered after learning.
    Restarted,
}

/// Assembles the literals of the clause violated by `confl`, reconstructing
/// the implicit two-literal clause when the binary-watch shortcut was
/// responsible instead of an arena-resident clause.
fn conflict_lits(ca: &ClauseAllocator, bt: &BacktrackableFormula, confl: CRef) -> Vec<Lit> {
    if confl == BINARY_CONFLICT {
        let (a, b) = bt.watches.binary_conflict_lits();
        vec![a, b]
    } else {
        ca.view(confl).lits().to_vec()
    }
}

/// Bundles per-run search state: clause database, decision heuristic,
/// conflict analyzer, restart controller and the simplification/learning
/// guards. Kept separate from `BacktrackableFormula` so each can be
/// borrowed disjointly from the other.
struct SearchCtx {
    db: ClauseDb,
    heur: DecisionHeuristic,
    analyze: AnalyzeContext,
    restart: RestartController,
    learn: LearningGuard,
    simp: SimplifyGuard,
    solves: u64,
    restarts: u64,
    decisions: u64,
    conflicts: u64,
}

impl SearchCtx {
    fn new(
        db_set: ClauseDbSettings,
        heur_set: DecisionHeuristicSettings,
        ccmin_mode: CCMinMode,
        restart_set: RestartSettings,
        learn_set: LearningSettings,
    ) -> SearchCtx {
        SearchCtx {
            db: ClauseDb::new(db_set),
            heur: DecisionHeuristic::new(heur_set),
            analyze: AnalyzeContext::new(ccmin_mode),
            restart: RestartController::new(restart_set),
            learn: LearningGuard::new(learn_set),
            simp: SimplifyGuard::new(),
            solves: 0,
            restarts: 0,
            decisions: 0,
            conflicts: 0,
        }
    }

    fn init_var(&mut self, v: Var, upol: Option<bool>, dvar: bool) {
        self.heur.init_var(v, upol, dvar);
        self.analyze.init_var(v);
    }
}

/// The CDCL search driver: decide, propagate, analyze, learn, backtrack,
/// restart and periodically reduce the learnt database, bound by a
/// `Budget` of conflicts/propagations.
pub struct Searcher {
    settings: SearcherSettings,
    bt: BacktrackableFormula,
    ctx: SearchCtx,
}

impl Searcher {
    pub fn new(
        settings: SearcherSettings,
        restart_set: RestartSettings,
        learn_set: LearningSettings,
        db_set: ClauseDbSettings,
        heur_set: DecisionHeuristicSettings,
        ccmin_mode: CCMinMode,
    ) -> Searcher {
        Searcher {
            settings,
            bt: BacktrackableFormula::new(),
            ctx: SearchCtx::new(db_set, heur_set, ccmin_mode, restart_set, learn_set),
        }
    }

    pub fn number_of_vars(&self) -> usize {
        self.bt.assigns.number_of_vars()
    }

    pub fn number_of_clauses(&self) -> usize {
        self.ctx.db.stats.num_clauses as usize
    }

    /// Preallocates arena storage for about `num_clauses` more clauses,
    /// assuming a typical CNF clause width.
    pub fn reserve(&mut self, num_clauses: usize) {
        const ASSUMED_AVG_LITS: usize = 3;
        self.bt.ca.reserve(num_clauses, ASSUMED_AVG_LITS);
    }

    pub fn new_var(&mut self, upol: Option<bool>, dvar: bool) -> Var {
        let v = self.bt.new_var();
        self.ctx.init_var(v, upol, dvar);
        v
    }

    /// Adds an original (non-learnt) clause: deduplicates literals, drops
    /// tautologies and already-satisfied clauses, propagates immediately if
    /// it becomes unit, and routes exactly-two-literal clauses through the
    /// binary-watch shortcut instead of the arena.
    pub fn add_clause(&mut self, clause: &[Lit]) -> AddClauseRes {
        let mut lits = clause.to_vec();
        lits.sort();
        lits.dedup();
        for w in lits.windows(2) {
            if w[0] == !w[1] {
                return AddClauseRes::Consumed; // tautology
            }
        }

        let mut out = Vec::with_capacity(lits.len());
        for &lit in &lits {
            match self.bt.assigns.of_lit(lit) {
                LBool::True => return AddClauseRes::Consumed,
                LBool::False => {}
                LBool::Undef => out.push(lit),
            }
        }

        match out.len() {
            0 => {
                self.ctx.db.record_unsat();
                AddClauseRes::UnSAT
            }
            1 => {
                self.bt.assigns.assign_lit(out[0], Reason::Decision);
                match self.bt.propagate() {
                    Some(_) => {
                        self.ctx.db.record_unsat();
                        AddClauseRes::UnSAT
                    }
                    None => AddClauseRes::Consumed,
                }
            }
            2 => {
                self.bt.attach_binary(out[0], out[1]);
                self.ctx.db.stats.num_clauses += 1;
                self.ctx.db.stats.clauses_literals += 2;
                AddClauseRes::Consumed
            }
            _ => {
                let cr = self.ctx.db.add_clause(&mut self.bt.ca, &out);
                if cr == INVALID {
                    // Arena exhausted: the clause is lost. `ClauseDb` has
                    // already latched `exhausted`, which forces the next
                    // reported SAT/UNSAT down to `SolveResult::Interrupted`
                    // so this never surfaces as a wrong answer.
                    return AddClauseRes::Consumed;
                }
                self.bt.attach_clause(cr);
                AddClauseRes::Added(cr)
            }
        }
    }

    /// Runs propagation once, without entering the search loop. Returns
    /// `false` if a conflict at the ground level was found (UNSAT).
    pub fn preprocess(&mut self) -> bool {
        self.bt.propagate().is_none()
    }

    /// Direct access to the trail/arena/watches, for bounded variable
    /// elimination to run between `preprocess` and `search`.
    pub fn formula_mut(&mut self) -> &mut BacktrackableFormula {
        &mut self.bt
    }

    pub fn formula_and_db_mut(&mut self) -> (&mut BacktrackableFormula, &mut ClauseDb) {
        (&mut self.bt, &mut self.ctx.db)
    }

    pub fn search(mut self, budget: &Budget, assumptions: &[Lit]) -> SearchRes {
        info!("============================[ Search Statistics ]============================");
        info!("| Conflicts |          ORIGINAL         |          LEARNT          | Progress |");
        info!("|           |    Vars  Clauses Literals |    Limit  Clauses Lit/Cl |          |");
        info!("===============================================================================");
        self.ctx.solves += 1;
        self.ctx.learn.reset(self.ctx.db.stats.num_clauses as usize);

        loop {
            match self.search_loop(budget, assumptions) {
                Ok(Some(true)) => {
                    let stats = self.stats();
                    return SearchRes::SAT(self.bt.assigns, stats);
                }
                Ok(Some(false)) => return SearchRes::UnSAT(self.stats()),
                Ok(None) => continue, // restart: re-enter the loop from the ground level
                Err(progress) => return SearchRes::Interrupted(progress, Box::new(self)),
            }
        }
    }

    pub fn stats(&self) -> crate::sat::Stats {
        crate::sat::Stats {
            solves: self.ctx.solves,
            restarts: self.ctx.restarts,
            decisions: self.ctx.decisions,
            rnd_decisions: self.ctx.heur.rnd_decisions,
            conflicts: self.ctx.conflicts,
            propagations: self.bt.propagations(),
            tot_literals: self.ctx.analyze.tot_literals,
            max_literals: self.ctx.analyze.max_literals,
            num_clauses: self.ctx.db.stats.num_clauses,
            num_learnts: self.ctx.db.stats.num_learnts,
            arena_exhausted: self.ctx.db.exhausted(),
        }
    }

    /// Runs until SAT (`Ok(Some(true))`), UNSAT (`Ok(Some(false))`), a
    /// restart is due (`Ok(None)`), or the budget is exhausted (`Err`).
    fn search_loop(&mut self, budget: &Budget, assumptions: &[Lit]) -> Result<Option<bool>, f64> {
        loop {
            let confl = self.bt.propagate();
            if let Some(cr) = confl {
                match self.handle_conflict(cr) {
                    ConflictOutcome::UnSAT => return Ok(Some(false)),
                    ConflictOutcome::Restarted => return Ok(None),
                    ConflictOutcome::Continue => {}
                }
            } else {
                if !budget.within(self.ctx.conflicts, self.bt.propagations()) {
                    return Err(crate::sat::formula::assignment::progress_estimate(&self.bt.assigns));
                }

                self.try_simplify();

                if (self.ctx.db.number_of_learnts() as f64) - (self.bt.assigns.number_of_assigns() as f64)
                    >= self.ctx.learn.border()
                {
                    let mut detached = Vec::new();
                    self.ctx.db.reduce(&mut self.bt.ca, &self.bt.assigns, |cr| detached.push(cr));
                    for cr in detached {
                        self.bt.lazy_detach(cr);
                    }
                    self.try_garbage_collect();
                }

                match self.decide(assumptions) {
                    Ok(None) => return Ok(Some(true)),
                    Ok(Some(lit)) => {
                        self.ctx.decisions += 1;
                        self.bt.push_decision(lit);
                    }
                    Err(_conflicting_assumptions) => return Ok(Some(false)),
                }
            }
        }
    }

    /// Analyzes a conflict, learns the resulting clause, backtracks, and
    /// checks whether a restart is now due.
    fn handle_conflict(&mut self, confl: CRef) -> ConflictOutcome {
        self.ctx.conflicts += 1;
        self.ctx.learn.notify_conflict();
        if self.bt.is_ground_level() {
            self.ctx.db.record_unsat();
            return ConflictOutcome::UnSAT;
        }

        let lits = conflict_lits(&self.bt.ca, &self.bt, confl);

        let mut bumped_clauses: Vec<CRef> = Vec::new();
        let outcome = {
            let heur = &mut self.ctx.heur;
            let analyze = &mut self.ctx.analyze;
            analyze.analyze(
                &self.bt.ca,
                &self.bt.assigns,
                &lits,
                |v| heur.bump_activity(v),
                |cr| bumped_clauses.push(cr),
            )
        };
        for cr in bumped_clauses {
            self.ctx.db.bump_activity(&mut self.bt.ca, cr);
        }
        self.ctx.heur.decay_activity();
        self.ctx.db.decay_activity();

        let (level, learnt, lbd) = match outcome {
            Conflict::Ground => {
                self.ctx.db.record_unsat();
                return ConflictOutcome::UnSAT;
            }
            Conflict::Unit(lit) => (GROUND_LEVEL, vec![lit], 1u32),
            Conflict::Learned(level, lits) => {
                let lbd = self.ctx.analyze.compute_lbd(&self.bt.assigns, &lits);
                (level, lits, lbd)
            }
        };

        {
            let heur = &mut self.ctx.heur;
            self.bt.backtrack_to(level, self.settings.chronological_backtrack, |l| heur.cancel(l));
        }

        match learnt.len() {
            1 => {
                self.bt.assigns.assign_lit(learnt[0], Reason::Decision);
            }
            2 => {
                self.bt.attach_binary(learnt[0], learnt[1]);
                self.bt.assigns.assign_lit(learnt[0], Reason::Binary(learnt[1]));
                self.ctx.db.stats.num_learnts += 1;
                self.ctx.db.stats.learnts_literals += 2;
            }
            _ => {
                let cr = self.ctx.db.learn_clause(&mut self.bt.ca, &learnt, lbd);
                if cr == INVALID {
                    // Arena exhausted: fall back to asserting the literal
                    // with no backing reason clause. Propagation stays
                    // sound either way; `exhausted` forces the final
                    // answer down to `SolveResult::Interrupted`.
                    self.bt.assigns.assign_lit(learnt[0], Reason::Decision);
                } else {
                    self.bt.attach_clause(cr);
                    self.bt.assigns.assign_lit(learnt[0], Reason::Clause(cr));
                }
            }
        }

        if self.ctx.restart.record_conflict(lbd, self.bt.assigns.number_of_assigns()) {
            let heur = &mut self.ctx.heur;
            self.bt.backtrack_to(GROUND_LEVEL, false, |l| heur.cancel(l));
            self.ctx.restart.notify_restart(self.bt.assigns.number_of_assigns());
            self.ctx.restarts += 1;
            ConflictOutcome::Restarted
        } else {
            ConflictOutcome::Continue
        }
    }

    fn decide(&mut self, assumptions: &[Lit]) -> Result<Option<Lit>, LitMap<()>> {
        loop {
            let level = self.bt.assigns.decision_level().offset();
            if level >= assumptions.len() {
                return Ok(self.ctx.heur.pick_branch_lit(&self.bt.assigns));
            }
            let p = assumptions[level];
            match self.bt.assigns.of_lit(p) {
                LBool::True => {
                    self.bt.assigns.new_decision_level();
                }
                LBool::False => {
                    let conflict = self.ctx.analyze.analyze_final(&self.bt.ca, &self.bt.assigns, !p);
                    return Err(conflict);
                }
                LBool::Undef => return Ok(Some(p)),
            }
        }
    }

    fn try_simplify(&mut self) {
        if !self.bt.is_ground_level() || self.ctx.simp.skip(self.bt.assigns.number_of_assigns(), self.bt.propagations()) {
            return;
        }

        let mut detached = Vec::new();
        self.ctx.db.remove_satisfied(&mut self.bt.ca, &self.bt.assigns, |cr| detached.push(cr));
        for cr in detached {
            self.bt.lazy_detach(cr);
        }
        self.try_garbage_collect();
        self.ctx.heur.rebuild_order_heap(&self.bt.assigns);
        self.ctx.simp.set_next(self.bt.assigns.number_of_assigns(), self.bt.propagations());
    }

    fn try_garbage_collect(&mut self) {
        if self.bt.ca.check_garbage(self.settings.garbage_frac) {
            self.garbage_collect();
        }
    }

    fn garbage_collect(&mut self) {
        let before = self.bt.ca.size();
        let mut to = ClauseAllocator::new_for_gc(&self.bt.ca);
        {
            let mut gc = ClauseGC::new(&self.bt.ca, &mut to);
            self.bt.reloc_gc(&mut gc);
            self.ctx.db.gc(&mut gc);
        }
        self.bt.ca = to;
        debug!("garbage collection: {} -> {} bytes", before, self.bt.ca.size());
    }
}
