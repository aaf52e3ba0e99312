pub mod budget;
pub mod searcher;

use std::fs::File;

use log::info;

use crate::sat::drat::DratWriter;
use crate::sat::formula::{Lit, LitMap, Var, VarMap};
use crate::sat::{SolveResult, Solver, Stats};

use budget::Budget;
use searcher::analyze::CCMinMode;
use searcher::bve::elim_clauses::ElimClauses;
use searcher::bve::{Bve, BveSettings};
use searcher::clause_db::ClauseDbSettings;
use searcher::decision::DecisionHeuristicSettings;
use searcher::restart::RestartSettings;
use searcher::{AddClauseRes, LearningSettings, SearchRes, Searcher, SearcherSettings};

#[derive(Clone)]
pub struct CoreSettings {
    pub searcher: SearcherSettings,
    pub restart: RestartSettings,
    pub learn: LearningSettings,
    pub db: ClauseDbSettings,
    pub heur: DecisionHeuristicSettings,
    pub ccmin_mode: CCMinMode,
}

impl Default for CoreSettings {
    fn default() -> Self {
        CoreSettings {
            searcher: SearcherSettings::default(),
            restart: RestartSettings::default(),
            learn: LearningSettings::default(),
            db: ClauseDbSettings::default(),
            heur: DecisionHeuristicSettings::default(),
            ccmin_mode: CCMinMode::default(),
        }
    }
}

/// Bare CDCL solver: a `Searcher` plus the bookkeeping needed to present it
/// as a `Solver` across repeated `add_clause`/`solve_limited` calls. The
/// `Searcher` itself is moved out and back in across a solve call (it is
/// consumed by `search` and either resolved to a terminal result or handed
/// back wrapped in `SearchRes::Interrupted` when the budget runs out).
pub struct CoreSolver {
    budget: Budget,
    searcher: Option<Box<Searcher>>,
    ok: bool,
    model: Option<VarMap<bool>>,
    conflict: LitMap<()>,
    /// Stats snapshot taken right before `searcher` is replaced by a fresh
    /// dummy on reporting SAT, so `stats()` still reflects the run that
    /// found the model rather than the empty placeholder.
    final_stats: Option<Stats>,
}

impl CoreSolver {
    pub fn new(settings: CoreSettings) -> CoreSolver {
        let searcher = Searcher::new(
            settings.searcher,
            settings.restart,
            settings.learn,
            settings.db,
            settings.heur,
            settings.ccmin_mode,
        );
        CoreSolver {
            budget: Budget::new(),
            searcher: Some(Box::new(searcher)),
            ok: true,
            model: None,
            conflict: LitMap::new(),
            final_stats: None,
        }
    }

    pub fn set_conflict_budget(&mut self, n: i64) {
        self.budget.set_conflict_budget(n);
    }

    pub fn set_propagation_budget(&mut self, n: i64) {
        self.budget.set_propagation_budget(n);
    }

    pub fn interrupt(&self) {
        self.budget.interrupt();
    }

    /// Runs one round of top-level unit propagation without searching.
    /// Returns `false` if the empty clause was derived.
    pub fn preprocess(&mut self) -> bool {
        if !self.ok {
            return false;
        }
        let result = self.searcher_mut().preprocess();
        if !result {
            self.ok = false;
        }
        result
    }

    fn searcher_mut(&mut self) -> &mut Searcher {
        self.searcher.as_mut().expect("searcher missing between calls")
    }

    /// Adds a clause and reports exactly what happened to it, so callers
    /// that need the backing `CRef` (bounded variable elimination) can see
    /// it; ordinary `Solver::add_clause` callers only need the boolean.
    fn add_clause_ref(&mut self, clause: &[Lit]) -> AddClauseRes {
        if !self.ok {
            return AddClauseRes::UnSAT;
        }
        let res = self.searcher_mut().add_clause(clause);
        if let AddClauseRes::UnSAT = res {
            self.ok = false;
        }
        res
    }
}

impl Solver for CoreSolver {
    fn new_var(&mut self, upol: Option<bool>, dvar: bool) -> Var {
        self.searcher_mut().new_var(upol, dvar)
    }

    fn num_vars(&self) -> usize {
        self.searcher.as_ref().expect("searcher missing between calls").number_of_vars()
    }

    fn add_clause(&mut self, clause: &[Lit]) -> bool {
        !matches!(self.add_clause_ref(clause), AddClauseRes::UnSAT)
    }

    fn solve_limited(&mut self, assumptions: &[Lit]) -> SolveResult {
        if !self.ok {
            return SolveResult::UnSAT;
        }
        self.model = None;
        let searcher = self.searcher.take().expect("searcher missing between calls");
        match searcher.search(&self.budget, assumptions) {
            SearchRes::SAT(assigns, stats) => {
                self.final_stats = Some(stats);
                // The searcher that found this model is consumed; a solver
                // that has reported SAT once is done (this crate does not
                // support pushing further assumptions after a model is
                // found). Snapshot its stats before replacing it with an
                // empty placeholder so `stats()` still reports this run.
                self.searcher = Some(Box::new(Searcher::new(
                    SearcherSettings::default(),
                    RestartSettings::default(),
                    LearningSettings::default(),
                    ClauseDbSettings::default(),
                    DecisionHeuristicSettings::default(),
                    CCMinMode::default(),
                )));
                if stats.arena_exhausted {
                    log::warn!("reporting SAT as indeterminate: clause arena was exhausted mid-search");
                    SolveResult::Interrupted
                } else {
                    self.model = Some(crate::sat::assignment_model(&assigns));
                    SolveResult::SAT
                }
            }
            SearchRes::UnSAT(stats) => {
                self.final_stats = Some(stats);
                if stats.arena_exhausted {
                    log::warn!("reporting UNSAT as indeterminate: clause arena was exhausted mid-search");
                    self.searcher = Some(Box::new(Searcher::new(
                        SearcherSettings::default(),
                        RestartSettings::default(),
                        LearningSettings::default(),
                        ClauseDbSettings::default(),
                        DecisionHeuristicSettings::default(),
                        CCMinMode::default(),
                    )));
                    SolveResult::Interrupted
                } else {
                    self.ok = false;
                    SolveResult::UnSAT
                }
            }
            SearchRes::Interrupted(progress, searcher) => {
                info!("interrupted at {:.3}% progress", progress * 100.0);
                self.searcher = Some(searcher);
                SolveResult::Interrupted
            }
        }
    }

    fn is_ok(&self) -> bool {
        self.ok
    }

    fn model(&self) -> Option<&VarMap<bool>> {
        self.model.as_ref()
    }

    fn conflict(&self) -> &LitMap<()> {
        &self.conflict
    }

    fn stats(&self) -> Stats {
        match self.final_stats {
            Some(s) => s,
            None => self.searcher.as_ref().expect("searcher missing between calls").stats(),
        }
    }

    fn set_proof(&mut self, writer: DratWriter<File>) {
        let (_, db) = self.searcher_mut().formula_and_db_mut();
        db.set_proof(writer);
    }

    fn reserve_clauses(&mut self, num_clauses: usize) {
        self.searcher_mut().reserve(num_clauses);
    }
}

#[derive(Clone)]
pub struct SimpSettings {
    pub core: CoreSettings,
    pub bve: BveSettings,
    pub extend_model: bool,
    /// Run variable elimination only on the first `solve`/preprocess call,
    /// matching the teacher's `use_simplification` toggle: incremental
    /// solving after the first answer disables further elimination so
    /// previously-frozen assumption variables stay meaningful.
    pub simp_once: bool,
    /// Whether bounded variable elimination runs at all; unit propagation
    /// preprocessing always runs regardless of this flag.
    pub use_elim: bool,
}

impl Default for SimpSettings {
    fn default() -> Self {
        SimpSettings {
            core: CoreSettings::default(),
            bve: BveSettings::default(),
            extend_model: true,
            simp_once: true,
            use_elim: true,
        }
    }
}

/// `CoreSolver` plus a resolution-only bounded variable elimination pass,
/// run once before the first `solve_limited` call.
///
/// Binary clauses never enter the arena (they live only in the watch
/// lists), so this crate's occurrence-list-based eliminator cannot see
/// them; both of a binary clause's variables are frozen on arrival instead
/// of being offered to the elimination queue, trading away a slice of
/// elimination power for soundness without having to special-case binary
/// resolution throughout `Bve`.
pub struct SimpSolver {
    settings: SimpSettings,
    core: CoreSolver,
    bve: Bve,
    elim_clauses: ElimClauses,
    simplified: bool,
}

impl SimpSolver {
    pub fn new(settings: SimpSettings) -> SimpSolver {
        let extend_model = settings.extend_model;
        SimpSolver {
            core: CoreSolver::new(settings.core.clone()),
            bve: Bve::new(settings.bve.clone()),
            elim_clauses: ElimClauses::new(extend_model),
            settings,
            simplified: false,
        }
    }

    pub fn freeze_var(&mut self, v: Var) {
        self.bve.freeze_var(v);
    }

    fn run_elimination(&mut self) -> bool {
        if self.simplified && self.settings.simp_once {
            return true;
        }
        if !self.core.preprocess() {
            return false;
        }
        if !self.settings.use_elim {
            self.simplified = true;
            return true;
        }
        let searcher = self.core.searcher_mut();
        let (bt, db) = searcher.formula_and_db_mut();
        let ok = self.bve.eliminate(bt, db, &mut self.elim_clauses);
        self.simplified = true;
        self.elim_clauses.log_size();
        ok
    }
}

impl Solver for SimpSolver {
    fn new_var(&mut self, upol: Option<bool>, dvar: bool) -> Var {
        let v = self.core.new_var(upol, dvar);
        self.bve.init_var(v);
        v
    }

    fn num_vars(&self) -> usize {
        self.core.num_vars()
    }

    fn add_clause(&mut self, clause: &[Lit]) -> bool {
        match self.core.add_clause_ref(clause) {
            AddClauseRes::UnSAT => false,
            AddClauseRes::Consumed => {
                if clause.len() == 2 {
                    self.bve.freeze_var(clause[0].var());
                    self.bve.freeze_var(clause[1].var());
                }
                true
            }
            AddClauseRes::Added(cr) => {
                let bt = self.core.searcher_mut().formula_mut();
                let lits = bt.ca.view(cr).lits().to_vec();
                self.bve.observe_clause(&lits, cr, &bt.assigns);
                true
            }
        }
    }

    fn solve_limited(&mut self, assumptions: &[Lit]) -> SolveResult {
        for &lit in assumptions {
            self.bve.freeze_var(lit.var());
        }
        if !self.run_elimination() {
            return SolveResult::UnSAT;
        }
        let result = self.core.solve_limited(assumptions);
        if let SolveResult::SAT = result {
            if let Some(model) = self.core.model.clone() {
                let mut extended = model;
                self.elim_clauses.extend(&mut extended);
                self.core.model = Some(extended);
            }
        }
        result
    }

    fn is_ok(&self) -> bool {
        self.core.is_ok()
    }

    fn model(&self) -> Option<&VarMap<bool>> {
        self.core.model()
    }

    fn conflict(&self) -> &LitMap<()> {
        self.core.conflict()
    }

    fn stats(&self) -> Stats {
        self.core.stats()
    }

    fn set_proof(&mut self, writer: DratWriter<File>) {
        self.core.set_proof(writer);
    }

    fn reserve_clauses(&mut self, num_clauses: usize) {
        self.core.reserve_clauses(num_clauses);
    }
}
