pub mod core;
pub mod dimacs;
pub mod drat;
pub mod formula;

use std::fs::File;

use drat::DratWriter;
use formula::assignment::Assignment;
use formula::{Lit, LitMap, Var, VarMap};

/// Aggregate run statistics, reported by both `CoreSolver` and `SimpSolver`
/// after a `solve` call.
#[derive(Default, Clone, Copy)]
pub struct Stats {
    pub solves: u64,
    pub restarts: u64,
    pub decisions: u64,
    pub rnd_decisions: u64,
    pub conflicts: u64,
    pub propagations: u64,
    pub tot_literals: u64,
    pub max_literals: u64,
    pub num_clauses: u64,
    pub num_learnts: u64,
    /// Set once the clause arena's capacity ceiling was reached and a
    /// clause had to be dropped; any SAT/UNSAT answer reported alongside
    /// this is not trustworthy; `CoreSolver`/`SimpSolver` downgrade such a
    /// result to `SolveResult::Interrupted` rather than report it.
    pub arena_exhausted: bool,
}

/// The outcome of a top-level `solve_limited` call.
pub enum SolveResult {
    UnSAT,
    SAT,
    Interrupted,
}

/// Common surface shared by `CoreSolver` (bare CDCL) and `SimpSolver` (CDCL
/// plus bounded variable elimination). `dimacs::parse` is generic over this
/// trait so both solver flavors can be driven by the same DIMACS reader.
pub trait Solver {
    fn new_var(&mut self, upol: Option<bool>, dvar: bool) -> Var;
    fn num_vars(&self) -> usize;
    fn num_clauses(&self) -> usize {
        self.stats().num_clauses as usize
    }
    fn add_clause(&mut self, clause: &[Lit]) -> bool;
    fn solve_limited(&mut self, assumptions: &[Lit]) -> SolveResult;
    fn is_ok(&self) -> bool;
    fn model(&self) -> Option<&VarMap<bool>>;
    fn conflict(&self) -> &LitMap<()>;
    fn stats(&self) -> Stats;

    /// Starts emitting a DRAT proof of every learnt-clause addition and
    /// deletion from here on. A no-op for solver flavors that don't route
    /// clause events through a `ClauseDb` (none currently).
    fn set_proof(&mut self, _writer: DratWriter<File>) {}

    /// Preallocates clause-arena storage for roughly `num_clauses` more
    /// clauses, given a known or declared problem size (e.g. a DIMACS
    /// header). Purely an optimization hint; a no-op by default.
    fn reserve_clauses(&mut self, _num_clauses: usize) {}

    fn solve(&mut self) -> bool {
        matches!(self.solve_limited(&[]), SolveResult::SAT)
    }
}

pub(crate) fn assignment_model(assigns: &Assignment) -> VarMap<bool> {
    formula::util::extract_model(assigns)
}
