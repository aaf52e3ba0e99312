use std::io::{BufReader, Cursor};

use satcore::sat::core::{CoreSettings, CoreSolver, SimpSettings, SimpSolver};
use satcore::sat::{dimacs, SolveResult, Solver};

fn parse_into<S: Solver>(solver: &mut S, cnf: &str) {
    let reader = BufReader::new(Cursor::new(cnf.as_bytes()));
    dimacs::parse(solver, reader).expect("well-formed test CNF");
}

fn validates(cnf: &str, solver: &impl Solver) -> bool {
    let reader = BufReader::new(Cursor::new(cnf.as_bytes()));
    dimacs::validate_model(reader, solver.model().expect("SAT result carries a model")).unwrap()
}

#[test]
fn single_positive_unit_is_sat() {
    let cnf = "p cnf 1 1\n1 0\n";
    let mut solver = CoreSolver::new(CoreSettings::default());
    parse_into(&mut solver, cnf);
    assert!(matches!(solver.solve_limited(&[]), SolveResult::SAT));
    assert!(validates(cnf, &solver));
}

#[test]
fn contradictory_units_are_unsat() {
    let cnf = "p cnf 1 2\n1 0\n-1 0\n";
    let mut solver = CoreSolver::new(CoreSettings::default());
    parse_into(&mut solver, cnf);
    assert!(matches!(solver.solve_limited(&[]), SolveResult::UnSAT));
    assert!(!solver.is_ok());
}

#[test]
fn unit_propagation_chain_is_sat_with_few_decisions() {
    let cnf = "p cnf 3 3\n1 0\n-1 2 0\n-2 3 0\n";
    let mut solver = CoreSolver::new(CoreSettings::default());
    parse_into(&mut solver, cnf);
    assert!(matches!(solver.solve_limited(&[]), SolveResult::SAT));
    assert!(validates(cnf, &solver));
    let stats = solver.stats();
    assert!(stats.propagations >= 3);
    assert!(stats.decisions <= 1);
}

#[test]
fn pigeonhole_style_small_instance_is_unsat() {
    let cnf = "p cnf 3 7\n1 2 0\n2 3 0\n1 3 0\n-1 -2 0\n-2 -3 0\n-1 -3 0\n1 2 3 0\n";
    let mut solver = CoreSolver::new(CoreSettings::default());
    parse_into(&mut solver, cnf);
    assert!(matches!(solver.solve_limited(&[]), SolveResult::UnSAT));
}

#[test]
fn three_sat_satisfiable_instance_verifies() {
    let cnf = "p cnf 4 4\n1 2 0\n3 4 0\n-1 3 0\n2 -4 0\n";
    let mut solver = CoreSolver::new(CoreSettings::default());
    parse_into(&mut solver, cnf);
    assert!(matches!(solver.solve_limited(&[]), SolveResult::SAT));
    assert!(validates(cnf, &solver));
}

#[test]
fn blocked_clause_instance_stays_sat_under_elimination() {
    let cnf = "p cnf 3 2\n1 2 0\n1 -2 3 0\n";
    let mut solver = SimpSolver::new(SimpSettings::default());
    parse_into(&mut solver, cnf);
    assert!(matches!(solver.solve_limited(&[]), SolveResult::SAT));
    assert!(validates(cnf, &solver));
}

#[test]
fn unsat_result_is_idempotent() {
    let cnf = "p cnf 1 2\n1 0\n-1 0\n";
    let mut solver = CoreSolver::new(CoreSettings::default());
    parse_into(&mut solver, cnf);
    assert!(matches!(solver.solve_limited(&[]), SolveResult::UnSAT));
    assert!(matches!(solver.solve_limited(&[]), SolveResult::UnSAT));
}

#[test]
fn simp_solver_matches_core_solver_on_satisfiable_instance() {
    let cnf = "p cnf 4 4\n1 2 0\n3 4 0\n-1 3 0\n2 -4 0\n";
    let mut solver = SimpSolver::new(SimpSettings::default());
    parse_into(&mut solver, cnf);
    assert!(matches!(solver.solve_limited(&[]), SolveResult::SAT));
    assert!(validates(cnf, &solver));
}
