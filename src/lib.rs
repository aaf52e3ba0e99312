use std::{fs, io, path};

use log::info;

use crate::sat::core::{CoreSettings, CoreSolver, SimpSettings, SimpSolver};
use crate::sat::{dimacs, SolveResult, Solver, Stats};

pub mod sat;
pub(crate) mod util;

pub enum SolverOptions {
    Core(CoreSettings),
    Simp(SimpSettings),
}

pub struct MainOptions {
    pub pre: bool,
    pub solve: bool,
    pub verify: bool,
    pub in_path: path::PathBuf,
    pub out_path: Option<path::PathBuf>,
    pub proof_path: Option<path::PathBuf>,
}

pub fn solve(main_opts: MainOptions, solver_opts: SolverOptions) -> io::Result<()> {
    match solver_opts {
        SolverOptions::Core(opts) => {
            let solver = CoreSolver::new(opts);
            solve_with(solver, main_opts)
        }
        SolverOptions::Simp(mut opts) => {
            opts.use_elim = main_opts.pre;
            let solver = SimpSolver::new(opts);
            solve_with(solver, main_opts)
        }
    }
}

pub fn solve_with<S: Solver>(mut solver: S, options: MainOptions) -> io::Result<()> {
    info!("============================[ Problem Statistics ]=============================");
    info!("|                                                                             |");

    let initial_time = time::precise_time_s();

    if let Some(path) = options.proof_path.as_ref() {
        let proof_file = fs::File::create(path)?;
        solver.set_proof(crate::sat::drat::DratWriter::new(proof_file));
    }

    dimacs::parse_file(&mut solver, &options.in_path)?;

    let parse_time = time::precise_time_s();
    info!("|  Number of variables:  {:12}                                         |", solver.num_vars());
    info!("|  Number of clauses:    {:12}                                         |", solver.num_clauses());
    info!("|  Parse time:           {:12.2} s                                       |", parse_time - initial_time);
    info!("|                                                                             |");

    let result = if options.solve {
        solver.solve_limited(&[])
    } else {
        info!("===============================================================================");
        SolveResult::Interrupted
    };

    let cpu_time = time::precise_time_s() - initial_time;
    let mem_used = util::mem_used_peak();
    print_stats(&solver.stats(), cpu_time, mem_used);

    match result {
        SolveResult::UnSAT => {
            println!("UNSATISFIABLE");
        }
        SolveResult::Interrupted => {
            println!("INDETERMINATE");
        }
        SolveResult::SAT => {
            println!("SATISFIABLE");
            if options.verify {
                let model = solver.model().expect("SAT result without a model");
                let ok = dimacs::validate_model_file(&options.in_path, model)?;
                assert!(ok, "SELF-CHECK FAILED: reported model does not satisfy the input");
            }
        }
    }

    if let Some(path) = options.out_path {
        let mut out = fs::File::create(path)?;
        write_result(&mut out, &result, &solver)?;
    }

    Ok(())
}

fn write_result<W: io::Write, S: Solver>(stream: &mut W, result: &SolveResult, solver: &S) -> io::Result<()> {
    match result {
        SolveResult::UnSAT => writeln!(stream, "UNSAT"),
        SolveResult::Interrupted => writeln!(stream, "INDET"),
        SolveResult::SAT => {
            writeln!(stream, "SAT")?;
            let model = solver.model().expect("SAT result without a model");
            dimacs::write_model(stream, model, solver.num_vars())
        }
    }
}

fn print_stats(stats: &Stats, cpu_time: f64, mem_used: Option<usize>) {
    info!("restarts              : {:<12}", stats.restarts);

    {
        let confl_per_s = (stats.conflicts as f64) / cpu_time;
        info!("conflicts             : {:<12}   ({:.0} /sec)", stats.conflicts, confl_per_s);
    }

    {
        let rnd_percent = (stats.rnd_decisions as f64) * 100.0 / (stats.decisions.max(1) as f64);
        let decisions_per_s = (stats.decisions as f64) / cpu_time;
        info!(
            "decisions             : {:<12}   ({:4.2} % random) ({:.0} /sec)",
            stats.decisions, rnd_percent, decisions_per_s
        );
    }

    {
        let props_per_s = (stats.propagations as f64) / cpu_time;
        info!("propagations          : {:<12}   ({:.0} /sec)", stats.propagations, props_per_s);
    }

    {
        let del_percent = ((stats.max_literals - stats.tot_literals) as f64) * 100.0 / (stats.max_literals.max(1) as f64);
        info!("conflict literals     : {:<12}   ({:4.2} % deleted)", stats.tot_literals, del_percent);
    }

    if let Some(mem_used) = mem_used {
        info!("Memory used           : {:.2} MB", (mem_used as f64) / 1024.0);
    }
    info!("CPU time              : {} s", cpu_time);
    info!("");
}
