use std::path::PathBuf;

use clap::{crate_version, App, Arg};

use satcore::sat::core::searcher::analyze::CCMinMode;
use satcore::sat::core::searcher::bve::BveSettings;
use satcore::sat::core::searcher::decision::PhaseSaving;
use satcore::sat::core::{CoreSettings, SimpSettings};
use satcore::{solve, MainOptions, SolverOptions};

fn main() {
    let ls012 = ["0", "1", "2"];
    let matches = App::new("satcore")
        .version(crate_version!())
        .about("A CDCL SAT solver with DIMACS front-end")
        .arg(Arg::with_name("verb").long("verb").takes_value(true).possible_values(&ls012).help("Verbosity level (0=silent, 1=some, 2=more)"))
        .arg(Arg::with_name("core").long("core").help("Use the bare core solver (skip variable elimination)"))
        .arg(Arg::with_name("pre").long("pre").help("Turn on preprocessing (bounded variable elimination)"))
        .arg(Arg::with_name("no-pre").long("no-pre").conflicts_with("pre"))
        .arg(Arg::with_name("solve").long("solve").help("Turn on solving after preprocessing"))
        .arg(Arg::with_name("no-solve").long("no-solve").conflicts_with("solve"))
        .arg(Arg::with_name("verify").long("verify").help("Independently re-check a reported SAT model against the input"))
        .arg(Arg::with_name("proof").long("proof").takes_value(true).help("Write a DRAT proof of the search to this file"))
        .arg(Arg::with_name("input").required(true))
        .arg(Arg::with_name("output").required(false))
        .arg(Arg::with_name("var-decay").long("var-decay").takes_value(true).help("The variable activity decay factor"))
        .arg(Arg::with_name("cla-decay").long("cla-decay").takes_value(true).help("The clause activity decay factor"))
        .arg(Arg::with_name("rnd-freq").long("rnd-freq").takes_value(true).help("The frequency with which the decision heuristic tries to choose a random variable"))
        .arg(Arg::with_name("rnd-seed").long("rnd-seed").takes_value(true).help("Used by the random variable selection"))
        .arg(Arg::with_name("ccmin-mode").long("ccmin-mode").takes_value(true).possible_values(&ls012).help("Controls conflict clause minimization (0=none, 1=basic, 2=deep)"))
        .arg(Arg::with_name("phase-saving").long("phase-saving").takes_value(true).possible_values(&ls012).help("Controls the level of phase saving (0=none, 1=limited, 2=full)"))
        .arg(Arg::with_name("rnd-init").long("rnd-init").help("Randomize the initial activity"))
        .arg(Arg::with_name("no-rnd-init").long("no-rnd-init").conflicts_with("rnd-init"))
        .arg(Arg::with_name("luby").long("luby").help("Use the Luby restart sequence instead of Glucose/LBD"))
        .arg(Arg::with_name("no-luby").long("no-luby").conflicts_with("luby"))
        .arg(Arg::with_name("rfirst").long("rfirst").takes_value(true).help("The base restart interval"))
        .arg(Arg::with_name("rinc").long("rinc").takes_value(true).help("Restart interval increase factor"))
        .arg(Arg::with_name("gc-frac").long("gc-frac").takes_value(true).help("The fraction of wasted memory allowed before a garbage collection is triggered"))
        .arg(Arg::with_name("min-learnts").long("min-learnts").takes_value(true).help("Minimum learnt clause limit"))
        .arg(Arg::with_name("elim").long("elim").help("Perform variable elimination"))
        .arg(Arg::with_name("no-elim").long("no-elim").conflicts_with("elim"))
        .arg(Arg::with_name("grow").long("grow").takes_value(true).help("Allow a variable elimination step to grow by a number of clauses"))
        .arg(Arg::with_name("cl-lim").long("cl-lim").takes_value(true).help("Variables are not eliminated if it produces a resolvent with a length above this limit"))
        .get_matches();

    {
        let level = match matches.value_of("verb") {
            Some("0") => log::LevelFilter::Off,
            Some("2") => log::LevelFilter::Trace,
            _ => log::LevelFilter::Info,
        };
        env_logger::Builder::new()
            .format(|buf, record| {
                use std::io::Write;
                writeln!(buf, "{}", record.args())
            })
            .filter(None, level)
            .init();
    }

    let core_options = {
        let mut s = CoreSettings::default();

        if let Some(x) = matches.value_of("var-decay").and_then(|v| v.parse::<f64>().ok()) {
            if 0.0 < x && x < 1.0 {
                s.heur.var_decay = x;
            }
        }
        if let Some(x) = matches.value_of("cla-decay").and_then(|v| v.parse::<f64>().ok()) {
            if 0.0 < x && x < 1.0 {
                s.db.clause_decay = x;
            }
        }
        if let Some(x) = matches.value_of("rnd-freq").and_then(|v| v.parse::<f64>().ok()) {
            if (0.0..=1.0).contains(&x) {
                s.heur.random_var_freq = x;
            }
        }
        if let Some(x) = matches.value_of("rnd-seed").and_then(|v| v.parse::<f64>().ok()) {
            if x > 0.0 {
                s.heur.random_seed = x;
            }
        }
        match matches.value_of("ccmin-mode") {
            Some("0") => s.ccmin_mode = CCMinMode::None,
            Some("1") => s.ccmin_mode = CCMinMode::Basic,
            Some("2") => s.ccmin_mode = CCMinMode::Deep,
            _ => {}
        }
        match matches.value_of("phase-saving") {
            Some("0") => s.heur.phase_saving = PhaseSaving::None,
            Some("1") => s.heur.phase_saving = PhaseSaving::Limited,
            Some("2") => s.heur.phase_saving = PhaseSaving::Full,
            _ => {}
        }
        if matches.is_present("rnd-init") {
            s.heur.rnd_init_act = true;
        }
        if matches.is_present("no-rnd-init") {
            s.heur.rnd_init_act = false;
        }
        if matches.is_present("luby") {
            s.restart.luby_restart = true;
        }
        if matches.is_present("no-luby") {
            s.restart.luby_restart = false;
        }
        if let Some(x) = matches.value_of("rfirst").and_then(|v| v.parse::<f64>().ok()) {
            if x > 0.0 {
                s.restart.restart_first = x;
            }
        }
        if let Some(x) = matches.value_of("rinc").and_then(|v| v.parse::<f64>().ok()) {
            if x > 1.0 {
                s.restart.restart_inc = x;
            }
        }
        if let Some(x) = matches.value_of("gc-frac").and_then(|v| v.parse::<f64>().ok()) {
            if 0.0 < x && x <= 1.0 {
                s.searcher.garbage_frac = x;
            }
        }
        if let Some(x) = matches.value_of("min-learnts").and_then(|v| v.parse::<i32>().ok()) {
            if x >= 0 {
                s.learn.min_learnts_lim = x;
            }
        }

        s
    };

    let bve_options = {
        let mut s = BveSettings::default();
        if let Some(x) = matches.value_of("grow").and_then(|v| v.parse::<isize>().ok()) {
            s.elim_grow = x;
        }
        if let Some(x) = matches.value_of("cl-lim").and_then(|v| v.parse::<isize>().ok()) {
            if x >= -1 {
                s.elim_clause_size_limit = if x < 0 { usize::MAX } else { x as usize };
            }
        }
        s
    };

    let options = MainOptions {
        pre: !matches.is_present("no-pre"),
        solve: !matches.is_present("no-solve"),
        verify: matches.is_present("verify"),
        in_path: PathBuf::from(matches.value_of("input").unwrap()),
        out_path: matches.value_of("output").map(PathBuf::from),
        proof_path: matches.value_of("proof").map(PathBuf::from),
    };

    let solver_options = if matches.is_present("core") {
        SolverOptions::Core(core_options)
    } else {
        let mut use_elim = true;
        if matches.is_present("no-elim") {
            use_elim = false;
        }
        if matches.is_present("elim") {
            use_elim = true;
        }
        SolverOptions::Simp(SimpSettings {
            core: core_options,
            bve: bve_options,
            extend_model: true,
            simp_once: true,
            use_elim,
        })
    };

    if let Err(e) = solve(options, solver_options) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
