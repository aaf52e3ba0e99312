use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::Path;

use flate2::read::GzDecoder;

use super::formula::{Lit, Var, VarMap};
use super::Solver;

/// Maps external (1-based, signed) DIMACS variable numbers onto the
/// solver's own internal `Var` space, creating fresh variables on first
/// sight so clauses can reference variables in any order.
struct VarSubst {
    to_internal: VarMap<Var>,
    highest_seen: usize,
}

impl VarSubst {
    fn new() -> VarSubst {
        VarSubst {
            to_internal: VarMap::new(),
            highest_seen: 0,
        }
    }

    fn lit<S: Solver>(&mut self, solver: &mut S, external: i64) -> Lit {
        debug_assert!(external != 0);
        let index = external.unsigned_abs() as usize - 1;
        let ext_var = Var::from_index(index);
        self.highest_seen = self.highest_seen.max(index + 1);
        let internal = match self.to_internal.get(&ext_var) {
            Some(&v) => v,
            None => {
                let v = solver.new_var(None, true);
                self.to_internal.insert(&ext_var, v);
                v
            }
        };
        internal.sign_lit(external < 0)
    }
}

/// A streaming, allocation-light DIMACS CNF token reader. Skips `c` comment
/// lines and the `p cnf <vars> <clauses>` header (read but not relied upon
/// beyond a sanity log), then yields signed integers up to and including
/// each clause's terminating `0`.
struct DimacsParser<R: BufRead> {
    reader: R,
    line: String,
    pos: usize,
    /// `(declared_vars, declared_clauses)` from the `p cnf` header, taken
    /// by `take_header` once the first real clause is reached.
    header: Option<(usize, usize)>,
}

/// Parses a `p cnf <vars> <clauses>` header line. Malformed headers are
/// tolerated (the counts are only used as a preallocation hint).
fn parse_header(line: &str) -> Option<(usize, usize)> {
    let mut fields = line.split_whitespace();
    if fields.next()? != "p" || fields.next()? != "cnf" {
        return None;
    }
    let vars = fields.next()?.parse().ok()?;
    let clauses = fields.next()?.parse().ok()?;
    Some((vars, clauses))
}

impl<R: BufRead> DimacsParser<R> {
    fn new(reader: R) -> DimacsParser<R> {
        DimacsParser {
            reader,
            line: String::new(),
            pos: 0,
            header: None,
        }
    }

    /// Takes the declared `(vars, clauses)` counts if a header has been
    /// seen since the last call; used once, as a `reserve` hint, right
    /// after the first token is read.
    fn take_header(&mut self) -> Option<(usize, usize)> {
        self.header.take()
    }

    fn fill_line(&mut self) -> io::Result<bool> {
        loop {
            self.line.clear();
            self.pos = 0;
            let n = self.reader.read_line(&mut self.line)?;
            if n == 0 {
                return Ok(false);
            }
            let trimmed = self.line.trim_start();
            if trimmed.is_empty() || trimmed.starts_with('c') {
                continue;
            }
            if trimmed.starts_with('p') {
                self.header = parse_header(trimmed);
                continue;
            }
            return Ok(true);
        }
    }

    fn next_token(&mut self) -> io::Result<Option<i64>> {
        loop {
            while self.pos < self.line.len() && self.line.as_bytes()[self.pos].is_ascii_whitespace() {
                self.pos += 1;
            }
            if self.pos >= self.line.len() {
                if !self.fill_line()? {
                    return Ok(None);
                }
                continue;
            }
            let start = self.pos;
            while self.pos < self.line.len() && !self.line.as_bytes()[self.pos].is_ascii_whitespace() {
                self.pos += 1;
            }
            let tok = &self.line[start..self.pos];
            return tok
                .parse::<i64>()
                .map(Some)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e));
        }
    }
}

fn open_reader(path: &Path) -> io::Result<Box<dyn Read>> {
    let file = File::open(path)?;
    if path.extension().map_or(false, |ext| ext == "gz") {
        Ok(Box::new(GzDecoder::new(file)))
    } else {
        Ok(Box::new(file))
    }
}

/// Parses a DIMACS CNF file (optionally gzip-compressed, by `.gz`
/// extension) directly into `solver`.
pub fn parse_file<S: Solver>(solver: &mut S, path: &Path) -> io::Result<()> {
    let reader = BufReader::new(open_reader(path)?);
    parse(solver, reader)
}

/// Parses a DIMACS CNF stream directly into `solver`, creating a fresh
/// internal variable for each external variable number on first use.
pub fn parse<S: Solver, R: BufRead>(solver: &mut S, reader: R) -> io::Result<()> {
    let mut subst = VarSubst::new();
    let mut parser = DimacsParser::new(reader);
    let mut clause: Vec<Lit> = Vec::new();
    let mut reserved = false;

    while let Some(tok) = parser.next_token()? {
        if !reserved {
            if let Some((_vars, num_clauses)) = parser.take_header() {
                solver.reserve_clauses(num_clauses);
            }
            reserved = true;
        }
        if tok == 0 {
            solver.add_clause(&clause);
            clause.clear();
        } else {
            clause.push(subst.lit(solver, tok));
        }
    }

    if !clause.is_empty() {
        solver.add_clause(&clause);
    }

    Ok(())
}

/// Writes a satisfying model in the DIMACS `v` line convention: one signed
/// integer per variable (1-based), terminated by `0`.
pub fn write_model<W: Write>(writer: &mut W, model: &VarMap<bool>, num_vars: usize) -> io::Result<()> {
    write!(writer, "v")?;
    for index in 0..num_vars {
        let var = Var::from_index(index);
        let sign = match model.get(&var) {
            Some(&true) => 1,
            Some(&false) => -1,
            None => 1, // unconstrained: report an arbitrary witness value
        };
        write!(writer, " {}", sign * (index as i64 + 1))?;
    }
    writeln!(writer, " 0")
}

/// Re-reads a DIMACS CNF file and checks that `model` satisfies every
/// clause in it; used by the `--verify` CLI flag as an independent sanity
/// check of a reported SAT answer.
pub fn validate_model_file(path: &Path, model: &VarMap<bool>) -> io::Result<bool> {
    let reader = BufReader::new(open_reader(path)?);
    validate_model(reader, model)
}

pub fn validate_model<R: BufRead>(reader: R, model: &VarMap<bool>) -> io::Result<bool> {
    let mut parser = DimacsParser::new(reader);
    let mut clause: Vec<i64> = Vec::new();

    loop {
        match parser.next_token()? {
            None => {
                return Ok(clause.is_empty());
            }
            Some(0) => {
                let satisfied = clause.iter().any(|&lit| {
                    let index = lit.unsigned_abs() as usize - 1;
                    let var = Var::from_index(index);
                    match model.get(&var) {
                        Some(&val) => val == (lit > 0),
                        None => false,
                    }
                });
                if !satisfied {
                    return Ok(false);
                }
                clause.clear();
            }
            Some(tok) => clause.push(tok),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sat::core::{CoreSettings, CoreSolver};
    use crate::sat::{SolveResult, Solver};

    #[test]
    fn parses_clauses_and_skips_comments_and_header() {
        let cnf = "c a leading comment\np cnf 3 2\n1 -2 0\n2 3 0\n";
        let mut solver = CoreSolver::new(CoreSettings::default());
        parse(&mut solver, BufReader::new(cnf.as_bytes())).unwrap();
        assert_eq!(solver.num_vars(), 3);
        assert_eq!(solver.num_clauses(), 2);
    }

    #[test]
    fn tolerates_a_missing_trailing_terminator() {
        let cnf = "p cnf 2 1\n1 2";
        let mut solver = CoreSolver::new(CoreSettings::default());
        parse(&mut solver, BufReader::new(cnf.as_bytes())).unwrap();
        assert_eq!(solver.num_clauses(), 1);
    }

    #[test]
    fn write_model_reports_a_witness_for_every_variable() {
        let mut model = VarMap::new();
        model.insert(&Var::from_index(0), true);
        model.insert(&Var::from_index(2), false);

        let mut out = Vec::new();
        write_model(&mut out, &model, 3).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "v 1 2 -3 0\n");
    }

    #[test]
    fn validate_model_rejects_an_unsatisfied_clause() {
        let cnf = "p cnf 2 1\n1 2 0\n";
        let mut model = VarMap::new();
        model.insert(&Var::from_index(0), false);
        model.insert(&Var::from_index(1), false);
        assert!(!validate_model(BufReader::new(cnf.as_bytes()), &model).unwrap());
    }

    #[test]
    fn gz_extension_routes_through_the_decompressor() {
        use std::io::Write;
        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(b"p cnf 1 1\n1 0\n").unwrap();
        let compressed = encoder.finish().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.cnf.gz");
        fs::write(&path, compressed).unwrap();

        let mut solver = CoreSolver::new(CoreSettings::default());
        parse_file(&mut solver, &path).unwrap();
        assert_eq!(solver.num_clauses(), 1);
        assert!(matches!(solver.solve_limited(&[]), SolveResult::SAT));
    }
}
