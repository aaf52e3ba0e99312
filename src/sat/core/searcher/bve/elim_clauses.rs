use log::info;

use crate::sat::formula::{Lit, Var, VarMap};

/// The reconstruction stack built by bounded variable elimination: one
/// entry per eliminated variable, storing a clause that mentions it (with
/// the eliminated variable's literal swapped to the front) so the model
/// can be extended after the reduced formula is solved.
pub struct ElimClauses {
    extend_model: bool,
    literals: Vec<Lit>,
    sizes: Vec<usize>,
}

impl ElimClauses {
    pub fn new(extend_model: bool) -> ElimClauses {
        ElimClauses {
            extend_model,
            literals: Vec::new(),
            sizes: Vec::new(),
        }
    }

    pub fn mk_elim_unit(&mut self, x: Lit) {
        self.literals.push(x);
        self.sizes.push(1);
    }

    pub fn mk_elim_clause(&mut self, v: Var, clause: &[Lit]) {
        let first = self.literals.len();
        self.literals.extend_from_slice(clause);

        if let Some(pos) = self.literals[first..].iter().position(|&l| l.var() == v) {
            self.literals.swap(first, first + pos);
        }
        self.sizes.push(clause.len());
    }

    /// Walks the stack in reverse, extending a model for the reduced
    /// formula into one for the original, unreduced formula.
    pub fn extend(&self, model: &mut VarMap<bool>) {
        if !self.extend_model || self.sizes.is_empty() {
            return;
        }

        let mut end = self.literals.len();
        for &size in self.sizes.iter().rev() {
            let start = end - size;
            let clause = &self.literals[start..end];
            end = start;

            let satisfied = clause[1..].iter().any(|&l| {
                model.get(&l.var()).map_or(false, |&val| val != l.sign())
            });

            if !satisfied {
                let l = clause[0];
                model.insert(&l.var(), !l.sign());
            } else if model.get(&clause[0].var()).is_none() {
                model.insert(&clause[0].var(), !clause[0].sign());
            }
        }
    }

    pub fn log_size(&self) {
        let bytes = self.literals.len() * std::mem::size_of::<Lit>() + self.sizes.len() * std::mem::size_of::<usize>();
        info!("|  Eliminated clauses:     {:10.2} Mb                                                      |", (bytes as f64) / (1024.0 * 1024.0));
    }
}
