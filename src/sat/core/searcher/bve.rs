pub mod elim_clauses;
pub mod elim_queue;

use log::debug;

use crate::sat::formula::assignment::Assignment;
use crate::sat::formula::clause::{ClauseAllocator, CRef};
use crate::sat::formula::util::{merge, satisfied_with_assignment};
use crate::sat::formula::{Lit, Var, VarMap};

use self::elim_queue::{ElimQueue, OccLists, VarStatus};
use super::backtrack::BacktrackableFormula;
use super::clause_db::ClauseDb;
use elim_clauses::ElimClauses;

#[derive(Clone)]
pub struct BveSettings {
    pub elim_grow: isize,
    pub elim_max_occ: usize,
    pub elim_clause_size_limit: usize,
}

impl Default for BveSettings {
    fn default() -> Self {
        BveSettings {
            elim_grow: 0,
            elim_max_occ: 1_000,
            elim_clause_size_limit: 20,
        }
    }
}

/// Resolution-only bounded variable elimination: no subsumption, no
/// asymmetric-branching strengthening, matching the scope this was
/// grounded on (a SatELite-family eliminator stripped to its core).
pub struct Bve {
    settings: BveSettings,
    occurs: OccLists,
    elim: ElimQueue,
    var_status: VarMap<VarStatus>,
}

impl Bve {
    pub fn new(settings: BveSettings) -> Bve {
        Bve {
            settings,
            occurs: OccLists::new(),
            elim: ElimQueue::new(),
            var_status: VarMap::new(),
        }
    }

    pub fn init_var(&mut self, v: Var) {
        self.occurs.init_var(v);
        self.elim.init_var(v);
        self.var_status.insert(&v, VarStatus::default());
    }

    pub fn freeze_var(&mut self, v: Var) {
        self.var_status[&v].frozen = true;
    }

    pub fn is_eliminated(&self, v: Var) -> bool {
        self.var_status.get(&v).map_or(false, |s| s.eliminated)
    }

    /// Registers a just-added original clause in the occurrence lists and
    /// the elimination-cost heap.
    pub fn observe_clause(&mut self, lits: &[Lit], cr: CRef, assigns: &Assignment) {
        for &lit in lits {
            self.occurs.push_occ(lit.var(), cr);
            self.elim.bump_lit_occ(lit, 1);
            self.elim.update_elim_heap(lit.var(), &self.var_status, assigns);
        }
    }

    fn remove_clause_refs(&mut self, bt: &mut BacktrackableFormula, db: &mut ClauseDb, cr: CRef) {
        let lits = bt.ca.view(cr).lits().to_vec();
        for &lit in &lits {
            self.occurs.remove_occ(lit.var(), cr);
            self.elim.bump_lit_occ(lit, -1);
        }
        bt.force_detach(cr);
        db.remove_clause(&mut bt.ca, cr, false);
    }

    /// Runs variable elimination to a fixed point, or until the resource
    /// budget is exhausted. Returns `false` if the empty clause was
    /// derived (UNSAT).
    pub fn eliminate(
        &mut self,
        bt: &mut BacktrackableFormula,
        db: &mut ClauseDb,
        elimclauses: &mut ElimClauses,
    ) -> bool {
        loop {
            let v = match self.elim.pop() {
                Some(v) => v,
                None => return true,
            };
            if self.var_status[&v].frozen || self.var_status[&v].eliminated || !bt.assigns.is_undef(v) {
                continue;
            }
            if !self.try_eliminate(bt, db, elimclauses, v) {
                return false;
            }
        }
    }

    fn try_eliminate(
        &mut self,
        bt: &mut BacktrackableFormula,
        db: &mut ClauseDb,
        elimclauses: &mut ElimClauses,
        v: Var,
    ) -> bool {
        let pos: Vec<CRef> = self.occurs.lookup(&bt.ca, v).clone();
        let pos: Vec<CRef> = pos.into_iter().filter(|&cr| bt.ca.view(cr).lits().contains(&v.pos_lit())).collect();
        let neg: Vec<CRef> = self.occurs.lookup(&bt.ca, v).clone();
        let neg: Vec<CRef> = neg.into_iter().filter(|&cr| bt.ca.view(cr).lits().contains(&v.neg_lit())).collect();

        if pos.len() > self.settings.elim_max_occ || neg.len() > self.settings.elim_max_occ {
            return true; // too expensive; leave the variable in place
        }

        let mut resolvents: Vec<Vec<Lit>> = Vec::new();
        for &cp in &pos {
            if satisfied_with_assignment(bt.ca.view(cp).lits(), &bt.assigns) {
                continue;
            }
            for &cn in &neg {
                if satisfied_with_assignment(bt.ca.view(cn).lits(), &bt.assigns) {
                    continue;
                }
                let p_lits = bt.ca.view(cp).lits().to_vec();
                let n_lits = bt.ca.view(cn).lits().to_vec();
                if let Some(resolvent) = merge(v, &p_lits, &n_lits) {
                    if resolvent.len() > self.settings.elim_clause_size_limit {
                        return true;
                    }
                    resolvents.push(resolvent);
                }
            }
        }

        let grow_bound = (pos.len() + neg.len()) as isize + self.settings.elim_grow;
        if resolvents.len() as isize > grow_bound {
            return true;
        }

        // Beneficial: commit the elimination.
        let witness = pos.first().or_else(|| neg.first());
        let witness_lits = match witness {
            Some(&cr) => bt.ca.view(cr).lits().to_vec(),
            None => vec![v.pos_lit()], // no clauses mention v; trivially satisfiable
        };
        elimclauses.mk_elim_clause(v, &witness_lits);

        for &cr in pos.iter().chain(neg.iter()) {
            self.remove_clause_refs(bt, db, cr);
        }

        for resolvent in resolvents {
            if resolvent.is_empty() {
                return false; // UNSAT: empty resolvent
            }
            if resolvent.len() == 1 {
                let lit = resolvent[0];
                if bt.assigns.is_undef(lit.var()) {
                    bt.assigns.assign_lit(lit, crate::sat::formula::assignment::Reason::Decision);
                } else if !bt.assigns.is_assigned_pos(lit) {
                    return false;
                }
                continue;
            }
            let cr = db.add_clause(&mut bt.ca, &resolvent);
            bt.attach_clause(cr);
            self.observe_clause(&resolvent, cr, &bt.assigns);
        }

        self.var_status[&v].eliminated = true;
        debug!("eliminated variable {:?}", v);
        true
    }
}
