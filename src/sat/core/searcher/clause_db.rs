use std::fs::File;

use crate::sat::drat::DratWriter;
use crate::sat::formula::assignment::Assignment;
use crate::sat::formula::clause::{ClauseAllocator, ClauseGC, CRef, INVALID};
use crate::sat::formula::util::satisfied_with_assignment;
use crate::sat::formula::Lit;

#[derive(Clone)]
pub struct ClauseDbSettings {
    pub remove_satisfied: bool,
    pub clause_decay: f64,
    pub glue_lbd: u32,
}

impl Default for ClauseDbSettings {
    fn default() -> Self {
        ClauseDbSettings {
            remove_satisfied: true,
            clause_decay: 0.999,
            glue_lbd: 2,
        }
    }
}

#[derive(Default, Clone, Copy)]
pub struct Stats {
    pub num_clauses: u64,
    pub num_learnts: u64,
    pub clauses_literals: u64,
    pub learnts_literals: u64,
}

/// Two kinds of clauses are tracked here: arena-backed multi-literal
/// clauses (in `clauses`/`learnts`) and implicit binary clauses, which
/// never enter the arena and are represented only by watches; the
/// reducer and GC below only ever touch the former.
pub struct ClauseDb {
    settings: ClauseDbSettings,
    cla_inc: f64,
    pub clauses: Vec<CRef>,
    pub learnts: Vec<CRef>,
    pub stats: Stats,
    proof: Option<DratWriter<File>>,
    exhausted: bool,
}

impl ClauseDb {
    pub fn new(settings: ClauseDbSettings) -> ClauseDb {
        ClauseDb {
            settings,
            cla_inc: 1.0,
            clauses: Vec::new(),
            learnts: Vec::new(),
            stats: Stats::default(),
            proof: None,
            exhausted: false,
        }
    }

    /// Set once an `alloc` call has returned `INVALID` because the arena's
    /// capacity ceiling was reached.
    pub fn exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn set_proof(&mut self, proof: DratWriter<File>) {
        self.proof = Some(proof);
    }

    /// Closes out a DRAT proof on UNSAT by emitting the empty clause, the
    /// conventional terminator a verifier looks for.
    pub fn record_unsat(&mut self) {
        if let Some(proof) = self.proof.as_mut() {
            if let Err(e) = proof.add_clause(&[]) {
                log::warn!("failed to write DRAT empty-clause terminator: {}", e);
            }
        }
    }

    /// Returns `INVALID` if the arena's capacity ceiling was reached
    /// instead of panicking; the clause is simply not recorded, leaving
    /// the caller's own state (trail, watches) untouched.
    pub fn add_clause(&mut self, ca: &mut ClauseAllocator, lits: &[Lit]) -> CRef {
        let cr = ca.alloc(lits, false);
        if cr == INVALID {
            self.exhausted = true;
            log::warn!("clause arena exhausted; original clause dropped");
            return INVALID;
        }
        self.clauses.push(cr);
        self.stats.num_clauses += 1;
        self.stats.clauses_literals += lits.len() as u64;
        cr
    }

    /// Returns `INVALID` if the arena's capacity ceiling was reached; see
    /// `add_clause`.
    pub fn learn_clause(&mut self, ca: &mut ClauseAllocator, lits: &[Lit], lbd: u32) -> CRef {
        let cr = ca.alloc(lits, true);
        if cr == INVALID {
            self.exhausted = true;
            log::warn!("clause arena exhausted; learnt clause dropped");
            return INVALID;
        }
        {
            let mut c = ca.edit(cr);
            c.set_lbd(lbd);
            c.set_glue(lbd <= self.settings.glue_lbd);
        }
        self.learnts.push(cr);
        self.stats.num_learnts += 1;
        self.stats.learnts_literals += lits.len() as u64;
        self.bump_activity(ca, cr);
        if let Some(proof) = self.proof.as_mut() {
            if let Err(e) = proof.add_clause(lits) {
                log::warn!("failed to write DRAT clause addition: {}", e);
            }
        }
        cr
    }

    pub fn remove_clause(&mut self, ca: &mut ClauseAllocator, cr: CRef, learned: bool) {
        let size = ca.view(cr).len() as u64;
        if learned {
            self.stats.num_learnts -= 1;
            self.stats.learnts_literals -= size;
        } else {
            self.stats.num_clauses -= 1;
            self.stats.clauses_literals -= size;
        }
        if let Some(proof) = self.proof.as_mut() {
            let lits = ca.view(cr).lits().to_vec();
            if let Err(e) = proof.delete_clause(&lits) {
                log::warn!("failed to write DRAT clause deletion: {}", e);
            }
        }
        ca.free(cr);
    }

    pub fn bump_activity(&mut self, ca: &mut ClauseAllocator, cr: CRef) {
        let new_act = {
            let mut c = ca.edit(cr);
            let a = c.activity() + self.cla_inc as f32;
            c.set_activity(a);
            a
        };
        if new_act > 1e20 {
            for &lcr in &self.learnts {
                let mut c = ca.edit(lcr);
                let a = c.activity() * 1e-20;
                c.set_activity(a);
            }
            self.cla_inc *= 1e-20;
        }
    }

    pub fn decay_activity(&mut self) {
        self.cla_inc *= 1.0 / self.settings.clause_decay;
    }

    pub fn number_of_learnts(&self) -> usize {
        self.learnts.len()
    }

    /// Deletes the worse half of the learnt database, ranked by LBD then
    /// activity, never touching glue clauses (LBD <= `glue_lbd`) or
    /// clauses currently locked as a reason.
    pub fn reduce<F: FnMut(CRef)>(&mut self, ca: &mut ClauseAllocator, assigns: &Assignment, mut notify: F) {
        self.learnts.sort_by(|&a, &b| {
            let ca_ = ca.view(a);
            let cb = ca.view(b);
            ca_.lbd().cmp(&cb.lbd()).then(
                cb.activity().partial_cmp(&ca_.activity()).unwrap_or(std::cmp::Ordering::Equal),
            )
        });

        let extra_lim = (self.cla_inc / self.learnts.len().max(1) as f64) as f32;
        let index_lim = self.learnts.len() / 2;

        let learnts = std::mem::take(&mut self.learnts);
        let mut kept = Vec::with_capacity(learnts.len());
        for (i, cr) in learnts.into_iter().enumerate() {
            let (locked, glue, len, activity) = {
                let c = ca.view(cr);
                (
                    assigns.is_reason_for(cr, c.head().var()),
                    c.is_glue(),
                    c.len(),
                    c.activity(),
                )
            };
            let should_delete = !locked && !glue && len > 2 && (i < index_lim || activity < extra_lim);

            if should_delete {
                notify(cr);
                self.remove_clause(ca, cr, true);
            } else {
                kept.push(cr);
            }
        }
        self.learnts = kept;
    }

    pub fn remove_satisfied<F: FnMut(CRef)>(&mut self, ca: &mut ClauseAllocator, assigns: &Assignment, mut notify: F) {
        if !self.settings.remove_satisfied {
            return;
        }
        for list_is_learnt in [true, false] {
            let list = if list_is_learnt { &mut self.learnts } else { &mut self.clauses };
            let mut kept = Vec::with_capacity(list.len());
            let taken = std::mem::take(list);
            for cr in taken {
                let deleted = ca.is_deleted(cr);
                let satisfied = !deleted && satisfied_with_assignment(ca.view(cr).lits(), assigns);
                if deleted {
                    continue;
                } else if satisfied {
                    notify(cr);
                    self.remove_clause(ca, cr, list_is_learnt);
                } else {
                    kept.push(cr);
                }
            }
            if list_is_learnt {
                self.learnts = kept;
            } else {
                self.clauses = kept;
            }
        }
    }

    pub fn gc(&mut self, gc: &mut ClauseGC) {
        for list in [&mut self.learnts, &mut self.clauses] {
            let taken = std::mem::take(list);
            let mut kept = Vec::with_capacity(taken.len());
            for cr in taken {
                if let Some(new_cr) = gc.relocate(cr) {
                    kept.push(new_cr);
                }
            }
            *list = kept;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sat::formula::Var;
    use std::io::{Read, Seek, SeekFrom};

    fn lits(vars: &[(usize, bool)]) -> Vec<Lit> {
        vars.iter().map(|&(i, neg)| Var::from_index(i).sign_lit(neg)).collect()
    }

    #[test]
    fn learn_and_remove_clause_emit_matching_drat_lines() {
        let mut ca = ClauseAllocator::new();
        let mut db = ClauseDb::new(ClauseDbSettings::default());

        let mut proof_file = tempfile::tempfile().unwrap();
        db.set_proof(DratWriter::new(proof_file.try_clone().unwrap()));

        let clause = lits(&[(0, false), (1, true), (2, false)]);
        let cr = db.learn_clause(&mut ca, &clause, 2);
        db.remove_clause(&mut ca, cr, true);

        proof_file.seek(SeekFrom::Start(0)).unwrap();
        let mut contents = String::new();
        proof_file.read_to_string(&mut contents).unwrap();
        assert_eq!(contents, "1 -2 3 0\nd 1 -2 3 0\n");
    }

    #[test]
    fn record_unsat_emits_the_empty_clause() {
        let mut db = ClauseDb::new(ClauseDbSettings::default());
        let mut proof_file = tempfile::tempfile().unwrap();
        db.set_proof(DratWriter::new(proof_file.try_clone().unwrap()));

        db.record_unsat();

        proof_file.seek(SeekFrom::Start(0)).unwrap();
        let mut contents = String::new();
        proof_file.read_to_string(&mut contents).unwrap();
        assert_eq!(contents, "0\n");
    }

    #[test]
    fn reduce_keeps_glue_clauses_and_sheds_the_low_activity_half() {
        let mut ca = ClauseAllocator::new();
        let mut db = ClauseDb::new(ClauseDbSettings::default());
        let mut assigns = crate::sat::formula::assignment::Assignment::new();
        for _ in 0..6 {
            assigns.new_var();
        }

        let glue = lits(&[(0, false), (1, false), (2, false)]);
        let cr_glue = db.learn_clause(&mut ca, &glue, 2);

        let chaff = lits(&[(3, false), (4, false), (5, false)]);
        let cr_chaff = db.learn_clause(&mut ca, &chaff, 10);

        let mut removed = Vec::new();
        db.reduce(&mut ca, &assigns, |cr| removed.push(cr));

        assert!(db.learnts.contains(&cr_glue));
        assert!(!removed.contains(&cr_glue));
        assert!(removed.contains(&cr_chaff) || db.learnts.contains(&cr_chaff));
    }
}
