use crate::sat::formula::assignment::{Assignment, DecisionLevel, Reason};
use crate::sat::formula::clause::{ClauseAllocator, ClauseGC, CRef};
use crate::sat::formula::{Lit, Var};

use super::watch::Watches;

/// Bundles the arena, trail and watch structure that must move together:
/// attaching/detaching a clause always touches the watch lists, and GC
/// always touches both the arena and every owner of a `CRef`.
pub struct BacktrackableFormula {
    pub ca: ClauseAllocator,
    pub assigns: Assignment,
    pub watches: Watches,
}

impl BacktrackableFormula {
    pub fn new() -> BacktrackableFormula {
        BacktrackableFormula {
            ca: ClauseAllocator::new(),
            assigns: Assignment::new(),
            watches: Watches::new(),
        }
    }

    pub fn new_var(&mut self) -> Var {
        let v = self.assigns.new_var();
        self.watches.init_var(v);
        v
    }

    pub fn attach_clause(&mut self, cr: CRef) {
        let lits = self.ca.view(cr).lits().to_vec();
        self.watches.watch_clause(&lits, cr);
    }

    pub fn attach_binary(&mut self, a: Lit, b: Lit) {
        self.watches.watch_binary(a, b);
    }

    pub fn force_detach(&mut self, cr: CRef) {
        let lits = self.ca.view(cr).lits().to_vec();
        self.watches.unwatch_clause_strict(&lits, cr);
    }

    pub fn lazy_detach(&mut self, cr: CRef) {
        let lits = self.ca.view(cr).lits().to_vec();
        self.watches.unwatch_clause_lazy(&lits, cr);
    }

    pub fn propagations(&self) -> u64 {
        self.watches.propagations
    }

    pub fn propagate(&mut self) -> Option<CRef> {
        self.watches.propagate(&mut self.ca, &mut self.assigns)
    }

    pub fn is_ground_level(&self) -> bool {
        self.assigns.is_ground_level()
    }

    pub fn push_decision(&mut self, next: Lit) {
        self.assigns.new_decision_level();
        self.assigns.assign_lit(next, Reason::Decision);
    }

    /// Backtrack to `level`, one level at a time when `chronological` is
    /// set (so the caller can re-check the learnt clause's status after
    /// each step), or directly otherwise. `on_cancel` is invoked once per
    /// literal undone, in undo order, so the decision heuristic can
    /// restore it to the order heap and save its polarity.
    pub fn backtrack_to<F: FnMut(Lit)>(&mut self, level: DecisionLevel, chronological: bool, mut on_cancel: F) {
        if !chronological {
            self.assigns.backtrack_to(level, |lit| on_cancel(lit));
            return;
        }
        let mut cur = self.assigns.decision_level();
        while cur.offset() > level.offset() {
            let step = DecisionLevel(cur.offset() - 1);
            self.assigns.backtrack_to(step, |lit| on_cancel(lit));
            cur = step;
        }
    }

    pub fn reloc_gc(&mut self, gc: &mut ClauseGC) {
        self.watches.reloc_gc(gc);
        self.assigns.reloc_gc(gc);
    }
}
