use crate::sat::formula::assignment::{Assignment, Reason};
use crate::sat::formula::clause::{ClauseAllocator, ClauseGC, CRef, BINARY_CONFLICT, INVALID};
use crate::sat::formula::{Lit, LitVec, Var};

#[derive(Clone, Copy)]
struct Watcher {
    cref: CRef,
    blocker: Lit,
}

#[derive(Default, Clone)]
struct WatchesLine {
    watchers: Vec<Watcher>,
}

/// Per-literal watch lists driving unit propagation. A watch with
/// `cref == INVALID` is the binary-clause shortcut: the clause itself is
/// never stored in the arena, and `blocker` is its other literal.
pub struct Watches {
    watches: LitVec<WatchesLine>,
    pub propagations: u64,
    last_binary_conflict: Option<(Lit, Lit)>,
}

impl Watches {
    pub fn new() -> Watches {
        Watches {
            watches: LitVec::new(),
            propagations: 0,
            last_binary_conflict: None,
        }
    }

    /// Valid only immediately after `propagate` returns `Some(BINARY_CONFLICT)`:
    /// the two (both-false) literals of the violated binary clause.
    pub fn binary_conflict_lits(&self) -> (Lit, Lit) {
        self.last_binary_conflict.expect("binary_conflict_lits called without a pending binary conflict")
    }

    pub fn init_var(&mut self, v: Var) {
        self.watches.init(&v.pos_lit());
        self.watches.init(&v.neg_lit());
    }

    /// Registers the two watches for a multi-literal (size >= 3) clause on
    /// its first two literals.
    pub fn watch_clause(&mut self, lits: &[Lit], cref: CRef) {
        self.watches[!lits[0]].watchers.push(Watcher { cref, blocker: lits[1] });
        self.watches[!lits[1]].watchers.push(Watcher { cref, blocker: lits[0] });
    }

    /// Registers the two binary-shortcut watches for a two-literal clause;
    /// it is never stored in the arena.
    pub fn watch_binary(&mut self, a: Lit, b: Lit) {
        self.watches[!a].watchers.push(Watcher { cref: INVALID, blocker: b });
        self.watches[!b].watchers.push(Watcher { cref: INVALID, blocker: a });
    }

    pub fn unwatch_clause_strict(&mut self, lits: &[Lit], cref: CRef) {
        for &l in &[lits[0], lits[1]] {
            let line = &mut self.watches[!l];
            if let Some(pos) = line.watchers.iter().position(|w| w.cref == cref) {
                line.watchers.swap_remove(pos);
            }
        }
    }

    /// Lazily skip deleted clauses on next visit instead of eagerly
    /// scrubbing watch lists (matches the reducer's deferred-cleanup
    /// design); retained for API parity with callers that rely on it.
    pub fn unwatch_clause_lazy(&mut self, _lits: &[Lit], _cref: CRef) {}

    /// Runs unit propagation from `assigns`'s queue head to exhaustion.
    /// Returns `None` on saturation, or `Some(cref)` on conflict
    /// (`BINARY_CONFLICT` if found via the binary-watch shortcut).
    pub fn propagate(&mut self, ca: &mut ClauseAllocator, assigns: &mut Assignment) -> Option<CRef> {
        while let Some(p) = assigns.dequeue() {
            self.propagations += 1;
            // Watchers for a clause watching literal L live at index !L; L is
            // falsified exactly when !L is assigned true, i.e. when !L == p,
            // so the list to scan is indexed by p itself, not by !p.
            let false_lit = !p;

            let watchers = std::mem::take(&mut self.watches[p].watchers);
            let mut kept = Vec::with_capacity(watchers.len());
            let mut confl = None;

            let mut it = watchers.into_iter();
            'watches: while let Some(w) = it.next() {
                if w.cref == INVALID {
                    let q = w.blocker;
                    if assigns.is_assigned_pos(q) {
                        kept.push(w);
                        continue;
                    }
                    if assigns.is_undef(q.var()) {
                        assigns.assign_lit(q, Reason::Binary(false_lit));
                        kept.push(w);
                        continue;
                    }
                    // q is false: conflict.
                    kept.push(w);
                    kept.extend(it);
                    self.last_binary_conflict = Some((false_lit, q));
                    confl = Some(BINARY_CONFLICT);
                    break 'watches;
                }

                if assigns.is_assigned_pos(w.blocker) {
                    kept.push(w);
                    continue;
                }

                let mut c = ca.edit(w.cref);
                if c.head() == false_lit {
                    c.swap(0, 1);
                }
                let first = c.lits()[0];
                if first != w.blocker && assigns.is_assigned_pos(first) {
                    kept.push(Watcher { cref: w.cref, blocker: first });
                    continue;
                }

                let mut new_watch_lit = None;
                for i in 2..c.len() {
                    let lit = c.lits()[i];
                    if !assigns.is_assigned_neg(lit) {
                        c.swap(1, i);
                        new_watch_lit = Some(lit);
                        break;
                    }
                }
                drop(c);
                if let Some(lit) = new_watch_lit {
                    self.watches[!lit].watchers.push(Watcher { cref: w.cref, blocker: first });
                    continue;
                }

                // Clause is unit (or conflicting) under lits[0].
                if assigns.is_undef(first.var()) {
                    assigns.assign_lit(first, Reason::Clause(w.cref));
                    kept.push(Watcher { cref: w.cref, blocker: first });
                } else {
                    kept.push(w);
                    kept.extend(it);
                    confl = Some(w.cref);
                    break 'watches;
                }
            }

            self.watches[p].watchers = kept;

            if confl.is_some() {
                return confl;
            }
        }
        None
    }

    pub fn reloc_gc(&mut self, gc: &mut ClauseGC) {
        for line in self.watches.iter_mut() {
            let (_idx, wl): (usize, &mut WatchesLine) = line;
            wl.watchers.retain_mut(|w| {
                if w.cref == INVALID {
                    return true;
                }
                match gc.relocate(w.cref) {
                    Some(new_cr) => {
                        w.cref = new_cr;
                        true
                    }
                    None => false,
                }
            });
        }
    }
}
