use crate::sat::formula::assignment::Assignment;
use crate::sat::formula::clause::{ClauseAllocator, ClauseGC, CRef};
use crate::sat::formula::{Lit, LitMap, Var, VarHeap, VarMap};

#[derive(Default, Clone, Copy)]
pub struct VarStatus {
    pub frozen: bool,
    pub eliminated: bool,
}

/// Cost-ordered queue of elimination candidates: variables are popped
/// cheapest-first, where cost is the product of positive and negative
/// occurrence counts (the size of the cartesian product of resolvents).
pub struct ElimQueue {
    heap: VarHeap,
    n_occ: LitMap<isize>,
}

impl ElimQueue {
    pub fn new() -> ElimQueue {
        ElimQueue {
            heap: VarHeap::new(),
            n_occ: LitMap::new(),
        }
    }

    pub fn init_var(&mut self, v: Var) {
        self.n_occ.insert(&v.pos_lit(), 0);
        self.n_occ.insert(&v.neg_lit(), 0);
    }

    fn cost(n_occ: &LitMap<isize>, v: &Var) -> isize {
        n_occ[&v.pos_lit()] * n_occ[&v.neg_lit()]
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }

    pub fn bump_lit_occ(&mut self, lit: Lit, delta: isize) {
        let v = self.n_occ[&lit] + delta;
        self.n_occ.insert(&lit, v);
    }

    pub fn update_elim_heap(&mut self, v: Var, var_status: &VarMap<VarStatus>, assigns: &Assignment) {
        if var_status[&v].frozen || var_status[&v].eliminated || !assigns.is_undef(v) {
            return;
        }
        let n_occ = &self.n_occ;
        self.heap.update(&v, &|a: &Var, b: &Var| Self::cost(n_occ, a) < Self::cost(n_occ, b));
        if !self.heap.contains(&v) {
            let n_occ = &self.n_occ;
            self.heap.insert(v, &|a: &Var, b: &Var| Self::cost(n_occ, a) < Self::cost(n_occ, b));
        }
    }

    pub fn pop(&mut self) -> Option<Var> {
        let n_occ = &self.n_occ;
        self.heap.pop(&|a: &Var, b: &Var| Self::cost(n_occ, a) < Self::cost(n_occ, b))
    }
}

#[derive(Default, Clone)]
struct OccLine {
    occs: Vec<CRef>,
    dirty: bool,
}

/// Per-variable occurrence lists; lazily filters out deleted clauses on
/// lookup instead of eagerly maintaining the list on every deletion.
pub struct OccLists {
    occs: VarMap<OccLine>,
}

impl OccLists {
    pub fn new() -> OccLists {
        OccLists { occs: VarMap::new() }
    }

    pub fn init_var(&mut self, v: Var) {
        self.occs.insert(&v, OccLine::default());
    }

    pub fn clear_var(&mut self, v: Var) {
        self.occs.insert(&v, OccLine::default());
    }

    pub fn push_occ(&mut self, v: Var, cr: CRef) {
        self.occs[&v].occs.push(cr);
    }

    pub fn remove_occ(&mut self, v: Var, cr: CRef) {
        if let Some(pos) = self.occs[&v].occs.iter().position(|&c| c == cr) {
            self.occs[&v].occs.swap_remove(pos);
        }
    }

    pub fn lookup(&mut self, ca: &ClauseAllocator, v: Var) -> &Vec<CRef> {
        if self.occs[&v].dirty {
            let kept: Vec<CRef> = self.occs[&v].occs.iter().cloned().filter(|&cr| !ca.is_deleted(cr)).collect();
            self.occs[&v].occs = kept;
            self.occs[&v].dirty = false;
        }
        &self.occs[&v].occs
    }

    pub fn smudge(&mut self, v: Var) {
        self.occs[&v].dirty = true;
    }

    pub fn gc(&mut self, gc: &mut ClauseGC) {
        for (_, line) in self.occs.iter_mut() {
            let mut kept = Vec::with_capacity(line.occs.len());
            for &cr in &line.occs {
                if let Some(new_cr) = gc.relocate(cr) {
                    kept.push(new_cr);
                }
            }
            line.occs = kept;
            line.dirty = false;
        }
    }
}
