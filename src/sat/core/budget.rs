use std::sync::atomic::{AtomicBool, Ordering};

/// Resource limits the search loop polls once per iteration. Negative
/// counters mean "unbounded". `asynch_interrupt` is the single volatile
/// flag a future signal handler would set; this crate installs no handler
/// itself, but the field is the documented touch point for one.
pub struct Budget {
    conflict_budget: i64,
    propagation_budget: i64,
    asynch_interrupt: AtomicBool,
}

impl Budget {
    pub fn new() -> Budget {
        Budget {
            conflict_budget: -1,
            propagation_budget: -1,
            asynch_interrupt: AtomicBool::new(false),
        }
    }

    pub fn off(&mut self) {
        self.conflict_budget = -1;
        self.propagation_budget = -1;
    }

    pub fn set_conflict_budget(&mut self, n: i64) {
        self.conflict_budget = n;
    }

    pub fn set_propagation_budget(&mut self, n: i64) {
        self.propagation_budget = n;
    }

    pub fn interrupt(&self) {
        self.asynch_interrupt.store(true, Ordering::Relaxed);
    }

    pub fn interrupted(&self) -> bool {
        self.asynch_interrupt.load(Ordering::Relaxed)
    }

    pub fn within(&self, conflicts: u64, propagations: u64) -> bool {
        if self.interrupted() {
            return false;
        }
        if self.conflict_budget >= 0 && conflicts as i64 >= self.conflict_budget {
            return false;
        }
        if self.propagation_budget >= 0 && propagations as i64 >= self.propagation_budget {
            return false;
        }
        true
    }
}

impl Default for Budget {
    fn default() -> Self {
        Budget::new()
    }
}
