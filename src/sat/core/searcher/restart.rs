use super::luby::luby;

#[derive(Clone)]
pub struct RestartSettings {
    pub luby_restart: bool,
    pub restart_first: f64,
    pub restart_inc: f64,

    /// Fast EMA decay for the Glucose/LBD restart heuristic.
    pub glucose_fast_decay: f64,
    /// Slow EMA decay for the Glucose/LBD restart heuristic.
    pub glucose_slow_decay: f64,
    /// Fast-over-slow margin that must be exceeded to trigger a restart.
    pub glucose_margin: f64,
    /// Minimum conflicts since the last restart before Glucose/LBD may fire.
    pub glucose_min_conflicts: u64,
    /// Suppress a Glucose/LBD restart while the current trail is still
    /// shorter than this many assignments — the search hasn't grown the
    /// trail enough yet for a restart to be worth the progress it would
    /// throw away.
    pub postpone_factor: f64,
}

impl Default for RestartSettings {
    fn default() -> Self {
        RestartSettings {
            luby_restart: true,
            restart_first: 100.0,
            restart_inc: 2.0,
            glucose_fast_decay: 0.8,
            glucose_slow_decay: 0.9999,
            glucose_margin: 1.0,
            glucose_min_conflicts: 50,
            postpone_factor: 10.0,
        }
    }
}

/// Combines a geometric/Luby restart schedule with a Glucose-style LBD
/// moving-average trigger; restarts fire when either condition is met.
/// See DESIGN.md — no single teacher source implements the LBD half, only
/// the geometric/Luby half is grounded directly on the teacher's
/// `RestartStrategy`.
pub struct RestartController {
    settings: RestartSettings,
    restarts: u32,
    conflicts_this_cycle: u64,
    conflicts_since_restart: u64,
    lbd_fast: f64,
    lbd_slow: f64,
    lbd_initialized: bool,
}

impl RestartController {
    pub fn new(settings: RestartSettings) -> RestartController {
        RestartController {
            settings,
            restarts: 0,
            conflicts_this_cycle: 0,
            conflicts_since_restart: 0,
            lbd_fast: 0.0,
            lbd_slow: 0.0,
            lbd_initialized: false,
        }
    }

    fn geometric_threshold(&self) -> u64 {
        let factor = if self.settings.luby_restart {
            luby(2.0, self.restarts)
        } else {
            self.settings.restart_inc.powi(self.restarts as i32)
        };
        (factor * self.settings.restart_first) as u64
    }

    /// Call once per conflict with the learnt clause's LBD and the current
    /// trail size. Returns `true` if the search loop should restart now.
    pub fn record_conflict(&mut self, lbd: u32, trail_size: usize) -> bool {
        self.conflicts_this_cycle += 1;
        self.conflicts_since_restart += 1;

        let lbd = lbd as f64;
        if !self.lbd_initialized {
            self.lbd_fast = lbd;
            self.lbd_slow = lbd;
            self.lbd_initialized = true;
        } else {
            self.lbd_fast += (lbd - self.lbd_fast) * (1.0 - self.settings.glucose_fast_decay);
            self.lbd_slow += (lbd - self.lbd_slow) * (1.0 - self.settings.glucose_slow_decay);
        }

        let geometric_fires = self.conflicts_this_cycle >= self.geometric_threshold();

        let postponed = self.settings.postpone_factor > 0.0
            && (trail_size as f64) < self.settings.postpone_factor;

        let glucose_fires = self.conflicts_since_restart >= self.settings.glucose_min_conflicts
            && self.lbd_fast > self.lbd_slow * self.settings.glucose_margin
            && !postponed;

        geometric_fires || glucose_fires
    }

    pub fn notify_restart(&mut self, _trail_size: usize) {
        self.restarts += 1;
        self.conflicts_this_cycle = 0;
        self.conflicts_since_restart = 0;
    }
}
