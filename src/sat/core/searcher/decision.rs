use crate::sat::formula::assignment::Assignment;
use crate::sat::formula::{Lit, Var, VarHeap, VarMap};

use super::random::Random;

#[derive(PartialEq, Eq, Clone, Copy)]
pub enum PhaseSaving {
    None,
    Limited,
    Full,
}

#[derive(Clone)]
pub struct DecisionHeuristicSettings {
    pub var_decay: f64,
    pub random_seed: f64,
    pub random_var_freq: f64,
    pub phase_saving: PhaseSaving,
    pub rnd_pol: bool,
    pub rnd_init_act: bool,
}

impl Default for DecisionHeuristicSettings {
    fn default() -> Self {
        DecisionHeuristicSettings {
            var_decay: 0.95,
            random_seed: 91648253.0,
            random_var_freq: 0.0,
            phase_saving: PhaseSaving::Full,
            rnd_pol: false,
            rnd_init_act: false,
        }
    }
}

#[derive(Clone, Copy)]
struct VarLine {
    polarity: bool,
    user_pol: Option<bool>,
    decision: bool,
}

/// VSIDS activity tracking and the decision-variable priority queue.
pub struct DecisionHeuristic {
    settings: DecisionHeuristicSettings,
    var_inc: f64,
    rand: Random,
    var: VarMap<VarLine>,
    activity: VarMap<f64>,
    queue: VarHeap,
    dec_vars: usize,
    pub rnd_decisions: u64,
}

impl DecisionHeuristic {
    pub fn new(settings: DecisionHeuristicSettings) -> DecisionHeuristic {
        let seed = settings.random_seed;
        DecisionHeuristic {
            settings,
            var_inc: 1.0,
            rand: Random::new(seed),
            var: VarMap::new(),
            activity: VarMap::new(),
            queue: VarHeap::new(),
            dec_vars: 0,
            rnd_decisions: 0,
        }
    }

    pub fn init_var(&mut self, v: Var, upol: Option<bool>, dvar: bool) {
        self.var.insert(
            &v,
            VarLine {
                polarity: true,
                user_pol: upol,
                decision: false,
            },
        );
        let act = if self.settings.rnd_init_act {
            self.rand.drand() * 0.00001
        } else {
            0.0
        };
        self.activity.insert(&v, act);
        self.set_decision_var(v, dvar);
        self.insert_var_order(v);
    }

    pub fn set_decision_var(&mut self, v: Var, b: bool) {
        let was = self.var[&v].decision;
        self.var[&v].decision = b;
        if b && !was {
            self.dec_vars += 1;
        } else if !b && was {
            self.dec_vars -= 1;
        }
    }

    fn insert_var_order(&mut self, v: Var) {
        if self.var[&v].decision {
            let activity = &self.activity;
            self.queue.insert(v, &|a: &Var, b: &Var| activity[a] > activity[b]);
        }
    }

    pub fn cancel(&mut self, lit: Lit) {
        let v = lit.var();
        if self.settings.phase_saving == PhaseSaving::Full
            || (self.settings.phase_saving == PhaseSaving::Limited)
        {
            self.var[&v].polarity = !lit.sign();
        }
        self.insert_var_order(v);
    }

    pub fn bump_activity(&mut self, v: Var) {
        let new_act = self.activity[&v] + self.var_inc;
        self.activity.insert(&v, new_act);
        if new_act > 1e100 {
            for (_, act) in self.activity.iter_mut() {
                *act *= 1e-100;
            }
            self.var_inc *= 1e-100;
        }
        let activity = &self.activity;
        self.queue.update(&v, &|a: &Var, b: &Var| activity[a] > activity[b]);
    }

    pub fn decay_activity(&mut self) {
        self.var_inc *= 1.0 / self.settings.var_decay;
    }

    pub fn rebuild_order_heap(&mut self, assigns: &Assignment) {
        let mut vars = Vec::new();
        for index in 0..assigns.number_of_vars() {
            let v = Var::from_index(index);
            if self.var.get(&v).map_or(false, |l| l.decision) && assigns.is_undef(v) {
                vars.push(v);
            }
        }
        let activity = &self.activity;
        self.queue.heapify_from(vars, &|a: &Var, b: &Var| activity[a] > activity[b]);
    }

    pub fn pick_branch_var(&mut self, assigns: &Assignment) -> Option<Var> {
        if self.settings.random_var_freq > 0.0
            && self.rand.chance(self.settings.random_var_freq)
            && !self.queue.is_empty()
        {
            let index = self.rand.irand(assigns.number_of_vars());
            let v = Var::from_index(index);
            if assigns.is_undef(v) && self.var.get(&v).map_or(false, |l| l.decision) {
                self.rnd_decisions += 1;
                return Some(v);
            }
        }

        loop {
            let activity = &self.activity;
            match self.queue.pop(&|a: &Var, b: &Var| activity[a] > activity[b]) {
                None => return None,
                Some(v) => {
                    if assigns.is_undef(v) && self.var.get(&v).map_or(false, |l| l.decision) {
                        return Some(v);
                    }
                }
            }
        }
    }

    pub fn pick_branch_lit(&mut self, assigns: &Assignment) -> Option<Lit> {
        self.pick_branch_var(assigns).map(|v| {
            let line = self.var[&v];
            let sign = if let Some(p) = line.user_pol {
                !p
            } else if self.settings.rnd_pol {
                self.rand.chance(0.5)
            } else {
                !line.polarity
            };
            v.sign_lit(sign)
        })
    }

    pub fn number_of_decision_vars(&self) -> usize {
        self.dec_vars
    }
}
