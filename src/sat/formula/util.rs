use super::assignment::Assignment;
use super::{LBool, Lit, Var, VarMap};

/// A cheap filter used to skip full literal scans: the bitwise union of
/// `1 << (var & 31)` over a clause's literals. Two clauses that share no
/// abstraction bit cannot share a variable, which lets subsumption-style
/// checks reject most pairs without visiting their literals (kept here for
/// BVE's tautology pre-filter; not stored per-clause since this crate's
/// clause header has no abstraction field).
pub fn calc_abstraction(lits: &[Lit]) -> u32 {
    let mut abstraction = 0u32;
    for lit in lits {
        abstraction |= lit.abstraction();
    }
    abstraction
}

pub fn satisfied_with_assignment(lits: &[Lit], assignment: &Assignment) -> bool {
    lits.iter().any(|&lit| lit.is_pos_at(assignment.of_lit(lit)))
}

pub fn satisfied_with_model(lits: &[Lit], model: &VarMap<bool>) -> bool {
    lits.iter().any(|&lit| match model.get(&lit.var()) {
        Some(&val) => val != lit.sign(),
        None => false,
    })
}

pub fn extract_model(assignment: &Assignment) -> VarMap<bool> {
    let mut model = VarMap::new();
    for index in 0..assignment.number_of_vars() {
        let var = Var::from_index(index);
        match assignment.of_lit(var.pos_lit()) {
            LBool::True => {
                model.insert(&var, true);
            }
            LBool::False => {
                model.insert(&var, false);
            }
            LBool::Undef => {}
        }
    }
    model
}

/// Computes the resolvent of two clauses on variable `v`: the union of
/// their literals minus `v` and `!v`, deduplicated. Returns `None` if the
/// resolvent is a tautology (some other variable occurs with both
/// polarities across the two clauses).
pub fn merge(v: Var, ps: &[Lit], qs: &[Lit]) -> Option<Vec<Lit>> {
    let (longer, shorter) = if ps.len() >= qs.len() { (ps, qs) } else { (qs, ps) };

    let mut result = Vec::with_capacity(longer.len() + shorter.len());
    for &lit in longer {
        if lit.var() != v {
            result.push(lit);
        }
    }

    'outer: for &lit in shorter {
        if lit.var() == v {
            continue;
        }
        for &other in longer {
            if other == !lit {
                return None;
            }
            if other == lit {
                continue 'outer;
            }
        }
        result.push(lit);
    }

    Some(result)
}
