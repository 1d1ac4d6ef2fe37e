//! Crate `constraints` lowers a [`Block`]'s crossing and run-length
//! constraints to CNF, per `spec.md` §4.8. Consistency for *derived*
//! factors is emitted alongside their biconditionals in [`crate::derive`];
//! this module handles consistency for simple factors, the crossing(s),
//! and the explicit run-length/exclusion constraints.
use crate::block::{Block, Crossing};
use crate::cardinality::GenerationRequest;
use crate::cnf::Cnf;
use crate::design::{FactorHandle, LevelHandle};
use crate::error::EncodingError;
use crate::util::cartesian_product;

/// What an `AtMostKInARow` constraint restricts: a single level, or every
/// level of a factor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintTarget {
    Factor(FactorHandle),
    FactorLevel(FactorHandle, LevelHandle),
}

/// A run-length, exclusion, or layout constraint from `spec.md` §4.8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    AtMostKInARow(usize, ConstraintTarget),
    AtLeastKInARow(usize, FactorHandle, LevelHandle),
    ExactlyKInARow(usize, FactorHandle, LevelHandle),
    Exclude(FactorHandle, LevelHandle),
    MinimumTrials(usize),
}

fn level_index(block: &Block, factor: FactorHandle, level: LevelHandle) -> usize {
    block.design.level_index(factor, level)
}

/// Lowers consistency (for simple factors), the crossing(s), and every
/// explicit constraint in `block.constraints` into `cnf`, deferring
/// cardinality assertions into the returned request list.
pub fn lower(block: &Block, cnf: &mut Cnf) -> Result<Vec<GenerationRequest>, EncodingError> {
    let mut requests = Vec::new();

    lower_simple_consistency(block, cnf)?;

    for list in block.crossing.lists() {
        lower_crossing(block, list, cnf, &mut requests)?;
    }

    for constraint in &block.constraints {
        match constraint {
            Constraint::AtMostKInARow(k, target) => {
                lower_at_most_k_in_a_row(block, *k, target, cnf)?;
            }
            Constraint::AtLeastKInARow(k, factor, level) => {
                lower_at_least_k_in_a_row(block, *k, *factor, *level, cnf)?;
            }
            Constraint::ExactlyKInARow(k, factor, level) => {
                lower_at_least_k_in_a_row(block, *k, *factor, *level, cnf)?;
                lower_at_most_k_in_a_row(
                    block,
                    *k,
                    &ConstraintTarget::FactorLevel(*factor, *level),
                    cnf,
                )?;
            }
            Constraint::Exclude(factor, level) => {
                lower_exclude(block, *factor, *level, cnf)?;
            }
            Constraint::MinimumTrials(_) => {
                // Purely a layout directive, already folded into the
                // block's trial count; no CNF output.
            }
        }
    }

    Ok(requests)
}

pub(crate) fn exactly_one_direct(cnf: &mut Cnf, vars: &[i32], origin: &str) -> Result<(), EncodingError> {
    if vars.is_empty() {
        return Ok(());
    }
    cnf.add_clause(vars.to_vec(), origin)?;
    for i in 0..vars.len() {
        for j in (i + 1)..vars.len() {
            cnf.add_clause(vec![-vars[i], -vars[j]], origin)?;
        }
    }
    Ok(())
}

fn lower_simple_consistency(block: &Block, cnf: &mut Cnf) -> Result<(), EncodingError> {
    for (idx, factor) in block.design.factors().iter().enumerate() {
        if !factor.is_simple(&block.design) {
            continue;
        }
        let handle = FactorHandle(idx);
        for t in 0..block.trial_count() {
            let vars = block.layout().factor_vars_at_trial(handle, t);
            exactly_one_direct(cnf, &vars, "consistency")?;
        }
    }
    Ok(())
}

fn lower_crossing(
    block: &Block,
    list: &[FactorHandle],
    cnf: &mut Cnf,
    requests: &mut Vec<GenerationRequest>,
) -> Result<(), EncodingError> {
    let origin = "crossing";
    let applicable = block.applicable_trials(list);
    let level_counts: Vec<usize> = list
        .iter()
        .map(|&f| block.design.factor(f).levels.len())
        .collect();
    let n_combinations: usize = level_counts.iter().product();
    if n_combinations == 0 || applicable.is_empty() {
        return Ok(());
    }
    let slots: Vec<Vec<usize>> = level_counts.iter().map(|&k| (0..k).collect()).collect();
    let combinations = cartesian_product(&slots);

    for combo in combinations {
        let mut match_vars = Vec::with_capacity(applicable.len());
        for &t in &applicable {
            let lits: Vec<i32> = list
                .iter()
                .zip(combo.iter())
                .map(|(&f, &li)| block.layout().level_var(f, li, t))
                .collect();
            let m = cnf.allocate_var();
            for &l in &lits {
                cnf.add_clause(vec![-m, l], origin)?;
            }
            let mut neg_then_m: Vec<i32> = lits.iter().map(|&l| -l).collect();
            neg_then_m.push(m);
            cnf.add_clause(neg_then_m, origin)?;
            match_vars.push(m);
        }

        let n_applicable = applicable.len();
        if n_applicable % n_combinations == 0 {
            let k = n_applicable / n_combinations;
            requests.push(GenerationRequest::eq(k, match_vars, origin));
        } else {
            let floor = n_applicable / n_combinations;
            let ceil = floor + 1;
            if floor == 0 {
                requests.push(GenerationRequest::lt(ceil + 1, match_vars, origin));
            } else {
                requests.push(GenerationRequest::gt(floor - 1, match_vars.clone(), origin));
                requests.push(GenerationRequest::lt(ceil + 1, match_vars, origin));
            }
        }
    }
    Ok(())
}

fn targets_to_level_indices(block: &Block, target: &ConstraintTarget) -> Vec<(FactorHandle, usize)> {
    match target {
        ConstraintTarget::FactorLevel(f, l) => vec![(*f, level_index(block, *f, *l))],
        ConstraintTarget::Factor(f) => {
            let n = block.design.factor(*f).levels.len();
            (0..n).map(|i| (*f, i)).collect()
        }
    }
}

fn lower_at_most_k_in_a_row(
    block: &Block,
    k: usize,
    target: &ConstraintTarget,
    cnf: &mut Cnf,
) -> Result<(), EncodingError> {
    let origin = "at_most_k_in_a_row";
    let t_count = block.trial_count();
    if t_count < k + 1 {
        return Ok(());
    }
    for (factor, li) in targets_to_level_indices(block, target) {
        for start in 0..=(t_count - (k + 1)) {
            let lits: Vec<i32> = (start..start + k + 1)
                .map(|t| -block.layout().level_var(factor, li, t))
                .collect();
            cnf.add_clause(lits, origin)?;
        }
    }
    Ok(())
}

fn lower_at_least_k_in_a_row(
    block: &Block,
    k: usize,
    factor: FactorHandle,
    level: LevelHandle,
    cnf: &mut Cnf,
) -> Result<(), EncodingError> {
    let origin = "at_least_k_in_a_row";
    let t_count = block.trial_count();
    let li = level_index(block, factor, level);
    if k == 0 {
        return Ok(());
    }
    if t_count < k {
        // No run can ever reach length k: the level may never occur.
        for t in 0..t_count {
            cnf.assert_false(block.layout().level_var(factor, li, t), origin)?;
        }
        return Ok(());
    }
    let var = |t: usize| block.layout().level_var(factor, li, t);
    for t in 0..t_count {
        if t + k > t_count {
            // Not enough trials left to complete a run started here.
            if t > 0 {
                cnf.add_clause(vec![-var(t), var(t - 1)], origin)?;
            }
            continue;
        }
        for j in 1..k {
            if t == 0 {
                cnf.add_clause(vec![-var(0), var(j)], origin)?;
            } else {
                cnf.add_clause(vec![var(t - 1), -var(t), var(t + j)], origin)?;
            }
        }
    }
    Ok(())
}

fn lower_exclude(
    block: &Block,
    factor: FactorHandle,
    level: LevelHandle,
    cnf: &mut Cnf,
) -> Result<(), EncodingError> {
    let origin = "exclude";
    let li = level_index(block, factor, level);
    for t in 0..block.trial_count() {
        if block.applicable_at(factor, t) {
            cnf.assert_false(block.layout().level_var(factor, li, t), origin)?;
        }
    }
    Ok(())
}
