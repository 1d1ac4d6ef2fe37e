//! Crate `derive` resolves derived factors over a block's trials: for
//! each derived level, enumerates the source-level configurations that
//! make its predicate true and emits the Tseitin biconditional tying the
//! derived variable to them, per `spec.md` §4.6.
//!
//! Predicates are treated as opaque callbacks and evaluated eagerly once
//! per configuration per level (`spec.md` §9, "Derivation predicates as
//! opaque callbacks") rather than re-evaluated per trial — the same
//! configuration set and predicate outcomes apply at every applicable
//! trial, only the literal each configuration expands to shifts with t.
use crate::block::Block;
use crate::cnf::Cnf;
use crate::constraints::exactly_one_direct;
use crate::design::{Design, FactorHandle, LevelHandle, Window};
use crate::error::EncodingError;
use crate::util::cartesian_product;

/// Resolves every derived factor in `block.design`, forcing non-applicable
/// trials' derived variables false and asserting exactly-one among a
/// derived factor's levels at every applicable trial.
pub fn resolve(block: &Block, cnf: &mut Cnf) -> Result<(), EncodingError> {
    for idx in 0..block.design.factors().len() {
        let factor = FactorHandle(idx);
        if block.design.factor(factor).is_simple(&block.design) {
            continue;
        }
        resolve_factor(block, factor, cnf)?;
    }
    Ok(())
}

fn resolve_factor(block: &Block, factor: FactorHandle, cnf: &mut Cnf) -> Result<(), EncodingError> {
    let design = &block.design;
    let levels = design.factor(factor).levels.clone();
    let window = design
        .factor(factor)
        .window(design)
        .expect("resolve_factor called on a non-derived factor");
    let sources = design
        .level(levels[0])
        .derivation()
        .expect("first level of a derived factor must carry a derivation")
        .sources
        .clone();

    let slots: Vec<Vec<LevelHandle>> = sources
        .iter()
        .flat_map(|&f| std::iter::repeat(design.factor(f).levels.clone()).take(window.width))
        .collect();
    let configurations = cartesian_product(&slots);

    // Eager, memoized predicate evaluation: one pass per level over every
    // configuration, independent of trial index.
    let config_names: Vec<Vec<&str>> = configurations
        .iter()
        .map(|c| c.iter().map(|&h| design.level(h).name()).collect())
        .collect();
    let supporting: Vec<Vec<&Vec<LevelHandle>>> = levels
        .iter()
        .map(|&lh| {
            let deriv = design.level(lh).derivation().unwrap();
            configurations
                .iter()
                .zip(config_names.iter())
                .filter(|(_, names)| (deriv.predicate)(names))
                .map(|(c, _)| c)
                .collect()
        })
        .collect();

    for t in 0..block.trial_count() {
        let level_vars: Vec<i32> = (0..levels.len())
            .map(|i| block.layout().level_var(factor, i, t))
            .collect();

        if !window.applicable_at(t) {
            for &v in &level_vars {
                cnf.assert_false(v, "derivation-inapplicable")?;
            }
            continue;
        }

        for (i, dv) in level_vars.iter().enumerate() {
            emit_biconditional(block, design, cnf, *dv, &supporting[i], &sources, window, t)?;
        }
        exactly_one_direct(cnf, &level_vars, "derivation-consistency")?;
    }
    Ok(())
}

fn config_literals(
    block: &Block,
    design: &Design,
    sources: &[FactorHandle],
    window: Window,
    t: usize,
    config: &[LevelHandle],
) -> Vec<i32> {
    let mut lits = Vec::with_capacity(sources.len() * window.width);
    for (src_idx, &g) in sources.iter().enumerate() {
        for offset in 0..window.width {
            let chosen = config[src_idx * window.width + offset];
            let li = design.level_index(g, chosen);
            let trial = t - (window.width - 1 - offset);
            lits.push(block.layout().level_var(g, li, trial));
        }
    }
    lits
}

#[allow(clippy::too_many_arguments)]
fn emit_biconditional(
    block: &Block,
    design: &Design,
    cnf: &mut Cnf,
    dv: i32,
    supporting: &[&Vec<LevelHandle>],
    sources: &[FactorHandle],
    window: Window,
    t: usize,
) -> Result<(), EncodingError> {
    let origin = "derivation";
    if supporting.is_empty() {
        return cnf.assert_false(dv, origin);
    }

    let mut disjuncts = Vec::with_capacity(supporting.len());
    for config in supporting {
        let lits = config_literals(block, design, sources, window, t, config);
        if lits.len() == 1 {
            disjuncts.push(lits[0]);
            continue;
        }
        let conj = cnf.allocate_var();
        for &l in &lits {
            cnf.add_clause(vec![-conj, l], origin)?;
        }
        let mut neg_lits: Vec<i32> = lits.iter().map(|&l| -l).collect();
        neg_lits.push(conj);
        cnf.add_clause(neg_lits, origin)?;
        disjuncts.push(conj);
    }

    let mut forward = vec![-dv];
    forward.extend(disjuncts.iter().cloned());
    cnf.add_clause(forward, origin)?;
    for &d in &disjuncts {
        cnf.add_clause(vec![-d, dv], origin)?;
    }
    Ok(())
}
