//! Crate `block` assembles a [`Design`] plus a [`Crossing`] plus a
//! constraint list into a [`Block`]: a resolved trial count and a
//! [`VariableLayout`] over the support set, per `spec.md` §3/§4.7.
use std::collections::HashMap;

use crate::constraints::{Constraint, ConstraintTarget};
use crate::design::{Design, FactorHandle};
use crate::error::LayoutError;

/// Options threaded through compilation that do not change the encoded
/// semantics, only how the build behaves — the ambient configuration
/// struct called for by this crate's logging/CLI layer, mirroring the
/// flat-struct-plus-`Default` shape of a solver's tuning config.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Emit a `tracing` span per lowering stage (derivation, crossing,
    /// run-length constraints) instead of only per-block.
    pub verbose_spans: bool,
    /// Reject a `MultipleCross` whose crossing sizes are unequal instead
    /// of accepting the compatibility computed from `MinimumTrials`.
    pub strict_multiple_cross: bool,
}

impl Default for CompileOptions {
    fn default() -> CompileOptions {
        CompileOptions {
            verbose_spans: false,
            strict_multiple_cross: true,
        }
    }
}

/// The set of factor combinations a block must realize at least once.
#[derive(Debug, Clone)]
pub enum Crossing {
    FullyCrossed(Vec<FactorHandle>),
    MultipleCross(Vec<Vec<FactorHandle>>),
}

impl Crossing {
    pub fn lists(&self) -> Vec<&[FactorHandle]> {
        match self {
            Crossing::FullyCrossed(fs) => vec![fs.as_slice()],
            Crossing::MultipleCross(lists) => lists.iter().map(|l| l.as_slice()).collect(),
        }
    }
}

fn crossing_size(design: &Design, factors: &[FactorHandle]) -> usize {
    factors.iter().map(|&f| design.factor(f).levels.len()).product()
}

/// A constraint's target factor, if it names one (`MinimumTrials` doesn't).
fn constraint_factor(constraint: &Constraint) -> Option<FactorHandle> {
    match constraint {
        Constraint::AtMostKInARow(_, ConstraintTarget::Factor(f)) => Some(*f),
        Constraint::AtMostKInARow(_, ConstraintTarget::FactorLevel(f, _)) => Some(*f),
        Constraint::AtLeastKInARow(_, f, _) => Some(*f),
        Constraint::ExactlyKInARow(_, f, _) => Some(*f),
        Constraint::Exclude(f, _) => Some(*f),
        Constraint::MinimumTrials(_) => None,
    }
}

/// Rejects any `FactorHandle` in `crossing` or `constraints` that doesn't
/// index into `design`'s arena, per `spec.md` §7.
fn validate_factor_handles(
    design: &Design,
    crossing: &Crossing,
    constraints: &[Constraint],
) -> Result<(), LayoutError> {
    let num_factors = design.factors().len();
    for list in crossing.lists() {
        for &f in list {
            if f.0 >= num_factors {
                return Err(LayoutError::UnknownCrossingFactor(f.0));
            }
        }
    }
    for constraint in constraints {
        if let Some(f) = constraint_factor(constraint) {
            if f.0 >= num_factors {
                return Err(LayoutError::UnknownConstraintFactor(f.0));
            }
        }
    }
    Ok(())
}

/// Assigns a contiguous block of variables per trial, factor-by-factor in
/// declaration order, per `spec.md` §4.7.
#[derive(Debug, Clone)]
pub struct VariableLayout {
    factor_order: Vec<FactorHandle>,
    factor_offset: HashMap<FactorHandle, usize>,
    factor_level_count: HashMap<FactorHandle, usize>,
    trial_width: usize,
    num_trials: usize,
}

impl VariableLayout {
    fn build(design: &Design, factor_order: &[FactorHandle], num_trials: usize) -> VariableLayout {
        let mut offset = 0usize;
        let mut factor_offset = HashMap::new();
        let mut factor_level_count = HashMap::new();
        for &f in factor_order {
            let k = design.factor(f).levels.len();
            factor_offset.insert(f, offset);
            factor_level_count.insert(f, k);
            offset += k;
        }
        VariableLayout {
            factor_order: factor_order.to_vec(),
            factor_offset,
            factor_level_count,
            trial_width: offset,
            num_trials,
        }
    }

    pub fn num_trials(&self) -> usize {
        self.num_trials
    }

    /// Total support-set size, S = Σ_f |levels(f)| · T.
    pub fn support_size(&self) -> usize {
        self.trial_width * self.num_trials
    }

    /// The variable for the `level_index`-th level of `factor` at `trial`.
    pub fn level_var(&self, factor: FactorHandle, level_index: usize, trial: usize) -> i32 {
        debug_assert!(trial < self.num_trials);
        let offset = self.factor_offset[&factor];
        (trial * self.trial_width + offset + level_index + 1) as i32
    }

    /// The level variables of `factor` at `trial`, in declared level order.
    pub fn factor_vars_at_trial(&self, factor: FactorHandle, trial: usize) -> Vec<i32> {
        let k = self.factor_level_count[&factor];
        (0..k).map(|i| self.level_var(factor, i, trial)).collect()
    }

    /// Factors in the order their variable ranges were assigned.
    pub fn factor_order(&self) -> &[FactorHandle] {
        &self.factor_order
    }
}

/// One sampling unit: a design, a crossing, a constraint list, and the
/// trial count and variable layout resolved from them.
pub struct Block {
    pub design: Design,
    pub crossing: Crossing,
    pub constraints: Vec<Constraint>,
    pub options: CompileOptions,
    trial_count: usize,
    layout: VariableLayout,
}

impl Block {
    /// Resolves a trial count and variable layout from `design`, `crossing`,
    /// and `constraints`, per `spec.md` §3 ("Block") and §4.7.
    pub fn new(
        design: Design,
        crossing: Crossing,
        constraints: Vec<Constraint>,
        options: CompileOptions,
    ) -> Result<Block, LayoutError> {
        validate_factor_handles(&design, &crossing, &constraints)?;

        let lists = crossing.lists();
        for list in &lists {
            if list.is_empty() {
                return Err(LayoutError::EmptyCrossing);
            }
        }
        let sizes: Vec<usize> = lists.iter().map(|l| crossing_size(&design, l)).collect();
        let base = *sizes.iter().max().unwrap();
        if options.strict_multiple_cross {
            for &s in &sizes {
                if s != base {
                    return Err(LayoutError::IncompatibleTrialCounts(s, base));
                }
            }
        }

        let minimum_trials = constraints
            .iter()
            .filter_map(|c| match c {
                Constraint::MinimumTrials(n) => Some(*n),
                _ => None,
            })
            .max()
            .unwrap_or(0);
        let trial_count = base.max(minimum_trials);

        let factor_order: Vec<FactorHandle> =
            (0..design.factors().len()).map(FactorHandle).collect();
        let layout = VariableLayout::build(&design, &factor_order, trial_count);

        Ok(Block {
            design,
            crossing,
            constraints,
            options,
            trial_count,
            layout,
        })
    }

    pub fn trial_count(&self) -> usize {
        self.trial_count
    }

    pub fn layout(&self) -> &VariableLayout {
        &self.layout
    }

    /// Whether `factor` is evaluated at `trial`, per its derivation window
    /// (always `true` for a simple factor).
    pub fn applicable_at(&self, factor: FactorHandle, trial: usize) -> bool {
        match self.design.factor(factor).window(&self.design) {
            Some(w) => w.applicable_at(trial),
            None => true,
        }
    }

    /// The trials at which every factor in `factors` is applicable.
    pub fn applicable_trials(&self, factors: &[FactorHandle]) -> Vec<usize> {
        (0..self.trial_count)
            .filter(|&t| factors.iter().all(|&f| self.applicable_at(f, t)))
            .collect()
    }

    /// Per `spec.md` §4.7: grouped by factor in layout order, the level
    /// variables available at `trial` (empty for a derived factor at a
    /// non-applicable trial).
    pub fn variable_list_for_trial(&self, trial: usize) -> Vec<(FactorHandle, Vec<i32>)> {
        self.layout
            .factor_order()
            .iter()
            .map(|&f| {
                let vars = if self.applicable_at(f, trial) {
                    self.layout.factor_vars_at_trial(f, trial)
                } else {
                    Vec::new()
                };
                (f, vars)
            })
            .collect()
    }
}
