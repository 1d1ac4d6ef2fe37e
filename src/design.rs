//! Crate `design` provides the Factor/Level/Derivation data model.
//!
//! Per `spec.md` §9's Design Notes ("store factors and levels by handle...
//! rather than by pointer"), a [`Design`] is an arena: levels and factors
//! are pushed once and referenced thereafter by [`LevelHandle`] /
//! [`FactorHandle`], which gives every level identity-by-construction (two
//! levels sharing a name are still distinct handles) without lifetimes or
//! reference-counting, matching
//! `original_source/sweetpea/new_primitives.py`'s `Level.__eq__` semantics.
use std::collections::HashSet;

use crate::error::DesignError;

/// An index into a [`Design`]'s level arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LevelHandle(pub usize);

/// An index into a [`Design`]'s factor arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FactorHandle(pub usize);

/// The window a [`Derivation`] inspects: how many consecutive trials it
/// reads (`width`) and how often it fires (`stride`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub width: usize,
    pub stride: usize,
}

impl Window {
    pub const WITHIN_TRIAL: Window = Window { width: 1, stride: 1 };
    pub const TRANSITION: Window = Window { width: 2, stride: 1 };

    pub fn window(width: usize, stride: usize) -> Window {
        Window { width, stride }
    }

    /// Whether trial index `t` (0-based) is one at which this window's
    /// derivation is evaluated, per `spec.md` §3: `t >= width - 1` and
    /// `(t + 1) % stride == 0`.
    pub fn applicable_at(&self, t: usize) -> bool {
        t + 1 >= self.width && (t + 1) % self.stride == 0
    }
}

/// A predicate evaluated over one tuple of (source-factor, level) names —
/// one name per source factor per trial offset within the window — kept
/// opaque and memoized, per `spec.md` §9 ("Derivation predicates as opaque
/// callbacks"). Names, not handles: two levels named the same in different
/// factors are distinct `LevelHandle`s, so a predicate comparing handles
/// could never express cross-factor equality (`new_primitives.py:443-446`
/// passes level name strings into a `WithinTrial` predicate for exactly
/// this reason).
pub type Predicate = std::rc::Rc<dyn Fn(&[&str]) -> bool>;

/// A derivation: the predicate plus the source factors and window it
/// evaluates over.
#[derive(Clone)]
pub struct Derivation {
    pub predicate: Predicate,
    pub sources: Vec<FactorHandle>,
    pub window: Window,
}

impl Derivation {
    pub fn within_trial(predicate: Predicate, sources: Vec<FactorHandle>) -> Derivation {
        Derivation {
            predicate,
            sources,
            window: Window::WITHIN_TRIAL,
        }
    }

    pub fn transition(predicate: Predicate, sources: Vec<FactorHandle>) -> Derivation {
        Derivation {
            predicate,
            sources,
            window: Window::TRANSITION,
        }
    }

    pub fn window_of(
        predicate: Predicate,
        sources: Vec<FactorHandle>,
        width: usize,
        stride: usize,
    ) -> Derivation {
        Derivation {
            predicate,
            sources,
            window: Window::window(width, stride),
        }
    }
}

/// One value a [`Factor`] can take.
#[derive(Clone)]
pub enum Level {
    Simple { name: String },
    Derived { name: String, derivation: Derivation },
}

impl Level {
    pub fn name(&self) -> &str {
        match self {
            Level::Simple { name } => name,
            Level::Derived { name, .. } => name,
        }
    }

    pub fn is_simple(&self) -> bool {
        matches!(self, Level::Simple { .. })
    }

    pub fn derivation(&self) -> Option<&Derivation> {
        match self {
            Level::Derived { derivation, .. } => Some(derivation),
            Level::Simple { .. } => None,
        }
    }
}

/// An unresolved level supplied to [`Design::add_factor`]; `Else` is
/// resolved into a `Derived` level during factor construction, per
/// `spec.md` §3.
pub enum LevelSpec {
    Simple(String),
    Derived(String, Derivation),
    Else(String),
}

/// An independent variable: a name plus an ordered list of levels. Simple
/// if every level is a `Level::Simple`, derived otherwise (`spec.md` §3).
pub struct Factor {
    pub name: String,
    pub levels: Vec<LevelHandle>,
}

impl Factor {
    pub fn is_simple(&self, design: &Design) -> bool {
        self.levels.iter().all(|&h| design.level(h).is_simple())
    }

    /// The shared window of this factor's levels, or `None` if the factor
    /// is simple (and therefore applicable at every trial). Derived
    /// factors' levels are validated at construction to share one window,
    /// so the first derived level found is representative.
    pub fn window(&self, design: &Design) -> Option<Window> {
        self.levels
            .iter()
            .find_map(|&h| design.level(h).derivation())
            .map(|d| d.window)
    }
}

/// The arena owning every level and factor constructed for one design.
#[derive(Default)]
pub struct Design {
    levels: Vec<Level>,
    factors: Vec<Factor>,
}

impl Design {
    pub fn new() -> Design {
        Design::default()
    }

    pub fn level(&self, h: LevelHandle) -> &Level {
        &self.levels[h.0]
    }

    pub fn factor(&self, h: FactorHandle) -> &Factor {
        &self.factors[h.0]
    }

    pub fn factors(&self) -> &[Factor] {
        &self.factors
    }

    pub fn factor_handle_by_name(&self, name: &str) -> Option<FactorHandle> {
        self.factors
            .iter()
            .position(|f| f.name == name)
            .map(FactorHandle)
    }

    /// The position of `level` within `factor`'s level list.
    pub fn level_index(&self, factor: FactorHandle, level: LevelHandle) -> usize {
        self.factor(factor)
            .levels
            .iter()
            .position(|&h| h == level)
            .expect("level must belong to its factor")
    }

    /// Constructs a factor from a list of level specs, resolving any
    /// `LevelSpec::Else` among them into a `Level::Derived` whose
    /// predicate negates the disjunction of its sibling derived
    /// predicates, per `spec.md` §3 and
    /// `original_source/sweetpea/new_primitives.py`'s
    /// `ElseLevel.derive_level_from_levels`.
    pub fn add_factor(&mut self, name: impl Into<String>, specs: Vec<LevelSpec>) -> Result<FactorHandle, DesignError> {
        let name = name.into();
        if specs.is_empty() {
            return Err(DesignError::EmptyLevelList(name));
        }

        let is_simple = matches!(specs[0], LevelSpec::Simple(_));
        let is_else_or_derived = |s: &LevelSpec| !matches!(s, LevelSpec::Simple(_));
        if is_simple && specs.iter().any(is_else_or_derived) {
            return Err(DesignError::HeterogeneousLevels(name));
        }
        if !is_simple && specs.iter().any(|s| matches!(s, LevelSpec::Simple(_))) {
            return Err(DesignError::HeterogeneousLevels(name));
        }

        if specs.iter().filter(|s| matches!(s, LevelSpec::Else(_))).count() > 1 {
            return Err(DesignError::MultipleElseLevels(name));
        }

        let sibling_derivations: Vec<&Derivation> = specs
            .iter()
            .filter_map(|s| match s {
                LevelSpec::Derived(_, d) => Some(d),
                _ => None,
            })
            .collect();
        if !sibling_derivations.is_empty() {
            let first = sibling_derivations[0];
            for d in &sibling_derivations[1..] {
                if d.window != first.window || d.sources != first.sources {
                    return Err(DesignError::MixedDerivationWindow);
                }
            }
            validate_derivation(self, &name, first)?;
        }

        let mut handles = Vec::with_capacity(specs.len());
        for spec in specs {
            let level = match spec {
                LevelSpec::Simple(level_name) => Level::Simple { name: level_name },
                LevelSpec::Derived(level_name, derivation) => Level::Derived {
                    name: level_name,
                    derivation,
                },
                LevelSpec::Else(level_name) => {
                    if sibling_derivations.is_empty() {
                        return Err(DesignError::ElseLevelWithoutSiblings(level_name));
                    }
                    let first = sibling_derivations[0];
                    let sibling_predicates: Vec<Predicate> =
                        sibling_derivations.iter().map(|d| d.predicate.clone()).collect();
                    let else_predicate: Predicate = std::rc::Rc::new(move |names: &[&str]| {
                        !sibling_predicates.iter().any(|p| p(names))
                    });
                    Level::Derived {
                        name: level_name,
                        derivation: Derivation {
                            predicate: else_predicate,
                            sources: first.sources.clone(),
                            window: first.window,
                        },
                    }
                }
            };
            self.levels.push(level);
            handles.push(LevelHandle(self.levels.len() - 1));
        }

        self.factors.push(Factor {
            name,
            levels: handles,
        });
        Ok(FactorHandle(self.factors.len() - 1))
    }
}

fn validate_derivation(design: &Design, factor_name: &str, derivation: &Derivation) -> Result<(), DesignError> {
    if derivation.window.width < 1 {
        return Err(DesignError::InvalidWidth(derivation.window.width));
    }
    if derivation.window.stride < 1 {
        return Err(DesignError::InvalidStride(derivation.window.stride));
    }
    if derivation.sources.is_empty() {
        return Err(DesignError::EmptySourceFactors);
    }
    let mut seen = HashSet::new();
    for &s in &derivation.sources {
        let sname = &design.factor(s).name;
        if !seen.insert(sname.clone()) {
            return Err(DesignError::DuplicateSourceFactor(
                factor_name.to_string(),
                sname.clone(),
            ));
        }
        let source_factor = design.factor(s);
        if let Some(inner) = source_factor
            .levels
            .iter()
            .find_map(|&h| design.level(h).derivation())
        {
            if inner.window.stride > 1 {
                return Err(DesignError::NestedStrideViolation(source_factor.name.clone()));
            }
        }
    }
    Ok(())
}
