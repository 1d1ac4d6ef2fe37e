//! Error kinds raised by the compiler, one enum per `spec.md` §7 category.
use thiserror::Error;

/// Errors raised while constructing the design-language data model
/// (factors, levels, derivations) — always fatal, always at construction
/// time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DesignError {
    #[error("factor {0:?} has no levels")]
    EmptyLevelList(String),
    #[error("factor {0:?} mixes simple and derived levels")]
    HeterogeneousLevels(String),
    #[error("derivation for factor {0:?} names source factor {1:?} more than once")]
    DuplicateSourceFactor(String, String),
    #[error("derivation width must be >= 1, got {0}")]
    InvalidWidth(usize),
    #[error("derivation stride must be >= 1, got {0}")]
    InvalidStride(usize),
    #[error("derivation source factor {0:?} has stride > 1; nested stride composition is rejected")]
    NestedStrideViolation(String),
    #[error("derivation requires at least one source factor")]
    EmptySourceFactors,
    #[error("ElseLevel {0:?} has no sibling DerivedLevels to negate")]
    ElseLevelWithoutSiblings(String),
    #[error("factor {0:?} declares more than one ElseLevel")]
    MultipleElseLevels(String),
    #[error("a derived factor's levels disagree on window width/stride")]
    MixedDerivationWindow,
}

/// Errors raised while assembling a `Block` out of a design, crossing, and
/// constraint list.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("crossing references factor handle {0}, which is not part of the design")]
    UnknownCrossingFactor(usize),
    #[error("a crossing must name at least one factor")]
    EmptyCrossing,
    #[error("multiple-cross block has crossings implying incompatible trial counts ({0} vs {1}); this configuration is ambiguous and rejected rather than guessed at")]
    IncompatibleTrialCounts(usize, usize),
    #[error("constraint references factor handle {0}, which is not part of the design")]
    UnknownConstraintFactor(usize),
}

/// Errors raised while lowering a `Block` into CNF — indicate a bug in the
/// lowerer itself, not bad user input, and should never occur in a correct
/// build.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("attempted to add an empty clause (originating constraint: {0})")]
    EmptyClause(String),
    #[error("literal 0 used as a variable identity (originating constraint: {0})")]
    ZeroLiteral(String),
    #[error("variable {0} exceeds the formula's recorded variable count {1}")]
    VariableOutOfRange(i32, i32),
}

/// Errors surfaced by the sampler boundary. The core never retries these;
/// they propagate to the caller as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SamplerError {
    #[error("sampler exited with status {code}: {stderr}")]
    NonZeroExit { code: i32, stderr: String },
    #[error("sampler produced a malformed assignment: {0}")]
    MalformedAssignment(String),
}

/// The union of every error this crate can return.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error(transparent)]
    Design(#[from] DesignError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error(transparent)]
    Sampler(#[from] SamplerError),
}
