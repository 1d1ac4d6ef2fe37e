//! Crate `cnf` provides the CNF algebra: an append-only conjunction of
//! clauses plus the operations the rest of the compiler builds on.
use std::fmt::Write as _;

use crate::error::EncodingError;
use crate::pool::VarPool;
use crate::types::{Lit, LiteralOps, Var};

/// A nonempty, ordered disjunction of literals. Order is preserved for
/// reproducible serialization but is not semantically significant.
pub type Clause = Vec<Lit>;

/// An append-only conjunction of clauses with an associated variable pool.
///
/// `Cnf` is the builder described in `spec.md` §9 ("Fresh-variable
/// allocation vs. immutability"): it exposes `allocate_vars`/`add_clause`
/// during construction and is serialized once lowering completes.
#[derive(Debug, Clone, Default)]
pub struct Cnf {
    clauses: Vec<Clause>,
    pool: VarPool,
}

impl Cnf {
    /// An empty formula with a fresh variable pool starting at 1.
    pub fn new() -> Cnf {
        Cnf {
            clauses: Vec::new(),
            pool: VarPool::new(),
        }
    }

    /// The number of variables allocated so far.
    pub fn num_vars(&self) -> Var {
        self.pool.fresh_counter()
    }

    /// The clauses added so far, in emission order.
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn num_clauses(&self) -> usize {
        self.clauses.len()
    }

    /// Allocates one fresh variable.
    pub fn allocate_var(&mut self) -> Var {
        self.pool.fresh()
    }

    /// Allocates `n` fresh variables.
    pub fn allocate_vars(&mut self, n: usize) -> Vec<Var> {
        self.pool.fresh_n(n)
    }

    /// Appends a clause. `origin` names the constraint or derivation that
    /// produced it, used only for error context — an empty clause or a
    /// literal with identity 0 indicates a bug in the lowerer and is fatal.
    pub fn add_clause(&mut self, literals: Clause, origin: &str) -> Result<(), EncodingError> {
        if literals.is_empty() {
            return Err(EncodingError::EmptyClause(origin.to_string()));
        }
        for &l in &literals {
            if l == 0 {
                return Err(EncodingError::ZeroLiteral(origin.to_string()));
            }
            let v = l.var();
            if v > self.num_vars() {
                return Err(EncodingError::VariableOutOfRange(v, self.num_vars()));
            }
        }
        self.clauses.push(literals);
        Ok(())
    }

    /// Adds the unit clause asserting `v` true.
    pub fn assert_true(&mut self, v: Var, origin: &str) -> Result<(), EncodingError> {
        self.add_clause(vec![v], origin)
    }

    /// Adds the unit clause asserting `v` false.
    pub fn assert_false(&mut self, v: Var, origin: &str) -> Result<(), EncodingError> {
        self.add_clause(vec![-v], origin)
    }

    /// Adds a unit negation for every variable in `vs`.
    pub fn zero_out(&mut self, vs: &[Var], origin: &str) -> Result<(), EncodingError> {
        for &v in vs {
            self.assert_false(v, origin)?;
        }
        Ok(())
    }

    /// Returns a new formula with `lit` disjoined into every clause of
    /// `other`, and appends the result to `self`. Used to guard a whole
    /// sub-formula behind a condition (e.g. "if this trial is applicable").
    pub fn distribute(&mut self, lit: Lit, other: &Cnf, origin: &str) -> Result<(), EncodingError> {
        for clause in other.clauses() {
            let mut guarded = Vec::with_capacity(clause.len() + 1);
            guarded.push(lit);
            guarded.extend_from_slice(clause);
            self.add_clause(guarded, origin)?;
        }
        Ok(())
    }

    /// Appends every clause of `other` to `self` without modification.
    /// `other` must have been built against a disjoint or prefix range of
    /// variables (the caller is responsible for variable-space alignment;
    /// in practice every sub-formula in this crate is built directly
    /// against a single shared `Cnf`, so this is only used when merging the
    /// expansion of deferred cardinality requests back into the main
    /// formula).
    pub fn absorb(&mut self, other: Cnf) {
        self.clauses.extend(other.clauses);
        if other.pool.fresh_counter() > self.pool.fresh_counter() {
            self.pool = VarPool::starting_after(other.pool.fresh_counter());
        }
    }

    /// Emits the exchange format: a DIMACS header, an optional `c ind`
    /// projection directive naming `1..=support_size`, then one
    /// space-separated, zero-terminated line per clause.
    pub fn serialize_dimacs(&self, support_size: usize) -> String {
        let mut out = String::new();
        writeln!(out, "p cnf {} {}", self.num_vars(), self.clauses.len()).unwrap();
        if support_size > 0 {
            write!(out, "c ind").unwrap();
            for v in 1..=support_size {
                write!(out, " {}", v).unwrap();
            }
            writeln!(out, " 0").unwrap();
        }
        for clause in &self.clauses {
            for lit in clause {
                write!(out, "{} ", lit).unwrap();
            }
            writeln!(out, "0").unwrap();
        }
        out
    }
}
