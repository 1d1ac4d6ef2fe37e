//! Crate `cardinality` builds "popcount(inputs) = k / < k / > k" assertions
//! against a binary constant, and the deferred `GenerationRequest`
//! indirection described in `spec.md` §4.8–§4.9 (modeled directly on
//! `original_source/.../original_port/generate_cnf.py`'s
//! `GenerationType`/`GenerationRequest`).
use crate::circuits::popcount_tree;
use crate::cnf::Cnf;
use crate::error::EncodingError;
use crate::types::Var;

/// Which comparison a [`GenerationRequest`] asserts against its constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenerationKind {
    Eq,
    Lt,
    Gt,
}

/// A deferred cardinality assertion over a set of boolean variables. Kept
/// symbolic (rather than expanded inline) so the popcount/comparator
/// expansion can be swapped out without touching call sites, per
/// `spec.md` §9.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub kind: GenerationKind,
    pub k: usize,
    pub vars: Vec<Var>,
    /// Human-readable origin, used only for error context.
    pub origin: String,
}

impl GenerationRequest {
    pub fn eq(k: usize, vars: Vec<Var>, origin: impl Into<String>) -> GenerationRequest {
        GenerationRequest {
            kind: GenerationKind::Eq,
            k,
            vars,
            origin: origin.into(),
        }
    }

    pub fn lt(k: usize, vars: Vec<Var>, origin: impl Into<String>) -> GenerationRequest {
        GenerationRequest {
            kind: GenerationKind::Lt,
            k,
            vars,
            origin: origin.into(),
        }
    }

    pub fn gt(k: usize, vars: Vec<Var>, origin: impl Into<String>) -> GenerationRequest {
        GenerationRequest {
            kind: GenerationKind::Gt,
            k,
            vars,
            origin: origin.into(),
        }
    }
}

/// Expands every request in `requests`, in order, against `cnf`. Order
/// matters for byte-identical serialization (`spec.md` §4.9).
pub fn compile_requests(cnf: &mut Cnf, requests: &[GenerationRequest]) -> Result<(), EncodingError> {
    for req in requests {
        match req.kind {
            GenerationKind::Eq => assert_k_of_n(cnf, &req.vars, req.k, &req.origin)?,
            GenerationKind::Lt => k_less_than_n(cnf, &req.vars, req.k, &req.origin)?,
            GenerationKind::Gt => k_greater_than_n(cnf, &req.vars, req.k, &req.origin)?,
        }
    }
    Ok(())
}

/// Converts `value` to its MSB-first binary representation, zero-padded
/// (or truncated, which must never lose a set bit) to exactly `width`
/// bits. Mirrors `original_source/sweetpea/core/binary.py`'s `binary()`,
/// adapted from the `{-1, 1}` alphabet to `bool`.
fn to_bits(value: usize, width: usize) -> Vec<bool> {
    debug_assert!(
        width >= usize::BITS as usize - value.leading_zeros() as usize,
        "value {value} does not fit in {width} bits"
    );
    (0..width).rev().map(|i| (value >> i) & 1 == 1).collect()
}

/// Asserts `popcount(inputs) == k`. `k == 0` is shortcut directly to
/// forcing every input false, without building a popcount tree.
pub fn assert_k_of_n(cnf: &mut Cnf, inputs: &[Var], k: usize, origin: &str) -> Result<(), EncodingError> {
    if k == 0 {
        return cnf.zero_out(inputs, origin);
    }
    if k > inputs.len() {
        return infeasible(cnf, origin);
    }
    let bits = popcount_tree(cnf, inputs, origin)?;
    let kbits = to_bits(k, bits.len());
    for (&bit, &want) in bits.iter().zip(kbits.iter()) {
        if want {
            cnf.assert_true(bit, origin)?;
        } else {
            cnf.assert_false(bit, origin)?;
        }
    }
    Ok(())
}

/// Asserts `popcount(inputs) < k`.
pub fn k_less_than_n(cnf: &mut Cnf, inputs: &[Var], k: usize, origin: &str) -> Result<(), EncodingError> {
    if k == 0 {
        return infeasible(cnf, origin);
    }
    if k > inputs.len() {
        // Every achievable popcount is <= inputs.len() < k: trivially true.
        return Ok(());
    }
    let bits = popcount_tree(cnf, inputs, origin)?;
    let kbits = to_bits(k, bits.len());
    let strict_lits = comparator(cnf, &bits, &kbits, true, origin)?;
    cnf.add_clause(strict_lits, origin)
}

/// Asserts `popcount(inputs) > k`.
pub fn k_greater_than_n(cnf: &mut Cnf, inputs: &[Var], k: usize, origin: &str) -> Result<(), EncodingError> {
    if k >= inputs.len() {
        return infeasible(cnf, origin);
    }
    let bits = popcount_tree(cnf, inputs, origin)?;
    let kbits = to_bits(k, bits.len());
    let strict_lits = comparator(cnf, &bits, &kbits, false, origin)?;
    cnf.add_clause(strict_lits, origin)
}

/// Builds the "first differing bit" comparator described in `spec.md`
/// §4.4: walking MSB to LSB, track "equal so far" with auxiliary
/// variables, and collect one literal per bit position asserting that
/// position is the first divergence in the requested direction
/// (`bits[i] = 0, k[i] = 1` for `less_than`, the dual for `greater_than`).
/// Returns the disjunction of those literals; asserting it true is the
/// comparator.
fn comparator(
    cnf: &mut Cnf,
    bits: &[Var],
    kbits: &[bool],
    less_than: bool,
    origin: &str,
) -> Result<Vec<i32>, EncodingError> {
    let width = bits.len();
    let mut eq_prev: Option<Var> = None;
    let mut diverge_lits = Vec::new();

    for i in 0..width {
        let bi = bits[i];
        let ki = kbits[i];
        // This position can be the first divergence in our favored
        // direction only when k's bit disagrees in the right way.
        let divergence_here = if less_than { ki } else { !ki };
        if divergence_here {
            let d = cnf.allocate_var();
            match eq_prev {
                Some(ep) => {
                    // d <-> ep & (not bi == less_than's direction)
                    if less_than {
                        cnf.add_clause(vec![-d, ep], origin)?;
                        cnf.add_clause(vec![-d, -bi], origin)?;
                        cnf.add_clause(vec![d, -ep, bi], origin)?;
                    } else {
                        cnf.add_clause(vec![-d, ep], origin)?;
                        cnf.add_clause(vec![-d, bi], origin)?;
                        cnf.add_clause(vec![d, -ep, -bi], origin)?;
                    }
                }
                None => {
                    if less_than {
                        cnf.add_clause(vec![-d, -bi], origin)?;
                        cnf.add_clause(vec![d, bi], origin)?;
                    } else {
                        cnf.add_clause(vec![-d, bi], origin)?;
                        cnf.add_clause(vec![d, -bi], origin)?;
                    }
                }
            }
            diverge_lits.push(d);
        }
        if i + 1 < width {
            let eq_i = cnf.allocate_var();
            match eq_prev {
                Some(ep) => {
                    if ki {
                        cnf.add_clause(vec![-eq_i, ep], origin)?;
                        cnf.add_clause(vec![-eq_i, bi], origin)?;
                        cnf.add_clause(vec![eq_i, -ep, -bi], origin)?;
                    } else {
                        cnf.add_clause(vec![-eq_i, ep], origin)?;
                        cnf.add_clause(vec![-eq_i, -bi], origin)?;
                        cnf.add_clause(vec![eq_i, -ep, bi], origin)?;
                    }
                }
                None => {
                    if ki {
                        cnf.add_clause(vec![-eq_i, bi], origin)?;
                        cnf.add_clause(vec![eq_i, -bi], origin)?;
                    } else {
                        cnf.add_clause(vec![-eq_i, -bi], origin)?;
                        cnf.add_clause(vec![eq_i, bi], origin)?;
                    }
                }
            }
            eq_prev = Some(eq_i);
        }
    }
    Ok(diverge_lits)
}

/// Forces unsatisfiability directly via a fresh variable asserted both
/// true and false, for requests that are infeasible by construction:
/// `k > n` for `=`, `k == 0` for `<`, `k >= n` for `>`.
fn infeasible(cnf: &mut Cnf, origin: &str) -> Result<(), EncodingError> {
    let v = cnf.allocate_var();
    cnf.assert_true(v, origin)?;
    cnf.assert_false(v, origin)
}
