//! Crate `circuits` builds combinational adders and the popcount tree as
//! Tseitin-style biconditionals over fresh variables, following
//! `original_source/sweetpea/core/cnf.py`'s `pop_count`/`_pop_count_layer`/
//! `_pop_count_compute` structure.
use crate::cnf::Cnf;
use crate::error::EncodingError;
use crate::types::Var;

/// Adds `sum <-> a xor b` and `carry <-> a and b` as six clauses, returning
/// `(carry, sum)`.
pub fn half_adder(cnf: &mut Cnf, a: Var, b: Var) -> Result<(Var, Var), EncodingError> {
    let sum = cnf.allocate_var();
    let carry = cnf.allocate_var();
    let origin = "half_adder";
    // sum <-> a xor b
    cnf.add_clause(vec![-sum, -a, -b], origin)?;
    cnf.add_clause(vec![-sum, a, b], origin)?;
    cnf.add_clause(vec![sum, -a, b], origin)?;
    cnf.add_clause(vec![sum, a, -b], origin)?;
    // carry <-> a and b
    cnf.add_clause(vec![-carry, a], origin)?;
    cnf.add_clause(vec![-carry, b], origin)?;
    cnf.add_clause(vec![carry, -a, -b], origin)?;
    Ok((carry, sum))
}

/// Adds the standard three-input full adder, returning `(carry, sum)`.
pub fn full_adder(cnf: &mut Cnf, a: Var, b: Var, c: Var) -> Result<(Var, Var), EncodingError> {
    let sum = cnf.allocate_var();
    let carry = cnf.allocate_var();
    let origin = "full_adder";
    // sum <-> a xor b xor c
    cnf.add_clause(vec![-sum, a, b, c], origin)?;
    cnf.add_clause(vec![-sum, a, -b, -c], origin)?;
    cnf.add_clause(vec![-sum, -a, b, -c], origin)?;
    cnf.add_clause(vec![-sum, -a, -b, c], origin)?;
    cnf.add_clause(vec![sum, -a, -b, -c], origin)?;
    cnf.add_clause(vec![sum, -a, b, c], origin)?;
    cnf.add_clause(vec![sum, a, -b, c], origin)?;
    cnf.add_clause(vec![sum, a, b, -c], origin)?;
    // carry <-> majority(a, b, c)
    cnf.add_clause(vec![-carry, a, b], origin)?;
    cnf.add_clause(vec![-carry, a, c], origin)?;
    cnf.add_clause(vec![-carry, b, c], origin)?;
    cnf.add_clause(vec![carry, -a, -b], origin)?;
    cnf.add_clause(vec![carry, -a, -c], origin)?;
    cnf.add_clause(vec![carry, -b, -c], origin)?;
    Ok((carry, sum))
}

/// Adds a full ripple-carry adder of two equal-length bit buses (LSB
/// first), returning the `len(xs) + 1`-bit sum, LSB first.
pub fn ripple_carry_adder(cnf: &mut Cnf, xs: &[Var], ys: &[Var]) -> Result<Vec<Var>, EncodingError> {
    assert_eq!(xs.len(), ys.len(), "ripple_carry_adder requires equal-length buses");
    let mut sum_bits = Vec::with_capacity(xs.len() + 1);
    let (mut carry, s0) = half_adder(cnf, xs[0], ys[0])?;
    sum_bits.push(s0);
    for i in 1..xs.len() {
        let (c, s) = full_adder(cnf, xs[i], ys[i], carry)?;
        sum_bits.push(s);
        carry = c;
    }
    sum_bits.push(carry);
    Ok(sum_bits)
}

/// Reduces `n` single-bit inputs to a `ceil(log2(n)) + 1`-bit bus (MSB
/// first) whose binary value equals the number of true inputs among
/// `inputs`. Pads with fresh variables forced false up to the next power
/// of two, then pairs adjacent buses and reduces via ripple-carry,
/// matching `cnf.py`'s recursive-halving structure.
pub fn popcount_tree(cnf: &mut Cnf, inputs: &[Var], origin: &str) -> Result<Vec<Var>, EncodingError> {
    if inputs.is_empty() {
        return Err(EncodingError::EmptyClause(format!(
            "{origin}: popcount of an empty input list"
        )));
    }
    let next_pow2 = inputs.len().next_power_of_two();
    let pad_count = next_pow2 - inputs.len();
    let padding = cnf.allocate_vars(pad_count);
    cnf.zero_out(&padding, origin)?;

    let mut layer: Vec<Vec<Var>> = inputs
        .iter()
        .chain(padding.iter())
        .map(|&v| vec![v])
        .collect();

    while layer.len() > 1 {
        let mid = layer.len() / 2;
        let (left, right) = layer.split_at(mid);
        let mut next_layer = Vec::with_capacity(mid);
        for (x, y) in left.iter().zip(right.iter()) {
            let sum = ripple_carry_adder(cnf, x, y)?;
            // ripple_carry_adder returns LSB-first; the MSB is the final
            // carry-out, which becomes the new bus's most significant bit.
            let mut bits = sum;
            let msb = bits.pop().unwrap();
            bits.reverse();
            let mut combined = vec![msb];
            combined.extend(bits);
            next_layer.push(combined);
        }
        layer = next_layer;
    }
    Ok(layer.into_iter().next().unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cnf::Cnf;

    fn model_of(assignment: &[(Var, bool)]) -> impl Fn(Var) -> bool + '_ {
        move |v: Var| {
            assignment
                .iter()
                .find(|(av, _)| *av == v)
                .map(|(_, val)| *val)
                .expect("variable not assigned")
        }
    }

    fn clause_holds(clause: &[i32], model: &impl Fn(Var) -> bool) -> bool {
        clause.iter().any(|&lit| {
            let v = lit.abs();
            let want_true = lit > 0;
            model(v) == want_true
        })
    }

    fn check_all(cnf: &Cnf, model: &impl Fn(Var) -> bool) -> bool {
        cnf.clauses().iter().all(|c| clause_holds(c, model))
    }

    #[test]
    fn half_adder_truth_table() {
        for a in [false, true] {
            for b in [false, true] {
                let mut cnf = Cnf::new();
                let va = cnf.allocate_var();
                let vb = cnf.allocate_var();
                let (carry, sum) = half_adder(&mut cnf, va, vb).unwrap();
                let expect_sum = a ^ b;
                let expect_carry = a && b;
                let model = model_of(&[(va, a), (vb, b), (sum, expect_sum), (carry, expect_carry)]);
                assert!(check_all(&cnf, &model), "a={a} b={b}");
            }
        }
    }

    #[test]
    fn full_adder_truth_table() {
        for a in [false, true] {
            for b in [false, true] {
                for c in [false, true] {
                    let mut cnf = Cnf::new();
                    let va = cnf.allocate_var();
                    let vb = cnf.allocate_var();
                    let vc = cnf.allocate_var();
                    let (carry, sum) = full_adder(&mut cnf, va, vb, vc).unwrap();
                    let n = a as u8 + b as u8 + c as u8;
                    let expect_sum = n % 2 == 1;
                    let expect_carry = n >= 2;
                    let model = model_of(&[
                        (va, a),
                        (vb, b),
                        (vc, c),
                        (sum, expect_sum),
                        (carry, expect_carry),
                    ]);
                    assert!(check_all(&cnf, &model), "a={a} b={b} c={c}");
                }
            }
        }
    }

    fn bits_to_u32(bits_msb_first: &[bool]) -> u32 {
        bits_msb_first.iter().fold(0u32, |acc, &b| (acc << 1) | b as u32)
    }

    #[test]
    fn popcount_bit_width_is_ceil_log2_plus_one() {
        for n in 1..=9usize {
            let mut cnf = Cnf::new();
            let inputs = cnf.allocate_vars(n);
            let bits = popcount_tree(&mut cnf, &inputs, "test").unwrap();
            let expected = (n as f64).log2().ceil() as usize + 1;
            assert_eq!(bits.len(), expected, "n={n}");
        }
    }

    #[test]
    fn popcount_of_single_bit_is_identity() {
        let mut cnf = Cnf::new();
        let inputs = cnf.allocate_vars(1);
        let bits = popcount_tree(&mut cnf, &inputs, "test").unwrap();
        // n=1 has no padding and no adder: the single bit bus is just itself,
        // represented as a 1-bit bus (ceil(log2(1))+1 = 0+1 = 1).
        assert_eq!(bits.len(), 1);
        assert_eq!(bits[0], inputs[0]);
    }

    #[test]
    fn popcount_of_two_bits_matches_half_adder() {
        for a in [false, true] {
            for b in [false, true] {
                let mut cnf = Cnf::new();
                let inputs = cnf.allocate_vars(2);
                let bits = popcount_tree(&mut cnf, &inputs, "test").unwrap();
                assert_eq!(bits.len(), 2);
                let expect_sum = a ^ b;
                let expect_carry = a && b;
                let model = model_of(&[
                    (inputs[0], a),
                    (inputs[1], b),
                    (bits[1], expect_sum),
                    (bits[0], expect_carry),
                ]);
                assert!(check_all(&cnf, &model), "a={a} b={b}");
                let expected_count = a as u32 + b as u32;
                assert_eq!(bits_to_u32(&[expect_carry, expect_sum]), expected_count);
            }
        }
    }
}
