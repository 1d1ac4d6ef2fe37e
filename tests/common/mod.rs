//! Shared test-only SAT backtracking search used by the integration tests
//! in this directory to find a witness assignment for a compiled CNF
//! without depending on an external sampler. Not part of the crate's public
//! surface — `spec.md` explicitly places the sampler itself out of scope.
use sweetpea_core::cnf::Cnf;

/// Depth-first search for the first satisfying assignment over `cnf`'s
/// variables, in variable order, pruning as soon as any clause is
/// violated by the partial assignment. Returns `None` if `cnf` is
/// unsatisfiable.
pub fn first_model(cnf: &Cnf) -> Option<Vec<i32>> {
    let num_vars = cnf.num_vars() as usize;
    let mut assign: Vec<Option<bool>> = vec![None; num_vars + 1];
    if search(1, num_vars, cnf.clauses(), &mut assign) {
        Some(
            (1..=num_vars)
                .map(|v| if assign[v] == Some(true) { v as i32 } else { -(v as i32) })
                .collect(),
        )
    } else {
        None
    }
}

fn search(var: usize, num_vars: usize, clauses: &[Vec<i32>], assign: &mut [Option<bool>]) -> bool {
    if var > num_vars {
        return true;
    }
    for &val in &[true, false] {
        assign[var] = Some(val);
        if !any_violated(clauses, assign) && search(var + 1, num_vars, clauses, assign) {
            return true;
        }
    }
    assign[var] = None;
    false
}

fn any_violated(clauses: &[Vec<i32>], assign: &[Option<bool>]) -> bool {
    clauses.iter().any(|clause| {
        clause.iter().all(|&lit| {
            let v = lit.unsigned_abs() as usize;
            match assign[v] {
                None => false,
                Some(a) => a != (lit > 0),
            }
        })
    })
}
