//! Crate `strategy` is the three-strategy sampling façade described in
//! `spec.md` §2 item 10 and §6: only the encoding-level interaction with an
//! external sampler is in scope here, behind the [`Sampler`] trait. No
//! process spawning, Docker orchestration, or JSON transport lives in this
//! crate — a downstream crate implements `Sampler` against whatever backend
//! it likes (Unigen, CMSGen, CryptoMiniSAT, an in-process solver for tests).
//!
//! Grounded on `original_source/sweetpea/sampling_strategies/{unigen,
//! non_uniform,guided}.py` and `.../core/generate/{sample_uniform,
//! sample_non_uniform}.py`: `Uniform` hands the whole problem to the
//! sampler once (`sample_uniform.py`); `NonUniform` repeatedly solves and
//! blocks the found assignment (`sample_non_uniform.py`'s
//! `compute_solutions`/`update_file` loop); `Guided` builds one trial at a
//! time, checking satisfiability of a randomized candidate before
//! committing to it (`guided.py`'s `__generate_sample`), which `spec.md` §9
//! flags as exploratory — this crate keeps only the encoding-level shape,
//! not the full prefilter machinery.
use rand::seq::SliceRandom;

use crate::block::Block;
use crate::error::{CoreError, SamplerError};
use crate::request::{self, compile_block, decode, DecodedTrials};
use crate::types::Var;

/// The boundary this crate hands a solution off to. Implemented by a
/// downstream crate against whatever external solver it invokes; the core
/// never spawns a process itself (`spec.md` §1's "out of scope" list).
pub trait Sampler {
    /// Requests `count` satisfying assignments for the CNF serialized in
    /// `dimacs`. Each assignment is a list of signed variable identities
    /// covering at least `1..=support_size`. An unsatisfiable formula
    /// yields `Ok(vec![])`, not an error (`spec.md` §7).
    fn sample(&mut self, dimacs: &str, count: usize) -> Result<Vec<Vec<Var>>, SamplerError>;

    /// Whether `dimacs` (typically the base formula plus a handful of unit
    /// assumption clauses) is satisfiable at all. The default
    /// implementation asks for one sample; a real backend can often answer
    /// this more cheaply (e.g. a bare SAT check without model extraction).
    fn is_satisfiable(&mut self, dimacs: &str) -> Result<bool, SamplerError> {
        Ok(!self.sample(dimacs, 1)?.is_empty())
    }
}

/// Which of the three strategies to run. Only the encoding-level behavior
/// (what gets asked of the `Sampler`, and how) is specified here; uniformity
/// itself is the sampler's responsibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Hand the fully-compiled problem to the sampler once and decode every
    /// returned assignment.
    Uniform,
    /// Solve repeatedly, adding a blocking clause against each found
    /// assignment so the next solve cannot return it again.
    NonUniform,
    /// Build each sample trial-by-trial, using the sampler as a feasibility
    /// oracle over randomized candidate orderings.
    Guided,
}

/// Compiles `block` and draws `sample_count` trial sequences from it using
/// `strategy`, the entry point `spec.md` §6 names as the boundary the core
/// exposes to its CLI/API layer.
pub fn synthesize_trials(
    block: &Block,
    sample_count: usize,
    strategy: Strategy,
    sampler: &mut dyn Sampler,
) -> Result<Vec<DecodedTrials>, CoreError> {
    let compiled = compile_block(block)?;
    match strategy {
        Strategy::Uniform => {
            let dimacs = compiled.to_dimacs();
            let assignments = sampler.sample(&dimacs, sample_count)?;
            assignments
                .iter()
                .map(|a| decode(block, a).map_err(CoreError::from))
                .collect()
        }
        Strategy::NonUniform => sample_non_uniform(block, &compiled, sample_count, sampler),
        Strategy::Guided => sample_guided(block, sample_count, sampler),
    }
}

/// Iteratively asks for one solution at a time, adding a unit-clause
/// blocking clause against the support-set literals of each found
/// assignment so the next call cannot repeat it, per
/// `sample_non_uniform.py`'s `compute_solutions`/`update_file`.
fn sample_non_uniform(
    block: &Block,
    compiled: &request::CompiledFormula,
    sample_count: usize,
    sampler: &mut dyn Sampler,
) -> Result<Vec<DecodedTrials>, CoreError> {
    let mut cnf = compiled.cnf.clone();
    let mut out = Vec::with_capacity(sample_count);
    for _ in 0..sample_count {
        let dimacs = cnf.serialize_dimacs(compiled.support_size);
        let found = sampler.sample(&dimacs, 1)?;
        let assignment = match found.into_iter().next() {
            Some(a) => a,
            None => break,
        };
        out.push(decode(block, &assignment)?);
        let blocking: Vec<Var> = assignment
            .iter()
            .filter(|&&v| v.unsigned_abs() as usize <= compiled.support_size)
            .map(|&v| -v)
            .collect();
        if !blocking.is_empty() {
            cnf.add_clause(blocking, "non-uniform-blocking")
                .map_err(CoreError::from)?;
        }
    }
    Ok(out)
}

/// Builds one sample at a time, trial by trial: for each trial, shuffles
/// the candidate level combinations, tries them in that randomized order as
/// unit-clause assumptions against the (trial-invariant) base formula, and
/// commits to the first one the sampler reports satisfiable alongside every
/// choice already committed this sample. Mirrors the shape of
/// `guided.py`'s `__generate_sample`, minus its solver-call-count metrics
/// and prefiltering, which `spec.md` §9 places outside the core's contract.
fn sample_guided(
    block: &Block,
    sample_count: usize,
    sampler: &mut dyn Sampler,
) -> Result<Vec<DecodedTrials>, CoreError> {
    let compiled = compile_block(block)?;
    let mut rng = rand::thread_rng();
    let mut out = Vec::with_capacity(sample_count);

    'samples: for _ in 0..sample_count {
        let mut committed: Vec<Var> = Vec::new();
        for t in 0..block.trial_count() {
            let columns: Vec<Vec<Var>> = block
                .variable_list_for_trial(t)
                .into_iter()
                .map(|(_, vars)| vars)
                .filter(|vars| !vars.is_empty())
                .collect();
            let mut candidates = crate::util::cartesian_product(&columns);
            candidates.shuffle(&mut rng);

            let mut chosen = None;
            for candidate in &candidates {
                let mut assumptions = committed.clone();
                assumptions.extend(candidate.iter().copied());
                let dimacs = assumption_dimacs(&compiled, &assumptions);
                if sampler.is_satisfiable(&dimacs)? {
                    chosen = Some(candidate.clone());
                    break;
                }
            }
            match chosen {
                Some(vars) => committed.extend(vars),
                None => {
                    // No candidate at this trial is consistent with what's
                    // already committed; this sample draw is infeasible.
                    continue 'samples;
                }
            }
        }
        out.push(decode(block, &committed)?);
    }
    Ok(out)
}

/// Serializes `compiled`'s formula with one extra unit clause per
/// assumption literal appended, for the feasibility probes `Guided` issues.
fn assumption_dimacs(compiled: &request::CompiledFormula, assumptions: &[Var]) -> String {
    let mut cnf = compiled.cnf.clone();
    for &v in assumptions {
        // Unit clauses are always well-formed regardless of polarity.
        let _ = cnf.add_clause(vec![v], "guided-assumption");
    }
    cnf.serialize_dimacs(compiled.support_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{Block, CompileOptions, Crossing};
    use crate::design::{Design, FactorHandle, LevelSpec};

    fn two_by_two() -> Block {
        let mut design = Design::new();
        let color = design
            .add_factor(
                "color",
                vec![LevelSpec::Simple("red".into()), LevelSpec::Simple("blue".into())],
            )
            .unwrap();
        let text = design
            .add_factor(
                "text",
                vec![LevelSpec::Simple("red".into()), LevelSpec::Simple("blue".into())],
            )
            .unwrap();
        Block::new(
            design,
            Crossing::FullyCrossed(vec![color, text]),
            vec![],
            CompileOptions::default(),
        )
        .unwrap()
    }

    /// A small backtracking solver used only in these tests (not the
    /// crate's production sampler, which is the downstream `Sampler`
    /// implementation's job): depth-first assignment with per-step clause
    /// pruning, collecting up to `count` models.
    struct BacktrackingSampler;

    impl BacktrackingSampler {
        fn backtrack(
            var: usize,
            num_vars: usize,
            clauses: &[Vec<i32>],
            assign: &mut [Option<bool>],
            out: &mut Vec<Vec<i32>>,
            count: usize,
        ) {
            if out.len() >= count {
                return;
            }
            if var > num_vars {
                out.push(
                    (1..=num_vars)
                        .map(|v| if assign[v] == Some(true) { v as i32 } else { -(v as i32) })
                        .collect(),
                );
                return;
            }
            for &val in &[true, false] {
                assign[var] = Some(val);
                if !any_clause_violated(clauses, assign) {
                    Self::backtrack(var + 1, num_vars, clauses, assign, out, count);
                }
                if out.len() >= count {
                    return;
                }
            }
            assign[var] = None;
        }
    }

    fn any_clause_violated(clauses: &[Vec<i32>], assign: &[Option<bool>]) -> bool {
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

    impl Sampler for BacktrackingSampler {
        fn sample(&mut self, dimacs: &str, count: usize) -> Result<Vec<Vec<Var>>, SamplerError> {
            let (num_vars, clauses) = parse_dimacs(dimacs);
            let mut assign = vec![None; num_vars + 1];
            let mut out = Vec::new();
            Self::backtrack(1, num_vars, &clauses, &mut assign, &mut out, count);
            Ok(out)
        }
    }

    fn parse_dimacs(dimacs: &str) -> (usize, Vec<Vec<i32>>) {
        let mut num_vars = 0usize;
        let mut clauses = Vec::new();
        for line in dimacs.lines() {
            if line.starts_with('p') {
                num_vars = line.split_whitespace().nth(2).unwrap().parse().unwrap();
            } else if line.starts_with('c') {
                continue;
            } else {
                let lits: Vec<i32> = line
                    .split_whitespace()
                    .map(|s| s.parse().unwrap())
                    .take_while(|&v| v != 0)
                    .collect();
                if !lits.is_empty() {
                    clauses.push(lits);
                }
            }
        }
        (num_vars, clauses)
    }

    #[test]
    fn uniform_strategy_decodes_every_returned_assignment() {
        let block = two_by_two();
        let mut sampler = BacktrackingSampler;
        let trials = synthesize_trials(&block, 1, Strategy::Uniform, &mut sampler).unwrap();
        assert_eq!(trials.len(), 1);
        assert_eq!(trials[0]["color"].len(), 4);
    }

    #[test]
    fn non_uniform_strategy_never_repeats_a_solution() {
        let block = two_by_two();
        let mut sampler = BacktrackingSampler;
        let trials = synthesize_trials(&block, 3, Strategy::NonUniform, &mut sampler).unwrap();
        assert!(trials.len() <= 3);
        for pair in trials.windows(2) {
            assert_ne!(pair[0]["color"], pair[1]["color"]);
        }
    }

    #[test]
    fn guided_strategy_produces_a_valid_crossing_when_feasible() {
        let block = two_by_two();
        let mut sampler = BacktrackingSampler;
        let trials = synthesize_trials(&block, 1, Strategy::Guided, &mut sampler).unwrap();
        assert_eq!(trials.len(), 1);
        let color = &trials[0]["color"];
        let text = &trials[0]["text"];
        let mut pairs: Vec<(String, String)> =
            color.iter().cloned().zip(text.iter().cloned()).collect();
        pairs.sort();
        pairs.dedup();
        assert_eq!(pairs.len(), 4, "every (color,text) pair should appear exactly once");
        let _ = FactorHandle(0);
    }
}
