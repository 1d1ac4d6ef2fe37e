//! Crate `request` packages a fully-lowered [`Block`] into the DIMACS-derived
//! exchange format an external sampler consumes, and decodes the sampler's
//! returned assignments back into per-trial factor/level names, per
//! `spec.md` §4.9.
//!
//! Grounded on `original_source/sweetpea/core/generate/utility.py`'s
//! `combine_and_save_cnf`/`temporary_cnf_file` (the scoped-temp-file pattern
//! described in `spec.md` §5 is reproduced here as an RAII guard rather than
//! a context manager, since this is the only I/O the core owns) and
//! `original_source/sweetpea/core/original_port/generate_cnf.py`'s
//! `build_CNF` (requests are expanded against a running fresh-variable
//! counter, in list order, before serialization).
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::block::Block;
use crate::cardinality::{compile_requests, GenerationRequest};
use crate::cnf::Cnf;
use crate::constraints;
use crate::derive;
use crate::design::FactorHandle;
use crate::error::{CoreError, EncodingError, SamplerError};

/// The output of compiling a [`Block`]: the assembled CNF (with every
/// deferred cardinality request already expanded into it) and the support
/// set size the sampler must project onto.
pub struct CompiledFormula {
    pub cnf: Cnf,
    pub support_size: usize,
}

/// Runs the full lowering pipeline (derivation resolution, consistency,
/// crossing, run-length constraints, then cardinality-request expansion)
/// against a fresh [`Cnf`] sized to the block's support set.
pub fn compile_block(block: &Block) -> Result<CompiledFormula, CoreError> {
    let support_size = block.layout().support_size();
    let mut cnf = Cnf::new();
    cnf.allocate_vars(support_size);

    tracing::debug!(support_size, trials = block.trial_count(), "resolving derivations");
    derive::resolve(block, &mut cnf).map_err(encoding_context("derivation"))?;

    tracing::debug!("lowering crossing and run-length constraints");
    let requests: Vec<GenerationRequest> =
        constraints::lower(block, &mut cnf).map_err(encoding_context("constraint lowering"))?;

    tracing::debug!(requests = requests.len(), "expanding deferred cardinality requests");
    compile_requests(&mut cnf, &requests).map_err(encoding_context("cardinality expansion"))?;

    tracing::debug!(
        num_vars = cnf.num_vars(),
        num_clauses = cnf.num_clauses(),
        "compilation complete"
    );
    Ok(CompiledFormula { cnf, support_size })
}

fn encoding_context(stage: &'static str) -> impl Fn(EncodingError) -> CoreError {
    move |e| {
        tracing::error!(stage, error = %e, "encoding error");
        CoreError::Encoding(e)
    }
}

impl CompiledFormula {
    /// Serializes the DIMACS exchange format described in `spec.md` §6.
    pub fn to_dimacs(&self) -> String {
        self.cnf.serialize_dimacs(self.support_size)
    }
}

/// Owns a just-created temporary exchange file and deletes it on every exit
/// path (including panics during the scope, via `Drop`), matching
/// `spec.md` §5's "scoped acquisition" requirement for the one resource the
/// core manages.
pub struct TempCnfFile {
    path: PathBuf,
}

impl TempCnfFile {
    /// Writes `contents` to a fresh file named `<random>.cnf` under `dir`.
    pub fn write(dir: &Path, contents: &str) -> std::io::Result<TempCnfFile> {
        let unique = format!("{:016x}.cnf", rand_u64());
        let path = dir.join(unique);
        fs::write(&path, contents)?;
        Ok(TempCnfFile { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempCnfFile {
    fn drop(&mut self) {
        if self.path.exists() {
            let _ = fs::remove_file(&self.path);
        }
    }
}

/// A non-cryptographic unique suffix for temp-file names. The core has no
/// other use for randomness; this avoids pulling in a dependency purely for
/// unique file names.
fn rand_u64() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    let addr = &nanos as *const u64 as u64;
    nanos.wrapping_mul(0x9E3779B97F4A7C15).wrapping_add(addr)
}

/// One decoded trial sequence: for every factor, the level name realized at
/// each trial (in trial order).
pub type DecodedTrials = HashMap<String, Vec<String>>;

/// Decodes one sampler assignment (signed variable identities covering at
/// least `1..=support_size`) into `{factor_name: [level_name, ...]}`, per
/// `spec.md` §4.9. Scans each factor's per-trial variable range in layout
/// order; exactly one variable in that range must be positive.
pub fn decode(block: &Block, assignment: &[i32]) -> Result<DecodedTrials, SamplerError> {
    let support_size = block.layout().support_size();
    let mut positive = vec![false; support_size + 1];
    for &lit in assignment {
        let v = lit.unsigned_abs() as usize;
        if v >= 1 && v <= support_size {
            positive[v] = lit > 0;
        }
    }

    let mut out = DecodedTrials::new();
    for &factor in block.layout().factor_order() {
        let name = block.design.factor(factor).name.clone();
        let mut levels = Vec::with_capacity(block.trial_count());
        for t in 0..block.trial_count() {
            let vars = block.layout().factor_vars_at_trial(factor, t);
            let hits: Vec<usize> = vars
                .iter()
                .enumerate()
                .filter(|&(_, &v)| positive[v as usize])
                .map(|(i, _)| i)
                .collect();
            if vars.is_empty() {
                // Derived factor at a non-applicable trial: nothing to name.
                levels.push(String::new());
                continue;
            }
            if hits.len() != 1 {
                return Err(SamplerError::MalformedAssignment(format!(
                    "factor {name:?} trial {t}: expected exactly one positive level variable, found {}",
                    hits.len()
                )));
            }
            let level_handle = block.design.factor(factor).levels[hits[0]];
            levels.push(block.design.level(level_handle).name().to_string());
        }
        out.insert(name, levels);
    }
    Ok(out)
}

/// The factors of a block in layout order, for callers that want to print
/// or iterate columns without re-deriving the order from `design`.
pub fn factor_names(block: &Block) -> Vec<String> {
    block
        .layout()
        .factor_order()
        .iter()
        .map(|&f: &FactorHandle| block.design.factor(f).name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{Block, CompileOptions, Crossing};
    use crate::design::{Design, LevelSpec};

    fn two_by_two() -> (Design, FactorHandle, FactorHandle) {
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
        (design, color, text)
    }

    #[test]
    fn compile_block_produces_nonempty_cnf_with_matching_support() {
        let (design, color, text) = two_by_two();
        let block = Block::new(
            design,
            Crossing::FullyCrossed(vec![color, text]),
            vec![],
            CompileOptions::default(),
        )
        .unwrap();
        let compiled = compile_block(&block).unwrap();
        assert_eq!(compiled.support_size, 16);
        assert!(compiled.cnf.num_vars() as usize >= compiled.support_size);
        let dimacs = compiled.to_dimacs();
        assert!(dimacs.starts_with("p cnf"));
        assert!(dimacs.contains("c ind"));
    }

    #[test]
    fn decode_reads_back_the_one_positive_level_per_trial() {
        let (design, color, _text) = two_by_two();
        let block = Block::new(
            design,
            Crossing::FullyCrossed(vec![color]),
            vec![],
            CompileOptions::default(),
        )
        .unwrap();
        // Trial 0 -> red (var 1), trial 1 -> blue (var 4).
        let assignment = vec![1, -2, -3, 4];
        let decoded = decode(&block, &assignment).unwrap();
        assert_eq!(decoded["color"], vec!["red".to_string(), "blue".to_string()]);
    }

    #[test]
    fn decode_rejects_a_trial_with_no_positive_level() {
        let (design, color, _text) = two_by_two();
        let block = Block::new(
            design,
            Crossing::FullyCrossed(vec![color]),
            vec![],
            CompileOptions::default(),
        )
        .unwrap();
        let assignment = vec![-1, -2, -3, -4];
        assert!(decode(&block, &assignment).is_err());
    }
}
