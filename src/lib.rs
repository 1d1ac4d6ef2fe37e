/*!
# SweetPea Core

A compiler from randomized factorial experiment designs to Conjunctive
Normal Form (CNF). A user declares factors (independent variables), their
levels (values), derived factors whose levels are computed from other
factors' levels across one or more trials, a *crossing* (the set of factor
combinations that must each appear exactly once per block of trials), and
counting constraints ("no more than k occurrences of level L in a row").
This crate compiles that declarative description into a CNF formula whose
satisfying assignments are in bijection with valid trial sequences.

This crate is the compiler and encoder only. It does not invoke a SAT
sampler, does not guarantee uniformity, and does not print human-readable
experiment transcripts — those are the responsibility of a downstream
crate that implements [`strategy::Sampler`] against a concrete backend
(Unigen, CMSGen, CryptoMiniSAT, ...).

## Usage

```
use sweetpea_core::block::{Block, CompileOptions, Crossing};
use sweetpea_core::design::{Design, LevelSpec};
use sweetpea_core::request::compile_block;

let mut design = Design::new();
let color = design
    .add_factor("color", vec![LevelSpec::Simple("red".into()), LevelSpec::Simple("blue".into())])
    .unwrap();
let text = design
    .add_factor("text", vec![LevelSpec::Simple("red".into()), LevelSpec::Simple("blue".into())])
    .unwrap();

let block = Block::new(
    design,
    Crossing::FullyCrossed(vec![color, text]),
    vec![],
    CompileOptions::default(),
)
.unwrap();
assert_eq!(block.trial_count(), 4);

let compiled = compile_block(&block).unwrap();
let dimacs = compiled.to_dimacs();
assert!(dimacs.starts_with("p cnf"));
```

## Module map

- [`pool`] — the boolean variable pool.
- [`cnf`] — the CNF algebra: clauses, unit assertions, DIMACS serialization.
- [`circuits`] — half/full adders, ripple-carry adder, popcount tree.
- [`cardinality`] — assert-k-of-n cardinality encoding and the deferred
  `GenerationRequest` indirection.
- [`design`] — the Factor/Level/Derivation data model.
- [`derive`] — the derivation resolver.
- [`block`] — block construction and variable layout.
- [`constraints`] — crossing, consistency, and run-length constraint lowering.
- [`request`] — exchange-format packaging and sampler-output decoding.
- [`strategy`] — the Uniform/NonUniform/Guided sampling façade.
- [`error`] — the crate's error types.
*/
pub mod block;
pub mod cardinality;
pub mod circuits;
pub mod cnf;
pub mod constraints;
pub mod derive;
pub mod design;
pub mod error;
pub mod pool;
pub mod request;
pub mod strategy;
pub mod types;
pub mod util;
