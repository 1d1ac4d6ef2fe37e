//! A small developer tool: compiles a fixed example design (there is no
//! design file format in scope for this crate, per `spec.md` §6) and writes
//! its DIMACS exchange file to stdout or a given path. The `dmcr`-equivalent
//! boundary this crate keeps, per `SPEC_FULL.md`'s ambient-stack section —
//! everything downstream of "here is a CNF" (sampler invocation, Docker
//! orchestration, JSON transport) is out of scope.
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use sweetpea_core::block::{Block, CompileOptions, Crossing};
use sweetpea_core::constraints::{Constraint, ConstraintTarget};
use sweetpea_core::design::{Derivation, Design, LevelSpec};
use sweetpea_core::request::compile_block;

#[derive(Parser)]
#[command(name = "sweetpea-cnf")]
#[command(about = "Compiles a fixed example factorial design to a DIMACS exchange file", long_about = None)]
#[command(version)]
struct Cli {
    /// Where to write the DIMACS output; prints to stdout if omitted.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Which built-in example design to compile.
    #[arg(short, long, value_enum, default_value_t = Example::Congruency)]
    example: Example,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum Example {
    /// 2x2 fully-crossed design, no constraints (`spec.md` §8 scenario 1).
    Simple,
    /// Adds a `congruent`/Else derived factor over `color`/`text` (scenario 2).
    Congruency,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sweetpea_core=info")))
        .init();

    let cli = Cli::parse();
    let block = match cli.example {
        Example::Simple => build_simple_design(),
        Example::Congruency => build_congruency_design(),
    };

    let compiled = match compile_block(&block) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "compilation failed");
            std::process::exit(1);
        }
    };
    let dimacs = compiled.to_dimacs();

    match cli.output {
        Some(path) => {
            if let Err(e) = fs::write(&path, dimacs) {
                tracing::error!(error = %e, path = %path.display(), "failed to write output");
                std::process::exit(1);
            }
            tracing::info!(path = %path.display(), "wrote DIMACS exchange file");
        }
        None => print!("{dimacs}"),
    }
}

fn build_simple_design() -> Block {
    let mut design = Design::new();
    let color = design
        .add_factor(
            "color",
            vec![LevelSpec::Simple("red".into()), LevelSpec::Simple("blue".into())],
        )
        .expect("color factor is well-formed");
    let text = design
        .add_factor(
            "text",
            vec![LevelSpec::Simple("red".into()), LevelSpec::Simple("blue".into())],
        )
        .expect("text factor is well-formed");
    Block::new(
        design,
        Crossing::FullyCrossed(vec![color, text]),
        vec![],
        CompileOptions::default(),
    )
    .expect("block is well-formed")
}

fn build_congruency_design() -> Block {
    let mut design = Design::new();
    let color = design
        .add_factor(
            "color",
            vec![LevelSpec::Simple("red".into()), LevelSpec::Simple("blue".into())],
        )
        .expect("color factor is well-formed");
    let text = design
        .add_factor(
            "text",
            vec![LevelSpec::Simple("red".into()), LevelSpec::Simple("blue".into())],
        )
        .expect("text factor is well-formed");

    let congruent_pred: sweetpea_core::design::Predicate =
        Rc::new(|names: &[&str]| names[0] == names[1]);
    let congruency = design
        .add_factor(
            "congruency",
            vec![
                LevelSpec::Derived(
                    "con".into(),
                    Derivation::within_trial(congruent_pred, vec![color, text]),
                ),
                LevelSpec::Else("inc".into()),
            ],
        )
        .expect("congruency factor is well-formed");
    let con_level = design.factor(congruency).levels[0];

    Block::new(
        design,
        Crossing::FullyCrossed(vec![color, text]),
        vec![Constraint::AtMostKInARow(
            1,
            ConstraintTarget::FactorLevel(congruency, con_level),
        )],
        CompileOptions::default(),
    )
    .expect("block is well-formed")
}
