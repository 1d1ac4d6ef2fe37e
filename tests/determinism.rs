//! `spec.md` §8: "Serialization is a pure function of (design, crossing,
//! constraints declared order)." Rebuilding an identical block from scratch
//! must compile to byte-identical DIMACS, and reordering declared
//! constraints that don't interact must not change the result.
use std::rc::Rc;

use sweetpea_core::block::{Block, CompileOptions, Crossing};
use sweetpea_core::constraints::{Constraint, ConstraintTarget};
use sweetpea_core::design::{Derivation, Design, LevelSpec, Predicate};
use sweetpea_core::request::compile_block;

fn congruency_block(order: &[usize]) -> Block {
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
    let eq: Predicate = Rc::new(|names: &[&str]| names[0] == names[1]);
    let congruency = design
        .add_factor(
            "congruency",
            vec![
                LevelSpec::Derived("con".into(), Derivation::within_trial(eq, vec![color, text])),
                LevelSpec::Else("inc".into()),
            ],
        )
        .unwrap();
    let con_level = design.factor(congruency).levels[0];
    let mix = design
        .add_factor(
            "mix",
            vec![LevelSpec::Simple("m1".into()), LevelSpec::Simple("m2".into())],
        )
        .unwrap();
    let exclude_target = design.factor(mix).levels[0];

    let all_constraints = [
        Constraint::AtMostKInARow(1, ConstraintTarget::FactorLevel(congruency, con_level)),
        Constraint::Exclude(mix, exclude_target),
    ];
    let constraints = order.iter().map(|&i| all_constraints[i].clone()).collect();

    Block::new(
        design,
        Crossing::FullyCrossed(vec![color, text]),
        constraints,
        CompileOptions::default(),
    )
    .unwrap()
}

#[test]
fn identical_designs_compile_to_byte_identical_dimacs() {
    let a = compile_block(&congruency_block(&[0, 1])).unwrap();
    let b = compile_block(&congruency_block(&[0, 1])).unwrap();
    assert_eq!(a.to_dimacs(), b.to_dimacs());
}

#[test]
fn declared_constraint_order_does_not_change_the_compiled_formula() {
    let forward = compile_block(&congruency_block(&[0, 1])).unwrap();
    let reversed = compile_block(&congruency_block(&[1, 0])).unwrap();
    assert_eq!(forward.to_dimacs(), reversed.to_dimacs());
}

#[test]
fn recompiling_the_same_block_twice_is_stable() {
    let block = congruency_block(&[0, 1]);
    let first = compile_block(&block).unwrap().to_dimacs();
    let second = compile_block(&block).unwrap().to_dimacs();
    assert_eq!(first, second);
}
