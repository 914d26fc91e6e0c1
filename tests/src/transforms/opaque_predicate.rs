use crate::fixtures::{demo_main_result, demo_module, init_tracing};
use murk_analysis::reachability::live_blocks;
use murk_analysis::semantics::Interpreter;
use murk_core::ir::Instruction;
use murk_core::module::Function;
use murk_core::verify::verify_module;
use murk_transform::opaque_predicate::{OpaquePredicate, DEAD_LABEL, GUARD_LABEL};
use murk_transform::{PassContext, Transform};

/// Instructions of live blocks, excluding the inserted guard, in block order.
fn live_instructions(func: &Function) -> Vec<Instruction> {
    let live = live_blocks(func);
    func.blocks
        .iter()
        .filter(|b| live.contains(&b.id) && b.label != GUARD_LABEL)
        .flat_map(|b| b.instructions.clone())
        .collect()
}

#[test]
fn test_only_first_definition_changes() {
    init_tracing();
    let original = demo_module().unwrap();
    let mut m = original.clone();
    let mut ctx = PassContext::new(42);
    assert!(OpaquePredicate.apply(&mut m, &mut ctx).unwrap());
    assert_eq!(verify_module(&m), Ok(()));

    let changed: Vec<_> = original
        .functions
        .iter()
        .zip(&m.functions)
        .filter(|(a, b)| a != b)
        .map(|(a, _)| a.name.as_str())
        .collect();
    assert_eq!(changed, vec!["calculate_fibonacci"]);
}

#[test]
fn test_live_code_matches_original() {
    let original = demo_module().unwrap();
    let mut m = original.clone();
    OpaquePredicate
        .apply(&mut m, &mut PassContext::new(5))
        .unwrap();

    let fib = m.find_function("calculate_fibonacci").unwrap();
    let before = original.function(fib).unwrap();
    let after = m.function(fib).unwrap();
    assert_eq!(live_instructions(after), live_instructions(before));

    let dead = after.blocks.iter().find(|b| b.label == DEAD_LABEL).unwrap();
    assert!(!live_blocks(after).contains(&dead.id));
}

#[test]
fn test_results_are_unchanged_over_a_sweep() {
    let original = demo_module().unwrap();
    let mut m = original.clone();
    let mut ctx = PassContext::new(11);
    OpaquePredicate.apply(&mut m, &mut ctx).unwrap();
    OpaquePredicate.apply(&mut m, &mut ctx).unwrap();
    assert_eq!(ctx.stats.predicates_inserted, 2);

    let main = m.find_function("main").unwrap();
    let mut before = Interpreter::new(&original);
    let mut after = Interpreter::new(&m);
    for n in -3..12 {
        let expected = before.call(main, &[n]).unwrap();
        let got = after.call(main, &[n]).unwrap();
        assert_eq!(got.ret, expected.ret);
        assert_eq!(got.externs, expected.externs);
        if n >= 0 {
            assert_eq!(got.ret, Some(demo_main_result(n)));
        }
    }
}
