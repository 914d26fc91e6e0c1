use crate::fixtures::{demo_module, init_tracing};
use murk_analysis::metrics::collect_metrics;
use murk_analysis::reachability::call_sites;
use murk_analysis::semantics::Interpreter;
use murk_core::cfg_ir::ControlFlowGraph;
use murk_core::module::Module;
use murk_core::verify::verify_module;

#[test]
fn test_demo_module_is_well_formed() {
    init_tracing();
    let m = demo_module().unwrap();
    assert_eq!(verify_module(&m), Ok(()));

    let metrics = collect_metrics(&m).unwrap();
    assert_eq!(metrics.globals, 7);
    assert_eq!(metrics.functions, 6);
    assert_eq!(metrics.definitions, 4);
    assert_eq!(metrics.private_globals, 4);
    assert_eq!(metrics.obfuscated_globals, 0);
}

#[test]
fn test_json_form_reloads_identically() {
    let m = demo_module().unwrap();
    let text = serde_json::to_string(&m).unwrap();
    let back: Module = serde_json::from_str(&text).unwrap();
    assert_eq!(back, m);
    assert_eq!(verify_module(&back), Ok(()));
}

#[test]
fn test_printer_shows_linkage_and_literals() {
    let text = demo_module().unwrap().to_string();
    assert!(text.contains("@secret_message = private constant"));
    assert!(text.contains("@exported_banner = external constant"));
    assert!(text.contains("declare external i32 @puts(ptr %arg0)"));
    assert!(text.contains("define internal i32 @calculate_fibonacci(i32 %arg0)"));
    assert!(text.contains("c\"Calculation: %d\\0A\\00\""));
}

#[test]
fn test_fibonacci_cfg_renders_to_dot() {
    let m = demo_module().unwrap();
    let fib = m.find_function("calculate_fibonacci").unwrap();
    let func = m.function(fib).unwrap();
    let cfg = ControlFlowGraph::build(func);

    assert_eq!(cfg.reachable().len(), 3);
    let dot = cfg.to_dot(func);
    assert!(dot.starts_with("digraph \"calculate_fibonacci\""));
    assert!(dot.contains("BranchTrue"));
    assert!(dot.contains("BranchFalse"));
}

#[test]
fn test_call_graph_of_demo() {
    let m = demo_module().unwrap();
    let fib = m.find_function("calculate_fibonacci").unwrap();
    // two recursive calls plus the one from main
    assert_eq!(call_sites(&m, fib).len(), 3);
    let main = m.find_function("main").unwrap();
    assert!(call_sites(&m, main).is_empty());
}

#[test]
fn test_interpreter_runs_demo_main() {
    let m = demo_module().unwrap();
    let main = m.find_function("main").unwrap();
    let mut interp = Interpreter::new(&m);
    for n in 0..10 {
        let outcome = interp.call(main, &[n]).unwrap();
        assert_eq!(outcome.ret, Some(crate::fixtures::demo_main_result(n)));
        let names: Vec<_> = outcome.externs.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["puts", "puts", "puts", "puts", "print_int"]);
    }
}
