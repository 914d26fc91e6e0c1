use crate::fixtures::demo_module;
use murk_analysis::reachability::is_referenced;
use murk_analysis::semantics::Interpreter;
use murk_core::module::Linkage;
use murk_transform::bogus_function::{BogusFunction, BOGUS_PREFIX};
use murk_transform::{PassContext, Transform};

#[test]
fn test_synthetic_functions_are_never_called() {
    let mut m = demo_module().unwrap();
    let before = m.functions.len();
    let mut ctx = PassContext::new(42);
    let pass = BogusFunction::new(3);
    for _ in 0..2 {
        assert!(pass.apply(&mut m, &mut ctx).unwrap());
    }

    let synthetic: Vec<_> = m.iter_functions().filter(|(_, f)| f.synthetic).collect();
    assert_eq!(synthetic.len(), 6);
    assert_eq!(m.functions.len(), before + 6);
    for (id, func) in synthetic {
        assert!(func.name.starts_with(BOGUS_PREFIX));
        assert_eq!(func.linkage, Linkage::Private);
        assert!(!is_referenced(&m, id), "{} is referenced", func.name);
    }
}

#[test]
fn test_names_follow_the_seeded_counter() {
    let mut m = demo_module().unwrap();
    let mut ctx = PassContext::new(100);
    BogusFunction::new(2).apply(&mut m, &mut ctx).unwrap();
    assert!(m.find_function("bogus_func_100").is_some());
    assert!(m.find_function("bogus_func_101").is_some());
}

#[test]
fn test_synthetic_body_evaluates() {
    let mut m = demo_module().unwrap();
    BogusFunction::new(1)
        .apply(&mut m, &mut PassContext::new(0))
        .unwrap();
    let id = m.find_function("bogus_func_0").unwrap();
    // acc = 5; ((5+0)*2 + 1)*2 = 22; (22+2)*2 = 48
    let outcome = Interpreter::new(&m).call(id, &[5]).unwrap();
    assert_eq!(outcome.ret, Some(48));
    assert!(outcome.externs.is_empty());
}
