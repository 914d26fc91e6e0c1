use crate::fixtures::demo_module;
use murk_core::module::Linkage;
use murk_core::verify::verify_module;
use murk_transform::symbol_rename::SymbolRename;
use murk_transform::{PassContext, Transform};

#[test]
fn test_private_globals_gain_suffix() {
    let mut m = demo_module().unwrap();
    let mut ctx = PassContext::new(1);
    assert!(SymbolRename.apply(&mut m, &mut ctx).unwrap());
    assert_eq!(ctx.stats.globals_renamed, 4);

    for g in &m.globals {
        match g.linkage {
            Linkage::Private => assert!(g.name.ends_with("_obf"), "{}", g.name),
            _ => assert!(!g.name.ends_with("_obf"), "{}", g.name),
        }
    }
    assert!(m.find_global("global_counter_obf").is_some());
    assert!(m.find_global("calc_fmt").is_some());
    assert_eq!(verify_module(&m), Ok(()));
}

#[test]
fn test_twice_equals_once() {
    let mut m = demo_module().unwrap();
    let mut ctx = PassContext::new(1);
    SymbolRename.apply(&mut m, &mut ctx).unwrap();
    let once: Vec<_> = m.globals.iter().map(|g| g.name.clone()).collect();

    assert!(!SymbolRename.apply(&mut m, &mut ctx).unwrap());
    let twice: Vec<_> = m.globals.iter().map(|g| g.name.clone()).collect();
    assert_eq!(once, twice);
}

#[test]
fn test_functions_keep_their_names() {
    let original = demo_module().unwrap();
    let mut m = original.clone();
    SymbolRename.apply(&mut m, &mut PassContext::new(1)).unwrap();
    assert_eq!(m.functions, original.functions);
}
