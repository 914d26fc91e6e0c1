use crate::fixtures::{demo_module, init_tracing};
use murk_cli::commands::cfg::CfgArgs;
use murk_cli::commands::obfuscate::ObfuscateArgs;
use murk_cli::commands::print::PrintArgs;
use murk_cli::commands::{load_module, Command};
use murk_core::module::Module;
use murk_core::verify::verify_module;
use std::fs;
use std::path::{Path, PathBuf};

fn write_demo(dir: &Path) -> String {
    let path = dir.join("example.json");
    let text = serde_json::to_string_pretty(&demo_module().unwrap()).unwrap();
    fs::write(&path, text).unwrap();
    path.to_string_lossy().into_owned()
}

#[tokio::test]
async fn test_obfuscate_writes_module_and_telemetry() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let input = write_demo(dir.path());
    let output = dir.path().join("out.json");
    let telemetry = dir.path().join("telemetry.json");
    let report = dir.path().join("report.json");

    let args = ObfuscateArgs {
        xor_key: Some(0x01),
        bogus_count: Some(1),
        telemetry: Some(telemetry.clone()),
        output: Some(output.clone()),
        emit: Some(report.clone()),
        ..ObfuscateArgs::default()
    };
    args.execute(&input).await.unwrap();

    let module: Module = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(verify_module(&module), Ok(()));
    assert!(module.find_function("bogus_func_42").is_some());
    assert!(module.find_global("secret_message_obf").is_some());

    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&telemetry).unwrap()).unwrap();
    assert_eq!(written["fake_funcs_inserted"], 1);
    assert_eq!(written["xor_key"], 1);

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(report["changed"], true);
    assert_eq!(report["delta"]["functions"], 1);
}

#[tokio::test]
async fn test_obfuscate_without_telemetry_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_demo(dir.path());
    let output = dir.path().join("out.json");
    let telemetry = dir.path().join("telemetry.json");

    ObfuscateArgs {
        telemetry: Some(telemetry.clone()),
        no_telemetry: true,
        output: Some(output.clone()),
        ..ObfuscateArgs::default()
    }
    .execute(&input)
    .await
    .unwrap();

    assert!(output.exists());
    assert!(!telemetry.exists());
}

#[tokio::test]
async fn test_invalid_module_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("bad.json");
    fs::write(&input, "{ \"name\": 3 }").unwrap();
    let output = dir.path().join("out.json");

    let result = ObfuscateArgs {
        no_telemetry: true,
        output: Some(output.clone()),
        ..ObfuscateArgs::default()
    }
    .execute(&input.to_string_lossy())
    .await;
    assert!(result.is_err());
    assert!(!output.exists());
}

#[tokio::test]
async fn test_print_and_metrics() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_demo(dir.path());

    let text_path = dir.path().join("example.ll");
    PrintArgs {
        metrics: false,
        output: Some(text_path.clone()),
    }
    .execute(&input)
    .await
    .unwrap();
    let text = fs::read_to_string(&text_path).unwrap();
    assert!(text.contains("define external i32 @main(i32 %arg0)"));

    let metrics_path = dir.path().join("metrics.json");
    PrintArgs {
        metrics: true,
        output: Some(metrics_path.clone()),
    }
    .execute(&input)
    .await
    .unwrap();
    let metrics: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&metrics_path).unwrap()).unwrap();
    assert_eq!(metrics["functions"], 6);
}

#[tokio::test]
async fn test_cfg_for_named_function() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_demo(dir.path());
    let dot: PathBuf = dir.path().join("fib.dot");

    CfgArgs {
        function: "calculate_fibonacci".into(),
        output: Some(dot.clone()),
    }
    .execute(&input)
    .await
    .unwrap();
    assert!(fs::read_to_string(&dot).unwrap().contains("digraph"));

    let missing = CfgArgs {
        function: "nope".into(),
        output: None,
    }
    .execute(&input)
    .await;
    assert!(missing.is_err());
}

#[test]
fn test_load_module_verifies() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_demo(dir.path());
    let module = load_module(&input).unwrap();
    assert_eq!(module, demo_module().unwrap());
}
