use std::io::Write;

use cli::commands::{chart, compile, run};
use cli::ToplevelConfig;
use tempfile::NamedTempFile;

fn write_temp(content: &str, suffix: &str) -> NamedTempFile {
    let mut f = NamedTempFile::with_suffix(suffix).unwrap();
    f.write_all(content.as_bytes()).unwrap();
    f.flush().unwrap();
    f
}

fn write_temp_source(content: &str) -> NamedTempFile {
    write_temp(content, ".ql")
}

fn run_captured(path: &str) -> (anyhow::Result<()>, String) {
    let mut out = Vec::new();
    let result = run::run_file_to(path, ToplevelConfig::default(), &mut out);
    (result, String::from_utf8(out).unwrap())
}

// ======================================================================
// compile_file
// ======================================================================

#[test]
fn compile_valid_source_with_output() {
    let src = write_temp_source("let x = 1 + 2\nprint(x)");
    let out = NamedTempFile::with_suffix(".qbc").unwrap();
    let out_path = out.path().to_str().unwrap().to_string();

    let result = compile::compile_file(src.path().to_str().unwrap(), Some(&out_path));
    assert!(result.is_ok(), "compile_file failed: {:?}", result.err());

    let bytes = std::fs::read(&out_path).unwrap();
    assert!(bytes.len() >= 4, "output file too small");
    assert_eq!(&bytes[..4], b"QBC\x01", "wrong magic header");
}

#[test]
fn compile_valid_source_no_output() {
    let src = write_temp_source("let x = 42");
    let result = compile::compile_file(src.path().to_str().unwrap(), None);
    assert!(result.is_ok(), "compile_file (no output) failed: {:?}", result.err());
}

#[test]
fn compile_invalid_source_returns_error() {
    let src = write_temp_source("let = ???");
    let result = compile::compile_file(src.path().to_str().unwrap(), None);
    let err = format!("{}", result.unwrap_err());
    assert!(err.contains("Compile error"), "expected compile error, got: {err}");
}

#[test]
fn compile_nonexistent_file_returns_error() {
    assert!(compile::compile_file("/tmp/nonexistent_quill_test.ql", None).is_err());
}

// ======================================================================
// run_file
// ======================================================================

#[test]
fn run_valid_arithmetic_source() {
    let src = write_temp_source("let x = 2 + 3\nprint(x)");
    let (result, output) = run_captured(src.path().to_str().unwrap());
    assert!(result.is_ok(), "run_file failed: {:?}", result.err());
    assert_eq!(output, "5\n");
}

#[test]
fn run_source_with_runtime_error() {
    let src = write_temp_source("let x = 1 / 0");
    let (result, _) = run_captured(src.path().to_str().unwrap());
    let err = format!("{}", result.unwrap_err());
    assert!(err.contains("division by zero"), "expected runtime error, got: {err}");
}

#[test]
fn run_nonexistent_file_returns_error() {
    let (result, _) = run_captured("/tmp/nonexistent_quill_test.ql");
    assert!(result.is_err());
}

#[test]
fn run_compiled_binary() {
    let src = write_temp_source("let x = 10\nprint(x)");
    let out = NamedTempFile::with_suffix(".qbc").unwrap();
    let out_path = out.path().to_str().unwrap().to_string();

    compile::compile_file(src.path().to_str().unwrap(), Some(&out_path))
        .expect("compile should succeed");

    let (result, output) = run_captured(&out_path);
    assert!(result.is_ok(), "run compiled binary failed: {:?}", result.err());
    assert_eq!(output, "10\n");
}

#[test]
fn run_corrupt_binary_is_a_link_error() {
    let bin = write_temp("not bytecode", ".qbc");
    let (result, _) = run_captured(bin.path().to_str().unwrap());
    let err = format!("{}", result.unwrap_err());
    assert!(err.contains("Link error"), "got: {err}");
}

// ======================================================================
// chart_command
// ======================================================================

#[test]
fn chart_writes_series_json() {
    let data = write_temp(
        r#"{"startup": {"hello": [0.1, 0.2, 0.3, 0.4, 0.5], "fib": [1.0, 1.5, 1.2, 1.1, 1.3]}}"#,
        ".json",
    );
    let out = NamedTempFile::with_suffix(".json").unwrap();
    let out_path = out.path().to_str().unwrap().to_string();

    chart::chart_command(data.path().to_str().unwrap(), None, Some(&out_path)).unwrap();

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out_path).unwrap()).unwrap();
    assert_eq!(written[0]["title"], "startup");
    assert_eq!(written[0]["series"][0]["type"], "boxplot");
    assert_eq!(written[0]["categories"], serde_json::json!(["fib", "hello"]));
}

#[test]
fn chart_with_mismatched_baseline_skips_that_title() {
    let data = write_temp(r#"{"t": {"a": [1.0], "b": [2.0]}, "u": {"a": [1.0]}}"#, ".json");
    let base = write_temp(r#"{"t": {"a": [1.0], "c": [2.0]}, "u": {"a": [3.0]}}"#, ".json");

    let current = chart::load_bench_data(data.path()).unwrap();
    let baseline = chart::load_bench_data(base.path()).unwrap();
    let (charts, reports) = chart::collect(&current, Some(&baseline));

    assert_eq!(charts.len(), 1);
    assert_eq!(charts[0].title, "u");
    assert_eq!(charts[0].series.len(), 2);
    assert_eq!(reports.len(), 1);
    assert!(reports[0].contains("missing from baseline: [b]"), "{}", reports[0]);
    assert!(reports[0].contains("only in baseline: [c]"), "{}", reports[0]);
}

#[test]
fn chart_rejects_malformed_json() {
    let data = write_temp("[1, 2, 3]", ".json");
    assert!(chart::chart_command(data.path().to_str().unwrap(), None, None).is_err());
}
