//! End-to-end tests that run the compiled binary.
//!
//! The process launcher re-executes the binary's hidden `worker` subcommand,
//! so these tests exercise real child processes.

use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::Arc;

use trapezoid_farm::controller::{self, IndependentStrategy, ProcessLauncher};
use trapezoid_farm::request::{IntegrationRequest, IterRequestSource};
use trapezoid_farm::sink::MemorySink;

const BIN: &str = env!("CARGO_BIN_EXE_trapezoid-farm");

fn run_cli(args: &[&str], stdin: &str) -> std::process::Output {
    let mut child = Command::new(BIN)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn binary");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(stdin.as_bytes())
        .unwrap();
    child.wait_with_output().expect("wait for binary")
}

fn parse_area(line: &str) -> f64 {
    line.rsplit("≈ ").next().unwrap().trim().parse().unwrap()
}

#[test]
fn test_process_launcher_runs_workers() {
    let sink = Arc::new(MemorySink::new());
    let mut strategy = IndependentStrategy::new(
        2,
        Box::new(ProcessLauncher::with_program(BIN)),
        sink.clone(),
    )
    .unwrap();
    let reqs = vec![
        IntegrationRequest::new(0.0, 3.14159265, 1000, 0).unwrap(),
        IntegrationRequest::new(-3.5, -1.25, 10, 2).unwrap(),
        IntegrationRequest::new(-8.0, 8.0, 4000, 1).unwrap(),
        IntegrationRequest::new(0.5, 0.5, 7, 0).unwrap(),
        IntegrationRequest::new(0.0, 1.0, 1, 2).unwrap(),
    ];
    let mut source = IterRequestSource::new(reqs);
    let outcome = controller::run(&mut source, &mut strategy).unwrap();

    assert_eq!(outcome.requests_admitted, 5);
    assert!(outcome.peak_active <= 2);

    let areas = sink.areas();
    assert_eq!(areas.len(), 5);
    let find = |f: usize, start: f64| {
        areas
            .iter()
            .find(|a| a.function_id == f && a.range_start == start)
            .unwrap()
            .area
    };
    assert!((find(0, 0.0) - 2.0).abs() < 1e-4);
    assert_eq!(find(2, -3.5), 0.0);
    assert!((find(1, -8.0) - 1.0).abs() < 1e-6);
    assert_eq!(find(0, 0.5), 0.0);
    assert_eq!(find(2, 0.0), 0.5);
}

#[cfg(unix)]
#[test]
fn test_process_worker_nonzero_exit_is_fatal() {
    use trapezoid_farm::EngineError;
    use trapezoid_farm::controller::WorkerStrategy;

    let sink = Arc::new(MemorySink::new());
    let mut strategy = IndependentStrategy::new(
        2,
        Box::new(ProcessLauncher::with_program("/bin/false")),
        sink.clone(),
    )
    .unwrap();
    let reqs: Vec<_> = (0..4)
        .map(|_| IntegrationRequest::new(0.0, 1.0, 10, 0).unwrap())
        .collect();
    let mut source = IterRequestSource::new(reqs);

    let err = strategy.drive(&mut source).unwrap_err();
    assert!(matches!(err, EngineError::WorkerFailure(ref msg) if msg.contains("exited with status")));
    assert!(sink.areas().is_empty());
    assert_eq!(strategy.gate().active(), 0);
}

#[test]
fn test_cli_sine_over_pi() {
    let out = run_cli(&["run", "--max-workers", "3"], "0 3.14159265 1000 0\n");
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    let stdout = String::from_utf8(out.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("function 0 over [0,3.14159265] ≈ "));
    assert!((parse_area(lines[0]) - 2.0).abs() < 1e-4);
}

#[test]
fn test_cli_reversed_range_dispatches_nothing() {
    let out = run_cli(&["run"], "5 1 100 0\n0 1 100 0\n");
    assert!(out.status.success());
    assert!(out.stdout.is_empty());
}

#[test]
fn test_cli_batch_totals() {
    let input = "0 1 1 2\n0 1 1 2\n0 1 1 2\n";
    let out = run_cli(&["run", "--strategy", "batch", "--batch-size", "2"], input);
    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    assert_eq!(
        stdout.lines().collect::<Vec<_>>(),
        vec!["total ≈ 1.0000000000", "total ≈ 1.5000000000"]
    );

    let out = run_cli(
        &["run", "--strategy", "batch", "--batch-size", "2", "--total-mode", "per-batch"],
        input,
    );
    let stdout = String::from_utf8(out.stdout).unwrap();
    assert_eq!(
        stdout.lines().collect::<Vec<_>>(),
        vec!["total ≈ 1.0000000000", "total ≈ 0.5000000000"]
    );
}

#[test]
fn test_cli_prompt() {
    let out = run_cli(&["run", "--isolation", "thread", "--prompt"], "0 0 1 0\n");
    let stdout = String::from_utf8(out.stdout).unwrap();
    let prompts = stdout
        .lines()
        .filter(|l| *l == "Query: [start] [end] [numSteps] [funcId]")
        .count();
    // one before the record, one before end of input
    assert_eq!(prompts, 2);
}

#[test]
fn test_cli_worker_subcommand() {
    let out = run_cli(&["worker", "--start=-1", "--end=1", "--steps=10", "--function=1"], "");
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["function_id"], 1);
    assert_eq!(v["range_start"], -1.0);
    assert!(v["area"].as_f64().unwrap() > 0.6);
}

#[test]
fn test_cli_worker_rejects_bad_function() {
    let out = run_cli(&["worker", "--start=0", "--end=1", "--steps=10", "--function=3"], "");
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("invalid function index 3"));
}

#[test]
fn test_cli_functions() {
    let out = run_cli(&["functions"], "");
    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    assert_eq!(stdout.lines().count(), 3);
    assert!(stdout.contains("charge_decay"));
}

#[test]
fn test_cli_invalid_config_is_fatal() {
    let out = run_cli(&["run", "--batch-size", "0"], "0 1 1 0\n");
    assert!(!out.status.success());
    assert!(out.stdout.is_empty());
}
