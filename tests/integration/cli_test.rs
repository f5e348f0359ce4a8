use std::process::{Command, Output};

fn dps(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_dps"))
        .args(args)
        .output()
        .expect("Failed to execute dps")
}

const SMALL_RUN: &[&str] = &[
    "run",
    "-j",
    "3",
    "--margin",
    "3",
    "--period-length",
    "2000",
    "--sim-conflicts",
    "300",
    "--sim-jitter",
    "200",
    "--seed",
    "5",
    "--stats",
];

fn winner_line(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .find(|l| l.starts_with("c Winner:"))
        .map(str::to_string)
}

#[test]
fn test_unsat_run_reports_verdict_and_exit_code() {
    let output = dps(SMALL_RUN);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert_eq!(
        output.status.code(),
        Some(20),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(stdout.contains("s UNSATISFIABLE"), "stdout: {}", stdout);
    assert!(stdout.contains("c Workers: 3"), "Should print statistics");
}

#[test]
fn test_cli_runs_are_reproducible() {
    let first = dps(SMALL_RUN);
    let second = dps(SMALL_RUN);
    let first = winner_line(&String::from_utf8_lossy(&first.stdout));
    assert!(first.is_some(), "Should print the winner");
    assert_eq!(first, winner_line(&String::from_utf8_lossy(&second.stdout)));
}

#[test]
fn test_sat_run_prints_model() {
    let output = dps(&[
        "run",
        "-j",
        "2",
        "--margin",
        "2",
        "--period-length",
        "1000",
        "--sim-verdict",
        "sat",
        "--sim-conflicts",
        "100",
        "--sim-vars",
        "10",
        "--model",
    ]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert_eq!(output.status.code(), Some(10));
    assert!(stdout.contains("s SATISFIABLE"));
    let model = stdout
        .lines()
        .find(|l| l.starts_with("v "))
        .expect("Should print a model line");
    assert!(model.ends_with(" 0"));
    assert_eq!(model.split_whitespace().count(), 12, "v, 10 literals, 0");
}

#[test]
fn test_invalid_configuration_is_an_error() {
    let output = dps(&["run", "--adaptive-conflicts", "10", "--adaptive-smoothing", "0"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid configuration"), "stderr: {}", stderr);
}

#[test]
fn test_workers_command_applies_memory_heuristic() {
    let output = dps(&[
        "workers",
        "-j",
        "16",
        "--mem-limit",
        "4000",
        "--loaded",
        "500",
        "--factor",
        "3",
    ]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "2");
}

#[test]
fn test_unrepresentable_time_limit_is_an_error() {
    for limit in ["--time-limit=inf", "--time-limit=-1", "--time-limit=NaN"] {
        let output = dps(&["run", "-j", "1", limit]);
        assert_eq!(output.status.code(), Some(1), "{} should be rejected", limit);
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("invalid --time-limit"), "stderr: {}", stderr);
    }
}
