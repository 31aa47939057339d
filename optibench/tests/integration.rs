//! Integration tests for optibench
//!
//! These tests drive the whole pipeline (planning, subprocess execution,
//! classification, reporting and baselines) against a fake `/bin/sh` solver
//! that echoes the `#> ` lines of each benchmark file as its output.
#![cfg(unix)]

use clap::Parser;
use optibench::{Baseline, Cli, Mode, RunStatus, run_with_cli};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Echo `#> ` lines, optionally sleep (`#sleep N`), exit with `#exit N`
const FAKE_SOLVER: &str = r#"#!/bin/sh
file="${1#@}"
sed -n 's/^#> //p' "$file"
pause=$(sed -n 's/^#sleep //p' "$file")
if [ -n "$pause" ]; then
    sleep "$pause"
fi
code=$(sed -n 's/^#exit //p' "$file")
exit "${code:-0}"
"#;

struct Workspace {
    dir: tempfile::TempDir,
}

impl Workspace {
    fn new() -> Self {
        let ws = Self {
            dir: tempfile::tempdir().unwrap(),
        };
        let solver = ws.path().join("fake-solver");
        fs::write(&solver, FAKE_SOLVER).unwrap();
        fs::set_permissions(&solver, fs::Permissions::from_mode(0o755)).unwrap();
        fs::create_dir_all(ws.bench_dir()).unwrap();
        ws
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn bench_dir(&self) -> PathBuf {
        self.path().join("bench")
    }

    fn solver(&self) -> String {
        self.path().join("fake-solver").display().to_string()
    }

    fn bench(&self, name: &str, body: &str) {
        fs::write(self.bench_dir().join(name), body).unwrap();
    }

    /// Run in-process with common flags plus `extra`
    fn run(&self, extra: &[&str]) -> anyhow::Result<RunStatus> {
        let solver = self.solver();
        let mut argv = vec![
            "optibench",
            "--exe",
            solver.as_str(),
            "--no-progress",
            "--color",
            "never",
            "-j",
            "2",
        ];
        argv.extend_from_slice(extra);
        run_with_cli(Cli::try_parse_from(argv)?)
    }

    fn report(&self, name: &str) -> serde_json::Value {
        let text = fs::read_to_string(self.path().join(name)).unwrap();
        serde_json::from_str(&text).unwrap()
    }
}

fn result_for<'a>(report: &'a serde_json::Value, name: &str) -> &'a serde_json::Value {
    report["results"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["name"] == name)
        .unwrap_or_else(|| panic!("no result for {}", name))
}

#[test]
fn test_healthy_run_classifies_every_benchmark() {
    let ws = Workspace::new();
    ws.bench(
        "exact.dop",
        "# maximum: 4.5\n#> Maximum lower bound 4.25\n#> Maximum upper bound 4.5\n",
    );
    ws.bench(
        "close.dop",
        "# maximum: 100\n#> Maximum lower bound 99\n#> Maximum upper bound 100.5\n",
    );
    ws.bench("unknown.dop", "# maximum: ?\n#> Maximum upper bound 7\n");
    ws.bench("notes.txt", "# maximum: 1\n");

    let bench = ws.bench_dir().display().to_string();
    let output = ws.path().join("report.json").display().to_string();
    let status = ws
        .run(&[&bench, "--format", "json", "--output", &output])
        .unwrap();
    assert_eq!(status, RunStatus::Healthy);

    let report = ws.report("report.json");
    assert_eq!(report["partial"], false);
    assert_eq!(report["summary"]["total"], 3);
    assert_eq!(report["results"].as_array().unwrap().len(), 3);

    let exact = result_for(&report, "exact.dop");
    assert_eq!(exact["verdict"]["main"], "RAN");
    assert_eq!(exact["verdict"]["strict"], "EXACT");
    assert_eq!(exact["verdict"]["width"], "WIDE");

    let close = result_for(&report, "close.dop");
    assert_eq!(close["verdict"]["strict"], "CLOSE");

    let unknown = result_for(&report, "unknown.dop");
    assert_eq!(unknown["verdict"]["main"], "UNKNOWN");
    assert_eq!(unknown["verdict"]["strict"], "NOT_APPLICABLE");
}

#[test]
fn test_failures_make_run_unhealthy() {
    let ws = Workspace::new();
    ws.bench("crash.dop", "# maximum: 1\n#> Traceback\n#exit 3\n");
    ws.bench("silent.dop", "# maximum: 1\n#> nothing to see\n");
    ws.bench("broken.dop", "# maximum: 10\n#> Maximum upper bound 9\n");

    let bench = ws.bench_dir().display().to_string();
    let output = ws.path().join("report.tsv").display().to_string();
    let status = ws
        .run(&[&bench, "--format", "tsv", "--output", &output])
        .unwrap();
    assert_eq!(status, RunStatus::Unhealthy { failures: 3 });
    assert_eq!(status.code(), 1);

    // --output follows --format
    let tsv = fs::read_to_string(ws.path().join("report.tsv")).unwrap();
    let mut lines = tsv.lines();
    assert!(lines.next().unwrap().starts_with("File\tMainState"));
    let rows: Vec<&str> = lines.collect();
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().any(|r| r.contains("\tCRASH\t")));
    assert!(rows.iter().any(|r| r.contains("\tFAILED\t")));
    assert!(rows.iter().any(|r| r.contains("\tBROKEN\t")));
}

#[test]
fn test_benchmark_path_with_spaces() {
    let ws = Workspace::new();
    let spaced = ws.path().join("my benches");
    fs::create_dir_all(spaced.join("sub dir")).unwrap();
    fs::write(
        spaced.join("sub dir/a b.dop"),
        "# maximum: 2\n#> Maximum lower bound 2\n#> Maximum upper bound 2\n",
    )
    .unwrap();

    let bench = spaced.display().to_string();
    let output = ws.path().join("report.json").display().to_string();
    let status = ws
        .run(&[&bench, "--format", "json", "--output", &output])
        .unwrap();
    assert_eq!(status, RunStatus::Healthy);

    let report = ws.report("report.json");
    let case = result_for(&report, "a b.dop");
    assert_eq!(case["verdict"]["main"], "RAN");
    assert_eq!(case["verdict"]["strict"], "EXACT");
    assert!(case["command"].as_str().unwrap().contains("'@"));
}

#[test]
fn test_lenient_bounds_report_bad_far() {
    let ws = Workspace::new();
    ws.bench("broken.dop", "# maximum: 10\n#> Maximum upper bound 9\n");

    let bench = ws.bench_dir().display().to_string();
    let output = ws.path().join("report.json").display().to_string();
    let status = ws
        .run(&[&bench, "--lenient", "--format", "json", "--output", &output])
        .unwrap();
    assert_eq!(status, RunStatus::Healthy);

    let report = ws.report("report.json");
    assert_eq!(
        result_for(&report, "broken.dop")["verdict"]["strict"],
        "BAD_FAR"
    );
}

#[test]
fn test_silent_tool_past_budget_is_timeout() {
    let ws = Workspace::new();
    ws.bench("slow.dop", "# maximum: 1\n#sleep 2\n");

    let bench = ws.bench_dir().display().to_string();
    let output = ws.path().join("report.json").display().to_string();
    let status = ws
        .run(&[&bench, "--timeout", "1", "--format", "json", "--output", &output])
        .unwrap();
    assert_eq!(status, RunStatus::Healthy);

    let report = ws.report("report.json");
    let slow = result_for(&report, "slow.dop");
    assert_eq!(slow["verdict"]["main"], "TIMEOUT");
    assert!(slow["command"].as_str().unwrap().contains("-t 1"));
}

#[test]
fn test_baseline_round_trip_detects_regression() {
    let ws = Workspace::new();
    ws.bench("a.dop", "# maximum: 10\n#> Maximum upper bound 10\n");
    ws.bench("b.dop", "# maximum: 5\n#> Maximum upper bound 5\n");

    let bench = ws.bench_dir().display().to_string();
    let baseline_path = ws.path().join("out/baseline.tsv");
    let baseline_arg = baseline_path.display().to_string();
    let status = ws
        .run(&[&bench, "--format", "csv", "--flags", "--seed 1", "-o", &baseline_arg])
        .unwrap();
    assert_eq!(status, RunStatus::Healthy);

    let baseline = Baseline::read(&baseline_path).unwrap();
    assert_eq!(baseline.entries.len(), 2);
    assert_eq!(baseline.header.flags, "--seed 1");
    assert_eq!(baseline.header.mode, Mode::Max);

    // a.dop now reports 12: sound for MAX, far from the optimum, above the recorded 10
    ws.bench("a.dop", "# maximum: 10\n#> Maximum upper bound 12\n");
    ws.bench("b.dop", "# maximum: 5\n#> Maximum upper bound 5\n");
    // Not in the baseline, so never run
    ws.bench("c.dop", "# maximum: 1\n#exit 9\n");

    let output = ws.path().join("rerun.json").display().to_string();
    let status = ws
        .run(&["-r", &baseline_arg, "--format", "json", "--output", &output])
        .unwrap();
    assert_eq!(status, RunStatus::Healthy);

    let report = ws.report("rerun.json");
    assert_eq!(report["summary"]["total"], 2);
    assert_eq!(report["settings"]["flags"], "--seed 1");
    assert_eq!(
        result_for(&report, "a.dop")["verdict"]["regression"],
        "FAR_BETTER"
    );
    assert_eq!(result_for(&report, "b.dop")["verdict"]["regression"], "SAME");
}

#[test]
fn test_regression_to_worse_answer_fails_run() {
    let ws = Workspace::new();
    ws.bench("a.dop", "# maximum: 10\n#> Maximum upper bound 12\n");

    let bench = ws.bench_dir().display().to_string();
    let baseline_arg = ws.path().join("baseline.tsv").display().to_string();
    ws.run(&[&bench, "--format", "tsv", "-o", &baseline_arg])
        .unwrap();

    ws.bench("a.dop", "# maximum: 10\n#> Maximum upper bound 10\n");
    let status = ws.run(&["-r", &baseline_arg, "--format", "tsv"]).unwrap();
    assert_eq!(status, RunStatus::Unhealthy { failures: 1 });
}

#[test]
fn test_config_file_supplies_tool_settings() {
    let ws = Workspace::new();
    ws.bench("a.prob", "# minimum: -2\n#> Minimum lower bound -2\n#> Minimum upper bound -1\n");
    ws.bench("ignored.dop", "# minimum: 0\n");

    let config = ws.path().join("optibench.toml");
    fs::write(
        &config,
        "[runner]\nextension = \".prob\"\n\n[tool]\nmode = \"min\"\n",
    )
    .unwrap();

    let bench = ws.bench_dir().display().to_string();
    let config_arg = config.display().to_string();
    let output = ws.path().join("report.json").display().to_string();
    let status = ws
        .run(&[
            &bench,
            "--config",
            &config_arg,
            "--format",
            "json",
            "--output",
            &output,
        ])
        .unwrap();
    assert_eq!(status, RunStatus::Healthy);

    let report = ws.report("report.json");
    assert_eq!(report["settings"]["mode"], "MIN");
    assert_eq!(report["summary"]["total"], 1);
    assert_eq!(result_for(&report, "a.prob")["verdict"]["strict"], "EXACT");
}

#[test]
fn test_list_does_not_execute() {
    let ws = Workspace::new();
    ws.bench("a.dop", "# maximum: 1\n#exit 1\n");

    let solver = ws.solver();
    let bench = ws.bench_dir().display().to_string();
    let cli = Cli::try_parse_from(["optibench", "list", &bench, "--exe", &solver]).unwrap();
    assert_eq!(run_with_cli(cli).unwrap(), RunStatus::Healthy);
}

#[test]
fn test_missing_benchmark_dir_is_harness_error() {
    let ws = Workspace::new();
    let err = ws.run(&[]).unwrap_err();
    assert!(err.downcast_ref::<optibench::HarnessError>().is_some());
}

#[test]
fn test_binary_exit_codes() {
    let ws = Workspace::new();
    ws.bench("crash.dop", "# maximum: 1\n#exit 2\n");
    let bench = ws.bench_dir().display().to_string();
    let solver = ws.solver();

    let status = Command::new(env!("CARGO_BIN_EXE_optibench"))
        .args([
            bench.as_str(),
            "--exe",
            solver.as_str(),
            "--no-progress",
            "--format",
            "tsv",
        ])
        .current_dir(ws.path())
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(1));

    let status = Command::new(env!("CARGO_BIN_EXE_optibench"))
        .args(["--no-progress"])
        .current_dir(ws.path())
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(2));
}
