//! Benchmark Planner
//!
//! Builds the execution plan by discovering, filtering and ordering benchmark
//! files, then resolving each file's expected value.
//!
//! Sources:
//! - A benchmark directory walked recursively for the configured extension
//! - The rows of a regression baseline (`-r`), run exactly as recorded
//!
//! Ordering: benchmarks are sorted by path for deterministic submission order.

use optibench_core::{BenchmarkProblem, Mode, resolve_expected_file};
use regex::Regex;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Execution plan for benchmarks
#[derive(Debug, Default)]
pub struct ExecutionPlan {
    /// Ordered list of benchmarks to run
    pub problems: Vec<BenchmarkProblem>,
}

impl ExecutionPlan {
    pub fn len(&self) -> usize {
        self.problems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }
}

fn has_extension(path: &Path, extension: &str) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    if extension.is_empty() {
        return true;
    }
    let ext = extension.trim_start_matches('.');
    name.strip_suffix(ext)
        .and_then(|stem| stem.strip_suffix('.'))
        .is_some_and(|stem| !stem.is_empty())
}

/// Recursively find benchmark files under `root` with `extension`, sorted
pub fn discover_benchmarks(root: &Path, extension: &str) -> anyhow::Result<Vec<PathBuf>> {
    if !root.is_dir() {
        anyhow::bail!("Benchmark directory not found: {}", root.display());
    }

    let mut found = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable benchmark path");
                continue;
            }
        };
        if entry.file_type().is_file() && has_extension(entry.path(), extension) {
            found.push(entry.into_path());
        }
    }
    found.sort();
    Ok(found)
}

/// Build execution plan from benchmark paths
///
/// Applies the optional regex filter to each path, resolves the expected
/// value for `mode` and returns problems in deterministic order.
pub fn build_plan(
    paths: impl IntoIterator<Item = PathBuf>,
    filter: Option<&Regex>,
    mode: Mode,
) -> ExecutionPlan {
    let mut selected: Vec<PathBuf> = paths
        .into_iter()
        .filter(|p| {
            // Apply regex filter on the displayed path
            match filter {
                Some(re) => re.is_match(&p.display().to_string()),
                None => true,
            }
        })
        .collect();

    // Sort for deterministic execution order
    selected.sort();
    selected.dedup();

    let problems = selected
        .into_iter()
        .map(|path| {
            let expected = match resolve_expected_file(&path, mode) {
                Ok(expected) => expected,
                Err(e) => {
                    tracing::warn!(error = %e, "expected value unavailable, benchmark will be UNKNOWN");
                    None
                }
            };
            BenchmarkProblem::new(path, mode, expected)
        })
        .collect();

    ExecutionPlan { problems }
}

/// Values substituted into a command template
#[derive(Debug, Clone)]
pub struct CommandContext<'a> {
    pub exe: &'a str,
    pub prefix: &'a str,
    pub timeout_seconds: u64,
    pub flags: &'a str,
    pub mode: Mode,
}

/// Expand `template` into the argument vector for `file`.
///
/// The template is split on whitespace before substitution, so an executable
/// or benchmark path containing spaces stays one argument. A token that is
/// exactly `{flags}` expands to the whitespace-separated flags. Tokens that
/// expand to nothing are dropped.
pub fn render_command(template: &str, ctx: &CommandContext<'_>, file: &Path) -> Vec<String> {
    let file = file.display().to_string();
    let timeout = ctx.timeout_seconds.to_string();
    let values = [
        ("{exe}", ctx.exe),
        ("{prefix}", ctx.prefix),
        ("{file}", file.as_str()),
        ("{timeout}", timeout.as_str()),
        ("{flags}", ctx.flags),
        ("{mode}", ctx.mode.flag()),
    ];

    let mut argv = Vec::new();
    for token in template.split_whitespace() {
        if token == "{flags}" {
            argv.extend(ctx.flags.split_whitespace().map(str::to_string));
            continue;
        }
        let arg = expand_token(token, &values);
        if !arg.is_empty() {
            argv.push(arg);
        }
    }
    argv
}

/// Single-pass placeholder substitution; substituted text is never rescanned
fn expand_token(token: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(token.len());
    let mut rest = token;
    'scan: while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        for (name, value) in values {
            if let Some(after) = tail.strip_prefix(name) {
                out.push_str(value);
                rest = after;
                continue 'scan;
            }
        }
        out.push('{');
        rest = &tail[1..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, rel: &str, body: &str) -> PathBuf {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_discover_sorted_and_recursive() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "b.dop", "");
        write(dir.path(), "nested/a.dop", "");
        write(dir.path(), "notes.txt", "");
        write(dir.path(), "dop", "");

        let found = discover_benchmarks(dir.path(), ".dop").unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            names,
            vec![PathBuf::from("b.dop"), PathBuf::from("nested/a.dop")]
        );
    }

    #[test]
    fn test_discover_missing_dir() {
        assert!(discover_benchmarks(Path::new("/definitely/not/here"), ".dop").is_err());
    }

    #[test]
    fn test_plan_resolves_expected_and_filters() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "alpha.dop", "# maximum: 4.5\n");
        let b = write(dir.path(), "beta.dop", "# maximum: ?\n");
        let c = write(dir.path(), "gamma.dop", "# answer: 1\n");

        let plan = build_plan(vec![c.clone(), a.clone(), b.clone()], None, Mode::Max);
        assert_eq!(plan.len(), 3);
        assert_eq!(plan.problems[0].path, a);
        assert_eq!(plan.problems[0].expected, Some(4.5));
        assert_eq!(plan.problems[1].expected, None);
        assert_eq!(plan.problems[2].expected, Some(1.0));

        let re = Regex::new("(alpha|gamma)").unwrap();
        let plan = build_plan(vec![a, b, c], Some(&re), Mode::Max);
        let names: Vec<_> = plan.problems.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["alpha.dop", "gamma.dop"]);
    }

    #[test]
    fn test_plan_missing_file_is_unknown() {
        let plan = build_plan(vec![PathBuf::from("/no/such/file.dop")], None, Mode::Min);
        assert_eq!(plan.problems[0].expected, None);
    }

    #[test]
    fn test_render_command() {
        let ctx = CommandContext {
            exe: "gelpia",
            prefix: "@",
            timeout_seconds: 60,
            flags: "",
            mode: Mode::Max,
        };
        let argv = render_command(
            "{exe} {prefix}{file} -t {timeout} {flags}",
            &ctx,
            Path::new("bench/a.dop"),
        );
        assert_eq!(argv, ["gelpia", "@bench/a.dop", "-t", "60"]);

        let ctx = CommandContext {
            flags: "--seed 0",
            prefix: "",
            ..ctx
        };
        let argv = render_command("{exe} --{mode} {prefix}{file} {flags}", &ctx, Path::new("x.dop"));
        assert_eq!(argv, ["gelpia", "--max", "x.dop", "--seed", "0"]);
    }

    #[test]
    fn test_render_command_keeps_spaced_paths_whole() {
        let ctx = CommandContext {
            exe: "/opt/my tools/gelpia",
            prefix: "@",
            timeout_seconds: 5,
            flags: "--seed 1",
            mode: Mode::Min,
        };
        let argv = render_command(
            "{exe} {prefix}{file} --opts={flags} {flags}",
            &ctx,
            Path::new("bench dir/my {mode} problem.dop"),
        );
        assert_eq!(
            argv,
            [
                "/opt/my tools/gelpia",
                "@bench dir/my {mode} problem.dop",
                "--opts=--seed 1",
                "--seed",
                "1",
            ]
        );
    }
}
