//! Executor control flow driven by small shell scripts standing in for
//! `php`. They ignore the `-d` settings, so these run on any Linux host.

#![cfg(target_os = "linux")]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use vulncases::sandbox::{build_script, SandboxPolicy, SimulatedRequest, SnippetExecutor};
use vulncases::VulnCasesError;

const SNIPPET: &str = "<?php echo $_GET['x'];";

const FAKES: &[(&str, &str)] = &[
    ("echo-stdin", "cat"),
    (
        "env-args",
        "cat >/dev/null\nprintf '%s|%s' \"$REQUEST_METHOD\" \"$QUERY_STRING\"\nprintf '%s\\n' \"$@\" >&2",
    ),
    ("fail", "cat >/dev/null\necho 'Fatal <error>' >&2\nexit 3"),
    (
        "hang",
        "cat >/dev/null\necho $$ > interpreter.pid\nsleep 30 &\necho $! > child.pid\nwait",
    ),
    (
        "detach",
        "cat >/dev/null\nsleep 20 &\necho $! > child.pid\necho done\nexit 0",
    ),
    (
        "flood",
        "cat >/dev/null\nhead -c 100000 /dev/zero | tr '\\0' A",
    ),
];

/// Every fake is written once, before any test spawns a process, so no
/// child can inherit a script's write descriptor and hit ETXTBSY.
fn fakes_dir() -> &'static Path {
    static FAKES_DIR: OnceLock<tempfile::TempDir> = OnceLock::new();
    FAKES_DIR
        .get_or_init(|| {
            let dir = tempfile::tempdir().unwrap();
            for (name, body) in FAKES {
                let path = dir.path().join(name);
                std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
                std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            }
            dir
        })
        .path()
}

fn executor(fake: &str, root: &Path, timeout: Duration) -> SnippetExecutor {
    let mut policy = SandboxPolicy::new(root.canonicalize().unwrap()).with_timeout(timeout);
    policy.interpreter = fakes_dir().join(fake).display().to_string();
    SnippetExecutor::new(policy).unwrap()
}

fn read_pid(path: PathBuf) -> u32 {
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("{}: {}", path.display(), e))
        .trim()
        .parse()
        .unwrap()
}

/// Running means present in /proc and not a zombie awaiting its reaper.
fn is_running(pid: u32) -> bool {
    let Ok(stat) = std::fs::read_to_string(format!("/proc/{}/stat", pid)) else {
        return false;
    };
    let state = stat
        .rsplit_once(')')
        .and_then(|(_, rest)| rest.trim_start().chars().next());
    !matches!(state, Some('Z') | Some('X') | None)
}

fn assert_gone(pid: u32) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while is_running(pid) {
        assert!(Instant::now() < deadline, "process {} still running", pid);
        std::thread::sleep(Duration::from_millis(50));
    }
}

#[tokio::test]
async fn test_script_arrives_on_stdin() {
    let root = tempfile::tempdir().unwrap();
    let executor = executor("echo-stdin", root.path(), Duration::from_secs(5));
    let request = SimulatedRequest::default().with_param("x", "it's");

    let result = executor.execute(SNIPPET, Some(&request)).await.unwrap();
    assert_eq!(result.exit_code, 0);
    assert_eq!(result.stdout, build_script(SNIPPET, Some(&request)));

    let result = executor.execute(SNIPPET, None).await.unwrap();
    assert_eq!(result.stdout, SNIPPET);
}

#[tokio::test]
async fn test_request_env_and_policy_args() {
    let root = tempfile::tempdir().unwrap();
    let executor = executor("env-args", root.path(), Duration::from_secs(5));
    let request = SimulatedRequest::new("POST", vec![])
        .with_param("a", "1")
        .with_param("b", "x y");

    let result = executor.execute(SNIPPET, Some(&request)).await.unwrap();
    assert_eq!(result.stdout, "POST|a=1&b=x y");

    let args: Vec<&str> = result.stderr.lines().collect();
    assert_eq!(args, executor.policy().interpreter_args());
    assert!(!result.stderr.contains(SNIPPET));

    // Without a request only the method is set
    let result = executor.execute(SNIPPET, None).await.unwrap();
    assert_eq!(result.stdout, "GET|");

    assert!(std::env::var("QUERY_STRING").is_err());
}

#[tokio::test]
async fn test_nonzero_exit_renders_escaped_error() {
    let root = tempfile::tempdir().unwrap();
    let executor = executor("fail", root.path(), Duration::from_secs(5));

    let result = executor.execute(SNIPPET, None).await.unwrap();
    assert_eq!(result.exit_code, 3);
    assert!(!result.timed_out);

    let body = executor.render(SNIPPET, None).await;
    assert_eq!(
        body,
        "<div class='error'>PHP execution error: Fatal &lt;error&gt;\n</div>"
    );
}

#[tokio::test]
async fn test_timeout_kills_interpreter_and_descendants() {
    let root = tempfile::tempdir().unwrap();
    let executor = executor("hang", root.path(), Duration::from_secs(2));

    let started = Instant::now();
    let result = executor.execute(SNIPPET, None).await.unwrap();
    let elapsed = started.elapsed();

    assert!(result.timed_out);
    assert!(elapsed < Duration::from_secs(5), "returned after {:?}", elapsed);

    assert_gone(read_pid(root.path().join("interpreter.pid")));
    assert_gone(read_pid(root.path().join("child.pid")));
}

#[tokio::test]
async fn test_descendant_holding_pipes_cannot_outlive_deadline() {
    let root = tempfile::tempdir().unwrap();
    let executor = executor("detach", root.path(), Duration::from_secs(2));

    let started = Instant::now();
    let body = executor.render(SNIPPET, None).await;
    let elapsed = started.elapsed();

    assert!(elapsed < Duration::from_secs(5), "returned after {:?}", elapsed);
    assert_eq!(
        body,
        "<div class='error'>PHP execution timeout (2 seconds)</div>"
    );
    assert_gone(read_pid(root.path().join("child.pid")));
}

#[tokio::test]
async fn test_output_ceiling_truncates() {
    let root = tempfile::tempdir().unwrap();
    let mut policy = SandboxPolicy::new(root.path().canonicalize().unwrap());
    policy.interpreter = fakes_dir().join("flood").display().to_string();
    policy.max_output_bytes = 1024;
    let executor = SnippetExecutor::new(policy).unwrap();

    let result = executor.execute(SNIPPET, None).await.unwrap();
    assert_eq!(result.exit_code, 0);
    assert!(result.truncated);
    assert_eq!(result.stdout, "A".repeat(1024));
}

#[tokio::test]
async fn test_blank_snippet_never_spawns() {
    let root = tempfile::tempdir().unwrap();
    let executor = executor("echo-stdin", root.path(), Duration::from_secs(5));

    let err = executor.execute("", None).await.unwrap_err();
    assert!(matches!(err, VulnCasesError::EmptySnippet));
    let err = executor.execute("   \n", None).await.unwrap_err();
    assert!(matches!(err, VulnCasesError::EmptySnippet));
}
