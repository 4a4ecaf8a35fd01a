use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{Result, VulnCasesError};
use crate::sandbox::preamble::build_script;
use crate::sandbox::render::render_outcome;
use crate::sandbox::{ExecutionResult, SandboxPolicy, SimulatedRequest};

const READ_CHUNK: usize = 8192;

/// Runs PHP snippets in a restricted interpreter process, one process per call.
///
/// Holds nothing but the immutable policy, so a single executor can be shared
/// across concurrent requests.
pub struct SnippetExecutor {
    policy: SandboxPolicy,
    interpreter_path: PathBuf,
}

impl SnippetExecutor {
    /// Resolve the interpreter and build an executor. A missing interpreter is
    /// reported here rather than on the first request.
    pub fn new(policy: SandboxPolicy) -> Result<Self> {
        let interpreter_path =
            which::which(&policy.interpreter).map_err(|_| VulnCasesError::InterpreterNotFound {
                interpreter: policy.interpreter.clone(),
            })?;

        info!(
            interpreter = %interpreter_path.display(),
            root = %policy.confinement_root.display(),
            timeout_seconds = policy.timeout_seconds(),
            "Snippet executor ready"
        );

        Ok(Self {
            policy,
            interpreter_path,
        })
    }

    pub fn policy(&self) -> &SandboxPolicy {
        &self.policy
    }

    pub fn interpreter_path(&self) -> &std::path::Path {
        &self.interpreter_path
    }

    /// First line of `php --version`.
    pub async fn interpreter_version(&self) -> Result<String> {
        let output = Command::new(&self.interpreter_path)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                VulnCasesError::SandboxExecution(format!("Failed to run interpreter: {}", e))
            })?;

        if !output.status.success() {
            return Err(VulnCasesError::SandboxExecution(
                "Interpreter is not working properly".to_string(),
            ));
        }

        let version = String::from_utf8_lossy(&output.stdout);
        Ok(version.lines().next().unwrap_or_default().trim().to_string())
    }

    /// Execute `snippet` and capture its output.
    ///
    /// A timeout is not an error: the process is killed and the result comes
    /// back with `timed_out` set. Errors are reserved for invocation failures.
    pub async fn execute(
        &self,
        snippet: &str,
        request: Option<&SimulatedRequest>,
    ) -> Result<ExecutionResult> {
        if snippet.trim().is_empty() {
            return Err(VulnCasesError::EmptySnippet);
        }

        let script = build_script(snippet, request);
        let method = request.map(|r| r.method.as_str()).unwrap_or("GET");

        debug!(
            method = %method,
            params = request.map(|r| r.params.len()).unwrap_or(0),
            script_len = script.len(),
            "Executing snippet"
        );

        let mut cmd = Command::new(&self.interpreter_path);
        cmd.args(self.policy.interpreter_args());
        cmd.current_dir(&self.policy.confinement_root);

        // Added to the child's copy of the environment only
        cmd.env("REQUEST_METHOD", method);
        if let Some(request) = request {
            cmd.env("QUERY_STRING", request.query_string());
        }

        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        // Own process group, so anything the interpreter forks dies with it
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => VulnCasesError::InterpreterNotFound {
                interpreter: self.interpreter_path.display().to_string(),
            },
            _ => VulnCasesError::SandboxExecution(format!(
                "Failed to spawn '{}': {}",
                self.interpreter_path.display(),
                e
            )),
        })?;
        let pid = child.id();

        let stdin = child.stdin.take();
        let stdin_task = tokio::spawn(async move {
            if let Some(mut stdin) = stdin {
                stdin.write_all(script.as_bytes()).await?;
                stdin.shutdown().await?;
            }
            Ok::<(), std::io::Error>(())
        });

        let limit = self.policy.max_output_bytes;
        let stdout_task = tokio::spawn(read_capped(child.stdout.take(), limit));
        let stderr_task = tokio::spawn(read_capped(child.stderr.take(), limit));
        let readers = [stdout_task.abort_handle(), stderr_task.abort_handle()];

        // The deadline covers the exit and both streams reaching EOF; a
        // descendant holding a pipe open must not outlive the limit.
        let running = async {
            let status = child.wait().await.map_err(|e| {
                VulnCasesError::SandboxExecution(format!("Failed to wait for interpreter: {}", e))
            })?;
            let stdout = join_reader(stdout_task).await?;
            let stderr = join_reader(stderr_task).await?;
            Ok::<_, VulnCasesError>((status, stdout, stderr))
        };
        let outcome = tokio::time::timeout(self.policy.timeout, running).await;

        kill_process_group(pid);

        let (status, (stdout, stdout_truncated), (stderr, stderr_truncated)) = match outcome {
            Ok(Ok(finished)) => finished,
            Ok(Err(e)) => {
                stop(&mut child, &readers, &stdin_task).await;
                return Err(e);
            }
            Err(_) => {
                warn!(
                    timeout_seconds = self.policy.timeout_seconds(),
                    "Snippet exceeded wall-clock limit, killing interpreter"
                );
                stop(&mut child, &readers, &stdin_task).await;
                return Ok(ExecutionResult::timed_out());
            }
        };

        match stdin_task.await {
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                debug!("Interpreter closed stdin before reading the whole script");
            }
            Ok(Err(e)) => warn!(error = %e, "Failed to write script to interpreter"),
            Ok(Ok(())) => {}
            Err(e) => warn!(error = %e, "Stdin writer task failed"),
        }

        let exit_code = status.code().unwrap_or(-1);

        debug!(
            exit_code = exit_code,
            stdout_len = stdout.len(),
            stderr_len = stderr.len(),
            "Snippet completed"
        );

        Ok(ExecutionResult {
            stdout,
            stderr,
            exit_code,
            timed_out: false,
            truncated: stdout_truncated || stderr_truncated,
        })
    }

    /// Execute and fold every outcome into the page body. Never fails.
    pub async fn render(&self, snippet: &str, request: Option<&SimulatedRequest>) -> String {
        let outcome = self.execute(snippet, request).await;
        render_outcome(outcome, self.policy.timeout_seconds())
    }
}

/// Kill and reap the interpreter and cancel its I/O tasks.
async fn stop(
    child: &mut tokio::process::Child,
    readers: &[tokio::task::AbortHandle],
    stdin_task: &tokio::task::JoinHandle<std::io::Result<()>>,
) {
    // Fails harmlessly when the interpreter was already reaped
    if let Err(e) = child.kill().await {
        debug!(error = %e, "Interpreter already gone");
    }
    for reader in readers {
        reader.abort();
    }
    stdin_task.abort();
}

/// SIGKILL every process left in the interpreter's group.
#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    let Some(pid) = pid else {
        return;
    };
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        return;
    };

    // SAFETY: killpg only sends a signal; the group was created for this child
    let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if rc != 0 {
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ESRCH) {
            warn!(pgid, error = %err, "Failed to kill interpreter process group");
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}

async fn join_reader(
    task: tokio::task::JoinHandle<std::io::Result<(Vec<u8>, bool)>>,
) -> Result<(String, bool)> {
    let (bytes, truncated) = task
        .await
        .map_err(|e| VulnCasesError::SandboxExecution(format!("Output reader failed: {}", e)))??;
    Ok((String::from_utf8_lossy(&bytes).into_owned(), truncated))
}

/// Read a stream to EOF keeping at most `limit` bytes. The rest is drained so
/// the child never blocks on a full pipe.
async fn read_capped<R>(reader: Option<R>, limit: usize) -> std::io::Result<(Vec<u8>, bool)>
where
    R: AsyncRead + Unpin,
{
    let Some(mut reader) = reader else {
        return Ok((Vec::new(), false));
    };

    let mut captured = Vec::new();
    let mut truncated = false;
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        let room = limit.saturating_sub(captured.len());
        if n > room {
            captured.extend_from_slice(&chunk[..room]);
            truncated = true;
        } else {
            captured.extend_from_slice(&chunk[..n]);
        }
    }

    Ok((captured, truncated))
}
