use std::path::{Path, PathBuf, MAIN_SEPARATOR};
use std::time::Duration;

use crate::config::types::{CasesConfig, SandboxConfig};
use crate::error::{Result, VulnCasesError};

/// Functions the interpreter refuses to call: process spawning and control,
/// shell access, network transfer, config parsing and source disclosure.
pub const DISABLED_FUNCTIONS: &[&str] = &[
    "exec",
    "passthru",
    "shell_exec",
    "system",
    "proc_open",
    "popen",
    "pcntl_exec",
    "pcntl_fork",
    "pcntl_signal",
    "pcntl_alarm",
    "posix_kill",
    "posix_setsid",
    "posix_setpgid",
    "proc_nice",
    "proc_terminate",
    "curl_exec",
    "curl_multi_exec",
    "parse_ini_file",
    "show_source",
    "highlight_file",
];

/// Fixed restrictions applied to every snippet run.
#[derive(Debug, Clone)]
pub struct SandboxPolicy {
    /// Interpreter binary name (looked up on PATH) or absolute path
    pub interpreter: String,
    /// The only subtree the interpreter may touch; also its working directory
    pub confinement_root: PathBuf,
    /// Enforced by the interpreter and again on the external wait
    pub timeout: Duration,
    pub memory_limit_mb: u64,
    /// Per-stream capture ceiling
    pub max_output_bytes: usize,
    pub disabled_functions: Vec<String>,
}

impl SandboxPolicy {
    pub fn new(confinement_root: impl Into<PathBuf>) -> Self {
        let defaults = SandboxConfig::default();
        Self {
            interpreter: defaults.interpreter,
            confinement_root: confinement_root.into(),
            timeout: Duration::from_secs(defaults.timeout_seconds),
            memory_limit_mb: defaults.memory_limit_mb,
            max_output_bytes: defaults.max_output_bytes,
            disabled_functions: DISABLED_FUNCTIONS.iter().map(|f| f.to_string()).collect(),
        }
    }

    /// Build the policy from configuration. The cases root must exist; it is
    /// canonicalized so the confinement path is absolute.
    pub fn from_config(cases: &CasesConfig, sandbox: &SandboxConfig) -> Result<Self> {
        let root = canonical_root(&cases.root)?;

        let mut policy = Self::new(root);
        policy.interpreter = sandbox.interpreter.clone();
        policy.timeout = Duration::from_secs(sandbox.timeout_seconds);
        policy.memory_limit_mb = sandbox.memory_limit_mb;
        policy.max_output_bytes = sandbox.max_output_bytes;
        for extra in &sandbox.extra_disabled_functions {
            if !policy.disabled_functions.iter().any(|f| f == extra) {
                policy.disabled_functions.push(extra.clone());
            }
        }

        Ok(policy)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout_seconds(&self) -> u64 {
        self.timeout.as_secs().max(1)
    }

    /// Interpreter arguments, one `-d` setting each. The script itself is
    /// never part of the argument list; it arrives on stdin.
    pub fn interpreter_args(&self) -> Vec<String> {
        let settings = [
            format!("disable_functions={}", self.disabled_functions.join(",")),
            "allow_url_fopen=Off".to_string(),
            "allow_url_include=Off".to_string(),
            format!("open_basedir={}", self.open_basedir()),
            format!("max_execution_time={}", self.timeout_seconds()),
            format!("memory_limit={}M", self.memory_limit_mb),
            "display_errors=stderr".to_string(),
            "log_errors=Off".to_string(),
        ];

        settings
            .into_iter()
            .flat_map(|setting| ["-d".to_string(), setting])
            .collect()
    }

    /// open_basedir treats its value as a prefix; the trailing separator
    /// stops `/srv/cases` from also matching `/srv/cases-private`.
    fn open_basedir(&self) -> String {
        let root = self.confinement_root.display().to_string();
        if root.ends_with(MAIN_SEPARATOR) {
            root
        } else {
            format!("{}{}", root, MAIN_SEPARATOR)
        }
    }
}

fn canonical_root(root: &Path) -> Result<PathBuf> {
    root.canonicalize().map_err(|e| {
        VulnCasesError::Config(format!(
            "Cases root {} is not accessible: {}",
            root.display(),
            e
        ))
    })
}
