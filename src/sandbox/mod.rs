mod executor;
mod policy;
mod preamble;
mod render;

pub use executor::SnippetExecutor;
pub use policy::{SandboxPolicy, DISABLED_FUNCTIONS};
pub use preamble::{build_script, php_string_literal, query_string};
pub use render::{escape_html, render_outcome};

use serde::{Deserialize, Serialize};

/// Result of running a snippet in the sandbox.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    /// The external wall-clock limit fired and the process was killed
    pub timed_out: bool,
    /// At least one stream exceeded the output ceiling
    pub truncated: bool,
}

impl ExecutionResult {
    pub(crate) fn timed_out() -> Self {
        Self {
            exit_code: -1,
            timed_out: true,
            ..Default::default()
        }
    }

    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == 0
    }
}

/// Fabricated HTTP request the snippet should observe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatedRequest {
    pub method: String,
    /// Query parameters in the order the client sent them
    pub params: Vec<(String, String)>,
}

impl Default for SimulatedRequest {
    fn default() -> Self {
        Self {
            method: "GET".to_string(),
            params: Vec::new(),
        }
    }
}

impl SimulatedRequest {
    pub fn new(method: impl Into<String>, params: Vec<(String, String)>) -> Self {
        let method = method.into();
        Self {
            method: if method.is_empty() {
                "GET".to_string()
            } else {
                method
            },
            params,
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn query_string(&self) -> String {
        query_string(&self.params)
    }
}
