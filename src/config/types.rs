use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VulnCasesConfig {
    pub cases: CasesConfig,
    pub sandbox: SandboxConfig,
}

/// Where the case catalog lives on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CasesConfig {
    /// Root directory holding one subdirectory per category.
    /// Also the confinement root for executed snippets.
    pub root: PathBuf,
}

impl Default for CasesConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("cases"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Interpreter binary name or absolute path
    pub interpreter: String,
    /// Wall-clock limit in seconds (interpreter and external wait)
    pub timeout_seconds: u64,
    /// Interpreter memory limit in MB
    pub memory_limit_mb: u64,
    /// Ceiling on captured bytes per output stream
    pub max_output_bytes: usize,
    /// Functions disabled on top of the built-in list
    pub extra_disabled_functions: Vec<String>,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            interpreter: "php".to_string(),
            timeout_seconds: 10,
            memory_limit_mb: 64,
            max_output_bytes: 1024 * 1024,
            extra_disabled_functions: Vec::new(),
        }
    }
}
