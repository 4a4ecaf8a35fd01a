use thiserror::Error;

#[derive(Error, Debug)]
pub enum VulnCasesError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration file already exists: {path}")]
    ConfigExists { path: String },

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    // Sandbox errors
    #[error("Interpreter '{interpreter}' not found on PATH")]
    InterpreterNotFound { interpreter: String },

    #[error("Snippet is empty")]
    EmptySnippet,

    #[error("PHP cases unavailable: {reason}")]
    SnippetsUnavailable { reason: String },

    #[error("Snippet execution failed: {0}")]
    SandboxExecution(String),

    // Case errors
    #[error("Unknown case category: {category}")]
    UnknownCategory { category: String },

    #[error("Invalid case slug: {slug}")]
    InvalidSlug { slug: String },

    #[error("Case not found: {category}/{slug}")]
    CaseNotFound { category: String, slug: String },

    #[error("PHP case has no snippet: {category}/{slug}")]
    MissingSnippet { category: String, slug: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Generic wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl VulnCasesError {
    /// Errors that mean the request named something that does not exist,
    /// as opposed to a broken case or host.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::UnknownCategory { .. } | Self::InvalidSlug { .. } | Self::CaseNotFound { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, VulnCasesError>;
