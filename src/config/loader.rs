use std::path::{Path, PathBuf};

use crate::config::types::VulnCasesConfig;
use crate::error::{Result, VulnCasesError};

/// Get the default configuration file path
pub fn get_config_path() -> PathBuf {
    if let Some(proj_dirs) = directories::ProjectDirs::from("com", "vulncases", "vulncases") {
        proj_dirs.config_dir().join("config.toml")
    } else {
        // Fallback to home directory
        dirs_fallback().join(".vulncases").join("config.toml")
    }
}

fn dirs_fallback() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Load configuration from file, with defaults for missing values
pub fn load_config(config_path: Option<&Path>) -> Result<VulnCasesConfig> {
    let path = config_path
        .map(PathBuf::from)
        .unwrap_or_else(get_config_path);

    if !path.exists() {
        // Return defaults if no config file exists
        return Ok(VulnCasesConfig::default());
    }

    let content = std::fs::read_to_string(&path)?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<VulnCasesConfig> {
    let config: VulnCasesConfig =
        toml::from_str(content).map_err(|e| VulnCasesError::TomlParse(e.to_string()))?;

    if config.sandbox.timeout_seconds == 0 {
        return Err(VulnCasesError::Config(
            "sandbox.timeout_seconds must be greater than zero".to_string(),
        ));
    }
    if config.sandbox.memory_limit_mb == 0 {
        return Err(VulnCasesError::Config(
            "sandbox.memory_limit_mb must be greater than zero".to_string(),
        ));
    }

    Ok(config)
}

/// Write the default configuration to `path`, creating parent directories.
pub fn write_default_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(VulnCasesError::ConfigExists {
            path: path.display().to_string(),
        });
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = toml::to_string_pretty(&VulnCasesConfig::default())
        .map_err(|e| VulnCasesError::Config(e.to_string()))?;
    std::fs::write(path, content)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config.sandbox.timeout_seconds, 10);
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let err = parse_config("[sandbox]\ntimeout_seconds = 0\n").unwrap_err();
        assert!(matches!(err, VulnCasesError::Config(_)));
    }

    #[test]
    fn test_bad_toml() {
        let err = parse_config("[sandbox\n").unwrap_err();
        assert!(matches!(err, VulnCasesError::TomlParse(_)));
    }

    #[test]
    fn test_write_default_config_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        write_default_config(&path, false).unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.sandbox.memory_limit_mb, 64);

        let err = write_default_config(&path, false).unwrap_err();
        assert!(matches!(err, VulnCasesError::ConfigExists { .. }));
        write_default_config(&path, true).unwrap();
    }
}
