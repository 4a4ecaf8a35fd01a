use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};

use crate::cases::Case;
use crate::error::{Result, VulnCasesError};

/// Read-only access to the case catalog on disk.
///
/// Categories are the immediate subdirectories of the root and act as the
/// allow-list for lookups.
#[derive(Debug, Clone)]
pub struct CaseStore {
    root: PathBuf,
}

impl CaseStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Sorted category names.
    pub async fn categories(&self) -> Result<Vec<String>> {
        let mut categories = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => categories.push(name),
                Err(name) => warn!(name = ?name, "Skipping non UTF-8 category directory"),
            }
        }

        categories.sort();
        Ok(categories)
    }

    /// Load `<category>/<slug>.json`.
    pub async fn load(&self, category: &str, slug: &str) -> Result<Case> {
        if !self.categories().await?.iter().any(|c| c == category) {
            return Err(VulnCasesError::UnknownCategory {
                category: category.to_string(),
            });
        }
        validate_slug(slug)?;

        let path = self.root.join(category).join(format!("{}.json", slug));
        debug!(path = %path.display(), "Loading case");

        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(VulnCasesError::CaseNotFound {
                    category: category.to_string(),
                    slug: slug.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let mut case: Case = serde_json::from_str(&content)?;
        case.slug = slug.to_string();
        if case.category.is_empty() {
            case.category = category.to_string();
        }

        Ok(case)
    }
}

/// A slug names a single file inside its category directory.
fn validate_slug(slug: &str) -> Result<()> {
    let invalid = slug.is_empty()
        || slug.starts_with('.')
        || slug.contains(['/', '\\', '\0'])
        || slug.contains("..");

    if invalid {
        return Err(VulnCasesError::InvalidSlug {
            slug: slug.to_string(),
        });
    }
    Ok(())
}
