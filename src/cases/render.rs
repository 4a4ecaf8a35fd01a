use tracing::{error, info};

use crate::cases::{Case, CaseKind};
use crate::error::{Result, VulnCasesError};
use crate::sandbox::{SimulatedRequest, SnippetExecutor};

/// Produce the body text for a case page.
///
/// `executor` carries the error from building it when the interpreter is
/// unavailable on this host; static cases still render, snippet cases fail
/// with that reason.
pub async fn render_case(
    case: &Case,
    request: &SimulatedRequest,
    executor: std::result::Result<&SnippetExecutor, &VulnCasesError>,
) -> Result<String> {
    info!(category = %case.category, slug = %case.slug, kind = ?case.kind, "Rendering case");

    match case.kind {
        CaseKind::Html => Ok(case.body.clone().unwrap_or_default()),
        CaseKind::Php => {
            let snippet = case.php.as_deref().filter(|s| !s.trim().is_empty());
            let Some(snippet) = snippet else {
                error!(category = %case.category, slug = %case.slug, "PHP code not specified in PHP case");
                return Err(VulnCasesError::MissingSnippet {
                    category: case.category.clone(),
                    slug: case.slug.clone(),
                });
            };

            let executor = executor.map_err(|e| VulnCasesError::SnippetsUnavailable {
                reason: e.to_string(),
            })?;

            Ok(executor.render(snippet, Some(request)).await)
        }
    }
}
