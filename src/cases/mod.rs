mod render;
mod store;

pub use render::render_case;
pub use store::CaseStore;

use serde::{Deserialize, Serialize};

/// How a case produces its page body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CaseKind {
    /// Static markup stored in `body`
    #[default]
    Html,
    /// A PHP snippet stored in `php`, executed per request
    Php,
}

impl From<String> for CaseKind {
    fn from(value: String) -> Self {
        // Anything that is not a snippet case is served as static markup
        if value.eq_ignore_ascii_case("php") {
            CaseKind::Php
        } else {
            CaseKind::Html
        }
    }
}

impl From<CaseKind> for String {
    fn from(kind: CaseKind) -> Self {
        match kind {
            CaseKind::Html => "html".to_string(),
            CaseKind::Php => "php".to_string(),
        }
    }
}

/// A training case as stored in `<root>/<category>/<slug>.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Case {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_description")]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default = "not_specified")]
    pub difficulty: String,
    #[serde(default = "not_specified")]
    pub risk: String,
    #[serde(default)]
    pub objectives: Vec<String>,
    #[serde(default)]
    pub hints: Vec<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: CaseKind,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub php: Option<String>,
    /// File stem; set by the store, not read from the document
    #[serde(default)]
    pub slug: String,
    /// Fields the store does not interpret, kept for the page template
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_title() -> String {
    "Untitled".to_string()
}

fn default_description() -> String {
    "No description available".to_string()
}

fn not_specified() -> String {
    "Not specified".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_for_sparse_case() {
        let case: Case = serde_json::from_str(r#"{"body": "<p>hi</p>"}"#).unwrap();
        assert_eq!(case.title, "Untitled");
        assert_eq!(case.description, "No description available");
        assert_eq!(case.difficulty, "Not specified");
        assert_eq!(case.risk, "Not specified");
        assert_eq!(case.kind, CaseKind::Html);
        assert!(case.objectives.is_empty());
        assert!(case.extra.is_empty());
    }

    #[test]
    fn test_php_case_and_extra_fields() {
        let case: Case = serde_json::from_str(
            r#"{
                "title": "Reflected XSS",
                "type": "PHP",
                "php": "<?php echo $_GET['q'];",
                "references": ["https://owasp.org"]
            }"#,
        )
        .unwrap();
        assert_eq!(case.kind, CaseKind::Php);
        assert_eq!(case.php.as_deref(), Some("<?php echo $_GET['q'];"));
        assert!(case.extra.contains_key("references"));

        let value = serde_json::to_value(&case).unwrap();
        assert_eq!(value["type"], "php");
        assert_eq!(value["references"][0], "https://owasp.org");
    }

    #[test]
    fn test_unknown_kind_is_html() {
        let case: Case = serde_json::from_str(r#"{"type": "markdown"}"#).unwrap();
        assert_eq!(case.kind, CaseKind::Html);
    }
}
