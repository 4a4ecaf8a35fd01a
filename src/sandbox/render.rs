use tracing::{error, info};

use crate::error::Result;
use crate::sandbox::ExecutionResult;

const STDOUT_PREVIEW_CHARS: usize = 200;

/// Fold an execution outcome into the text the case page embeds.
///
/// Successful output is returned verbatim; snippets are allowed to emit
/// markup. Failures become an inline error block with the interpreter's
/// diagnostics escaped.
pub fn render_outcome(outcome: Result<ExecutionResult>, timeout_seconds: u64) -> String {
    match outcome {
        Ok(result) if result.timed_out => {
            error!(timeout_seconds, "PHP execution timeout");
            format!(
                "<div class='error'>PHP execution timeout ({} seconds)</div>",
                timeout_seconds
            )
        }
        Ok(result) => {
            info!(
                exit_code = result.exit_code,
                truncated = result.truncated,
                stdout = %preview(&result.stdout),
                "PHP execution result"
            );
            if !result.stderr.is_empty() {
                info!(stderr = %result.stderr, "PHP stderr");
            }

            if result.exit_code != 0 {
                error!(exit_code = result.exit_code, stderr = %result.stderr, "PHP execution error");
                return format!(
                    "<div class='error'>PHP execution error: {}</div>",
                    escape_html(&result.stderr)
                );
            }

            result.stdout
        }
        Err(e) => {
            error!(error = %e, "PHP execution unexpected error");
            format!(
                "<div class='error'>PHP execution error: {}</div>",
                escape_html(&e.to_string())
            )
        }
    }
}

/// Minimal escaping for text placed inside an HTML element.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn preview(text: &str) -> String {
    match text.char_indices().nth(STDOUT_PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
