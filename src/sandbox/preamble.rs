//! Source generation for the simulated request.
//!
//! Request values are untrusted and end up inside PHP source, so every one of
//! them goes through [`php_string_literal`] and nothing is interpolated raw.

use crate::sandbox::SimulatedRequest;

/// `&`-joined `key=value` pairs in insertion order, as the HTTP layer saw them.
pub fn query_string(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&")
}

/// Encode `value` as a single-quoted PHP string literal.
///
/// Inside single quotes PHP only recognises `\\` and `\'`; there is no
/// variable interpolation and no other escape sequence, so escaping those two
/// characters is enough to keep any input inside the literal.
pub fn php_string_literal(value: &str) -> String {
    let mut literal = String::with_capacity(value.len() + 2);
    literal.push('\'');
    for c in value.chars() {
        match c {
            '\\' => literal.push_str("\\\\"),
            '\'' => literal.push_str("\\'"),
            _ => literal.push(c),
        }
    }
    literal.push('\'');
    literal
}

/// The full script fed to the interpreter on stdin.
///
/// Without a request the snippet runs verbatim. With one, a PHP block that
/// populates `$_GET` and `$_SERVER` runs first. The closing `?>\n` swallows its
/// own newline, so the preamble adds nothing to the output.
pub fn build_script(snippet: &str, request: Option<&SimulatedRequest>) -> String {
    let Some(request) = request else {
        return snippet.to_string();
    };

    let mut script = String::from("<?php\n");
    for (key, value) in &request.params {
        script.push_str(&format!(
            "$_GET[{}] = {};\n",
            php_string_literal(key),
            php_string_literal(value)
        ));
    }
    script.push_str(&format!(
        "$_SERVER['QUERY_STRING'] = {};\n",
        php_string_literal(&request.query_string())
    ));
    script.push_str(&format!(
        "$_SERVER['REQUEST_METHOD'] = {};\n",
        php_string_literal(&request.method)
    ));
    script.push_str("?>\n");
    script.push_str(snippet);
    script
}
