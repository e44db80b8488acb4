//! Cleanup of generated SQL.

/// Remove a Markdown code fence around a generated statement.
///
/// Accepts a plain triple-backtick fence or one tagged `sql`; text without a
/// leading fence is only trimmed.
#[must_use]
pub fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };

    let rest = match rest.get(..3) {
        Some(tag) if tag.eq_ignore_ascii_case("sql") => &rest[3..],
        _ => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
