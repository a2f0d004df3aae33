//! SQL utility functions

/// Escape SQL LIKE metacharacters (%, _, \) in user input
///
/// # Example
///
/// ```
/// use qatrack_server::utils::sql::escape_like_pattern;
///
/// let pattern = format!("%{}%", escape_like_pattern("login_page 100%"));
/// assert_eq!(pattern, "%login\\_page 100\\%%");
/// ```
pub fn escape_like_pattern(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// `%term%` pattern for a case-insensitive substring search
pub fn contains_pattern(term: &str) -> String {
    format!("%{}%", escape_like_pattern(term.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like_pattern_plain() {
        assert_eq!(escape_like_pattern("crash"), "crash");
    }

    #[test]
    fn test_escape_like_pattern_metacharacters() {
        assert_eq!(escape_like_pattern("100%_\\x"), "100\\%\\_\\\\x");
    }

    #[test]
    fn test_contains_pattern_trims_and_wraps() {
        assert_eq!(contains_pattern("  null_ptr "), "%null\\_ptr%");
        assert_eq!(contains_pattern(""), "%%");
    }
}
