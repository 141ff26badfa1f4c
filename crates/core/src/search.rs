//! Search and pagination helpers shared by the list endpoints.
//!
//! Lives in `core` so repositories and handlers agree on the same limits and
//! on how user input is turned into `ILIKE` patterns.

// ---------------------------------------------------------------------------
// Pagination defaults
// ---------------------------------------------------------------------------

/// Default page size when `?limit=` is absent.
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Upper bound for `?limit=`.
pub const MAX_PAGE_SIZE: i64 = 100;

/// Clamp a user-provided limit to valid bounds.
pub fn clamp_limit(limit: Option<i64>, default: i64, max: i64) -> i64 {
    limit.unwrap_or(default).max(1).min(max)
}

/// Clamp a user-provided offset to non-negative.
pub fn clamp_offset(offset: Option<i64>) -> i64 {
    offset.unwrap_or(0).max(0)
}

/// Clamp a 1-based page number.
pub fn clamp_page(page: Option<i64>) -> i64 {
    page.unwrap_or(1).max(1)
}

/// Row offset of the first item on `page` (1-based).
pub fn page_offset(page: i64, limit: i64) -> i64 {
    (page.max(1) - 1).saturating_mul(limit)
}

/// Relative `next` / `previous` links for a page.
///
/// `extra` carries the other query parameters (search, filters) so they
/// survive navigation. Returns `(next, previous)`.
pub fn page_links(
    path: &str,
    page: i64,
    limit: i64,
    total: i64,
    extra: &[(&str, String)],
) -> (Option<String>, Option<String>) {
    let link = |target: i64| {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in extra {
            query.append_pair(key, value);
        }
        query.append_pair("limit", &limit.to_string());
        query.append_pair("page", &target.to_string());
        format!("{path}?{}", query.finish())
    };

    let next = (page_offset(page, limit).saturating_add(limit) < total)
        .then(|| link(page.saturating_add(1)));
    let previous = (page > 1).then(|| link(page - 1));
    (next, previous)
}

// ---------------------------------------------------------------------------
// Substring search
// ---------------------------------------------------------------------------

/// Normalize a `?search=` value. Blank input means "no search".
pub fn normalize_search(search: Option<&str>) -> Option<String> {
    search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Escape `ILIKE` metacharacters so user input only ever matches literally.
///
/// ```
/// use intake_core::search::escape_like;
/// assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
/// ```
pub fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Build a case-insensitive "contains" pattern for `ILIKE`.
pub fn contains_pattern(input: &str) -> String {
    format!("%{}%", escape_like(input))
}

/// `(a ILIKE $n OR b ILIKE $n ...)` over the given columns, all bound to the
/// same placeholder.
pub fn ilike_any(columns: &[&str], placeholder: usize) -> String {
    let parts: Vec<String> = columns
        .iter()
        .map(|c| format!("{c} ILIKE ${placeholder}"))
        .collect();
    format!("({})", parts.join(" OR "))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- clamp_limit ---------------------------------------------------------

    #[test]
    fn clamp_limit_uses_default_when_none() {
        assert_eq!(clamp_limit(None, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE), 10);
    }

    #[test]
    fn clamp_limit_respects_max() {
        assert_eq!(clamp_limit(Some(500), DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE), 100);
    }

    #[test]
    fn clamp_limit_floors_at_one() {
        assert_eq!(clamp_limit(Some(-5), 10, 100), 1);
        assert_eq!(clamp_limit(Some(0), 10, 100), 1);
    }

    // -- pages ---------------------------------------------------------------

    #[test]
    fn clamp_page_floors_at_one() {
        assert_eq!(clamp_page(None), 1);
        assert_eq!(clamp_page(Some(-3)), 1);
        assert_eq!(clamp_page(Some(4)), 4);
    }

    #[test]
    fn clamp_offset_floors_at_zero() {
        assert_eq!(clamp_offset(Some(-10)), 0);
        assert_eq!(clamp_offset(None), 0);
    }

    #[test]
    fn page_offset_is_zero_based() {
        assert_eq!(page_offset(1, 10), 0);
        assert_eq!(page_offset(3, 25), 50);
    }

    #[test]
    fn first_page_has_only_next() {
        let (next, prev) = page_links("/api/roles", 1, 10, 25, &[]);
        assert_eq!(next.as_deref(), Some("/api/roles?limit=10&page=2"));
        assert!(prev.is_none());
    }

    #[test]
    fn last_page_has_only_previous() {
        let (next, prev) = page_links("/api/roles", 3, 10, 25, &[]);
        assert!(next.is_none());
        assert_eq!(prev.as_deref(), Some("/api/roles?limit=10&page=2"));
    }

    #[test]
    fn links_keep_search_parameters() {
        let extra = [("search", "ada lovelace".to_string())];
        let (next, _) = page_links("/auth/users", 1, 1, 2, &extra);
        assert_eq!(
            next.as_deref(),
            Some("/auth/users?search=ada+lovelace&limit=1&page=2")
        );
    }

    #[test]
    fn exact_fit_has_no_next() {
        let (next, _) = page_links("/x", 2, 10, 20, &[]);
        assert!(next.is_none());
    }

    #[test]
    fn huge_page_does_not_overflow() {
        let page = clamp_page(Some(i64::MAX));
        let (next, prev) = page_links("/api/roles", page, 10, 25, &[]);
        assert!(next.is_none());
        assert_eq!(
            prev.as_deref(),
            Some(format!("/api/roles?limit=10&page={}", i64::MAX - 1).as_str())
        );
    }

    // -- search --------------------------------------------------------------

    #[test]
    fn blank_search_is_none() {
        assert_eq!(normalize_search(Some("   ")), None);
        assert_eq!(normalize_search(None), None);
        assert_eq!(normalize_search(Some(" ada ")), Some("ada".into()));
    }

    #[test]
    fn contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("a_b"), "%a\\_b%");
        assert_eq!(contains_pattern("plain"), "%plain%");
    }

    #[test]
    fn ilike_any_or_combines_columns() {
        assert_eq!(
            ilike_any(&["first_name", "email"], 1),
            "(first_name ILIKE $1 OR email ILIKE $1)"
        );
    }
}
