//! List-query helpers: pagination clamping and sort parsing.
//!
//! Repositories build their `ORDER BY` clauses from the typed values here so
//! user input never reaches the SQL text directly.

/// Default page size for list endpoints.
pub const DEFAULT_LIST_LIMIT: i64 = 50;

/// Maximum page size for list endpoints.
pub const MAX_LIST_LIMIT: i64 = 200;

/// Clamp a user-provided limit to `[1, max]`, using `default` when absent.
pub fn clamp_limit(limit: Option<i64>, default: i64, max: i64) -> i64 {
    limit.unwrap_or(default).max(1).min(max)
}

/// Clamp a user-provided offset to non-negative.
pub fn clamp_offset(offset: Option<i64>) -> i64 {
    offset.unwrap_or(0).max(0)
}

/// Sort direction for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// Parse `asc`/`desc` (case-insensitive). Anything else yields the default.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::to_ascii_lowercase).as_deref() {
            Some("asc") => SortOrder::Asc,
            _ => SortOrder::Desc,
        }
    }

    /// SQL keyword including the NULL placement. NULLs always sort last so
    /// rows without a value never crowd the top of the list.
    pub fn sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC NULLS LAST",
            SortOrder::Desc => "DESC NULLS LAST",
        }
    }
}

/// Resolve a camelCase `sortBy` value against an allow-list of
/// `(api_name, sql_expression)` pairs. Unknown values fall back to the first
/// entry.
pub fn resolve_sort_column(
    sort_by: Option<&str>,
    allowed: &'static [(&'static str, &'static str)],
) -> &'static str {
    sort_by
        .and_then(|s| allowed.iter().find(|(name, _)| *name == s))
        .or_else(|| allowed.first())
        .map(|(_, column)| *column)
        .unwrap_or("id")
}

/// Parse a comma-separated id list (`"1,2, 3"`), ignoring junk entries.
pub fn parse_id_list(value: Option<&str>) -> Vec<i64> {
    value
        .map(|v| {
            v.split(',')
                .filter_map(|part| part.trim().parse::<i64>().ok())
                .collect()
        })
        .unwrap_or_default()
}

/// Wrap a search term for a case-insensitive `ILIKE` substring match,
/// escaping the pattern metacharacters in the user input.
pub fn ilike_pattern(term: &str) -> String {
    let escaped = term
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}
