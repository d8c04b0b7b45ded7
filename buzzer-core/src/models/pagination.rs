//! Limit/offset pagination for commentary feeds

use serde::{Deserialize, Deserializer};

/// Default and maximum items per page
pub const DEFAULT_PAGE_LIMIT: u32 = 50;

/// Resolved pagination window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Items per page (1..=page limit)
    pub limit: u32,
    /// Items to skip
    pub offset: u32,
}

impl Page {
    /// Resolve caller-supplied values against the server's page limit.
    ///
    /// - Missing or zero limit means the page limit
    /// - Larger requests are clamped down to the page limit
    /// - Missing offset means 0
    pub fn resolve(limit: Option<u32>, offset: Option<u32>, page_limit: u32) -> Self {
        let page_limit = page_limit.max(1);
        let limit = limit
            .filter(|l| *l > 0)
            .unwrap_or(page_limit)
            .min(page_limit);

        Self {
            limit,
            offset: offset.unwrap_or(0),
        }
    }

    /// Get LIMIT value.
    pub fn limit(&self) -> i64 {
        i64::from(self.limit)
    }

    /// Get OFFSET value.
    pub fn offset(&self) -> i64 {
        i64::from(self.offset)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
        }
    }
}

/// Query parameters for pagination
///
/// Values are read leniently: leading digits are taken, values past `u32`
/// saturate (and are then clamped by [`Page::resolve`]), and negative or
/// non-numeric values count as missing.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    #[serde(default, deserialize_with = "lenient_count")]
    pub limit: Option<u32>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub offset: Option<u32>,
}

/// Parse a non-negative count from a query value.
pub fn parse_count(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    let digits = raw.strip_prefix('+').unwrap_or(raw);
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let digits = &digits[..end];
    if digits.is_empty() {
        return None;
    }

    // Every digit string that fails to parse here is too large
    Some(digits.parse::<u32>().unwrap_or(u32::MAX))
}

fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_missing() {
        let p = Page::resolve(None, None, 50);
        assert_eq!(p, Page { limit: 50, offset: 0 });
    }

    #[test]
    fn zero_limit_means_default() {
        let p = Page::resolve(Some(0), Some(10), 50);
        assert_eq!(p.limit, 50);
        assert_eq!(p.offset, 10);
    }

    #[test]
    fn clamps_to_page_limit() {
        let p = Page::resolve(Some(10_000), None, 50);
        assert_eq!(p.limit, 50);

        let p = Page::resolve(Some(20), None, 50);
        assert_eq!(p.limit, 20);
    }

    #[test]
    fn zero_page_limit_is_one() {
        let p = Page::resolve(Some(5), None, 0);
        assert_eq!(p.limit, 1);
    }

    #[test]
    fn query_counts_are_lenient() {
        assert_eq!(parse_count("25"), Some(25));
        assert_eq!(parse_count(" 7 "), Some(7));
        assert_eq!(parse_count("12abc"), Some(12));
        assert_eq!(parse_count("5000000000"), Some(u32::MAX));
        assert_eq!(parse_count("99999999999999999999999"), Some(u32::MAX));
        assert_eq!(parse_count("-1"), None);
        assert_eq!(parse_count("abc"), None);
        assert_eq!(parse_count(""), None);
    }

    #[test]
    fn oversized_query_limit_clamps() {
        let limit = parse_count("5000000000");
        assert_eq!(Page::resolve(limit, None, 50).limit, 50);

        let limit = parse_count("-1");
        assert_eq!(Page::resolve(limit, None, 50).limit, 50);
    }

    #[test]
    fn sql_values() {
        let p = Page::resolve(Some(25), Some(75), 50);
        assert_eq!(p.limit(), 25);
        assert_eq!(p.offset(), 75);
    }
}
