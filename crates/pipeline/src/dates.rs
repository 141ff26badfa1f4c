//! Lenient date parsing for dates pulled out of fax text.

use chrono::NaiveDate;

/// Formats tried in order. `%m/%d/%y` precedes `%m/%d/%Y` because a
/// four-digit year leaves trailing input under `%y` and fails cleanly.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%y", "%m/%d/%Y", "%d-%m-%Y"];

/// Parse a date in any of the accepted formats. Blank or unparseable input
/// yields `None`.
pub fn parse_date_safe(input: &str) -> Option<NaiveDate> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
}

/// [`parse_date_safe`] rendered as `YYYY-MM-DD`.
pub fn normalize_date(input: &str) -> Option<String> {
    parse_date_safe(input).map(|d| d.format("%Y-%m-%d").to_string())
}
