//! Input validation utilities

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use super::error::{AppError, AppResult};

/// Calendar dates accepted by the date filters
static DATE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap()
});

/// Table and column identifiers in the remote store
static IDENTIFIER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").unwrap()
});

/// Parse a `YYYY-MM-DD` filter date, rejecting anything else at entry.
pub fn parse_date_input(input: &str) -> AppResult<NaiveDate> {
    let trimmed = input.trim();
    if !DATE_REGEX.is_match(trimmed) {
        return Err(AppError::invalid_filter(format!(
            "expected a YYYY-MM-DD date, got '{}'",
            input
        )));
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map_err(|e| {
        AppError::invalid_filter(format!("'{}' is not a calendar date: {}", input, e))
    })
}

/// Validate an action tag used by the action filter. Custom tags are
/// entity specific, so any case or punctuation is accepted.
pub fn validate_action_tag(tag: &str) -> bool {
    !tag.is_empty() && !tag.chars().any(char::is_control)
}

/// Validate a table or column identifier
pub fn validate_identifier(name: &str) -> bool {
    !name.is_empty() && name.len() <= 63 && IDENTIFIER_REGEX.is_match(name)
}
