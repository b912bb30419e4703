use chrono::{Datelike, Utc};

use crate::error::InputError;

/// Chess.com opened its game archive in 2007; nothing earlier exists.
pub const MIN_YEAR: i32 = 2007;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub username: String,
    pub year: i32,
    pub months: Vec<u32>,
    pub clear_cache: bool,
}

/// Validates raw form/CLI text. Months are comma, semicolon or space
/// separated; duplicates collapse and the result is sorted.
pub fn parse_run_request(
    username: &str,
    year: &str,
    months: &str,
    clear_cache: bool,
) -> Result<RunRequest, InputError> {
    let max_year = Utc::now().year();
    Ok(RunRequest {
        username: parse_username(username)?,
        year: parse_year(year, max_year)?,
        months: parse_months(months)?,
        clear_cache,
    })
}

pub fn parse_username(raw: &str) -> Result<String, InputError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(InputError::EmptyUsername);
    }
    let valid = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !valid {
        return Err(InputError::InvalidUsername(name.to_string()));
    }
    Ok(name.to_string())
}

pub fn parse_year(raw: &str, max_year: i32) -> Result<i32, InputError> {
    let trimmed = raw.trim();
    let year = trimmed
        .parse::<i32>()
        .map_err(|_| InputError::YearNotNumeric(trimmed.to_string()))?;
    if !(MIN_YEAR..=max_year).contains(&year) {
        return Err(InputError::YearOutOfRange {
            year,
            min: MIN_YEAR,
            max: max_year,
        });
    }
    Ok(year)
}

pub fn parse_months(raw: &str) -> Result<Vec<u32>, InputError> {
    let mut months = Vec::new();
    for part in raw.split([',', ';', ' ']) {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let month = part
            .parse::<u32>()
            .map_err(|_| InputError::MonthNotNumeric(part.to_string()))?;
        if !(1..=12).contains(&month) {
            return Err(InputError::MonthOutOfRange(month));
        }
        months.push(month);
    }
    months.sort_unstable();
    months.dedup();
    if months.is_empty() {
        return Err(InputError::NoMonths);
    }
    Ok(months)
}
