use std::path::PathBuf;

use thiserror::Error;

/// Rejected form or CLI input. The pipeline never runs when one of these is
/// returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("username is required")]
    EmptyUsername,

    #[error("username {0:?} contains invalid characters")]
    InvalidUsername(String),

    #[error("year {0:?} is not a number")]
    YearNotNumeric(String),

    #[error("year {year} is out of range ({min}..={max})")]
    YearOutOfRange { year: i32, min: i32, max: i32 },

    #[error("month {0:?} is not a number")]
    MonthNotNumeric(String),

    #[error("month {0} is out of range (1..=12)")]
    MonthOutOfRange(u32),

    #[error("at least one month is required")]
    NoMonths,
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("failed to write cache {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize cache: {0}")]
    Serialize(#[from] serde_json::Error),
}
