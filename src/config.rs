use std::path::PathBuf;
use std::time::Duration;

const APP_DIR: &str = "chess_recap";
const DEFAULT_API_BASE: &str = "https://api.chess.com/pub";
// The archive endpoints reject requests without a browser-like agent.
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; chess_recap)";

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub api_base: String,
    pub user_agent: String,
    pub request_timeout: Duration,
    pub delay: Duration,
    pub retries: u32,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout: Duration::from_secs(10),
            delay: Duration::from_millis(200),
            retries: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportConfig {
    pub min_opening_games: usize,
    pub min_country_games: usize,
    pub top_openings: usize,
    pub top_opponents: usize,
    pub top_countries: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            min_opening_games: 10,
            min_country_games: 10,
            top_openings: 3,
            top_opponents: 5,
            top_countries: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

/// Presentation knobs for the terminal form. Every front-end variant is one
/// of these, not a separate screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayOptions {
    pub theme: Theme,
    pub title: String,
    pub show_clear_cache: bool,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            theme: Theme::Dark,
            title: "Chess.com Game Analyzer".to_string(),
            show_clear_cache: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub export_dir: PathBuf,
    pub fetch: FetchConfig,
    pub report: ReportConfig,
    pub display: DisplayOptions,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = FetchConfig::default();
        let fetch = FetchConfig {
            api_base: env_string("CHESS_API_BASE")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base),
            user_agent: env_string("CHESS_USER_AGENT").unwrap_or(defaults.user_agent),
            request_timeout: Duration::from_secs(env_parse("REQUEST_TIMEOUT_SECS", 10u64).max(1)),
            delay: Duration::from_millis(env_parse("FETCH_DELAY_MS", 200u64)),
            retries: env_parse("FETCH_RETRIES", 2u32),
        };

        let base = ReportConfig::default();
        let report = ReportConfig {
            min_opening_games: env_parse("MIN_OPENING_GAMES", base.min_opening_games),
            min_country_games: env_parse("MIN_COUNTRY_GAMES", base.min_country_games),
            top_openings: env_parse("TOP_OPENINGS", base.top_openings),
            top_opponents: env_parse("TOP_OPPONENTS", base.top_opponents),
            top_countries: env_parse("TOP_COUNTRIES", base.top_countries),
        };

        let mut display = DisplayOptions::default();
        if let Some(theme) = env_string("RECAP_THEME") {
            display.theme = if theme.eq_ignore_ascii_case("light") {
                Theme::Light
            } else {
                Theme::Dark
            };
        }
        if let Some(title) = env_string("RECAP_TITLE") {
            display.title = title;
        }
        if let Some(flag) = env_string("RECAP_SHOW_CLEAR_CACHE") {
            display.show_clear_cache = parse_bool(&flag).unwrap_or(true);
        }

        Self {
            data_dir: env_string("CHESS_RECAP_DATA_DIR")
                .map(PathBuf::from)
                .or_else(default_data_dir)
                .unwrap_or_else(|| PathBuf::from("chess_data")),
            export_dir: env_string("CHESS_RECAP_EXPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            fetch,
            report,
            display,
        }
    }

    pub fn games_dir(&self) -> PathBuf {
        self.data_dir.join("games")
    }

    pub fn country_cache_path(&self) -> PathBuf {
        self.data_dir.join("country_cache.json")
    }

    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join("chess_recap.log")
    }
}

fn default_data_dir() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("XDG_CACHE_HOME") {
        if !base.trim().is_empty() {
            return Some(PathBuf::from(base).join(APP_DIR));
        }
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(APP_DIR))
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env_string(key)
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
