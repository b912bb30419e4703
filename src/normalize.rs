use std::collections::{BTreeMap, BTreeSet, HashSet};

use anyhow::Result;
use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::archive_fetch::MonthlyArchive;
use crate::country::{CountryResolver, ProfileSource, UNKNOWN_COUNTRY, convert_code};

pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

pub const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Result codes that count as a draw. `win` is the only winning code; every
/// other code is a loss for the side that carries it.
pub const DRAW_RESULTS: [&str; 7] = [
    "draw",
    "agreed",
    "repetition",
    "stalemate",
    "insufficient",
    "50move",
    "timevsinsufficient",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Outcome {
    Win,
    Draw,
    Loss,
}

impl Outcome {
    pub fn label(self) -> &'static str {
        match self {
            Outcome::Win => "Win",
            Outcome::Draw => "Draw",
            Outcome::Loss => "Loss",
        }
    }
}

pub fn classify_result(result: &str) -> Outcome {
    if result == "win" {
        Outcome::Win
    } else if DRAW_RESULTS.contains(&result) {
        Outcome::Draw
    } else {
        Outcome::Loss
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn label(self) -> &'static str {
        match self {
            Color::White => "white",
            Color::Black => "black",
        }
    }
}

/// One game seen from the tracked player's side.
#[derive(Debug, Clone, PartialEq)]
pub struct GameRecord {
    pub timestamp: DateTime<Utc>,
    pub player_color: Color,
    pub opponent: String,
    pub opponent_rating: Option<u32>,
    pub player_rating: Option<u32>,
    pub result: String,
    pub opening: String,
    pub time_class: Option<String>,
    pub rated: Option<bool>,
    pub url: Option<String>,
    pub country_code: Option<String>,
    pub country: String,
}

impl GameRecord {
    pub fn outcome(&self) -> Outcome {
        classify_result(&self.result)
    }

    pub fn is_win(&self) -> bool {
        self.outcome() == Outcome::Win
    }

    pub fn hour(&self) -> u32 {
        self.timestamp.hour()
    }

    pub fn month(&self) -> u32 {
        self.timestamp.month()
    }

    pub fn month_name(&self) -> &'static str {
        MONTH_NAMES[self.timestamp.month0() as usize]
    }

    pub fn weekday(&self) -> Weekday {
        self.timestamp.weekday()
    }

    pub fn weekday_name(&self) -> &'static str {
        WEEKDAY_NAMES[self.timestamp.weekday().num_days_from_monday() as usize]
    }
}

/// Requested (year, months) window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    pub year: i32,
    pub months: Vec<u32>,
}

impl Window {
    pub fn new(year: i32, months: impl Into<Vec<u32>>) -> Self {
        Self {
            year,
            months: months.into(),
        }
    }

    pub fn contains(&self, ts: &DateTime<Utc>) -> bool {
        ts.year() == self.year && self.months.contains(&ts.month())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeStats {
    pub games_seen: usize,
    pub kept: usize,
    pub not_participant: usize,
    pub self_games: usize,
    pub malformed: usize,
    pub outside_window: usize,
    pub duplicates: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub records: Vec<GameRecord>,
    pub stats: NormalizeStats,
}

impl Normalized {
    pub fn opponents(&self) -> BTreeSet<&str> {
        self.records.iter().map(|r| r.opponent.as_str()).collect()
    }
}

#[derive(Debug, Deserialize)]
struct RawGame {
    white: Option<RawSide>,
    black: Option<RawSide>,
    end_time: Option<i64>,
    eco: Option<String>,
    opening: Option<String>,
    time_class: Option<String>,
    rated: Option<bool>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSide {
    username: Option<String>,
    rating: Option<u32>,
    result: Option<String>,
}

enum Parsed {
    Kept(GameRecord),
    NotParticipant,
    SelfGame,
    Malformed,
}

/// Turns raw archives into timestamp-ordered records for `tracked` inside
/// `window`. Countries are left unresolved.
pub fn normalize_archives(
    archives: &[MonthlyArchive],
    tracked: &str,
    window: &Window,
) -> Normalized {
    let tracked = tracked.trim().to_lowercase();
    let mut stats = NormalizeStats::default();
    let mut seen_urls: HashSet<String> = HashSet::new();
    let mut records = Vec::new();

    for archive in archives {
        for game in &archive.games {
            stats.games_seen += 1;
            let record = match parse_game(game, &tracked) {
                Parsed::Kept(record) => record,
                Parsed::NotParticipant => {
                    stats.not_participant += 1;
                    continue;
                }
                Parsed::SelfGame => {
                    debug!(path = %archive.path.display(), "discarding game against self");
                    stats.self_games += 1;
                    continue;
                }
                Parsed::Malformed => {
                    debug!(path = %archive.path.display(), "discarding malformed game");
                    stats.malformed += 1;
                    continue;
                }
            };
            if !window.contains(&record.timestamp) {
                stats.outside_window += 1;
                continue;
            }
            if let Some(url) = &record.url {
                if !seen_urls.insert(url.clone()) {
                    stats.duplicates += 1;
                    continue;
                }
            }
            records.push(record);
        }
    }

    records.sort_by_key(|r| r.timestamp);
    stats.kept = records.len();
    Normalized { records, stats }
}

fn parse_game(game: &Value, tracked: &str) -> Parsed {
    let Ok(raw) = RawGame::deserialize(game) else {
        return Parsed::Malformed;
    };
    let (Some(white), Some(black)) = (raw.white, raw.black) else {
        return Parsed::Malformed;
    };
    let white_name = white.username.as_deref().map(str::to_lowercase);
    let black_name = black.username.as_deref().map(str::to_lowercase);
    let (Some(white_name), Some(black_name)) = (white_name, black_name) else {
        return Parsed::Malformed;
    };

    let is_white = white_name == tracked;
    let is_black = black_name == tracked;
    let (color, me, them, opponent) = match (is_white, is_black) {
        (true, true) => return Parsed::SelfGame,
        (false, false) => return Parsed::NotParticipant,
        (true, false) => (Color::White, white, black, black_name),
        (false, true) => (Color::Black, black, white, white_name),
    };

    let Some(timestamp) = raw.end_time.and_then(|s| DateTime::from_timestamp(s, 0)) else {
        return Parsed::Malformed;
    };

    let eco = raw.eco.unwrap_or_default();
    let opening_name = raw.opening.unwrap_or_else(|| "Unknown".to_string());
    let opening = format!("{eco} {opening_name}").trim().to_string();

    Parsed::Kept(GameRecord {
        timestamp,
        player_color: color,
        opponent,
        opponent_rating: them.rating,
        player_rating: me.rating,
        result: me.result.unwrap_or_else(|| "unknown".to_string()),
        opening,
        time_class: raw.time_class,
        rated: raw.rated,
        url: raw.url,
        country_code: None,
        country: UNKNOWN_COUNTRY.to_string(),
    })
}

/// Fills `country_code`/`country` from a resolved handle -> code map.
pub fn attach_countries(records: &mut [GameRecord], codes: &BTreeMap<String, String>) {
    for record in records {
        let code = codes.get(&record.opponent).cloned();
        record.country = code
            .as_deref()
            .map(convert_code)
            .unwrap_or(UNKNOWN_COUNTRY)
            .to_string();
        record.country_code = code;
    }
}

/// Full normalizer: parse, filter, order, then resolve every distinct
/// opponent once through the country cache.
pub fn normalize(
    archives: &[MonthlyArchive],
    tracked: &str,
    window: &Window,
    resolver: &mut CountryResolver,
    profiles: &dyn ProfileSource,
) -> Result<Normalized> {
    let mut normalized = normalize_archives(archives, tracked, window);
    info!(
        kept = normalized.stats.kept,
        seen = normalized.stats.games_seen,
        "normalized games"
    );
    let opponents: Vec<String> = normalized.opponents().into_iter().map(String::from).collect();
    let codes = resolver.resolve(profiles, opponents.iter().map(String::as_str))?;
    attach_countries(&mut normalized.records, &codes);
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn classification_table_partitions_codes() {
        assert_eq!(classify_result("win"), Outcome::Win);
        for code in DRAW_RESULTS {
            assert_eq!(classify_result(code), Outcome::Draw, "{code}");
        }
        for code in ["checkmated", "timeout", "resigned", "abandoned", "unknown", "Win"] {
            assert_eq!(classify_result(code), Outcome::Loss, "{code}");
        }
    }

    #[test]
    fn opponent_is_other_side_and_result_is_ours() {
        let game = json!({
            "white": {"username": "Opp", "rating": 1500, "result": "checkmated"},
            "black": {"username": "Me", "rating": 1400, "result": "win"},
            "end_time": 1_704_110_400,
            "eco": "https://www.chess.com/openings/Sicilian-Defense",
        });
        let Parsed::Kept(record) = parse_game(&game, "me") else {
            panic!("game should be kept");
        };
        assert_eq!(record.player_color, Color::Black);
        assert_eq!(record.opponent, "opp");
        assert_eq!(record.opponent_rating, Some(1500));
        assert_eq!(record.player_rating, Some(1400));
        assert_eq!(record.result, "win");
        assert_eq!(
            record.opening,
            "https://www.chess.com/openings/Sicilian-Defense Unknown"
        );
    }

    #[test]
    fn self_games_and_missing_sides_are_rejected() {
        let both = json!({
            "white": {"username": "me", "result": "agreed"},
            "black": {"username": "ME", "result": "agreed"},
            "end_time": 1_704_110_400,
        });
        assert!(matches!(parse_game(&both, "me"), Parsed::SelfGame));

        let missing_black = json!({
            "white": {"username": "me", "result": "win"},
            "end_time": 1_704_110_400,
        });
        assert!(matches!(parse_game(&missing_black, "me"), Parsed::Malformed));

        let no_time = json!({
            "white": {"username": "me", "result": "win"},
            "black": {"username": "x", "result": "resigned"},
        });
        assert!(matches!(parse_game(&no_time, "me"), Parsed::Malformed));
    }

    #[test]
    fn derived_fields_follow_timestamp() {
        let game = json!({
            "white": {"username": "me", "result": "win"},
            "black": {"username": "x", "result": "resigned"},
            // 2024-03-15 21:30:00 UTC, a Friday
            "end_time": 1_710_538_200,
            "opening": "Italian Game",
        });
        let Parsed::Kept(record) = parse_game(&game, "me") else {
            panic!("game should be kept");
        };
        assert_eq!(record.hour(), 21);
        assert_eq!(record.month_name(), "March");
        assert_eq!(record.weekday_name(), "Friday");
        assert_eq!(record.opening, "Italian Game");
    }
}
