use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::ReportConfig;
use crate::normalize::{Color, GameRecord, MONTH_NAMES, Outcome, WEEKDAY_NAMES};

static MOVE_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+\.\S+").expect("move token pattern is valid"));

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeCounts {
    pub wins: usize,
    pub draws: usize,
    pub losses: usize,
}

impl OutcomeCounts {
    pub fn total(&self) -> usize {
        self.wins + self.draws + self.losses
    }

    pub fn get(&self, outcome: Outcome) -> usize {
        match outcome {
            Outcome::Win => self.wins,
            Outcome::Draw => self.draws,
            Outcome::Loss => self.losses,
        }
    }
}

/// Games and wins for one group (opening, month, country, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateRow {
    pub key: String,
    pub label: String,
    pub games: usize,
    pub wins: usize,
}

impl RateRow {
    fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            label: key.clone(),
            key,
            games: 0,
            wins: 0,
        }
    }

    fn add(&mut self, win: bool) {
        self.games += 1;
        if win {
            self.wins += 1;
        }
    }

    pub fn win_rate(&self) -> f64 {
        if self.games == 0 {
            0.0
        } else {
            self.wins as f64 / self.games as f64
        }
    }

    pub fn win_pct(&self) -> f64 {
        (self.win_rate() * 1000.0).round() / 10.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpponentRow {
    pub opponent: String,
    pub games: usize,
    pub wins: usize,
    pub avg_rating: Option<f64>,
}

impl OpponentRow {
    pub fn win_rate(&self) -> f64 {
        if self.games == 0 {
            0.0
        } else {
            self.wins as f64 / self.games as f64
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HourRow {
    pub hour: u32,
    pub games: usize,
    pub wins: usize,
}

impl HourRow {
    pub fn win_pct(&self) -> f64 {
        if self.games == 0 {
            0.0
        } else {
            self.wins as f64 * 100.0 / self.games as f64
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Streak {
    pub length: usize,
    pub month: Option<&'static str>,
    pub ended_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    /// Set when the window held no games; every section is then empty.
    pub no_data: bool,
    pub total_games: usize,
    pub outcomes: OutcomeCounts,
    pub result_codes: Vec<(String, usize)>,
    pub top_openings: Vec<RateRow>,
    pub bottom_openings: Vec<RateRow>,
    pub months: Vec<RateRow>,
    pub opponents: Vec<OpponentRow>,
    pub hours: Vec<HourRow>,
    pub weekdays: Vec<RateRow>,
    pub colors: Vec<RateRow>,
    pub top_countries: Vec<RateRow>,
    pub bottom_countries: Vec<RateRow>,
    pub longest_streak: Streak,
}

/// Builds every section from timestamp-ordered records.
pub fn build_report(records: &[GameRecord], cfg: &ReportConfig) -> Report {
    if records.is_empty() {
        return Report {
            no_data: true,
            ..Report::default()
        };
    }

    let openings = opening_rows(records);
    // Openings need strictly more games than the minimum; countries need at least it.
    let (top_openings, bottom_openings) = rank_top_bottom(
        &openings,
        cfg.min_opening_games.saturating_add(1),
        cfg.top_openings,
    );
    let countries = group_rows(records, |r| r.country.clone());
    let (top_countries, bottom_countries) =
        rank_top_bottom(&countries, cfg.min_country_games, cfg.top_countries);

    Report {
        no_data: false,
        total_games: records.len(),
        outcomes: outcome_counts(records),
        result_codes: result_code_counts(records),
        top_openings,
        bottom_openings,
        months: monthly_rows(records),
        opponents: opponent_leaderboard(records, cfg.top_opponents),
        hours: hourly_rows(records),
        weekdays: weekday_rows(records),
        colors: color_rows(records),
        top_countries,
        bottom_countries,
        longest_streak: longest_win_streak(records),
    }
}

pub fn outcome_counts(records: &[GameRecord]) -> OutcomeCounts {
    let mut counts = OutcomeCounts::default();
    for record in records {
        match record.outcome() {
            Outcome::Win => counts.wins += 1,
            Outcome::Draw => counts.draws += 1,
            Outcome::Loss => counts.losses += 1,
        }
    }
    counts
}

pub fn result_code_counts(records: &[GameRecord]) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for record in records {
        *counts.entry(record.result.as_str()).or_default() += 1;
    }
    let mut out: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(code, n)| (code.to_string(), n))
        .collect();
    out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    out
}

fn group_rows(records: &[GameRecord], key: impl Fn(&GameRecord) -> String) -> Vec<RateRow> {
    let mut groups: BTreeMap<String, RateRow> = BTreeMap::new();
    for record in records {
        let k = key(record);
        groups
            .entry(k.clone())
            .or_insert_with(|| RateRow::new(k))
            .add(record.is_win());
    }
    groups.into_values().collect()
}

fn opening_rows(records: &[GameRecord]) -> Vec<RateRow> {
    let mut rows = group_rows(records, |r| r.opening.clone());
    for row in &mut rows {
        row.label = simplify_opening(&row.key);
    }
    rows
}

/// Keeps groups with at least `min_games` games and returns the best and
/// worst `n` by win rate. The two lists overlap when fewer than `2 * n`
/// groups qualify.
pub fn rank_top_bottom(rows: &[RateRow], min_games: usize, n: usize) -> (Vec<RateRow>, Vec<RateRow>) {
    let eligible: Vec<&RateRow> = rows.iter().filter(|r| r.games >= min_games).collect();

    let mut top = eligible.clone();
    top.sort_by(|a, b| {
        compare_rate(b.wins, b.games, a.wins, a.games)
            .then_with(|| b.games.cmp(&a.games))
            .then_with(|| a.key.cmp(&b.key))
    });

    let mut bottom = eligible;
    bottom.sort_by(|a, b| {
        compare_rate(a.wins, a.games, b.wins, b.games)
            .then_with(|| b.games.cmp(&a.games))
            .then_with(|| a.key.cmp(&b.key))
    });

    (
        top.into_iter().take(n).cloned().collect(),
        bottom.into_iter().take(n).cloned().collect(),
    )
}

// Exact comparison of wins_a/games_a against wins_b/games_b.
fn compare_rate(wins_a: usize, games_a: usize, wins_b: usize, games_b: usize) -> Ordering {
    (wins_a * games_b).cmp(&(wins_b * games_a))
}

pub fn monthly_rows(records: &[GameRecord]) -> Vec<RateRow> {
    let mut months: Vec<RateRow> = MONTH_NAMES.iter().map(|m| RateRow::new(*m)).collect();
    for record in records {
        months[record.month() as usize - 1].add(record.is_win());
    }
    months.retain(|m| m.games > 0);
    months
}

pub fn weekday_rows(records: &[GameRecord]) -> Vec<RateRow> {
    let mut days: Vec<RateRow> = WEEKDAY_NAMES.iter().map(|d| RateRow::new(*d)).collect();
    for record in records {
        days[record.weekday().num_days_from_monday() as usize].add(record.is_win());
    }
    days.retain(|d| d.games > 0);
    days
}

pub fn color_rows(records: &[GameRecord]) -> Vec<RateRow> {
    let mut rows = vec![
        RateRow::new(Color::White.label()),
        RateRow::new(Color::Black.label()),
    ];
    for record in records {
        let idx = match record.player_color {
            Color::White => 0,
            Color::Black => 1,
        };
        rows[idx].add(record.is_win());
    }
    rows.retain(|r| r.games > 0);
    rows
}

pub fn hourly_rows(records: &[GameRecord]) -> Vec<HourRow> {
    let mut hours: Vec<HourRow> = (0..24)
        .map(|hour| HourRow {
            hour,
            games: 0,
            wins: 0,
        })
        .collect();
    for record in records {
        let row = &mut hours[record.hour() as usize];
        row.games += 1;
        if record.is_win() {
            row.wins += 1;
        }
    }
    hours.retain(|h| h.games > 0);
    hours
}

/// Most-played `n` opponents, then ordered among themselves by win rate.
pub fn opponent_leaderboard(records: &[GameRecord], n: usize) -> Vec<OpponentRow> {
    #[derive(Default)]
    struct Acc {
        games: usize,
        wins: usize,
        rating_sum: u64,
        rated: usize,
    }

    let mut groups: BTreeMap<&str, Acc> = BTreeMap::new();
    for record in records {
        let acc = groups.entry(record.opponent.as_str()).or_default();
        acc.games += 1;
        if record.is_win() {
            acc.wins += 1;
        }
        if let Some(rating) = record.opponent_rating {
            acc.rating_sum += u64::from(rating);
            acc.rated += 1;
        }
    }

    let mut rows: Vec<OpponentRow> = groups
        .into_iter()
        .map(|(opponent, acc)| OpponentRow {
            opponent: opponent.to_string(),
            games: acc.games,
            wins: acc.wins,
            avg_rating: (acc.rated > 0).then(|| acc.rating_sum as f64 / acc.rated as f64),
        })
        .collect();

    rows.sort_by(|a, b| b.games.cmp(&a.games).then_with(|| a.opponent.cmp(&b.opponent)));
    rows.truncate(n);
    rows.sort_by(|a, b| {
        compare_rate(b.wins, b.games, a.wins, a.games)
            .then_with(|| b.games.cmp(&a.games))
            .then_with(|| a.opponent.cmp(&b.opponent))
    });
    rows
}

/// Longest run of consecutive wins; the first of equally long runs wins.
pub fn longest_win_streak(records: &[GameRecord]) -> Streak {
    let mut best = Streak::default();
    let mut current = 0usize;
    for record in records {
        if record.is_win() {
            current += 1;
            if current > best.length {
                best = Streak {
                    length: current,
                    month: Some(record.month_name()),
                    ended_at: Some(record.timestamp),
                };
            }
        } else {
            current = 0;
        }
    }
    best
}

/// Short display label for an opening: last URL segment, dashes as spaces,
/// no move tokens, at most three words.
pub fn simplify_opening(name: &str) -> String {
    let last = name.rsplit('/').next().unwrap_or(name);
    let cleaned = last.replace('-', " ").replace("Unknown", "");
    let cleaned = MOVE_TOKEN.replace_all(cleaned.trim(), "");
    let simple = cleaned.split_whitespace().take(3).collect::<Vec<_>>().join(" ");
    if simple.is_empty() {
        "Other".to_string()
    } else {
        simple
    }
}
