use chrono::{TimeZone, Utc};

use chess_recap::config::ReportConfig;
use chess_recap::normalize::{Color, GameRecord};
use chess_recap::report::{build_report, monthly_rows, opponent_leaderboard, rank_top_bottom};

struct G {
    month: u32,
    day: u32,
    hour: u32,
    opponent: &'static str,
    rating: Option<u32>,
    result: &'static str,
    opening: &'static str,
    country: &'static str,
}

impl Default for G {
    fn default() -> Self {
        Self {
            month: 1,
            day: 1,
            hour: 12,
            opponent: "opp",
            rating: None,
            result: "win",
            opening: "C50 Italian Game",
            country: "Israel",
        }
    }
}

fn record(g: G) -> GameRecord {
    GameRecord {
        timestamp: Utc
            .with_ymd_and_hms(2024, g.month, g.day, g.hour, 0, 0)
            .unwrap(),
        player_color: Color::White,
        opponent: g.opponent.to_string(),
        opponent_rating: g.rating,
        player_rating: Some(1500),
        result: g.result.to_string(),
        opening: g.opening.to_string(),
        time_class: Some("blitz".to_string()),
        rated: Some(true),
        url: None,
        country_code: None,
        country: g.country.to_string(),
    }
}

/// `n` games of one opening, the first `wins` of them won.
fn opening_block(opening: &'static str, n: u32, wins: u32) -> Vec<GameRecord> {
    (0..n)
        .map(|i| {
            record(G {
                day: i % 28 + 1,
                opening,
                result: if i < wins { "win" } else { "resigned" },
                ..G::default()
            })
        })
        .collect()
}

#[test]
fn outcome_counts_partition_the_games() {
    let results = [
        "win",
        "checkmated",
        "agreed",
        "repetition",
        "timeout",
        "stalemate",
        "abandoned",
        "timevsinsufficient",
    ];
    let records: Vec<GameRecord> = results
        .iter()
        .enumerate()
        .map(|(i, r)| {
            record(G {
                day: i as u32 + 1,
                result: r,
                ..G::default()
            })
        })
        .collect();

    let report = build_report(&records, &ReportConfig::default());
    assert!(!report.no_data);
    assert_eq!(report.total_games, 8);
    assert_eq!(report.outcomes.wins, 1);
    assert_eq!(report.outcomes.draws, 4);
    assert_eq!(report.outcomes.losses, 3);
    assert_eq!(report.outcomes.total(), report.total_games);
    let coded: usize = report.result_codes.iter().map(|(_, n)| n).sum();
    assert_eq!(coded, 8);
}

#[test]
fn openings_below_threshold_never_rank() {
    let mut records = opening_block("A00 Rare Line", 5, 5);
    records.extend(opening_block("C50 Italian Game", 12, 6));
    records.extend(opening_block("B20 Sicilian Defense", 11, 2));

    let report = build_report(&records, &ReportConfig::default());
    let top: Vec<&str> = report.top_openings.iter().map(|r| r.key.as_str()).collect();
    let bottom: Vec<&str> = report
        .bottom_openings
        .iter()
        .map(|r| r.key.as_str())
        .collect();

    assert_eq!(top, ["C50 Italian Game", "B20 Sicilian Defense"]);
    assert_eq!(bottom, ["B20 Sicilian Defense", "C50 Italian Game"]);
    assert!(!top.contains(&"A00 Rare Line"));
}

#[test]
fn openings_need_more_than_the_minimum() {
    let at_minimum = opening_block("C50 Italian Game", 10, 3);
    let report = build_report(&at_minimum, &ReportConfig::default());
    assert!(report.top_openings.is_empty());
    assert!(report.bottom_openings.is_empty());

    let above = opening_block("C50 Italian Game", 11, 3);
    let report = build_report(&above, &ReportConfig::default());
    assert_eq!(report.top_openings.len(), 1);
    assert_eq!(report.top_openings[0].games, 11);
}

#[test]
fn countries_rank_at_the_minimum() {
    let records: Vec<GameRecord> = (0..10u32)
        .map(|i| {
            record(G {
                day: i + 1,
                country: "Israel",
                ..G::default()
            })
        })
        .collect();
    let report = build_report(&records, &ReportConfig::default());
    assert_eq!(report.top_countries.len(), 1);
    assert_eq!(report.top_countries[0].games, 10);
}

#[test]
fn ties_prefer_more_games_then_name() {
    let mut records = opening_block("B00 Beta", 12, 6);
    records.extend(opening_block("A00 Alpha", 12, 6));
    records.extend(opening_block("C00 Gamma", 20, 10));

    let rows = build_report(&records, &ReportConfig::default()).top_openings;
    let keys: Vec<&str> = rows.iter().map(|r| r.key.as_str()).collect();
    assert_eq!(keys, ["C00 Gamma", "A00 Alpha", "B00 Beta"]);
}

#[test]
fn months_are_calendar_ordered_without_gaps() {
    let records = vec![
        record(G {
            month: 3,
            ..G::default()
        }),
        record(G {
            month: 1,
            result: "resigned",
            ..G::default()
        }),
        record(G {
            month: 3,
            day: 2,
            result: "timeout",
            ..G::default()
        }),
    ];
    let months = monthly_rows(&records);
    let keys: Vec<&str> = months.iter().map(|m| m.key.as_str()).collect();
    assert_eq!(keys, ["January", "March"]);
    assert_eq!(months[1].games, 2);
    assert_eq!(months[1].wins, 1);
    assert_eq!(months[1].win_pct(), 50.0);
}

#[test]
fn leaderboard_takes_most_played_then_orders_by_win_rate() {
    let mut records = Vec::new();
    let plan: [(&str, u32, u32, u32); 4] = [
        ("dave", 4, 1, 1400),
        ("erin", 3, 3, 1600),
        ("fred", 2, 1, 1500),
        ("gina", 1, 1, 1700),
    ];
    for (opponent, games, wins, rating) in plan {
        for i in 0..games {
            records.push(record(G {
                day: i + 1,
                opponent,
                rating: Some(rating + i * 10),
                result: if i < wins { "win" } else { "checkmated" },
                ..G::default()
            }));
        }
    }

    let rows = opponent_leaderboard(&records, 3);
    let names: Vec<&str> = rows.iter().map(|r| r.opponent.as_str()).collect();
    assert_eq!(names, ["erin", "fred", "dave"]);
    assert_eq!(rows[0].avg_rating, Some(1610.0));
    assert_eq!(rows[2].games, 4);
}

#[test]
fn opponent_without_ratings_has_no_average() {
    let records = vec![record(G::default())];
    let rows = opponent_leaderboard(&records, 5);
    assert_eq!(rows[0].avg_rating, None);
}

#[test]
fn countries_rank_with_their_own_threshold() {
    let mut records = Vec::new();
    for i in 0..10u32 {
        records.push(record(G {
            day: i + 1,
            country: "Israel",
            result: if i < 8 { "win" } else { "resigned" },
            ..G::default()
        }));
        records.push(record(G {
            day: i + 1,
            country: "Unknown",
            result: if i < 3 { "win" } else { "resigned" },
            ..G::default()
        }));
    }
    records.push(record(G {
        country: "Brazil",
        ..G::default()
    }));

    let cfg = ReportConfig {
        top_countries: 1,
        ..ReportConfig::default()
    };
    let report = build_report(&records, &cfg);
    assert_eq!(report.top_countries.len(), 1);
    assert_eq!(report.top_countries[0].key, "Israel");
    assert_eq!(report.bottom_countries[0].key, "Unknown");
}

#[test]
fn hours_skip_empty_buckets() {
    let records = vec![
        record(G {
            hour: 21,
            ..G::default()
        }),
        record(G {
            hour: 3,
            result: "agreed",
            ..G::default()
        }),
    ];
    let report = build_report(&records, &ReportConfig::default());
    let hours: Vec<u32> = report.hours.iter().map(|h| h.hour).collect();
    assert_eq!(hours, [3, 21]);
    assert_eq!(report.hours[0].win_pct(), 0.0);
}

#[test]
fn rank_lists_overlap_when_few_groups_qualify() {
    let records = opening_block("C50 Italian Game", 11, 4);
    let report = build_report(&records, &ReportConfig::default());
    assert_eq!(report.top_openings, report.bottom_openings);

    let (top, bottom) = rank_top_bottom(&[], 10, 3);
    assert!(top.is_empty() && bottom.is_empty());
}

#[test]
fn weekdays_and_colours_split_the_games() {
    // 2024-01-01 is a Monday.
    let mut records = vec![
        record(G {
            day: 1,
            ..G::default()
        }),
        record(G {
            day: 3,
            result: "resigned",
            ..G::default()
        }),
        record(G {
            day: 8,
            ..G::default()
        }),
    ];
    records[1].player_color = Color::Black;

    let report = build_report(&records, &ReportConfig::default());
    let days: Vec<(&str, usize)> = report
        .weekdays
        .iter()
        .map(|d| (d.key.as_str(), d.games))
        .collect();
    assert_eq!(days, [("Monday", 2), ("Wednesday", 1)]);

    let colours: Vec<(&str, usize, usize)> = report
        .colors
        .iter()
        .map(|c| (c.key.as_str(), c.games, c.wins))
        .collect();
    assert_eq!(colours, [("white", 2, 2), ("black", 1, 0)]);
}
