use std::process::ExitCode;

use anyhow::Result;
use chrono::{Datelike, Utc};
use tracing_subscriber::EnvFilter;

use chess_recap::config::AppConfig;
use chess_recap::input::parse_run_request;
use chess_recap::pipeline::{self, RunProgress, RunSummary};
use chess_recap::report::RateRow;

const USAGE: &str = "usage: recap --user <name> [--year <yyyy>] [--months 1,2,3] [--clear-cache]";

fn main() -> ExitCode {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        println!("{USAGE}");
        return Ok(());
    }

    let username = arg_value(&args, "--user").unwrap_or_default();
    let year = arg_value(&args, "--year").unwrap_or_else(|| Utc::now().year().to_string());
    let months = arg_value(&args, "--months").unwrap_or_else(|| "1,2,3".to_string());
    let clear_cache = args.iter().any(|a| a == "--clear-cache");

    let req = parse_run_request(&username, &year, &months, clear_cache)
        .map_err(|err| anyhow::anyhow!("{err}\n{USAGE}"))?;
    let cfg = AppConfig::from_env();

    let summary = pipeline::run_with_chess_com(&req, &cfg, |progress| {
        if let Some(line) = progress_line(&progress) {
            println!("{line}");
        }
    })?;

    print_summary(&summary);
    Ok(())
}

// Warnings already reach stderr through the library's tracing output.
fn progress_line(progress: &RunProgress) -> Option<&str> {
    (!progress.warning).then_some(progress.message.as_str())
}

fn arg_value(args: &[String], name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            return Some(value.trim().to_string());
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

fn print_summary(summary: &RunSummary) {
    let report = &summary.report;
    if report.no_data {
        println!("\nNo games found for {} in the requested months.", summary.request.username);
        return;
    }

    let o = report.outcomes;
    println!("\n--- Overall Summary ---");
    println!("Total Games: {}", report.total_games);
    println!("Wins: {}", o.wins);
    println!("Draws: {}", o.draws);
    println!("Losses: {}", o.losses);
    for (code, n) in &report.result_codes {
        println!("  {code:<20} {n}");
    }

    println!(
        "\nLongest Win Streak: {} games",
        report.longest_streak.length
    );
    if let Some(month) = report.longest_streak.month {
        println!("It happened in: {month}");
    }

    print_rates("Top openings by win %", &report.top_openings);
    print_rates("Bottom openings by win %", &report.bottom_openings);
    print_rates("Win rate by month", &report.months);
    print_rates("Win rate by weekday", &report.weekdays);
    print_rates("Win rate by colour", &report.colors);

    println!("\nWin rate by hour (UTC)");
    for h in &report.hours {
        println!("  {:02}  {}/{} ({:.1}%)", h.hour, h.wins, h.games, h.win_pct());
    }

    println!("\nWin rate vs most played opponents");
    for o in &report.opponents {
        let rating = o
            .avg_rating
            .map(|r| format!("{r:.0}"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<24} {}/{} ({:.1}%)  avg rating {rating}",
            o.opponent,
            o.wins,
            o.games,
            o.win_rate() * 100.0
        );
    }

    print_rates("Top countries by win %", &report.top_countries);
    print_rates("Bottom countries by win %", &report.bottom_countries);

    if !summary.fetch.failed.is_empty() {
        println!("\nMonths not fetched: {}", summary.fetch.failed.len());
        for (month, reason) in &summary.fetch.failed {
            println!("   - {month:02}: {reason}");
        }
    }
    if let Some(export) = &summary.export {
        println!("\nSaved to {}", export.path.display());
    }
}

fn print_rates(title: &str, rows: &[RateRow]) {
    println!("\n{title}");
    if rows.is_empty() {
        println!("  (not enough games)");
    }
    for row in rows {
        println!(
            "  {:<32} {}/{} ({:.1}%)",
            row.label,
            row.wins,
            row.games,
            row.win_pct()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chess_recap::pipeline::Stage;

    fn progress(message: &str, warning: bool) -> RunProgress {
        RunProgress {
            stage: Stage::Fetching,
            message: message.to_string(),
            warning,
        }
    }

    #[test]
    fn warnings_are_left_to_tracing() {
        assert_eq!(
            progress_line(&progress("Downloaded: 2024-01", false)),
            Some("Downloaded: 2024-01")
        );
        assert_eq!(
            progress_line(&progress("Failed to fetch 2024-02 (status 404)", true)),
            None
        );
    }

    #[test]
    fn flag_values_accept_both_spellings() {
        let args: Vec<String> = ["--user=hikaru", "--year", "2024"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(arg_value(&args, "--user").as_deref(), Some("hikaru"));
        assert_eq!(arg_value(&args, "--year").as_deref(), Some("2024"));
        assert_eq!(arg_value(&args, "--months"), None);
    }
}
