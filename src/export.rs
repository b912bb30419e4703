use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::normalize::GameRecord;
use crate::report::{RateRow, Report};

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Empty,
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub games: usize,
    pub sheets: usize,
}

pub fn export_path(dir: &Path, username: &str) -> PathBuf {
    dir.join(format!(
        "{}_full_chess_analysis.xlsx",
        username.trim().to_lowercase()
    ))
}

pub fn export_run(path: &Path, records: &[GameRecord], report: &Report) -> Result<ExportSummary> {
    let sheets: Vec<(&str, Vec<Vec<Cell>>)> = vec![
        ("Games", game_rows(records)),
        (
            "Openings",
            rate_sheet(
                "Opening",
                report.top_openings.iter().chain(report.bottom_openings.iter()),
            ),
        ),
        ("Months", rate_sheet("Month", report.months.iter())),
        ("Hours", hour_rows(report)),
        ("Opponents", opponent_rows(report)),
        (
            "Countries",
            rate_sheet(
                "Country",
                report
                    .top_countries
                    .iter()
                    .chain(report.bottom_countries.iter()),
            ),
        ),
    ];

    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("create export dir {}", dir.display()))?;
        }
    }

    let mut workbook = Workbook::new();
    for (name, rows) in &sheets {
        let sheet = workbook.add_worksheet();
        sheet.set_name(*name)?;
        write_rows(sheet, rows)?;
    }
    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;

    Ok(ExportSummary {
        path: path.to_path_buf(),
        games: records.len(),
        sheets: sheets.len(),
    })
}

/// One row per record plus derived columns, header first.
pub fn game_rows(records: &[GameRecord]) -> Vec<Vec<Cell>> {
    let header = [
        "Datetime (UTC)",
        "Hour",
        "Weekday",
        "Month",
        "Opponent",
        "Opponent Rating",
        "Player Rating",
        "Color",
        "Result",
        "Outcome",
        "Win",
        "Opening",
        "Time Class",
        "Rated",
        "Country Code",
        "Country",
    ];
    let mut rows = vec![header.iter().map(|h| Cell::from(*h)).collect::<Vec<_>>()];
    for r in records {
        rows.push(vec![
            Cell::from(r.timestamp.format("%Y-%m-%d %H:%M:%S").to_string()),
            Cell::Number(f64::from(r.hour())),
            Cell::from(r.weekday_name()),
            Cell::from(r.month_name()),
            Cell::from(r.opponent.as_str()),
            opt_number(r.opponent_rating),
            opt_number(r.player_rating),
            Cell::from(r.player_color.label()),
            Cell::from(r.result.as_str()),
            Cell::from(r.outcome().label()),
            Cell::Number(if r.is_win() { 1.0 } else { 0.0 }),
            Cell::from(r.opening.as_str()),
            r.time_class.as_deref().map(Cell::from).unwrap_or(Cell::Empty),
            r.rated
                .map(|rated| Cell::from(if rated { "yes" } else { "no" }))
                .unwrap_or(Cell::Empty),
            r.country_code.as_deref().map(Cell::from).unwrap_or(Cell::Empty),
            Cell::from(r.country.as_str()),
        ]);
    }
    rows
}

fn rate_sheet<'a>(title: &str, rows: impl Iterator<Item = &'a RateRow>) -> Vec<Vec<Cell>> {
    let mut out = vec![vec![
        Cell::from(title),
        Cell::from("Label"),
        Cell::from("Games"),
        Cell::from("Wins"),
        Cell::from("Win %"),
    ]];
    let mut seen = std::collections::HashSet::new();
    for row in rows {
        if !seen.insert(row.key.as_str()) {
            continue;
        }
        out.push(vec![
            Cell::from(row.key.as_str()),
            Cell::from(row.label.as_str()),
            Cell::Number(row.games as f64),
            Cell::Number(row.wins as f64),
            Cell::Number(row.win_pct()),
        ]);
    }
    out
}

fn hour_rows(report: &Report) -> Vec<Vec<Cell>> {
    let mut out = vec![vec![
        Cell::from("Hour"),
        Cell::from("Games"),
        Cell::from("Wins"),
        Cell::from("Win %"),
    ]];
    for row in &report.hours {
        out.push(vec![
            Cell::Number(f64::from(row.hour)),
            Cell::Number(row.games as f64),
            Cell::Number(row.wins as f64),
            Cell::Number((row.win_pct() * 10.0).round() / 10.0),
        ]);
    }
    out
}

fn opponent_rows(report: &Report) -> Vec<Vec<Cell>> {
    let mut out = vec![vec![
        Cell::from("Opponent"),
        Cell::from("Games"),
        Cell::from("Wins"),
        Cell::from("Win Rate"),
        Cell::from("Avg Rating"),
    ]];
    for row in &report.opponents {
        out.push(vec![
            Cell::from(row.opponent.as_str()),
            Cell::Number(row.games as f64),
            Cell::Number(row.wins as f64),
            Cell::Number(row.win_rate()),
            row.avg_rating
                .map(|r| Cell::Number(r.round()))
                .unwrap_or(Cell::Empty),
        ]);
    }
    out
}

fn opt_number(value: Option<u32>) -> Cell {
    value.map(|v| Cell::Number(f64::from(v))).unwrap_or(Cell::Empty)
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<Cell>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            let (r, c) = (row_idx as u32, col_idx as u16);
            match value {
                Cell::Text(text) => {
                    worksheet.write_string(r, c, text)?;
                }
                Cell::Number(n) => {
                    worksheet.write_number(r, c, *n)?;
                }
                Cell::Empty => {}
            }
        }
    }
    Ok(())
}
