use anyhow::{Context, Result};
use tracing::info;

use crate::archive_fetch::{
    ArchiveSource, ArchiveStore, ChessComArchives, FetchEvent, FetchSummary, fetch_archives,
};
use crate::config::AppConfig;
use crate::country::{ChessComProfiles, CountryResolver, ProfileSource};
use crate::export::{ExportSummary, export_path, export_run};
use crate::http_client::http_client;
use crate::input::RunRequest;
use crate::normalize::{GameRecord, NormalizeStats, Window, normalize};
use crate::report::{Report, build_report};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetching,
    Normalizing,
    Reporting,
    Exporting,
    Done,
}

#[derive(Debug, Clone)]
pub struct RunProgress {
    pub stage: Stage,
    pub message: String,
    pub warning: bool,
}

impl RunProgress {
    fn info(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
            warning: false,
        }
    }

    fn warn(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
            warning: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub request: RunRequest,
    pub fetch: FetchSummary,
    pub normalize: NormalizeStats,
    pub records: Vec<GameRecord>,
    pub report: Report,
    pub export: Option<ExportSummary>,
}

pub struct Sources<'a> {
    pub archives: &'a dyn ArchiveSource,
    pub profiles: &'a dyn ProfileSource,
}

/// Runs the whole pipeline against the public Chess.com API.
pub fn run_with_chess_com(
    req: &RunRequest,
    cfg: &AppConfig,
    on_progress: impl FnMut(RunProgress),
) -> Result<RunSummary> {
    let client = http_client(&cfg.fetch)?;
    let archives = ChessComArchives::new(client, &cfg.fetch);
    let profiles = ChessComProfiles::new(client, &cfg.fetch);
    let sources = Sources {
        archives: &archives,
        profiles: &profiles,
    };
    run_pipeline(req, cfg, &sources, on_progress)
}

/// Fetch, normalize, resolve countries, report and export, in that order.
/// Per-month and per-opponent failures are absorbed; only storage failures
/// abort the run.
pub fn run_pipeline(
    req: &RunRequest,
    cfg: &AppConfig,
    sources: &Sources<'_>,
    mut on_progress: impl FnMut(RunProgress),
) -> Result<RunSummary> {
    let store = ArchiveStore::new(cfg.games_dir());

    on_progress(RunProgress::info(
        Stage::Fetching,
        format!(
            "Fetching {} month(s) of {} for {}",
            req.months.len(),
            req.year,
            req.username
        ),
    ));
    let fetch = fetch_archives(
        sources.archives,
        &store,
        &req.username,
        req.year,
        &req.months,
        &cfg.fetch,
        |event| {
            let progress = match event {
                FetchEvent::Skipped { month } => RunProgress::info(
                    Stage::Fetching,
                    format!("Already exists: {}-{month:02}", req.year),
                ),
                FetchEvent::Downloaded { month } => RunProgress::info(
                    Stage::Fetching,
                    format!("Downloaded: {}-{month:02}", req.year),
                ),
                FetchEvent::Failed { month, reason } => RunProgress::warn(
                    Stage::Fetching,
                    format!("Failed to fetch {}-{month:02} ({reason})", req.year),
                ),
            };
            on_progress(progress);
        },
    )
    .context("archive fetch failed")?;

    on_progress(RunProgress::info(Stage::Normalizing, "Reading archives"));
    let archives = store.load_window(&req.username, req.year, &req.months);
    let window = Window::new(req.year, req.months.clone());
    let mut resolver = CountryResolver::open(cfg.country_cache_path(), req.clear_cache);
    let normalized = normalize(
        &archives,
        &req.username,
        &window,
        &mut resolver,
        sources.profiles,
    )
    .context("country resolution failed")?;
    on_progress(RunProgress::info(
        Stage::Normalizing,
        format!(
            "Total games analyzed: {} ({} opponents)",
            normalized.stats.kept,
            normalized.opponents().len()
        ),
    ));

    on_progress(RunProgress::info(Stage::Reporting, "Building report"));
    let report = build_report(&normalized.records, &cfg.report);

    let export = if report.no_data {
        on_progress(RunProgress::warn(
            Stage::Reporting,
            "No games found in the requested window",
        ));
        None
    } else {
        let path = export_path(&cfg.export_dir, &req.username);
        on_progress(RunProgress::info(
            Stage::Exporting,
            format!("Writing {}", path.display()),
        ));
        Some(export_run(&path, &normalized.records, &report)?)
    };

    info!(
        username = req.username.as_str(),
        games = report.total_games,
        "run finished"
    );
    on_progress(RunProgress::info(Stage::Done, "Analysis complete"));

    Ok(RunSummary {
        request: req.clone(),
        fetch,
        normalize: normalized.stats,
        records: normalized.records,
        report,
        export,
    })
}
