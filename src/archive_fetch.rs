use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::FetchConfig;

/// Outcome of one archive request that reached the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonthResponse {
    Body(String),
    Status(u16),
}

/// Remote side of the fetcher. `ChessComArchives` talks to the public API;
/// tests plug in counting fakes.
pub trait ArchiveSource {
    fn fetch_month(&self, username: &str, year: i32, month: u32) -> Result<MonthResponse>;
}

pub struct ChessComArchives<'a> {
    client: &'a Client,
    api_base: String,
}

impl<'a> ChessComArchives<'a> {
    pub fn new(client: &'a Client, cfg: &FetchConfig) -> Self {
        Self {
            client,
            api_base: cfg.api_base.trim_end_matches('/').to_string(),
        }
    }
}

impl ArchiveSource for ChessComArchives<'_> {
    fn fetch_month(&self, username: &str, year: i32, month: u32) -> Result<MonthResponse> {
        let url = archive_url(&self.api_base, username, year, month);
        let resp = self.client.get(&url).send().context("request failed")?;
        let status = resp.status();
        if status != StatusCode::OK {
            return Ok(MonthResponse::Status(status.as_u16()));
        }
        let body = resp.text().context("failed reading body")?;
        Ok(MonthResponse::Body(body))
    }
}

pub fn archive_url(api_base: &str, username: &str, year: i32, month: u32) -> String {
    format!(
        "{api_base}/player/{}/games/{year}/{month:02}",
        username.to_lowercase()
    )
}

/// Top-level archive document. Games stay untyped here so one odd game
/// cannot invalidate the whole month.
#[derive(Debug, Clone, Deserialize)]
struct ArchiveDocument {
    #[serde(default)]
    games: Vec<Value>,
}

#[derive(Debug, Clone)]
pub struct MonthlyArchive {
    pub username: String,
    pub year: i32,
    pub month: u32,
    pub path: PathBuf,
    pub games: Vec<Value>,
}

pub fn parse_archive_json(raw: &str) -> Result<Vec<Value>> {
    let doc: ArchiveDocument =
        serde_json::from_str(raw.trim()).context("invalid archive json")?;
    Ok(doc.games)
}

/// Immutable per-month archive files under `{root}/{username}/{year}-{MM}.json`.
#[derive(Debug, Clone)]
pub struct ArchiveStore {
    root: PathBuf,
}

impl ArchiveStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, username: &str, year: i32, month: u32) -> PathBuf {
        self.root
            .join(username.to_lowercase())
            .join(format!("{year}-{month:02}.json"))
    }

    /// Reads and validates a stored month. Missing or unparsable files both
    /// count as "not fetched".
    pub fn load(&self, username: &str, year: i32, month: u32) -> Option<MonthlyArchive> {
        let path = self.path_for(username, year, month);
        let raw = fs::read_to_string(&path).ok()?;
        match parse_archive_json(&raw) {
            Ok(games) => Some(MonthlyArchive {
                username: username.to_lowercase(),
                year,
                month,
                path,
                games,
            }),
            Err(err) => {
                warn!(path = %path.display(), "stored archive is unreadable: {err:#}");
                None
            }
        }
    }

    pub fn load_window(&self, username: &str, year: i32, months: &[u32]) -> Vec<MonthlyArchive> {
        months
            .iter()
            .filter_map(|month| self.load(username, year, *month))
            .collect()
    }

    pub fn save(&self, username: &str, year: i32, month: u32, body: &str) -> Result<PathBuf> {
        let path = self.path_for(username, year, month);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("create archive dir {}", dir.display()))?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, body).with_context(|| format!("write archive {}", tmp.display()))?;
        fs::rename(&tmp, &path).with_context(|| format!("swap archive {}", path.display()))?;
        Ok(path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchEvent {
    Skipped { month: u32 },
    Downloaded { month: u32 },
    Failed { month: u32, reason: String },
}

#[derive(Debug, Clone, Default)]
pub struct FetchSummary {
    pub downloaded: Vec<u32>,
    pub skipped: Vec<u32>,
    pub failed: Vec<(u32, String)>,
    pub requests: usize,
}

pub fn fetch_archives(
    source: &dyn ArchiveSource,
    store: &ArchiveStore,
    username: &str,
    year: i32,
    months: &[u32],
    cfg: &FetchConfig,
    mut on_event: impl FnMut(&FetchEvent),
) -> Result<FetchSummary> {
    let mut summary = FetchSummary::default();

    for &month in months {
        if store.load(username, year, month).is_some() {
            info!(username, year, month, "archive already present");
            summary.skipped.push(month);
            on_event(&FetchEvent::Skipped { month });
            continue;
        }

        if summary.requests > 0 && !cfg.delay.is_zero() {
            thread::sleep(cfg.delay);
        }

        let event = match fetch_with_retry(source, username, year, month, cfg, &mut summary.requests)
        {
            Ok(MonthResponse::Body(body)) => {
                let path = store.save(username, year, month, &body)?;
                info!(path = %path.display(), "downloaded archive");
                summary.downloaded.push(month);
                FetchEvent::Downloaded { month }
            }
            Ok(MonthResponse::Status(code)) => {
                let reason = format!("status {code}");
                warn!(username, year, month, "failed to fetch archive ({reason})");
                summary.failed.push((month, reason.clone()));
                FetchEvent::Failed { month, reason }
            }
            Err(err) => {
                let reason = format!("{err:#}");
                warn!(username, year, month, "failed to fetch archive: {reason}");
                summary.failed.push((month, reason.clone()));
                FetchEvent::Failed { month, reason }
            }
        };
        on_event(&event);
    }

    Ok(summary)
}

fn fetch_with_retry(
    source: &dyn ArchiveSource,
    username: &str,
    year: i32,
    month: u32,
    cfg: &FetchConfig,
    requests: &mut usize,
) -> Result<MonthResponse> {
    let mut attempt: u32 = 0;
    loop {
        *requests += 1;
        let result = source.fetch_month(username, year, month);
        let retry = match &result {
            Ok(MonthResponse::Status(code)) => is_retryable_status(*code),
            Ok(MonthResponse::Body(_)) => false,
            Err(_) => true,
        };
        if !retry || attempt >= cfg.retries {
            return result;
        }
        attempt += 1;
        debug!(username, year, month, attempt, "retrying archive request");
        if !cfg.delay.is_zero() {
            thread::sleep(cfg.delay * attempt);
        }
    }
}

fn is_retryable_status(code: u16) -> bool {
    code == 429 || (500..600).contains(&code)
}
