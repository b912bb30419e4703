use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::FetchConfig;
use crate::error::CacheError;

pub use crate::country_names::{UNKNOWN_COUNTRY, convert_code};

/// Stored in the cache for handles whose country could not be resolved.
pub const UNKNOWN_CODE: &str = "unknown";

const CACHE_VERSION: u32 = 1;

/// Result of a single profile lookup. Failures carry their reason instead of
/// being folded into a default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountryLookup {
    Resolved(String),
    Unknown(String),
}

impl CountryLookup {
    pub fn code(&self) -> &str {
        match self {
            CountryLookup::Resolved(code) => code,
            CountryLookup::Unknown(_) => UNKNOWN_CODE,
        }
    }
}

pub trait ProfileSource {
    fn lookup(&self, handle: &str) -> CountryLookup;
}

pub struct ChessComProfiles<'a> {
    client: &'a Client,
    api_base: String,
}

impl<'a> ChessComProfiles<'a> {
    pub fn new(client: &'a Client, cfg: &FetchConfig) -> Self {
        Self {
            client,
            api_base: cfg.api_base.trim_end_matches('/').to_string(),
        }
    }

    fn fetch_profile(&self, handle: &str) -> Result<Option<String>> {
        let url = format!("{}/player/{handle}", self.api_base);
        let resp = self.client.get(&url).send().context("request failed")?;
        let status = resp.status();
        if status != StatusCode::OK {
            return Err(anyhow::anyhow!("http {status}"));
        }
        let body = resp.text().context("failed reading body")?;
        parse_profile_country(&body)
    }
}

impl ProfileSource for ChessComProfiles<'_> {
    fn lookup(&self, handle: &str) -> CountryLookup {
        match self.fetch_profile(handle) {
            Ok(Some(code)) => CountryLookup::Resolved(code),
            Ok(None) => CountryLookup::Unknown("profile has no country".to_string()),
            Err(err) => CountryLookup::Unknown(format!("{err:#}")),
        }
    }
}

/// Extracts the country code from a profile document. The `country` field
/// is a URL whose last path segment is the code.
pub fn parse_profile_country(raw: &str) -> Result<Option<String>> {
    let root: Value = serde_json::from_str(raw.trim()).context("invalid profile json")?;
    let Some(url) = root.get("country").and_then(Value::as_str) else {
        return Ok(None);
    };
    let code = url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .map(|s| s.trim().to_ascii_uppercase())
        .filter(|s| !s.is_empty());
    Ok(code)
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct CountryCacheFile {
    version: u32,
    entries: HashMap<String, String>,
}

/// Persistent handle -> country code map. Loaded once, saved once per run.
#[derive(Debug)]
pub struct CountryResolver {
    path: PathBuf,
    entries: HashMap<String, String>,
}

impl CountryResolver {
    /// Opens the cache at `path`. With `clear` set, the stored entries are
    /// ignored and the file is overwritten on the next save.
    pub fn open(path: impl Into<PathBuf>, clear: bool) -> Self {
        let path = path.into();
        let entries = if clear {
            info!(path = %path.display(), "country cache cleared");
            HashMap::new()
        } else {
            load_cache_file(&path)
        };
        Self { path, entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cached(&self, handle: &str) -> Option<&str> {
        self.entries.get(&handle.to_lowercase()).map(String::as_str)
    }

    /// Resolves every handle, looking up only cache misses, then persists
    /// the whole cache. The result has exactly one entry per requested handle.
    pub fn resolve<'h>(
        &mut self,
        source: &dyn ProfileSource,
        handles: impl IntoIterator<Item = &'h str>,
    ) -> Result<BTreeMap<String, String>, CacheError> {
        let wanted: BTreeSet<String> = handles.into_iter().map(str::to_lowercase).collect();
        let misses: Vec<&String> = wanted
            .iter()
            .filter(|h| !self.entries.contains_key(*h))
            .collect();

        if !misses.is_empty() {
            info!(
                total = wanted.len(),
                misses = misses.len(),
                "fetching opponent countries"
            );
        }
        for (i, handle) in misses.iter().enumerate() {
            if i % 10 == 0 {
                info!("country progress: {i}/{}", misses.len());
            }
            let lookup = source.lookup(handle);
            if let CountryLookup::Unknown(reason) = &lookup {
                debug!(handle = handle.as_str(), "country unknown: {reason}");
            }
            self.entries
                .insert((*handle).clone(), lookup.code().to_string());
        }

        self.save()?;

        Ok(wanted
            .into_iter()
            .map(|h| {
                let code = self
                    .entries
                    .get(&h)
                    .cloned()
                    .unwrap_or_else(|| UNKNOWN_CODE.to_string());
                (h, code)
            })
            .collect())
    }

    pub fn save(&self) -> Result<(), CacheError> {
        let file = CountryCacheFile {
            version: CACHE_VERSION,
            entries: self.entries.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|source| CacheError::Write {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|source| CacheError::Write {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &self.path).map_err(|source| CacheError::Write {
            path: self.path.clone(),
            source,
        })?;
        Ok(())
    }
}

fn load_cache_file(path: &Path) -> HashMap<String, String> {
    let Ok(raw) = fs::read_to_string(path) else {
        return HashMap::new();
    };
    match serde_json::from_str::<CountryCacheFile>(&raw) {
        Ok(cache) if cache.version == CACHE_VERSION => cache.entries,
        Ok(cache) => {
            warn!(version = cache.version, "ignoring country cache with old version");
            HashMap::new()
        }
        Err(err) => {
            warn!(path = %path.display(), "ignoring unreadable country cache: {err}");
            HashMap::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_country_is_last_url_segment() {
        let raw = r#"{"username":"x","country":"https://api.chess.com/pub/country/IL"}"#;
        assert_eq!(parse_profile_country(raw).unwrap().as_deref(), Some("IL"));
    }

    #[test]
    fn profile_without_country_is_none() {
        assert_eq!(parse_profile_country(r#"{"username":"x"}"#).unwrap(), None);
    }

    #[test]
    fn unknown_lookup_stores_sentinel() {
        let lookup = CountryLookup::Unknown("timeout".to_string());
        assert_eq!(lookup.code(), UNKNOWN_CODE);
        assert_eq!(convert_code(lookup.code()), UNKNOWN_COUNTRY);
    }
}
