#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Result, anyhow};

use chess_recap::archive_fetch::{ArchiveSource, MonthResponse};
use chess_recap::country::{CountryLookup, ProfileSource};

static DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

pub fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

/// Fresh, empty directory under the system temp dir.
pub fn scratch_dir(label: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let n = DIR_COUNTER.fetch_add(1, Ordering::SeqCst);
    let dir = std::env::temp_dir().join(format!(
        "chess_recap_{label}_{}_{nanos}_{n}",
        std::process::id()
    ));
    fs::create_dir_all(&dir).expect("scratch dir should be creatable");
    dir
}

/// Serves canned month bodies and counts every request.
#[derive(Default)]
pub struct FakeArchives {
    pub months: HashMap<(i32, u32), MonthResponse>,
    pub calls: Cell<usize>,
    /// Number of leading requests that fail at the transport level.
    pub transport_failures: Cell<usize>,
}

impl FakeArchives {
    pub fn with_month(mut self, year: i32, month: u32, response: MonthResponse) -> Self {
        self.months.insert((year, month), response);
        self
    }
}

impl ArchiveSource for FakeArchives {
    fn fetch_month(&self, _username: &str, year: i32, month: u32) -> Result<MonthResponse> {
        self.calls.set(self.calls.get() + 1);
        let pending = self.transport_failures.get();
        if pending > 0 {
            self.transport_failures.set(pending - 1);
            return Err(anyhow!("connection reset"));
        }
        Ok(self
            .months
            .get(&(year, month))
            .cloned()
            .unwrap_or(MonthResponse::Status(404)))
    }
}

/// Answers from a fixed handle -> code table; anything else is unknown.
#[derive(Default)]
pub struct FakeProfiles {
    pub countries: HashMap<String, String>,
    pub calls: RefCell<Vec<String>>,
}

impl FakeProfiles {
    pub fn with(pairs: &[(&str, &str)]) -> Self {
        Self {
            countries: pairs
                .iter()
                .map(|(h, c)| (h.to_string(), c.to_string()))
                .collect(),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl ProfileSource for FakeProfiles {
    fn lookup(&self, handle: &str) -> CountryLookup {
        self.calls.borrow_mut().push(handle.to_string());
        match self.countries.get(handle) {
            Some(code) => CountryLookup::Resolved(code.clone()),
            None => CountryLookup::Unknown("status 404".to_string()),
        }
    }
}
