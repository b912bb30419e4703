use std::collections::VecDeque;

use chrono::{Datelike, Utc};

use crate::config::DisplayOptions;
use crate::input::{RunRequest, parse_run_request};
use crate::pipeline::{RunProgress, RunSummary};

const MAX_LOGS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Username,
    Year,
    Months,
    ClearCache,
    Run,
}

impl Field {
    pub fn label(self) -> &'static str {
        match self {
            Field::Username => "Chess.com username",
            Field::Year => "Year",
            Field::Months => "Months (comma-separated, e.g. 1,2,3)",
            Field::ClearCache => "Clear country cache",
            Field::Run => "Run Analysis",
        }
    }

    pub fn is_text(self) -> bool {
        matches!(self, Field::Username | Field::Year | Field::Months)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Form,
    Report,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportTab {
    Overview,
    Openings,
    Months,
    Hours,
    Opponents,
    Countries,
}

impl ReportTab {
    pub const ALL: [ReportTab; 6] = [
        ReportTab::Overview,
        ReportTab::Openings,
        ReportTab::Months,
        ReportTab::Hours,
        ReportTab::Opponents,
        ReportTab::Countries,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ReportTab::Overview => "Overview",
            ReportTab::Openings => "Openings",
            ReportTab::Months => "Months",
            ReportTab::Hours => "Hours",
            ReportTab::Opponents => "Opponents",
            ReportTab::Countries => "Countries",
        }
    }

    fn index(self) -> usize {
        Self::ALL.iter().position(|t| *t == self).unwrap_or(0)
    }
}

/// Messages from the pipeline worker thread.
#[derive(Debug)]
pub enum Delta {
    Progress(RunProgress),
    Finished(Box<RunSummary>),
    Failed(String),
}

#[derive(Debug)]
pub struct AppState {
    pub display: DisplayOptions,
    pub username: String,
    pub year: String,
    pub months: String,
    pub clear_cache: bool,
    pub focus: Field,
    pub screen: Screen,
    pub tab: ReportTab,
    pub running: bool,
    pub error: Option<String>,
    pub logs: VecDeque<String>,
    pub summary: Option<RunSummary>,
}

impl AppState {
    pub fn new(display: DisplayOptions) -> Self {
        Self {
            display,
            username: String::new(),
            year: Utc::now().year().to_string(),
            months: "1,2,3".to_string(),
            clear_cache: false,
            focus: Field::Username,
            screen: Screen::Form,
            tab: ReportTab::Overview,
            running: false,
            error: None,
            logs: VecDeque::new(),
            summary: None,
        }
    }

    /// Focusable fields in display order. The cache toggle is hidden when the
    /// display options say so.
    pub fn fields(&self) -> Vec<Field> {
        let mut fields = vec![Field::Username, Field::Year, Field::Months];
        if self.display.show_clear_cache {
            fields.push(Field::ClearCache);
        }
        fields.push(Field::Run);
        fields
    }

    pub fn focus_next(&mut self) {
        let fields = self.fields();
        let idx = fields.iter().position(|f| *f == self.focus).unwrap_or(0);
        self.focus = fields[(idx + 1) % fields.len()];
    }

    pub fn focus_prev(&mut self) {
        let fields = self.fields();
        let idx = fields.iter().position(|f| *f == self.focus).unwrap_or(0);
        self.focus = fields[(idx + fields.len() - 1) % fields.len()];
    }

    pub fn field_value(&self, field: Field) -> Option<&str> {
        match field {
            Field::Username => Some(&self.username),
            Field::Year => Some(&self.year),
            Field::Months => Some(&self.months),
            Field::ClearCache | Field::Run => None,
        }
    }

    fn field_mut(&mut self, field: Field) -> Option<&mut String> {
        match field {
            Field::Username => Some(&mut self.username),
            Field::Year => Some(&mut self.year),
            Field::Months => Some(&mut self.months),
            Field::ClearCache | Field::Run => None,
        }
    }

    pub fn input_char(&mut self, c: char) {
        if self.running {
            return;
        }
        let focus = self.focus;
        if focus == Field::ClearCache {
            if c == ' ' {
                self.toggle_clear_cache();
            }
            return;
        }
        if let Some(value) = self.field_mut(focus) {
            value.push(c);
        }
    }

    pub fn backspace(&mut self) {
        if self.running {
            return;
        }
        let focus = self.focus;
        if let Some(value) = self.field_mut(focus) {
            value.pop();
        }
    }

    pub fn toggle_clear_cache(&mut self) {
        if self.display.show_clear_cache && !self.running {
            self.clear_cache = !self.clear_cache;
        }
    }

    /// Validates the form. Returns the request to run, or records the error
    /// message and returns `None`.
    pub fn submit(&mut self) -> Option<RunRequest> {
        if self.running {
            return None;
        }
        let clear = self.display.show_clear_cache && self.clear_cache;
        match parse_run_request(&self.username, &self.year, &self.months, clear) {
            Ok(req) => {
                self.error = None;
                self.running = true;
                self.push_log(format!(
                    "[INFO] Starting analysis for {} ({})",
                    req.username, req.year
                ));
                Some(req)
            }
            Err(err) => {
                let msg = format!("Error: {err}");
                self.push_log(format!("[WARN] {msg}"));
                self.error = Some(msg);
                None
            }
        }
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    pub fn next_tab(&mut self) {
        let idx = self.tab.index();
        self.tab = ReportTab::ALL[(idx + 1) % ReportTab::ALL.len()];
    }

    pub fn prev_tab(&mut self) {
        let idx = self.tab.index();
        let len = ReportTab::ALL.len();
        self.tab = ReportTab::ALL[(idx + len - 1) % len];
    }

    pub fn back_to_form(&mut self) {
        self.screen = Screen::Form;
    }
}

pub fn apply_delta(state: &mut AppState, delta: Delta) {
    match delta {
        Delta::Progress(progress) => {
            let level = if progress.warning { "WARN" } else { "INFO" };
            state.push_log(format!("[{level}] {}", progress.message));
        }
        Delta::Finished(summary) => {
            state.running = false;
            if summary.report.no_data {
                state.error = Some("No games found for that username and period".to_string());
            } else {
                state.error = None;
                state.screen = Screen::Report;
                state.tab = ReportTab::Overview;
            }
            if let Some(export) = &summary.export {
                state.push_log(format!("[INFO] Saved {}", export.path.display()));
            }
            state.summary = Some(*summary);
        }
        Delta::Failed(msg) => {
            state.running = false;
            state.push_log(format!("[WARN] {msg}"));
            state.error = Some(format!("Error: {msg}"));
        }
    }
}
