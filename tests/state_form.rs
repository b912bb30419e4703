use chess_recap::archive_fetch::FetchSummary;
use chess_recap::config::{DisplayOptions, ReportConfig};
use chess_recap::input::RunRequest;
use chess_recap::normalize::NormalizeStats;
use chess_recap::pipeline::{RunProgress, RunSummary, Stage};
use chess_recap::report::build_report;
use chess_recap::state::{AppState, Delta, Field, ReportTab, Screen, apply_delta};

fn filled_state() -> AppState {
    let mut state = AppState::new(DisplayOptions::default());
    state.username = "hikaru".to_string();
    state.year = "2024".to_string();
    state.months = "1,2".to_string();
    state
}

fn empty_summary() -> RunSummary {
    RunSummary {
        request: RunRequest {
            username: "hikaru".to_string(),
            year: 2024,
            months: vec![1],
            clear_cache: false,
        },
        fetch: FetchSummary::default(),
        normalize: NormalizeStats::default(),
        records: Vec::new(),
        report: build_report(&[], &ReportConfig::default()),
        export: None,
    }
}

#[test]
fn invalid_year_blocks_submit() {
    let mut state = filled_state();
    state.year = "20x4".to_string();

    assert!(state.submit().is_none());
    assert!(!state.running);
    let err = state.error.as_deref().unwrap_or_default();
    assert!(err.starts_with("Error:"), "{err}");
}

#[test]
fn valid_form_starts_a_run() {
    let mut state = filled_state();
    state.clear_cache = true;

    let req = state.submit().expect("form is valid");
    assert_eq!(req.months, vec![1, 2]);
    assert!(req.clear_cache);
    assert!(state.running);
    assert!(state.submit().is_none(), "no second run while one is active");
}

#[test]
fn hidden_toggle_never_clears_cache() {
    let display = DisplayOptions {
        show_clear_cache: false,
        ..DisplayOptions::default()
    };
    let mut state = AppState::new(display);
    assert!(!state.fields().contains(&Field::ClearCache));

    state.username = "hikaru".to_string();
    state.clear_cache = true;
    let req = state.submit().unwrap();
    assert!(!req.clear_cache);
}

#[test]
fn typing_edits_the_focused_field() {
    let mut state = AppState::new(DisplayOptions::default());
    for c in "magnus".chars() {
        state.input_char(c);
    }
    state.backspace();
    assert_eq!(state.username, "magnu");

    state.focus_prev();
    assert_eq!(state.focus, Field::Run);
    state.focus_prev();
    assert_eq!(state.focus, Field::ClearCache);
    state.input_char(' ');
    assert!(state.clear_cache);
}

#[test]
fn empty_result_stays_on_form() {
    let mut state = filled_state();
    state.submit().unwrap();
    apply_delta(&mut state, Delta::Finished(Box::new(empty_summary())));

    assert!(!state.running);
    assert_eq!(state.screen, Screen::Form);
    assert!(state.error.is_some());
}

#[test]
fn failure_and_progress_are_logged() {
    let mut state = filled_state();
    state.submit().unwrap();
    apply_delta(
        &mut state,
        Delta::Progress(RunProgress {
            stage: Stage::Fetching,
            message: "Downloaded: 2024-01".to_string(),
            warning: false,
        }),
    );
    apply_delta(&mut state, Delta::Failed("disk full".to_string()));

    assert!(!state.running);
    assert_eq!(state.error.as_deref(), Some("Error: disk full"));
    assert!(state.logs.iter().any(|l| l == "[INFO] Downloaded: 2024-01"));
    assert_eq!(state.logs.back().map(String::as_str), Some("[WARN] disk full"));
}

#[test]
fn tabs_wrap_around() {
    let mut state = AppState::new(DisplayOptions::default());
    state.prev_tab();
    assert_eq!(state.tab, ReportTab::Countries);
    state.next_tab();
    assert_eq!(state.tab, ReportTab::Overview);
}
