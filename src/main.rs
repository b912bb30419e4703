use std::fs::OpenOptions;
use std::io;
use std::sync::{Mutex, mpsc};
use std::thread;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Bar, BarChart, BarGroup, Block, Borders, Paragraph, Wrap};
use tracing_subscriber::EnvFilter;

use chess_recap::config::{AppConfig, Theme};
use chess_recap::input::RunRequest;
use chess_recap::pipeline;
use chess_recap::report::{RateRow, Report};
use chess_recap::state::{AppState, Delta, Field, ReportTab, Screen, apply_delta};

struct App {
    state: AppState,
    cfg: AppConfig,
    should_quit: bool,
    tx: mpsc::Sender<Delta>,
}

impl App {
    fn new(cfg: AppConfig, tx: mpsc::Sender<Delta>) -> Self {
        Self {
            state: AppState::new(cfg.display.clone()),
            cfg,
            should_quit: false,
            tx,
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        match self.state.screen {
            Screen::Form => self.on_form_key(key),
            Screen::Report => self.on_report_key(key),
        }
    }

    fn on_form_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab | KeyCode::Down => self.state.focus_next(),
            KeyCode::BackTab | KeyCode::Up => self.state.focus_prev(),
            KeyCode::Backspace => self.state.backspace(),
            KeyCode::Enter => match self.state.focus {
                Field::ClearCache => self.state.toggle_clear_cache(),
                _ => self.start_run(),
            },
            KeyCode::Char(c) => self.state.input_char(c),
            _ => {}
        }
    }

    fn on_report_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('b') | KeyCode::Esc => self.state.back_to_form(),
            KeyCode::Right | KeyCode::Char('l') | KeyCode::Tab => self.state.next_tab(),
            KeyCode::Left | KeyCode::Char('h') | KeyCode::BackTab => self.state.prev_tab(),
            _ => {}
        }
    }

    fn start_run(&mut self) {
        let Some(req) = self.state.submit() else {
            return;
        };
        spawn_run(req, self.cfg.clone(), self.tx.clone());
    }
}

fn spawn_run(req: RunRequest, cfg: AppConfig, tx: mpsc::Sender<Delta>) {
    thread::spawn(move || {
        let progress_tx = tx.clone();
        let result = pipeline::run_with_chess_com(&req, &cfg, |progress| {
            let _ = progress_tx.send(Delta::Progress(progress));
        });
        let delta = match result {
            Ok(summary) => Delta::Finished(Box::new(summary)),
            Err(err) => Delta::Failed(format!("{err:#}")),
        };
        let _ = tx.send(delta);
    });
}

fn main() -> io::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let cfg = AppConfig::from_env();
    init_file_logging(&cfg);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let (tx, rx) = mpsc::channel();
    let mut app = App::new(cfg, tx);
    let res = run_app(&mut terminal, &mut app, rx);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

// The terminal owns stdout, so tracing output goes to a file next to the caches.
fn init_file_logging(cfg: &AppConfig) {
    if std::fs::create_dir_all(&cfg.data_dir).is_err() {
        return;
    }
    let Ok(file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(cfg.log_path())
    else {
        return;
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init();
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<Delta>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        while let Ok(delta) = rx.try_recv() {
            apply_delta(&mut app.state, delta);
        }

        terminal.draw(|f| ui(f, &app.state))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

struct Palette {
    base: Style,
    accent: Color,
    muted: Color,
    win: Color,
    draw: Color,
    loss: Color,
}

fn palette(theme: Theme) -> Palette {
    match theme {
        Theme::Dark => Palette {
            base: Style::default().fg(Color::White),
            accent: Color::Cyan,
            muted: Color::DarkGray,
            win: Color::Green,
            draw: Color::Yellow,
            loss: Color::Red,
        },
        Theme::Light => Palette {
            base: Style::default().fg(Color::Black).bg(Color::White),
            accent: Color::Blue,
            muted: Color::Gray,
            win: Color::Green,
            draw: Color::Rgb(255, 193, 7),
            loss: Color::Red,
        },
    }
}

fn ui(frame: &mut Frame, state: &AppState) {
    let pal = palette(state.display.theme);
    frame.render_widget(Block::default().style(pal.base), frame.size());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header = Paragraph::new(format!("  ♟  {}", state.display.title))
        .style(Style::default().fg(pal.accent).add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    match state.screen {
        Screen::Form => render_form(frame, chunks[1], state, &pal),
        Screen::Report => render_report(frame, chunks[1], state, &pal),
    }

    let footer = Paragraph::new(footer_text(state)).style(Style::default().fg(pal.muted));
    frame.render_widget(footer, chunks[2]);
}

fn footer_text(state: &AppState) -> &'static str {
    match state.screen {
        Screen::Form => "Tab/↑/↓ Move | Enter Run | Space Toggle | Esc Quit",
        Screen::Report => "←/→ Tab | b/Esc Form | q Quit",
    }
}

fn render_form(frame: &mut Frame, area: Rect, state: &AppState, pal: &Palette) {
    let fields = state.fields();
    let mut constraints: Vec<Constraint> = fields.iter().map(|_| Constraint::Length(3)).collect();
    constraints.push(Constraint::Length(2));
    constraints.push(Constraint::Min(3));
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    for (i, field) in fields.iter().enumerate() {
        let focused = *field == state.focus;
        let border = if focused {
            Style::default().fg(pal.accent)
        } else {
            Style::default().fg(pal.muted)
        };
        let text = match field {
            Field::ClearCache => {
                let mark = if state.clear_cache { "x" } else { " " };
                format!("[{mark}] refetch every opponent's country")
            }
            Field::Run => {
                if state.running {
                    "Running...".to_string()
                } else {
                    "Press Enter to run".to_string()
                }
            }
            other => {
                let value = state.field_value(*other).unwrap_or_default();
                if focused {
                    format!("{value}_")
                } else {
                    value.to_string()
                }
            }
        };
        let widget = Paragraph::new(text).block(
            Block::default()
                .title(field.label())
                .borders(Borders::ALL)
                .border_style(border),
        );
        frame.render_widget(widget, rows[i]);
    }

    let status_area = rows[fields.len()];
    if let Some(err) = &state.error {
        let status = Paragraph::new(err.as_str()).style(Style::default().fg(pal.loss));
        frame.render_widget(status, status_area);
    }

    let log_area = rows[fields.len() + 1];
    render_logs(frame, log_area, state, pal);
}

fn render_logs(frame: &mut Frame, area: Rect, state: &AppState, pal: &Palette) {
    let visible = area.height.saturating_sub(2) as usize;
    let start = state.logs.len().saturating_sub(visible);
    let lines: Vec<Line> = state
        .logs
        .iter()
        .skip(start)
        .map(|msg| {
            let color = if msg.starts_with("[WARN]") {
                pal.draw
            } else {
                pal.muted
            };
            Line::styled(msg.clone(), Style::default().fg(color))
        })
        .collect();
    let logs = Paragraph::new(lines)
        .block(Block::default().title("Log").borders(Borders::ALL))
        .wrap(Wrap { trim: true });
    frame.render_widget(logs, area);
}

fn render_report(frame: &mut Frame, area: Rect, state: &AppState, pal: &Palette) {
    let Some(summary) = &state.summary else {
        let empty = Paragraph::new("No report yet").style(Style::default().fg(pal.muted));
        frame.render_widget(empty, area);
        return;
    };
    let report = &summary.report;

    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(area);

    let tabs: Vec<Span> = ReportTab::ALL
        .iter()
        .flat_map(|tab| {
            let style = if *tab == state.tab {
                Style::default().fg(pal.accent).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(pal.muted)
            };
            [Span::styled(format!(" {} ", tab.label()), style), Span::raw("|")]
        })
        .collect();
    frame.render_widget(Paragraph::new(Line::from(tabs)), sections[0]);

    let body = sections[1];
    match state.tab {
        ReportTab::Overview => render_overview(frame, body, report, pal),
        ReportTab::Openings => render_top_bottom(
            frame,
            body,
            ("Top openings by win %", report.top_openings.as_slice()),
            ("Bottom openings by win %", report.bottom_openings.as_slice()),
            pal,
        ),
        ReportTab::Months => {
            let chart = rate_chart("Win rate by month", &report.months, pal.accent, 9);
            frame.render_widget(chart, body);
        }
        ReportTab::Hours => {
            let bars: Vec<Bar> = report
                .hours
                .iter()
                .map(|h| {
                    Bar::default()
                        .value(h.win_pct().round() as u64)
                        .label(Line::from(format!("{:02}", h.hour)))
                        .text_value(format!("{}/{}", h.wins, h.games))
                })
                .collect();
            let chart = BarChart::default()
                .block(Block::default().title("Win rate by hour (UTC)").borders(Borders::ALL))
                .data(BarGroup::default().bars(&bars))
                .bar_width(5)
                .bar_gap(1)
                .bar_style(Style::default().fg(pal.draw))
                .max(100);
            frame.render_widget(chart, body);
        }
        ReportTab::Opponents => render_opponents(frame, body, report, pal),
        ReportTab::Countries => render_top_bottom(
            frame,
            body,
            ("Top countries by win %", report.top_countries.as_slice()),
            ("Bottom countries by win %", report.bottom_countries.as_slice()),
            pal,
        ),
    }
}

fn render_overview(frame: &mut Frame, area: Rect, report: &Report, pal: &Palette) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    let total = report.total_games.max(1) as f64;
    let o = report.outcomes;
    let mut lines = vec![
        Line::from(format!("Total games: {}", report.total_games)),
        Line::from(format!("Wins:   {} ({:.1}%)", o.wins, o.wins as f64 * 100.0 / total)),
        Line::from(format!("Draws:  {} ({:.1}%)", o.draws, o.draws as f64 * 100.0 / total)),
        Line::from(format!("Losses: {} ({:.1}%)", o.losses, o.losses as f64 * 100.0 / total)),
        Line::from(""),
        Line::from(format!(
            "Longest win streak: {} games{}",
            report.longest_streak.length,
            report
                .longest_streak
                .month
                .map(|m| format!(" (in {m})"))
                .unwrap_or_default()
        )),
        Line::from(""),
    ];
    for row in &report.colors {
        lines.push(Line::from(format!(
            "As {}: {}/{} ({:.1}%)",
            row.label,
            row.wins,
            row.games,
            row.win_pct()
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from("Results:"));
    for (code, n) in &report.result_codes {
        lines.push(Line::from(format!("  {code:<20} {n}")));
    }
    let text = Paragraph::new(lines).block(Block::default().title("Summary").borders(Borders::ALL));
    frame.render_widget(text, cols[0]);

    let bars = [
        Bar::default()
            .value(o.wins as u64)
            .label(Line::from("Win"))
            .style(Style::default().fg(pal.win)),
        Bar::default()
            .value(o.draws as u64)
            .label(Line::from("Draw"))
            .style(Style::default().fg(pal.draw)),
        Bar::default()
            .value(o.losses as u64)
            .label(Line::from("Loss"))
            .style(Style::default().fg(pal.loss)),
    ];
    let chart = BarChart::default()
        .block(Block::default().title("Win vs Draw vs Loss").borders(Borders::ALL))
        .data(BarGroup::default().bars(&bars))
        .bar_width(8)
        .bar_gap(2);
    frame.render_widget(chart, cols[1]);
}

fn render_top_bottom(
    frame: &mut Frame,
    area: Rect,
    top: (&str, &[RateRow]),
    bottom: (&str, &[RateRow]),
    pal: &Palette,
) {
    let halves = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);
    if top.1.is_empty() {
        let empty = Paragraph::new("Not enough games to rank (see minimum sample settings)")
            .style(Style::default().fg(pal.muted));
        frame.render_widget(empty, area);
        return;
    }
    frame.render_widget(rate_chart(top.0, top.1, pal.win, 14), halves[0]);
    frame.render_widget(rate_chart(bottom.0, bottom.1, pal.loss, 14), halves[1]);
}

fn render_opponents(frame: &mut Frame, area: Rect, report: &Report, pal: &Palette) {
    let halves = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    let bars: Vec<Bar> = report
        .opponents
        .iter()
        .map(|o| {
            Bar::default()
                .value((o.win_rate() * 100.0).round() as u64)
                .label(Line::from(o.opponent.clone()))
                .text_value(format!("{}/{}", o.wins, o.games))
        })
        .collect();
    let chart = BarChart::default()
        .block(Block::default().title("Win rate vs most played opponents").borders(Borders::ALL))
        .data(BarGroup::default().bars(&bars))
        .bar_width(14)
        .bar_gap(2)
        .bar_style(Style::default().fg(pal.accent))
        .max(100);
    frame.render_widget(chart, halves[0]);

    let lines: Vec<Line> = report
        .opponents
        .iter()
        .map(|o| {
            let rating = o
                .avg_rating
                .map(|r| format!("{r:.0}"))
                .unwrap_or_else(|| "-".to_string());
            Line::from(format!(
                "{:<24} games {:>3}  wins {:>3}  avg rating {rating}",
                o.opponent, o.games, o.wins
            ))
        })
        .collect();
    let table = Paragraph::new(lines).block(Block::default().borders(Borders::ALL));
    frame.render_widget(table, halves[1]);
}

fn rate_chart<'a>(title: &'a str, rows: &[RateRow], color: Color, width: u16) -> BarChart<'a> {
    let bars: Vec<Bar> = rows
        .iter()
        .map(|r| {
            Bar::default()
                .value(r.win_pct().round() as u64)
                .label(Line::from(r.label.clone()))
                .text_value(format!("{}/{} ({:.1}%)", r.wins, r.games, r.win_pct()))
        })
        .collect();
    BarChart::default()
        .block(Block::default().title(title).borders(Borders::ALL))
        .data(BarGroup::default().bars(&bars))
        .bar_width(width)
        .bar_gap(2)
        .bar_style(Style::default().fg(color))
        .max(100)
}
