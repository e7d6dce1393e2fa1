use std::io;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Terminal;
use tracing::debug;

use crate::core::error::BlancError;
use crate::core::filter::{sort_jobs, status_counts, JobFilter, SortKey};
use crate::core::formatter::{format_change, format_counts, format_job_detail, format_job_row};
use crate::core::job::Job;
use crate::core::lifecycle::change_status;
use crate::core::store::JobStore;

fn terminal_error(e: io::Error) -> BlancError {
    BlancError::Terminal {
        message: e.to_string(),
    }
}

struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> Result<Self, BlancError> {
        enable_raw_mode().map_err(terminal_error)?;
        let mut stdout = io::stdout();
        stdout.execute(EnterAlternateScreen).map_err(terminal_error)?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let mut stdout = io::stdout();
        let _ = stdout.execute(LeaveAlternateScreen);
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Toast {
    message: String,
    is_error: bool,
}

#[derive(Debug)]
struct AppState {
    jobs: Vec<Job>,
    /// Indices into `jobs` after filtering and sorting.
    visible: Vec<usize>,
    selected: usize,
    filter: JobFilter,
    sort: SortKey,
    search_input: Option<String>,
    toast: Option<Toast>,
    should_quit: bool,
}

impl AppState {
    fn new(jobs: Vec<Job>) -> Self {
        let mut app = Self {
            jobs,
            visible: Vec::new(),
            selected: 0,
            filter: JobFilter {
                include_unknown: true,
                ..JobFilter::default()
            },
            sort: SortKey::Scheduled,
            search_input: None,
            toast: None,
            should_quit: false,
        };
        app.refresh_view();
        app
    }

    fn refresh_view(&mut self) {
        let selected_id = self.selected_job().map(|job| job.id.clone());
        let mut view = self.filter.apply(&self.jobs);
        sort_jobs(&mut view, self.sort, false);
        let order: Vec<String> = view.iter().map(|job| job.id.clone()).collect();
        self.visible = order
            .iter()
            .filter_map(|id| self.jobs.iter().position(|job| &job.id == id))
            .collect();

        self.selected = selected_id
            .and_then(|id| self.visible.iter().position(|idx| self.jobs[*idx].id == id))
            .unwrap_or(0);
        if self.selected >= self.visible.len() {
            self.selected = self.visible.len().saturating_sub(1);
        }
    }

    fn selected_job(&self) -> Option<&Job> {
        self.visible.get(self.selected).map(|idx| &self.jobs[*idx])
    }

    fn move_selection(&mut self, delta: isize) {
        if self.visible.is_empty() {
            return;
        }
        let last = self.visible.len() - 1;
        let next = self.selected as isize + delta;
        self.selected = next.clamp(0, last as isize) as usize;
    }

    fn cycle_sort(&mut self) {
        self.sort = match self.sort {
            SortKey::Id => SortKey::Customer,
            SortKey::Customer => SortKey::Scheduled,
            SortKey::Scheduled => SortKey::Status,
            SortKey::Status => SortKey::Id,
        };
        self.refresh_view();
    }

    fn set_toast(&mut self, message: impl Into<String>, is_error: bool) {
        self.toast = Some(Toast {
            message: message.into(),
            is_error,
        });
    }

    fn reload(&mut self, store: &dyn JobStore) {
        match store.list() {
            Ok(jobs) => {
                debug!(count = jobs.len(), "board reloaded");
                self.jobs = jobs;
                self.refresh_view();
            }
            Err(err) => self.set_toast(format!("reload failed: {err}"), true),
        }
    }

    /// Applies the `choice`-th (1-based) offered transition of the selected job.
    fn apply_choice(&mut self, store: &dyn JobStore, choice: usize) {
        let Some(idx) = self.visible.get(self.selected).copied() else {
            return;
        };
        let offered = self.jobs[idx].next_statuses();
        let Some(target) = choice.checked_sub(1).and_then(|i| offered.get(i)).copied() else {
            self.set_toast(format!("no transition [{choice}] for this job"), true);
            return;
        };

        match change_status(store, &mut self.jobs[idx], target) {
            Ok(change) => {
                self.set_toast(format_change(&change), false);
                self.refresh_view();
            }
            Err(err) if err.is_store_rejection() => {
                self.set_toast(format!("rejected: {err}"), true);
                self.reload(store);
            }
            Err(err) => self.set_toast(err.to_string(), true),
        }
    }

    fn handle_key(&mut self, store: &dyn JobStore, key: KeyEvent) {
        // Terminals with enhanced keyboard reporting also send release and repeat events.
        if key.kind != KeyEventKind::Press {
            return;
        }

        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        if let Some(input) = self.search_input.as_mut() {
            match key.code {
                KeyCode::Char(ch) => input.push(ch),
                KeyCode::Backspace => {
                    input.pop();
                }
                KeyCode::Enter => {
                    let query = input.trim().to_string();
                    self.filter.search = if query.is_empty() { None } else { Some(query) };
                    self.search_input = None;
                    self.refresh_view();
                }
                KeyCode::Esc => {
                    self.search_input = None;
                }
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),
            KeyCode::PageUp => self.move_selection(-10),
            KeyCode::PageDown => self.move_selection(10),
            KeyCode::Home => self.selected = 0,
            KeyCode::End => self.selected = self.visible.len().saturating_sub(1),
            KeyCode::Char('/') => {
                self.search_input = Some(self.filter.search.clone().unwrap_or_default());
            }
            KeyCode::Char('s') => self.cycle_sort(),
            KeyCode::Char('r') => self.reload(store),
            KeyCode::Char(ch) if ch.is_ascii_digit() && ch != '0' => {
                let choice = ch.to_digit(10).unwrap_or(0) as usize;
                self.apply_choice(store, choice);
            }
            _ => {}
        }
    }
}

pub fn run(store: &dyn JobStore) -> Result<(), BlancError> {
    let jobs = store.list()?;
    let _guard = TerminalGuard::enter()?;
    let stdout = io::stdout();
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).map_err(terminal_error)?;

    let mut app = AppState::new(jobs);

    loop {
        terminal
            .draw(|frame| {
                let layout = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([
                        Constraint::Length(4),
                        Constraint::Min(5),
                        Constraint::Length(3),
                    ])
                    .split(frame.size());

                frame.render_widget(render_header(&app), layout[0]);

                let body = Layout::default()
                    .direction(Direction::Horizontal)
                    .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
                    .split(layout[1]);
                frame.render_widget(render_jobs(&app, body[0].height as usize), body[0]);
                frame.render_widget(render_detail(&app), body[1]);

                frame.render_widget(render_footer(&app), layout[2]);
                if let Some(input) = &app.search_input {
                    frame.set_cursor(layout[2].x + 9 + input.len() as u16, layout[2].y + 1);
                }
            })
            .map_err(terminal_error)?;

        if event::poll(Duration::from_millis(100)).map_err(terminal_error)? {
            if let Event::Key(key) = event::read().map_err(terminal_error)? {
                app.handle_key(store, key);
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

fn render_header(app: &AppState) -> Paragraph<'static> {
    let counts = format_counts(&status_counts(&app.jobs));
    let search = app.filter.search.as_deref().unwrap_or("-");
    let text = vec![
        Line::from(counts),
        Line::from(format!(
            "showing {} | sort={:?} | search={search}",
            app.visible.len(),
            app.sort
        )),
    ];

    Paragraph::new(text)
        .block(Block::default().title("blanc").borders(Borders::ALL))
        .wrap(Wrap { trim: true })
}

fn render_jobs(app: &AppState, height: usize) -> Paragraph<'static> {
    let max_lines = height.saturating_sub(2).max(1);
    let start = app.selected.saturating_sub(max_lines.saturating_sub(1));
    let lines: Vec<Line> = app
        .visible
        .iter()
        .enumerate()
        .skip(start)
        .take(max_lines)
        .map(|(pos, idx)| {
            let row = format_job_row(&app.jobs[*idx]);
            if pos == app.selected {
                Line::from(Span::styled(
                    format!("> {row}"),
                    Style::default().add_modifier(Modifier::REVERSED),
                ))
            } else {
                Line::from(format!("  {row}"))
            }
        })
        .collect();

    Paragraph::new(lines).block(Block::default().title("Jobs").borders(Borders::ALL))
}

fn render_detail(app: &AppState) -> Paragraph<'static> {
    let lines: Vec<Line> = match app.selected_job() {
        Some(job) => format_job_detail(job).into_iter().map(Line::from).collect(),
        None => vec![Line::from("No jobs match the current filter.")],
    };

    Paragraph::new(lines)
        .block(Block::default().title("Detail").borders(Borders::ALL))
        .wrap(Wrap { trim: false })
}

fn render_footer(app: &AppState) -> Paragraph<'static> {
    let text = if let Some(input) = &app.search_input {
        format!("search: {input}")
    } else if let Some(toast) = &app.toast {
        if toast.is_error {
            format!("error: {}", toast.message)
        } else {
            toast.message.clone()
        }
    } else {
        "[1-9] move  [/] search  [s] sort  [r] reload  [q] quit".to_string()
    };

    Paragraph::new(text).block(Block::default().borders(Borders::ALL))
}
