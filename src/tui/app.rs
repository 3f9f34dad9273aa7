use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};
use tracing::{debug, error, info};

use crate::app::{AppState, Knob};
use crate::error::TuiError;

use super::widgets::{knobs, loop_view};

/// Knob step for the left/right arrows
const FINE_STEP: f32 = 0.01;

/// Knob step for the up/down arrows
const COARSE_STEP: f32 = 0.1;

/// What a key press asks for
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Quit,
    Select(Knob),
    NextKnob,
    Nudge(f32),
    Centre,
    ToggleRecord,
}

/// Translate a key into an action
pub fn action_for_key(code: KeyCode) -> Option<Action> {
    match code {
        KeyCode::Char('q') | KeyCode::Esc => Some(Action::Quit),
        KeyCode::Tab => Some(Action::NextKnob),
        KeyCode::Char('1') => Some(Action::Select(Knob::LoopStart)),
        KeyCode::Char('2') => Some(Action::Select(Knob::LoopLength)),
        KeyCode::Char('3') => Some(Action::Select(Knob::Pitch)),
        KeyCode::Char('4') => Some(Action::Select(Knob::WetDry)),
        KeyCode::Left => Some(Action::Nudge(-FINE_STEP)),
        KeyCode::Right => Some(Action::Nudge(FINE_STEP)),
        KeyCode::Down => Some(Action::Nudge(-COARSE_STEP)),
        KeyCode::Up => Some(Action::Nudge(COARSE_STEP)),
        KeyCode::Char('c') => Some(Action::Centre),
        KeyCode::Char(' ') | KeyCode::Char('r') => Some(Action::ToggleRecord),
        _ => None,
    }
}

/// TUI application state
pub struct TuiApp {
    state: Arc<AppState>,
    terminal: Terminal<CrosstermBackend<Stdout>>,
    selected: Knob,
    buffer_seconds: u32,
    /// Where the audio comes from and goes to, for the header
    route: String,
    last_error: Option<String>,
}

impl TuiApp {
    /// Create a new TUI application
    pub fn new(state: Arc<AppState>, buffer_seconds: u32, route: String) -> Result<Self, TuiError> {
        // Set up terminal
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(Self {
            state,
            terminal,
            selected: Knob::LoopStart,
            buffer_seconds,
            route,
            last_error: None,
        })
    }

    /// Restore terminal state
    fn restore_terminal(&mut self) -> Result<(), TuiError> {
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }

    /// Show a message in the footer until the next one
    pub fn set_error(&mut self, message: String) {
        self.last_error = Some(message);
    }

    /// Draw the TUI
    pub fn draw(&mut self) -> Result<(), TuiError> {
        let knob_values = self.state.knobs();
        let reading = self.state.meter.read();
        let underruns = self.state.meter.underruns();
        let selected = self.selected;
        let buffer_seconds = self.buffer_seconds;
        let route = self.route.as_str();
        let last_error = self.last_error.as_deref();

        self.terminal.draw(|frame| {
            let area = frame.area();

            // Main layout: header, body, footer
            let main_chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(3), // Header
                    Constraint::Min(12),   // Body
                    Constraint::Length(3), // Footer
                ])
                .split(area);

            render_header(frame, main_chunks[0], knob_values.record, route);

            // Body layout: knobs (40%) + loop view (60%)
            let body_chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
                .split(main_chunks[1]);

            knobs::render(frame, body_chunks[0], &knob_values, selected, buffer_seconds);
            loop_view::render(frame, body_chunks[1], &reading, underruns);

            render_footer(frame, main_chunks[2], last_error);
        })?;

        Ok(())
    }

    /// Handle keyboard input (non-blocking). Returns true when quitting.
    pub fn handle_input(&mut self) -> Result<bool, TuiError> {
        // Poll for events with a short timeout
        if !event::poll(Duration::from_millis(10))? {
            return Ok(false);
        }

        let Event::Key(key) = event::read()? else {
            return Ok(false);
        };
        if key.kind != KeyEventKind::Press {
            return Ok(false);
        }

        let Some(action) = action_for_key(key.code) else {
            return Ok(false);
        };

        match action {
            Action::Quit => {
                info!("Quit requested");
                self.state.quit();
                return Ok(true);
            }
            Action::Select(knob) => self.selected = knob,
            Action::NextKnob => self.selected = self.selected.next(),
            Action::Nudge(delta) => {
                let knob = self.selected;
                self.state.update_knobs(|knobs| knobs.nudge(knob, delta));
                debug!(knob = knob.label(), value = self.state.knobs().get(knob), "Knob turned");
            }
            Action::Centre => {
                let knob = self.selected;
                self.state.update_knobs(|knobs| knobs.set(knob, 0.5));
            }
            Action::ToggleRecord => {
                self.state.update_knobs(|knobs| knobs.toggle_record());
                info!(recording = self.state.knobs().record, "Record switch");
            }
        }
        self.last_error = None;

        Ok(false)
    }

    /// Run cleanup on drop
    pub fn cleanup(&mut self) {
        if let Err(e) = self.restore_terminal() {
            error!(error = %e, "Failed to restore terminal");
        }
    }
}

impl Drop for TuiApp {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Render the header bar
fn render_header(frame: &mut Frame, area: Rect, recording: bool, route: &str) {
    let status_text = if recording {
        ("REC", Color::Red)
    } else {
        ("PLAY", Color::Green)
    };

    let title = Line::from(vec![
        Span::styled(" tapeloop ", Style::default().bold().fg(Color::Cyan)),
        Span::raw("| "),
        Span::styled(status_text.0, Style::default().fg(status_text.1)),
        Span::raw(" | "),
        Span::styled(route, Style::default().fg(Color::Gray)),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(Style::default().fg(Color::DarkGray));

    let paragraph = Paragraph::new(title).block(block).centered();
    frame.render_widget(paragraph, area);
}

/// Render the footer with controls
fn render_footer(frame: &mut Frame, area: Rect, error: Option<&str>) {
    let controls = if let Some(err) = error {
        Line::from(vec![
            Span::styled("Error: ", Style::default().fg(Color::Red)),
            Span::styled(err, Style::default().fg(Color::Red)),
        ])
    } else {
        Line::from(vec![
            Span::styled("q", Style::default().fg(Color::Yellow)),
            Span::raw(":quit  "),
            Span::styled("space", Style::default().fg(Color::Yellow)),
            Span::raw(":record  "),
            Span::styled("tab/1-4", Style::default().fg(Color::Yellow)),
            Span::raw(":knob  "),
            Span::styled("\u{2190}/\u{2192}", Style::default().fg(Color::Yellow)),
            Span::raw(":fine  "),
            Span::styled("\u{2193}/\u{2191}", Style::default().fg(Color::Yellow)),
            Span::raw(":coarse  "),
            Span::styled("c", Style::default().fg(Color::Yellow)),
            Span::raw(":centre"),
        ])
    };

    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(Style::default().fg(Color::DarkGray));

    let paragraph = Paragraph::new(controls).block(block).centered();
    frame.render_widget(paragraph, area);
}
