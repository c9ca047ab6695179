use std::path::PathBuf;
use std::time::Duration;

use agentflow_config::{AgentProfile, AppConfig};
use agentflow_runtime::{
    ClientEvent, EventKind, EvidenceBoard, ReportFormat, RunState, WorkflowSession, export_report,
};
use chrono::{Local, Utc};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Paragraph},
};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tui_textarea::TextArea;

use crate::events::AppEvent;
use crate::theme::Theme;
use crate::widgets::{
    agents::draw_agents,
    evidence::{draw_evidence, draw_evidence_popup},
    input::draw_input,
    log::{LogView, draw_log},
    nav::draw_nav,
    output::draw_output,
};

const PAGE: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiCommand {
    Quit,
    Submit(String),
    Export(ReportFormat),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Input,
    Evidence,
    Log,
}

#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub status: String,
    pub focus: Focus,
    pub show_sidebar: bool,
    pub show_navbar: bool,
    pub show_evidence: bool,
    /// Log lines scrolled up from the newest entry; 0 follows the tail.
    pub log_scroll: usize,
    pub evidence_cursor: usize,
    /// Rows the log panel showed on the last draw.
    pub log_rows: usize,
    pub stalled: bool,
    pub tick: usize,
}

pub struct App {
    pub state: AppState,
    pub session: WorkflowSession,
    pub events_rx: mpsc::UnboundedReceiver<ClientEvent>,
    pub evidence: EvidenceBoard,
    roster: Vec<AgentProfile>,
    theme: Theme,
    textarea: TextArea<'static>,
    endpoint: String,
    step_timeout: Option<Duration>,
    reports_dir: PathBuf,
}

fn new_textarea() -> TextArea<'static> {
    let mut textarea = TextArea::default();
    textarea.set_placeholder_text("Describe the task for the agents…");
    textarea.set_cursor_line_style(Style::default());
    textarea
}

impl App {
    pub fn new(
        config: &AppConfig,
        session: WorkflowSession,
        events_rx: mpsc::UnboundedReceiver<ClientEvent>,
    ) -> Self {
        let evidence = if config.ui.sample_evidence {
            EvidenceBoard::with_samples()
        } else {
            EvidenceBoard::new()
        };
        Self {
            state: AppState {
                status: format!("connecting to {}", config.backend.url),
                show_sidebar: config.ui.show_sidebar,
                show_navbar: config.ui.show_navbar,
                show_evidence: config.ui.show_evidence,
                ..AppState::default()
            },
            session,
            events_rx,
            evidence,
            roster: config.agents.clone(),
            theme: Theme::from_config(&config.ui.theme),
            textarea: new_textarea(),
            endpoint: config.backend.url.clone(),
            step_timeout: config.backend.step_timeout(),
            reports_dir: PathBuf::from(&config.ui.reports_dir),
        }
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.state.status = status.into();
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn prompt_text(&self) -> String {
        self.textarea.lines().join("\n")
    }

    pub fn update(&mut self, event: AppEvent) -> Option<UiCommand> {
        match event {
            AppEvent::Key(key) => self.handle_key(key),
            AppEvent::Mouse(mouse) => {
                self.handle_mouse(mouse);
                None
            }
            AppEvent::Client(event) => {
                self.apply_client_event(event);
                None
            }
            AppEvent::Tick => {
                self.state.tick = self.state.tick.wrapping_add(1);
                self.check_stall();
                None
            }
            AppEvent::Resize(_, _) => None,
        }
    }

    /// Carry out a command produced by [`App::update`].  Returns `false`
    /// once the dashboard should exit.
    pub fn execute(&mut self, command: UiCommand) -> bool {
        match command {
            UiCommand::Quit => return false,
            UiCommand::Submit(prompt) => match self.session.submit_run(&prompt) {
                Ok(run_id) if self.session.state().is_processing() => {
                    info!(%run_id, "workflow submitted");
                    self.textarea = new_textarea();
                    self.state.log_scroll = 0;
                    self.state.stalled = false;
                    self.set_status("workflow started");
                }
                Ok(run_id) => {
                    let reason = self
                        .session
                        .state()
                        .connection_error()
                        .unwrap_or("connection closed")
                        .to_string();
                    warn!(%run_id, %reason, "workflow request not delivered");
                    self.set_status(format!("workflow request not delivered: {reason}"));
                }
                Err(rejection) => self.set_status(format!("cannot start workflow: {rejection}")),
            },
            UiCommand::Export(format) => {
                let output = self.session.state().final_output().to_string();
                match export_report(&output, &self.reports_dir, format, Local::now()) {
                    Ok(path) => self.set_status(format!("report saved to {}", path.display())),
                    Err(err) => {
                        warn!(?format, error = %err, "report export failed");
                        self.set_status(format!("export failed: {err}"));
                    }
                }
            }
        }
        true
    }

    fn apply_client_event(&mut self, event: ClientEvent) {
        match &event {
            ClientEvent::Connected => self.set_status(format!("connected to {}", self.endpoint)),
            ClientEvent::Disconnected if self.session.state().is_connected() => {
                self.set_status("connection lost, reconnecting");
            }
            ClientEvent::SendFailed(reason) => {
                self.set_status(format!("workflow request not delivered: {reason}"));
            }
            ClientEvent::Inbound(inbound) => {
                if self.evidence.record(inbound) {
                    self.set_status("new evidence found");
                }
                match inbound.kind {
                    EventKind::WorkflowComplete { .. } => {
                        self.set_status("workflow complete (Ctrl+O to export)");
                    }
                    EventKind::Error => self.set_status("workflow failed"),
                    _ => {}
                }
            }
            _ => {}
        }
        self.session.apply(event);
    }

    fn check_stall(&mut self) {
        let stalled = self
            .step_timeout
            .is_some_and(|timeout| self.session.state().is_stalled(Utc::now(), timeout));
        if stalled && !self.state.stalled {
            warn!(
                run_id = ?self.session.state().run_id(),
                "no workflow activity within the step timeout"
            );
        }
        self.state.stalled = stalled;
    }

    fn handle_key(&mut self, key: KeyEvent) -> Option<UiCommand> {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('c') => return Some(UiCommand::Quit),
                KeyCode::Char('t') => {
                    self.theme = self.theme.toggled();
                    self.set_status(format!("theme: {}", self.theme.name.as_str()));
                    return None;
                }
                KeyCode::Char('b') => {
                    self.state.show_sidebar = !self.state.show_sidebar;
                    return None;
                }
                KeyCode::Char('n') => {
                    self.state.show_navbar = !self.state.show_navbar;
                    return None;
                }
                KeyCode::Char('e') => {
                    self.state.show_evidence = !self.state.show_evidence;
                    if !self.state.show_evidence {
                        self.evidence.close();
                        if self.state.focus == Focus::Evidence {
                            self.state.focus = Focus::Input;
                        }
                    }
                    return None;
                }
                KeyCode::Char('o') => return Some(UiCommand::Export(ReportFormat::Markdown)),
                KeyCode::Char('p') => return Some(UiCommand::Export(ReportFormat::Pdf)),
                _ => {}
            }
        }

        if self.evidence.selected().is_some() {
            if matches!(key.code, KeyCode::Esc | KeyCode::Enter) {
                self.evidence.close();
            }
            return None;
        }

        if key.code == KeyCode::Tab {
            self.state.focus = self.next_focus();
            return None;
        }

        match self.state.focus {
            Focus::Input => {
                if key.code == KeyCode::Enter && !key.modifiers.contains(KeyModifiers::SHIFT) {
                    return Some(UiCommand::Submit(self.prompt_text()));
                }
                self.textarea.input(key);
            }
            Focus::Evidence => match key.code {
                KeyCode::Up => {
                    self.state.evidence_cursor = self.state.evidence_cursor.saturating_sub(1);
                }
                KeyCode::Down => {
                    let last = self.evidence.len().saturating_sub(1);
                    self.state.evidence_cursor = (self.state.evidence_cursor + 1).min(last);
                }
                KeyCode::Enter => {
                    self.evidence.show(self.state.evidence_cursor);
                }
                KeyCode::Esc => self.state.focus = Focus::Input,
                _ => {}
            },
            Focus::Log => match key.code {
                KeyCode::Up => self.scroll_log_up(1),
                KeyCode::Down => self.scroll_log_down(1),
                KeyCode::PageUp => self.scroll_log_up(PAGE),
                KeyCode::PageDown => self.scroll_log_down(PAGE),
                KeyCode::End => self.state.log_scroll = 0,
                KeyCode::Esc => self.state.focus = Focus::Input,
                _ => {}
            },
        }
        None
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::ScrollUp => self.scroll_log_up(3),
            MouseEventKind::ScrollDown => self.scroll_log_down(3),
            _ => {}
        }
    }

    fn next_focus(&self) -> Focus {
        match self.state.focus {
            Focus::Input if self.state.show_evidence => Focus::Evidence,
            Focus::Input | Focus::Evidence => Focus::Log,
            Focus::Log => Focus::Input,
        }
    }

    fn scroll_log_up(&mut self, lines: usize) {
        let max = self
            .session
            .state()
            .log()
            .len()
            .saturating_sub(self.state.log_rows.max(1));
        self.state.log_scroll = (self.state.log_scroll + lines).min(max);
    }

    fn scroll_log_down(&mut self, lines: usize) {
        self.state.log_scroll = self.state.log_scroll.saturating_sub(lines);
    }

    pub fn draw(&mut self, frame: &mut Frame<'_>) {
        let area = frame.area();
        frame.render_widget(
            Block::default().style(
                Style::default()
                    .bg(self.theme.background)
                    .fg(self.theme.foreground),
            ),
            area,
        );

        let banner = self.banner();
        let [header, banner_area, body, input, footer] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(u16::from(banner.is_some())),
            Constraint::Min(6),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .areas(area);

        frame.render_widget(Paragraph::new(self.header_line()), header);
        if let Some(banner) = banner {
            frame.render_widget(Paragraph::new(banner), banner_area);
        }

        let mut columns = Vec::new();
        if self.state.show_navbar {
            columns.push(Constraint::Length(16));
        }
        columns.push(Constraint::Min(30));
        if self.state.show_sidebar {
            columns.push(Constraint::Length(30));
        }
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(columns)
            .split(body);
        let mut next = 0;
        if self.state.show_navbar {
            draw_nav(frame, chunks[next], &self.theme);
            next += 1;
        }
        let main = chunks[next];
        if self.state.show_sidebar {
            draw_agents(
                frame,
                chunks[next + 1],
                &self.roster,
                self.session.state(),
                &self.theme,
                self.state.tick,
            );
        }
        self.draw_main(frame, main);

        draw_input(
            frame,
            input,
            &mut self.textarea,
            self.session.state(),
            &self.theme,
            self.state.focus == Focus::Input,
        );
        frame.render_widget(Paragraph::new(self.footer_line()), footer);

        if let Some(item) = self.evidence.selected() {
            draw_evidence_popup(frame, area, item, &self.theme);
        }
    }

    fn draw_main(&mut self, frame: &mut Frame<'_>, area: Rect) {
        let [output, lower] =
            Layout::vertical([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(area);
        draw_output(
            frame,
            output,
            self.session.state(),
            &self.theme,
            self.state.tick,
        );

        let log_area = if self.state.show_evidence {
            let [log, evidence] =
                Layout::horizontal([Constraint::Min(20), Constraint::Length(34)]).areas(lower);
            draw_evidence(
                frame,
                evidence,
                &self.evidence,
                self.state.evidence_cursor,
                self.state.focus == Focus::Evidence,
                &self.theme,
            );
            log
        } else {
            lower
        };

        self.state.log_rows = usize::from(log_area.height.saturating_sub(2));
        let state = self.session.state();
        draw_log(
            frame,
            log_area,
            &LogView {
                entries: state.log(),
                roster: &self.roster,
                scroll_back: self.state.log_scroll,
                malformed: state.malformed_count(),
                focused: self.state.focus == Focus::Log,
            },
            &self.theme,
        );
    }

    fn header_line(&self) -> Line<'static> {
        let state = self.session.state();
        let (badge, badge_color) = if state.is_connected() {
            ("● Connected", self.theme.success)
        } else {
            ("○ Disconnected", self.theme.danger)
        };
        let run = match state.run_state() {
            RunState::Idle => "idle",
            RunState::Processing => "processing",
            RunState::Complete => "complete",
        };
        let sep = Span::styled(" │ ", Style::default().fg(self.theme.muted));
        Line::from(vec![
            Span::styled(
                " AgentFlow",
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            sep.clone(),
            Span::styled(badge, Style::default().fg(badge_color)),
            sep.clone(),
            Span::raw(format!("run: {run}")),
            sep,
            Span::styled(
                format!("theme: {} (Ctrl+T)", self.theme.name.as_str()),
                Style::default().fg(self.theme.muted),
            ),
        ])
    }

    fn banner(&self) -> Option<Line<'static>> {
        let state = self.session.state();
        if let Some(err) = state.connection_error() {
            return Some(Line::styled(
                format!(" ⚠ {err}"),
                Style::default()
                    .fg(self.theme.danger)
                    .add_modifier(Modifier::BOLD),
            ));
        }
        if self.state.stalled {
            return Some(Line::styled(
                " ⚠ no agent activity for a while; the workflow may be stuck",
                Style::default().fg(self.theme.danger),
            ));
        }
        None
    }

    fn footer_line(&self) -> Line<'static> {
        Line::from(vec![
            Span::raw(format!(" {} ", self.state.status)),
            Span::styled(
                "│ Tab focus · Ctrl+B agents · Ctrl+N nav · Ctrl+E evidence · Ctrl+O export · Ctrl+C quit",
                Style::default().fg(self.theme.muted),
            ),
        ])
    }
}
