use agentflow_config::AgentProfile;
use agentflow_runtime::{EventKind, InboundEvent};
use chrono::Local;
use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
};

use crate::theme::Theme;

pub struct LogView<'a> {
    pub entries: &'a [InboundEvent],
    pub roster: &'a [AgentProfile],
    /// Lines scrolled up from the newest entry.
    pub scroll_back: usize,
    pub malformed: usize,
    pub focused: bool,
}

pub fn draw_log(frame: &mut Frame<'_>, area: Rect, view: &LogView<'_>, theme: &Theme) {
    let lines = log_lines(view.entries, view.roster, theme);
    let visible = usize::from(area.height.saturating_sub(2));
    let top = lines
        .len()
        .saturating_sub(visible)
        .saturating_sub(view.scroll_back);

    let mut title = format!(" Activity ({}) ", view.entries.len());
    if view.malformed > 0 {
        title = format!(" Activity ({}) · {} malformed ", view.entries.len(), view.malformed);
    }
    let border = if view.focused { theme.accent } else { theme.muted };

    let widget = Paragraph::new(lines)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(border)),
        )
        .scroll((u16::try_from(top).unwrap_or(u16::MAX), 0));
    frame.render_widget(widget, area);
}

/// One line per event, oldest first.
pub fn log_lines(
    entries: &[InboundEvent],
    roster: &[AgentProfile],
    theme: &Theme,
) -> Vec<Line<'static>> {
    entries
        .iter()
        .map(|event| {
            let time = event.received_at.with_timezone(&Local).format("%H:%M:%S");
            let who = event
                .agent()
                .map(|id| {
                    roster
                        .iter()
                        .find(|p| p.id == id)
                        .map_or(id, |p| p.name.as_str())
                        .to_string()
                })
                .unwrap_or_else(|| "system".to_string());
            let action_style = match event.kind {
                EventKind::Error => Style::default().fg(theme.danger).add_modifier(Modifier::BOLD),
                EventKind::WorkflowComplete { .. } => {
                    Style::default().fg(theme.success).add_modifier(Modifier::BOLD)
                }
                EventKind::Unknown { .. } => Style::default().fg(theme.muted),
                _ => Style::default().fg(theme.accent),
            };

            let mut spans = vec![
                Span::styled(format!("{time} "), Style::default().fg(theme.muted)),
                Span::styled(
                    format!("[{who}] "),
                    Style::default().fg(theme.foreground).add_modifier(Modifier::BOLD),
                ),
                Span::styled(event.action().to_string(), action_style),
            ];
            if let Some(tool) = event.tool() {
                spans.push(Span::styled(
                    format!(" ({tool})"),
                    Style::default().fg(theme.muted),
                ));
            }
            if let Some(message) = &event.message {
                spans.push(Span::styled(
                    format!(": {message}"),
                    Style::default().fg(theme.foreground),
                ));
            }
            Line::from(spans)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use agentflow_config::default_agents;
    use agentflow_runtime::decode;

    use super::*;

    #[test]
    fn lines_use_roster_names_and_keep_unknown_actions() {
        let entries = vec![
            decode(r#"{"action":"tool_start","agent":"research","tool":"web_search","message":"searching"}"#)
                .unwrap(),
            decode(r#"{"action":"heartbeat"}"#).unwrap(),
        ];
        let roster = default_agents();
        let lines = log_lines(&entries, &roster, &Theme::default());
        let research = roster.iter().find(|p| p.id == "research").unwrap();

        let first = lines[0].to_string();
        assert!(first.contains(&format!("[{}] tool_start (web_search): searching", research.name)));
        assert!(lines[1].to_string().ends_with("[system] heartbeat"));
    }
}
