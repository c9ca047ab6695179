use agentflow_config::AgentProfile;
use agentflow_runtime::ClientState;
use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Wrap},
};

use super::spinner;
use crate::theme::Theme;

pub fn draw_agents(
    frame: &mut Frame<'_>,
    area: Rect,
    roster: &[AgentProfile],
    state: &ClientState,
    theme: &Theme,
    tick: usize,
) {
    let widget = Paragraph::new(agent_lines(roster, state, theme, tick))
        .block(
            Block::default()
                .title(format!(" Agents ({} active) ", state.active_agents().len()))
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(theme.muted)),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(widget, area);
}

/// Roster entries followed by any active agent the roster does not know.
pub fn agent_lines(
    roster: &[AgentProfile],
    state: &ClientState,
    theme: &Theme,
    tick: usize,
) -> Vec<Line<'static>> {
    let active = state.active_agents();
    let step = state.current_step();
    let mut lines = Vec::new();

    let mut push_agent = |id: &str, name: &str, tools: &[String]| {
        let is_active = active.contains(id);
        let (marker, style) = if is_active {
            (
                spinner(tick),
                Style::default()
                    .fg(theme.accent)
                    .bg(theme.highlight)
                    .add_modifier(Modifier::BOLD),
            )
        } else {
            ("○", Style::default().fg(theme.foreground))
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{marker} "), Style::default().fg(theme.accent)),
            Span::styled(name.to_string(), style),
        ]));

        let running_tool = step
            .filter(|s| s.agent == id)
            .and_then(|s| s.tool.as_deref());
        for tool in tools {
            let style = if running_tool == Some(tool.as_str()) {
                Style::default().fg(theme.success).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(theme.muted)
            };
            lines.push(Line::from(Span::styled(format!("    · {tool}"), style)));
        }
        if let Some(tool) = running_tool.filter(|t| !tools.iter().any(|known| known.as_str() == *t)) {
            lines.push(Line::from(Span::styled(
                format!("    · {tool}"),
                Style::default().fg(theme.success).add_modifier(Modifier::BOLD),
            )));
        }
    };

    for profile in roster {
        push_agent(profile.id.as_str(), profile.name.as_str(), profile.tools.as_slice());
    }
    let no_tools: &[String] = &[];
    for id in active.iter() {
        if !roster.iter().any(|p| p.id == id) {
            push_agent(id, id, no_tools);
        }
    }

    if lines.is_empty() {
        lines.push(Line::from(Span::styled(
            "no agents configured",
            Style::default().fg(theme.muted),
        )));
    }
    lines
}
