use agentflow_runtime::{ClientState, RunState};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Wrap},
};

use super::{markdown::render_markdown_lines, spinner};
use crate::theme::Theme;

pub fn draw_output(
    frame: &mut Frame<'_>,
    area: Rect,
    state: &ClientState,
    theme: &Theme,
    tick: usize,
) {
    let lines = match state.run_state() {
        RunState::Complete => render_markdown_lines(state.final_output(), theme),
        RunState::Processing => {
            let step = state
                .current_step()
                .map(|step| match &step.tool {
                    Some(tool) => format!("{} is running {tool}", step.agent),
                    None => format!("{} is working", step.agent),
                })
                .unwrap_or_else(|| "waiting for the first agent".to_string());
            vec![
                Line::from(vec![
                    Span::styled(
                        format!("{} ", spinner(tick)),
                        Style::default().fg(theme.accent),
                    ),
                    Span::styled(
                        "Workflow in progress",
                        Style::default().add_modifier(Modifier::BOLD),
                    ),
                ]),
                Line::from(Span::styled(step, Style::default().fg(theme.muted))),
            ]
        }
        RunState::Idle => vec![Line::from(Span::styled(
            "Enter a prompt below and press Enter to start a workflow.",
            Style::default().fg(theme.muted),
        ))],
    };

    let widget = Paragraph::new(lines)
        .block(
            Block::default()
                .title(" Output ")
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(theme.muted)),
        )
        .wrap(Wrap { trim: false });
    frame.render_widget(widget, area);
}
