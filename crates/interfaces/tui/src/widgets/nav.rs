use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::Line,
    widgets::{Block, BorderType, Borders, Paragraph},
};

use crate::theme::Theme;

const ITEMS: [&str; 5] = ["Dashboard", "Workflows", "Agents", "Reports", "Settings"];
const CURRENT: &str = "Workflows";

pub fn draw_nav(frame: &mut Frame<'_>, area: Rect, theme: &Theme) {
    let lines: Vec<Line<'_>> = ITEMS
        .iter()
        .map(|item| {
            if *item == CURRENT {
                Line::styled(
                    format!("▸ {item}"),
                    Style::default()
                        .fg(theme.accent)
                        .bg(theme.highlight)
                        .add_modifier(Modifier::BOLD),
                )
            } else {
                Line::styled(format!("  {item}"), Style::default().fg(theme.foreground))
            }
        })
        .collect();

    let widget = Paragraph::new(lines).block(
        Block::default()
            .title(" AgentFlow ")
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(theme.muted)),
    );
    frame.render_widget(widget, area);
}
