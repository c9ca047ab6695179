use agentflow_runtime::{Evidence, EvidenceBoard, EvidenceKind};
use ratatui::{
    Frame,
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};

use super::{center, markdown::render_markdown_lines};
use crate::theme::Theme;

pub fn draw_evidence(
    frame: &mut Frame<'_>,
    area: Rect,
    board: &EvidenceBoard,
    cursor: usize,
    focused: bool,
    theme: &Theme,
) {
    let items: Vec<ListItem<'_>> = board
        .items()
        .iter()
        .map(|item| {
            let icon = match item.kind {
                EvidenceKind::Document => "▤",
                EvidenceKind::Link => "⇗",
            };
            let origin = item
                .source
                .as_deref()
                .or(item.url.as_deref())
                .unwrap_or_default();
            ListItem::new(vec![
                Line::from(vec![
                    Span::styled(format!("{icon} "), Style::default().fg(theme.accent)),
                    Span::styled(item.title.clone(), Style::default().fg(theme.foreground)),
                ]),
                Line::from(Span::styled(
                    format!("  {origin}"),
                    Style::default().fg(theme.muted),
                )),
            ])
        })
        .collect();

    let border = if focused { theme.accent } else { theme.muted };
    let list = List::new(items)
        .block(
            Block::default()
                .title(format!(" Evidence ({}) ", board.len()))
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(border)),
        )
        .highlight_style(
            Style::default()
                .bg(theme.highlight)
                .add_modifier(Modifier::BOLD),
        );

    let mut list_state = ListState::default();
    if focused && !board.is_empty() {
        list_state.select(Some(cursor.min(board.len() - 1)));
    }
    frame.render_stateful_widget(list, area, &mut list_state);
}

pub fn draw_evidence_popup(frame: &mut Frame<'_>, area: Rect, item: &Evidence, theme: &Theme) {
    let popup = center(area, Constraint::Percentage(70), Constraint::Percentage(70));

    let mut lines = Vec::new();
    if let Some(source) = &item.source {
        lines.push(Line::styled(
            format!("Source: {source}"),
            Style::default().fg(theme.muted),
        ));
    }
    if let Some(url) = &item.url {
        lines.push(Line::styled(
            url.clone(),
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::UNDERLINED),
        ));
    }
    if let Some(description) = &item.description {
        lines.push(Line::from(""));
        lines.push(Line::from(description.clone()));
    }
    if let Some(content) = &item.content {
        lines.push(Line::from(""));
        lines.extend(render_markdown_lines(content, theme));
    }
    lines.push(Line::from(""));
    lines.push(Line::styled("Esc to close", Style::default().fg(theme.muted)));

    let widget = Paragraph::new(lines)
        .block(
            Block::default()
                .title(format!(" {} ", item.title))
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(theme.accent))
                .style(Style::default().bg(theme.panel)),
        )
        .wrap(Wrap { trim: false });
    frame.render_widget(Clear, popup);
    frame.render_widget(widget, popup);
}
