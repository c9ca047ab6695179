//! Light markdown rendering for final output and evidence documents.
//!
//! Headings, list items, quotes, rules, inline `code`, `**bold**` and
//! `*italic*` are styled; fenced code blocks go through syntect.

use std::sync::OnceLock;

use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span},
};
use syntect::easy::HighlightLines;
use syntect::highlighting::{self, ThemeSet};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

use crate::theme::{Theme, ThemeName};

fn syntax_set() -> &'static SyntaxSet {
    static SS: OnceLock<SyntaxSet> = OnceLock::new();
    SS.get_or_init(SyntaxSet::load_defaults_newlines)
}

fn theme_set() -> &'static ThemeSet {
    static TS: OnceLock<ThemeSet> = OnceLock::new();
    TS.get_or_init(ThemeSet::load_defaults)
}

fn code_theme(name: ThemeName) -> Option<&'static highlighting::Theme> {
    let key = match name {
        ThemeName::Dark => "base16-ocean.dark",
        ThemeName::Light => "InspiredGitHub",
    };
    theme_set().themes.get(key)
}

pub fn render_markdown_lines(input: &str, theme: &Theme) -> Vec<Line<'static>> {
    if input.trim().is_empty() {
        return vec![Line::from("")];
    }

    let mut out = Vec::new();
    let mut fence: Option<String> = None;
    let mut code = String::new();

    for raw_line in input.lines() {
        if let Some(rest) = raw_line.trim_start().strip_prefix("```") {
            match fence.take() {
                Some(lang) => {
                    out.extend(highlight_code_block(&code, &lang, theme));
                    code.clear();
                }
                None => fence = Some(rest.trim().to_string()),
            }
            continue;
        }
        if fence.is_some() {
            code.push_str(raw_line);
            code.push('\n');
            continue;
        }
        out.push(render_line(raw_line, theme));
    }

    // unclosed fence
    if let Some(lang) = fence {
        out.extend(highlight_code_block(&code, &lang, theme));
    }
    out
}

fn render_line(line: &str, theme: &Theme) -> Line<'static> {
    let trimmed = line.trim_start();
    let heading = Style::default().fg(theme.accent).add_modifier(Modifier::BOLD);

    if let Some(rest) = trimmed.strip_prefix("### ") {
        return Line::from(Span::styled(format!("   {rest}"), heading));
    }
    if let Some(rest) = trimmed.strip_prefix("## ") {
        return Line::from(Span::styled(format!("  {rest}"), heading));
    }
    if let Some(rest) = trimmed.strip_prefix("# ") {
        return Line::from(Span::styled(
            rest.to_string(),
            heading.add_modifier(Modifier::UNDERLINED),
        ));
    }

    let bullet = Style::default().fg(theme.accent);
    for marker in ["- ", "* ", "+ "] {
        if let Some(body) = trimmed.strip_prefix(marker) {
            let mut spans = vec![Span::styled("  • ", bullet)];
            spans.extend(inline_spans(body, theme));
            return Line::from(spans);
        }
    }
    if let Some((num, body)) = trimmed.split_once(". ") {
        if !num.is_empty() && num.len() <= 3 && num.chars().all(|c| c.is_ascii_digit()) {
            let mut spans = vec![Span::styled(format!("  {num}. "), bullet)];
            spans.extend(inline_spans(body, theme));
            return Line::from(spans);
        }
    }

    if let Some(rest) = trimmed.strip_prefix("> ") {
        return Line::from(vec![
            Span::styled(" │ ", Style::default().fg(theme.muted)),
            Span::styled(rest.to_string(), Style::default().fg(theme.muted)),
        ]);
    }
    if matches!(trimmed, "---" | "***" | "___") {
        return Line::from(Span::styled(
            "────────────────────────────",
            Style::default().fg(theme.muted),
        ));
    }

    Line::from(inline_spans(line, theme))
}

/// Split `text` into plain, `code`, **bold** and *italic* spans.  An
/// unterminated marker runs to the end of the line.
fn inline_spans(text: &str, theme: &Theme) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    let mut plain = String::new();
    let mut rest = text;

    while let Some(ch) = rest.chars().next() {
        let (marker, style) = if rest.starts_with("**") {
            ("**", Style::default().add_modifier(Modifier::BOLD))
        } else if ch == '`' {
            (
                "`",
                Style::default()
                    .fg(theme.success)
                    .add_modifier(Modifier::BOLD),
            )
        } else if ch == '*' {
            ("*", Style::default().add_modifier(Modifier::ITALIC))
        } else {
            plain.push(ch);
            rest = &rest[ch.len_utf8()..];
            continue;
        };

        if !plain.is_empty() {
            spans.push(Span::raw(std::mem::take(&mut plain)));
        }
        let body = &rest[marker.len()..];
        let (inner, after) = match body.find(marker) {
            Some(end) => (&body[..end], &body[end + marker.len()..]),
            None => (body, ""),
        };
        spans.push(Span::styled(inner.to_string(), style));
        rest = after;
    }

    if !plain.is_empty() {
        spans.push(Span::raw(plain));
    }
    spans
}

fn highlight_code_block(code: &str, lang: &str, theme: &Theme) -> Vec<Line<'static>> {
    let ss = syntax_set();
    let syntax = ss
        .find_syntax_by_token(lang)
        .unwrap_or_else(|| ss.find_syntax_plain_text());
    let border = Style::default().fg(theme.muted);

    let mut lines = vec![Line::from(Span::styled(
        format!("╭─ {lang} ─────────────────────────"),
        border,
    ))];

    let mut highlighter = code_theme(theme.name).map(|t| HighlightLines::new(syntax, t));
    for src_line in LinesWithEndings::from(code) {
        let mut spans = vec![Span::styled(" │ ", border)];
        let ranges = highlighter
            .as_mut()
            .and_then(|h| h.highlight_line(src_line, ss).ok());
        match ranges {
            Some(ranges) => {
                for (style, fragment) in ranges {
                    let fg = style.foreground;
                    spans.push(Span::styled(
                        fragment.trim_end_matches('\n').to_string(),
                        Style::default().fg(ratatui::style::Color::Rgb(fg.r, fg.g, fg.b)),
                    ));
                }
            }
            None => spans.push(Span::raw(src_line.trim_end_matches('\n').to_string())),
        }
        lines.push(Line::from(spans));
    }

    lines.push(Line::from(Span::styled(
        "╰───────────────────────────────",
        border,
    )));
    lines
}
