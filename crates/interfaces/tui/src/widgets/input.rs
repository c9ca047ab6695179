use agentflow_runtime::ClientState;
use ratatui::{
    Frame,
    layout::Rect,
    style::Style,
    widgets::{Block, BorderType, Borders},
};
use tui_textarea::TextArea;

use crate::theme::Theme;

pub fn draw_input(
    frame: &mut Frame<'_>,
    area: Rect,
    textarea: &mut TextArea<'static>,
    state: &ClientState,
    theme: &Theme,
    focused: bool,
) {
    let title = if !state.is_connected() {
        " Prompt (offline) "
    } else if state.is_processing() {
        " Prompt (workflow running) "
    } else {
        " Prompt (Enter to run) "
    };
    let border = if focused { theme.accent } else { theme.muted };
    textarea.set_block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(border)),
    );
    textarea.set_style(Style::default().fg(theme.foreground));
    frame.render_widget(&*textarea, area);
}
