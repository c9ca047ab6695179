//! Terminal dashboard for a multi-agent workflow backend.

pub mod app;
pub mod events;
pub mod theme;
pub mod tui;
pub mod widgets;

pub use app::{App, AppState, Focus, UiCommand};
pub use events::AppEvent;
pub use theme::{Theme, ThemeName};
pub use tui::run_app;
