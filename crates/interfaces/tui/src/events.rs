use crossterm::event::{KeyEvent, MouseEvent};

use agentflow_runtime::ClientEvent;

#[derive(Debug, Clone)]
pub enum AppEvent {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Client(ClientEvent),
    Tick,
    Resize(u16, u16),
}
