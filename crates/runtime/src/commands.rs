use serde::{Deserialize, Serialize};

use crate::InboundEvent;

/// Messages the dashboard sends to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    Start { prompt: String },
}

/// Everything the connection supervisor reports, in transport order.
/// Lifecycle changes and decoded messages share one channel so the reducer
/// sees them exactly as they happened.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Connected,
    Disconnected,
    ConnectionError(String),
    Inbound(InboundEvent),
    /// A payload was rejected by the decoder; the stream continues.
    Malformed { reason: String },
    /// A command could not be written to the socket.
    SendFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_command_wire_shape() {
        let cmd = ClientCommand::Start {
            prompt: "Write a report on AI ethics".into(),
        };
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "start", "prompt": "Write a report on AI ethics"})
        );
    }
}
