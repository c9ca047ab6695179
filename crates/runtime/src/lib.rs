mod client;
mod commands;
mod events;
pub mod evidence;
pub mod export;
mod session;
mod state;
pub mod transport;

pub use client::{ClientHandle, ClientOptions, CommandSender, spawn_client};
pub use commands::{ClientCommand, ClientEvent};
pub use events::{DecodeError, EventKind, InboundEvent, decode, decode_at};
pub use evidence::{Evidence, EvidenceBoard, EvidenceKind};
pub use export::{ExportError, ReportFormat, export_report};
pub use session::WorkflowSession;
pub use state::{
    ActiveAgents, ClientState, ConnectionState, CurrentStep, RunState, SubmitRejection, Submission,
};
pub use transport::{Connector, TransportError, WsConnector};
