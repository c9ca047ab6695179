use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

/// Why an inbound payload was rejected at the decode boundary.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("payload is not a JSON object")]
    NotAnObject,
    #[error("payload has no `action` field")]
    MissingAction,
    #[error("`action` must be a string")]
    ActionNotString,
    #[error("`{action}` event is missing string field `{field}`")]
    MissingField {
        action: String,
        field: &'static str,
    },
}

/// The closed set of backend actions, plus a fallback that keeps anything
/// else verbatim so it can still be shown in the log.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    AgentStart { agent: String },
    AgentComplete { agent: String },
    ToolStart { agent: String, tool: String },
    ToolComplete { agent: String, tool: String },
    EvidenceFound,
    WorkflowComplete { final_output: String },
    Error,
    Unknown { action: String },
}

impl EventKind {
    pub fn action(&self) -> &str {
        match self {
            Self::AgentStart { .. } => "agent_start",
            Self::AgentComplete { .. } => "agent_complete",
            Self::ToolStart { .. } => "tool_start",
            Self::ToolComplete { .. } => "tool_complete",
            Self::EvidenceFound => "evidence_found",
            Self::WorkflowComplete { .. } => "workflow_complete",
            Self::Error => "error",
            Self::Unknown { action } => action,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::WorkflowComplete { .. } | Self::Error)
    }
}

/// One decoded backend message.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundEvent {
    pub kind: EventKind,
    /// Human-readable text the backend attached for display.
    pub message: Option<String>,
    pub received_at: DateTime<Utc>,
    /// The full payload as received, unknown fields included.
    pub raw: Value,
}

impl InboundEvent {
    pub fn action(&self) -> &str {
        self.kind.action()
    }

    /// Agent id for display, taken from the typed variant when there is one
    /// and from the raw payload otherwise.
    pub fn agent(&self) -> Option<&str> {
        match &self.kind {
            EventKind::AgentStart { agent }
            | EventKind::AgentComplete { agent }
            | EventKind::ToolStart { agent, .. }
            | EventKind::ToolComplete { agent, .. } => Some(agent),
            _ => self.raw.get("agent").and_then(Value::as_str),
        }
    }

    pub fn tool(&self) -> Option<&str> {
        match &self.kind {
            EventKind::ToolStart { tool, .. } | EventKind::ToolComplete { tool, .. } => Some(tool),
            _ => self.raw.get("tool").and_then(Value::as_str),
        }
    }
}

impl fmt::Display for InboundEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let who = match (&self.kind, self.agent()) {
            (_, Some(agent)) => agent,
            (EventKind::Error, None) => "error",
            _ => "system",
        };
        write!(f, "[{who}] {}", self.action())?;
        if let Some(tool) = self.tool() {
            write!(f, " ({tool})")?;
        }
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        Ok(())
    }
}

pub fn decode(text: &str) -> Result<InboundEvent, DecodeError> {
    decode_at(text, Utc::now())
}

pub fn decode_at(text: &str, received_at: DateTime<Utc>) -> Result<InboundEvent, DecodeError> {
    let raw: Value = serde_json::from_str(text)?;
    let Value::Object(fields) = &raw else {
        return Err(DecodeError::NotAnObject);
    };

    let action = match fields.get("action") {
        Some(Value::String(action)) => action.as_str(),
        Some(_) => return Err(DecodeError::ActionNotString),
        None => return Err(DecodeError::MissingAction),
    };

    let kind = match action {
        "agent_start" => EventKind::AgentStart {
            agent: required(fields, action, "agent")?,
        },
        "agent_complete" => EventKind::AgentComplete {
            agent: required(fields, action, "agent")?,
        },
        "tool_start" => EventKind::ToolStart {
            agent: required(fields, action, "agent")?,
            tool: required(fields, action, "tool")?,
        },
        "tool_complete" => EventKind::ToolComplete {
            agent: required(fields, action, "agent")?,
            tool: required(fields, action, "tool")?,
        },
        "evidence_found" => EventKind::EvidenceFound,
        "workflow_complete" => EventKind::WorkflowComplete {
            final_output: optional(fields, "final_output").unwrap_or_default(),
        },
        "error" => EventKind::Error,
        other => EventKind::Unknown {
            action: other.to_string(),
        },
    };

    let message = optional(fields, "message");
    Ok(InboundEvent {
        kind,
        message,
        received_at,
        raw,
    })
}

fn required(
    fields: &Map<String, Value>,
    action: &str,
    field: &'static str,
) -> Result<String, DecodeError> {
    optional(fields, field).ok_or_else(|| DecodeError::MissingField {
        action: action.to_string(),
        field,
    })
}

fn optional(fields: &Map<String, Value>, field: &str) -> Option<String> {
    fields.get(field).and_then(Value::as_str).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_agent_start_with_message() {
        let ev = decode(r#"{"action":"agent_start","agent":"research","message":"Researching"}"#)
            .unwrap();
        assert_eq!(
            ev.kind,
            EventKind::AgentStart {
                agent: "research".into()
            }
        );
        assert_eq!(ev.message.as_deref(), Some("Researching"));
        assert_eq!(ev.agent(), Some("research"));
        assert_eq!(ev.tool(), None);
    }

    #[test]
    fn decodes_tool_events() {
        let ev = decode(r#"{"action":"tool_start","agent":"research","tool":"web_search"}"#).unwrap();
        assert_eq!(ev.tool(), Some("web_search"));
        assert!(matches!(ev.kind, EventKind::ToolStart { .. }));

        let ev = decode(r#"{"action":"tool_complete","agent":"research","tool":"web_search"}"#)
            .unwrap();
        assert!(matches!(ev.kind, EventKind::ToolComplete { .. }));
    }

    #[test]
    fn workflow_complete_keeps_output_verbatim() {
        let ev = decode(r##"{"action":"workflow_complete","final_output":"# Title\nbody"}"##).unwrap();
        assert_eq!(
            ev.kind,
            EventKind::WorkflowComplete {
                final_output: "# Title\nbody".into()
            }
        );
        assert!(ev.kind.is_terminal());
    }

    #[test]
    fn workflow_complete_without_output_is_empty() {
        let ev = decode(r#"{"action":"workflow_complete"}"#).unwrap();
        assert_eq!(
            ev.kind,
            EventKind::WorkflowComplete {
                final_output: String::new()
            }
        );
        let ev = decode(r#"{"action":"workflow_complete","final_output":null}"#).unwrap();
        assert_eq!(
            ev.kind,
            EventKind::WorkflowComplete {
                final_output: String::new()
            }
        );
    }

    #[test]
    fn unknown_action_is_preserved() {
        let ev = decode(r#"{"action":"planning","message":"drafting plan","extra":42}"#).unwrap();
        assert_eq!(
            ev.kind,
            EventKind::Unknown {
                action: "planning".into()
            }
        );
        assert_eq!(ev.action(), "planning");
        assert_eq!(ev.raw["extra"], 42);
    }

    #[test]
    fn error_event_uses_envelope_message() {
        let ev = decode(r#"{"action":"error","message":"model quota exceeded"}"#).unwrap();
        assert_eq!(ev.kind, EventKind::Error);
        assert_eq!(ev.to_string(), "[error] error: model quota exceeded");
    }

    #[test]
    fn evidence_event_exposes_raw_agent() {
        let ev = decode(r#"{"action":"evidence_found","agent":"research","title":"Paper"}"#).unwrap();
        assert_eq!(ev.kind, EventKind::EvidenceFound);
        assert_eq!(ev.agent(), Some("research"));
    }

    #[test]
    fn rejects_non_json() {
        assert!(matches!(decode("not json"), Err(DecodeError::Json(_))));
    }

    #[test]
    fn rejects_non_object() {
        assert!(matches!(decode("[1,2,3]"), Err(DecodeError::NotAnObject)));
        assert!(matches!(decode("\"agent_start\""), Err(DecodeError::NotAnObject)));
    }

    #[test]
    fn rejects_missing_or_mistyped_action() {
        assert!(matches!(decode(r#"{"agent":"x"}"#), Err(DecodeError::MissingAction)));
        assert!(matches!(decode(r#"{"action":7}"#), Err(DecodeError::ActionNotString)));
    }

    #[test]
    fn rejects_known_action_without_required_field() {
        let err = decode(r#"{"action":"tool_start","agent":"research"}"#).unwrap_err();
        assert_eq!(err.to_string(), "`tool_start` event is missing string field `tool`");
        assert!(decode(r#"{"action":"agent_start","agent":5}"#).is_err());
    }

    #[test]
    fn display_includes_tool_and_message() {
        let ev = decode(
            r#"{"action":"tool_start","agent":"writer","tool":"summarizer","message":"Condensing"}"#,
        )
        .unwrap();
        assert_eq!(ev.to_string(), "[writer] tool_start (summarizer): Condensing");

        let ev = decode(r#"{"action":"workflow_complete","final_output":"x"}"#).unwrap();
        assert_eq!(ev.to_string(), "[system] workflow_complete");
    }
}
