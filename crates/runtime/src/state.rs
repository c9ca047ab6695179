use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{ClientCommand, ClientEvent, EventKind, InboundEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Idle,
    Processing,
    Complete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentStep {
    pub agent: String,
    pub tool: Option<String>,
}

/// Agents currently executing, kept in first-start order for display.
/// Inserting an id that is already present does nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveAgents(Vec<String>);

impl ActiveAgents {
    pub fn insert(&mut self, agent: &str) -> bool {
        if self.contains(agent) {
            return false;
        }
        self.0.push(agent.to_string());
        true
    }

    pub fn remove(&mut self, agent: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|a| a != agent);
        self.0.len() != before
    }

    pub fn contains(&self, agent: &str) -> bool {
        self.0.iter().any(|a| a == agent)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

/// Why `submit_run` refused to start a run.  A rejected call leaves the
/// state untouched and sends nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubmitRejection {
    #[error("prompt is empty")]
    EmptyPrompt,
    #[error("not connected to the backend")]
    Disconnected,
    #[error("a workflow is already running")]
    AlreadyProcessing,
}

/// An accepted submission: the command to transmit and the local id the
/// run is traced under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub run_id: Uuid,
    pub command: ClientCommand,
}

/// Dashboard state folded from the supervisor's event stream.
#[derive(Debug, Clone, Default)]
pub struct ClientState {
    connection: ConnectionState,
    connection_error: Option<String>,
    run: RunState,
    run_id: Option<Uuid>,
    active_agents: ActiveAgents,
    current_step: Option<CurrentStep>,
    log: Vec<InboundEvent>,
    final_output: String,
    malformed: usize,
    last_malformed: Option<String>,
    last_activity: Option<DateTime<Utc>>,
}

impl ClientState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: ClientEvent) {
        match event {
            ClientEvent::Connected => {
                info!("backend connected");
                self.connection = ConnectionState::Connected;
                self.connection_error = None;
            }
            ClientEvent::Disconnected => {
                if self.connection == ConnectionState::Connected {
                    info!("backend disconnected");
                }
                self.connection = ConnectionState::Disconnected;
            }
            ClientEvent::ConnectionError(err) => {
                self.connection_error = Some(err);
            }
            ClientEvent::Inbound(event) => self.apply_inbound(event),
            ClientEvent::Malformed { reason } => {
                self.malformed += 1;
                self.last_malformed = Some(reason);
            }
            ClientEvent::SendFailed(reason) => {
                warn!(run_id = ?self.run_id, %reason, "start request was not delivered");
                if self.run == RunState::Processing {
                    self.run = RunState::Idle;
                }
                self.connection_error = Some(reason);
            }
        }
    }

    fn apply_inbound(&mut self, event: InboundEvent) {
        debug!(run_id = ?self.run_id, action = event.action(), "inbound event");
        self.last_activity = Some(event.received_at);

        match &event.kind {
            EventKind::AgentStart { agent } => {
                self.active_agents.insert(agent);
                self.current_step = Some(CurrentStep {
                    agent: agent.clone(),
                    tool: None,
                });
            }
            EventKind::AgentComplete { agent } => {
                self.active_agents.remove(agent);
            }
            EventKind::ToolStart { agent, tool } => {
                self.current_step = Some(CurrentStep {
                    agent: agent.clone(),
                    tool: Some(tool.clone()),
                });
            }
            EventKind::ToolComplete { agent, .. } => {
                self.current_step = Some(CurrentStep {
                    agent: agent.clone(),
                    tool: None,
                });
            }
            EventKind::WorkflowComplete { final_output } => {
                info!(run_id = ?self.run_id, events = self.log.len() + 1, "workflow complete");
                self.run = RunState::Complete;
                self.current_step = None;
                self.final_output = final_output.clone();
            }
            EventKind::Error => {
                warn!(
                    run_id = ?self.run_id,
                    message = event.message.as_deref().unwrap_or(""),
                    "backend reported an error"
                );
                if self.run == RunState::Processing {
                    self.run = RunState::Idle;
                }
            }
            EventKind::EvidenceFound | EventKind::Unknown { .. } => {}
        }

        self.log.push(event);
    }

    /// Start a new run if the prompt is non-blank, the backend is connected
    /// and nothing is processing.  On success the per-run state is reset and
    /// the returned command must be sent exactly once.
    pub fn submit_run(&mut self, prompt: &str) -> Result<Submission, SubmitRejection> {
        self.submit_run_at(prompt, Utc::now())
    }

    pub fn submit_run_at(
        &mut self,
        prompt: &str,
        now: DateTime<Utc>,
    ) -> Result<Submission, SubmitRejection> {
        if prompt.trim().is_empty() {
            return Err(SubmitRejection::EmptyPrompt);
        }
        if self.connection != ConnectionState::Connected {
            return Err(SubmitRejection::Disconnected);
        }
        if self.run == RunState::Processing {
            return Err(SubmitRejection::AlreadyProcessing);
        }

        let run_id = Uuid::new_v4();
        self.log.clear();
        self.active_agents.clear();
        self.current_step = None;
        self.final_output.clear();
        self.run = RunState::Processing;
        self.run_id = Some(run_id);
        self.last_activity = Some(now);
        info!(%run_id, "workflow run submitted");

        Ok(Submission {
            run_id,
            command: ClientCommand::Start {
                prompt: prompt.to_string(),
            },
        })
    }

    /// True while processing when no event has arrived for longer than
    /// `timeout`.  Purely informational.
    pub fn is_stalled(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        if self.run != RunState::Processing {
            return false;
        }
        let Some(last) = self.last_activity else {
            return false;
        };
        now.signed_duration_since(last)
            .to_std()
            .map(|idle| idle > timeout)
            .unwrap_or(false)
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    pub fn is_connected(&self) -> bool {
        self.connection == ConnectionState::Connected
    }

    pub fn connection_error(&self) -> Option<&str> {
        self.connection_error.as_deref()
    }

    pub fn run_state(&self) -> RunState {
        self.run
    }

    pub fn is_processing(&self) -> bool {
        self.run == RunState::Processing
    }

    pub fn run_id(&self) -> Option<Uuid> {
        self.run_id
    }

    pub fn active_agents(&self) -> &ActiveAgents {
        &self.active_agents
    }

    pub fn current_step(&self) -> Option<&CurrentStep> {
        self.current_step.as_ref()
    }

    pub fn log(&self) -> &[InboundEvent] {
        &self.log
    }

    pub fn final_output(&self) -> &str {
        &self.final_output
    }

    pub fn malformed_count(&self) -> usize {
        self.malformed
    }

    pub fn last_malformed(&self) -> Option<&str> {
        self.last_malformed.as_deref()
    }

    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        self.last_activity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode;

    fn inbound(json: &str) -> ClientEvent {
        ClientEvent::Inbound(decode(json).unwrap())
    }

    fn connected() -> ClientState {
        let mut state = ClientState::new();
        state.apply(ClientEvent::Connected);
        state
    }

    fn processing() -> ClientState {
        let mut state = connected();
        state.submit_run("write a report").unwrap();
        state
    }

    #[test]
    fn starts_idle_and_disconnected() {
        let state = ClientState::new();
        assert_eq!(state.connection(), ConnectionState::Disconnected);
        assert_eq!(state.run_state(), RunState::Idle);
        assert!(state.log().is_empty());
        assert!(state.current_step().is_none());
    }

    #[test]
    fn connect_clears_previous_error() {
        let mut state = ClientState::new();
        state.apply(ClientEvent::ConnectionError("refused".into()));
        state.apply(ClientEvent::Disconnected);
        assert_eq!(state.connection_error(), Some("refused"));
        state.apply(ClientEvent::Connected);
        assert!(state.is_connected());
        assert_eq!(state.connection_error(), None);
    }

    #[test]
    fn connection_error_does_not_change_connection_state() {
        let mut state = connected();
        state.apply(ClientEvent::ConnectionError("reset by peer".into()));
        assert!(state.is_connected());
        state.apply(ClientEvent::Disconnected);
        assert!(!state.is_connected());
    }

    #[test]
    fn matched_agent_pairs_leave_only_unmatched_starts() {
        let mut state = processing();
        for json in [
            r#"{"action":"agent_start","agent":"research"}"#,
            r#"{"action":"agent_start","agent":"writer"}"#,
            r#"{"action":"agent_complete","agent":"research"}"#,
            r#"{"action":"agent_start","agent":"reviewer"}"#,
            r#"{"action":"agent_complete","agent":"reviewer"}"#,
        ] {
            state.apply(inbound(json));
        }
        let active: Vec<_> = state.active_agents().iter().collect();
        assert_eq!(active, ["writer"]);
    }

    #[test]
    fn duplicate_agent_start_is_a_set_insert() {
        let mut state = processing();
        state.apply(inbound(r#"{"action":"agent_start","agent":"research"}"#));
        state.apply(inbound(r#"{"action":"agent_start","agent":"research"}"#));
        assert_eq!(state.active_agents().len(), 1);
        state.apply(inbound(r#"{"action":"agent_complete","agent":"research"}"#));
        assert!(state.active_agents().is_empty());
        assert_eq!(state.log().len(), 3);
    }

    #[test]
    fn log_keeps_every_event_in_arrival_order() {
        let mut state = processing();
        let actions = [
            "agent_start",
            "tool_start",
            "evidence_found",
            "planning",
            "tool_complete",
            "agent_complete",
            "error",
        ];
        for action in actions {
            state.apply(inbound(&format!(
                r#"{{"action":"{action}","agent":"research","tool":"web_search"}}"#
            )));
        }
        let seen: Vec<_> = state.log().iter().map(InboundEvent::action).collect();
        assert_eq!(seen, actions);
    }

    #[test]
    fn current_step_follows_agent_and_tool_events() {
        let mut state = processing();
        state.apply(inbound(r#"{"action":"agent_start","agent":"writer"}"#));
        assert_eq!(
            state.current_step(),
            Some(&CurrentStep {
                agent: "writer".into(),
                tool: None
            })
        );
        state.apply(inbound(r#"{"action":"tool_start","agent":"writer","tool":"summarizer"}"#));
        assert_eq!(state.current_step().unwrap().tool.as_deref(), Some("summarizer"));
        state.apply(inbound(r#"{"action":"agent_complete","agent":"writer"}"#));
        assert_eq!(state.current_step().unwrap().tool.as_deref(), Some("summarizer"));
        state.apply(inbound(r#"{"action":"tool_complete","agent":"writer","tool":"summarizer"}"#));
        assert_eq!(state.current_step().unwrap().tool, None);
    }

    #[test]
    fn submit_resets_run_state() {
        let mut state = processing();
        state.apply(inbound(r#"{"action":"agent_start","agent":"research"}"#));
        state.apply(inbound(r#"{"action":"workflow_complete","final_output":"old"}"#));
        assert_eq!(state.run_state(), RunState::Complete);

        let submission = state.submit_run("second run").unwrap();
        assert_eq!(
            submission.command,
            ClientCommand::Start {
                prompt: "second run".into()
            }
        );
        assert!(state.log().is_empty());
        assert!(state.active_agents().is_empty());
        assert!(state.current_step().is_none());
        assert_eq!(state.final_output(), "");
        assert_eq!(state.run_state(), RunState::Processing);
        assert_eq!(state.run_id(), Some(submission.run_id));
    }

    #[test]
    fn submit_sends_prompt_untrimmed() {
        let mut state = connected();
        let submission = state.submit_run("  padded prompt ").unwrap();
        assert_eq!(
            submission.command,
            ClientCommand::Start {
                prompt: "  padded prompt ".into()
            }
        );
    }

    #[test]
    fn invalid_submissions_change_nothing() {
        let mut state = ClientState::new();
        assert_eq!(state.submit_run("hello"), Err(SubmitRejection::Disconnected));

        let mut state = connected();
        state.apply(inbound(r#"{"action":"agent_start","agent":"research"}"#));
        assert_eq!(state.submit_run("   \n\t"), Err(SubmitRejection::EmptyPrompt));
        assert_eq!(state.submit_run(""), Err(SubmitRejection::EmptyPrompt));
        assert_eq!(state.log().len(), 1);
        assert_eq!(state.run_state(), RunState::Idle);

        let mut state = processing();
        state.apply(inbound(r#"{"action":"agent_start","agent":"research"}"#));
        let run_id = state.run_id();
        assert_eq!(state.submit_run("again"), Err(SubmitRejection::AlreadyProcessing));
        assert_eq!(state.log().len(), 1);
        assert_eq!(state.active_agents().len(), 1);
        assert_eq!(state.run_id(), run_id);
    }

    #[test]
    fn workflow_complete_sets_output_verbatim() {
        let mut state = processing();
        state.apply(inbound(r#"{"action":"tool_start","agent":"writer","tool":"text_generator"}"#));
        state.apply(inbound(r##"{"action":"workflow_complete","final_output":"# Title\nbody"}"##));
        assert_eq!(state.run_state(), RunState::Complete);
        assert!(state.current_step().is_none());
        assert_eq!(state.final_output(), "# Title\nbody");
    }

    #[test]
    fn error_ends_processing_but_keeps_log_and_agents() {
        let mut state = processing();
        state.apply(inbound(r#"{"action":"agent_start","agent":"research"}"#));
        state.apply(inbound(r#"{"action":"error","message":"tool crashed"}"#));
        assert_eq!(state.run_state(), RunState::Idle);
        assert_eq!(state.log().len(), 2);
        assert!(state.active_agents().contains("research"));
        assert!(state.submit_run("retry").is_ok());
    }

    #[test]
    fn error_after_completion_keeps_complete() {
        let mut state = processing();
        state.apply(inbound(r#"{"action":"workflow_complete","final_output":"done"}"#));
        state.apply(inbound(r#"{"action":"error","message":"late"}"#));
        assert_eq!(state.run_state(), RunState::Complete);
    }

    #[test]
    fn research_scenario_end_state() {
        let mut state = processing();
        for json in [
            r#"{"action":"agent_start","agent":"research"}"#,
            r#"{"action":"tool_start","agent":"research","tool":"web_search"}"#,
            r#"{"action":"tool_complete","agent":"research","tool":"web_search"}"#,
            r#"{"action":"agent_complete","agent":"research"}"#,
            r#"{"action":"workflow_complete","final_output":"done"}"#,
        ] {
            state.apply(inbound(json));
        }
        assert!(state.active_agents().is_empty());
        assert!(state.current_step().is_none());
        assert_eq!(state.run_state(), RunState::Complete);
        assert_eq!(state.final_output(), "done");
        assert_eq!(state.log().len(), 5);
    }

    #[test]
    fn malformed_payloads_are_counted_not_logged() {
        let mut state = processing();
        state.apply(ClientEvent::Malformed {
            reason: "payload is not a JSON object".into(),
        });
        state.apply(ClientEvent::Malformed {
            reason: "payload has no `action` field".into(),
        });
        assert_eq!(state.malformed_count(), 2);
        assert_eq!(state.last_malformed(), Some("payload has no `action` field"));
        assert!(state.log().is_empty());
        assert!(state.is_processing());
    }

    #[test]
    fn send_failure_leaves_processing() {
        let mut state = processing();
        state.apply(ClientEvent::SendFailed("socket closed".into()));
        assert_eq!(state.run_state(), RunState::Idle);
        assert_eq!(state.connection_error(), Some("socket closed"));
    }

    #[test]
    fn disconnect_does_not_touch_run() {
        let mut state = processing();
        state.apply(ClientEvent::Disconnected);
        assert!(state.is_processing());
        assert_eq!(state.submit_run("x"), Err(SubmitRejection::Disconnected));
    }

    #[test]
    fn stall_detection_only_while_processing() {
        let start = Utc::now();
        let timeout = Duration::from_secs(30);

        let mut state = connected();
        assert!(!state.is_stalled(start + chrono::Duration::seconds(300), timeout));

        state.submit_run_at("go", start).unwrap();
        assert!(!state.is_stalled(start + chrono::Duration::seconds(10), timeout));
        assert!(state.is_stalled(start + chrono::Duration::seconds(31), timeout));

        let ev = crate::decode_at(
            r#"{"action":"agent_start","agent":"research"}"#,
            start + chrono::Duration::seconds(29),
        )
        .unwrap();
        state.apply(ClientEvent::Inbound(ev));
        assert!(!state.is_stalled(start + chrono::Duration::seconds(31), timeout));

        let done = crate::decode_at(
            r#"{"action":"workflow_complete"}"#,
            start + chrono::Duration::seconds(40),
        )
        .unwrap();
        state.apply(ClientEvent::Inbound(done));
        assert!(!state.is_stalled(start + chrono::Duration::seconds(500), timeout));
    }
}
