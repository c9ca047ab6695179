use uuid::Uuid;

use crate::{ClientEvent, ClientState, CommandSender, SubmitRejection};

/// Reducer state plus the command queue of the live connection: the single
/// place a run can be started from.
#[derive(Debug)]
pub struct WorkflowSession {
    state: ClientState,
    commands: CommandSender,
}

impl WorkflowSession {
    pub fn new(commands: CommandSender) -> Self {
        Self {
            state: ClientState::new(),
            commands,
        }
    }

    pub fn state(&self) -> &ClientState {
        &self.state
    }

    pub fn apply(&mut self, event: ClientEvent) {
        self.state.apply(event);
    }

    /// Validate and start a run, transmitting exactly one start command.
    /// If the supervisor is already gone the run is failed immediately.
    pub fn submit_run(&mut self, prompt: &str) -> Result<Uuid, SubmitRejection> {
        let submission = self.state.submit_run(prompt)?;
        if self.commands.send(submission.command).is_err() {
            self.state.apply(ClientEvent::SendFailed(
                "connection supervisor has stopped".to_string(),
            ));
        }
        Ok(submission.run_id)
    }
}
