use std::io::Write;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use agentflow_config::AppConfig;
use agentflow_runtime::{
    ClientEvent, ClientOptions, EventKind, WorkflowSession, WsConnector, spawn_client,
};

/// How a headless run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum WatchOutcome {
    Completed,
    Failed(Option<String>),
}

impl WatchOutcome {
    pub(crate) fn exit_code(&self) -> ExitCode {
        match self {
            Self::Completed => ExitCode::SUCCESS,
            Self::Failed(_) => ExitCode::FAILURE,
        }
    }
}

pub(crate) async fn run_watch(
    config: &AppConfig,
    prompt: &str,
    connect_timeout: Duration,
) -> Result<ExitCode> {
    let (handle, mut events_rx) =
        spawn_client(WsConnector, ClientOptions::from_config(&config.backend));
    let mut session = WorkflowSession::new(handle.commands());
    let mut stdout = std::io::stdout();

    let outcome = watch_run(
        &mut session,
        &mut events_rx,
        prompt,
        connect_timeout,
        config.backend.step_timeout(),
        &mut stdout,
    )
    .await;
    handle.shutdown().await?;

    let outcome = outcome?;
    if let WatchOutcome::Failed(message) = &outcome {
        eprintln!(
            "workflow failed: {}",
            message.as_deref().unwrap_or("backend reported an error")
        );
    }
    Ok(outcome.exit_code())
}

/// Wait for the connection, start one run and print every log event until
/// the terminal one.
pub(crate) async fn watch_run(
    session: &mut WorkflowSession,
    events_rx: &mut mpsc::UnboundedReceiver<ClientEvent>,
    prompt: &str,
    connect_timeout: Duration,
    step_timeout: Option<Duration>,
    out: &mut impl Write,
) -> Result<WatchOutcome> {
    tokio::time::timeout(connect_timeout, async {
        while !session.state().is_connected() {
            let event = events_rx
                .recv()
                .await
                .ok_or_else(|| anyhow!("connection supervisor stopped"))?;
            if let ClientEvent::ConnectionError(err) = &event {
                warn!(%err, "backend not reachable yet");
            }
            session.apply(event);
        }
        Ok::<_, anyhow::Error>(())
    })
    .await
    .with_context(|| {
        format!(
            "backend did not accept a connection within {}s",
            connect_timeout.as_secs()
        )
    })??;

    let run_id = session
        .submit_run(prompt)
        .map_err(|rejection| anyhow!("cannot start workflow: {rejection}"))?;
    info!(%run_id, "workflow submitted");

    let idle_limit = step_timeout.unwrap_or(Duration::from_secs(3600));
    loop {
        let event = match tokio::time::timeout(idle_limit, events_rx.recv()).await {
            Ok(Some(event)) => event,
            Ok(None) => bail!("connection supervisor stopped before the workflow finished"),
            Err(_) => {
                if session.state().is_stalled(Utc::now(), idle_limit) {
                    warn!(%run_id, "no workflow activity within the step timeout");
                }
                continue;
            }
        };

        let terminal = match &event {
            ClientEvent::Inbound(inbound) => {
                writeln!(out, "{inbound}")?;
                match &inbound.kind {
                    EventKind::WorkflowComplete { final_output } => {
                        writeln!(out)?;
                        writeln!(out, "{final_output}")?;
                        Some(WatchOutcome::Completed)
                    }
                    EventKind::Error => Some(WatchOutcome::Failed(inbound.message.clone())),
                    _ => None,
                }
            }
            ClientEvent::ConnectionError(err) => {
                warn!(%err, "connection problem while the workflow runs");
                None
            }
            ClientEvent::Malformed { reason } => {
                warn!(%reason, "ignored malformed backend message");
                None
            }
            _ => None,
        };
        session.apply(event);

        if let Some(outcome) = terminal {
            out.flush()?;
            return Ok(outcome);
        }
        if !session.state().is_processing() {
            let reason = session
                .state()
                .connection_error()
                .unwrap_or("run stopped")
                .to_string();
            return Ok(WatchOutcome::Failed(Some(reason)));
        }
    }
}

#[cfg(test)]
mod tests {
    use agentflow_runtime::{ClientCommand, decode};

    use super::*;

    fn inbound(raw: &str) -> ClientEvent {
        ClientEvent::Inbound(decode(raw).unwrap())
    }

    struct Rig {
        session: WorkflowSession,
        events_tx: mpsc::UnboundedSender<ClientEvent>,
        events_rx: mpsc::UnboundedReceiver<ClientEvent>,
        sent: mpsc::UnboundedReceiver<ClientCommand>,
    }

    fn rig() -> Rig {
        let (commands, sent) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Rig {
            session: WorkflowSession::new(commands.into()),
            events_tx,
            events_rx,
            sent,
        }
    }

    #[tokio::test]
    async fn completed_run_prints_events_and_output() {
        let mut rig = rig();
        for event in [
            ClientEvent::ConnectionError("refused".into()),
            ClientEvent::Connected,
            inbound(r#"{"action":"agent_start","agent":"research","message":"Starting research"}"#),
            ClientEvent::Malformed {
                reason: "not json".into(),
            },
            inbound(r#"{"action":"workflow_complete","final_output":"All done."}"#),
        ] {
            rig.events_tx.send(event).unwrap();
        }

        let mut out = Vec::new();
        let outcome = watch_run(
            &mut rig.session,
            &mut rig.events_rx,
            "Research agents",
            Duration::from_secs(5),
            None,
            &mut out,
        )
        .await
        .unwrap();

        assert_eq!(outcome, WatchOutcome::Completed);
        assert_eq!(
            rig.sent.try_recv().unwrap(),
            ClientCommand::Start {
                prompt: "Research agents".into()
            }
        );
        let printed = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = printed.lines().collect();
        assert_eq!(lines[0], "[research] agent_start: Starting research");
        assert_eq!(lines[1], "[system] workflow_complete");
        assert_eq!(lines.last(), Some(&"All done."));
    }

    #[tokio::test]
    async fn backend_error_fails_the_run() {
        let mut rig = rig();
        rig.events_tx.send(ClientEvent::Connected).unwrap();
        rig.events_tx
            .send(inbound(r#"{"action":"error","message":"LLM quota exceeded"}"#))
            .unwrap();

        let mut out = Vec::new();
        let outcome = watch_run(
            &mut rig.session,
            &mut rig.events_rx,
            "anything",
            Duration::from_secs(5),
            None,
            &mut out,
        )
        .await
        .unwrap();
        assert_eq!(
            outcome,
            WatchOutcome::Failed(Some("LLM quota exceeded".into()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_when_backend_never_connects() {
        let mut rig = rig();
        let mut out = Vec::new();
        let err = watch_run(
            &mut rig.session,
            &mut rig.events_rx,
            "anything",
            Duration::from_secs(10),
            None,
            &mut out,
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("within 10s"));
        assert!(rig.sent.try_recv().is_err());
        drop(rig.events_tx);
    }

    #[tokio::test]
    async fn undelivered_start_fails_the_run() {
        let mut rig = rig();
        rig.events_tx.send(ClientEvent::Connected).unwrap();
        rig.events_tx
            .send(ClientEvent::SendFailed("socket closed".into()))
            .unwrap();

        let mut out = Vec::new();
        let outcome = watch_run(
            &mut rig.session,
            &mut rig.events_rx,
            "anything",
            Duration::from_secs(5),
            None,
            &mut out,
        )
        .await
        .unwrap();
        assert_eq!(outcome, WatchOutcome::Failed(Some("socket closed".into())));
    }
}
