use std::time::Duration;

use anyhow::Result;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use agentflow_config::BackendConfig;

use crate::transport::{Connector, Link};
use crate::{ClientCommand, ClientEvent, decode};

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub endpoint: String,
    pub reconnect_delay: Duration,
    /// Consecutive failed connects before giving up; `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl ClientOptions {
    pub fn from_config(config: &BackendConfig) -> Self {
        Self {
            endpoint: config.url.clone(),
            reconnect_delay: config.reconnect_delay(),
            max_attempts: config.max_attempts(),
        }
    }
}

/// Cloneable write side of the supervisor's command queue.
#[derive(Debug, Clone)]
pub struct CommandSender(mpsc::UnboundedSender<ClientCommand>);

impl CommandSender {
    /// Queue a command for the live connection.  Fails only once the
    /// supervisor has stopped.
    pub fn send(&self, command: ClientCommand) -> Result<(), ClientCommand> {
        self.0.send(command).map_err(|err| err.0)
    }
}

impl From<mpsc::UnboundedSender<ClientCommand>> for CommandSender {
    fn from(tx: mpsc::UnboundedSender<ClientCommand>) -> Self {
        Self(tx)
    }
}

/// Owner of the supervisor task.  Dropping it signals the supervisor to
/// close the socket and stop; [`ClientHandle::shutdown`] also waits for it.
pub struct ClientHandle {
    commands: CommandSender,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl ClientHandle {
    pub fn commands(&self) -> CommandSender {
        self.commands.clone()
    }

    pub async fn shutdown(mut self) -> Result<()> {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            task.await?;
        }
        Ok(())
    }
}

impl Drop for ClientHandle {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

/// Spawn the connection supervisor.  It keeps exactly one connection to
/// `options.endpoint`, reconnecting after `options.reconnect_delay` whenever
/// it closes, and reports everything on the returned receiver.
pub fn spawn_client<C: Connector>(
    connector: C,
    options: ClientOptions,
) -> (ClientHandle, mpsc::UnboundedReceiver<ClientEvent>) {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let supervisor = Supervisor {
        connector,
        options,
        commands: command_rx,
        events: event_tx,
        shutdown: shutdown_rx,
    };
    let task = tokio::spawn(supervisor.run());

    let handle = ClientHandle {
        commands: CommandSender(command_tx),
        shutdown: shutdown_tx,
        task: Some(task),
    };
    (handle, event_rx)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkOutcome {
    Closed,
    Stop,
}

struct Supervisor<C> {
    connector: C,
    options: ClientOptions,
    commands: mpsc::UnboundedReceiver<ClientCommand>,
    events: mpsc::UnboundedSender<ClientEvent>,
    shutdown: watch::Receiver<bool>,
}

impl<C: Connector> Supervisor<C> {
    async fn run(mut self) {
        let mut failures: u32 = 0;
        loop {
            if *self.shutdown.borrow() {
                break;
            }

            debug!(endpoint = %self.options.endpoint, "connecting");
            let attempt = tokio::select! {
                result = self.connector.connect(&self.options.endpoint) => result,
                _ = self.shutdown.changed() => break,
            };

            match attempt {
                Ok(link) => {
                    failures = 0;
                    info!(endpoint = %self.options.endpoint, "connection established");
                    self.emit(ClientEvent::Connected);
                    let outcome = self.drive(link).await;
                    info!("connection closed");
                    self.emit(ClientEvent::Disconnected);
                    if outcome == LinkOutcome::Stop {
                        break;
                    }
                }
                Err(err) => {
                    failures += 1;
                    warn!(attempt = failures, %err, "connection failed");
                    self.emit(ClientEvent::ConnectionError(format!(
                        "Failed to connect to server. Please check if the backend is running. ({err})"
                    )));
                    self.emit(ClientEvent::Disconnected);
                    if let Some(max) = self.options.max_attempts {
                        if failures >= max {
                            warn!(failures, "giving up on reconnection");
                            self.emit(ClientEvent::ConnectionError(format!(
                                "Gave up after {failures} failed connection attempts."
                            )));
                            break;
                        }
                    }
                }
            }

            if !self.wait_before_reconnect().await {
                break;
            }
        }
        debug!("supervisor stopped");
    }

    /// Pump one live connection until it closes or we are told to stop.
    /// The sink is always closed before returning.
    async fn drive(&mut self, link: Link) -> LinkOutcome {
        let Link {
            mut sink,
            mut stream,
        } = link;

        let outcome = loop {
            tokio::select! {
                frame = stream.next_frame() => match frame {
                    Some(Ok(text)) => {
                        let event = match decode(&text) {
                            Ok(event) => ClientEvent::Inbound(event),
                            Err(err) => {
                                warn!(%err, payload = %preview(&text), "dropping malformed message");
                                ClientEvent::Malformed { reason: err.to_string() }
                            }
                        };
                        if self.events.send(event).is_err() {
                            break LinkOutcome::Stop;
                        }
                    }
                    Some(Err(err)) => {
                        warn!(%err, "socket error");
                        self.emit(ClientEvent::ConnectionError(err.to_string()));
                        break LinkOutcome::Closed;
                    }
                    None => break LinkOutcome::Closed,
                },
                command = self.commands.recv() => {
                    let Some(command) = command else {
                        break LinkOutcome::Stop;
                    };
                    let payload = match serde_json::to_string(&command) {
                        Ok(payload) => payload,
                        Err(err) => {
                            self.emit(ClientEvent::SendFailed(err.to_string()));
                            continue;
                        }
                    };
                    if let Err(err) = sink.send_text(payload).await {
                        warn!(%err, "failed to send command");
                        self.emit(ClientEvent::SendFailed(err.to_string()));
                        break LinkOutcome::Closed;
                    }
                    debug!(?command, "command sent");
                }
                _ = self.shutdown.changed() => break LinkOutcome::Stop,
            }
        };

        if let Err(err) = sink.close().await {
            debug!(%err, "error while closing socket");
        }
        outcome
    }

    /// Sleep out the reconnect delay.  Commands that arrive meanwhile cannot
    /// be delivered and are reported back as failed.  Returns `false` when
    /// the supervisor should stop instead of reconnecting.
    async fn wait_before_reconnect(&mut self) -> bool {
        let delay = tokio::time::sleep(self.options.reconnect_delay);
        tokio::pin!(delay);
        loop {
            tokio::select! {
                _ = &mut delay => return true,
                command = self.commands.recv() => match command {
                    Some(command) => {
                        debug!(?command, "dropping command while disconnected");
                        self.emit(ClientEvent::SendFailed(
                            "not connected to the backend".to_string(),
                        ));
                    }
                    None => return false,
                },
                _ = self.shutdown.changed() => return false,
            }
        }
    }

    fn emit(&self, event: ClientEvent) {
        let _ = self.events.send(event);
    }
}

fn preview(text: &str) -> &str {
    match text.char_indices().nth(120) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
