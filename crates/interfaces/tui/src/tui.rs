use std::future::Future;
use std::io;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event as CrosstermEvent, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tokio::sync::mpsc;
use tracing::debug;

use crate::app::App;
use crate::events::AppEvent;

/// Read crossterm events on a dedicated OS thread so the async loop never
/// blocks on `event::poll()`.
fn spawn_crossterm_reader() -> mpsc::UnboundedReceiver<CrosstermEvent> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        while let Ok(ev) = event::read() {
            if tx.send(ev).is_err() {
                break;
            }
        }
    });
    rx
}

/// Run the dashboard until the user quits.  `teardown` runs after the loop
/// ends and before the terminal is restored, so the connection is closed
/// while the dashboard is still on screen.
pub async fn run_app<F>(app: &mut App, teardown: F) -> Result<()>
where
    F: Future<Output = Result<()>>,
{
    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let mut tick_interval = tokio::time::interval(Duration::from_millis(100));
    // First tick fires immediately.
    tick_interval.tick().await;
    let mut term_rx = spawn_crossterm_reader();
    let mut client_open = true;

    let result = async {
        loop {
            terminal.draw(|f| app.draw(f))?;

            tokio::select! {
                event = app.events_rx.recv(), if client_open => match event {
                    Some(event) => {
                        app.update(AppEvent::Client(event));
                    }
                    None => {
                        debug!("client event channel closed");
                        client_open = false;
                    }
                },
                _ = tick_interval.tick() => {
                    app.update(AppEvent::Tick);
                }
                term_event = term_rx.recv() => {
                    let command = match term_event {
                        Some(CrosstermEvent::Key(key)) if key.kind == KeyEventKind::Press => {
                            app.update(AppEvent::Key(key))
                        }
                        Some(CrosstermEvent::Mouse(mouse)) => app.update(AppEvent::Mouse(mouse)),
                        Some(CrosstermEvent::Resize(w, h)) => app.update(AppEvent::Resize(w, h)),
                        Some(_) => None,
                        None => break,
                    };
                    if let Some(command) = command {
                        if !app.execute(command) {
                            break;
                        }
                    }
                }
            }
        }
        Ok(()) as Result<()>
    }
    .await;

    app.set_status("closing connection");
    let _ = terminal.draw(|f| app.draw(f));
    let teardown = teardown.await;

    debug!("restoring terminal state");
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    result.and(teardown)
}
