use anyhow::Result;

use agentflow_config::AppConfig;
use agentflow_runtime::{ClientOptions, WorkflowSession, WsConnector, spawn_client};
use agentflow_ui::App;

pub(crate) async fn run_dashboard(config: &AppConfig) -> Result<()> {
    let (handle, events_rx) =
        spawn_client(WsConnector, ClientOptions::from_config(&config.backend));
    let session = WorkflowSession::new(handle.commands());
    let mut app = App::new(config, session, events_rx);

    agentflow_ui::run_app(&mut app, handle.shutdown()).await
}
