mod api;
mod config;
mod error_log;
mod format;
mod model;
mod orchestrator;
mod state;
mod tui;

use std::sync::Arc;

use anyhow::anyhow;
use clap::Parser;
use tokio::sync::mpsc;

use crate::api::HttpDashboardClient;
use crate::error_log::ErrorLogStore;
use crate::orchestrator::Orchestrator;
use crate::tui::TuiApp;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let param = config::CliParams::parse();
    let api = Arc::new(HttpDashboardClient::new(&param.api_config())?);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let orchestrator = Orchestrator::new(api, tx, param.request_timeout());

    let mut app = TuiApp::new(
        orchestrator,
        ErrorLogStore::new(param.error_log.clone()),
        param.timezone,
    );
    let app_result = tokio::select! {
        result = app.run(&mut rx) => result,
        _ = tokio::signal::ctrl_c() => Ok(()),
    };
    app.dispose();
    app_result.map_err(|err| anyhow!(err.to_string()))?;
    Ok(())
}
