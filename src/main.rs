use anyhow::Context;
use clap::Parser;
use sws::server::bootstrap;
use sws::server::supervisor::{self, Supervisor};
use sws::{Config, ServerOptions};
use tracing::info;

fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    sws::setup_logger(config.debug);
    supervisor::ignore_hangup()?;

    let endpoint = bootstrap::bind(&config)?;

    // before any runtime threads exist
    if !config.debug {
        supervisor::daemonize()?;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    runtime.block_on(async move {
        let supervisor = Supervisor::install()?;
        let listener = endpoint.into_tokio()?;
        let options = ServerOptions::from_config(&config);

        let (_server, task) = sws::server::start_supervised(listener, options, supervisor);
        info!("accepting connections");

        task.await.context("listener task failed")
    })
}
