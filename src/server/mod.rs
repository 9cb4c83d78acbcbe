pub mod address;
pub mod bootstrap;
pub mod handler;
pub mod listener;
pub mod report;
pub mod supervisor;

use crate::config::Config;
use crate::error::{ServerError, ServerSendError};
use listener::Accept;
use report::Reporter;
use std::time::Duration;
use supervisor::Supervisor;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Everything a running server needs from the configuration.
#[derive(Clone, Debug)]
pub struct ServerOptions {
    pub client_timeout: Duration,
    pub reporter: Reporter,
}

impl ServerOptions {
    /// Requests are printed only in debug mode; a log file receives them either way.
    pub fn from_config(config: &Config) -> Self {
        Self {
            client_timeout: config.client_timeout(),
            reporter: Reporter::new(config.debug, config.log_file.clone()),
        }
    }
}

#[derive(Clone)]
pub struct ServerHandle {
    sender: mpsc::UnboundedSender<ServerMessage>,
}

impl ServerHandle {
    pub fn reload(&self) -> Result<(), ServerSendError> {
        self.sender
            .send(ServerMessage::Reload)
            .map_err(|_| ServerSendError)
    }

    /// Stops accepting; the server task finishes once in-flight clients are done.
    pub fn shutdown(&self) -> Result<(), ServerSendError> {
        self.sender
            .send(ServerMessage::Shutdown)
            .map_err(|_| ServerSendError)
    }
}

enum ServerMessage {
    Reload,
    Shutdown,
}

/// Installs signal handling and spawns the accept loop on the current runtime.
///
/// The returned task runs until [`ServerHandle::shutdown`] is called.
/// Dropping every handle leaves it running.
pub fn start<A>(
    listener: A,
    options: ServerOptions,
) -> Result<(ServerHandle, JoinHandle<()>), ServerError>
where
    A: Accept + Send + 'static,
{
    let supervisor = Supervisor::install()?;
    Ok(start_supervised(listener, options, supervisor))
}

/// Like [`start`], with signal handling installed earlier by the caller.
pub fn start_supervised<A>(
    listener: A,
    options: ServerOptions,
    supervisor: Supervisor,
) -> (ServerHandle, JoinHandle<()>)
where
    A: Accept + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel::<ServerMessage>();
    let server = ServerHandle { sender: tx };

    let task = tokio::spawn(listener::listen(listener, options, supervisor, rx));

    (server, task)
}
