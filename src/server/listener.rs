use super::address::PeerAddress;
use super::handler::ConnectionHandler;
use super::supervisor::{self, Notification, Supervisor};
use super::{ServerMessage, ServerOptions};
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};

/// Pause after a failed accept, so persistent errors (EMFILE, a closed
/// socket) don't spin the loop.
pub const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Source of client connections for the accept loop.
pub trait Accept {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;
    type Addr: PeerAddress + Send + 'static;

    fn accept(&mut self) -> impl Future<Output = io::Result<(Self::Stream, Self::Addr)>> + Send;
}

impl Accept for TcpListener {
    type Stream = TcpStream;
    type Addr = SocketAddr;

    fn accept(&mut self) -> impl Future<Output = io::Result<(TcpStream, SocketAddr)>> + Send {
        TcpListener::accept(self)
    }
}

/// The accept loop. Every connection is handled in its own task; finished
/// tasks are reaped as soon as they complete. Only a shutdown request ends
/// the loop.
pub(super) async fn listen<A>(
    mut listener: A,
    options: ServerOptions,
    mut supervisor: Supervisor,
    mut messages: mpsc::UnboundedReceiver<ServerMessage>,
) where
    A: Accept,
{
    let handler = ConnectionHandler::from_options(&options);
    let mut handlers = JoinSet::new();
    let mut conn_counter: u64 = 0;

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((socket, peer)) => {
                    conn_counter += 1;
                    debug!(connection = conn_counter, "accepted connection");

                    let handler = handler.clone();
                    handlers.spawn(async move { handler.handle(socket, peer).await });
                }
                Err(err) => {
                    warn!("error accepting connection: {}", err);
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            },
            Some(finished) = handlers.join_next() => reap(finished),
            notification = supervisor.next() => match notification {
                Notification::Reload => supervisor::reload(),
            },
            Some(message) = messages.recv() => match message {
                ServerMessage::Reload => supervisor::reload(),
                ServerMessage::Shutdown => {
                    info!("shutdown requested; no longer accepting connections");
                    break;
                }
            },
        }
    }

    drop(listener);

    // await all pending handlers
    debug!(pending = handlers.len(), "awaiting pending handlers");
    while let Some(finished) = handlers.join_next().await {
        reap(finished);
    }

    info!(connections = conn_counter, "listener stopped");
}

fn reap(finished: Result<(), JoinError>) {
    match finished {
        Ok(()) => {}
        Err(err) if err.is_panic() => warn!("connection handler panicked: {}", err),
        Err(err) => debug!("connection handler cancelled: {}", err),
    }
}
