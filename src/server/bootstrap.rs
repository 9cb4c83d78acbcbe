use crate::config::{AddressFamily, Config};
use crate::error::ServerError;
use anyhow::Context;
use std::net::{SocketAddr, TcpListener as StdTcpListener};
use tokio::net::TcpListener;
use tracing::info;

/// A bound, listening TCP socket.
///
/// Created before the async runtime exists so that bind failures surface
/// before the process detaches.
#[derive(Debug)]
pub struct ListeningEndpoint {
    listener: StdTcpListener,
    local_addr: SocketAddr,
}

impl ListeningEndpoint {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn family(&self) -> AddressFamily {
        AddressFamily::of(&self.local_addr.ip())
    }

    /// Hands the socket over to tokio. Requires a running runtime.
    pub fn into_tokio(self) -> Result<TcpListener, ServerError> {
        self.listener
            .set_nonblocking(true)
            .and_then(|()| TcpListener::from_std(self.listener))
            .context("failed to register listening socket")
            .map_err(ServerError::Unexpected)
    }
}

pub fn bind(config: &Config) -> Result<ListeningEndpoint, ServerError> {
    let address = config.bind_address()?;
    bind_address(address)
}

pub fn bind_address(address: SocketAddr) -> Result<ListeningEndpoint, ServerError> {
    let listener =
        StdTcpListener::bind(address).map_err(|source| ServerError::Bind { address, source })?;

    // re-read: the port may have been chosen by the kernel
    let local_addr = listener.local_addr().map_err(ServerError::LocalAddr)?;
    info!(%local_addr, family = %AddressFamily::of(&local_addr.ip()), "listening");

    Ok(ListeningEndpoint {
        listener,
        local_addr,
    })
}
