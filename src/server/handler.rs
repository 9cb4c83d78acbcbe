use super::address::{peer_address, PeerAddress};
use super::report::{Report, Reporter};
use super::ServerOptions;
use crate::error::HandlerError;
use bytes::{Bytes, BytesMut};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::Instant;
use tracing::{debug, warn};

/// Size of the request buffer, including the byte reserved for a terminator.
pub const BUF_SIZE: usize = 1024;

/// Most bytes read from a single client.
pub const READ_LIMIT: usize = BUF_SIZE - 1;

/// Serves exactly one client: read its request, report it, close.
#[derive(Clone, Debug)]
pub struct ConnectionHandler {
    timeout: Duration,
    reporter: Reporter,
}

impl ConnectionHandler {
    pub fn new(timeout: Duration, reporter: Reporter) -> Self {
        Self { timeout, reporter }
    }

    pub fn from_options(options: &ServerOptions) -> Self {
        Self::new(options.client_timeout, options.reporter.clone())
    }

    /// Errors only affect this client and are logged here.
    pub async fn handle<S, P>(&self, stream: S, peer: P)
    where
        S: AsyncRead + AsyncWrite + Unpin,
        P: PeerAddress,
    {
        let peer = peer_address(&peer);
        debug!(%peer, "handling client");

        match self.process(stream).await {
            Ok(line) => self.reporter.emit(Report::new(peer, line)).await,
            Err(err) => warn!(%peer, "{}", err),
        }
    }

    /// Reads the request and extracts its line. The stream is shut down and
    /// dropped whatever the outcome; nothing is ever written to it.
    pub async fn process<S>(&self, mut stream: S) -> Result<Bytes, HandlerError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let request = read_request(&mut stream, self.timeout).await;

        if let Err(err) = stream.shutdown().await {
            debug!("error closing client connection: {}", err);
        }

        Ok(extract_line(request?))
    }
}

/// Reads until end of input, [`READ_LIMIT`] bytes, or the timeout.
///
/// A timeout ends the read phase; bytes received so far are kept. Only a
/// client that sent nothing at all before the deadline is an error.
pub async fn read_request<R>(reader: &mut R, timeout: Duration) -> Result<Bytes, HandlerError>
where
    R: AsyncRead + Unpin,
{
    let deadline = Instant::now() + timeout;
    let mut buffer = BytesMut::with_capacity(READ_LIMIT);
    let mut reader = reader.take(READ_LIMIT as u64);

    loop {
        match tokio::time::timeout_at(deadline, reader.read_buf(&mut buffer)).await {
            Ok(Ok(0)) => break,
            Ok(Ok(_)) => continue,
            Ok(Err(err)) => return Err(HandlerError::Io(err)),
            Err(_) if buffer.is_empty() => return Err(HandlerError::TimedOut(timeout)),
            Err(_) => {
                debug!(bytes = buffer.len(), "client read timed out; using partial request");
                break;
            }
        }
    }

    Ok(buffer.freeze())
}

/// The reported part of a request.
///
/// With a newline at index `i` this is `request[..i - 1]`: the byte before the
/// newline is dropped as well, so `"hello\n"` yields `"hell"`. This looks like
/// an off-by-one meant to strip a `\r`, but existing logs depend on it. A
/// newline at index 0 yields an empty line. Without a newline the whole
/// request is returned.
pub fn extract_line(request: Bytes) -> Bytes {
    match request.iter().position(|&byte| byte == b'\n') {
        Some(end) => request.slice(..end.saturating_sub(1)),
        None => request,
    }
}
