use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use crate::config::AddressFamily;

/// An invalid combination of command line options.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("'{address}' is not a valid {family} address")]
    InvalidAddress {
        address: String,
        family: AddressFamily,
    },

    #[error("'{address}' is an {found} address but the listener was configured for {expected}{hint}")]
    FamilyMismatch {
        address: String,
        expected: AddressFamily,
        found: AddressFamily,
        hint: &'static str,
    },
}

impl ConfigError {
    pub fn invalid_address(address: &str, family: AddressFamily) -> Self {
        Self::InvalidAddress {
            address: address.to_string(),
            family,
        }
    }

    pub fn family_mismatch(address: &str, expected: AddressFamily, found: AddressFamily) -> Self {
        let hint = match found {
            AddressFamily::Inet6 => " (use -6 to bind an IPv6 address)",
            AddressFamily::Inet => "",
        };

        Self::FamilyMismatch {
            address: address.to_string(),
            expected,
            found,
            hint,
        }
    }
}

/// Failures that stop the server before or while it starts accepting.
#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum ServerError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("binding stream socket to {address}: {source}")]
    Bind {
        address: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("getting socket name: {0}")]
    LocalAddr(#[source] io::Error),

    #[error("cannot catch {signal}: {source}")]
    Signal {
        signal: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("cannot transit into daemon mode: {0}")]
    Daemon(#[source] io::Error),

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

/// Why a single client connection was abandoned.
#[derive(thiserror::Error, Debug)]
pub enum HandlerError {
    #[error("reading from client: {0}")]
    Io(#[from] io::Error),

    #[error("client sent nothing within {0:?}")]
    TimedOut(Duration),
}

#[derive(Debug, thiserror::Error)]
#[error("failed to send message to server")]
pub struct ServerSendError;
