pub mod config;
pub mod error;
pub mod server;

pub use config::Config;
pub use error::{ConfigError, HandlerError, ServerError};
pub use server::{start, ServerHandle, ServerOptions};

use tracing_subscriber::EnvFilter;

/// Diagnostics go to stderr; `RUST_LOG` overrides the default level.
pub fn setup_logger(debug: bool) {
    let default = if debug { "sws=debug" } else { "sws=info" };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(std::io::stderr)
        .init();
}
