use crate::error::ConfigError;
use clap::Parser;
use std::fmt::{Display, Formatter};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_CLIENT_TIMEOUT_SECS: u64 = 20;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressFamily {
    Inet,
    Inet6,
}

impl AddressFamily {
    pub fn of(ip: &IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => Self::Inet,
            IpAddr::V6(_) => Self::Inet6,
        }
    }
}

impl Display for AddressFamily {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inet => write!(f, "IPv4"),
            Self::Inet6 => write!(f, "IPv6"),
        }
    }
}

/// Command line options. Parsed once at startup and never mutated.
#[derive(Parser, Clone, Debug)]
#[command(name = "sws")]
#[command(about = "A small TCP listener that reads and logs one line per client")]
#[command(version)]
pub struct Config {
    /// Stay in the foreground and print every request to stdout
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Bind only to the given IPv4 or IPv6 address
    #[arg(short = 'i', long = "address", value_name = "ADDRESS")]
    pub address: Option<String>,

    /// Treat the bind address as an IPv6 address
    #[arg(short = '6', long)]
    pub ipv6: bool,

    /// Append every request to the given file
    #[arg(short = 'l', long = "log", value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Port to listen on
    #[arg(short = 'p', long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Seconds to wait for a client to send its request (at least 1)
    #[arg(
        short = 't',
        long = "timeout",
        value_name = "SECONDS",
        default_value_t = DEFAULT_CLIENT_TIMEOUT_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout_secs: u64,
}

impl Config {
    /// IPv6 unless an address was given without asking for IPv6.
    pub fn family(&self) -> AddressFamily {
        if self.address.is_none() || self.ipv6 {
            AddressFamily::Inet6
        } else {
            AddressFamily::Inet
        }
    }

    pub fn client_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The socket address to bind, with the port in host order.
    ///
    /// Without an explicit address this is the IPv6 wildcard. An explicit
    /// address must parse and must belong to the selected family.
    pub fn bind_address(&self) -> Result<SocketAddr, ConfigError> {
        let family = self.family();

        let ip = match self.address.as_deref() {
            None => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
            Some(address) => parse_address(address, family)?,
        };

        Ok(SocketAddr::new(ip, self.port))
    }
}

fn parse_address(address: &str, family: AddressFamily) -> Result<IpAddr, ConfigError> {
    let parsed = match family {
        AddressFamily::Inet => address.parse::<Ipv4Addr>().map(IpAddr::V4),
        AddressFamily::Inet6 => address.parse::<Ipv6Addr>().map(IpAddr::V6),
    };

    parsed.or_else(|_| match address.parse::<IpAddr>() {
        Ok(other) => Err(ConfigError::family_mismatch(
            address,
            family,
            AddressFamily::of(&other),
        )),
        Err(_) => Err(ConfigError::invalid_address(address, family)),
    })
}
