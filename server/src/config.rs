use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Realtime whiteboard relay server.
///
/// Every option can also be supplied through the environment variable shown
/// in `--help`; command line arguments win when both are present.
#[derive(Debug, Clone, Parser)]
#[command(name = "whiteboard-server", version)]
pub struct Config {
    /// Interface to listen on.
    #[arg(long, env = "WHITEBOARD_HOST", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,

    /// Port for both the WebSocket endpoint and the static assets.
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Directory of bundled client assets served at `/`.
    #[arg(long, env = "WHITEBOARD_STATIC_DIR", default_value = "public")]
    pub static_dir: PathBuf,

    /// Outbound events queued per connection before deliveries are dropped.
    #[arg(long, env = "WHITEBOARD_CONNECTION_BUFFER", default_value_t = 256)]
    pub connection_buffer: usize,

    /// Client events queued for the server task before new ones are refused.
    #[arg(long, env = "WHITEBOARD_SERVER_BUFFER", default_value_t = 1024)]
    pub server_buffer: usize,

    /// Seconds between server pings.
    #[arg(
        long,
        env = "WHITEBOARD_HEARTBEAT_INTERVAL",
        default_value_t = 5,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub heartbeat_interval: u64,

    /// Seconds of silence after which a connection is dropped. Must exceed
    /// the heartbeat interval.
    #[arg(
        long,
        env = "WHITEBOARD_CLIENT_TIMEOUT",
        default_value_t = 10,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub client_timeout: u64,
}

impl Config {
    /// Parses the process arguments, exiting with usage on error.
    pub fn load() -> Self {
        Self::try_load_from(std::env::args_os()).unwrap_or_else(|error| error.exit())
    }

    pub fn try_load_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let config = Self::try_parse_from(args)?;
        if config.client_timeout <= config.heartbeat_interval {
            return Err(Self::command().error(
                ErrorKind::ArgumentConflict,
                "--client-timeout must be greater than --heartbeat-interval",
            ));
        }
        Ok(config)
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval)
    }

    pub fn client_timeout(&self) -> Duration {
        Duration::from_secs(self.client_timeout)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 3000,
            static_dir: PathBuf::from("public"),
            connection_buffer: 256,
            server_buffer: 1024,
            heartbeat_interval: 5,
            client_timeout: 10,
        }
    }
}
