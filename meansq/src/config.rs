use clap::Parser;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8080;

/// Accepts integers and answers with the mean of squares of every distinct
/// value seen so far.
#[derive(Parser, Debug, Clone)]
#[command(name = "meansq-server", version, about, long_about = None)]
pub struct ServerConfig {
    /// Address to listen on.
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub bind: IpAddr,

    #[arg(long, short, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Seconds between two snapshot files.
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
    pub snapshot_interval: u64,

    /// Directory receiving snapshot files.
    #[arg(long, default_value = ".")]
    pub snapshot_dir: PathBuf,

    #[arg(long, default_value = "server_log.txt")]
    pub log_file: PathBuf,
}

impl ServerConfig {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    pub fn snapshot_interval(&self) -> Duration {
        Duration::from_secs(self.snapshot_interval)
    }
}

/// Sends random integers to a meansq server and prints the replies.
#[derive(Parser, Debug, Clone)]
#[command(name = "meansq-client", version, about, long_about = None)]
pub struct ClientConfig {
    #[arg(default_value = "127.0.0.1")]
    pub host: String,

    #[arg(default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Pause between a response and the next request.
    #[arg(long, default_value_t = 200)]
    pub delay_ms: u64,

    /// Defaults to client_log_<timestamp>.txt in the working directory.
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl ClientConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn log_file(&self) -> PathBuf {
        self.log_file.clone().unwrap_or_else(|| {
            PathBuf::from(format!(
                "client_log_{}.txt",
                chrono::Local::now().format("%Y%m%d_%H%M%S")
            ))
        })
    }
}
