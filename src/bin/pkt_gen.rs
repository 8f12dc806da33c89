//! pkt_gen - UDP traffic generator for exercising ringcap
//!
//! Sends `pkt_count` datagrams of `pkt_size` bytes, each starting with a
//! big-endian u32 sequence number, optionally pausing between packets.
//!
//! ```text
//! pkt_gen 127.0.0.1 8888 1024 10000 0
//! ```

use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};

use ringcap::Core::logging::{self, LogConfig};
use ringcap::{CaptureError, Result};

#[derive(Parser, Debug)]
#[command(name = "pkt_gen")]
#[command(about = "Send numbered UDP datagrams", long_about = None)]
struct Cli {
    /// Destination host
    host: String,

    /// Destination port
    port: u16,

    /// Datagram size in bytes (at least 4, room for the sequence number)
    #[arg(value_parser = clap::value_parser!(u32).range(4..))]
    pkt_size: u32,

    /// Number of datagrams to send
    pkt_count: u32,

    /// Pause between datagrams in milliseconds
    pkt_interval_ms: u64,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = logging::init(&LogConfig::default()) {
        eprintln!("{e}");
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "pkt_gen failed");
            ExitCode::FAILURE
        }
    }
}

fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    (host, port)
        .to_socket_addrs()?
        .find(SocketAddr::is_ipv4)
        .ok_or_else(|| {
            CaptureError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no IPv4 address for {host}"),
            ))
        })
}

fn run(cli: &Cli) -> Result<()> {
    let target = resolve(&cli.host, cli.port)?;
    let socket = UdpSocket::bind(("0.0.0.0", 0))?;
    let interval = Duration::from_millis(cli.pkt_interval_ms);

    let mut buf = vec![0u8; cli.pkt_size as usize];
    for seq in 0..cli.pkt_count {
        buf[..4].copy_from_slice(&seq.to_be_bytes());
        socket.send_to(&buf, target)?;

        if !interval.is_zero() {
            std::thread::sleep(interval);
        }
    }

    info!(
        packets = cli.pkt_count,
        bytes = u64::from(cli.pkt_count) * u64::from(cli.pkt_size),
        dest = %target,
        "sent"
    );
    Ok(())
}
