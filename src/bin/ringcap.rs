//! ringcap - capture UDP datagrams to disk through a slot ring buffer
//!
//! Three threads share one ring:
//! - producer: socket -> ring
//! - consumer: ring -> capture file
//! - monitor: live occupancy gauge on stderr
//!
//! # Usage
//!
//! ```text
//! ringcap --port 8888 --output raw_capture.dat --slots 10
//! ```
//!
//! Ctrl+C stops the producer; buffered records are still written before exit.
//! A failed or short disk write aborts with a non-zero exit status.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tracing::{error, info, warn, Level};

use ringcap::Core::cancel::install_interrupt_handler;
use ringcap::Core::logging::{self, LogConfig, LogFormat};
use ringcap::Core::sink::DEFAULT_CAPTURE_FILE;
use ringcap::Core::source::{DEFAULT_LISTEN_PORT, DEFAULT_RECV_BUFFER};
use ringcap::SPSC::Structs::OversizePolicy;
use ringcap::SPSC::{StopReason, DEFAULT_NUM_SLOTS, DEFAULT_SLOT_CAPACITY};
use ringcap::{CancellationToken, CaptureError, FileSink, PipelineBuilder, UdpSource};

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Oversize {
    /// Drop datagrams larger than a slot
    Reject,
    /// Keep the first slot-capacity bytes of oversized datagrams
    Truncate,
}

impl From<Oversize> for OversizePolicy {
    fn from(value: Oversize) -> Self {
        match value {
            Oversize::Reject => OversizePolicy::Reject,
            Oversize::Truncate => OversizePolicy::Truncate,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "ringcap")]
#[command(about = "Capture UDP datagrams to a file through a slot ring buffer", long_about = None)]
struct Cli {
    /// Address to bind
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    bind: IpAddr,

    /// UDP port to listen on
    #[arg(short, long, default_value_t = DEFAULT_LISTEN_PORT)]
    port: u16,

    /// Capture file (created or truncated)
    #[arg(short, long, default_value = DEFAULT_CAPTURE_FILE)]
    output: PathBuf,

    /// Number of ring slots
    #[arg(long, default_value_t = DEFAULT_NUM_SLOTS)]
    slots: usize,

    /// Bytes per slot; the largest datagram kept intact
    #[arg(long, default_value_t = DEFAULT_SLOT_CAPACITY)]
    slot_capacity: usize,

    /// Kernel socket receive buffer in bytes
    #[arg(long, default_value_t = DEFAULT_RECV_BUFFER)]
    recv_buffer: usize,

    /// How long the producer waits on the socket before re-checking for Ctrl+C
    #[arg(long, default_value_t = 1000)]
    poll_timeout_ms: u64,

    /// Status gauge refresh interval
    #[arg(long, default_value_t = 100)]
    monitor_interval_ms: u64,

    /// Disable the status gauge
    #[arg(long)]
    quiet: bool,

    /// What to do with datagrams larger than a slot
    #[arg(long, value_enum, default_value_t = Oversize::Reject)]
    oversize: Oversize,

    /// Log level (RUST_LOG overrides)
    #[arg(long, default_value_t = Level::INFO)]
    log_level: Level,

    /// Multi-line log output
    #[arg(long)]
    pretty: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let format = if cli.pretty {
        LogFormat::Pretty
    } else {
        LogFormat::Compact
    };
    if let Err(e) = logging::init(&LogConfig::new(cli.log_level).with_format(format)) {
        eprintln!("{e}");
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, fatal = e.is_fatal(), "capture aborted");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> ringcap::Result<()> {
    let pipeline = PipelineBuilder::new()
        .with_slots(cli.slots)
        .with_slot_capacity(cli.slot_capacity)
        .with_poll_timeout(Duration::from_millis(cli.poll_timeout_ms))
        .with_monitor_interval(Duration::from_millis(cli.monitor_interval_ms))
        .with_oversize_policy(cli.oversize.into())
        .build()?;

    let addr = SocketAddr::new(cli.bind, cli.port);
    let source = UdpSource::bind(addr).map_err(|e| {
        CaptureError::Source(std::io::Error::new(
            e.kind(),
            format!("Unable to bind to {addr}: {e}"),
        ))
    })?;
    if let Err(e) = source.set_recv_buffer_size(cli.recv_buffer) {
        warn!(error = %e, bytes = cli.recv_buffer, "unable to set receive buffer size");
    }
    info!(addr = %source.local_addr()?, "listening");

    let sink = FileSink::create(&cli.output)?;

    let cancel = CancellationToken::new();
    install_interrupt_handler(&cancel)?;

    let report = if cli.quiet {
        pipeline.run(source, sink, &cancel)?
    } else {
        eprintln!("Receiving packets. Ctrl+C to quit.");
        pipeline.run_with_monitor(source, sink, std::io::stderr(), &cancel)?
    };

    if let StopReason::SourceFailed(e) = &report.producer.stop {
        warn!(error = %e, "capture ended early: socket failed");
    }

    info!(
        records = report.consumer.records,
        bytes = report.consumer.bytes,
        dropped = report.producer.oversized_dropped,
        output = %cli.output.display(),
        "capture complete"
    );
    Ok(())
}
