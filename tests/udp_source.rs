// UDP source against loopback. Every test binds an ephemeral port.
//
// cargo test --test udp_source -- --nocapture

use ringcap::SPSC::StopReason;
use ringcap::{CancellationToken, FileSink, PipelineBuilder, Readiness, Source, UdpSource};
use serial_test::serial;
use std::net::{SocketAddr, UdpSocket};
use std::thread;
use std::time::{Duration, Instant};

const WAIT: Duration = Duration::from_millis(500);

fn loopback() -> SocketAddr {
    "127.0.0.1:0".parse().unwrap()
}

fn sender() -> UdpSocket {
    UdpSocket::bind(loopback()).unwrap()
}

/// Wait for readiness and read one datagram, retrying spurious wakeups.
fn read_one(source: &mut UdpSource, buf: &mut [u8]) -> usize {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        assert!(Instant::now() < deadline, "no datagram arrived");
        if source.wait_ready(WAIT).unwrap() == Readiness::TimedOut {
            continue;
        }
        match source.read_into(buf) {
            Ok(n) => return n,
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => continue,
            Err(e) => panic!("read failed: {e}"),
        }
    }
}

#[test]
#[serial]
fn test_wait_times_out_without_traffic() {
    let mut source = UdpSource::bind(loopback()).unwrap();
    let start = Instant::now();
    assert_eq!(
        source.wait_ready(Duration::from_millis(50)).unwrap(),
        Readiness::TimedOut
    );
    assert!(start.elapsed() >= Duration::from_millis(40));
}

#[test]
#[serial]
fn test_datagrams_are_read_whole_and_in_order() {
    let mut source = UdpSource::bind(loopback()).unwrap();
    source.set_recv_buffer_size(256 * 1024).unwrap();
    let addr = source.local_addr().unwrap();
    let tx = sender();

    for i in 0..5u32 {
        tx.send_to(&vec![i as u8; 100 + i as usize], addr).unwrap();
    }

    let mut buf = [0u8; 2048];
    for i in 0..5u32 {
        let n = read_one(&mut source, &mut buf);
        assert_eq!(n, 100 + i as usize);
        assert!(buf[..n].iter().all(|b| *b == i as u8));
    }

    // Drained: the next read reports WouldBlock rather than blocking.
    let err = source.read_into(&mut buf).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::WouldBlock);
}

#[cfg(target_os = "linux")]
#[test]
#[serial]
fn test_oversized_datagram_reports_real_length() {
    let mut source = UdpSource::bind(loopback()).unwrap();
    let addr = source.local_addr().unwrap();
    sender().send_to(&[5u8; 300], addr).unwrap();

    let mut buf = [0u8; 64];
    let n = read_one(&mut source, &mut buf);
    assert_eq!(n, 300);
    assert_eq!(buf, [5u8; 64]);
}

#[cfg(not(target_os = "linux"))]
#[test]
#[serial]
fn test_oversized_datagram_is_cut_to_buffer() {
    let mut source = UdpSource::bind(loopback()).unwrap();
    let addr = source.local_addr().unwrap();
    sender().send_to(&[5u8; 300], addr).unwrap();

    let mut buf = [0u8; 64];
    assert_eq!(read_one(&mut source, &mut buf), 64);
}

#[cfg(target_os = "linux")]
#[test]
#[serial]
fn test_port_can_be_rebound_while_in_use() {
    let first = UdpSource::bind(loopback()).unwrap();
    let addr = first.local_addr().unwrap();

    // Both sockets carry SO_REUSEADDR, so the second bind succeeds.
    let second = UdpSource::bind(addr).unwrap();
    assert_eq!(second.local_addr().unwrap(), addr);
}

#[test]
#[serial]
fn test_binds_ipv6_loopback() {
    let addr: SocketAddr = "[::1]:0".parse().unwrap();
    match UdpSource::bind(addr) {
        Ok(source) => {
            let local = source.local_addr().unwrap();
            assert!(local.is_ipv6());
            assert_ne!(local.port(), 0);
        }
        // Hosts without IPv6 loopback.
        Err(e) => println!("skipping, ipv6 loopback unavailable: {e}"),
    }
}

#[test]
#[serial]
fn test_shutdown_is_idempotent() {
    let mut source = UdpSource::bind(loopback()).unwrap();
    source.shutdown();
    source.shutdown();
    assert!(format!("{source:?}").contains("UdpSource"));
}

#[test]
#[serial]
fn test_capture_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("raw_capture.dat");

    let source = UdpSource::bind(loopback()).unwrap();
    let addr = source.local_addr().unwrap();
    let sink = FileSink::create(&path).unwrap();
    let cancel = CancellationToken::new();
    let pipeline = PipelineBuilder::new()
        .with_slots(4)
        .with_slot_capacity(1500)
        .with_poll_timeout(Duration::from_millis(20))
        .build()
        .unwrap();
    let ring = pipeline.ring().clone();

    let report = thread::scope(|s| {
        let run = s.spawn(|| pipeline.run(source, sink, &cancel));

        let tx = sender();
        for seq in 0..32u32 {
            tx.send_to(&seq.to_be_bytes(), addr).unwrap();
            // Loopback drops nothing at this pace, even with a small ring.
            thread::sleep(Duration::from_millis(2));
        }

        let deadline = Instant::now() + Duration::from_secs(5);
        while ring.stats().total_consumed < 32 {
            assert!(Instant::now() < deadline, "capture stalled");
            thread::sleep(Duration::from_millis(5));
        }
        cancel.cancel();
        run.join().unwrap().unwrap()
    });

    assert!(matches!(report.producer.stop, StopReason::Cancelled));
    assert_eq!(report.consumer.records, 32);

    let bytes = std::fs::read(&path).unwrap();
    let seqs: Vec<u32> = bytes
        .chunks_exact(4)
        .map(|c| u32::from_be_bytes(c.try_into().unwrap()))
        .collect();
    assert_eq!(seqs, (0..32).collect::<Vec<_>>());
}
