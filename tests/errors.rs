use ringcap::Core::logging::{self, LogConfig, LogFormat};
use ringcap::CaptureError;
use std::io;
use tracing::Level;

#[test]
fn test_fatal_classification() {
    assert!(CaptureError::Sink(io::Error::new(io::ErrorKind::Other, "disk")).is_fatal());
    assert!(CaptureError::ShortWrite {
        written: 1,
        expected: 2
    }
    .is_fatal());
    assert!(CaptureError::ThreadPanicked("consumer").is_fatal());

    assert!(!CaptureError::Closed.is_fatal());
    assert!(!CaptureError::StreamEnded.is_fatal());
    assert!(!CaptureError::InvalidGeometry("zero slots".into()).is_fatal());
}

#[test]
fn test_messages_carry_context() {
    let err = CaptureError::RecordTooLarge {
        len: 9000,
        capacity: 8192,
    };
    assert_eq!(
        err.to_string(),
        "record of 9000 bytes exceeds slot capacity of 8192 bytes"
    );
    assert_eq!(
        CaptureError::ShortWrite {
            written: 10,
            expected: 40
        }
        .to_string(),
        "short write: 10 of 40 bytes"
    );

    let io_err: CaptureError = io::Error::new(io::ErrorKind::PermissionDenied, "denied").into();
    assert!(matches!(io_err, CaptureError::Io(_)));
}

#[test]
fn test_logging_init_twice_is_ok() {
    let config = LogConfig::new(Level::DEBUG)
        .with_format(LogFormat::Compact)
        .with_ansi(false);
    logging::init(&config).unwrap();
    logging::init(&LogConfig::default()).unwrap();
    tracing::info!("logging initialised for tests");
}
