// Capture file behaviour.
//
// cargo test --test sink -- --nocapture

use ringcap::{FileSink, Sink};
use std::fs;

#[test]
fn test_file_sink_writes_records_back_to_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("capture.dat");

    let mut sink = FileSink::create(&path).unwrap();
    assert_eq!(sink.path(), path.as_path());
    assert_eq!(sink.write_record(b"abc").unwrap(), 3);
    assert_eq!(sink.write_record(b"").unwrap(), 0);
    assert_eq!(sink.write_record(&[0xFF; 1000]).unwrap(), 1000);
    sink.flush().unwrap();

    let bytes = fs::read(&path).unwrap();
    assert_eq!(bytes.len(), 1003);
    assert_eq!(&bytes[..3], b"abc");
    assert!(bytes[3..].iter().all(|b| *b == 0xFF));
}

#[test]
fn test_file_sink_truncates_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("capture.dat");
    fs::write(&path, vec![1u8; 4096]).unwrap();

    let mut sink = FileSink::create(&path).unwrap();
    sink.write_record(b"new").unwrap();
    sink.flush().unwrap();
    drop(sink);

    assert_eq!(fs::read(&path).unwrap(), b"new");
}

#[cfg(unix)]
#[test]
fn test_file_sink_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("private.dat");
    let _sink = FileSink::create(&path).unwrap();

    let mode = fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn test_file_sink_reports_unopenable_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("capture.dat");

    let err = FileSink::create(&path).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    assert!(err.to_string().contains("capture.dat"));
}

fn feed<K: Sink>(mut sink: K, parts: &[&[u8]]) -> usize {
    let n = parts.iter().map(|p| sink.write_record(p).unwrap()).sum();
    sink.flush().unwrap();
    n
}

#[test]
fn test_vec_sink_concatenates() {
    let mut sink: Vec<u8> = Vec::new();
    assert_eq!(feed(&mut sink, &[b"he", b"llo"]), 5);
    assert_eq!(sink, b"hello");

    let boxed: Box<dyn Sink> = Box::new(Vec::<u8>::new());
    assert_eq!(feed(boxed, &[b"x"]), 1);
}
