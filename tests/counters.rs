// Counter invariants, sampled from a third thread while records flow.
//
// cargo test --test counters -- --nocapture

use ringcap::SPSC::Buffer::RingBuffer;
use std::sync::atomic::{AtomicBool, Ordering::SeqCst};
use std::sync::Arc;
use std::thread;

const RECORDS: u64 = 20_000;

#[test]
fn test_counters_stay_bounded_while_running() {
    let rb = Arc::new(RingBuffer::create(8, 64).unwrap());
    let mut producer = rb.producer().unwrap();
    let mut consumer = rb.consumer().unwrap();
    let done = Arc::new(AtomicBool::new(false));

    let sampler = {
        let rb = Arc::clone(&rb);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut samples = 0u64;
            let mut last_produced = 0u64;
            let mut last_consumed = 0u64;
            while !done.load(SeqCst) {
                let stats = rb.stats();
                assert!(stats.slots_filled <= stats.num_slots, "{stats:?}");
                assert!(stats.total_produced >= last_produced);
                assert!(stats.total_consumed >= last_consumed);
                last_produced = stats.total_produced;
                last_consumed = stats.total_consumed;
                samples += 1;
            }
            samples
        })
    };

    let writer = thread::spawn(move || {
        for i in 0..RECORDS {
            producer.send(&i.to_le_bytes()).unwrap();
        }
        producer.finish().unwrap();
    });

    let mut expected = 0u64;
    while let Some(bytes) = consumer.recv().unwrap() {
        let value = u64::from_le_bytes(bytes.try_into().unwrap());
        assert_eq!(value, expected);
        expected += 1;
    }
    writer.join().unwrap();
    done.store(true, SeqCst);
    let samples = sampler.join().unwrap();
    println!("{samples} counter samples taken");

    assert_eq!(expected, RECORDS);
    let stats = rb.stats();
    assert_eq!(stats.slots_filled, 0);
    assert_eq!(stats.total_produced, RECORDS + 1);
    assert_eq!(stats.total_consumed, RECORDS + 1);
}

#[test]
fn test_counters_balance_at_every_quiescent_point() {
    let rb = Arc::new(RingBuffer::create(5, 16).unwrap());
    let mut producer = rb.producer().unwrap();
    let mut consumer = rb.consumer().unwrap();
    let mut rng = fastrand::Rng::with_seed(7);

    let mut in_flight = 0usize;
    for _ in 0..1_000 {
        if in_flight < 5 && (in_flight == 0 || rng.bool()) {
            producer.send(&[rng.u8(..)]).unwrap();
            in_flight += 1;
        } else {
            consumer.recv().unwrap().unwrap();
            in_flight -= 1;
        }

        let stats = rb.stats();
        assert_eq!(stats.slots_filled, in_flight);
        assert_eq!(
            stats.total_produced - stats.total_consumed,
            stats.slots_filled as u64
        );
    }
}
