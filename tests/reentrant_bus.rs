//! Integration tests for the reentrant bus lock and its bounded variants.

use singleton_bus::{Bus, BusConfig, BusError};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn quick_bus() -> Bus {
    Bus::new(BusConfig::default().with_transmit_delay(Duration::from_millis(5)))
}

#[test]
fn test_holder_reenters_while_others_wait() {
    let bus = quick_bus();
    let (held_tx, held_rx) = mpsc::channel();

    thread::scope(|s| {
        let bus = &bus;

        s.spawn(move || {
            let lease = bus.lease();
            lease.send("a1");
            held_tx.send(()).unwrap();
            // Give the other thread time to block on the lock.
            thread::sleep(Duration::from_millis(50));
            bus.send("a2");
            drop(lease);
        });

        s.spawn(move || {
            held_rx.recv().unwrap();
            bus.send("b");
        });
    });

    let log = bus.transmissions();
    let payloads: Vec<_> = log.iter().map(|t| t.payload.as_str()).collect();
    assert_eq!(payloads, vec!["a1", "a2", "b"]);
    assert!(log[2].started >= log[1].finished);
}

#[test]
fn test_nested_leases_release_at_outermost() {
    let bus = quick_bus();
    let (step_tx, step_rx) = mpsc::channel();
    let (nudge_tx, nudge_rx) = mpsc::channel();

    thread::scope(|s| {
        let bus = &bus;

        s.spawn(move || {
            let outer = bus.lease();
            let inner = bus.lease();
            inner.send("nested");
            drop(inner);

            // Inner released, outer still held.
            step_tx.send(()).unwrap();
            nudge_rx.recv().unwrap();

            drop(outer);
            step_tx.send(()).unwrap();
        });

        s.spawn(move || {
            step_rx.recv().unwrap();
            let while_outer = bus.try_lease_for(Duration::from_millis(20)).is_ok();
            nudge_tx.send(()).unwrap();

            step_rx.recv().unwrap();
            let after_outer = bus.try_lease_for(Duration::from_millis(200)).is_ok();

            assert!(!while_outer);
            assert!(after_outer);
        });
    });

    assert_eq!(bus.transmission_count(), 1);
}

#[test]
fn test_recursive_send_from_callback_completes() {
    let bus = Arc::new(quick_bus());
    let weak = Arc::downgrade(&bus);

    bus.set_transmit_callback(move |t| {
        let depth: u32 = t.payload.trim_start_matches("depth-").parse().unwrap_or(0);
        if t.payload.starts_with("depth-") && depth < 3 {
            if let Some(bus) = weak.upgrade() {
                bus.send(format!("depth-{}", depth + 1));
            }
        }
    });

    let competitor = {
        let bus = Arc::clone(&bus);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(2));
            bus.send("other");
        })
    };

    bus.send("depth-0");
    competitor.join().unwrap();
    bus.clear_transmit_callback();

    let payloads: Vec<String> = bus.transmissions().into_iter().map(|t| t.payload).collect();
    assert_eq!(payloads.len(), 5);

    // The recursive chain runs under one outer hold, so nothing interleaves it.
    let start = payloads.iter().position(|p| p == "depth-0").unwrap();
    assert_eq!(
        payloads[start..start + 4],
        ["depth-0", "depth-1", "depth-2", "depth-3"]
    );
}

#[test]
fn test_timeout_is_reported_and_leaves_state() {
    let bus = quick_bus();
    bus.send("before");
    let (held_tx, held_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();

    thread::scope(|s| {
        let bus = &bus;
        s.spawn(move || {
            let _lease = bus.lease();
            held_tx.send(()).unwrap();
            release_rx.recv().unwrap();
        });

        held_rx.recv().unwrap();
        let err = bus
            .send_timeout("blocked", Duration::from_millis(30))
            .unwrap_err();
        assert_eq!(
            err,
            BusError::LockTimeout {
                waited: Duration::from_millis(30)
            }
        );
        release_tx.send(()).unwrap();
    });

    assert_eq!(bus.last_payload().as_deref(), Some("before"));
    assert_eq!(bus.transmission_count(), 1);

    // The failed call released nothing it did not own; the bus is usable.
    let t = bus.send_timeout("after", Duration::from_millis(200)).unwrap();
    assert_eq!(t.seq, 2);
}
