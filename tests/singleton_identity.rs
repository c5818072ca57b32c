//! Integration tests for singleton identity and construction.
//!
//! Every access point must hand out the same instance, build it exactly once
//! even under a concurrent first access, and never rebuild it afterwards.

use singleton_bus::{define_singleton, system_bus, Bus, BusConfig, RegistryEvent};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Barrier, Mutex};
use std::thread;
use std::time::Duration;

static RACED_CONSTRUCTIONS: AtomicUsize = AtomicUsize::new(0);

fn quick_config() -> BusConfig {
    BusConfig::default().with_transmit_delay(Duration::ZERO)
}

define_singleton!(raced_bus: Bus = {
    RACED_CONSTRUCTIONS.fetch_add(1, Ordering::SeqCst);
    // Keep the constructor busy so the other threads arrive while it runs.
    thread::sleep(Duration::from_millis(25));
    Bus::new(quick_config())
});

define_singleton!(idempotent_bus: Bus = Bus::new(quick_config()));
define_singleton!(locked_bus: Bus = Bus::new(quick_config()));
define_singleton!(many_callers_bus: Bus = Bus::new(quick_config()));
define_singleton!(traced_bus: Bus = Bus::new(quick_config()));

#[test]
fn test_sequential_calls_on_main_thread() {
    let first = system_bus::get_instance();
    let second = system_bus::get_instance();

    assert!(std::ptr::eq(first, second));
    assert_eq!(first.instance_id(), second.instance_id());
    assert_eq!(first.config(), &BusConfig::default());
}

#[test]
fn test_simultaneous_first_access_constructs_once() {
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                raced_bus::get_instance().instance_id()
            })
        })
        .collect();

    let ids: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(RACED_CONSTRUCTIONS.load(Ordering::SeqCst), 1);
    assert!(ids.iter().all(|id| *id == ids[0]));
    assert_eq!(raced_bus::get_instance().instance_id(), ids[0]);
}

#[test]
fn test_identity_stable_across_threads_and_calls() {
    let expected = many_callers_bus::get_instance().instance_id();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            thread::spawn(move || {
                (0..100).all(|_| many_callers_bus::get_instance().instance_id() == expected)
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }
}

#[test]
fn test_repeated_access_keeps_written_state() {
    idempotent_bus::get_instance().send("kept");

    for _ in 0..10 {
        let bus = idempotent_bus::get_instance();
        assert_eq!(bus.last_payload().as_deref(), Some("kept"));
        assert_eq!(bus.transmission_count(), 1);
    }
}

#[test]
fn test_repeated_access_keeps_lock_state() {
    let (held_tx, held_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();

    let holder = thread::spawn(move || {
        let _lease = locked_bus::get_instance().lease();
        held_tx.send(()).unwrap();
        release_rx.recv().unwrap();
    });

    held_rx.recv().unwrap();

    // Asking the registry again must not hand out a fresh, unlocked bus.
    let bus = locked_bus::get_instance();
    assert!(bus.try_lease_for(Duration::from_millis(20)).is_err());

    release_tx.send(()).unwrap();
    holder.join().unwrap();
    assert!(bus.try_lease_for(Duration::from_millis(20)).is_ok());
}

#[test]
fn test_registry_trace_events() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let events_clone = events.clone();

    traced_bus::set_trace_callback(move |event| {
        events_clone.lock().unwrap().push(event.clone());
    });

    assert!(!traced_bus::is_initialized());
    assert!(traced_bus::get().is_none());
    traced_bus::get_instance();
    traced_bus::get_instance();
    traced_bus::clear_trace_callback();

    let captured = events.lock().unwrap();
    assert_eq!(
        *captured,
        vec![
            RegistryEvent::Construct {
                type_name: "singleton_bus::bus::Bus"
            },
            RegistryEvent::Get {
                type_name: "singleton_bus::bus::Bus",
                constructed: true
            },
            RegistryEvent::Get {
                type_name: "singleton_bus::bus::Bus",
                constructed: false
            },
        ]
    );
}
