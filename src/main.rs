//! Starts a few entities that all write to the process-wide bus.
//!
//! Standard output carries one launch line and one identity line per entity
//! and one line per completed transmission. Diagnostics go to standard error,
//! filtered by `RUST_LOG`.

use std::process::ExitCode;
use std::sync::Arc;

use singleton_bus::{launch_entities, system_bus, EntityCallback, EntityEvent};
use tracing_subscriber::EnvFilter;

const ENTITY_COUNT: usize = 3;

fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    setup_tracing();

    let observer: Arc<EntityCallback> = Arc::new(|event: &EntityEvent| match event {
        EntityEvent::Launching { .. } | EntityEvent::Obtained { .. } => println!("{event}"),
        EntityEvent::Finished { .. } => {}
    });

    // Built here so the printer is attached before any entity can send.
    system_bus::get_instance().set_transmit_callback(|transmission| println!("{transmission}"));

    let (handles, mut failed) =
        match launch_entities(ENTITY_COUNT, system_bus::registry(), Some(observer)) {
            Ok(handles) => (handles, false),
            Err(err) => {
                tracing::error!(%err, "failed to launch entities");
                (err.started, true)
            }
        };

    for handle in handles {
        if let Err(err) = handle.join() {
            tracing::error!(%err, "entity did not finish");
            failed = true;
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
