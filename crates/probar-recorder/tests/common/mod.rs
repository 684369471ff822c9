//! Shared helpers for integration tests.

#![allow(dead_code)]

use probar_recorder::{FakeClock, NodeMeta, Recorder, RecorderConfig};
use std::sync::Arc;

/// Route recorder events to the test output; safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("probar_recorder=debug")),
        )
        .with_test_writer()
        .try_init();
}

/// A begun recorder on a clock that moves 1ms per read.
pub fn begun_recorder(config: RecorderConfig) -> (Recorder, Arc<FakeClock>) {
    init_tracing();
    let clock = Arc::new(FakeClock::ticking(1_700_000_000_000, 1));
    let recorder = Recorder::with_clock(config, clock.clone());
    recorder
        .begin("Nightly Run", vec![vec!["env".into(), "ci".into()]], vec![])
        .unwrap();
    (recorder, clock)
}

/// Metadata with a description, a tag, a property and a link.
pub fn full_meta(name: &str) -> NodeMeta {
    NodeMeta::new(name)
        .with_description(format!("{name} description"))
        .with_tag("smoke")
        .with_property("owner", "qa")
        .with_link("ticket", format!("https://tracker.example.com/{name}"))
}
