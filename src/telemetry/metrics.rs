//! Metric instruments for work list operations.
//!
//! Instruments come from the global `MeterProvider`; without one installed
//! they record nothing.

use opentelemetry::metrics::{Counter, Histogram, Meter};

fn meter() -> Meter {
    opentelemetry::global::meter("worklist")
}

/// Counter: volatile state updates written into the cache.
pub fn state_updates() -> Counter<u64> {
    meter()
        .u64_counter("worklist.state.updates")
        .with_description("Work item state updates")
        .build()
}

/// Counter: commits of a work list definition.
/// Labels: `result`.
pub fn commits() -> Counter<u64> {
    meter()
        .u64_counter("worklist.commits")
        .with_description("Work list commits")
        .build()
}

/// Counter: cursor moves.
/// Labels: `direction` ("first" | "next" | "previous" | "nearest").
pub fn navigation() -> Counter<u64> {
    meter()
        .u64_counter("worklist.navigation")
        .with_description("Work list navigation steps")
        .build()
}

pub fn commit_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("worklist.commit.duration_ms")
        .with_description("Time to build and write a definition")
        .with_unit("ms")
        .build()
}
