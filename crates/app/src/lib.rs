//! Application layer: ports and use-cases.
//!
//! The use-cases orchestrate the domain against the port traits and never
//! touch an adapter directly. Wiring happens in the binary crate.

pub mod evaluator;
pub mod executor;
pub mod ingest;
pub mod ports;
pub mod router;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod testing;
