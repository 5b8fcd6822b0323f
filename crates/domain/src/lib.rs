//! # rainhub-domain
//!
//! Pure domain model for the rainhub home automation hub.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **Topics** and **TelemetryPoints** (the flattened, versioned
//!   time series built from inbound payloads)
//! - Define **Automations** (trigger → condition tree → steps)
//! - Define **Presets** (system-computed operand values)
//! - Solar ephemeris: pure computation of named solar instants, including
//!   the synthetic angle-derived positions
//! - Contain all invariant enforcement and domain logic
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod automation;
pub mod preset;
pub mod solar;
pub mod telemetry;
