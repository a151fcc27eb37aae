//! Derived-metrics engine for a classroom dashboard: entity stores with
//! simulated latency, loose foreign-key joins, grade and attendance
//! aggregation, and the dashboard summary. `ipc` exposes it all to a
//! presentation layer over stdin/stdout.

pub mod calc;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod fixtures;
pub mod gradebook;
pub mod ipc;
pub mod join;
pub mod model;
pub mod store;
pub mod validate;
