//! Application layer - orchestration of domain logic.
//!
//! This layer coordinates the domain logic and manages the runtime behavior:
//! - Rate limiter (per-component admission)
//! - Bounded store (retention, eviction, status changes)
//! - Cleanup scheduler (periodic expiry purge)
//! - Service facade and the process-wide instance
//!
//! ## Ports
//!
//! The application layer defines ports (traits) that infrastructure
//! adapters must implement. This keeps the application layer independent
//! from infrastructure details.

pub mod cleanup;
pub mod config;
pub mod global;
pub mod limiter;
pub mod metrics;
pub mod ports;
pub mod service;
pub mod store;
