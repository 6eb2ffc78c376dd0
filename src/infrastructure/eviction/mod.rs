//! Eviction policy adapters for the bounded store.
//!
//! In hexagonal architecture, these are adapters (infrastructure layer)
//! that implement the EvictionPolicy port (application layer).

pub mod oldest_first;
pub mod status_priority;

pub use oldest_first::OldestFirstEviction;
pub use status_priority::StatusPriorityEviction;
