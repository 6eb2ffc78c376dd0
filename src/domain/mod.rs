//! Domain layer - pure data types and rules with no runtime dependencies.
//!
//! This layer contains the core concepts and invariants of the service:
//! - The notification record and its lifecycle
//! - Sliding-window admission policies
//! - Query filters
//! - The error taxonomy
//!
//! All types in this layer are pure and easily testable.

pub mod error;
pub mod filter;
pub mod notification;
pub mod policy;
