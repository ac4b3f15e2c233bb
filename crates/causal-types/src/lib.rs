//! Causal Group Domain Types
//!
//! Plain data shared between causal groups and their collaborators:
//!
//! - **Identifiers**: activations, spikes, signals and group identities.
//! - **Reject reasons**: why an activation stopped referencing a spike.
//! - **Snapshots**: a serializable, comparable copy of a group's indices,
//!   used for diagnostics and tests.
//!
//! # Architecture
//!
//! This is a pure types crate with no runtime dependencies. IDs use the
//! newtype pattern and implement `Display` and `new()`.

#![deny(unsafe_code)]

mod ids;
mod reason;
mod snapshot;

pub use ids::*;
pub use reason::*;
pub use snapshot::*;
