//! Causal Groups: arbitration of competing activations over shared properties.
//!
//! A causal group ("superspike") is the synchronization domain of a set of
//! spikes and the activations referencing them. It decides which activation
//! may write a property, tracks which activations could still cause a
//! future signal, and can be merged irreversibly with another group once
//! their spikes turn out to be related.
//!
//! ## Guarantees
//!
//! - **Mutual exclusion**: a property claimed by a running activation is
//!   unavailable to every other suitor until that activation resigns.
//! - **Specificity ordering**: a suitor never gets consent while a more
//!   specific activation references one of its properties; the rival is
//!   pressured instead.
//! - **Exact refcounts**: no zero count is ever stored, so a spike without
//!   entries and without offspring is stale.
//! - **Shared identity after merge**: both handles resolve to one lock and
//!   one set of indices.
//!
//! ## Usage
//!
//! Every operation lives on [`GroupGuard`], obtained from
//! [`CausalGroup::lock`]. The lock is reentrant, and collaborator callbacks
//! ([`Activation::dereference`] and friends) may re-enter the group.
//!
//! ```
//! use causal_group::mocks::{MockActivation, MockSpike};
//! use causal_group::CausalGroup;
//!
//! let group = CausalGroup::new(["p1"]);
//! let spike = MockSpike::new("sig", &group).handle();
//! let act = MockActivation::builder("writer").resources(["p1"]).build();
//!
//! assert!(act.acquire(&spike, false));
//! let guard = group.lock();
//! assert!(guard.consent(&act.handle()));
//! guard.activated(&act.handle());
//! assert!(guard.available_resources().is_empty());
//! ```

#![deny(unsafe_code)]

pub mod config;
mod effects;
pub mod error;
pub mod group;
mod guard;
mod index;
mod merge;
pub mod mocks;
mod sanity;
pub mod telemetry;
pub mod traits;

pub use causal_types;
pub use config::GroupConfig;
pub use error::{CausalError, Result};
pub use group::{CausalGroup, GroupGuard};
pub use mocks::{MockActivation, MockJournal, MockSpike};
pub use telemetry::init_tracing;
pub use traits::{Activation, ActivationRef, SignalRef, Spike, SpikeRef};
