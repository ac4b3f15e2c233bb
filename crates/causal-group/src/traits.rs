//! Collaborator interfaces a causal group coordinates.
//!
//! Activations and spikes are owned by the surrounding engine; the group
//! only holds shared handles to them and calls back through these traits.

use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

use causal_types::{ActivationId, PropertyName, SignalId, SpikeId};

use crate::group::CausalGroup;

/// An event instance that activations reference to justify their claims.
pub trait Spike: Send + Sync + fmt::Debug {
    fn id(&self) -> SpikeId;

    /// Signal name of the spike, for log output.
    fn name(&self) -> &str;

    /// Whether this spike has caused any downstream spikes.
    fn has_offspring(&self) -> bool;

    /// The group this spike is a member of.
    fn causal_group(&self) -> CausalGroup;
}

/// A schedulable unit of work competing for writable properties.
pub trait Activation: Send + Sync + fmt::Debug {
    fn id(&self) -> ActivationId;

    fn name(&self) -> &str;

    /// Declared write-resource names.
    fn resources(&self) -> BTreeSet<PropertyName>;

    /// Signals this activation might cause if it runs to completion.
    fn possible_signals(&self) -> Vec<SignalId>;

    /// Priority score. Higher wins resource contention.
    fn specificity(&self) -> f64;

    /// This activation blocks a lower-specificity suitor in `group`.
    fn pressure(&self, group: &CausalGroup);

    /// Forcibly drop interest in `spike`.
    ///
    /// `reacquire` asks the activation to look for a substitute spike;
    /// `reject` marks the loss as a hard failure, in which case the
    /// activation is expected to call `rejected` on the spike's group.
    fn dereference(&self, spike: &SpikeRef, reacquire: bool, reject: bool);

    /// No activation in `group` can still cause `signal`.
    fn effect_not_caused(&self, group: &CausalGroup, signal: &SignalId);

    /// Full constraint signal set, each optionally bound to a spike.
    /// Only used by the reference sanity check.
    fn constraint_signals(&self) -> Vec<SignalRef>;
}

/// One constraint signal of an activation.
#[derive(Clone, Debug)]
pub struct SignalRef {
    pub signal: SignalId,
    /// Spike currently satisfying the signal, if any.
    pub spike: Option<SpikeRef>,
    /// Detached constraints need no write consent.
    pub detached: bool,
}

/// Shared handle to a spike, keyed by the spike's id.
#[derive(Clone)]
pub struct SpikeRef {
    id: SpikeId,
    inner: Arc<dyn Spike>,
}

impl SpikeRef {
    pub fn new(spike: Arc<dyn Spike>) -> Self {
        Self {
            id: spike.id(),
            inner: spike,
        }
    }

    pub fn id(&self) -> SpikeId {
        self.id
    }
}

impl<S: Spike + 'static> From<Arc<S>> for SpikeRef {
    fn from(spike: Arc<S>) -> Self {
        Self::new(spike)
    }
}

impl Deref for SpikeRef {
    type Target = dyn Spike;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref()
    }
}

impl PartialEq for SpikeRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SpikeRef {}

impl Hash for SpikeRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for SpikeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.inner.name(), self.id.short())
    }
}

impl fmt::Display for SpikeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Shared handle to an activation, keyed by the activation's id.
#[derive(Clone)]
pub struct ActivationRef {
    id: ActivationId,
    inner: Arc<dyn Activation>,
}

impl ActivationRef {
    pub fn new(activation: Arc<dyn Activation>) -> Self {
        Self {
            id: activation.id(),
            inner: activation,
        }
    }

    pub fn id(&self) -> ActivationId {
        self.id
    }
}

impl<A: Activation + 'static> From<Arc<A>> for ActivationRef {
    fn from(activation: Arc<A>) -> Self {
        Self::new(activation)
    }
}

impl Deref for ActivationRef {
    type Target = dyn Activation;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref()
    }
}

impl PartialEq for ActivationRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ActivationRef {}

impl Hash for ActivationRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ActivationRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.inner.name(), self.id.short())
    }
}

impl fmt::Display for ActivationRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
