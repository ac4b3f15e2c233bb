//! Nested refcount indices.
//!
//! Leaves are created on demand and removed as soon as they reach zero, so
//! presence of a key always means a positive count. Spike entries whose
//! activation map became empty are pruned either immediately or lazily by
//! [`SpikeRefs::is_referenced`].

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use causal_types::{PropertyName, SignalId, SpikeCounts};

use crate::traits::{ActivationRef, SpikeRef};

/// Outcome of a single refcount decrement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Decrement {
    /// No entry existed for the pair.
    Missing,
    /// Count went down and is still positive.
    Decremented,
    /// Count reached zero and the entry was removed.
    Released,
}

impl Decrement {
    pub(crate) fn found(self) -> bool {
        !matches!(self, Decrement::Missing)
    }
}

/// spike -> activation -> refcount
#[derive(Clone, Debug, Default)]
pub(crate) struct SpikeRefs {
    spikes: HashMap<SpikeRef, HashMap<ActivationRef, u32>>,
}

impl SpikeRefs {
    pub(crate) fn increment(&mut self, spike: &SpikeRef, act: &ActivationRef, by: u32) {
        if by == 0 {
            return;
        }
        *self
            .spikes
            .entry(spike.clone())
            .or_default()
            .entry(act.clone())
            .or_insert(0) += by;
    }

    /// Decrement the count of `(spike, act)` by one, pruning empty leaves.
    pub(crate) fn decrement(&mut self, spike: &SpikeRef, act: &ActivationRef) -> Decrement {
        let Some(acts) = self.spikes.get_mut(spike) else {
            return Decrement::Missing;
        };
        let outcome = match acts.get_mut(act) {
            None => Decrement::Missing,
            Some(count) if *count > 1 => {
                *count -= 1;
                Decrement::Decremented
            }
            Some(_) => {
                acts.remove(act);
                Decrement::Released
            }
        };
        if acts.is_empty() {
            self.spikes.remove(spike);
        }
        outcome
    }

    pub(crate) fn count(&self, spike: &SpikeRef, act: &ActivationRef) -> u32 {
        self.spikes
            .get(spike)
            .and_then(|acts| acts.get(act))
            .copied()
            .unwrap_or(0)
    }

    /// Remove every reference to `spike`, returning what was held.
    pub(crate) fn take_spike(&mut self, spike: &SpikeRef) -> Option<HashMap<ActivationRef, u32>> {
        self.spikes.remove(spike)
    }

    /// Whether any activation still references `spike`. An empty leaf
    /// found on the way is pruned.
    pub(crate) fn is_referenced(&mut self, spike: &SpikeRef) -> bool {
        match self.spikes.get(spike) {
            Some(acts) if !acts.is_empty() => true,
            Some(_) => {
                self.spikes.remove(spike);
                false
            }
            None => false,
        }
    }

    /// Add every count of `other` into `self`.
    pub(crate) fn absorb(&mut self, other: SpikeRefs) {
        for (spike, acts) in other.spikes {
            for (act, count) in acts {
                self.increment(&spike, &act, count);
            }
        }
    }

    /// Replace whole spike entries with the ones from `other`.
    pub(crate) fn overwrite_with(&mut self, other: SpikeRefs) {
        self.spikes.extend(other.spikes);
    }

    /// Every `(spike, activation)` pair with a positive count.
    pub(crate) fn pairs(&self) -> Vec<(SpikeRef, ActivationRef)> {
        self.spikes
            .iter()
            .flat_map(|(spike, acts)| acts.keys().map(move |act| (spike.clone(), act.clone())))
            .collect()
    }

    pub(crate) fn activations(&self) -> impl Iterator<Item = &ActivationRef> {
        self.spikes.values().flat_map(|acts| acts.keys())
    }

    /// Sum of the counts `act` holds over all spikes.
    pub(crate) fn total_for(&self, act: &ActivationRef) -> u32 {
        self.spikes.values().filter_map(|acts| acts.get(act)).sum()
    }

    pub(crate) fn to_counts(&self) -> SpikeCounts {
        self.spikes
            .iter()
            .map(|(spike, acts)| {
                let counts = acts.iter().map(|(act, c)| (act.id(), *c)).collect();
                (spike.id(), counts)
            })
            .collect()
    }
}

/// resource -> spike -> activation -> refcount
///
/// A resource has an entry exactly while it is tracked by the group.
#[derive(Clone, Debug, Default)]
pub(crate) struct RefIndex {
    resources: HashMap<PropertyName, SpikeRefs>,
}

impl RefIndex {
    pub(crate) fn with_resources<'a>(names: impl IntoIterator<Item = &'a PropertyName>) -> Self {
        Self {
            resources: names
                .into_iter()
                .map(|name| (name.clone(), SpikeRefs::default()))
                .collect(),
        }
    }

    pub(crate) fn tracks(&self, resource: &str) -> bool {
        self.resources.contains_key(resource)
    }

    pub(crate) fn tracked(&self) -> BTreeSet<PropertyName> {
        self.resources.keys().cloned().collect()
    }

    pub(crate) fn get(&self, resource: &str) -> Option<&SpikeRefs> {
        self.resources.get(resource)
    }

    pub(crate) fn get_mut(&mut self, resource: &str) -> Option<&mut SpikeRefs> {
        self.resources.get_mut(resource)
    }

    pub(crate) fn retire(&mut self, resource: &str) -> Option<SpikeRefs> {
        self.resources.remove(resource)
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (&PropertyName, &mut SpikeRefs)> {
        self.resources.iter_mut()
    }

    pub(crate) fn into_entries(self) -> impl Iterator<Item = (PropertyName, SpikeRefs)> {
        self.resources.into_iter()
    }

    /// Every activation holding a non-detached reference, deduplicated.
    pub(crate) fn activations(&self) -> Vec<ActivationRef> {
        let mut seen = HashSet::new();
        self.resources
            .values()
            .flat_map(|spikes| spikes.activations())
            .filter(|act| seen.insert(act.id()))
            .cloned()
            .collect()
    }

    pub(crate) fn to_counts(&self) -> BTreeMap<PropertyName, SpikeCounts> {
        self.resources
            .iter()
            .map(|(name, spikes)| (name.clone(), spikes.to_counts()))
            .collect()
    }
}

/// How a possible-cause count should change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CauseChange {
    Add(u32),
    Sub(u32),
    /// Drop the activation's registration entirely.
    Forget,
}

/// signal -> activation -> possible-cause count
#[derive(Clone, Debug, Default)]
pub(crate) struct CauseIndex {
    signals: HashMap<SignalId, HashMap<ActivationRef, u32>>,
}

impl CauseIndex {
    /// Apply `change` for `(signal, act)`.
    ///
    /// Returns true if the signal was registered before and now has no
    /// remaining cause, in which case its entry is removed.
    pub(crate) fn adjust(&mut self, signal: &SignalId, act: &ActivationRef, change: CauseChange) -> bool {
        let causes = match change {
            CauseChange::Add(0) => return false,
            CauseChange::Add(_) => self.signals.entry(signal.clone()).or_default(),
            CauseChange::Sub(_) | CauseChange::Forget => match self.signals.get_mut(signal) {
                Some(causes) if causes.contains_key(act) => causes,
                _ => return false,
            },
        };
        match change {
            CauseChange::Add(n) => *causes.entry(act.clone()).or_insert(0) += n,
            CauseChange::Sub(n) => {
                if let Some(count) = causes.get_mut(act) {
                    *count = count.saturating_sub(n);
                    if *count == 0 {
                        causes.remove(act);
                    }
                }
            }
            CauseChange::Forget => {
                causes.remove(act);
            }
        }
        if causes.is_empty() {
            self.signals.remove(signal);
            true
        } else {
            false
        }
    }

    /// The signal happened; nobody needs to wait for its causes anymore.
    pub(crate) fn settle(&mut self, signal: &SignalId) -> bool {
        self.signals.remove(signal).is_some()
    }

    pub(crate) fn count(&self, signal: &SignalId, act: &ActivationRef) -> u32 {
        self.signals
            .get(signal)
            .and_then(|causes| causes.get(act))
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn contains(&self, signal: &SignalId) -> bool {
        self.signals.contains_key(signal)
    }

    pub(crate) fn signals(&self) -> impl Iterator<Item = &SignalId> {
        self.signals.keys()
    }

    /// Add every count of `other` into `self`.
    pub(crate) fn absorb(&mut self, other: CauseIndex) {
        for (signal, causes) in other.signals {
            let mine = self.signals.entry(signal).or_default();
            for (act, count) in causes {
                *mine.entry(act).or_insert(0) += count;
            }
        }
    }

    pub(crate) fn to_counts(&self) -> BTreeMap<SignalId, causal_types::ActivationCounts> {
        self.signals
            .iter()
            .map(|(signal, causes)| {
                let counts = causes.iter().map(|(act, c)| (act.id(), *c)).collect();
                (signal.clone(), counts)
            })
            .collect()
    }
}
