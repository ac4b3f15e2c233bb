//! Coordination operations, available while holding a group's lock.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use causal_types::{GroupSnapshot, PropertyName, RejectReason, SignalId};
use tracing::{debug, error};

use crate::config::GroupConfig;
use crate::group::GroupGuard;
use crate::index::{CauseChange, SpikeRefs};
use crate::traits::{ActivationRef, SpikeRef};

impl GroupGuard<'_> {
    /// Register that `acquired_by` references `spike` from this group.
    ///
    /// Detached references are always accepted. Otherwise every write
    /// resource of `acquired_by` must still be tracked by the group; if one
    /// was consumed, nothing is registered and `false` is returned.
    pub fn acquired(&self, spike: &SpikeRef, acquired_by: &ActivationRef, detached: bool) -> bool {
        if detached {
            self.group
                .with_state(|s| s.detached.increment(spike, acquired_by, 1));
            debug!(group = %self.group, %spike, activation = %acquired_by, "acquired (detached)");
            return true;
        }

        let resources = acquired_by.resources();
        let outcome = self.group.with_state(|s| {
            if let Some(missing) = resources.iter().find(|r| !s.refs.tracks(r)) {
                return Err(missing.clone());
            }
            for resource in &resources {
                if let Some(spikes) = s.refs.get_mut(resource) {
                    spikes.increment(spike, acquired_by, 1);
                }
            }
            Ok(())
        });

        match outcome {
            Err(resource) => {
                debug!(
                    group = %self.group, %spike, activation = %acquired_by, %resource,
                    "acquisition refused: resource no longer tracked"
                );
                false
            }
            Ok(()) => {
                self.change_effect_causes(acquired_by, CauseChange::Add(1));
                debug!(group = %self.group, %spike, activation = %acquired_by, "acquired");
                true
            }
        }
    }

    /// Release one reference of `rejected_by` to `spike`, detached and
    /// non-detached alike, and one of its possible-cause registrations.
    ///
    /// Detached references never registered a possible cause, so when only
    /// a detached reference is found for an activation with write
    /// resources, the cause counts are left alone. An activation without
    /// write resources leaves no trace in the resource index, so its
    /// cause registration is always released. `reason` is only logged.
    pub fn rejected(&self, spike: &SpikeRef, rejected_by: &ActivationRef, reason: RejectReason) {
        let resources = rejected_by.resources();
        let (detached_found, attached_found) = self.group.with_state(|s| {
            let detached = s.detached.decrement(spike, rejected_by).found();
            let mut attached = false;
            for resource in &resources {
                if let Some(spikes) = s.refs.get_mut(resource) {
                    attached |= spikes.decrement(spike, rejected_by).found();
                }
            }
            (detached, attached)
        });

        if !detached_found && !attached_found && !resources.is_empty() {
            error!(
                group = %self.group, %spike, activation = %rejected_by, %reason,
                "Attempt to deref group for unref'd activation"
            );
            return;
        }

        if attached_found || !detached_found || resources.is_empty() {
            self.change_effect_causes(rejected_by, CauseChange::Sub(1));
        }
        debug!(group = %self.group, %spike, activation = %rejected_by, %reason, "rejected");
    }

    /// Whether `ready_suitor` may go ahead and write its resources.
    ///
    /// `false` is never final: a resource may become available again, and
    /// rivals may drop out. Callers poll. Every activation referencing one
    /// of the suitor's resources with a strictly higher specificity is
    /// pressured. Never mutates the group.
    pub fn consent(&self, ready_suitor: &ActivationRef) -> bool {
        let specificity = ready_suitor.specificity();
        let resources = ready_suitor.resources();

        let candidates = self.group.with_state(|s| {
            let mut seen = HashSet::new();
            let mut candidates = Vec::new();
            for resource in &resources {
                if !s.available.contains(resource) {
                    return Err(resource.clone());
                }
                let Some(spikes) = s.refs.get(resource) else {
                    continue;
                };
                for act in spikes.activations() {
                    if act != ready_suitor && seen.insert(act.id()) {
                        candidates.push(act.clone());
                    }
                }
            }
            Ok(candidates)
        });

        let candidates = match candidates {
            Ok(candidates) => candidates,
            Err(resource) => {
                debug!(
                    group = %self.group, suitor = %ready_suitor, %resource,
                    "consent denied: resource unavailable"
                );
                return false;
            }
        };

        let rivals: Vec<(ActivationRef, f64)> = candidates
            .into_iter()
            .map(|act| {
                let rival_specificity = act.specificity();
                (act, rival_specificity)
            })
            .filter(|(_, rival_specificity)| *rival_specificity > specificity)
            .collect();

        let Some((strongest, strongest_specificity)) = rivals
            .iter()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(act, s)| (act.clone(), *s))
        else {
            debug!(group = %self.group, suitor = %ready_suitor, "consent granted");
            return true;
        };

        for (rival, _) in &rivals {
            rival.pressure(self.group);
        }
        debug!(
            group = %self.group,
            suitor = %ready_suitor,
            specificity,
            strongest = %strongest,
            strongest_specificity,
            others = rivals.len() - 1,
            "consent denied: more specific rival"
        );
        false
    }

    /// `act` got consent everywhere and is running: claim its resources.
    pub fn activated(&self, act: &ActivationRef) {
        let resources = act.resources();
        self.group.with_state(|s| {
            for resource in &resources {
                s.available.remove(resource);
            }
        });
        debug!(group = %self.group, activation = %act, "activated");
    }

    /// `act` failed after activation: its resources become available to
    /// the next suitor. Resources consumed in the meantime stay retired.
    pub fn resigned(&self, act: &ActivationRef) {
        let resources = act.resources();
        self.group.with_state(|s| {
            for resource in &resources {
                if s.refs.tracks(resource) {
                    s.available.insert(resource.clone());
                }
            }
        });
        debug!(group = %self.group, activation = %act, "resigned");
    }

    /// Permanently retire `resources` from the group.
    ///
    /// Every activation still referencing a spike for one of them is
    /// dereferenced with `reacquire` and `reject`, then loses its
    /// possible-cause registrations in this group.
    pub fn consumed<I, S>(&self, resources: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<PropertyName>,
    {
        let resources: BTreeSet<PropertyName> = resources.into_iter().map(Into::into).collect();
        if resources.is_empty() {
            return;
        }

        let mut seen = HashSet::new();
        let mut forgotten = Vec::new();
        for resource in &resources {
            let pairs = self
                .group
                .with_state(|s| s.refs.get(resource).map(SpikeRefs::pairs));
            let Some(pairs) = pairs else {
                debug!(group = %self.group, %resource, "consumed resource is not tracked");
                continue;
            };
            for (spike, act) in pairs {
                act.dereference(&spike, true, true);
                if seen.insert(act.id()) {
                    forgotten.push(act);
                }
            }
            self.group.with_state(|s| {
                s.refs.retire(resource);
                s.available.remove(resource);
            });
        }

        for act in &forgotten {
            self.change_effect_causes(act, CauseChange::Forget);
        }
        debug!(group = %self.group, ?resources, dereferenced = forgotten.len(), "consumed");
    }

    /// Forget `spike` entirely. Referencing activations are asked to look
    /// for a substitute.
    pub fn wiped(&self, spike: &SpikeRef) {
        let (attached, detached) = self.group.with_state(|s| {
            let mut attached: HashMap<ActivationRef, u32> = HashMap::new();
            for (_, spikes) in s.refs.iter_mut() {
                if let Some(acts) = spikes.take_spike(spike) {
                    for (act, count) in acts {
                        let held = attached.entry(act).or_insert(0);
                        *held = (*held).max(count);
                    }
                }
            }
            let detached = s.detached.take_spike(spike).unwrap_or_default();
            (attached, detached)
        });

        let mut notified = HashSet::new();
        for act in attached.keys().chain(detached.keys()) {
            if notified.insert(act.id()) {
                act.dereference(spike, true, false);
            }
        }
        for (act, count) in &attached {
            self.change_effect_causes(act, CauseChange::Sub(*count));
        }
        debug!(group = %self.group, %spike, dereferenced = notified.len(), "wiped");
    }

    /// True iff no activation references `spike` (detached or not) and the
    /// spike has no offspring. Prunes empty index entries on the way.
    pub fn stale(&self, spike: &SpikeRef) -> bool {
        let referenced = self.group.with_state(|s| {
            for (_, spikes) in s.refs.iter_mut() {
                if spikes.is_referenced(spike) {
                    return true;
                }
            }
            s.detached.is_referenced(spike)
        });
        !referenced && !spike.has_offspring()
    }

    /// A spike for `signal` appeared in this group: it is no longer an
    /// uncaused possibility.
    pub fn notify_spike(&self, signal: &SignalId) {
        self.group.with_state(|s| {
            s.signal_names.push(signal.to_string());
            s.causes.settle(signal);
        });
    }

    pub fn available_resources(&self) -> BTreeSet<PropertyName> {
        self.group.with_state(|s| s.available.clone())
    }

    /// Resources not yet consumed.
    pub fn tracked_resources(&self) -> BTreeSet<PropertyName> {
        self.group.with_state(|s| s.refs.tracked())
    }

    pub fn refcount(&self, resource: &str, spike: &SpikeRef, act: &ActivationRef) -> u32 {
        self.group.with_state(|s| {
            s.refs
                .get(resource)
                .map(|spikes| spikes.count(spike, act))
                .unwrap_or(0)
        })
    }

    pub fn detached_refcount(&self, spike: &SpikeRef, act: &ActivationRef) -> u32 {
        self.group.with_state(|s| s.detached.count(spike, act))
    }

    /// How many times `act` is registered as a possible cause of `signal`.
    pub fn cause_count(&self, signal: &SignalId, act: &ActivationRef) -> u32 {
        self.group.with_state(|s| s.causes.count(signal, act))
    }

    pub fn signal_names(&self) -> Vec<String> {
        self.group.with_state(|s| s.signal_names.clone())
    }

    pub fn merge_count(&self) -> i64 {
        self.group.with_state(|s| s.merges)
    }

    pub fn config(&self) -> Arc<GroupConfig> {
        self.group.with_state(|s| s.config.clone())
    }

    pub fn snapshot(&self) -> GroupSnapshot {
        let id = self.group.id();
        self.group.with_state(|s| GroupSnapshot {
            id,
            merge_count: s.merges,
            available: s.available.clone(),
            resources: s.refs.to_counts(),
            detached: s.detached.to_counts(),
            causes: s.causes.to_counts(),
            signal_names: s.signal_names.clone(),
        })
    }
}
