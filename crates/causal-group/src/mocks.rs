//! Mock collaborators for tests and examples.
//!
//! `MockActivation` behaves like a well-behaved engine activation: it keeps
//! its own constraint signal bindings, and when dereferenced with `reject`
//! it calls `rejected` back on the spike's group.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use causal_types::{ActivationId, GroupId, PropertyName, RejectReason, SignalId, SpikeId};
use parking_lot::Mutex;

use crate::group::CausalGroup;
use crate::traits::{Activation, ActivationRef, SignalRef, Spike, SpikeRef};

/// Mock spike belonging to a fixed group handle.
#[derive(Debug)]
pub struct MockSpike {
    id: SpikeId,
    name: String,
    group: CausalGroup,
    offspring: AtomicBool,
}

impl MockSpike {
    pub fn new(name: impl Into<String>, group: &CausalGroup) -> Arc<Self> {
        Arc::new(Self {
            id: SpikeId::new(),
            name: name.into(),
            group: group.clone(),
            offspring: AtomicBool::new(false),
        })
    }

    pub fn set_offspring(&self, offspring: bool) {
        self.offspring.store(offspring, Ordering::SeqCst);
    }

    pub fn handle(self: &Arc<Self>) -> SpikeRef {
        SpikeRef::from(self.clone())
    }
}

impl Spike for MockSpike {
    fn id(&self) -> SpikeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn has_offspring(&self) -> bool {
        self.offspring.load(Ordering::SeqCst)
    }

    fn causal_group(&self) -> CausalGroup {
        self.group.clone()
    }
}

/// Everything a [`MockActivation`] was told by its groups.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MockJournal {
    pub pressured_by: Vec<GroupId>,
    /// `(spike, reacquire, reject)`
    pub dereferenced: Vec<(SpikeId, bool, bool)>,
    pub not_caused: Vec<(GroupId, SignalId)>,
}

/// Builder for [`MockActivation`].
#[derive(Debug)]
pub struct MockActivationBuilder {
    name: String,
    resources: BTreeSet<PropertyName>,
    possible_signals: Vec<SignalId>,
    specificity: f64,
}

impl MockActivationBuilder {
    pub fn resources<I, S>(mut self, resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<PropertyName>,
    {
        self.resources.extend(resources.into_iter().map(Into::into));
        self
    }

    pub fn signals<I, S>(mut self, signals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SignalId>,
    {
        self.possible_signals.extend(signals.into_iter().map(Into::into));
        self
    }

    pub fn specificity(mut self, specificity: f64) -> Self {
        self.specificity = specificity;
        self
    }

    pub fn build(self) -> Arc<MockActivation> {
        Arc::new_cyclic(|me| MockActivation {
            id: ActivationId::new(),
            name: self.name,
            resources: self.resources,
            possible_signals: self.possible_signals,
            specificity: Mutex::new(self.specificity),
            constraints: Mutex::new(Vec::new()),
            journal: Mutex::new(MockJournal::default()),
            me: me.clone(),
        })
    }
}

/// Mock activation with fixed resources and possible signals.
#[derive(Debug)]
pub struct MockActivation {
    id: ActivationId,
    name: String,
    resources: BTreeSet<PropertyName>,
    possible_signals: Vec<SignalId>,
    specificity: Mutex<f64>,
    constraints: Mutex<Vec<SignalRef>>,
    journal: Mutex<MockJournal>,
    me: Weak<MockActivation>,
}

impl MockActivation {
    pub fn builder(name: impl Into<String>) -> MockActivationBuilder {
        MockActivationBuilder {
            name: name.into(),
            resources: BTreeSet::new(),
            possible_signals: Vec::new(),
            specificity: 1.0,
        }
    }

    pub fn handle(self: &Arc<Self>) -> ActivationRef {
        ActivationRef::from(self.clone())
    }

    /// Reference `spike` from its group, binding a constraint signal named
    /// after the spike. Returns what `acquired` returned.
    pub fn acquire(self: &Arc<Self>, spike: &SpikeRef, detached: bool) -> bool {
        let group = spike.causal_group();
        let accepted = group.lock().acquired(spike, &self.handle(), detached);
        if accepted {
            self.constraints.lock().push(SignalRef {
                signal: SignalId::from(spike.name()),
                spike: Some(spike.clone()),
                detached,
            });
        }
        accepted
    }

    /// Unbind one constraint from `spike` and reject it on the spike's
    /// group. Returns false if no constraint was bound to `spike`.
    pub fn release(self: &Arc<Self>, spike: &SpikeRef, reason: RejectReason) -> bool {
        let unbound = {
            let mut constraints = self.constraints.lock();
            match constraints
                .iter_mut()
                .find(|c| c.spike.as_ref() == Some(spike))
            {
                Some(constraint) => {
                    constraint.spike = None;
                    true
                }
                None => false,
            }
        };
        if unbound {
            spike
                .causal_group()
                .lock()
                .rejected(spike, &self.handle(), reason);
        }
        unbound
    }

    pub fn set_specificity(&self, specificity: f64) {
        *self.specificity.lock() = specificity;
    }

    pub fn journal(&self) -> MockJournal {
        self.journal.lock().clone()
    }

    pub fn pressure_count(&self) -> usize {
        self.journal.lock().pressured_by.len()
    }

    /// Signals this activation was told can no longer be caused.
    pub fn not_caused(&self) -> Vec<SignalId> {
        self.journal
            .lock()
            .not_caused
            .iter()
            .map(|(_, signal)| signal.clone())
            .collect()
    }

    /// Number of constraints currently bound to `spike`.
    pub fn bound_to(&self, spike: &SpikeRef) -> usize {
        self.constraints
            .lock()
            .iter()
            .filter(|c| c.spike.as_ref() == Some(spike))
            .count()
    }
}

impl Activation for MockActivation {
    fn id(&self) -> ActivationId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn resources(&self) -> BTreeSet<PropertyName> {
        self.resources.clone()
    }

    fn possible_signals(&self) -> Vec<SignalId> {
        self.possible_signals.clone()
    }

    fn specificity(&self) -> f64 {
        *self.specificity.lock()
    }

    fn pressure(&self, group: &CausalGroup) {
        self.journal.lock().pressured_by.push(group.id());
    }

    fn dereference(&self, spike: &SpikeRef, reacquire: bool, reject: bool) {
        self.journal
            .lock()
            .dereferenced
            .push((spike.id(), reacquire, reject));

        let (attached, detached) = {
            let mut constraints = self.constraints.lock();
            let (mut attached, mut detached) = (0, 0);
            for constraint in constraints.iter_mut() {
                if constraint.spike.as_ref() == Some(spike) {
                    constraint.spike = None;
                    if constraint.detached {
                        detached += 1;
                    } else {
                        attached += 1;
                    }
                }
            }
            (attached, detached)
        };

        // Each rejection releases one reference of either kind.
        let rejections = attached.max(detached);
        if !reject || rejections == 0 {
            return;
        }
        let Some(me) = self.me.upgrade() else {
            return;
        };
        let me = ActivationRef::from(me);
        let group = spike.causal_group();
        let guard = group.lock();
        for _ in 0..rejections {
            guard.rejected(spike, &me, RejectReason::Dereferenced);
        }
    }

    fn effect_not_caused(&self, group: &CausalGroup, signal: &SignalId) {
        self.journal
            .lock()
            .not_caused
            .push((group.id(), signal.clone()));
    }

    fn constraint_signals(&self) -> Vec<SignalRef> {
        self.constraints.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_binds_constraint_on_success() {
        let group = CausalGroup::new(["p1"]);
        let spike = MockSpike::new("sig", &group).handle();
        let act = MockActivation::builder("a").resources(["p1"]).build();

        assert!(act.acquire(&spike, false));
        assert_eq!(act.bound_to(&spike), 1);
        assert_eq!(act.constraint_signals()[0].signal.as_str(), "sig");
    }

    #[test]
    fn release_without_binding_is_refused() {
        let group = CausalGroup::new(["p1"]);
        let spike = MockSpike::new("sig", &group).handle();
        let act = MockActivation::builder("a").resources(["p1"]).build();

        assert!(!act.release(&spike, RejectReason::Dereferenced));
    }

    #[test]
    fn rejecting_dereference_releases_references() {
        let group = CausalGroup::new(["p1"]);
        let spike = MockSpike::new("sig", &group).handle();
        let act = MockActivation::builder("a").resources(["p1"]).build();
        act.acquire(&spike, false);

        act.dereference(&spike, true, true);

        assert_eq!(act.bound_to(&spike), 0);
        assert_eq!(group.lock().refcount("p1", &spike, &act.handle()), 0);
        assert_eq!(act.journal().dereferenced, vec![(spike.id(), true, true)]);
    }

    #[test]
    fn one_rejection_covers_an_attached_and_a_detached_binding() {
        let group = CausalGroup::new(["p1"]);
        let s1 = MockSpike::new("s1", &group).handle();
        let s2 = MockSpike::new("s2", &group).handle();
        let act = MockActivation::builder("a").signals(["out"]).build();
        act.acquire(&s1, false);
        act.acquire(&s1, true);
        act.acquire(&s2, false);
        assert_eq!(group.lock().cause_count(&"out".into(), &act.handle()), 2);

        act.dereference(&s1, true, true);

        let guard = group.lock();
        assert_eq!(guard.detached_refcount(&s1, &act.handle()), 0);
        // The registration made for `s2` survives.
        assert_eq!(guard.cause_count(&"out".into(), &act.handle()), 1);
    }

    #[test]
    fn specificity_can_change() {
        let act = MockActivation::builder("a").specificity(0.25).build();
        assert_eq!(act.specificity(), 0.25);
        act.set_specificity(0.75);
        assert_eq!(act.specificity(), 0.75);
    }
}
