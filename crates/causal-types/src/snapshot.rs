//! Serializable point-in-time view of one causal group identity.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{ActivationId, GroupId, PropertyName, SignalId, SpikeId};

/// Refcount per activation.
pub type ActivationCounts = BTreeMap<ActivationId, u32>;

/// Refcount per activation per spike.
pub type SpikeCounts = BTreeMap<SpikeId, ActivationCounts>;

/// A copy of a group's bookkeeping.
///
/// All maps are sorted, so two snapshots of equal state compare equal
/// regardless of insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSnapshot {
    pub id: GroupId,
    pub merge_count: i64,
    /// Resources not claimed by a running activation
    pub available: BTreeSet<PropertyName>,
    /// resource -> spike -> activation -> refcount
    pub resources: BTreeMap<PropertyName, SpikeCounts>,
    /// spike -> activation -> refcount, for detached references
    pub detached: SpikeCounts,
    /// signal -> activation -> possible-cause count
    pub causes: BTreeMap<SignalId, ActivationCounts>,
    pub signal_names: Vec<String>,
}

impl GroupSnapshot {
    /// Names of resources that are still tracked (not consumed).
    pub fn tracked(&self) -> BTreeSet<PropertyName> {
        self.resources.keys().cloned().collect()
    }

    /// Total refcount over every resource, spike and activation.
    pub fn total_refs(&self) -> u64 {
        self.resources
            .values()
            .flat_map(|spikes| spikes.values())
            .flat_map(|acts| acts.values())
            .map(|c| u64::from(*c))
            .sum()
    }

    /// True if no spike is referenced for any resource, detached or not.
    pub fn is_unreferenced(&self) -> bool {
        self.resources.values().all(|spikes| spikes.is_empty()) && self.detached.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_snapshot_is_unreferenced() {
        let snap = GroupSnapshot::default();
        assert!(snap.is_unreferenced());
        assert_eq!(snap.total_refs(), 0);
    }

    #[test]
    fn total_refs_sums_all_levels() {
        let act = ActivationId::new();
        let spike = SpikeId::new();
        let mut snap = GroupSnapshot::default();
        for prop in ["p1", "p2"] {
            snap.resources
                .entry(prop.to_string())
                .or_default()
                .entry(spike)
                .or_default()
                .insert(act, 2);
        }
        assert_eq!(snap.total_refs(), 4);
        assert!(!snap.is_unreferenced());
        assert_eq!(snap.tracked().len(), 2);
    }

    #[test]
    fn serializes_to_json() {
        let mut snap = GroupSnapshot::default();
        snap.available.insert("p1".into());
        snap.causes
            .entry(SignalId::from("sig"))
            .or_default()
            .insert(ActivationId::new(), 1);
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["available"][0], "p1");
        let restored: GroupSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(restored, snap);
    }
}
