//! Irreversible unification of two causal groups.

use std::collections::BTreeSet;
use std::sync::Arc;

use causal_types::PropertyName;
use tracing::{debug, warn};

use crate::group::{CausalGroup, GroupGuard};
use crate::index::{CauseIndex, RefIndex, SpikeRefs};

/// Bookkeeping moved out of a merged-away identity.
struct Absorbed {
    refs: RefIndex,
    detached: SpikeRefs,
    causes: CauseIndex,
    signal_names: Vec<String>,
    merges: i64,
}

impl GroupGuard<'_> {
    /// Fold `other` into this group, in place and for good.
    ///
    /// - Available resources become the intersection of both sides.
    /// - A resource tracked by only one side is consumed on that side.
    /// - Refcounts and possible-cause counts are summed.
    /// - Detached entries are unioned per spike; on collision `other`'s
    ///   entry replaces this group's.
    /// - Signal names are concatenated and merge counts summed.
    ///
    /// Afterwards `other` (and every handle that resolved to its identity)
    /// resolves to this group's identity, lock included.
    ///
    /// Takes `other`'s lock while holding this one. Two threads merging the
    /// same pair in opposite directions deadlock; callers serialize merges.
    /// Merging a group with itself is a no-op.
    pub fn merge(&self, other: &CausalGroup) {
        let other_guard = other.lock();
        let mine = self.group.current();
        let theirs = other.current();
        if Arc::ptr_eq(&mine, &theirs) {
            warn!(group = %self.group, "merge with own identity ignored");
            return;
        }
        debug!(group = %self.group, other = %other, "=======> merging");

        let their_available = other_guard.available_resources();
        self.group
            .with_state(|s| s.available.retain(|r| their_available.contains(r)));

        let my_tracked = self.tracked_resources();
        let their_tracked = other_guard.tracked_resources();
        let common: BTreeSet<PropertyName> = my_tracked.intersection(&their_tracked).cloned().collect();
        self.consumed(my_tracked.difference(&common).cloned());
        other_guard.consumed(their_tracked.difference(&common).cloned());

        let absorbed = other.with_state(|s| Absorbed {
            refs: std::mem::take(&mut s.refs),
            detached: std::mem::take(&mut s.detached),
            causes: std::mem::take(&mut s.causes),
            signal_names: std::mem::take(&mut s.signal_names),
            merges: s.merges,
        });

        self.group.with_state(|s| {
            for (resource, spikes) in absorbed.refs.into_entries() {
                match s.refs.get_mut(&resource) {
                    Some(ours) => ours.absorb(spikes),
                    None => warn!(%resource, "dropping references to a resource unknown after merge"),
                }
            }
            s.detached.overwrite_with(absorbed.detached);
            s.causes.absorb(absorbed.causes);
            s.signal_names.extend(absorbed.signal_names);
            s.merges += absorbed.merges;
        });

        // Still under `theirs`' lock: waiters re-check and move on to `mine`.
        *theirs.merged_into.write() = Some(mine.clone());
        other.retarget(mine);
        drop(other_guard);

        debug!(group = %self.group, "merged");

        if self.config().verify_merges && !self.check_reference_sanity() {
            warn!(group = %self.group, "reference sanity check failed after merge");
        }
    }
}
