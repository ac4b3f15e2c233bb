//! Reference sanity check, for test harnesses.

use std::collections::HashSet;

use causal_types::SignalId;
use tracing::error;

use crate::group::GroupGuard;

impl GroupGuard<'_> {
    /// Cross-check the indices against the activations' own view.
    ///
    /// For every activation holding non-detached references, the summed
    /// refcount over its resources must equal the number of its bound,
    /// non-detached constraint signals whose spike is in this group, times
    /// its resource count. Its possible-cause count per signal must equal
    /// that number of bound signals. Every signal with registered causes
    /// must be a possible signal of a referencing activation.
    ///
    /// Read-only. Mismatches are logged and yield `false`.
    pub fn check_reference_sanity(&self) -> bool {
        let mut sane = true;
        let mut signals_with_cause: HashSet<SignalId> = HashSet::new();
        let activations = self.group.with_state(|s| s.refs.activations());

        for act in &activations {
            let resources = act.resources();
            let refcount: usize = self.group.with_state(|s| {
                resources
                    .iter()
                    .filter_map(|r| s.refs.get(r))
                    .map(|spikes| spikes.total_for(act) as usize)
                    .sum()
            });
            let bound = act
                .constraint_signals()
                .iter()
                .filter(|sig| !sig.detached)
                .filter(|sig| {
                    sig.spike
                        .as_ref()
                        .is_some_and(|spike| spike.causal_group() == *self.group)
                })
                .count();
            let expected = bound * resources.len();
            if refcount != expected {
                error!(
                    group = %self.group, activation = %act, refcount, expected,
                    "Mutual refcount mismatch"
                );
                sane = false;
            }

            for signal in act.possible_signals() {
                let registered = self.group.with_state(|s| {
                    s.causes
                        .contains(&signal)
                        .then(|| s.causes.count(&signal, act))
                });
                if let Some(count) = registered {
                    if count as usize != bound {
                        error!(
                            group = %self.group, %signal, activation = %act,
                            is = count, should_be = bound,
                            "Signal cause mismatch"
                        );
                        sane = false;
                    }
                }
                signals_with_cause.insert(signal);
            }
        }

        let orphaned: Vec<SignalId> = self.group.with_state(|s| {
            s.causes
                .signals()
                .filter(|signal| !signals_with_cause.contains(*signal))
                .cloned()
                .collect()
        });
        for signal in orphaned {
            error!(group = %self.group, %signal, "Signal cause mismatch: should be zero");
            sane = false;
        }

        sane
    }
}
