//! Possible-effect bookkeeping.
//!
//! Each non-detached acquisition registers the acquiring activation as a
//! possible cause of every signal it may emit. When the last possible cause
//! of a signal goes away, every activation still referencing the group is
//! told that the signal will not happen, so it can stop waiting for it.

use causal_types::SignalId;
use tracing::debug;

use crate::group::GroupGuard;
use crate::index::CauseChange;
use crate::traits::ActivationRef;

impl GroupGuard<'_> {
    pub(crate) fn change_effect_causes(&self, act: &ActivationRef, change: CauseChange) {
        let signals = act.possible_signals();
        if signals.is_empty() {
            return;
        }

        let (exhausted, listeners) = self.group.with_state(|s| {
            let exhausted: Vec<SignalId> = signals
                .iter()
                .filter(|signal| s.causes.adjust(signal, act, change))
                .cloned()
                .collect();
            let listeners = if exhausted.is_empty() {
                Vec::new()
            } else {
                s.refs.activations()
            };
            (exhausted, listeners)
        });

        for signal in &exhausted {
            debug!(
                group = %self.group, %signal, listeners = listeners.len(),
                "effect can no longer be caused"
            );
            for listener in &listeners {
                listener.effect_not_caused(self.group, signal);
            }
        }
    }
}
