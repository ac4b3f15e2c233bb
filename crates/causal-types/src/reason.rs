use serde::{Deserialize, Serialize};

/// Why an activation stopped referencing a spike.
///
/// Carried into the group for logging only; every reason releases the
/// reference in the same way.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejectReason {
    /// The activation's dereference was called explicitly.
    Dereferenced,
    /// The spike got too old for the referencing constraint.
    SpikeExpired,
    /// The activation ran and is releasing its spikes.
    ActivationCompleted,
}

impl RejectReason {
    /// Stable numeric code (0, 1, 2).
    pub fn code(&self) -> u8 {
        match self {
            RejectReason::Dereferenced => 0,
            RejectReason::SpikeExpired => 1,
            RejectReason::ActivationCompleted => 2,
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RejectReason::Dereferenced => "dereferenced",
            RejectReason::SpikeExpired => "spike-expired",
            RejectReason::ActivationCompleted => "activation-completed",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(RejectReason::Dereferenced.code(), 0);
        assert_eq!(RejectReason::SpikeExpired.code(), 1);
        assert_eq!(RejectReason::ActivationCompleted.code(), 2);
    }

    #[test]
    fn display_format() {
        assert_eq!(RejectReason::SpikeExpired.to_string(), "spike-expired");
    }
}
