//! Identifiers for activations, spikes, signals and group identities.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Name of a writable property (a "resource" in causal group terms).
pub type PropertyName = String;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// First eight hex digits, for compact log output.
            pub fn short(&self) -> String {
                self.0.simple().to_string()[..8].to_string()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for an activation (a schedulable unit of work)
    ActivationId
);

uuid_id!(
    /// Unique identifier for a spike (one event instance)
    SpikeId
);

uuid_id!(
    /// Identity of a causal group. Groups that were merged share one.
    GroupId
);

/// Identity of a signal that an activation may (or may not) cause.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SignalId(pub String);

impl SignalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SignalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SignalId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SignalId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        assert_ne!(ActivationId::new(), ActivationId::new());
        assert_ne!(SpikeId::new(), SpikeId::new());
        assert_ne!(GroupId::new(), GroupId::new());
    }

    #[test]
    fn short_id_is_uuid_prefix() {
        let id = GroupId::new();
        assert_eq!(id.short().len(), 8);
        assert!(id.0.simple().to_string().starts_with(&id.short()));
    }

    #[test]
    fn signal_id_conversions() {
        let a = SignalId::from("rawio:in:changed");
        let b = SignalId::new(String::from("rawio:in:changed"));
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "rawio:in:changed");
        assert_eq!(a.to_string(), "rawio:in:changed");
    }
}
