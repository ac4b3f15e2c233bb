//! Causal group handles, shared identities and scoped locking.
//!
//! A [`CausalGroup`] is a handle onto a `GroupIdentity`: the reentrant lock
//! plus every index of one synchronization domain ("superspike"). Merging
//! two groups folds one identity into the other and leaves a forwarding
//! pointer behind, so every handle that still points at the merged-away
//! identity resolves to the surviving one.
//!
//! Because an identity can be merged away while another thread waits for
//! its lock, [`CausalGroup::lock`] re-checks after acquiring and retries
//! against the surviving identity if it lost the race.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use causal_types::{GroupId, PropertyName};
use parking_lot::lock_api::ArcReentrantMutexGuard;
use parking_lot::{RawMutex, RawThreadId, ReentrantMutex, RwLock};
use tracing::{debug, trace};

use crate::config::GroupConfig;
use crate::index::{CauseIndex, RefIndex, SpikeRefs};

/// Mutable bookkeeping of one group identity.
pub(crate) struct GroupState {
    /// Resources not claimed by a running activation.
    pub(crate) available: BTreeSet<PropertyName>,
    pub(crate) refs: RefIndex,
    pub(crate) detached: SpikeRefs,
    pub(crate) causes: CauseIndex,
    /// Observed signal names, for display.
    pub(crate) signal_names: Vec<String>,
    /// Number of groups folded into this identity, minus dropped handles.
    pub(crate) merges: i64,
    pub(crate) config: Arc<GroupConfig>,
}

impl GroupState {
    fn new(resources: BTreeSet<PropertyName>, config: Arc<GroupConfig>) -> Self {
        Self {
            refs: RefIndex::with_resources(&resources),
            available: resources,
            detached: SpikeRefs::default(),
            causes: CauseIndex::default(),
            signal_names: Vec::new(),
            merges: 1,
            config,
        }
    }

    fn describe(&self, id: &GroupId) -> String {
        let names = &self.signal_names;
        let spikes = if names.len() < self.config.display_signal_limit.max(2) {
            names.join(",")
        } else {
            format!(
                "{},...[{} more],{}",
                names[0],
                names.len() - 2,
                names[names.len() - 1]
            )
        };
        format!("CausalGroup*{}@{}({})", self.merges, id.short(), spikes)
    }
}

type StateLock = ReentrantMutex<RefCell<GroupState>>;
pub(crate) type StateGuard = ArcReentrantMutexGuard<RawMutex, RawThreadId, RefCell<GroupState>>;

/// One synchronization domain. Shared by every handle resolving to it.
pub(crate) struct GroupIdentity {
    pub(crate) id: GroupId,
    pub(crate) state: Arc<StateLock>,
    /// Set once, under `state`'s lock, when this identity is folded into
    /// another one.
    pub(crate) merged_into: RwLock<Option<Arc<GroupIdentity>>>,
}

impl GroupIdentity {
    fn new(state: GroupState) -> Self {
        Self {
            id: GroupId::new(),
            state: Arc::new(ReentrantMutex::new(RefCell::new(state))),
            merged_into: RwLock::new(None),
        }
    }

    fn is_live(&self) -> bool {
        self.merged_into.read().is_none()
    }
}

/// Follow forwarding pointers to the live identity.
fn resolve(mut identity: Arc<GroupIdentity>) -> Arc<GroupIdentity> {
    loop {
        let next = identity.merged_into.read().clone();
        match next {
            Some(next) => identity = next,
            None => return identity,
        }
    }
}

/// Lock the live identity reachable from `start`, retrying when the
/// identity is merged away between resolving and acquiring.
fn lock_live(start: Arc<GroupIdentity>) -> (Arc<GroupIdentity>, StateGuard) {
    let mut identity = resolve(start);
    loop {
        let guard = identity.state.lock_arc();
        if identity.is_live() {
            return (identity, guard);
        }
        drop(guard);
        trace!(group = %identity.id.short(), "identity merged away while locking, retrying");
        identity = resolve(identity);
    }
}

struct GroupHandle {
    current: RwLock<Arc<GroupIdentity>>,
}

impl Drop for GroupHandle {
    fn drop(&mut self) {
        let (identity, guard) = lock_live(self.current.get_mut().clone());
        if let Ok(mut state) = guard.try_borrow_mut() {
            state.merges -= 1;
        }
        drop(guard);
        debug!(group = %identity.id.short(), "Deleted causal group handle");
    }
}

/// Handle onto a causal group ("superspike").
///
/// Clones are the same handle. Two handles created separately compare
/// equal once they have been merged, since equality and hashing follow
/// the live identity. Hash-keyed collections of groups must therefore be
/// rebuilt after merges.
#[derive(Clone)]
pub struct CausalGroup {
    handle: Arc<GroupHandle>,
}

impl CausalGroup {
    /// Create a group tracking `resources`, all initially available.
    pub fn new<I, S>(resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<PropertyName>,
    {
        Self::with_config(resources, GroupConfig::default())
    }

    pub fn with_config<I, S>(resources: I, config: GroupConfig) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<PropertyName>,
    {
        let resources = resources.into_iter().map(Into::into).collect();
        let identity = Arc::new(GroupIdentity::new(GroupState::new(resources, Arc::new(config))));
        debug!(group = %identity.id.short(), "Created causal group");
        Self {
            handle: Arc::new(GroupHandle {
                current: RwLock::new(identity),
            }),
        }
    }

    /// Identity of the domain this handle currently resolves to.
    pub fn id(&self) -> GroupId {
        self.current().id
    }

    /// Enter the group's critical section.
    ///
    /// Reentrant: the owning thread may lock again (directly or from a
    /// collaborator callback). Dropping an inner guard leaves the outer
    /// one active.
    pub fn lock(&self) -> GroupGuard<'_> {
        let (_, guard) = lock_live(self.handle.current.read().clone());
        GroupGuard {
            group: self,
            _lock: guard,
        }
    }

    /// Resolve the live identity and compress the handle's path to it.
    pub(crate) fn current(&self) -> Arc<GroupIdentity> {
        let start = self.handle.current.read().clone();
        let live = resolve(start.clone());
        if !Arc::ptr_eq(&start, &live) {
            *self.handle.current.write() = live.clone();
        }
        live
    }

    /// Point this handle at `identity` directly.
    pub(crate) fn retarget(&self, identity: Arc<GroupIdentity>) {
        *self.handle.current.write() = identity;
    }

    /// Run `f` on the live state, under the (reentrant) group lock.
    ///
    /// `f` must not call back into collaborators: they may re-enter the
    /// group on this thread.
    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&mut GroupState) -> R) -> R {
        let (_, guard) = lock_live(self.handle.current.read().clone());
        let mut state = guard.borrow_mut();
        f(&mut state)
    }
}

impl PartialEq for CausalGroup {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for CausalGroup {}

impl Hash for CausalGroup {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Display for CausalGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let identity = self.current();
        // Never block for display; another thread may hold the lock.
        let described = match identity.state.try_lock() {
            Some(guard) => {
                let text = guard.try_borrow().ok().map(|state| state.describe(&identity.id));
                text
            }
            None => None,
        };
        match described {
            Some(text) => write!(f, "{}", text),
            None => write!(f, "CausalGroup*?@{}", identity.id.short()),
        }
    }
}

impl fmt::Debug for CausalGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Proof that the current thread holds a group's lock.
///
/// Every coordination operation lives on the guard, so it can only be
/// called inside the critical section.
pub struct GroupGuard<'g> {
    pub(crate) group: &'g CausalGroup,
    _lock: StateGuard,
}

impl<'g> GroupGuard<'g> {
    pub fn group(&self) -> &'g CausalGroup {
        self.group
    }

    pub fn id(&self) -> GroupId {
        self.group.id()
    }
}

impl fmt::Debug for GroupGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GroupGuard({})", self.group)
    }
}
