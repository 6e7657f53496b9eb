//! Identifiers for instances and shared resources

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a simulated instance.
///
/// Assigned monotonically by the owning room, never reused within a session.
/// Ordering is by raw value, which is the tie-break for same-depth instances.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(pub u64);

impl InstanceId {
    /// Create an InstanceId from a raw value (for deserialization/testing)
    pub fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw u64 value
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InstanceId({})", self.0)
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hands out instance identities for one session.
///
/// Lives inside the room rather than in a process-wide counter so two
/// sessions never share an id sequence.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Allocate the next identity
    pub fn allocate(&mut self) -> InstanceId {
        let id = InstanceId(self.next);
        self.next += 1;
        id
    }

    /// Make sure later allocations come after `id` (for restored instances)
    pub fn ensure_above(&mut self, id: InstanceId) {
        if self.next <= id.0 {
            self.next = id.0 + 1;
        }
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! resource_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub usize);

        impl $name {
            pub fn index(&self) -> usize {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

resource_id!(
    /// Index of an object template in the registry
    ObjectId
);
resource_id!(
    /// Index of a path in the registry
    PathId
);
resource_id!(
    /// Slot of a particle type inside one particle system
    ParticleTypeId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_generation() {
        let mut ids = IdAllocator::new();
        let id1 = ids.allocate();
        let id2 = ids.allocate();
        assert_ne!(id1, id2);
        assert!(id2 > id1);
    }

    #[test]
    fn test_from_raw() {
        let id = InstanceId::from_raw(42);
        assert_eq!(id.raw(), 42);
    }

    #[test]
    fn test_ensure_above() {
        let mut ids = IdAllocator::new();
        ids.ensure_above(InstanceId(100));
        assert!(ids.allocate().0 > 100);

        // Never moves backwards
        ids.ensure_above(InstanceId(5));
        assert_eq!(ids.allocate().0, 102);
    }

    #[test]
    fn sessions_do_not_share_sequences() {
        let mut a = IdAllocator::new();
        let mut b = IdAllocator::new();
        assert_eq!(a.allocate(), b.allocate());
    }
}
