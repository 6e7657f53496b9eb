//! Non-owning instance lookups

use crate::id::InstanceId;
use crate::types::Vec3;
use std::collections::HashMap;

/// Resolves an instance handle to its current position.
///
/// Systems that "follow" an instance keep only the [`InstanceId`] and ask
/// for the position each frame, so a destroyed instance shows up as `None`
/// instead of a dangling reference.
pub trait PositionSource {
    fn position_of(&self, id: InstanceId) -> Option<Vec3>;
}

/// Nothing to follow
pub struct NoPositions;

impl PositionSource for NoPositions {
    fn position_of(&self, _id: InstanceId) -> Option<Vec3> {
        None
    }
}

impl PositionSource for HashMap<InstanceId, Vec3> {
    fn position_of(&self, id: InstanceId) -> Option<Vec3> {
        self.get(&id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_lookup() {
        let mut positions = HashMap::new();
        positions.insert(InstanceId(3), Vec3::new(1.0, 2.0, 0.0));
        assert_eq!(
            positions.position_of(InstanceId(3)),
            Some(Vec3::new(1.0, 2.0, 0.0))
        );
        assert_eq!(positions.position_of(InstanceId(4)), None);
        assert_eq!(NoPositions.position_of(InstanceId(3)), None);
    }
}
