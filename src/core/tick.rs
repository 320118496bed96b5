//! Host tick kinds and the tick value delivered to subscribers.

use serde::{Deserialize, Serialize};

/// Kind of a host tick.
///
/// A host delivers each kind once per frame in [`TickKind::FRAME_ORDER`].
/// `LateUpdate` is always last: pending transitions are applied right
/// after it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum TickKind {
    FixedUpdate,
    Update,
    DrawGizmos,
    Gui,
    LateUpdate,
}

impl TickKind {
    /// Number of tick kinds.
    pub const COUNT: usize = 5;

    /// Intra-frame delivery order.
    pub const FRAME_ORDER: [TickKind; Self::COUNT] = [
        TickKind::FixedUpdate,
        TickKind::Update,
        TickKind::DrawGizmos,
        TickKind::Gui,
        TickKind::LateUpdate,
    ];

    /// Position of this kind in [`TickKind::FRAME_ORDER`].
    pub fn index(self) -> usize {
        match self {
            Self::FixedUpdate => 0,
            Self::Update => 1,
            Self::DrawGizmos => 2,
            Self::Gui => 3,
            Self::LateUpdate => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::FixedUpdate => "FixedUpdate",
            Self::Update => "Update",
            Self::DrawGizmos => "DrawGizmos",
            Self::Gui => "Gui",
            Self::LateUpdate => "LateUpdate",
        }
    }

    /// True for the kind that closes a frame.
    pub fn ends_frame(self) -> bool {
        matches!(self, Self::LateUpdate)
    }
}

/// A single tick as seen by gated stream subscribers.
#[derive(Clone, Copy, PartialEq, Debug, Serialize, Deserialize)]
pub struct Tick {
    pub kind: TickKind,
    /// Frame counter, incremented after each `LateUpdate`.
    pub frame: u64,
    /// Seconds elapsed since the previous frame, as reported by the host.
    pub dt: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_order_ends_with_late_update() {
        assert_eq!(TickKind::FRAME_ORDER.last(), Some(&TickKind::LateUpdate));
        assert!(TickKind::LateUpdate.ends_frame());
        assert!(!TickKind::Update.ends_frame());
    }

    #[test]
    fn index_matches_frame_order() {
        for (i, kind) in TickKind::FRAME_ORDER.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
    }

    #[test]
    fn names_are_distinct() {
        let names: std::collections::HashSet<_> =
            TickKind::FRAME_ORDER.iter().map(|k| k.name()).collect();
        assert_eq!(names.len(), TickKind::COUNT);
    }
}
