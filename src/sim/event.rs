/// Events emitted while the zone is mutated.
/// The presentation layer consumes these for display/sound.

use std::fmt;

use crate::domain::entity::EntityId;

/// Named sound effect a block can play.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct SoundId(pub String);

impl SoundId {
    pub fn new(name: &str) -> Self {
        SoundId(name.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ZoneEvent {
    BlockPushed { id: EntityId, x: i32, y: i32 },
    BlockReset { id: EntityId, x: i32, y: i32 },
    /// A reset attempt found the origin occupied and scheduled a retry.
    ResetDeferred { id: EntityId, retry_turn: u64 },
    /// Visible state of an entity changed.
    WorldChanged { id: EntityId },
    /// Ambient sound at the source entity.
    Sound { source: EntityId, sound: SoundId },
    EntityMoved { id: EntityId, x: i32, y: i32 },
    EntityLeft { id: EntityId },
}
