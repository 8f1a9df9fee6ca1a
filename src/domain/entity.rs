/// Entities that live in a zone: players, NPCs and static obstacles.
/// Blocks are entities too but carry their own state (see `block.rs`).

use std::fmt;

use super::direction::Rect;

/// World-unique entity identifier.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EntityKind {
    /// Controller-driven entity. Only players push blocks.
    Player,
    Npc,
    /// Immovable prop (crate, statue, ...)
    Obstacle,
}

impl EntityKind {
    /// Does this kind move around the zone under its own power?
    pub fn is_active(self) -> bool {
        matches!(self, EntityKind::Player | EntityKind::Npc)
    }
}

/// A non-block entity occupying a footprint in a zone.
#[derive(Clone, Debug)]
pub struct Actor {
    pub id: EntityId,
    pub kind: EntityKind,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Actor {
    pub fn new(id: EntityId, kind: EntityKind, x: i32, y: i32) -> Self {
        Actor { id, kind, x, y, width: 1, height: 1 }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width.max(1);
        self.height = height.max(1);
        self
    }

    pub fn area(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    /// Footprint if the actor stood at `(x, y)`.
    pub fn area_at(&self, x: i32, y: i32) -> Rect {
        self.area().at(x, y)
    }

    pub fn is_player(&self) -> bool {
        self.kind == EntityKind::Player
    }
}
