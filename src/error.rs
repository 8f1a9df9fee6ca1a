use thiserror::Error;

use crate::domain::entity::EntityId;

/// Unified result type for zone and world operations.
pub type Result<T> = std::result::Result<T, ZoneError>;

/// Construction-order bugs on a single block.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BlockError {
    #[error("block {0} has no recorded origin; it was never placed into a zone")]
    NoOrigin(EntityId),
    #[error("block {0} is not in a zone")]
    NotInZone(EntityId),
}

#[derive(Debug, Error)]
pub enum ZoneError {
    #[error("entity {0} not found")]
    UnknownEntity(EntityId),
    #[error("zone `{0}` not found")]
    UnknownZone(String),
    #[error("zone `{0}` has no players")]
    NoPlayers(String),
    #[error("entity {id} cannot be placed at ({x},{y})")]
    InvalidPlacement { id: EntityId, x: i32, y: i32 },
    #[error("block {id} cannot go back to ({x},{y}): origin is occupied")]
    OriginBlocked { id: EntityId, x: i32, y: i32 },
    #[error("entity {0} cannot move on its own")]
    NotMovable(EntityId),
    #[error("zone map line {line}: {message}")]
    MapParse { line: usize, message: String },
    #[error(transparent)]
    Block(#[from] BlockError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = BlockError::NoOrigin(EntityId(4));
        assert!(err.to_string().contains("no recorded origin"));

        let err: ZoneError = BlockError::NotInZone(EntityId(2)).into();
        assert_eq!(err.to_string(), "block #2 is not in a zone");

        let err = ZoneError::InvalidPlacement { id: EntityId(1), x: 3, y: -1 };
        assert_eq!(err.to_string(), "entity #1 cannot be placed at (3,-1)");

        let err = ZoneError::OriginBlocked { id: EntityId(5), x: 5, y: 5 };
        assert_eq!(err.to_string(), "block #5 cannot go back to (5,5): origin is occupied");
    }
}
