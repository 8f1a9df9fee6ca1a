/// Contracts between a zone and the entities that listen to it.
///
/// The zone side is split in two: `ZoneQuery` (read-only questions asked
/// during a callback) and `ListenerRegistry` (subscription bookkeeping used
/// from the `on_added` / `on_removed` lifecycle hooks). `ZoneHost` is both.
///
/// Listener callbacks receive the zone immutably. The listener itself is
/// the only thing mutated during a callback; side effects leave through the
/// `events` buffer.

use crate::domain::direction::Rect;
use crate::domain::entity::{Actor, EntityId};
use super::event::ZoneEvent;

pub trait ZoneQuery {
    fn name(&self) -> &str;

    /// Would `entity` collide with terrain or another obstacle if it
    /// occupied `area`? The entity never collides with itself.
    fn collides(&self, entity: EntityId, area: Rect) -> bool;

    /// Players currently in the zone, in arrival order.
    fn players(&self) -> Vec<EntityId>;
}

pub trait ListenerRegistry {
    fn add_movement_listener(&mut self, id: EntityId);
    fn remove_movement_listener(&mut self, id: EntityId);
    fn add_zone_enter_exit_listener(&mut self, id: EntityId);
    fn remove_zone_enter_exit_listener(&mut self, id: EntityId);
}

pub trait ZoneHost: ZoneQuery + ListenerRegistry {}

impl<T: ZoneQuery + ListenerRegistry> ZoneHost for T {}

/// Entities with subscription side effects when placed into / taken out of
/// a zone.
pub trait ZoneMember {
    fn on_added(&mut self, zone: &mut dyn ZoneHost);
    fn on_removed(&mut self, zone: &mut dyn ZoneHost);
}

/// Notified about active entities moving relative to the listener's area.
pub trait MovementListener {
    /// Area the listener watches.
    fn area(&self) -> Rect;

    /// `mover` is about to move from `old` to `new`, and its destination
    /// footprint overlaps `area()`. Runs before the move is committed.
    fn before_move(
        &mut self,
        zone: &dyn ZoneQuery,
        mover: &Actor,
        old: (i32, i32),
        new: (i32, i32),
        events: &mut Vec<ZoneEvent>,
    );

    /// `mover` moved into the area.
    fn on_entered(
        &mut self,
        _zone: &dyn ZoneQuery,
        _mover: &Actor,
        _new: (i32, i32),
        _events: &mut Vec<ZoneEvent>,
    ) {
    }

    /// `mover` moved while staying inside the area.
    fn on_moved(
        &mut self,
        _zone: &dyn ZoneQuery,
        _mover: &Actor,
        _old: (i32, i32),
        _new: (i32, i32),
        _events: &mut Vec<ZoneEvent>,
    ) {
    }

    /// `mover` left the area.
    fn on_exited(
        &mut self,
        zone: &dyn ZoneQuery,
        mover: &Actor,
        old: (i32, i32),
        events: &mut Vec<ZoneEvent>,
    );
}

/// Notified when any entity is added to or removed from the zone.
pub trait ZoneEnterExitListener {
    fn on_zone_entered(
        &mut self,
        _zone: &dyn ZoneQuery,
        _entity: EntityId,
        _events: &mut Vec<ZoneEvent>,
    ) {
    }

    /// Called while `entity` is still listed in the zone.
    fn on_zone_exited(&mut self, zone: &dyn ZoneQuery, entity: EntityId, events: &mut Vec<ZoneEvent>);
}

pub trait TurnListener {
    fn on_turn_reached(&mut self, zone: &dyn ZoneQuery, turn: u64, events: &mut Vec<ZoneEvent>);
}
