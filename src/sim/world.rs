/// World: every loaded zone plus the one turn clock they share.
///
/// ## Turn loop
///
/// `step()` advances the turn notifier by one turn and delivers each due
/// notification to the zone named in its target. The notifier handle is
/// released before any callback runs, so a block may re-register itself
/// from inside `on_turn_reached`.
///
/// ## Ids
///
/// Entity ids are allocated here and are unique across zones; the turn
/// notifier keys on (zone, id).

use std::collections::BTreeMap;

use crate::config::TurnConfig;
use crate::domain::chest::{Chest, Openable, Sealed};
use crate::domain::direction::Direction;
use crate::domain::entity::{Actor, EntityId, EntityKind};
use crate::error::{Result, ZoneError};
use super::block::MovableBlock;
use super::event::{SoundId, ZoneEvent};
use super::listener::ZoneQuery;
use super::turn::{TurnNotifier, TurnNotifierHandle};
use super::zone::{Departed, Zone};

/// Everything needed to build a block, minus id and scheduler.
#[derive(Clone, Debug)]
pub struct BlockSpec {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub repeatable: bool,
    pub auto_reset: bool,
    pub sounds: Vec<SoundId>,
    /// Chest body (can be opened) instead of a sealed one.
    pub chest: bool,
    pub open: bool,
}

impl BlockSpec {
    pub fn new(x: i32, y: i32, repeatable: bool) -> Self {
        BlockSpec {
            x,
            y,
            width: 1,
            height: 1,
            repeatable,
            auto_reset: false,
            sounds: Vec::new(),
            chest: false,
            open: false,
        }
    }

    pub fn auto_reset(mut self, on: bool) -> Self {
        self.auto_reset = on;
        self
    }

    pub fn sounds(mut self, sounds: Vec<SoundId>) -> Self {
        self.sounds = sounds;
        self
    }

    pub fn chest(mut self, open: bool) -> Self {
        self.chest = true;
        self.open = open;
        self
    }
}

pub struct World {
    zones: BTreeMap<String, Zone>,
    scheduler: TurnNotifierHandle,
    reset_delay_secs: u32,
    next_id: u32,
}

impl World {
    pub fn new(turns: &TurnConfig) -> Self {
        World {
            zones: BTreeMap::new(),
            scheduler: TurnNotifierHandle::new(TurnNotifier::new(turns.turn_length_ms)),
            reset_delay_secs: turns.reset_again_delay_secs,
            next_id: 1,
        }
    }

    pub fn scheduler(&self) -> TurnNotifierHandle {
        self.scheduler.clone()
    }

    pub fn current_turn(&self) -> u64 {
        self.scheduler.current_turn()
    }

    pub fn allocate_id(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }

    // ── Zones ──

    pub fn add_zone(&mut self, zone: Zone) {
        let name = zone.name().to_string();
        if self.zones.insert(name.clone(), zone).is_some() {
            tracing::warn!("zone {name} replaced");
        }
    }

    pub fn zone(&self, name: &str) -> Result<&Zone> {
        self.zones.get(name).ok_or_else(|| ZoneError::UnknownZone(name.to_string()))
    }

    pub fn zone_mut(&mut self, name: &str) -> Result<&mut Zone> {
        self.zones.get_mut(name).ok_or_else(|| ZoneError::UnknownZone(name.to_string()))
    }

    pub fn zone_names(&self) -> impl Iterator<Item = &str> {
        self.zones.keys().map(String::as_str)
    }

    // ── Entities ──

    pub fn spawn_actor(
        &mut self,
        zone: &str,
        kind: EntityKind,
        x: i32,
        y: i32,
        events: &mut Vec<ZoneEvent>,
    ) -> Result<EntityId> {
        let id = self.allocate_id();
        self.zone_mut(zone)?.add_actor(Actor::new(id, kind, x, y), events)?;
        Ok(id)
    }

    /// Build a block wired to this world's turn notifier and place it.
    pub fn spawn_block(&mut self, zone: &str, spec: &BlockSpec, events: &mut Vec<ZoneEvent>) -> Result<EntityId> {
        let id = self.allocate_id();
        let block = self.build_block(id, spec);
        self.zone_mut(zone)?.add_block(block, events)?;
        Ok(id)
    }

    pub fn build_block(&self, id: EntityId, spec: &BlockSpec) -> MovableBlock {
        let container: Box<dyn Openable> = if spec.chest {
            let mut chest = Chest::new();
            if spec.open {
                chest.open();
            }
            Box::new(chest)
        } else {
            Box::new(Sealed)
        };
        let mut block = MovableBlock::new(id, spec.x, spec.y, spec.repeatable, self.scheduler.clone())
            .with_size(spec.width, spec.height)
            .with_sounds(spec.sounds.clone())
            .with_container(container)
            .with_reset_delay(self.reset_delay_secs);
        block.set_auto_reset(spec.auto_reset);
        block
    }

    pub fn move_actor(
        &mut self,
        zone: &str,
        id: EntityId,
        dir: Direction,
        events: &mut Vec<ZoneEvent>,
    ) -> Result<bool> {
        self.zone_mut(zone)?.move_actor(id, dir, events)
    }

    pub fn remove(&mut self, zone: &str, id: EntityId, events: &mut Vec<ZoneEvent>) -> Result<Departed> {
        self.zone_mut(zone)?.remove(id, events)
    }

    pub fn reset_block(&mut self, zone: &str, id: EntityId, events: &mut Vec<ZoneEvent>) -> Result<()> {
        self.zone_mut(zone)?.reset_block(id, events)
    }

    // ── Turns ──

    /// Advance one turn and deliver due notifications.
    pub fn step(&mut self) -> Vec<ZoneEvent> {
        let mut events = Vec::new();
        let (turn, due) = self.scheduler.advance();
        for target in due {
            match self.zones.get_mut(&target.zone) {
                Some(zone) => zone.notify_turn(target.entity, turn, &mut events),
                None => tracing::warn!("turn {turn}: no zone {} for {}", target.zone, target.entity),
            }
        }
        events
    }

    /// Run `turns` steps, collecting all events.
    pub fn run(&mut self, turns: u64) -> Vec<ZoneEvent> {
        let mut events = Vec::new();
        for _ in 0..turns {
            events.extend(self.step());
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::block::BlockState;

    const ZONE: &str = "courtyard";

    fn world() -> World {
        // 1s turns, 3s retry: retries every 3 turns
        let mut w = World::new(&TurnConfig { turn_length_ms: 1000, reset_again_delay_secs: 3 });
        w.add_zone(Zone::new(ZONE, 12, 10));
        w
    }

    fn block_at(w: &World, id: EntityId) -> (i32, i32) {
        w.zone(ZONE).unwrap().block(id).unwrap().position()
    }

    #[test]
    fn ids_are_unique() {
        let mut w = world();
        let a = w.allocate_id();
        let b = w.allocate_id();
        assert_ne!(a, b);
    }

    #[test]
    fn unknown_zone_errors() {
        let mut w = world();
        let mut ev = vec![];
        let err = w.spawn_actor("nowhere", EntityKind::Player, 1, 1, &mut ev).unwrap_err();
        assert!(matches!(err, ZoneError::UnknownZone(_)));
    }

    #[test]
    fn blocked_origin_retries_until_free() {
        let mut w = world();
        let mut ev = vec![];
        let player = w.spawn_actor(ZONE, EntityKind::Player, 4, 5, &mut ev).unwrap();
        let block = w.spawn_block(ZONE, &BlockSpec::new(5, 5, true).auto_reset(true), &mut ev).unwrap();

        assert!(w.move_actor(ZONE, player, Direction::Right, &mut ev).unwrap());
        assert_eq!(block_at(&w, block), (6, 5));

        // Player leaves while standing on the origin: retry gets scheduled.
        w.remove(ZONE, player, &mut ev).unwrap();
        let zone = w.zone(ZONE).unwrap();
        assert_eq!(zone.block(block).unwrap().state(), BlockState::PendingReset);

        // An NPC stands on the origin for a while.
        let npc = w.spawn_actor(ZONE, EntityKind::Npc, 5, 5, &mut ev).unwrap();
        let ev = w.run(7);
        assert_eq!(block_at(&w, block), (6, 5));
        assert_eq!(ev.iter().filter(|e| matches!(e, ZoneEvent::ResetDeferred { .. })).count(), 2);

        // NPC walks off. The next retry (turn 9) brings the block home.
        let mut ev = vec![];
        w.move_actor(ZONE, npc, Direction::Up, &mut ev).unwrap();
        let ev = w.run(2);
        assert!(ev.contains(&ZoneEvent::BlockReset { id: block, x: 5, y: 5 }));
        let zone = w.zone(ZONE).unwrap();
        assert_eq!(zone.block(block).unwrap().state(), BlockState::AtOrigin);
        assert_eq!(w.scheduler().pending_len(), 0);
    }

    #[test]
    fn obstacle_removal_scenario() {
        let mut w = world();
        let mut ev = vec![];
        let player = w.spawn_actor(ZONE, EntityKind::Player, 4, 5, &mut ev).unwrap();
        let block = w.spawn_block(ZONE, &BlockSpec::new(5, 5, true).auto_reset(true), &mut ev).unwrap();
        w.move_actor(ZONE, player, Direction::Right, &mut ev).unwrap();
        w.move_actor(ZONE, player, Direction::Up, &mut ev).unwrap();

        // Another obstacle takes the origin.
        let crate_id = w.spawn_actor(ZONE, EntityKind::Obstacle, 5, 5, &mut ev).unwrap();
        w.remove(ZONE, player, &mut ev).unwrap();
        assert_eq!(block_at(&w, block), (6, 5));
        assert!(w.scheduler().pending_len() == 1);

        w.remove(ZONE, crate_id, &mut ev).unwrap();
        w.run(3);
        assert_eq!(block_at(&w, block), (5, 5));
        assert!(!w.zone(ZONE).unwrap().block(block).unwrap().is_moved());
    }

    #[test]
    fn push_while_pending_keeps_state_consistent() {
        let mut w = world();
        let mut ev = vec![];
        let p1 = w.spawn_actor(ZONE, EntityKind::Player, 4, 5, &mut ev).unwrap();
        let block = w.spawn_block(ZONE, &BlockSpec::new(5, 5, true).auto_reset(true), &mut ev).unwrap();
        w.move_actor(ZONE, p1, Direction::Right, &mut ev).unwrap();
        w.remove(ZONE, p1, &mut ev).unwrap(); // p1 sits on origin -> pending

        // A new player arrives and pushes the block further.
        let p2 = w.spawn_actor(ZONE, EntityKind::Player, 5, 5, &mut ev).unwrap();
        w.move_actor(ZONE, p2, Direction::Right, &mut ev).unwrap();
        assert_eq!(block_at(&w, block), (7, 5));
        w.move_actor(ZONE, p2, Direction::Up, &mut ev).unwrap();

        // The stale timer fires and finds the origin free.
        w.run(3);
        assert_eq!(block_at(&w, block), (5, 5));
        assert_eq!(w.scheduler().pending_len(), 0);
    }

    #[test]
    fn removed_block_never_fires() {
        let mut w = world();
        let mut ev = vec![];
        let p = w.spawn_actor(ZONE, EntityKind::Player, 4, 5, &mut ev).unwrap();
        let block = w.spawn_block(ZONE, &BlockSpec::new(5, 5, true).auto_reset(true), &mut ev).unwrap();
        w.move_actor(ZONE, p, Direction::Right, &mut ev).unwrap();
        w.remove(ZONE, p, &mut ev).unwrap();
        w.remove(ZONE, block, &mut ev).unwrap();
        let ev = w.run(10);
        assert!(ev.is_empty());
    }

    #[test]
    fn open_chest_block_cannot_be_pushed() {
        let mut w = world();
        let mut ev = vec![];
        let p = w.spawn_actor(ZONE, EntityKind::Player, 4, 5, &mut ev).unwrap();
        let block = w.spawn_block(ZONE, &BlockSpec::new(5, 5, true).chest(true), &mut ev).unwrap();
        assert!(!w.move_actor(ZONE, p, Direction::Right, &mut ev).unwrap());
        assert_eq!(block_at(&w, block), (5, 5));

        w.zone_mut(ZONE).unwrap().block_mut(block).unwrap().container_mut().close();
        assert!(w.move_actor(ZONE, p, Direction::Right, &mut ev).unwrap());
        assert_eq!(block_at(&w, block), (6, 5));
    }
}
