/// Movable block: a solid, pushable obstacle that can return to where it
/// was placed.
///
/// ## Push rule
///
/// A player walking into the block pushes it one cell in the direction of
/// the player's move. The push is refused (silently) if:
///   - the direction has no displacement (`Stop`)
///   - the block is one-shot (`repeatable == false`) and already moved
///   - the block's container is open
///   - the destination footprint collides with terrain or an obstacle
///
/// ## Reset state machine
///
/// ```text
///   AtOrigin ──push──▶ Displaced ──reset()──▶ AtOrigin
///                         │
///          qualifying exit, auto_reset
///                         ▼
///                   attempt_reset ──origin free──▶ reset()
///                         │
///                    origin blocked
///                         ▼
///                   PendingReset ──timer──▶ attempt_reset
/// ```
///
/// A qualifying exit: after an entity leaves, the zone holds no players, or
/// exactly one player who is the one leaving. The retry loop is unbounded.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::domain::chest::{Openable, Sealed};
use crate::domain::direction::{Direction, Rect};
use crate::domain::entity::{Actor, EntityId};
use crate::error::BlockError;
use super::event::{SoundId, ZoneEvent};
use super::listener::{
    MovementListener, TurnListener, ZoneEnterExitListener, ZoneHost, ZoneMember, ZoneQuery,
};
use super::turn::{TurnNotifierHandle, TurnTarget};

/// Seconds between two attempts to move a block back to its origin.
pub const RESET_AGAIN_DELAY_SECS: u32 = 10;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BlockState {
    AtOrigin,
    Displaced,
    /// Displaced, with a retry timer registered.
    PendingReset,
}

#[derive(Debug)]
pub struct MovableBlock {
    id: EntityId,
    x: i32,
    y: i32,
    width: u32,
    height: u32,
    origin: Option<(i32, i32)>,
    repeatable: bool,
    auto_reset: bool,
    moved: bool,
    sounds: Vec<SoundId>,
    container: Box<dyn Openable>,
    zone: Option<String>,
    scheduler: TurnNotifierHandle,
    reset_delay_secs: u32,
    rng: StdRng,
}

impl MovableBlock {
    pub fn new(
        id: EntityId,
        x: i32,
        y: i32,
        repeatable: bool,
        scheduler: TurnNotifierHandle,
    ) -> Self {
        MovableBlock {
            id,
            x,
            y,
            width: 1,
            height: 1,
            origin: None,
            repeatable,
            auto_reset: false,
            moved: false,
            sounds: Vec::new(),
            container: Box::new(Sealed),
            zone: None,
            scheduler,
            reset_delay_secs: RESET_AGAIN_DELAY_SECS,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width.max(1);
        self.height = height.max(1);
        self
    }

    pub fn with_sounds(mut self, sounds: Vec<SoundId>) -> Self {
        self.sounds = sounds;
        self
    }

    pub fn with_container(mut self, container: Box<dyn Openable>) -> Self {
        self.container = container;
        self
    }

    pub fn with_reset_delay(mut self, seconds: u32) -> Self {
        self.reset_delay_secs = seconds;
        self
    }

    /// Deterministic sound picks.
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Should the block return to its origin once the zone empties?
    /// Turning it off drops any pending retry.
    pub fn set_auto_reset(&mut self, auto_reset: bool) {
        self.auto_reset = auto_reset;
        if !auto_reset {
            self.cancel_retry();
        }
    }

    // ── Accessors ──

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn position(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    pub fn origin(&self) -> Option<(i32, i32)> {
        self.origin
    }

    pub fn is_moved(&self) -> bool {
        self.moved
    }

    pub fn is_repeatable(&self) -> bool {
        self.repeatable
    }

    pub fn auto_reset(&self) -> bool {
        self.auto_reset
    }

    pub fn zone_name(&self) -> Option<&str> {
        self.zone.as_deref()
    }

    pub fn sounds(&self) -> &[SoundId] {
        &self.sounds
    }

    pub fn container(&self) -> &dyn Openable {
        self.container.as_ref()
    }

    pub fn container_mut(&mut self) -> &mut dyn Openable {
        self.container.as_mut()
    }

    pub fn footprint(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    pub fn state(&self) -> BlockState {
        if !self.moved {
            return BlockState::AtOrigin;
        }
        match self.turn_target() {
            Some(t) if self.scheduler.is_pending(&t) => BlockState::PendingReset,
            _ => BlockState::Displaced,
        }
    }

    /// Scheduler key for this block's retry timer, while it is in a zone.
    pub fn turn_target(&self) -> Option<TurnTarget> {
        self.zone.as_deref().map(|z| TurnTarget::new(z, self.id))
    }

    // ── Push ──

    pub fn position_after_push(&self, dir: Direction) -> (i32, i32) {
        (self.x + dir.dx(), self.y + dir.dy())
    }

    pub fn may_be_pushed(&self, zone: &dyn ZoneQuery, dir: Direction) -> bool {
        if !dir.is_moving() {
            return false;
        }
        if !self.repeatable && self.moved {
            return false;
        }
        if self.container.is_open() {
            return false;
        }
        let dest = self.footprint().shifted(dir);
        !zone.collides(self.id, dest)
    }

    /// Push one cell towards `dir`. Refused pushes change nothing and emit
    /// nothing. Returns whether the block moved.
    pub fn push(
        &mut self,
        zone: &dyn ZoneQuery,
        pusher: EntityId,
        dir: Direction,
        events: &mut Vec<ZoneEvent>,
    ) -> bool {
        if !self.may_be_pushed(zone, dir) {
            return false;
        }
        let (x, y) = self.position_after_push(dir);
        self.x = x;
        self.y = y;
        self.moved = true;

        self.send_sound(events);
        events.push(ZoneEvent::BlockPushed { id: self.id, x, y });
        events.push(ZoneEvent::WorldChanged { id: self.id });
        tracing::debug!(block = %self.id, %pusher, ?dir, x, y, zone = zone.name(), "block pushed");
        true
    }

    fn send_sound(&mut self, events: &mut Vec<ZoneEvent>) {
        if let Some(sound) = self.sounds.choose(&mut self.rng) {
            events.push(ZoneEvent::Sound { source: self.id, sound: sound.clone() });
        }
    }

    // ── Reset ──

    /// Put the block back on its origin and forget any pending retry.
    pub fn reset(&mut self, events: &mut Vec<ZoneEvent>) -> Result<(), BlockError> {
        let (x, y) = self.origin.ok_or(BlockError::NoOrigin(self.id))?;
        self.moved = false;
        self.x = x;
        self.y = y;
        self.cancel_retry();
        events.push(ZoneEvent::BlockReset { id: self.id, x, y });
        events.push(ZoneEvent::WorldChanged { id: self.id });
        tracing::debug!(block = %self.id, x, y, "block reset");
        Ok(())
    }

    fn cancel_retry(&self) {
        if let Some(target) = self.turn_target() {
            self.scheduler.dont_notify(&target);
        }
    }

    /// Reset if the origin is free, otherwise try again after the retry
    /// delay. Replaces any earlier retry registration.
    pub fn attempt_reset(
        &mut self,
        zone: &dyn ZoneQuery,
        events: &mut Vec<ZoneEvent>,
    ) -> Result<(), BlockError> {
        let (ox, oy) = self.origin.ok_or(BlockError::NoOrigin(self.id))?;
        let target = self.turn_target().ok_or(BlockError::NotInZone(self.id))?;

        if !zone.collides(self.id, self.footprint().at(ox, oy)) {
            return self.reset(events);
        }

        self.scheduler.dont_notify(&target);
        let retry_turn = self.scheduler.notify_in_seconds(self.reset_delay_secs, target);
        events.push(ZoneEvent::ResetDeferred { id: self.id, retry_turn });
        tracing::debug!(block = %self.id, ox, oy, retry_turn, zone = zone.name(), "origin blocked, reset deferred");
        Ok(())
    }

    fn reset_in_playerless_zone(
        &mut self,
        zone: &dyn ZoneQuery,
        departing: EntityId,
        events: &mut Vec<ZoneEvent>,
    ) {
        if !self.auto_reset || !self.moved {
            return;
        }
        let players = zone.players();
        let qualifies = players.is_empty() || (players.len() == 1 && players[0] == departing);
        if !qualifies {
            return;
        }
        if let Err(e) = self.attempt_reset(zone, events) {
            tracing::warn!("block {}: reset after {} left {}: {e}", self.id, departing, zone.name());
        }
    }

    /// Is `zone` the zone this block currently lives in?
    fn is_home(&self, zone: &dyn ZoneQuery) -> bool {
        self.zone.as_deref() == Some(zone.name())
    }
}

// ══════════════════════════════════════════════════════════════
// Zone lifecycle and listener roles
// ══════════════════════════════════════════════════════════════

impl ZoneMember for MovableBlock {
    fn on_added(&mut self, zone: &mut dyn ZoneHost) {
        self.origin = Some((self.x, self.y));
        self.zone = Some(zone.name().to_string());
        zone.add_movement_listener(self.id);
        zone.add_zone_enter_exit_listener(self.id);
    }

    fn on_removed(&mut self, zone: &mut dyn ZoneHost) {
        zone.remove_movement_listener(self.id);
        zone.remove_zone_enter_exit_listener(self.id);
        self.cancel_retry();
        self.zone = None;
    }
}

impl MovementListener for MovableBlock {
    fn area(&self) -> Rect {
        self.footprint()
    }

    fn before_move(
        &mut self,
        zone: &dyn ZoneQuery,
        mover: &Actor,
        old: (i32, i32),
        new: (i32, i32),
        events: &mut Vec<ZoneEvent>,
    ) {
        if !mover.is_player() || !self.is_home(zone) {
            return;
        }
        let dir = Direction::towards_area(mover.area_at(old.0, old.1), mover.area_at(new.0, new.1));
        self.push(zone, mover.id, dir, events);
    }

    fn on_exited(
        &mut self,
        zone: &dyn ZoneQuery,
        mover: &Actor,
        _old: (i32, i32),
        events: &mut Vec<ZoneEvent>,
    ) {
        if !self.is_home(zone) {
            return;
        }
        tracing::debug!("block {} notified about {} leaving its area in {}", self.id, mover.id, zone.name());
        self.reset_in_playerless_zone(zone, mover.id, events);
    }
}

impl ZoneEnterExitListener for MovableBlock {
    fn on_zone_exited(&mut self, zone: &dyn ZoneQuery, entity: EntityId, events: &mut Vec<ZoneEvent>) {
        if !self.is_home(zone) || entity == self.id {
            return;
        }
        tracing::debug!("block {} notified about {} exiting {}", self.id, entity, zone.name());
        self.reset_in_playerless_zone(zone, entity, events);
    }
}

impl TurnListener for MovableBlock {
    fn on_turn_reached(&mut self, zone: &dyn ZoneQuery, turn: u64, events: &mut Vec<ZoneEvent>) {
        if !self.is_home(zone) {
            tracing::warn!("block {} got turn {} for {} after leaving it", self.id, turn, zone.name());
            return;
        }
        // A manual reset since the timer was set leaves nothing to do.
        if !self.moved || !self.auto_reset {
            return;
        }
        if let Err(e) = self.attempt_reset(zone, events) {
            tracing::warn!("block {} retry on turn {turn}: {e}", self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chest::Chest;
    use crate::domain::entity::EntityKind;
    use crate::sim::listener::ListenerRegistry;
    use crate::sim::turn::TurnNotifier;

    /// Minimal zone: a set of blocked cells and a player list.
    struct FakeZone {
        blocked: Vec<(i32, i32)>,
        players: Vec<EntityId>,
        movement: Vec<EntityId>,
        enter_exit: Vec<EntityId>,
    }

    impl FakeZone {
        fn new() -> Self {
            FakeZone { blocked: vec![], players: vec![], movement: vec![], enter_exit: vec![] }
        }
    }

    impl ZoneQuery for FakeZone {
        fn name(&self) -> &str {
            "yard"
        }
        fn collides(&self, _entity: EntityId, area: Rect) -> bool {
            area.cells().any(|c| self.blocked.contains(&c))
        }
        fn players(&self) -> Vec<EntityId> {
            self.players.clone()
        }
    }

    impl ListenerRegistry for FakeZone {
        fn add_movement_listener(&mut self, id: EntityId) {
            self.movement.push(id);
        }
        fn remove_movement_listener(&mut self, id: EntityId) {
            self.movement.retain(|&l| l != id);
        }
        fn add_zone_enter_exit_listener(&mut self, id: EntityId) {
            self.enter_exit.push(id);
        }
        fn remove_zone_enter_exit_listener(&mut self, id: EntityId) {
            self.enter_exit.retain(|&l| l != id);
        }
    }

    const PLAYER: EntityId = EntityId(1);

    fn scheduler() -> TurnNotifierHandle {
        TurnNotifierHandle::new(TurnNotifier::new(1000))
    }

    fn placed(repeatable: bool, zone: &mut FakeZone) -> MovableBlock {
        let mut b = MovableBlock::new(EntityId(9), 5, 5, repeatable, scheduler());
        b.on_added(zone);
        b
    }

    #[test]
    fn placement_records_origin_and_subscribes() {
        let mut zone = FakeZone::new();
        let mut b = placed(true, &mut zone);
        assert_eq!(b.origin(), Some((5, 5)));
        assert_eq!(b.zone_name(), Some("yard"));
        assert_eq!(zone.movement, vec![EntityId(9)]);
        assert_eq!(zone.enter_exit, vec![EntityId(9)]);

        b.on_removed(&mut zone);
        assert!(zone.movement.is_empty());
        assert!(zone.enter_exit.is_empty());
        assert_eq!(b.zone_name(), None);
    }

    #[test]
    fn push_moves_one_cell() {
        let mut zone = FakeZone::new();
        let mut b = placed(true, &mut zone);
        let mut ev = vec![];
        assert!(b.push(&zone, PLAYER, Direction::Right, &mut ev));
        assert_eq!(b.position(), (6, 5));
        assert!(b.is_moved());
        assert_eq!(b.state(), BlockState::Displaced);
        assert!(ev.contains(&ZoneEvent::BlockPushed { id: EntityId(9), x: 6, y: 5 }));
        assert!(ev.contains(&ZoneEvent::WorldChanged { id: EntityId(9) }));
    }

    #[test]
    fn push_into_collision_is_silent() {
        let mut zone = FakeZone::new();
        zone.blocked.push((5, 4));
        let mut b = placed(true, &mut zone);
        let mut ev = vec![];
        assert!(!b.push(&zone, PLAYER, Direction::Up, &mut ev));
        assert_eq!(b.position(), (5, 5));
        assert!(!b.is_moved());
        assert!(ev.is_empty());
    }

    #[test]
    fn stop_is_never_a_push() {
        let mut zone = FakeZone::new();
        let mut b = placed(true, &mut zone);
        let mut ev = vec![];
        assert!(!b.push(&zone, PLAYER, Direction::Stop, &mut ev));
        assert!(ev.is_empty());
    }

    #[test]
    fn one_shot_block_refuses_second_push() {
        let mut zone = FakeZone::new();
        let mut b = placed(false, &mut zone);
        let mut ev = vec![];
        assert!(b.push(&zone, PLAYER, Direction::Right, &mut ev));
        for d in Direction::CARDINALS {
            assert!(!b.push(&zone, PLAYER, d, &mut ev));
        }
        assert_eq!(b.position(), (6, 5));

        b.reset(&mut ev).unwrap();
        assert!(b.push(&zone, PLAYER, Direction::Down, &mut ev));
        assert_eq!(b.position(), (5, 6));
    }

    #[test]
    fn open_container_blocks_push() {
        let mut zone = FakeZone::new();
        let mut b = MovableBlock::new(EntityId(9), 5, 5, true, scheduler())
            .with_container(Box::new(Chest::new()));
        b.on_added(&mut zone);
        b.container_mut().open();
        let mut ev = vec![];
        assert!(!b.push(&zone, PLAYER, Direction::Left, &mut ev));
        b.container_mut().close();
        assert!(b.push(&zone, PLAYER, Direction::Left, &mut ev));
    }

    #[test]
    fn reset_restores_origin_after_many_pushes() {
        let mut zone = FakeZone::new();
        let mut b = placed(true, &mut zone);
        let mut ev = vec![];
        for d in [Direction::Right, Direction::Right, Direction::Down, Direction::Left] {
            assert!(b.push(&zone, PLAYER, d, &mut ev));
        }
        assert_eq!(b.position(), (6, 6));
        b.reset(&mut ev).unwrap();
        assert_eq!(b.position(), (5, 5));
        assert!(!b.is_moved());
        assert_eq!(b.state(), BlockState::AtOrigin);
    }

    #[test]
    fn reset_without_origin_fails() {
        let mut b = MovableBlock::new(EntityId(2), 1, 1, true, scheduler());
        let mut ev = vec![];
        assert_eq!(b.reset(&mut ev), Err(BlockError::NoOrigin(EntityId(2))));
        assert!(ev.is_empty());
    }

    #[test]
    fn sound_pick_comes_from_set() {
        let mut zone = FakeZone::new();
        let sounds = vec![SoundId::new("scrape-1"), SoundId::new("scrape-2")];
        let mut b = MovableBlock::new(EntityId(9), 5, 5, true, scheduler())
            .with_sounds(sounds.clone())
            .with_rng_seed(7);
        b.on_added(&mut zone);
        let mut ev = vec![];
        b.push(&zone, PLAYER, Direction::Right, &mut ev);
        let played: Vec<_> = ev
            .iter()
            .filter_map(|e| match e {
                ZoneEvent::Sound { sound, .. } => Some(sound.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(played.len(), 1);
        assert!(sounds.contains(&played[0]));
    }

    #[test]
    fn before_move_only_reacts_to_players() {
        let mut zone = FakeZone::new();
        let mut b = placed(true, &mut zone);
        let mut ev = vec![];
        let npc = Actor::new(EntityId(3), EntityKind::Npc, 4, 5);
        b.before_move(&zone, &npc, (4, 5), (5, 5), &mut ev);
        assert_eq!(b.position(), (5, 5));

        let player = Actor::new(PLAYER, EntityKind::Player, 4, 5);
        b.before_move(&zone, &player, (4, 5), (5, 5), &mut ev);
        assert_eq!(b.position(), (6, 5));
    }

    #[test]
    fn exit_with_blocked_origin_schedules_single_retry() {
        let mut zone = FakeZone::new();
        let mut b = placed(true, &mut zone);
        b.set_auto_reset(true);
        let mut ev = vec![];
        b.push(&zone, PLAYER, Direction::Right, &mut ev);
        zone.blocked.push((5, 5));

        // Sole player leaving qualifies; twice must not double-register.
        zone.players = vec![PLAYER];
        b.on_zone_exited(&zone, PLAYER, &mut ev);
        b.on_zone_exited(&zone, PLAYER, &mut ev);
        let target = b.turn_target().unwrap();
        assert_eq!(b.scheduler.registrations(&target), 1);
        assert_eq!(b.state(), BlockState::PendingReset);
        assert_eq!(b.position(), (6, 5));
    }

    #[test]
    fn exit_with_other_player_present_does_nothing() {
        let mut zone = FakeZone::new();
        let mut b = placed(true, &mut zone);
        b.set_auto_reset(true);
        let mut ev = vec![];
        b.push(&zone, PLAYER, Direction::Right, &mut ev);

        zone.players = vec![PLAYER, EntityId(2)];
        b.on_zone_exited(&zone, PLAYER, &mut ev);
        assert_eq!(b.state(), BlockState::Displaced);

        // One player left, but not the one leaving
        zone.players = vec![EntityId(2)];
        b.on_zone_exited(&zone, EntityId(3), &mut ev);
        assert_eq!(b.position(), (6, 5));
    }

    #[test]
    fn exit_into_empty_zone_resets_immediately() {
        let mut zone = FakeZone::new();
        let mut b = placed(true, &mut zone);
        b.set_auto_reset(true);
        let mut ev = vec![];
        b.push(&zone, PLAYER, Direction::Right, &mut ev);
        b.on_zone_exited(&zone, PLAYER, &mut ev);
        assert_eq!(b.position(), (5, 5));
        assert_eq!(b.state(), BlockState::AtOrigin);
    }

    #[test]
    fn area_exit_of_sole_player_resets() {
        let mut zone = FakeZone::new();
        let mut b = placed(true, &mut zone);
        b.set_auto_reset(true);
        let mut ev = vec![];
        b.push(&zone, PLAYER, Direction::Right, &mut ev);

        zone.players = vec![PLAYER];
        let player = Actor::new(PLAYER, EntityKind::Player, 6, 4);
        b.on_exited(&zone, &player, (6, 5), &mut ev);
        assert_eq!(b.position(), (5, 5));
        assert_eq!(b.state(), BlockState::AtOrigin);
    }

    #[test]
    fn no_auto_reset_ignores_exits() {
        let mut zone = FakeZone::new();
        let mut b = placed(true, &mut zone);
        let mut ev = vec![];
        b.push(&zone, PLAYER, Direction::Right, &mut ev);
        b.on_zone_exited(&zone, PLAYER, &mut ev);
        assert_eq!(b.position(), (6, 5));
    }

    #[test]
    fn stale_timer_after_manual_reset_is_ignored() {
        let mut zone = FakeZone::new();
        let mut b = placed(true, &mut zone);
        b.set_auto_reset(true);
        let mut ev = vec![];
        b.push(&zone, PLAYER, Direction::Right, &mut ev);
        b.reset(&mut ev).unwrap();
        ev.clear();
        b.on_turn_reached(&zone, 40, &mut ev);
        assert!(ev.is_empty());
        assert_eq!(b.position(), (5, 5));
    }

    #[test]
    fn timer_after_removal_is_noop() {
        let mut zone = FakeZone::new();
        let mut b = placed(true, &mut zone);
        b.set_auto_reset(true);
        let mut ev = vec![];
        b.push(&zone, PLAYER, Direction::Right, &mut ev);
        b.on_removed(&mut zone);
        ev.clear();
        b.on_turn_reached(&zone, 3, &mut ev);
        b.on_zone_exited(&zone, PLAYER, &mut ev);
        assert!(ev.is_empty());
        assert_eq!(b.position(), (6, 5));
    }
}
