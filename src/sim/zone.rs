/// Zone: one map of the world, the single owner of its occupancy.
///
/// ## Layers
///
/// Two distinct concepts, queried separately:
///   1. TERRAIN:   what a cell IS (`tiles`, static collision)
///   2. OCCUPANCY: who is IN a cell (`actors`, `blocks`)
///
/// `collides(entity, area)` = terrain solid/out of bounds || another
/// occupant's footprint overlaps `area`. An entity never collides with itself.
///
/// ## Listener dispatch
///
/// Blocks subscribe themselves from `on_added`. Dispatch walks the listener
/// lists in registration order. The listening block is taken out of the
/// block table for the duration of its callback, so it can read the zone
/// while mutating itself; it goes back in before the next listener runs.
///
/// Moving an actor:
///   1. `before_move` to every movement listener whose area overlaps the
///      destination footprint (this is where pushes happen)
///   2. collision check at the destination; refused moves stop here
///   3. commit
///   4. `on_entered` / `on_moved` / `on_exited` by old/new overlap

use std::collections::BTreeMap;

use crate::domain::direction::{Direction, Rect};
use crate::domain::entity::{Actor, EntityId, EntityKind};
use crate::domain::tile::Tile;
use crate::error::{Result, ZoneError};
use super::block::MovableBlock;
use super::event::ZoneEvent;
use super::listener::{
    ListenerRegistry, MovementListener, TurnListener, ZoneEnterExitListener, ZoneMember, ZoneQuery,
};

/// What left the zone.
#[derive(Debug)]
pub enum Departed {
    Actor(Actor),
    Block(MovableBlock),
}

#[derive(Debug)]
pub struct Zone {
    name: String,
    width: usize,
    height: usize,
    tiles: Vec<Vec<Tile>>,
    actors: Vec<Actor>,
    blocks: BTreeMap<EntityId, MovableBlock>,
    movement_listeners: Vec<EntityId>,
    enter_exit_listeners: Vec<EntityId>,
}

impl Zone {
    pub fn new(name: &str, width: usize, height: usize) -> Self {
        Zone::from_tiles(name, vec![vec![Tile::Floor; width]; height])
    }

    /// Build from a row-major tile grid. Rows are expected to share one width.
    pub fn from_tiles(name: &str, tiles: Vec<Vec<Tile>>) -> Self {
        let height = tiles.len();
        let width = tiles.first().map_or(0, Vec::len);
        Zone {
            name: name.to_string(),
            width,
            height,
            tiles,
            actors: Vec::new(),
            blocks: BTreeMap::new(),
            movement_listeners: Vec::new(),
            enter_exit_listeners: Vec::new(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    // ── Terrain ──

    /// Tile at (x, y). Outside the map reads as `Wall`.
    pub fn tile_at(&self, x: i32, y: i32) -> Tile {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return Tile::Wall;
        }
        self.tiles[y as usize][x as usize]
    }

    pub fn terrain_collides(&self, area: Rect) -> bool {
        area.cells().any(|(x, y)| self.tile_at(x, y).is_solid())
    }

    // ── Occupancy ──

    pub fn actor(&self, id: EntityId) -> Option<&Actor> {
        self.actors.iter().find(|a| a.id == id)
    }

    pub fn actors(&self) -> &[Actor] {
        &self.actors
    }

    pub fn block(&self, id: EntityId) -> Option<&MovableBlock> {
        self.blocks.get(&id)
    }

    pub fn block_mut(&mut self, id: EntityId) -> Option<&mut MovableBlock> {
        self.blocks.get_mut(&id)
    }

    pub fn blocks(&self) -> impl Iterator<Item = &MovableBlock> {
        self.blocks.values()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.actor(id).is_some() || self.blocks.contains_key(&id)
    }

    pub fn movement_listeners(&self) -> &[EntityId] {
        &self.movement_listeners
    }

    pub fn enter_exit_listeners(&self) -> &[EntityId] {
        &self.enter_exit_listeners
    }

    // ── Entering / leaving ──

    pub fn add_actor(&mut self, actor: Actor, events: &mut Vec<ZoneEvent>) -> Result<()> {
        if self.contains(actor.id) || self.collides(actor.id, actor.area()) {
            return Err(ZoneError::InvalidPlacement { id: actor.id, x: actor.x, y: actor.y });
        }
        let id = actor.id;
        self.actors.push(actor);
        self.notify_zone_entered(id, events);
        Ok(())
    }

    /// Place a block. Its current position becomes its origin.
    pub fn add_block(&mut self, mut block: MovableBlock, events: &mut Vec<ZoneEvent>) -> Result<()> {
        let id = block.id();
        if self.contains(id) || self.collides(id, block.footprint()) {
            let (x, y) = block.position();
            return Err(ZoneError::InvalidPlacement { id, x, y });
        }
        block.on_added(self);
        self.blocks.insert(id, block);
        self.notify_zone_entered(id, events);
        Ok(())
    }

    /// Remove any entity. Enter/exit listeners hear about it while the
    /// entity is still listed.
    pub fn remove(&mut self, id: EntityId, events: &mut Vec<ZoneEvent>) -> Result<Departed> {
        if let Some(mut block) = self.blocks.remove(&id) {
            block.on_removed(self);
            self.notify_zone_exited(id, events);
            events.push(ZoneEvent::EntityLeft { id });
            return Ok(Departed::Block(block));
        }

        let idx = self
            .actors
            .iter()
            .position(|a| a.id == id)
            .ok_or(ZoneError::UnknownEntity(id))?;
        self.notify_zone_exited(id, events);
        let actor = self.actors.remove(idx);
        events.push(ZoneEvent::EntityLeft { id });
        Ok(Departed::Actor(actor))
    }

    // ── Movement ──

    /// Step an actor one cell. Returns whether the actor moved.
    pub fn move_actor(&mut self, id: EntityId, dir: Direction, events: &mut Vec<ZoneEvent>) -> Result<bool> {
        let actor = self.actor(id).ok_or(ZoneError::UnknownEntity(id))?;
        let (nx, ny) = (actor.x + dir.dx(), actor.y + dir.dy());
        self.move_actor_to(id, nx, ny, events)
    }

    pub fn move_actor_to(
        &mut self,
        id: EntityId,
        nx: i32,
        ny: i32,
        events: &mut Vec<ZoneEvent>,
    ) -> Result<bool> {
        let mover = self.actor(id).cloned().ok_or(ZoneError::UnknownEntity(id))?;
        if !mover.kind.is_active() {
            return Err(ZoneError::NotMovable(id));
        }
        let old = (mover.x, mover.y);
        let new = (nx, ny);
        if old == new {
            return Ok(false);
        }
        let old_area = mover.area();
        let new_area = mover.area_at(nx, ny);

        // 1. Pre-move: listeners in the way get a say (pushes).
        for lid in self.movement_listeners.clone() {
            self.with_block(lid, |block, zone| {
                if block.area().intersects(&new_area) {
                    block.before_move(zone, &mover, old, new, events);
                }
            });
        }

        // 2. Destination must be free now.
        if self.collides(id, new_area) {
            return Ok(false);
        }

        // 3. Commit.
        if let Some(a) = self.actors.iter_mut().find(|a| a.id == id) {
            a.x = nx;
            a.y = ny;
        }
        events.push(ZoneEvent::EntityMoved { id, x: nx, y: ny });
        let mover = Actor { x: nx, y: ny, ..mover };

        // 4. Area enter / move / exit.
        for lid in self.movement_listeners.clone() {
            self.with_block(lid, |block, zone| {
                let area = block.area();
                match (area.intersects(&old_area), area.intersects(&new_area)) {
                    (false, true) => block.on_entered(zone, &mover, new, events),
                    (true, true) => block.on_moved(zone, &mover, old, new, events),
                    (true, false) => block.on_exited(zone, &mover, old, events),
                    (false, false) => {}
                }
            });
        }
        Ok(true)
    }

    // ── Block operations ──

    /// Put a block back on its origin. Refused while anything else
    /// overlaps the origin footprint.
    pub fn reset_block(&mut self, id: EntityId, events: &mut Vec<ZoneEvent>) -> Result<()> {
        let block = self.blocks.get(&id).ok_or(ZoneError::UnknownEntity(id))?;
        if let Some((x, y)) = block.origin() {
            if self.collides(id, block.footprint().at(x, y)) {
                return Err(ZoneError::OriginBlocked { id, x, y });
            }
        }
        if let Some(block) = self.blocks.get_mut(&id) {
            block.reset(events)?;
        }
        Ok(())
    }

    /// Deliver a due turn notification. Unknown ids are stale registrations
    /// and are dropped.
    pub fn notify_turn(&mut self, id: EntityId, turn: u64, events: &mut Vec<ZoneEvent>) {
        let delivered = self.with_block(id, |block, zone| block.on_turn_reached(zone, turn, events));
        if delivered.is_none() {
            tracing::debug!("zone {}: dropping turn {} notification for departed {}", self.name, turn, id);
        }
    }

    fn notify_zone_entered(&mut self, id: EntityId, events: &mut Vec<ZoneEvent>) {
        for lid in self.enter_exit_listeners.clone() {
            if lid == id {
                continue;
            }
            self.with_block(lid, |block, zone| block.on_zone_entered(zone, id, events));
        }
    }

    fn notify_zone_exited(&mut self, id: EntityId, events: &mut Vec<ZoneEvent>) {
        for lid in self.enter_exit_listeners.clone() {
            if lid == id {
                continue;
            }
            self.with_block(lid, |block, zone| block.on_zone_exited(zone, id, events));
        }
    }

    /// Run `f` with block `id` taken out of the table.
    fn with_block<R>(&mut self, id: EntityId, f: impl FnOnce(&mut MovableBlock, &Zone) -> R) -> Option<R> {
        let mut block = self.blocks.remove(&id)?;
        let result = f(&mut block, self);
        self.blocks.insert(id, block);
        Some(result)
    }

    // ── Display ──

    /// Text picture of the zone using the map legend.
    pub fn to_map_string(&self) -> String {
        let mut rows: Vec<Vec<char>> = self
            .tiles
            .iter()
            .map(|row| row.iter().map(|t| t.glyph()).collect())
            .collect();
        let mut put = |x: i32, y: i32, ch: char| {
            if x >= 0 && y >= 0 {
                if let Some(cell) = rows.get_mut(y as usize).and_then(|r| r.get_mut(x as usize)) {
                    *cell = ch;
                }
            }
        };
        for b in self.blocks.values() {
            let ch = match (b.is_repeatable(), b.auto_reset()) {
                (true, false) => 'B',
                (false, false) => 'b',
                (true, true) => 'R',
                (false, true) => 'r',
            };
            for (x, y) in b.footprint().cells() {
                put(x, y, ch);
            }
        }
        for a in &self.actors {
            let ch = match a.kind {
                EntityKind::Player => '@',
                EntityKind::Npc => 'n',
                EntityKind::Obstacle => 'O',
            };
            for (x, y) in a.area().cells() {
                put(x, y, ch);
            }
        }
        rows.into_iter()
            .map(|r| r.into_iter().collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl ZoneQuery for Zone {
    fn name(&self) -> &str {
        &self.name
    }

    fn collides(&self, entity: EntityId, area: Rect) -> bool {
        if self.terrain_collides(area) {
            return true;
        }
        let actor_hit = self
            .actors
            .iter()
            .any(|a| a.id != entity && a.area().intersects(&area));
        actor_hit
            || self
                .blocks
                .values()
                .any(|b| b.id() != entity && b.footprint().intersects(&area))
    }

    fn players(&self) -> Vec<EntityId> {
        self.actors.iter().filter(|a| a.is_player()).map(|a| a.id).collect()
    }
}

impl ListenerRegistry for Zone {
    fn add_movement_listener(&mut self, id: EntityId) {
        if !self.movement_listeners.contains(&id) {
            self.movement_listeners.push(id);
        }
    }

    fn remove_movement_listener(&mut self, id: EntityId) {
        self.movement_listeners.retain(|&l| l != id);
    }

    fn add_zone_enter_exit_listener(&mut self, id: EntityId) {
        if !self.enter_exit_listeners.contains(&id) {
            self.enter_exit_listeners.push(id);
        }
    }

    fn remove_zone_enter_exit_listener(&mut self, id: EntityId) {
        self.enter_exit_listeners.retain(|&l| l != id);
    }
}
