/// Zone map loader.
///
/// ## Sources (priority order):
///   1. An explicit file path
///   2. `zones/` directory (individual `.txt` files, sorted by name)
///   3. Built-in embedded zone
///
/// ## File format (`.txt`):
///   ```text
///   zone: cellar
///   ##########
///   #..@.B...#
///   ##########
///   ---
///   zone: attic
///   ...
///   ```
///
/// One file may hold several zones separated by a line containing only
/// `---`. Each zone starts with a `zone: <name>` header. Short rows are
/// padded with floor.
///
/// ## Legend:
///   '#' = Wall        '~' = Water        '.' or ' ' = Floor
///   '@' = Player      'n' = NPC          'O' = Obstacle
///   'B' = Block       'b' = One-shot block
///   'R' = Block, returns home    'r' = One-shot block, returns home
///   'C' = Chest block (lid open)

use std::path::Path;

use crate::domain::entity::EntityKind;
use crate::domain::tile::Tile;
use crate::error::{Result, ZoneError};
use super::event::{SoundId, ZoneEvent};
use super::world::{BlockSpec, World};
use super::zone::Zone;

/// A zone map as read from text, before anything is placed.
#[derive(Clone, Debug, PartialEq)]
pub struct ZoneDef {
    pub name: String,
    pub rows: Vec<String>,
    /// Line number of the first map row, for error messages.
    pub first_line: usize,
}

/// Placement read from one map character.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Glyph {
    Terrain(Tile),
    Actor(EntityKind),
    Block { repeatable: bool, auto_reset: bool, open_chest: bool },
}

fn glyph(ch: char) -> Option<Glyph> {
    let g = match ch {
        '#' => Glyph::Terrain(Tile::Wall),
        '~' => Glyph::Terrain(Tile::Water),
        '.' | ' ' => Glyph::Terrain(Tile::Floor),
        '@' => Glyph::Actor(EntityKind::Player),
        'n' => Glyph::Actor(EntityKind::Npc),
        'O' => Glyph::Actor(EntityKind::Obstacle),
        'B' => Glyph::Block { repeatable: true, auto_reset: false, open_chest: false },
        'b' => Glyph::Block { repeatable: false, auto_reset: false, open_chest: false },
        'R' => Glyph::Block { repeatable: true, auto_reset: true, open_chest: false },
        'r' => Glyph::Block { repeatable: false, auto_reset: true, open_chest: false },
        'C' => Glyph::Block { repeatable: true, auto_reset: false, open_chest: true },
        _ => return None,
    };
    Some(g)
}

// ══════════════════════════════════════════════════════════════
// Parsing
// ══════════════════════════════════════════════════════════════

pub fn parse_zones(content: &str) -> Result<Vec<ZoneDef>> {
    let mut defs = vec![];
    let mut current: Option<ZoneDef> = None;

    for (idx, line) in content.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = line.trim_end();

        if trimmed == "---" {
            if let Some(def) = current.take() {
                defs.push(finish(def)?);
            }
            continue;
        }
        if let Some(name) = trimmed.strip_prefix("zone:") {
            if let Some(def) = current.take() {
                defs.push(finish(def)?);
            }
            let name = name.trim();
            if name.is_empty() {
                return Err(ZoneError::MapParse { line: line_no, message: "empty zone name".into() });
            }
            current = Some(ZoneDef { name: name.to_string(), rows: vec![], first_line: line_no + 1 });
            continue;
        }

        match current.as_mut() {
            Some(def) => def.rows.push(trimmed.to_string()),
            None if trimmed.is_empty() => {}
            None => {
                return Err(ZoneError::MapParse {
                    line: line_no,
                    message: "map row before `zone:` header".into(),
                })
            }
        }
    }
    if let Some(def) = current.take() {
        defs.push(finish(def)?);
    }
    Ok(defs)
}

/// Trim trailing blank rows, pad short rows, validate glyphs.
fn finish(mut def: ZoneDef) -> Result<ZoneDef> {
    while def.rows.last().map_or(false, |r| r.trim().is_empty()) {
        def.rows.pop();
    }
    if def.rows.is_empty() {
        return Err(ZoneError::MapParse {
            line: def.first_line,
            message: format!("zone `{}` has no map rows", def.name),
        });
    }
    for (i, row) in def.rows.iter().enumerate() {
        if let Some(bad) = row.chars().find(|&c| glyph(c).is_none()) {
            return Err(ZoneError::MapParse {
                line: def.first_line + i,
                message: format!("unknown map character `{bad}`"),
            });
        }
    }
    let max_width = def.rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
    for row in def.rows.iter_mut() {
        let len = row.chars().count();
        row.extend(std::iter::repeat('.').take(max_width - len));
    }
    Ok(def)
}

// ══════════════════════════════════════════════════════════════
// Building
// ══════════════════════════════════════════════════════════════

/// Create the zone in `world` and place everything the map shows.
/// Blocks get `push_sounds` as their sound set.
pub fn load_zone(
    world: &mut World,
    def: &ZoneDef,
    push_sounds: &[SoundId],
    events: &mut Vec<ZoneEvent>,
) -> Result<()> {
    let mut tiles = vec![];
    let mut placements = vec![];

    for (y, row) in def.rows.iter().enumerate() {
        let mut tile_row = vec![];
        for (x, ch) in row.chars().enumerate() {
            match glyph(ch) {
                Some(Glyph::Terrain(t)) => tile_row.push(t),
                Some(g) => {
                    tile_row.push(Tile::Floor);
                    placements.push((x as i32, y as i32, g));
                }
                None => {
                    return Err(ZoneError::MapParse {
                        line: def.first_line + y,
                        message: format!("unknown map character `{ch}`"),
                    })
                }
            }
        }
        tiles.push(tile_row);
    }

    world.add_zone(Zone::from_tiles(&def.name, tiles));

    for (x, y, g) in placements {
        match g {
            Glyph::Actor(kind) => {
                world.spawn_actor(&def.name, kind, x, y, events)?;
            }
            Glyph::Block { repeatable, auto_reset, open_chest } => {
                let mut spec = BlockSpec::new(x, y, repeatable)
                    .auto_reset(auto_reset)
                    .sounds(push_sounds.to_vec());
                if open_chest {
                    spec = spec.chest(true);
                }
                world.spawn_block(&def.name, &spec, events)?;
            }
            Glyph::Terrain(_) => {}
        }
    }
    tracing::info!("zone {} loaded ({}x{})", def.name, def.rows[0].chars().count(), def.rows.len());
    Ok(())
}

pub fn load_zone_file(path: &Path) -> Result<Vec<ZoneDef>> {
    let content = std::fs::read_to_string(path)?;
    parse_zones(&content)
}

/// All zones from `.txt` files in `dir`, files in name order.
/// Unreadable or malformed files are skipped with a warning.
pub fn load_from_directory(dir: &Path) -> Vec<ZoneDef> {
    let mut paths: Vec<_> = match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.extension().map_or(false, |e| e == "txt"))
            .collect(),
        Err(_) => return vec![],
    };
    paths.sort();

    let mut defs = vec![];
    for path in paths {
        match load_zone_file(&path) {
            Ok(mut found) => defs.append(&mut found),
            Err(e) => tracing::warn!("skipping {}: {e}", path.display()),
        }
    }
    defs
}

pub fn embedded_zone() -> ZoneDef {
    let rows = [
        "##############",
        "#............#",
        "#..@.B....~~.#",
        "#.........~~.#",
        "#....r.......#",
        "#...O........#",
        "#.....C...n..#",
        "##############",
    ];
    ZoneDef {
        name: "courtyard".to_string(),
        rows: rows.iter().map(|r| r.to_string()).collect(),
        first_line: 1,
    }
}
