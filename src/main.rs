/// Entry point: a command console driving one world.
///
/// Usage: `pushblock [zone-file.txt]`
///
/// Without a file, zones come from the configured `zones/` directory, or
/// the built-in courtyard if that is empty. Commands are read from stdin,
/// one per line (see `ui::input`); they act on the first zone loaded until
/// `zone <name>` switches.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use pushblock::config::GameConfig;
use pushblock::domain::chest::Openable;
use pushblock::domain::entity::EntityId;
use pushblock::error::ZoneError;
use pushblock::sim::event::ZoneEvent;
use pushblock::sim::level::{self, ZoneDef};
use pushblock::sim::listener::ZoneQuery;
use pushblock::sim::world::World;
use pushblock::ui::input::{parse_command, Command};
use pushblock::ui::logger;
use pushblock::ui::renderer::{print_events, print_zone};
use pushblock::ui::sound::{process_sound_events, SoundEngine};

fn main() {
    logger::init();
    let config = GameConfig::load();

    let defs = match zone_defs(&config) {
        Ok(defs) => defs,
        Err(e) => {
            eprintln!("Zone load failed: {e}");
            return;
        }
    };

    let mut world = World::new(&config.turns);
    let mut events = Vec::new();
    for def in &defs {
        if let Err(e) = level::load_zone(&mut world, def, &config.sound.push_sounds, &mut events) {
            eprintln!("Zone {} failed: {e}", def.name);
            return;
        }
    }
    let first = defs[0].name.clone();

    let sound = if config.sound.enabled { SoundEngine::new() } else { None };

    if let Err(e) = console(&mut world, first, sound.as_ref()) {
        eprintln!("Console error: {e}");
    }
}

/// Zone list: CLI file, then zones dir, then the embedded courtyard.
fn zone_defs(config: &GameConfig) -> Result<Vec<ZoneDef>, ZoneError> {
    if let Some(path) = std::env::args().nth(1).map(PathBuf::from) {
        let defs = level::load_zone_file(&path)?;
        if defs.is_empty() {
            return Err(ZoneError::MapParse { line: 1, message: format!("no zones in {}", path.display()) });
        }
        return Ok(defs);
    }
    let defs = level::load_from_directory(&config.zones_dir);
    if defs.is_empty() {
        return Ok(vec![level::embedded_zone()]);
    }
    Ok(defs)
}

/// Command loop. `active` is the zone the commands act on.
fn console(world: &mut World, mut active: String, sound: Option<&SoundEngine>) -> Result<(), Box<dyn std::error::Error>> {
    let stdin = io::stdin();
    let mut out = io::stdout();

    print_zone(&mut out, world.zone(&active)?, world.current_turn())?;
    write!(out, "> ")?;
    out.flush()?;

    for line in stdin.lock().lines() {
        let line = line?;
        match parse_command(&line) {
            Ok(Some(Command::Quit)) => break,
            Ok(Some(Command::Zone(None))) => {
                for name in world.zone_names() {
                    let mark = if name == active { '*' } else { ' ' };
                    writeln!(out, "  {mark} {name}")?;
                }
            }
            Ok(Some(Command::Zone(Some(name)))) => match world.zone(&name) {
                Ok(zone) => {
                    print_zone(&mut out, zone, world.current_turn())?;
                    active = name;
                }
                Err(e) => writeln!(out, "  ! {e}")?,
            },
            Ok(Some(cmd)) => {
                let show = cmd == Command::Show;
                match execute(world, &active, cmd) {
                    Ok(events) => {
                        print_events(&mut out, &events)?;
                        process_sound_events(sound, &events);
                        if show {
                            print_zone(&mut out, world.zone(&active)?, world.current_turn())?;
                        }
                    }
                    Err(e) => writeln!(out, "  ! {e}")?,
                }
            }
            Ok(None) => {}
            Err(msg) => writeln!(out, "  ? {msg}")?,
        }
        write!(out, "> ")?;
        out.flush()?;
    }
    Ok(())
}

fn execute(world: &mut World, zone: &str, cmd: Command) -> Result<Vec<ZoneEvent>, ZoneError> {
    let mut events = Vec::new();
    match cmd {
        Command::Move { dir, who } => {
            let id = match who {
                Some(id) => id,
                None => first_player(world, zone)?,
            };
            if !world.move_actor(zone, id, dir, &mut events)? {
                tracing::info!("{id} blocked moving {dir:?}");
            }
        }
        Command::Leave(id) => {
            world.remove(zone, id, &mut events)?;
        }
        Command::Reset(id) => world.reset_block(zone, id, &mut events)?,
        Command::Open(id) => lid(world, zone, id)?.open(),
        Command::Close(id) => lid(world, zone, id)?.close(),
        Command::Wait(turns) => events = world.run(turns),
        Command::Show | Command::Zone(_) | Command::Quit => {}
    }
    Ok(events)
}

fn lid<'w>(world: &'w mut World, zone: &str, id: EntityId) -> Result<&'w mut dyn Openable, ZoneError> {
    let block = world.zone_mut(zone)?.block_mut(id).ok_or(ZoneError::UnknownEntity(id))?;
    Ok(block.container_mut())
}

fn first_player(world: &World, zone: &str) -> Result<EntityId, ZoneError> {
    world
        .zone(zone)?
        .players()
        .first()
        .copied()
        .ok_or_else(|| ZoneError::NoPlayers(zone.to_string()))
}
