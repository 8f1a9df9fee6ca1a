/// Driver commands, one per input line.
///
///   w/a/s/d [id]   move a player (default: first player in the zone)
///   leave <id>     entity walks out of the zone
///   reset <id>     put a block back on its origin
///   open/close <id>  chest lid of a block
///   wait [turns]   advance the turn clock (default 1)
///   show           print the zone map
///   zone [name]    list loaded zones, or switch to one
///   quit

use crate::domain::direction::Direction;
use crate::domain::entity::EntityId;

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Command {
    Move { dir: Direction, who: Option<EntityId> },
    Leave(EntityId),
    Reset(EntityId),
    Open(EntityId),
    Close(EntityId),
    Wait(u64),
    Show,
    Zone(Option<String>),
    Quit,
}

pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let mut words = line.split_whitespace();
    let head = match words.next() {
        Some(w) => w.to_ascii_lowercase(),
        None => return Ok(None),
    };
    let arg = words.next();

    let cmd = match head.as_str() {
        "w" | "up" => Command::Move { dir: Direction::Up, who: opt_id(arg)? },
        "a" | "left" => Command::Move { dir: Direction::Left, who: opt_id(arg)? },
        "s" | "down" => Command::Move { dir: Direction::Down, who: opt_id(arg)? },
        "d" | "right" => Command::Move { dir: Direction::Right, who: opt_id(arg)? },
        "leave" => Command::Leave(req_id(arg)?),
        "reset" => Command::Reset(req_id(arg)?),
        "open" => Command::Open(req_id(arg)?),
        "close" => Command::Close(req_id(arg)?),
        "wait" => match arg {
            Some(n) => Command::Wait(n.parse().map_err(|_| format!("bad turn count `{n}`"))?),
            None => Command::Wait(1),
        },
        "show" => Command::Show,
        "zone" => Command::Zone(arg.map(str::to_string)),
        "quit" | "q" | "exit" => Command::Quit,
        other => return Err(format!("unknown command `{other}`")),
    };
    Ok(Some(cmd))
}

fn opt_id(arg: Option<&str>) -> Result<Option<EntityId>, String> {
    arg.map(parse_id).transpose()
}

fn req_id(arg: Option<&str>) -> Result<EntityId, String> {
    parse_id(arg.ok_or_else(|| "missing entity id".to_string())?)
}

/// Accepts `7` or `#7`.
fn parse_id(s: &str) -> Result<EntityId, String> {
    s.trim_start_matches('#')
        .parse()
        .map(EntityId)
        .map_err(|_| format!("bad entity id `{s}`"))
}
