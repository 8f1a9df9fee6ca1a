/// Presentation layer: colored zone map and event log on stdout.
///
/// Works line by line (no alternate screen): the driver is a command
/// console, so each `show` prints a fresh picture below the prompt.
/// All commands are batched with `queue!` and flushed once per call.

use std::io::{self, Write};

use crossterm::{
    queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
};

use crate::sim::event::ZoneEvent;
use crate::sim::listener::ZoneQuery;
use crate::sim::zone::Zone;

fn glyph_color(ch: char) -> Color {
    match ch {
        '#' => Color::DarkGrey,
        '~' => Color::Blue,
        '.' => Color::Rgb { r: 60, g: 60, b: 70 },
        '@' => Color::Yellow,
        'n' => Color::Cyan,
        'O' => Color::Grey,
        'B' | 'b' => Color::Rgb { r: 190, g: 130, b: 60 },
        'R' | 'r' => Color::Green,
        _ => Color::White,
    }
}

/// Print the zone with a header line and a legend of block states.
pub fn print_zone<W: Write>(out: &mut W, zone: &Zone, turn: u64) -> io::Result<()> {
    queue!(out, SetForegroundColor(Color::White), Print(format!("── {} · turn {turn} ──\n", zone.name())))?;

    for line in zone.to_map_string().lines() {
        let mut last: Option<Color> = None;
        for ch in line.chars() {
            let color = glyph_color(ch);
            if last != Some(color) {
                queue!(out, SetForegroundColor(color))?;
                last = Some(color);
            }
            queue!(out, Print(ch))?;
        }
        queue!(out, ResetColor, Print("\n"))?;
    }

    for b in zone.blocks() {
        let (x, y) = b.position();
        let origin = b.origin().map_or("-".to_string(), |(ox, oy)| format!("({ox},{oy})"));
        queue!(
            out,
            Print(format!("  block {} at ({x},{y}) origin {origin} {:?}\n", b.id(), b.state()))
        )?;
    }
    for a in zone.actors() {
        queue!(out, Print(format!("  {:?} {} at ({},{})\n", a.kind, a.id, a.x, a.y)))?;
    }
    out.flush()
}

/// One human-readable line per event, sounds excluded.
pub fn describe(event: &ZoneEvent) -> Option<String> {
    let s = match event {
        ZoneEvent::BlockPushed { id, x, y } => format!("block {id} pushed to ({x},{y})"),
        ZoneEvent::BlockReset { id, x, y } => format!("block {id} back at ({x},{y})"),
        ZoneEvent::ResetDeferred { id, retry_turn } => {
            format!("block {id} cannot go home yet, retry on turn {retry_turn}")
        }
        ZoneEvent::EntityLeft { id } => format!("{id} left the zone"),
        ZoneEvent::Sound { source, sound, .. } => format!("{source} plays `{sound}`"),
        ZoneEvent::EntityMoved { .. } | ZoneEvent::WorldChanged { .. } => return None,
    };
    Some(s)
}

pub fn print_events<W: Write>(out: &mut W, events: &[ZoneEvent]) -> io::Result<()> {
    for line in events.iter().filter_map(describe) {
        queue!(out, SetForegroundColor(Color::DarkYellow), Print("  » "), ResetColor, Print(line), Print("\n"))?;
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::EntityId;

    #[test]
    fn describes_block_events() {
        let e = ZoneEvent::BlockPushed { id: EntityId(4), x: 6, y: 5 };
        assert_eq!(describe(&e).unwrap(), "block #4 pushed to (6,5)");
        assert!(describe(&ZoneEvent::WorldChanged { id: EntityId(4) }).is_none());
    }

    #[test]
    fn zone_print_contains_map_rows() {
        let zone = Zone::new("plain", 3, 2);
        let mut out = Vec::new();
        print_zone(&mut out, &zone, 7).unwrap();
        let text = String::from_utf8_lossy(&out);
        assert!(text.contains("plain · turn 7"));
        assert!(text.contains('.'));
    }
}
