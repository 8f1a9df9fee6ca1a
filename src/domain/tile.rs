/// Terrain tile types and their properties.
/// Properties are queried via methods, not stored as flags,
/// so tile semantics are centralized here.

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Tile {
    #[default]
    Floor,
    Wall,   // Static collision
    Water,  // Static collision, not walkable either
}

impl Tile {
    /// Is this tile part of the zone's static collision layer?
    pub fn is_solid(self) -> bool {
        matches!(self, Tile::Wall | Tile::Water)
    }

    /// Map legend character.
    pub fn glyph(self) -> char {
        match self {
            Tile::Floor => '.',
            Tile::Wall => '#',
            Tile::Water => '~',
        }
    }
}
