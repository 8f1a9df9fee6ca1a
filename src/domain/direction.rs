/// Grid directions and axis-aligned footprints.
///
/// Coordinates grow right (x) and down (y), matching the zone grid:
/// `Up` is `dy = -1`, `Down` is `dy = +1`.

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Direction {
    Stop,
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    /// The four moving directions, in tie-break priority order.
    pub const CARDINALS: [Direction; 4] =
        [Direction::Right, Direction::Left, Direction::Down, Direction::Up];

    pub fn dx(self) -> i32 {
        match self {
            Direction::Left => -1,
            Direction::Right => 1,
            _ => 0,
        }
    }

    pub fn dy(self) -> i32 {
        match self {
            Direction::Up => -1,
            Direction::Down => 1,
            _ => 0,
        }
    }

    /// Does moving this way change position at all?
    pub fn is_moving(self) -> bool {
        self != Direction::Stop
    }

    /// Infer the cardinal direction that best explains the move from
    /// area `from` to area `to`.
    ///
    /// Displacement is measured between the rectangle centers (doubled, so
    /// odd sizes stay integral). The axis with the larger displacement wins;
    /// equal non-zero displacement resolves horizontally. No displacement
    /// yields `Stop`.
    pub fn towards_area(from: Rect, to: Rect) -> Direction {
        let (fx, fy) = from.center2();
        let (tx, ty) = to.center2();
        let dx = tx - fx;
        let dy = ty - fy;

        if dx == 0 && dy == 0 {
            return Direction::Stop;
        }
        if dx.abs() >= dy.abs() {
            if dx > 0 { Direction::Right } else { Direction::Left }
        } else if dy > 0 {
            Direction::Down
        } else {
            Direction::Up
        }
    }
}

/// Axis-aligned footprint on the grid, in cells.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Rect { x, y, width, height }
    }

    /// Same size, moved by `dir`.
    pub fn shifted(self, dir: Direction) -> Rect {
        Rect { x: self.x + dir.dx(), y: self.y + dir.dy(), ..self }
    }

    /// Same size, placed at `(x, y)`.
    pub fn at(self, x: i32, y: i32) -> Rect {
        Rect { x, y, ..self }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }

    /// Twice the center point.
    fn center2(&self) -> (i32, i32) {
        (2 * self.x + self.width as i32, 2 * self.y + self.height as i32)
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Every cell covered by this footprint, row by row.
    pub fn cells(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        (self.y..self.bottom()).flat_map(move |y| (self.x..self.right()).map(move |x| (x, y)))
    }
}
