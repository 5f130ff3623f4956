use crate::map::GridPos;

/// Index of one diamond on the screen lattice. A face image drawn for
/// diamond `(sx, sy)` has its top-left corner at `offset + s * tile_size`
/// and spans two tiles in each direction, so neighbouring diamonds overlap
/// by one quadrant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ScreenPos {
    pub x: i32,
    pub y: i32,
}

impl ScreenPos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Quadrant {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Quadrant {
    pub const ALL: [Quadrant; 4] = [
        Quadrant::TopLeft,
        Quadrant::TopRight,
        Quadrant::BottomLeft,
        Quadrant::BottomRight,
    ];

    pub const fn cell_offset(self) -> (i32, i32) {
        match self {
            Quadrant::TopLeft => (0, 0),
            Quadrant::TopRight => (1, 0),
            Quadrant::BottomLeft => (0, 1),
            Quadrant::BottomRight => (1, 1),
        }
    }
}

pub const fn quadrant_cell(origin: ScreenPos, quadrant: Quadrant) -> ScreenPos {
    let (dx, dy) = quadrant.cell_offset();
    origin.offset(dx, dy)
}

/// The 45 degree diamond projection between grid squares and screen
/// diamonds: `sx = gx + gy + c1`, `sy = gy - gx + c2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Projection {
    pub c1: i32,
    pub c2: i32,
}

impl Projection {
    pub const fn new(c1: i32, c2: i32) -> Self {
        Self { c1, c2 }
    }

    pub const fn grid_to_screen(&self, grid: GridPos) -> ScreenPos {
        ScreenPos::new(grid.x + grid.y + self.c1, grid.y - grid.x + self.c2)
    }

    pub const fn is_on_lattice(&self, screen: ScreenPos) -> bool {
        (screen.x + screen.y - self.c1 - self.c2).rem_euclid(2) == 0
    }

    pub const fn screen_to_grid(&self, screen: ScreenPos) -> Option<GridPos> {
        if !self.is_on_lattice(screen) {
            return None;
        }
        let sum = screen.x - self.c1;
        let diff = screen.y - self.c2;
        Some(GridPos::new(
            (sum - diff).div_euclid(2),
            (sum + diff).div_euclid(2),
        ))
    }
}

/// Whether pixel `(x, y)` of a `2 * tile` face image lies inside its diamond.
///
/// Quarter by quarter this is the complement of what the neighbouring
/// diamonds own, so the lattice tiles the plane without gaps or overlap.
pub const fn diamond_contains(tile: i32, x: i32, y: i32) -> bool {
    if x < 0 || y < 0 || x >= 2 * tile || y >= 2 * tile {
        return false;
    }
    let (right, bottom) = (x >= tile, y >= tile);
    let local_x = if right { x - tile } else { x };
    let local_y = if bottom { y - tile } else { y };
    match (right, bottom) {
        (false, false) => local_x + local_y >= tile,
        (true, false) => local_x <= local_y,
        (false, true) => local_x > local_y,
        (true, true) => local_x + local_y < tile,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelPos {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenLayout {
    pub projection: Projection,
    pub tile_size: i32,
    pub offset_x: i32,
    pub offset_y: i32,
}

impl ScreenLayout {
    pub const fn tile_full_size(&self) -> i32 {
        self.tile_size * 2
    }

    pub const fn pixel_origin(&self, screen: ScreenPos) -> PixelPos {
        PixelPos {
            x: self.offset_x + screen.x * self.tile_size,
            y: self.offset_y + screen.y * self.tile_size,
        }
    }

    pub fn screen_cell_at(&self, x: i32, y: i32) -> ScreenPos {
        let tile = self.tile_size.max(1);
        ScreenPos::new(
            (x - self.offset_x).div_euclid(tile),
            (y - self.offset_y).div_euclid(tile),
        )
    }

    pub fn pixel_to_grid(&self, x: i32, y: i32) -> Option<GridPos> {
        let tile = self.tile_size.max(1);
        let cell = self.screen_cell_at(x, y);
        let local_x = (x - self.offset_x).rem_euclid(tile);
        let local_y = (y - self.offset_y).rem_euclid(tile);
        let owner = if self.projection.is_on_lattice(cell) {
            // Top-left quarter of `cell`, or bottom-right quarter of the
            // diamond up-left of it.
            if local_x + local_y >= tile {
                cell
            } else {
                cell.offset(-1, -1)
            }
        } else if local_x <= local_y {
            cell.offset(-1, 0)
        } else {
            cell.offset(0, -1)
        };
        self.projection.screen_to_grid(owner)
    }
}
