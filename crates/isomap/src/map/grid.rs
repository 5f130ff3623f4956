use std::collections::{BTreeSet, HashMap};
use std::ops::{Add, Sub};

use super::face::Face;
use super::square::{MapSquare, NUM_FLOORS, NUM_LAYERS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

impl GridPos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl Add for GridPos {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for GridPos {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangedSquares {
    positions: BTreeSet<GridPos>,
}

impl ChangedSquares {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, pos: GridPos) -> bool {
        self.positions.insert(pos)
    }

    pub fn contains(&self, pos: GridPos) -> bool {
        self.positions.contains(&pos)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = GridPos> + '_ {
        self.positions.iter().copied()
    }

    pub fn to_view(&self, scroll_offset: GridPos) -> BTreeSet<GridPos> {
        self.positions.iter().map(|pos| *pos - scroll_offset).collect()
    }
}

impl FromIterator<GridPos> for ChangedSquares {
    fn from_iter<I: IntoIterator<Item = GridPos>>(iter: I) -> Self {
        Self {
            positions: iter.into_iter().collect(),
        }
    }
}

/// The map square store.
///
/// Squares are kept under absolute coordinates so scrolling only moves the
/// view origin. Every accessor that takes `x, y` works in view coordinates,
/// `0..width` by `0..height`.
#[derive(Debug, Clone, Default)]
pub struct MapGrid {
    width: i32,
    height: i32,
    origin: GridPos,
    squares: HashMap<GridPos, MapSquare>,
    dirty: BTreeSet<GridPos>,
}

impl MapGrid {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width: width.max(0),
            height: height.max(0),
            ..Self::default()
        }
    }

    pub fn reset(&mut self, width: i32, height: i32) {
        *self = Self::new(width, height);
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn set_view_size(&mut self, width: i32, height: i32) {
        self.width = width.max(0);
        self.height = height.max(0);
    }

    pub fn scroll_offset(&self) -> GridPos {
        self.origin
    }

    pub fn in_view(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.width && y < self.height
    }

    pub fn square_at(&self, x: i32, y: i32) -> Option<&MapSquare> {
        if !self.in_view(x, y) {
            return None;
        }
        self.squares.get(&(GridPos::new(x, y) + self.origin))
    }

    pub fn square_if_not_dirty(&self, x: i32, y: i32) -> Option<&MapSquare> {
        if self.is_dirty(x, y) {
            return None;
        }
        self.square_at(x, y)
    }

    pub fn is_dirty(&self, x: i32, y: i32) -> bool {
        self.dirty.contains(&(GridPos::new(x, y) + self.origin))
    }

    pub fn face_at(&self, square: &MapSquare, layer: usize) -> Option<Face> {
        square.face(layer)
    }

    pub fn darkness_at(&self, square: &MapSquare, floor: usize) -> u8 {
        square.darkness(floor)
    }

    pub fn is_fog(&self, square: &MapSquare, floor: usize) -> bool {
        square.is_fog(floor)
    }

    pub fn set_face(&mut self, x: i32, y: i32, layer: usize, face: Option<Face>) -> bool {
        if !self.in_view(x, y) || layer >= NUM_LAYERS {
            return false;
        }
        let pos = GridPos::new(x, y) + self.origin;
        let changed = match self.squares.get_mut(&pos) {
            Some(square) => square.set_face(layer, face),
            None if face.is_some() => self.squares.entry(pos).or_default().set_face(layer, face),
            None => false,
        };
        if changed {
            self.dirty.insert(pos);
        }
        changed
    }

    pub fn set_darkness(&mut self, x: i32, y: i32, floor: usize, darkness: u8) -> bool {
        if !self.in_view(x, y) || floor >= NUM_FLOORS {
            return false;
        }
        let pos = GridPos::new(x, y) + self.origin;
        let discovered = !self.squares.contains_key(&pos);
        let changed = self
            .squares
            .entry(pos)
            .or_default()
            .set_darkness(floor, darkness);
        if changed || discovered {
            self.dirty.insert(pos);
        }
        changed || discovered
    }

    pub fn clear_square(&mut self, x: i32, y: i32, floor: usize) -> bool {
        if !self.in_view(x, y) {
            return false;
        }
        let pos = GridPos::new(x, y) + self.origin;
        let changed = self
            .squares
            .get_mut(&pos)
            .is_some_and(|square| square.clear(floor));
        if changed {
            self.dirty.insert(pos);
        }
        changed
    }

    pub fn scroll(&mut self, dx: i32, dy: i32) {
        let old_origin = self.origin;
        let new_origin = old_origin + GridPos::new(dx, dy);
        let (width, height) = (self.width, self.height);
        let visible_from = |origin: GridPos, pos: GridPos| {
            let view = pos - origin;
            view.x >= 0 && view.y >= 0 && view.x < width && view.y < height
        };
        for (pos, square) in &mut self.squares {
            if visible_from(old_origin, *pos) && !visible_from(new_origin, *pos) {
                square.fog_all_floors();
            }
        }
        self.origin = new_origin;
    }

    pub fn dirty_squares(&self) -> ChangedSquares {
        self.dirty.iter().copied().collect()
    }

    pub fn clear_dirty(&mut self, redrawn: &ChangedSquares) {
        for pos in redrawn.iter() {
            self.dirty.remove(&pos);
        }
    }

    pub fn take_dirty(&mut self) -> ChangedSquares {
        ChangedSquares {
            positions: std::mem::take(&mut self.dirty),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_view_or_undiscovered_squares_are_absent() {
        let mut grid = MapGrid::new(4, 3);
        assert!(grid.square_at(0, 0).is_none());
        assert!(grid.set_face(1, 1, 9, Some(Face::new(5))));
        assert!(grid.square_at(1, 1).is_some());
        assert!(grid.square_at(-1, 0).is_none());
        assert!(grid.square_at(4, 0).is_none());
        assert!(!grid.set_face(4, 0, 9, Some(Face::new(5))));
    }

    #[test]
    fn removing_a_face_from_an_undiscovered_square_does_nothing() {
        let mut grid = MapGrid::new(4, 4);
        assert!(!grid.set_face(2, 2, 0, None));
        assert!(grid.dirty_squares().is_empty());
    }

    #[test]
    fn changes_mark_absolute_positions_dirty() {
        let mut grid = MapGrid::new(5, 5);
        grid.scroll(2, 1);
        assert!(grid.set_face(0, 0, 9, Some(Face::new(1))));
        assert!(grid.is_dirty(0, 0));
        assert!(grid.square_if_not_dirty(0, 0).is_none());

        let dirty = grid.dirty_squares();
        assert!(dirty.contains(GridPos::new(2, 1)));
        assert_eq!(
            dirty.to_view(grid.scroll_offset()).into_iter().collect::<Vec<_>>(),
            vec![GridPos::new(0, 0)]
        );

        grid.clear_dirty(&dirty);
        assert!(grid.square_if_not_dirty(0, 0).is_some());
    }

    #[test]
    fn out_of_range_layer_or_floor_discovers_nothing() {
        let mut grid = MapGrid::new(3, 3);
        assert!(!grid.set_face(1, 1, NUM_LAYERS, Some(Face::new(5))));
        assert!(!grid.set_darkness(1, 1, NUM_FLOORS, 90));
        assert!(grid.square_at(1, 1).is_none());
        assert!(grid.dirty_squares().is_empty());
    }

    #[test]
    fn unchanged_face_does_not_dirty() {
        let mut grid = MapGrid::new(3, 3);
        grid.set_face(1, 1, 9, Some(Face::new(3)));
        grid.take_dirty();
        assert!(!grid.set_face(1, 1, 9, Some(Face::new(3))));
        assert!(grid.take_dirty().is_empty());
    }

    #[test]
    fn darkness_discovers_empty_square() {
        let mut grid = MapGrid::new(3, 3);
        assert!(grid.set_darkness(2, 2, 3, 255));
        let square = grid.square_at(2, 2).expect("discovered");
        assert!(!square.has_faces());
        assert_eq!(grid.darkness_at(square, 3), 255);
        assert_eq!(grid.take_dirty().len(), 1);
        assert!(!grid.set_darkness(2, 2, 3, 255));
    }

    #[test]
    fn scrolling_fogs_squares_leaving_the_view() {
        let mut grid = MapGrid::new(3, 3);
        grid.set_face(0, 0, 9, Some(Face::new(1)));
        grid.set_face(2, 2, 9, Some(Face::new(2)));
        grid.scroll(1, 0);

        assert!(grid.square_at(1, 2).is_some_and(|square| !square.is_fog(3)));
        grid.scroll(-1, 0);
        let returned = grid.square_at(0, 0).expect("remembered");
        assert!(grid.is_fog(returned, 3));
        assert_eq!(grid.face_at(returned, 9), Some(Face::new(1)));
    }

    #[test]
    fn clear_square_marks_dirty_only_when_fog_changes() {
        let mut grid = MapGrid::new(3, 3);
        assert!(!grid.clear_square(1, 1, 3));
        grid.set_face(1, 1, 9, Some(Face::new(1)));
        grid.take_dirty();
        assert!(grid.clear_square(1, 1, 3));
        assert!(!grid.clear_square(1, 1, 3));
        assert_eq!(grid.take_dirty().len(), 1);
    }

    #[test]
    fn reset_drops_everything() {
        let mut grid = MapGrid::new(3, 3);
        grid.scroll(4, 4);
        grid.set_face(1, 1, 9, Some(Face::new(1)));
        grid.reset(6, 5);
        assert_eq!((grid.width(), grid.height()), (6, 5));
        assert_eq!(grid.scroll_offset(), GridPos::default());
        assert!(grid.square_at(1, 1).is_none());
        assert!(grid.dirty_squares().is_empty());
    }
}
