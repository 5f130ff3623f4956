//! Neighbour analysis for one redraw pass.
//!
//! A face image is twice the lattice step, so every screen diamond receives
//! quarter tiles from up to seven neighbouring squares and hands its own
//! overlay to the diamond above it. [`DIRECTIONS`] lists those neighbours
//! together with the quarter blits they contribute; the classifier and the
//! compositor both walk this one table.

use std::collections::HashMap;

use crate::config::CoverageMode;
use crate::map::{Coverage, GridPos, MapGrid, MapSquare};

use super::transform::Quadrant;
use super::transform::Quadrant::{BottomLeft, BottomRight, TopLeft, TopRight};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DrawPass {
    Base,
    Overlay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contribution {
    pub pass: DrawPass,
    pub source: Quadrant,
    pub target: Quadrant,
    pub required: Coverage,
}

impl Contribution {
    pub const fn enabled_by(&self, coverage: Coverage) -> bool {
        self.required.is_empty() || coverage.intersects(self.required)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectionFlag {
    Left,
    Right,
    Top,
    TopLeft,
    TopRight,
    UnderLeft,
    UnderRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Direction {
    pub name: &'static str,
    pub grid_offset: GridPos,
    pub contributions: &'static [Contribution],
    pub flag: Option<DirectionFlag>,
}

pub const fn overlay_coverage(quadrant: Quadrant) -> Coverage {
    match quadrant {
        Quadrant::TopLeft | Quadrant::TopRight => Coverage::NORTHEAST,
        Quadrant::BottomLeft => Coverage::NORTH,
        Quadrant::BottomRight => Coverage::EAST,
    }
}

const fn base(source: Quadrant, target: Quadrant) -> Contribution {
    Contribution {
        pass: DrawPass::Base,
        source,
        target,
        required: Coverage::NONE,
    }
}

const fn overlay(source: Quadrant, target: Quadrant) -> Contribution {
    Contribution {
        pass: DrawPass::Overlay,
        source,
        target,
        required: overlay_coverage(source),
    }
}

pub const CENTRE: Direction = Direction {
    name: "centre",
    grid_offset: GridPos::new(0, 0),
    contributions: &[
        base(TopLeft, TopLeft),
        base(TopRight, TopRight),
        base(BottomLeft, BottomLeft),
        base(BottomRight, BottomRight),
    ],
    flag: None,
};

pub const DIRECTIONS: [Direction; 8] = [
    Direction {
        name: "north",
        grid_offset: GridPos::new(0, -1),
        contributions: &[base(BottomRight, TopLeft)],
        flag: Some(DirectionFlag::TopLeft),
    },
    Direction {
        name: "east",
        grid_offset: GridPos::new(1, 0),
        contributions: &[base(BottomLeft, TopRight)],
        flag: Some(DirectionFlag::TopRight),
    },
    Direction {
        name: "west",
        grid_offset: GridPos::new(-1, 0),
        contributions: &[base(TopRight, BottomLeft), overlay(BottomRight, TopLeft)],
        flag: Some(DirectionFlag::UnderLeft),
    },
    Direction {
        name: "south",
        grid_offset: GridPos::new(0, 1),
        contributions: &[base(TopLeft, BottomRight), overlay(BottomLeft, TopRight)],
        flag: Some(DirectionFlag::UnderRight),
    },
    Direction {
        name: "below",
        grid_offset: GridPos::new(-1, 1),
        contributions: &[
            overlay(TopLeft, TopLeft),
            overlay(TopRight, TopRight),
            overlay(BottomLeft, BottomLeft),
            overlay(BottomRight, BottomRight),
        ],
        flag: Some(DirectionFlag::Top),
    },
    Direction {
        name: "below_left",
        grid_offset: GridPos::new(-2, 1),
        contributions: &[overlay(TopRight, BottomLeft)],
        flag: Some(DirectionFlag::Left),
    },
    Direction {
        name: "below_right",
        grid_offset: GridPos::new(-1, 2),
        contributions: &[overlay(TopLeft, BottomRight)],
        flag: Some(DirectionFlag::Right),
    },
    // Receives this square's overlay; contributes nothing to it.
    Direction {
        name: "above",
        grid_offset: GridPos::new(1, -1),
        contributions: &[],
        flag: None,
    },
];

pub const ABOVE: usize = 7;

pub trait SquareSource {
    fn square(&self, pos: GridPos) -> Option<&MapSquare>;
}

impl SquareSource for MapGrid {
    fn square(&self, pos: GridPos) -> Option<&MapSquare> {
        self.square_at(pos.x, pos.y)
    }
}

/// Hides squares still waiting for their own change redraw.
#[derive(Debug, Clone, Copy)]
pub struct UnlessDirty<'a>(pub &'a MapGrid);

impl SquareSource for UnlessDirty<'_> {
    fn square(&self, pos: GridPos) -> Option<&MapSquare> {
        self.0.square_if_not_dirty(pos.x, pos.y)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassFlags {
    pub draw_left: bool,
    pub draw_right: bool,
    pub draw_top: bool,
    pub draw_top_left: bool,
    pub draw_top_right: bool,
    pub draw_under_left: bool,
    pub draw_under_right: bool,
    pub trivial: [bool; 8],
}

impl PassFlags {
    pub fn flag(&self, flag: DirectionFlag) -> bool {
        match flag {
            DirectionFlag::Left => self.draw_left,
            DirectionFlag::Right => self.draw_right,
            DirectionFlag::Top => self.draw_top,
            DirectionFlag::TopLeft => self.draw_top_left,
            DirectionFlag::TopRight => self.draw_top_right,
            DirectionFlag::UnderLeft => self.draw_under_left,
            DirectionFlag::UnderRight => self.draw_under_right,
        }
    }

    fn set_flag(&mut self, flag: DirectionFlag, value: bool) {
        let slot = match flag {
            DirectionFlag::Left => &mut self.draw_left,
            DirectionFlag::Right => &mut self.draw_right,
            DirectionFlag::Top => &mut self.draw_top,
            DirectionFlag::TopLeft => &mut self.draw_top_left,
            DirectionFlag::TopRight => &mut self.draw_top_right,
            DirectionFlag::UnderLeft => &mut self.draw_under_left,
            DirectionFlag::UnderRight => &mut self.draw_under_right,
        };
        *slot = value;
    }

    pub fn draws_from(&self, index: usize) -> bool {
        let direction = &DIRECTIONS[index];
        !self.trivial[index] && direction.flag.is_some_and(|flag| self.flag(flag))
    }
}

pub type PassFlagTable = HashMap<GridPos, PassFlags>;

pub fn square_coverage(square: &MapSquare, mode: CoverageMode) -> Coverage {
    match mode {
        // Empty squares never restrict drawing either.
        CoverageMode::Full => Coverage::ALL,
        CoverageMode::Partial => square
            .faces()
            .fold(Coverage::NONE, |acc, (_, face)| acc.union(face.coverage)),
    }
}

pub fn face_coverage(coverage: Coverage, mode: CoverageMode) -> Coverage {
    match mode {
        CoverageMode::Full => Coverage::ALL,
        CoverageMode::Partial => coverage,
    }
}

pub fn classify(source: &impl SquareSource, target: GridPos, mode: CoverageMode) -> PassFlags {
    let mut flags = PassFlags::default();
    for (index, direction) in DIRECTIONS.iter().enumerate() {
        let neighbour = source
            .square(target + direction.grid_offset)
            .filter(|square| square.has_faces());
        flags.trivial[index] = neighbour.is_none();
        let (Some(square), Some(flag)) = (neighbour, direction.flag) else {
            continue;
        };
        let covered = square_coverage(square, mode);
        let reaches = direction
            .contributions
            .iter()
            .any(|contribution| contribution.enabled_by(covered));
        flags.set_flag(flag, reaches);
    }
    flags
}

pub fn classify_all(
    source: &impl SquareSource,
    targets: impl IntoIterator<Item = GridPos>,
    mode: CoverageMode,
) -> PassFlagTable {
    targets
        .into_iter()
        .map(|target| (target, classify(source, target, mode)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::Face;
    use crate::render::transform::{quadrant_cell, Projection};

    #[test]
    fn table_contributions_land_on_the_target_tile() {
        let projection = Projection::new(0, 0);
        let target = GridPos::new(4, 7);
        let target_screen = projection.grid_to_screen(target);
        for direction in DIRECTIONS.iter().chain(std::iter::once(&CENTRE)) {
            let neighbour_screen = projection.grid_to_screen(target + direction.grid_offset);
            for contribution in direction.contributions {
                let origin = match contribution.pass {
                    DrawPass::Base => neighbour_screen,
                    DrawPass::Overlay => neighbour_screen.offset(0, -2),
                };
                assert_eq!(
                    quadrant_cell(origin, contribution.source),
                    quadrant_cell(target_screen, contribution.target),
                    "{}",
                    direction.name
                );
            }
        }
        let above = projection.grid_to_screen(target + DIRECTIONS[ABOVE].grid_offset);
        assert_eq!(above, target_screen.offset(0, -2));
    }

    #[test]
    fn every_covering_quarter_is_listed_once() {
        let mut seen = Vec::new();
        for direction in DIRECTIONS.iter().chain(std::iter::once(&CENTRE)) {
            for contribution in direction.contributions {
                seen.push((contribution.pass, contribution.target, direction.name));
            }
        }
        for pass in [DrawPass::Base, DrawPass::Overlay] {
            for quadrant in Quadrant::ALL {
                let count = seen
                    .iter()
                    .filter(|(p, q, _)| *p == pass && *q == quadrant)
                    .count();
                assert_eq!(count, 2, "{pass:?} {quadrant:?}");
            }
        }
    }

    fn grid_with(faces: &[(i32, i32, Face)]) -> MapGrid {
        let mut grid = MapGrid::new(10, 10);
        for (x, y, face) in faces {
            grid.set_face(*x, *y, 9, Some(*face));
        }
        grid
    }

    #[test]
    fn absent_and_empty_neighbours_are_trivial() {
        let mut grid = grid_with(&[(5, 4, Face::new(1))]);
        grid.set_darkness(4, 5, 3, 255);
        let flags = classify(&grid, GridPos::new(5, 5), CoverageMode::Full);
        assert!(!flags.trivial[0], "north has a face");
        assert!(flags.draw_top_left);
        assert!(flags.trivial[2], "west is discovered but empty");
        assert!(flags.trivial[1]);
        assert!(!flags.draw_top_right);
        assert!(flags.draws_from(0));
        assert!(!flags.draws_from(2));
    }

    #[test]
    fn full_mode_treats_every_face_as_covering() {
        let grid = grid_with(&[(4, 6, Face::with_coverage(1, Coverage::NONE))]);
        let flags = classify(&grid, GridPos::new(5, 5), CoverageMode::Full);
        assert!(flags.draw_top);
    }

    #[test]
    fn partial_mode_follows_the_quadrant_masks() {
        let grid = grid_with(&[
            (4, 5, Face::with_coverage(1, Coverage::NORTH)),
            (3, 6, Face::with_coverage(2, Coverage::EAST)),
            (4, 7, Face::with_coverage(3, Coverage::NORTHEAST)),
            (5, 6, Face::with_coverage(4, Coverage::NONE)),
        ]);
        let flags = classify(&grid, GridPos::new(5, 5), CoverageMode::Partial);
        // West still draws its base quarter whatever its mask.
        assert!(flags.draw_under_left);
        assert!(!flags.draw_left, "below-left needs the northeast bit");
        assert!(flags.draw_right);
        assert!(flags.draw_under_right, "south base quarter");
        assert!(!flags.draw_top, "no face below");
    }

    #[test]
    fn classification_is_idempotent() {
        let grid = grid_with(&[
            (4, 5, Face::new(1)),
            (5, 4, Face::new(2)),
            (6, 5, Face::with_coverage(3, Coverage::EAST)),
        ]);
        let targets = [GridPos::new(5, 5), GridPos::new(0, 0), GridPos::new(6, 4)];
        for mode in [CoverageMode::Full, CoverageMode::Partial] {
            let first = classify_all(&grid, targets, mode);
            let second = classify_all(&grid, targets, mode);
            assert_eq!(first, second);
        }
    }

    #[test]
    fn unless_dirty_hides_changed_squares() {
        let mut grid = grid_with(&[(4, 5, Face::new(1))]);
        let flags = classify(&UnlessDirty(&grid), GridPos::new(5, 5), CoverageMode::Full);
        assert!(flags.trivial[2]);
        let dirty = grid.take_dirty();
        assert_eq!(dirty.len(), 1);
        let flags = classify(&UnlessDirty(&grid), GridPos::new(5, 5), CoverageMode::Full);
        assert!(!flags.trivial[2]);
    }
}
