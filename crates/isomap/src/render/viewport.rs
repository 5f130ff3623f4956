use crate::map::GridPos;

use super::transform::{Projection, ScreenLayout, ScreenPos};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewportState {
    pub width: u32,
    pub height: u32,
    pub map_width: i32,
    pub map_height: i32,
    pub player_square: GridPos,
    pub player_anchor: (i32, i32),
    pub layout: ScreenLayout,
    /// Pixel position of the first visible cell, in `(-tile_size, 0]`.
    pub display_min_offset_x: i32,
    pub display_min_offset_y: i32,
    pub display_max_offset_x: i32,
    pub display_max_offset_y: i32,
    pub display_min_x: i32,
    pub display_max_x: i32,
    pub display_min_y: i32,
    pub display_max_y: i32,
}

impl ViewportState {
    pub fn compute(width: u32, height: u32, tile_size: u32, map_width: i32, map_height: i32) -> Self {
        let tile = tile_size.max(1) as i32;
        let (width_px, height_px) = (width as i32, height as i32);
        let player_square = GridPos::new((map_width - 1).max(0) / 2, (map_height - 1).max(0) / 2);
        let projection = Projection::new(0, 0);
        let player_screen = projection.grid_to_screen(player_square);
        // The player's face image is centred in the component.
        let player_anchor = (width_px / 2 - tile, height_px / 2 - tile);

        let axis_x = AxisLayout::compute(width_px, tile, player_anchor.0, player_screen.x);
        let axis_y = AxisLayout::compute(height_px, tile, player_anchor.1, player_screen.y);

        Self {
            width,
            height,
            map_width,
            map_height,
            player_square,
            player_anchor,
            layout: ScreenLayout {
                projection,
                tile_size: tile,
                offset_x: axis_x.offset,
                offset_y: axis_y.offset,
            },
            display_min_offset_x: axis_x.min_offset,
            display_min_offset_y: axis_y.min_offset,
            display_max_offset_x: axis_x.max_offset,
            display_max_offset_y: axis_y.max_offset,
            display_min_x: axis_x.min,
            display_max_x: axis_x.max,
            display_min_y: axis_y.min,
            display_max_y: axis_y.max,
        }
    }

    pub fn tile_size(&self) -> i32 {
        self.layout.tile_size
    }

    pub fn visible_diamonds(&self) -> impl Iterator<Item = ScreenPos> + '_ {
        let projection = self.layout.projection;
        (self.display_min_y - 1..self.display_max_y).flat_map(move |sy| {
            (self.display_min_x - 1..self.display_max_x)
                .map(move |sx| ScreenPos::new(sx, sy))
                .filter(move |screen| projection.is_on_lattice(*screen))
        })
    }

    pub fn is_cell_visible(&self, cell: ScreenPos) -> bool {
        cell.x >= self.display_min_x
            && cell.x < self.display_max_x
            && cell.y >= self.display_min_y
            && cell.y < self.display_max_y
    }
}

pub fn preferred_viewport_size(map_width: i32, map_height: i32, tile_size: u32) -> (u32, u32) {
    let span = (map_width.max(0) + map_height.max(0)) as u32 * tile_size;
    (span, span)
}

#[derive(Debug, Clone, Copy)]
struct AxisLayout {
    min: i32,
    max: i32,
    min_offset: i32,
    max_offset: i32,
    offset: i32,
}

impl AxisLayout {
    fn compute(extent: i32, tile: i32, anchor: i32, player_index: i32) -> Self {
        let tiles_before_player = div_round_up(anchor, tile);
        let min_offset = anchor - tiles_before_player * tile;
        let min = player_index - tiles_before_player;
        let tiles = div_round_up(extent - min_offset, tile);
        Self {
            min,
            max: min + tiles,
            min_offset,
            max_offset: (min_offset - extent).rem_euclid(tile),
            offset: min_offset - min * tile,
        }
    }
}

fn div_round_up(numerator: i32, denominator: i32) -> i32 {
    (numerator + denominator - 1).div_euclid(denominator)
}
