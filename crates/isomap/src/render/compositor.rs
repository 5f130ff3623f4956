use std::collections::{BTreeSet, HashSet};
use std::iter;
use std::sync::Arc;

use crate::config::RenderConfig;
use crate::map::{
    floor_layers, GridPos, MapSquare, DARKNESS_FULL_BRIGHT, FLOOR_ORDER, GROUND_FLOOR,
    LAYERS_PER_FLOOR,
};

use super::faces::{ColorTileCache, FaceImage, FaceResolver};
use super::frame::FrameBuffer;
use super::occlusion::{
    classify_all, face_coverage, Contribution, DrawPass, PassFlagTable, SquareSource, ABOVE,
    CENTRE, DIRECTIONS,
};
use super::transform::{quadrant_cell, Quadrant, ScreenLayout, ScreenPos};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    BaseLayer,
    SubLayers,
    OverlayBase,
    OverlaySubLayers,
    Tint,
}

impl Stage {
    fn for_layer(pass: DrawPass, layer: usize) -> Self {
        let is_base = layer % LAYERS_PER_FLOOR == 0;
        match (pass, is_base) {
            (DrawPass::Base, true) => Stage::BaseLayer,
            (DrawPass::Base, false) => Stage::SubLayers,
            (DrawPass::Overlay, true) => Stage::OverlayBase,
            (DrawPass::Overlay, false) => Stage::OverlaySubLayers,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawKind {
    Face(u32),
    Overlay(u32),
    MissingFace(u32),
    Blocked,
    Tint([u8; 4]),
}

#[derive(Debug, Clone)]
pub struct DrawCommand {
    pub floor: usize,
    pub stage: Stage,
    pub layer: usize,
    pub contributor: GridPos,
    pub origin: ScreenPos,
    pub quadrant: Quadrant,
    pub kind: DrawKind,
    pub image: Arc<FaceImage>,
}

impl DrawCommand {
    pub fn target_cell(&self) -> ScreenPos {
        quadrant_cell(self.origin, self.quadrant)
    }

    fn paint_order(&self) -> (Stage, usize, i32, i32, Quadrant) {
        (
            self.stage,
            self.layer,
            self.origin.y,
            self.origin.x,
            self.quadrant,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct DrawnKey {
    contributor: GridPos,
    stage: Stage,
    layer: usize,
    quadrant: Quadrant,
}

struct PassState {
    flags: PassFlagTable,
    drawn: HashSet<DrawnKey>,
}

impl PassState {
    fn claim(&mut self, key: DrawnKey) -> bool {
        self.drawn.insert(key)
    }

    fn next_floor(&mut self) {
        self.drawn.clear();
    }
}

#[derive(Debug, Clone, Default)]
pub struct DrawPlan {
    pub cells: BTreeSet<ScreenPos>,
    pub commands: Vec<DrawCommand>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompositeStats {
    pub targets: usize,
    pub cells: usize,
    pub blits: usize,
}

impl DrawPlan {
    pub fn execute(&self, frame: &mut FrameBuffer, layout: &ScreenLayout, clear_color: [u8; 4]) -> usize {
        let tile = layout.tile_size;
        for cell in &self.cells {
            let corner = layout.pixel_origin(*cell);
            frame.fill_rect(corner.x, corner.y, tile, tile, clear_color);
        }
        let mut blits = 0;
        for command in &self.commands {
            let corner = layout.pixel_origin(command.origin);
            let (column, row) = command.quadrant.cell_offset();
            if frame.blit_region(
                &command.image,
                column * tile,
                row * tile,
                tile,
                corner.x + column * tile,
                corner.y + row * tile,
            ) {
                blits += 1;
            }
        }
        blits
    }
}

/// Targets of a change redraw: each changed square plus the square above it,
/// which shows the changed square's overlay.
pub fn change_targets(changed: impl IntoIterator<Item = GridPos>) -> BTreeSet<GridPos> {
    let above = DIRECTIONS[ABOVE].grid_offset;
    changed
        .into_iter()
        .flat_map(|pos| [pos, pos + above])
        .collect()
}

pub struct Compositor<'a> {
    pub layout: ScreenLayout,
    pub config: &'a RenderConfig,
    pub faces: &'a mut dyn FaceResolver,
    pub tints: &'a mut ColorTileCache,
}

impl Compositor<'_> {
    pub fn plan(&mut self, source: &impl SquareSource, targets: &BTreeSet<GridPos>) -> DrawPlan {
        let projection = self.layout.projection;
        let mut plan = DrawPlan::default();
        for target in targets {
            let screen = projection.grid_to_screen(*target);
            plan.cells
                .extend(Quadrant::ALL.map(|quadrant| quadrant_cell(screen, quadrant)));
        }

        let mut pass = PassState {
            flags: classify_all(source, targets.iter().copied(), self.config.coverage_mode),
            drawn: HashSet::new(),
        };
        for floor in FLOOR_ORDER {
            let start = plan.commands.len();
            for target in targets {
                self.plan_target_floor(source, &mut pass, *target, floor, &mut plan.commands);
            }
            plan.commands[start..].sort_by_key(DrawCommand::paint_order);
            pass.next_floor();
        }
        plan
    }

    pub fn composite(
        &mut self,
        frame: &mut FrameBuffer,
        source: &impl SquareSource,
        targets: &BTreeSet<GridPos>,
    ) -> CompositeStats {
        let plan = self.plan(source, targets);
        let blits = plan.execute(frame, &self.layout, self.config.clear_color);
        CompositeStats {
            targets: targets.len(),
            cells: plan.cells.len(),
            blits,
        }
    }

    fn plan_target_floor(
        &mut self,
        source: &impl SquareSource,
        pass: &mut PassState,
        target: GridPos,
        floor: usize,
        out: &mut Vec<DrawCommand>,
    ) {
        let flags = pass.flags.get(&target).copied().unwrap_or_default();
        let neighbours = DIRECTIONS
            .iter()
            .enumerate()
            .map(|(index, direction)| (direction, flags.draws_from(index)));
        for (direction, faces_allowed) in iter::once((&CENTRE, true)).chain(neighbours) {
            let contributor = target + direction.grid_offset;
            let Some(square) = source.square(contributor) else {
                continue;
            };
            for contribution in direction.contributions {
                self.plan_contribution(
                    pass,
                    contribution,
                    contributor,
                    square,
                    floor,
                    faces_allowed,
                    out,
                );
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn plan_contribution(
        &mut self,
        pass: &mut PassState,
        contribution: &Contribution,
        contributor: GridPos,
        square: &MapSquare,
        floor: usize,
        faces_allowed: bool,
        out: &mut Vec<DrawCommand>,
    ) {
        let screen = self.layout.projection.grid_to_screen(contributor);
        let mut push = |pass: &mut PassState, stage, layer, origin, kind, image| {
            let key = DrawnKey {
                contributor,
                stage,
                layer,
                quadrant: contribution.source,
            };
            if pass.claim(key) {
                out.push(DrawCommand {
                    floor,
                    stage,
                    layer,
                    contributor,
                    origin,
                    quadrant: contribution.source,
                    kind,
                    image,
                });
            }
        };
        let base_layer = floor * LAYERS_PER_FLOOR;

        match contribution.pass {
            DrawPass::Base => {
                if faces_allowed {
                    for layer in floor_layers(floor) {
                        let Some(face) = square.face(layer) else {
                            continue;
                        };
                        let (kind, image) = match self.faces.resolve_face(face.num, false) {
                            Some(image) => (DrawKind::Face(face.num), image),
                            None => (DrawKind::MissingFace(face.num), self.faces.blocked_image()),
                        };
                        push(pass, Stage::for_layer(DrawPass::Base, layer), layer, screen, kind, image);
                    }
                }
                if floor == GROUND_FLOOR && square.face(base_layer).is_none() {
                    let image = self.faces.blocked_image();
                    push(pass, Stage::BaseLayer, base_layer, screen, DrawKind::Blocked, image);
                }
                if let Some(color) = tint_color(square, floor, self.config) {
                    let image = self.tints.get_or_create(color);
                    push(pass, Stage::Tint, base_layer, screen, DrawKind::Tint(color), image);
                }
            }
            DrawPass::Overlay => {
                if !faces_allowed {
                    return;
                }
                let origin = screen.offset(0, -2);
                for layer in floor_layers(floor) {
                    let Some(face) = square.face(layer) else {
                        continue;
                    };
                    if !contribution.enabled_by(face_coverage(face.coverage, self.config.coverage_mode)) {
                        continue;
                    }
                    let Some(image) = self.faces.resolve_face(face.num, true) else {
                        continue;
                    };
                    let stage = Stage::for_layer(DrawPass::Overlay, layer);
                    push(pass, stage, layer, origin, DrawKind::Overlay(face.num), image);
                }
            }
        }
    }
}

pub fn tint_color(square: &MapSquare, floor: usize, config: &RenderConfig) -> Option<[u8; 4]> {
    if square.is_fog(floor) {
        return Some(config.fog_color);
    }
    let darkness = square.darkness(floor);
    (darkness < DARKNESS_FULL_BRIGHT).then_some([0, 0, 0, DARKNESS_FULL_BRIGHT - darkness])
}
