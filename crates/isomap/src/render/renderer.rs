use std::collections::BTreeSet;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::RenderConfig;
use crate::map::{ChangedSquares, GridPos, MapGrid, MapHandle, MapListener};

use super::compositor::{change_targets, CompositeStats, Compositor};
use super::faces::{ColorTileCache, FaceResolver};
use super::frame::FrameBuffer;
use super::metrics::{PassKind, RedrawMetrics};
use super::occlusion::{SquareSource, UnlessDirty};
use super::scheduler::{FullRedraw, RedrawScheduler, RedrawState};
use super::viewport::{self, ViewportState};

static RENDER_LOCK_POISON_WARNED: AtomicBool = AtomicBool::new(false);

fn warn_render_lock_poison_once() {
    if RENDER_LOCK_POISON_WARNED
        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
    {
        warn!("render_state_lock_poisoned_recovered_inner_value");
    }
}

struct RenderState {
    config: RenderConfig,
    scheduler: RedrawScheduler,
    viewport: ViewportState,
    frame: FrameBuffer,
    faces: Box<dyn FaceResolver>,
    tints: ColorTileCache,
    generation: u64,
}

/// Incremental map view renderer.
///
/// Listens to map notifications and keeps an off-screen frame in sync with
/// the map. Every pass runs with the map read lock held; the render state
/// lock is always taken second.
pub struct MapRenderer {
    map: MapHandle,
    state: Mutex<RenderState>,
    metrics: RedrawMetrics,
}

pub struct FrameBufferHandle<'a> {
    guard: MutexGuard<'a, RenderState>,
}

impl FrameBufferHandle<'_> {
    pub fn generation(&self) -> u64 {
        self.guard.generation
    }
}

impl Deref for FrameBufferHandle<'_> {
    type Target = FrameBuffer;

    fn deref(&self) -> &FrameBuffer {
        &self.guard.frame
    }
}

impl MapRenderer {
    pub fn new(
        map: MapHandle,
        config: RenderConfig,
        faces: Box<dyn FaceResolver>,
        width: u32,
        height: u32,
    ) -> Self {
        let (map_width, map_height) = {
            let grid = map.read();
            (grid.width(), grid.height())
        };
        let tile_size = config.tile_size();
        let viewport = ViewportState::compute(width, height, tile_size, map_width, map_height);
        let mut frame = FrameBuffer::new(width, height);
        frame.fill(config.clear_color);
        Self {
            map,
            state: Mutex::new(RenderState {
                scheduler: RedrawScheduler::new(),
                viewport,
                frame,
                faces,
                tints: ColorTileCache::new(tile_size),
                generation: 0,
                config,
            }),
            metrics: RedrawMetrics::default(),
        }
    }

    pub fn render_frame(&self) -> FrameBufferHandle<'_> {
        FrameBufferHandle {
            guard: self.lock_state(),
        }
    }

    pub fn player_screen_anchor(&self) -> (i32, i32) {
        self.lock_state().viewport.player_anchor
    }

    pub fn preferred_viewport_size(&self, map_width: i32, map_height: i32) -> (u32, u32) {
        let tile_size = self.lock_state().config.tile_size();
        viewport::preferred_viewport_size(map_width, map_height, tile_size)
    }

    pub fn viewport(&self) -> ViewportState {
        self.lock_state().viewport
    }

    pub fn redraw_state(&self) -> RedrawState {
        self.lock_state().scheduler.state()
    }

    pub fn pending_scrolls(&self) -> usize {
        self.lock_state().scheduler.pending_scrolls()
    }

    pub fn metrics(&self) -> RedrawMetrics {
        self.metrics.clone()
    }

    pub fn redraw_all(&self) {
        let grid = self.map.read();
        let mut state = self.lock_state();
        state.redraw_full(&*grid, &self.metrics);
        state.generation += 1;
    }

    fn lock_state(&self) -> MutexGuard<'_, RenderState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn_render_lock_poison_once();
                poisoned.into_inner()
            }
        }
    }

    fn relayout(&self, size: Option<(u32, u32)>) {
        let grid = self.map.read();
        let mut guard = self.lock_state();
        let state = &mut *guard;
        let (width, height) = size.unwrap_or((state.viewport.width, state.viewport.height));
        let tile_size = state.config.tile_size();
        state.viewport =
            ViewportState::compute(width, height, tile_size, grid.width(), grid.height());
        state.frame.resize(width, height);
        state.frame.fill(state.config.clear_color);
        state.scheduler.on_geometry_changed();
        info!(
            width,
            height,
            map_width = grid.width(),
            map_height = grid.height(),
            "viewport_recomputed"
        );
        state.redraw_full(&*grid, &self.metrics);
        state.generation += 1;
    }
}

impl RenderState {
    fn visible_targets(&self) -> BTreeSet<GridPos> {
        let projection = self.viewport.layout.projection;
        self.viewport
            .visible_diamonds()
            .filter_map(|screen| projection.screen_to_grid(screen))
            .collect()
    }

    fn composite(&mut self, source: &impl SquareSource, targets: &BTreeSet<GridPos>) -> CompositeStats {
        let mut compositor = Compositor {
            layout: self.viewport.layout,
            config: &self.config,
            faces: self.faces.as_mut(),
            tints: &mut self.tints,
        };
        compositor.composite(&mut self.frame, source, targets)
    }

    fn redraw_full(&mut self, source: &impl SquareSource, metrics: &RedrawMetrics) {
        let started = Instant::now();
        let targets = self.visible_targets();
        let stats = self.composite(source, &targets);
        self.finish_pass(PassKind::Full, stats, started, metrics);
    }

    fn redraw_changes(&mut self, grid: &MapGrid, changed: &BTreeSet<GridPos>, metrics: &RedrawMetrics) {
        let started = Instant::now();
        let targets = change_targets(changed.iter().copied());
        let stats = self.composite(grid, &targets);
        self.finish_pass(PassKind::Incremental, stats, started, metrics);
    }

    fn finish_pass(&self, kind: PassKind, stats: CompositeStats, started: Instant, metrics: &RedrawMetrics) {
        let elapsed = started.elapsed();
        let budget = self.config.frame_budget();
        let over_budget = elapsed > budget;
        let elapsed_ms = elapsed.as_secs_f32() * 1000.0;
        match kind {
            PassKind::Full => debug!(
                targets = stats.targets,
                cells = stats.cells,
                blits = stats.blits,
                elapsed_ms,
                "redraw_full"
            ),
            PassKind::Incremental => debug!(
                targets = stats.targets,
                cells = stats.cells,
                blits = stats.blits,
                elapsed_ms,
                "redraw_incremental"
            ),
        }
        if over_budget {
            warn!(
                kind = ?kind,
                elapsed_ms,
                budget_ms = self.config.frame_budget_ms,
                "redraw_pass_over_budget"
            );
        }
        metrics.record_pass(kind, stats.blits, elapsed, over_budget);
    }

    fn apply_change(&mut self, grid: &MapGrid, changed: &BTreeSet<GridPos>, metrics: &RedrawMetrics) {
        let work = self.scheduler.begin_change();
        let mut painted = false;
        if work.clear_frame {
            self.frame.fill(self.config.clear_color);
            painted = true;
        }
        match work.full_redraw {
            Some(FullRedraw::All) => {
                self.redraw_full(grid, metrics);
                painted = true;
            }
            Some(FullRedraw::UnlessChanged) => {
                self.redraw_full(&UnlessDirty(grid), metrics);
                painted = true;
            }
            None => {}
        }
        if work.scrolls_drained > 0 {
            debug!(scrolls = work.scrolls_drained, "scroll_queue_drained");
        }
        if work.change_redraw && !changed.is_empty() {
            self.redraw_changes(grid, changed, metrics);
            painted = true;
        }
        self.scheduler.finish();
        if painted {
            self.generation += 1;
        }
    }
}

impl MapListener for MapRenderer {
    fn on_new_map(&self) {
        self.lock_state().scheduler.on_new_map();
        info!("map_view_reset");
    }

    fn on_scroll(&self, dx: i32, dy: i32) {
        self.lock_state().scheduler.on_scroll(dx, dy);
    }

    fn on_map_changed(&self, changed: &ChangedSquares, scroll_offset: GridPos) {
        let grid = self.map.read();
        let mut state = self.lock_state();
        let changed = changed.to_view(scroll_offset);
        state.apply_change(&grid, &changed, &self.metrics);
    }

    fn on_map_size_changed(&self, _width: i32, _height: i32) {
        self.relayout(None);
    }

    fn on_viewport_resized(&self, width: u32, height: u32) {
        self.relayout(Some((width, height)));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::map::{Coverage, Face, MapUpdater};
    use crate::render::faces::SolidColorFaces;

    const TILE: u32 = 8;

    fn config() -> RenderConfig {
        RenderConfig {
            tile_size: TILE,
            ..RenderConfig::default()
        }
    }

    fn faces() -> Box<dyn FaceResolver> {
        Box::new(SolidColorFaces::new(TILE).with_overlay(20))
    }

    fn setup(map_size: i32) -> (MapUpdater, Arc<MapRenderer>) {
        let map = MapHandle::default();
        let mut updater = MapUpdater::new(map.clone());
        let renderer = Arc::new(MapRenderer::new(map, config(), faces(), 120, 100));
        updater.add_listener(renderer.clone());
        updater.new_map(map_size, map_size);
        (updater, renderer)
    }

    fn populate(updater: &MapUpdater) {
        updater.update(|grid| {
            for y in 0..grid.height() {
                for x in 0..grid.width() {
                    grid.set_face(x, y, 9, Some(Face::new(1 + ((x + 2 * y) % 3) as u32)));
                    if (x + y) % 3 == 0 {
                        grid.set_face(x, y, 10, Some(Face::with_coverage(20, Coverage::NORTH)));
                    }
                }
            }
        });
    }

    fn reference_digest(updater: &MapUpdater, renderer: &MapRenderer) -> String {
        let viewport = renderer.viewport();
        let reference = MapRenderer::new(
            updater.map().clone(),
            config(),
            faces(),
            viewport.width,
            viewport.height,
        );
        reference.redraw_all();
        let digest = reference.render_frame().digest_hex();
        digest
    }

    #[test]
    fn first_commit_redraws_the_whole_view() {
        let (updater, renderer) = setup(7);
        populate(&updater);
        updater.commit();

        // One from the initial layout, one from the commit.
        let metrics = renderer.metrics().snapshot();
        assert_eq!(metrics.full_redraws, 2);
        assert_eq!(metrics.incremental_redraws, 0);
        assert_eq!(renderer.redraw_state(), RedrawState::Idle);
        let expected = reference_digest(&updater, &renderer);
        assert_eq!(renderer.render_frame().digest_hex(), expected);
    }

    #[test]
    fn empty_change_and_zero_scroll_leave_the_frame_untouched() {
        let (updater, renderer) = setup(7);
        populate(&updater);
        updater.commit();
        let (before, generation) = {
            let frame = renderer.render_frame();
            (frame.digest_hex(), frame.generation())
        };

        updater.scroll(0, 0);
        assert_eq!(updater.commit(), 0);

        let frame = renderer.render_frame();
        assert_eq!(frame.digest_hex(), before);
        assert_eq!(frame.generation(), generation);
        assert_eq!(renderer.metrics().snapshot().incremental_redraws, 0);
    }

    #[test]
    fn scroll_then_change_runs_full_then_incremental_redraw() {
        let (updater, renderer) = setup(7);
        populate(&updater);
        updater.commit();

        updater.scroll(1, 0);
        assert_eq!(renderer.redraw_state(), RedrawState::ScrollPending);
        assert_eq!(renderer.pending_scrolls(), 1);
        updater.set_face(3, 3, 9, Some(Face::new(9)));
        assert_eq!(updater.commit(), 1);

        let metrics = renderer.metrics().snapshot();
        assert_eq!(metrics.full_redraws, 3);
        assert_eq!(metrics.incremental_redraws, 1);
        assert_eq!(renderer.pending_scrolls(), 0);
        assert_eq!(renderer.redraw_state(), RedrawState::Idle);
        let expected = reference_digest(&updater, &renderer);
        assert_eq!(renderer.render_frame().digest_hex(), expected);
    }

    #[test]
    fn incremental_updates_match_a_full_redraw() {
        let (updater, renderer) = setup(9);
        populate(&updater);
        updater.commit();

        for step in 0..5 {
            updater.update(|grid| {
                grid.set_face(step, 8 - step, 9, Some(Face::new(7 + step as u32)));
                grid.set_face(4, step, 10, Some(Face::with_coverage(20, Coverage::ALL)));
                grid.set_face(step + 2, 2, 9, None);
                grid.set_darkness(step, step, 3, 60 + step as u8 * 30);
                grid.clear_square(8 - step, 1, 3);
            });
            updater.commit();
            let expected = reference_digest(&updater, &renderer);
            assert_eq!(renderer.render_frame().digest_hex(), expected, "step {step}");
        }
        assert_eq!(renderer.metrics().snapshot().incremental_redraws, 5);
    }

    #[test]
    fn resize_recomputes_viewport_and_redraws() {
        let (updater, renderer) = setup(7);
        populate(&updater);
        updater.commit();
        updater.scroll(1, 1);

        renderer.on_viewport_resized(200, 160);
        let viewport = renderer.viewport();
        assert_eq!((viewport.width, viewport.height), (200, 160));
        assert_eq!(renderer.player_screen_anchor(), (100 - TILE as i32, 80 - TILE as i32));
        assert_eq!(renderer.pending_scrolls(), 0);
        assert_eq!(renderer.metrics().snapshot().full_redraws, 3);
        {
            let frame = renderer.render_frame();
            assert_eq!((frame.width(), frame.height()), (200, 160));
        }
        let expected = reference_digest(&updater, &renderer);
        assert_eq!(renderer.render_frame().digest_hex(), expected);
    }

    #[test]
    fn map_size_change_relayouts_the_view() {
        let (updater, renderer) = setup(7);
        updater.map_size(11, 5);
        let viewport = renderer.viewport();
        assert_eq!((viewport.map_width, viewport.map_height), (11, 5));
        assert_eq!(viewport.player_square, GridPos::new(5, 2));
    }

    #[test]
    fn new_map_schedules_full_redraw() {
        let (updater, renderer) = setup(7);
        populate(&updater);
        updater.commit();
        updater.scroll(1, 0);

        updater.new_map(7, 7);
        assert_eq!(renderer.redraw_state(), RedrawState::FullRedrawPending);
        assert_eq!(renderer.pending_scrolls(), 0);
        updater.commit();
        assert_eq!(renderer.metrics().snapshot().full_redraws, 3);
        let frame = renderer.render_frame();
        assert!(frame
            .rgba()
            .chunks_exact(4)
            .all(|px| px == RenderConfig::default().clear_color));
    }

    #[test]
    fn preferred_size_fits_the_whole_map() {
        let (_updater, renderer) = setup(7);
        assert_eq!(renderer.preferred_viewport_size(9, 7), (16 * TILE, 16 * TILE));
    }
}
