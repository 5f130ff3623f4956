use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use isomap::map::floor_layers;
use isomap::{
    Coverage, Face, FaceManifest, GridPos, MapGrid, MapUpdater, GROUND_FLOOR, NUM_FLOORS, NUM_LAYERS,
};
use tracing::{debug, info, warn};

pub(crate) mod palette {
    pub(crate) const GRASS: u32 = 1;
    pub(crate) const DIRT: u32 = 2;
    pub(crate) const WATER: u32 = 3;
    pub(crate) const WALL: u32 = 4;
    pub(crate) const TREE: u32 = 5;
    pub(crate) const PLAYER: u32 = 6;
    pub(crate) const ROOF: u32 = 7;
    pub(crate) const CELLAR: u32 = 8;

    pub(crate) const WITH_OVERLAY: [u32; 2] = [WALL, TREE];
}

const GROUND_LAYER: usize = 9;
const OBJECT_LAYER: usize = 10;
const PLAYER_LAYER: usize = 11;
const CELLAR_LAYER: usize = 6;
const ROOF_LAYER: usize = 12;

const SCROLL_PATH: [(i32, i32); 8] = [
    (1, 0),
    (1, 0),
    (0, 1),
    (0, 1),
    (-1, 0),
    (-1, 0),
    (0, -1),
    (0, -1),
];

/// Synthetic server: paints a deterministic landscape around a walking
/// player and publishes the changes through the updater.
pub(crate) struct DemoFeed {
    updater: MapUpdater,
    manifest: Option<FaceManifest>,
    scroll_every_ticks: u64,
    tick: u64,
}

impl DemoFeed {
    pub(crate) fn new(
        updater: MapUpdater,
        manifest: Option<FaceManifest>,
        map_width: i32,
        map_height: i32,
        scroll_every_ticks: u64,
    ) -> Self {
        updater.new_map(map_width, map_height);
        Self {
            updater,
            manifest,
            scroll_every_ticks,
            tick: 0,
        }
    }

    pub(crate) fn step(&mut self) -> usize {
        self.tick += 1;
        if self.scroll_every_ticks > 0 && self.tick % self.scroll_every_ticks == 0 {
            let leg = (self.tick / self.scroll_every_ticks - 1) as usize % SCROLL_PATH.len();
            let (dx, dy) = SCROLL_PATH[leg];
            self.updater.update(|grid| {
                let centre = view_centre(grid);
                grid.set_face(centre.x, centre.y, PLAYER_LAYER, None);
            });
            self.updater.scroll(dx, dy);
        }
        let tick = self.tick;
        let manifest = self.manifest.as_ref();
        self.updater
            .update(|grid| paint_view(grid, tick, |num| face_for(manifest, num)));
        self.updater.commit()
    }

    pub(crate) fn spawn(mut self, tick: Duration) -> io::Result<FeedHandle> {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let thread = thread::Builder::new()
            .name("map_feed".to_string())
            .spawn(move || {
                info!(tick_ms = tick.as_millis() as u64, "map_feed_started");
                while !stop_flag.load(Ordering::Relaxed) {
                    let changed = self.step();
                    debug!(tick = self.tick, changed, "map_feed_tick");
                    thread::sleep(tick);
                }
                info!(ticks = self.tick, "map_feed_stopped");
            })?;
        Ok(FeedHandle {
            stop,
            thread: Some(thread),
        })
    }
}

pub(crate) struct FeedHandle {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl FeedHandle {
    pub(crate) fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("map_feed_thread_panicked");
            }
        }
    }
}

fn face_for(manifest: Option<&FaceManifest>, num: u32) -> Face {
    match manifest {
        Some(manifest) => manifest.face(num),
        None if num == palette::TREE => Face::with_coverage(num, Coverage::NORTHEAST),
        None => Face::new(num),
    }
}

fn view_centre(grid: &MapGrid) -> GridPos {
    GridPos::new((grid.width() - 1).max(0) / 2, (grid.height() - 1).max(0) / 2)
}

fn terrain_hash(pos: GridPos) -> u32 {
    let mut hash = (pos.x as u32).wrapping_mul(0x27d4_eb2d) ^ (pos.y as u32).wrapping_mul(0x1656_67b1);
    hash ^= hash >> 15;
    hash = hash.wrapping_mul(0x85eb_ca6b);
    hash ^ (hash >> 13)
}

fn terrain(pos: GridPos) -> [Option<u32>; NUM_LAYERS] {
    let hash = terrain_hash(pos);
    let mut layers = [None; NUM_LAYERS];
    layers[GROUND_LAYER] = Some(match hash % 17 {
        0 => palette::WATER,
        1..=3 => palette::DIRT,
        _ => palette::GRASS,
    });
    if pos.x.rem_euclid(9) == 0 && pos.y.rem_euclid(4) != 0 {
        layers[OBJECT_LAYER] = Some(palette::WALL);
    } else if hash % 11 == 3 {
        layers[OBJECT_LAYER] = Some(palette::TREE);
    }
    if pos.x.rem_euclid(9) == 1 && pos.y.rem_euclid(4) == 1 {
        layers[ROOF_LAYER] = Some(palette::ROOF);
    }
    if hash % 23 == 5 {
        layers[CELLAR_LAYER] = Some(palette::CELLAR);
    }
    layers
}

fn ground_darkness(pos: GridPos, tick: u64) -> u8 {
    let hash = terrain_hash(pos);
    match hash % 13 {
        // Torches flicker.
        0 => 150 + ((tick.wrapping_mul(37) + u64::from(hash)) % 100) as u8,
        1 | 2 => 140,
        _ => 255,
    }
}

fn paint_view(grid: &mut MapGrid, tick: u64, face: impl Fn(u32) -> Face) {
    let origin = grid.scroll_offset();
    let centre = view_centre(grid);
    for y in 0..grid.height() {
        for x in 0..grid.width() {
            let abs = GridPos::new(x, y) + origin;
            let layers = terrain(abs);
            // Lighting a floor also lifts the fog it got when it left the view.
            let darkness = ground_darkness(abs, tick);
            for floor in 0..NUM_FLOORS {
                if floor == GROUND_FLOOR || floor_layers(floor).any(|layer| layers[layer].is_some()) {
                    grid.set_darkness(x, y, floor, darkness);
                }
            }
            for (layer, num) in layers.into_iter().enumerate() {
                if layer == PLAYER_LAYER {
                    continue;
                }
                grid.set_face(x, y, layer, num.map(&face));
            }
        }
    }
    grid.set_face(centre.x, centre.y, PLAYER_LAYER, Some(face(palette::PLAYER)));
}
