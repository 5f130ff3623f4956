use std::sync::Arc;

use tracing::debug;

use super::face::Face;
use super::grid::{ChangedSquares, GridPos, MapGrid};
use super::handle::MapHandle;

/// Map notifications consumed by a map view.
///
/// Notifications are sent after the map write lock has been released, so a
/// listener may take the read lock.
pub trait MapListener: Send + Sync {
    fn on_new_map(&self);

    fn on_scroll(&self, dx: i32, dy: i32);

    fn on_map_changed(&self, changed: &ChangedSquares, scroll_offset: GridPos);

    fn on_map_size_changed(&self, _width: i32, _height: i32) {}

    fn on_viewport_resized(&self, _width: u32, _height: u32) {}
}

pub struct MapUpdater {
    map: MapHandle,
    listeners: Vec<Arc<dyn MapListener>>,
}

impl MapUpdater {
    pub fn new(map: MapHandle) -> Self {
        Self {
            map,
            listeners: Vec::new(),
        }
    }

    pub fn map(&self) -> &MapHandle {
        &self.map
    }

    pub fn add_listener(&mut self, listener: Arc<dyn MapListener>) {
        self.listeners.push(listener);
    }

    pub fn new_map(&self, width: i32, height: i32) {
        let size_changed = {
            let mut grid = self.map.write();
            let size_changed = grid.width() != width || grid.height() != height;
            grid.reset(width, height);
            size_changed
        };
        if size_changed {
            self.notify_map_size(width, height);
        }
        for listener in &self.listeners {
            listener.on_new_map();
        }
    }

    pub fn map_size(&self, width: i32, height: i32) {
        self.map.write().set_view_size(width, height);
        self.notify_map_size(width, height);
    }

    pub fn scroll(&self, dx: i32, dy: i32) {
        self.map.write().scroll(dx, dy);
        for listener in &self.listeners {
            listener.on_scroll(dx, dy);
        }
    }

    pub fn set_face(&self, x: i32, y: i32, layer: usize, face: Option<Face>) -> bool {
        self.map.write().set_face(x, y, layer, face)
    }

    pub fn set_darkness(&self, x: i32, y: i32, floor: usize, darkness: u8) -> bool {
        self.map.write().set_darkness(x, y, floor, darkness)
    }

    pub fn clear_square(&self, x: i32, y: i32, floor: usize) -> bool {
        self.map.write().clear_square(x, y, floor)
    }

    pub fn update<R>(&self, edit: impl FnOnce(&mut MapGrid) -> R) -> R {
        edit(&mut self.map.write())
    }

    pub fn commit(&self) -> usize {
        let (changed, scroll_offset) = {
            let grid = self.map.read();
            (grid.dirty_squares(), grid.scroll_offset())
        };
        debug!(changed = changed.len(), "map_update_committed");
        for listener in &self.listeners {
            listener.on_map_changed(&changed, scroll_offset);
        }
        self.map.write().clear_dirty(&changed);
        changed.len()
    }

    fn notify_map_size(&self, width: i32, height: i32) {
        for listener in &self.listeners {
            listener.on_map_size_changed(width, height);
        }
    }
}
