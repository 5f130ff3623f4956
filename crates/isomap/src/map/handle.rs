use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

use super::grid::MapGrid;

static MAP_LOCK_POISON_WARNED: AtomicBool = AtomicBool::new(false);

fn warn_map_lock_poison_once(operation: &'static str) {
    if MAP_LOCK_POISON_WARNED
        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
    {
        warn!(operation, "map_lock_poisoned_recovered_inner_value");
    }
}

#[derive(Clone, Debug, Default)]
pub struct MapHandle {
    grid: Arc<RwLock<MapGrid>>,
}

impl MapHandle {
    pub fn new(grid: MapGrid) -> Self {
        Self {
            grid: Arc::new(RwLock::new(grid)),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, MapGrid> {
        match self.grid.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn_map_lock_poison_once("read");
                poisoned.into_inner()
            }
        }
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, MapGrid> {
        match self.grid.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn_map_lock_poison_once("write");
                poisoned.into_inner()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::map::Face;

    fn poison_lock(handle: &MapHandle) {
        thread::scope(|scope| {
            let _ = scope
                .spawn(|| {
                    let _guard = handle.grid.write().expect("write guard");
                    panic!("poison map lock");
                })
                .join();
        });
    }

    #[test]
    fn writes_are_visible_to_readers() {
        let handle = MapHandle::new(MapGrid::new(2, 2));
        handle.write().set_face(0, 1, 9, Some(Face::new(8)));
        let grid = handle.read();
        let square = grid.square_at(0, 1).expect("square");
        assert_eq!(square.face(9), Some(Face::new(8)));
    }

    #[test]
    fn read_and_write_recover_after_poison_without_panic() {
        let handle = MapHandle::new(MapGrid::new(3, 3));
        poison_lock(&handle);

        assert!(handle.write().set_face(1, 1, 0, Some(Face::new(2))));
        assert!(handle.read().square_at(1, 1).is_some());
    }
}
