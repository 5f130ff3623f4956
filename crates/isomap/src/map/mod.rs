mod face;
mod grid;
mod handle;
mod square;
mod updater;

pub use face::{Coverage, Face};
pub use grid::{ChangedSquares, GridPos, MapGrid};
pub use handle::MapHandle;
pub use square::{
    floor_layers, MapSquare, DARKNESS_FULL_BRIGHT, FLOOR_ORDER, GROUND_FLOOR, LAYERS_PER_FLOOR,
    NUM_FLOORS, NUM_LAYERS,
};
pub use updater::{MapListener, MapUpdater};
