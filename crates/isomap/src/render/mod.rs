mod compositor;
mod face_cache;
mod faces;
mod frame;
mod metrics;
mod occlusion;
mod renderer;
mod scheduler;
mod snapshot;
mod transform;
mod viewport;

pub use compositor::{
    change_targets, tint_color, CompositeStats, Compositor, DrawCommand, DrawKind, DrawPlan, Stage,
};
pub use face_cache::{load_face_png, FaceCache, FaceLoadError};
pub use faces::{
    blocked_pattern, ColorTileCache, FaceImage, FaceResolver, SolidColorFaces, BLOCKED_DARK,
    BLOCKED_LIGHT,
};
pub use frame::FrameBuffer;
pub use metrics::{PassKind, RedrawMetrics, RedrawMetricsSnapshot};
pub use occlusion::{
    classify, classify_all, Contribution, Direction, DirectionFlag, DrawPass, PassFlagTable,
    PassFlags, SquareSource, UnlessDirty, ABOVE, CENTRE, DIRECTIONS,
};
pub use renderer::{FrameBufferHandle, MapRenderer};
pub use scheduler::{ChangeWork, FullRedraw, RedrawScheduler, RedrawState};
pub use snapshot::{encode_png, write_png_snapshot, SnapshotError};
pub use transform::{
    diamond_contains, quadrant_cell, PixelPos, Projection, Quadrant, ScreenLayout, ScreenPos,
};
pub use viewport::{preferred_viewport_size, ViewportState};
