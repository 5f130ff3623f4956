pub mod config;
pub mod content;
pub mod map;
pub mod render;

pub use config::{CoverageMode, RenderConfig, DEFAULT_TILE_SIZE, OVERLAY_FACE_OFFSET};
pub use content::{
    check_face_key, load_face_manifest, parse_face_manifest, FaceDef, FaceKeyError, FaceManifest,
    FaceManifestError, FaceManifestErrorCode, SourceLocation,
};
pub use map::{
    ChangedSquares, Coverage, Face, GridPos, MapGrid, MapHandle, MapListener, MapSquare,
    MapUpdater, FLOOR_ORDER, GROUND_FLOOR, NUM_FLOORS, NUM_LAYERS,
};
pub use render::{
    FaceCache, FaceImage, FaceResolver, FrameBuffer, FrameBufferHandle, MapRenderer,
    RedrawMetrics, RedrawMetricsSnapshot, SolidColorFaces,
};
