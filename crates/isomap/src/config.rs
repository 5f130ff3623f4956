use std::time::Duration;

use serde::Deserialize;

pub const DEFAULT_TILE_SIZE: u32 = 48;
pub const OVERLAY_FACE_OFFSET: u32 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageMode {
    #[default]
    Full,
    Partial,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    pub tile_size: u32,
    pub coverage_mode: CoverageMode,
    pub clear_color: [u8; 4],
    pub fog_color: [u8; 4],
    pub frame_budget_ms: u64,
    pub overlay_face_offset: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE,
            coverage_mode: CoverageMode::Full,
            clear_color: [20, 22, 28, 255],
            fog_color: [24, 28, 52, 168],
            frame_budget_ms: 16,
            overlay_face_offset: OVERLAY_FACE_OFFSET,
        }
    }
}

impl RenderConfig {
    pub fn tile_size(&self) -> u32 {
        self.tile_size.max(1)
    }

    pub fn frame_budget(&self) -> Duration {
        Duration::from_millis(self.frame_budget_ms)
    }
}
