use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::ImageReader;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::RenderConfig;
use crate::content::{load_face_manifest, FaceManifest, FaceManifestError};

use super::faces::{blocked_pattern, FaceImage, FaceResolver};

#[derive(Debug, Error)]
pub enum FaceLoadError {
    #[error("face is not listed in the manifest")]
    NotInManifest,
    #[error("failed to open face image: {0}")]
    Open(#[source] std::io::Error),
    #[error("failed to decode face image: {0}")]
    Decode(#[source] image::ImageError),
    #[error("face image is {width}x{height}, expected {expected}x{expected}")]
    Size { width: u32, height: u32, expected: u32 },
}

pub struct FaceCache {
    faces_dir: PathBuf,
    tile_size: u32,
    overlay_offset: u32,
    manifest: FaceManifest,
    images: HashMap<u32, Option<Arc<FaceImage>>>,
    blocked: Option<Arc<FaceImage>>,
}

impl FaceCache {
    pub fn new(asset_root: &Path, manifest: FaceManifest, config: &RenderConfig) -> Self {
        Self {
            faces_dir: asset_root.join("faces"),
            tile_size: config.tile_size(),
            overlay_offset: config.overlay_face_offset,
            manifest,
            images: HashMap::new(),
            blocked: None,
        }
    }

    pub fn open(asset_root: &Path, config: &RenderConfig) -> Result<Self, FaceManifestError> {
        let manifest = load_face_manifest(&asset_root.join("faces.xml"))?;
        info!(
            faces = manifest.len(),
            asset_root = %asset_root.display(),
            "face_manifest_loaded"
        );
        Ok(Self::new(asset_root, manifest, config))
    }

    pub fn manifest(&self) -> &FaceManifest {
        &self.manifest
    }

    pub fn face_path(&self, key: &str) -> PathBuf {
        self.faces_dir.join(format!("{key}.png"))
    }

    fn load(&self, slot: u32) -> Result<FaceImage, (Option<PathBuf>, FaceLoadError)> {
        let def = self
            .manifest
            .get(slot)
            .ok_or((None, FaceLoadError::NotInManifest))?;
        let path = self.face_path(&def.key);
        load_face_png(&path, self.tile_size).map_err(|error| (Some(path), error))
    }
}

impl FaceResolver for FaceCache {
    fn resolve_face(&mut self, face_num: u32, overlay: bool) -> Option<Arc<FaceImage>> {
        let slot = if overlay {
            face_num.checked_add(self.overlay_offset)?
        } else {
            face_num
        };
        if let Some(cached) = self.images.get(&slot) {
            return cached.clone();
        }
        let image = match self.load(slot) {
            Ok(image) => Some(Arc::new(image)),
            // Most faces have no overlay.
            Err((_, FaceLoadError::NotInManifest)) if overlay => None,
            Err((path, error)) => {
                let path_display = path
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "<unresolved>".to_string());
                warn!(
                    face_num = slot,
                    path = %path_display,
                    reason = %error,
                    "face_load_failed_using_placeholder"
                );
                None
            }
        };
        self.images.insert(slot, image.clone());
        image
    }

    fn blocked_image(&mut self) -> Arc<FaceImage> {
        let tile_size = self.tile_size;
        Arc::clone(
            self.blocked
                .get_or_insert_with(|| Arc::new(blocked_pattern(tile_size))),
        )
    }
}

pub fn load_face_png(path: &Path, tile_size: u32) -> Result<FaceImage, FaceLoadError> {
    let reader = ImageReader::open(path).map_err(FaceLoadError::Open)?;
    let decoded = reader.decode().map_err(FaceLoadError::Decode)?;
    let image = decoded.to_rgba8();
    let expected = tile_size * 2;
    let (width, height) = (image.width(), image.height());
    if width != expected || height != expected {
        return Err(FaceLoadError::Size {
            width,
            height,
            expected,
        });
    }
    FaceImage::from_rgba(width, height, image.into_raw()).ok_or(FaceLoadError::Size {
        width,
        height,
        expected,
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    use super::*;
    use crate::content::parse_face_manifest;

    const TILE: u32 = 4;

    fn config() -> RenderConfig {
        RenderConfig {
            tile_size: TILE,
            ..RenderConfig::default()
        }
    }

    fn write_png(root: &Path, key: &str, size: u32, color: [u8; 4]) {
        let path = root.join("faces").join(format!("{key}.png"));
        fs::create_dir_all(path.parent().expect("parent")).expect("dir");
        RgbaImage::from_pixel(size, size, Rgba(color))
            .save(&path)
            .expect("save png");
    }

    fn cache(root: &Path) -> FaceCache {
        let manifest = parse_face_manifest(
            Path::new("faces.xml"),
            r#"<Faces>
                <Face num="1" key="grass"/>
                <Face num="2" key="missing"/>
                <Face num="3" key="walls/big"/>
                <Face num="10001" key="grass_top"/>
            </Faces>"#,
        )
        .expect("manifest");
        FaceCache::new(root, manifest, &config())
    }

    #[test]
    fn loads_and_caches_faces() {
        let temp = TempDir::new().expect("temp");
        write_png(temp.path(), "grass", 2 * TILE, [10, 200, 30, 255]);
        let mut faces = cache(temp.path());

        let first = faces.resolve_face(1, false).expect("grass");
        assert_eq!(&first.rgba()[..4], &[10, 200, 30, 255]);
        let second = faces.resolve_face(1, false).expect("grass again");
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn overlay_is_looked_up_with_the_offset() {
        let temp = TempDir::new().expect("temp");
        write_png(temp.path(), "grass", 2 * TILE, [10, 200, 30, 255]);
        write_png(temp.path(), "grass_top", 2 * TILE, [1, 2, 3, 255]);
        let mut faces = cache(temp.path());

        let overlay = faces.resolve_face(1, true).expect("overlay");
        assert_eq!(&overlay.rgba()[..4], &[1, 2, 3, 255]);
        assert!(faces.resolve_face(3, true).is_none());
    }

    #[test]
    fn failures_are_cached_as_missing() {
        let temp = TempDir::new().expect("temp");
        write_png(temp.path(), "walls/big", 3 * TILE, [0, 0, 0, 255]);
        let mut faces = cache(temp.path());

        assert!(faces.resolve_face(2, false).is_none());
        // Appearing later does not matter once the failure is cached.
        write_png(temp.path(), "missing", 2 * TILE, [0, 0, 0, 255]);
        assert!(faces.resolve_face(2, false).is_none());
        assert!(faces.resolve_face(3, false).is_none());
        assert!(faces.resolve_face(77, false).is_none());
    }

    #[test]
    fn size_mismatch_is_an_error() {
        let temp = TempDir::new().expect("temp");
        write_png(temp.path(), "walls/big", 3 * TILE, [0, 0, 0, 255]);
        let path = temp.path().join("faces").join("walls").join("big.png");
        assert!(matches!(
            load_face_png(&path, TILE),
            Err(FaceLoadError::Size { expected: 8, .. })
        ));
        assert!(matches!(
            load_face_png(&temp.path().join("nope.png"), TILE),
            Err(FaceLoadError::Open(_))
        ));
    }

    #[test]
    fn open_reads_the_manifest_from_the_asset_root() {
        let temp = TempDir::new().expect("temp");
        assert!(FaceCache::open(temp.path(), &config()).is_err());
        fs::write(
            temp.path().join("faces.xml"),
            r#"<Faces><Face num="5" key="dirt"/></Faces>"#,
        )
        .expect("write");
        let faces = FaceCache::open(temp.path(), &config()).expect("cache");
        assert_eq!(faces.manifest().len(), 1);
        assert_eq!(
            faces.face_path("dirt"),
            temp.path().join("faces").join("dirt.png")
        );
    }
}
