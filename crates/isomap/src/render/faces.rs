use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::transform::diamond_contains;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaceImage {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl FaceImage {
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Option<Self> {
        if rgba.len() != width as usize * height as usize * 4 {
            return None;
        }
        Some(Self {
            width,
            height,
            rgba,
        })
    }

    pub fn diamond(tile_size: u32, color: [u8; 4]) -> Self {
        Self::diamond_with(tile_size, |_, _| color)
    }

    pub fn diamond_with(tile_size: u32, mut shade: impl FnMut(u32, u32) -> [u8; 4]) -> Self {
        let size = tile_size * 2;
        let mut rgba = vec![0u8; size as usize * size as usize * 4];
        for y in 0..size {
            for x in 0..size {
                if !diamond_contains(tile_size as i32, x as i32, y as i32) {
                    continue;
                }
                let offset = (y as usize * size as usize + x as usize) * 4;
                rgba[offset..offset + 4].copy_from_slice(&shade(x, y));
            }
        }
        Self {
            width: size,
            height: size,
            rgba,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }

    pub fn rgba_mut(&mut self) -> &mut [u8] {
        &mut self.rgba
    }
}

/// Face number to image lookup used by the compositor.
///
/// `overlay` asks for the companion overlay asset; `None` then simply means
/// the face has none. A base face that cannot be resolved is drawn with
/// [`FaceResolver::blocked_image`].
pub trait FaceResolver: Send {
    fn resolve_face(&mut self, face_num: u32, overlay: bool) -> Option<Arc<FaceImage>>;

    fn blocked_image(&mut self) -> Arc<FaceImage>;
}

#[derive(Debug, Default)]
pub struct ColorTileCache {
    tile_size: u32,
    tiles: HashMap<[u8; 4], Arc<FaceImage>>,
}

impl ColorTileCache {
    pub fn new(tile_size: u32) -> Self {
        Self {
            tile_size,
            tiles: HashMap::new(),
        }
    }

    pub fn get_or_create(&mut self, color: [u8; 4]) -> Arc<FaceImage> {
        let tile_size = self.tile_size;
        Arc::clone(
            self.tiles
                .entry(color)
                .or_insert_with(|| Arc::new(FaceImage::diamond(tile_size, color))),
        )
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

#[derive(Debug)]
pub struct SolidColorFaces {
    tile_size: u32,
    overlay_faces: HashSet<u32>,
    missing_faces: HashSet<u32>,
    images: HashMap<(u32, bool), Arc<FaceImage>>,
    blocked: Option<Arc<FaceImage>>,
}

impl SolidColorFaces {
    pub fn new(tile_size: u32) -> Self {
        Self {
            tile_size,
            overlay_faces: HashSet::new(),
            missing_faces: HashSet::new(),
            images: HashMap::new(),
            blocked: None,
        }
    }

    pub fn with_overlay(mut self, face_num: u32) -> Self {
        self.overlay_faces.insert(face_num);
        self
    }

    pub fn with_missing(mut self, face_num: u32) -> Self {
        self.missing_faces.insert(face_num);
        self
    }

    pub fn face_color(face_num: u32) -> [u8; 4] {
        let mixed = face_num.wrapping_mul(0x9e37_79b9).rotate_left(7);
        [
            64 + (mixed & 0x7f) as u8,
            64 + ((mixed >> 8) & 0x7f) as u8,
            64 + ((mixed >> 16) & 0x7f) as u8,
            255,
        ]
    }

    pub fn overlay_color(face_num: u32) -> [u8; 4] {
        let [r, g, b, _] = Self::face_color(face_num);
        [r / 2, g / 2, b / 2, 255]
    }
}

impl FaceResolver for SolidColorFaces {
    fn resolve_face(&mut self, face_num: u32, overlay: bool) -> Option<Arc<FaceImage>> {
        if self.missing_faces.contains(&face_num) {
            return None;
        }
        if overlay && !self.overlay_faces.contains(&face_num) {
            return None;
        }
        let tile_size = self.tile_size;
        let image = self.images.entry((face_num, overlay)).or_insert_with(|| {
            let color = if overlay {
                Self::overlay_color(face_num)
            } else {
                Self::face_color(face_num)
            };
            Arc::new(FaceImage::diamond(tile_size, color))
        });
        Some(Arc::clone(image))
    }

    fn blocked_image(&mut self) -> Arc<FaceImage> {
        let tile_size = self.tile_size;
        Arc::clone(
            self.blocked
                .get_or_insert_with(|| Arc::new(blocked_pattern(tile_size))),
        )
    }
}

pub const BLOCKED_DARK: [u8; 4] = [40, 12, 16, 255];
pub const BLOCKED_LIGHT: [u8; 4] = [150, 40, 52, 255];

pub fn blocked_pattern(tile_size: u32) -> FaceImage {
    let stripe = (tile_size / 4).max(1);
    FaceImage::diamond_with(tile_size, |x, y| {
        if ((x + y) / stripe) % 2 == 0 {
            BLOCKED_DARK
        } else {
            BLOCKED_LIGHT
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_rgba_checks_the_buffer_length() {
        assert!(FaceImage::from_rgba(2, 2, vec![0; 16]).is_some());
        assert!(FaceImage::from_rgba(2, 2, vec![0; 15]).is_none());
    }

    #[test]
    fn diamond_is_transparent_in_the_corners() {
        let image = FaceImage::diamond(4, [1, 2, 3, 255]);
        assert_eq!((image.width(), image.height()), (8, 8));
        let at = |x: usize, y: usize| &image.rgba()[(y * 8 + x) * 4..(y * 8 + x) * 4 + 4];
        assert_eq!(at(0, 0), &[0, 0, 0, 0]);
        assert_eq!(at(7, 7), &[0, 0, 0, 0]);
        assert_eq!(at(4, 4), &[1, 2, 3, 255]);
    }

    #[test]
    fn color_tile_cache_reuses_tiles() {
        let mut cache = ColorTileCache::new(4);
        let first = cache.get_or_create([0, 0, 0, 100]);
        let second = cache.get_or_create([0, 0, 0, 100]);
        assert!(Arc::ptr_eq(&first, &second));
        cache.get_or_create([0, 0, 0, 50]);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn solid_faces_resolve_overlays_only_when_declared() {
        let mut faces = SolidColorFaces::new(4).with_overlay(7).with_missing(9);
        assert!(faces.resolve_face(3, false).is_some());
        assert!(faces.resolve_face(3, true).is_none());
        assert!(faces.resolve_face(7, true).is_some());
        assert!(faces.resolve_face(9, false).is_none());
        assert_ne!(
            faces.resolve_face(7, false).expect("base"),
            faces.resolve_face(7, true).expect("overlay")
        );
    }

    #[test]
    fn blocked_image_is_built_once() {
        let mut faces = SolidColorFaces::new(4);
        let first = faces.blocked_image();
        assert!(Arc::ptr_eq(&first, &faces.blocked_image()));
        assert!(first.rgba().chunks_exact(4).any(|px| px == BLOCKED_LIGHT));
    }
}
