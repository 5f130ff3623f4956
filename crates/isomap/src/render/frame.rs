use sha2::{Digest, Sha256};

use super::faces::FaceImage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl FrameBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            rgba: vec![0; width as usize * height as usize * 4],
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        *self = Self::new(width, height);
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

    pub fn pixel(&self, x: i32, y: i32) -> Option<[u8; 4]> {
        let offset = self.byte_offset(x, y)?;
        let mut color = [0u8; 4];
        color.copy_from_slice(&self.rgba[offset..offset + 4]);
        Some(color)
    }

    pub fn fill(&mut self, color: [u8; 4]) {
        for chunk in self.rgba.chunks_exact_mut(4) {
            chunk.copy_from_slice(&color);
        }
    }

    pub fn fill_rect(&mut self, left: i32, top: i32, width: i32, height: i32, color: [u8; 4]) {
        let Some((x0, y0, x1, y1)) = self.clip(left, top, width, height) else {
            return;
        };
        let frame_width = self.width as usize;
        for y in y0..y1 {
            let row = (y * frame_width + x0) * 4..(y * frame_width + x1) * 4;
            for chunk in self.rgba[row].chunks_exact_mut(4) {
                chunk.copy_from_slice(&color);
            }
        }
    }

    pub fn blit_region(
        &mut self,
        image: &FaceImage,
        src_x: i32,
        src_y: i32,
        size: i32,
        dst_x: i32,
        dst_y: i32,
    ) -> bool {
        if src_x < 0 || src_y < 0 {
            return false;
        }
        let src_w = (image.width() as i32 - src_x).min(size);
        let src_h = (image.height() as i32 - src_y).min(size);
        let Some((x0, y0, x1, y1)) = self.clip(dst_x, dst_y, src_w, src_h) else {
            return false;
        };
        let frame_width = self.width as usize;
        let image_width = image.width() as usize;
        let src = image.rgba();
        for y in y0..y1 {
            let sy = (y as i32 - dst_y + src_y) as usize;
            for x in x0..x1 {
                let sx = (x as i32 - dst_x + src_x) as usize;
                let src_offset = (sy * image_width + sx) * 4;
                let Some(source) = src.get(src_offset..src_offset + 4) else {
                    continue;
                };
                let dst_offset = (y * frame_width + x) * 4;
                blend_over(&mut self.rgba[dst_offset..dst_offset + 4], source);
            }
        }
        true
    }

    pub fn digest_hex(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.width.to_le_bytes());
        hasher.update(self.height.to_le_bytes());
        hasher.update(&self.rgba);
        to_hex_lower(&hasher.finalize())
    }

    fn byte_offset(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return None;
        }
        let pixel = (y as usize).checked_mul(self.width as usize)?.checked_add(x as usize)?;
        pixel.checked_mul(4)
    }

    fn clip(&self, left: i32, top: i32, width: i32, height: i32) -> Option<(usize, usize, usize, usize)> {
        if width <= 0 || height <= 0 {
            return None;
        }
        let x0 = left.max(0);
        let y0 = top.max(0);
        let x1 = left.saturating_add(width).min(self.width as i32);
        let y1 = top.saturating_add(height).min(self.height as i32);
        if x0 >= x1 || y0 >= y1 {
            return None;
        }
        Some((x0 as usize, y0 as usize, x1 as usize, y1 as usize))
    }
}

fn blend_over(dst: &mut [u8], src: &[u8]) {
    let alpha = src[3] as u32;
    match alpha {
        0 => {}
        255 => dst.copy_from_slice(src),
        _ => {
            let inverse = 255 - alpha;
            for channel in 0..3 {
                let mixed = src[channel] as u32 * alpha + dst[channel] as u32 * inverse;
                dst[channel] = ((mixed + 127) / 255) as u8;
            }
            dst[3] = (alpha + dst[3] as u32 * inverse / 255).min(255) as u8;
        }
    }
}

fn to_hex_lower(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}
