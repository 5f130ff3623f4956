use std::fs;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbaImage};
use thiserror::Error;

use super::frame::FrameBuffer;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("frame buffer does not match its {width}x{height} size")]
    InvalidBuffer { width: u32, height: u32 },
    #[error("failed to encode frame as PNG: {0}")]
    Encode(#[from] image::ImageError),
    #[error("failed to write snapshot {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub fn encode_png(frame: &FrameBuffer) -> Result<Vec<u8>, SnapshotError> {
    let (width, height) = (frame.width(), frame.height());
    let image = RgbaImage::from_raw(width, height, frame.rgba().to_vec())
        .ok_or(SnapshotError::InvalidBuffer { width, height })?;
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, ImageFormat::Png)?;
    Ok(bytes.into_inner())
}

pub fn write_png_snapshot(path: &Path, frame: &FrameBuffer) -> Result<(), SnapshotError> {
    let bytes = encode_png(frame)?;
    write_bytes_atomic(path, &bytes).map_err(|source| SnapshotError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn write_bytes_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = temp_path_for(path);
    fs::write(&tmp_path, bytes)?;
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(error) if error.kind() == io::ErrorKind::NotFound => {}
        Err(error) => {
            let _ = fs::remove_file(&tmp_path);
            return Err(error);
        }
    }
    if let Err(error) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(error);
    }
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("snapshot.png");
    path.with_file_name(format!("{file_name}.tmp"))
}
