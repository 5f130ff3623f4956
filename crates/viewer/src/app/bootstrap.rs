use isomap::{FaceCache, FaceManifest, FaceManifestError, FaceResolver, SolidColorFaces};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::config::{load_viewer_config, ConfigError, ViewerConfig};
use super::demo_feed::palette;

pub(crate) struct AppWiring {
    pub(crate) config: ViewerConfig,
    pub(crate) faces: Box<dyn FaceResolver>,
    pub(crate) manifest: Option<FaceManifest>,
}

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to load face manifest: {0}")]
    FaceManifest(#[from] FaceManifestError),
}

pub(crate) fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

pub(crate) fn build_app() -> Result<AppWiring, BootstrapError> {
    let config = load_viewer_config()?;
    let (faces, manifest) = build_faces(&config)?;
    info!(
        window_width = config.window_width,
        window_height = config.window_height,
        tile_size = config.render.tile_size(),
        assets = manifest.is_some(),
        "startup"
    );
    Ok(AppWiring {
        config,
        faces,
        manifest,
    })
}

fn build_faces(
    config: &ViewerConfig,
) -> Result<(Box<dyn FaceResolver>, Option<FaceManifest>), FaceManifestError> {
    match &config.asset_root {
        Some(asset_root) => {
            let cache = FaceCache::open(asset_root, &config.render)?;
            let manifest = cache.manifest().clone();
            let faces: Box<dyn FaceResolver> = Box::new(cache);
            Ok((faces, Some(manifest)))
        }
        None => {
            let faces = palette::WITH_OVERLAY
                .iter()
                .fold(SolidColorFaces::new(config.render.tile_size()), |faces, num| {
                    faces.with_overlay(*num)
                });
            info!("procedural_faces");
            let faces: Box<dyn FaceResolver> = Box::new(faces);
            Ok((faces, None))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn procedural_faces_carry_overlays_for_tall_objects() {
        let (mut faces, manifest) = build_faces(&ViewerConfig::default()).expect("faces");
        assert!(manifest.is_none());
        assert!(faces.resolve_face(palette::TREE, true).is_some());
        assert!(faces.resolve_face(palette::GRASS, true).is_none());
        assert!(faces.resolve_face(palette::GRASS, false).is_some());
    }

    #[test]
    fn asset_root_loads_the_manifest() {
        let temp = TempDir::new().expect("temp");
        let config = ViewerConfig {
            asset_root: Some(temp.path().to_path_buf()),
            ..ViewerConfig::default()
        };
        assert!(build_faces(&config).is_err());

        fs::write(
            temp.path().join("faces.xml"),
            r#"<Faces><Face num="1" key="grass"/><Face num="2" key="dirt"/></Faces>"#,
        )
        .expect("write");
        let (_, manifest) = build_faces(&config).expect("faces");
        assert_eq!(manifest.expect("manifest").len(), 2);
    }
}
