use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use isomap::RenderConfig;
use serde::Deserialize;
use thiserror::Error;

pub(crate) const CONFIG_ENV_VAR: &str = "ISOMAP_CONFIG";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ViewerConfig {
    pub(crate) window_title: String,
    pub(crate) window_width: u32,
    pub(crate) window_height: u32,
    pub(crate) map_width: i32,
    pub(crate) map_height: i32,
    pub(crate) feed_tick_ms: u64,
    /// Ticks between two scroll steps of the demo feed; 0 never scrolls.
    pub(crate) scroll_every_ticks: u64,
    pub(crate) asset_root: Option<PathBuf>,
    pub(crate) snapshot_dir: PathBuf,
    pub(crate) render: RenderConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            window_title: "isomap viewer".to_string(),
            window_width: 1024,
            window_height: 768,
            map_width: 17,
            map_height: 17,
            feed_tick_ms: 120,
            scroll_every_ticks: 8,
            asset_root: None,
            snapshot_dir: PathBuf::from("snapshots"),
            render: RenderConfig::default(),
        }
    }
}

impl ViewerConfig {
    pub(crate) fn feed_tick(&self) -> Duration {
        Duration::from_millis(self.feed_tick_ms.max(1))
    }
}

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path} at {field}: {source}")]
    Parse {
        path: PathBuf,
        field: String,
        #[source]
        source: serde_json::Error,
    },
}

pub(crate) fn load_viewer_config() -> Result<ViewerConfig, ConfigError> {
    match env::var(CONFIG_ENV_VAR) {
        Ok(value) => load_config_file(Path::new(&value)),
        Err(env::VarError::NotPresent) => Ok(ViewerConfig::default()),
        Err(source) => Err(ConfigError::EnvVar {
            var: CONFIG_ENV_VAR,
            source,
        }),
    }
}

pub(crate) fn load_config_file(path: &Path) -> Result<ViewerConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(path, &raw)
}

fn parse_config(path: &Path, raw: &str) -> Result<ViewerConfig, ConfigError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, ViewerConfig>(&mut deserializer).map_err(|error| {
        let field = error.path().to_string();
        ConfigError::Parse {
            path: path.to_path_buf(),
            field: if field.is_empty() { ".".to_string() } else { field },
            source: error.into_inner(),
        }
    })
}

#[cfg(test)]
mod tests {
    use isomap::CoverageMode;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config = parse_config(
            Path::new("viewer.json"),
            r#"{ "map_width": 11, "render": { "coverage_mode": "partial" } }"#,
        )
        .expect("config");
        assert_eq!(config.map_width, 11);
        assert_eq!(config.map_height, ViewerConfig::default().map_height);
        assert_eq!(config.render.coverage_mode, CoverageMode::Partial);
        assert_eq!(config.render.tile_size, isomap::DEFAULT_TILE_SIZE);
    }

    #[test]
    fn parse_errors_name_the_field() {
        let err = parse_config(
            Path::new("viewer.json"),
            r#"{ "render": { "coverage_mode": "sideways" } }"#,
        )
        .expect_err("err");
        match err {
            ConfigError::Parse { field, .. } => assert_eq!(field, "render.coverage_mode"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(parse_config(Path::new("viewer.json"), r#"{ "window": 3 }"#).is_err());
    }

    #[test]
    fn config_file_is_read_from_disk() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("viewer.json");
        assert!(matches!(
            load_config_file(&path),
            Err(ConfigError::Read { .. })
        ));
        fs::write(&path, r#"{ "feed_tick_ms": 0 }"#).expect("write");
        let config = load_config_file(&path).expect("config");
        assert_eq!(config.feed_tick(), Duration::from_millis(1));
    }
}
