use std::path::PathBuf;

use serde_json::Value;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("GeoJSON parse error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("map metadata parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to read image dimensions from {path:?}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("input is not a FeatureCollection")]
    NotAFeatureCollection,

    #[error("invalid map metadata: {0}")]
    InvalidMetadata(String),

    /// Two runs disagree on the canvas size, which means a different map image or resolution.
    #[error("canvas edge mismatch: existing {existing} vs new {incoming}")]
    CanvasEdgeMismatch { existing: Value, incoming: Value },

    #[error("existing map document has a non-list `{key}` entry")]
    NotAList { key: String },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
