use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::info;

use crate::error::{Error, Result};

fn default_occupied_thresh() -> f64 {
    0.65
}

fn default_free_thresh() -> f64 {
    0.196
}

/// ROS map_server style metadata that accompanies the raster the
/// annotations were drawn on.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MapMetadata {
    /// Raster file, relative to the YAML file unless absolute.
    pub image: PathBuf,
    /// Meters per pixel.
    pub resolution: f64,
    /// `[x, y, yaw]` of the map origin; only x and y are used.
    pub origin: [f64; 3],
    #[serde(default)]
    pub negate: i32,
    #[serde(default = "default_occupied_thresh")]
    pub occupied_thresh: f64,
    #[serde(default = "default_free_thresh")]
    pub free_thresh: f64,
}

impl MapMetadata {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let metadata: MapMetadata = serde_yaml::from_str(content)?;
        metadata.validate()?;
        Ok(metadata)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let mut metadata = Self::from_yaml_str(&content)?;
        if metadata.image.is_relative() {
            if let Some(dir) = path.parent() {
                metadata.image = dir.join(&metadata.image);
            }
        }
        info!("Loaded map metadata {:?}: {}", path, metadata);
        Ok(metadata)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.resolution.is_finite() && self.resolution > 0.0) {
            return Err(Error::InvalidMetadata(format!(
                "resolution must be a positive number, got {}",
                self.resolution
            )));
        }
        Ok(())
    }

    /// Reads the pixel size of `image` from its header.
    pub fn image_dimensions(&self) -> Result<(u32, u32)> {
        image::image_dimensions(&self.image).map_err(|source| Error::Image {
            path: self.image.clone(),
            source,
        })
    }

    pub fn frame(&self, image_width: u32, image_height: u32) -> MapFrame {
        MapFrame {
            resolution: self.resolution,
            origin: self.origin,
            image_width,
            image_height,
        }
    }

    /// Builds the frame using the dimensions of the referenced raster.
    pub fn load_frame(&self) -> Result<MapFrame> {
        let (width, height) = self.image_dimensions()?;
        Ok(self.frame(width, height))
    }
}

impl fmt::Display for MapMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "image={:?}, resolution={}, origin={:?}, negate={}, occupied_thresh={}, free_thresh={}",
            self.image,
            self.resolution,
            self.origin,
            self.negate,
            self.occupied_thresh,
            self.free_thresh
        )
    }
}

/// Everything a conversion run needs to know about the target map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapFrame {
    pub resolution: f64,
    pub origin: [f64; 3],
    pub image_width: u32,
    pub image_height: u32,
}

impl MapFrame {
    /// Canvas extent at the fixed 1:10 display scale, independent of `resolution`.
    pub fn canvas_edge(&self) -> [f64; 2] {
        [
            f64::from(self.image_width) / 10.0,
            f64::from(self.image_height) / 10.0,
        ]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Run interior polygon rings through the coordinate transform as well.
    /// Off by default, which registers hole vertices in raw pixel space.
    pub transform_holes: bool,
}
