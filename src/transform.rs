use crate::config::MapFrame;

/// Maps QGIS pixel coordinates (top-left origin, y down) into the metric map
/// frame (bottom-left origin, y up, relative to the map origin).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateTransformer {
    resolution: f64,
    origin_x: f64,
    origin_y: f64,
    image_height: f64,
}

impl CoordinateTransformer {
    pub fn new(resolution: f64, origin: [f64; 3], image_height: u32) -> Self {
        Self {
            resolution,
            origin_x: origin[0],
            origin_y: origin[1],
            image_height: f64::from(image_height),
        }
    }

    pub fn from_frame(frame: &MapFrame) -> Self {
        Self::new(frame.resolution, frame.origin, frame.image_height)
    }

    /// QGIS exports raster-space y as a negative offset below the top edge,
    /// so the flip is an addition.
    pub fn transform(&self, x_pixel: f64, y_pixel: f64) -> [f64; 2] {
        let y_flipped = self.image_height + y_pixel;

        let x_m = x_pixel * self.resolution;
        let y_m = y_flipped * self.resolution;

        [x_m - self.origin_x, y_m - self.origin_y]
    }
}
