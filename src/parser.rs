//! GeoJSON input as exported from QGIS.
//!
//! A layer exported from QGIS is a `FeatureCollection` whose `name` member
//! carries the layer name; that name decides the semantic layer of every
//! feature in the file.

use std::fs;
use std::path::Path;

use geojson::{Feature, GeoJson, JsonObject, Position, Value};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// A planar coordinate in QGIS pixel space.
pub type Coord = [f64; 2];

#[derive(Debug, Clone, PartialEq)]
pub enum InputGeometry {
    Point(Coord),
    LineString(Vec<Coord>),
    Polygon {
        exterior: Vec<Coord>,
        interiors: Vec<Vec<Coord>>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputFeature {
    /// Position of the feature in the source collection.
    pub index: usize,
    pub geometry: InputGeometry,
    pub properties: JsonObject,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputCollection {
    pub name: Option<String>,
    pub features: Vec<InputFeature>,
}

pub fn load_collection(path: &Path) -> Result<InputCollection> {
    let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    parse_collection(&content)
}

pub fn parse_collection(content: &str) -> Result<InputCollection> {
    let collection = match content.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(collection) => collection,
        _ => return Err(Error::NotAFeatureCollection),
    };

    let name = collection
        .foreign_members
        .as_ref()
        .and_then(|members| members.get("name"))
        .and_then(|name| name.as_str())
        .map(str::to_string);

    let total = collection.features.len();
    let features: Vec<InputFeature> = collection
        .features
        .into_iter()
        .enumerate()
        .filter_map(|(index, feature)| convert_feature(index, feature))
        .collect();

    debug!(
        "Parsed collection {:?}: {} of {} features usable",
        name,
        features.len(),
        total
    );

    Ok(InputCollection { name, features })
}

fn convert_feature(index: usize, feature: Feature) -> Option<InputFeature> {
    let properties = feature.properties.unwrap_or_default();
    let Some(geometry) = feature.geometry else {
        warn!("Feature {} has no geometry, skipping", index);
        return None;
    };

    let geometry = match geometry.value {
        Value::Point(position) => match to_coord(&position) {
            Some(coord) => InputGeometry::Point(coord),
            None => {
                warn!("Feature {} has a malformed point, skipping", index);
                return None;
            }
        },
        Value::LineString(positions) => InputGeometry::LineString(to_coords(index, &positions)),
        Value::Polygon(rings) => {
            let mut rings = rings.iter().map(|ring| to_coords(index, ring));
            let exterior = rings.next().unwrap_or_default();
            InputGeometry::Polygon {
                exterior,
                interiors: rings.collect(),
            }
        }
        Value::MultiPoint(_)
        | Value::MultiLineString(_)
        | Value::MultiPolygon(_)
        | Value::GeometryCollection(_) => {
            warn!("Feature {} has an unsupported geometry type, skipping", index);
            return None;
        }
    };

    Some(InputFeature {
        index,
        geometry,
        properties,
    })
}

fn to_coord(position: &Position) -> Option<Coord> {
    match position.as_slice() {
        [x, y, ..] => Some([*x, *y]),
        _ => None,
    }
}

fn to_coords(index: usize, positions: &[Position]) -> Vec<Coord> {
    positions
        .iter()
        .filter_map(|position| {
            let coord = to_coord(position);
            if coord.is_none() {
                warn!("Feature {} has a malformed position {:?}, dropping it", index, position);
            }
            coord
        })
        .collect()
}
