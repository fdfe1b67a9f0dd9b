use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// Generates a fresh random (v4) UUID token.
pub fn generate_token() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// The semantic map layers an input collection can be tagged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SemanticLayer {
    RoadDivider,
    LaneDivider,
    RoadSegment,
    Lane,
    PedCrossing,
}

impl SemanticLayer {
    pub const ALL: [SemanticLayer; 5] = [
        SemanticLayer::RoadDivider,
        SemanticLayer::LaneDivider,
        SemanticLayer::RoadSegment,
        SemanticLayer::Lane,
        SemanticLayer::PedCrossing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SemanticLayer::RoadDivider => "road_divider",
            SemanticLayer::LaneDivider => "lane_divider",
            SemanticLayer::RoadSegment => "road_segment",
            SemanticLayer::Lane => "lane",
            SemanticLayer::PedCrossing => "ped_crossing",
        }
    }

    /// Exact, case-sensitive match against the layer names.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|layer| layer.as_str() == name)
    }
}

impl fmt::Display for SemanticLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub token: String,
    pub x: f64,
    pub y: f64,
}

/// A polyline reduced to its two endpoint nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub token: String,
    pub node_tokens: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub token: String,
    pub exterior_node_tokens: Vec<String>,
    pub holes: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DividerSegment {
    pub node_token: String,
    pub segment_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadDivider {
    pub token: String,
    pub line_token: String,
    pub road_segment_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaneDivider {
    pub token: String,
    pub line_token: String,
    pub lane_divider_segments: Vec<DividerSegment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadSegment {
    pub token: String,
    pub polygon_token: String,
    pub is_intersection: bool,
    pub drivable_area_token: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lane {
    pub token: String,
    pub polygon_token: String,
    pub lane_type: String,
    pub from_edge_line_token: String,
    pub to_edge_line_token: String,
    pub left_lane_divider_segments: Vec<DividerSegment>,
    pub right_lane_divider_segments: Vec<DividerSegment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PedCrossing {
    pub token: String,
    pub polygon_token: String,
    pub road_segment_token: Option<String>,
}

/// One record destined for a semantic layer list.
#[derive(Debug, Clone, PartialEq)]
pub enum SemanticEntry {
    RoadDivider(RoadDivider),
    LaneDivider(LaneDivider),
    RoadSegment(RoadSegment),
    Lane(Lane),
    PedCrossing(PedCrossing),
}

impl SemanticEntry {
    pub fn layer(&self) -> SemanticLayer {
        match self {
            SemanticEntry::RoadDivider(_) => SemanticLayer::RoadDivider,
            SemanticEntry::LaneDivider(_) => SemanticLayer::LaneDivider,
            SemanticEntry::RoadSegment(_) => SemanticLayer::RoadSegment,
            SemanticEntry::Lane(_) => SemanticLayer::Lane,
            SemanticEntry::PedCrossing(_) => SemanticLayer::PedCrossing,
        }
    }
}

/// An untyped map document, as read from or written to disk.
///
/// Merging works at this level so that records and keys written by other
/// tools or older runs pass through exactly as they were.
pub type MapDocument = Map<String, Value>;

/// The list keys every document carries, in output order.
pub const GEOMETRY_KEYS: [&str; 3] = ["node", "line", "polygon"];

/// The document produced by a single conversion run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NuScenesMap {
    #[serde(default)]
    pub node: Vec<Node>,
    #[serde(default)]
    pub line: Vec<Line>,
    #[serde(default)]
    pub polygon: Vec<Polygon>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub road_divider: Vec<RoadDivider>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lane_divider: Vec<LaneDivider>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub road_segment: Vec<RoadSegment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lane: Vec<Lane>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ped_crossing: Vec<PedCrossing>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canvas_edge: Option<[f64; 2]>,
}

impl NuScenesMap {
    pub fn push_semantic(&mut self, entry: SemanticEntry) {
        match entry {
            SemanticEntry::RoadDivider(e) => self.road_divider.push(e),
            SemanticEntry::LaneDivider(e) => self.lane_divider.push(e),
            SemanticEntry::RoadSegment(e) => self.road_segment.push(e),
            SemanticEntry::Lane(e) => self.lane.push(e),
            SemanticEntry::PedCrossing(e) => self.ped_crossing.push(e),
        }
    }

    pub fn semantic_len(&self, layer: SemanticLayer) -> usize {
        match layer {
            SemanticLayer::RoadDivider => self.road_divider.len(),
            SemanticLayer::LaneDivider => self.lane_divider.len(),
            SemanticLayer::RoadSegment => self.road_segment.len(),
            SemanticLayer::Lane => self.lane.len(),
            SemanticLayer::PedCrossing => self.ped_crossing.len(),
        }
    }

    pub fn counts(&self) -> MapCounts {
        MapCounts {
            nodes: self.node.len(),
            lines: self.line.len(),
            polygons: self.polygon.len(),
            semantic_entries: SemanticLayer::ALL
                .iter()
                .map(|layer| self.semantic_len(*layer))
                .sum(),
        }
    }

    pub fn to_document(&self) -> Result<MapDocument> {
        Ok(serde_json::from_value(serde_json::to_value(self)?)?)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MapCounts {
    pub nodes: usize,
    pub lines: usize,
    pub polygons: usize,
    pub semantic_entries: usize,
}

impl MapCounts {
    /// Counts the list entries of an untyped document. Missing or non-list
    /// keys count as empty.
    pub fn of_document(document: &MapDocument) -> Self {
        let len = |key: &str| document.get(key).and_then(Value::as_array).map_or(0, Vec::len);
        MapCounts {
            nodes: len("node"),
            lines: len("line"),
            polygons: len("polygon"),
            semantic_entries: SemanticLayer::ALL.iter().map(|layer| len(layer.as_str())).sum(),
        }
    }
}

impl fmt::Display for MapCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} nodes, {} lines, {} polygons, {} semantic entries",
            self.nodes, self.lines, self.polygons, self.semantic_entries
        )
    }
}
