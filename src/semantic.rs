//! Semantic layer records built from feature properties.
//!
//! Each layer reads a fixed set of optional properties. A property that is
//! absent or `null` takes the layer's default. QGIS attribute tables often
//! hold integers where text or booleans are meant, so scalars are coerced to
//! the field's type; a value that cannot be coerced is logged and replaced by
//! the default. Property types never fail a run.

use geojson::JsonObject;
use serde_json::Value;
use tracing::warn;

use crate::model::{
    generate_token, DividerSegment, Lane, LaneDivider, PedCrossing, RoadDivider, RoadSegment,
    SemanticEntry, SemanticLayer,
};
use crate::parser::InputCollection;

const UNUSED: &str = "unused";
const DEFAULT_SEGMENT_TYPE: &str = "DOUBLE_DASHED_WHITE";
const DEFAULT_LANE_TYPE: &str = "CAR";

/// Picks the semantic layer for a whole collection from its `name`.
/// `None` means "unknown": the collection contributes geometry only.
pub fn extract_semantics(collection: &InputCollection) -> Option<SemanticLayer> {
    collection.name.as_deref().and_then(SemanticLayer::from_name)
}

/// Typed view over one feature's property bag.
struct PropertyReader<'a> {
    layer: SemanticLayer,
    feature_index: usize,
    properties: &'a JsonObject,
}

impl PropertyReader<'_> {
    fn read<T>(&self, key: &str, default: T, coerce: impl FnOnce(&Value) -> Option<T>) -> T {
        match self.properties.get(key) {
            None | Some(Value::Null) => default,
            Some(value) => coerce(value).unwrap_or_else(|| {
                warn!(
                    "Feature {} ({}): property `{}` has unusable value {}, using the default",
                    self.feature_index, self.layer, key, value
                );
                default
            }),
        }
    }

    fn string(&self, key: &str, default: String) -> String {
        self.read(key, default, scalar_text)
    }

    fn optional_string(&self, key: &str) -> Option<String> {
        self.read(key, None, |value| scalar_text(value).map(Some))
    }

    fn boolean(&self, key: &str, default: bool) -> bool {
        self.read(key, default, truthy)
    }

    fn string_list(&self, key: &str, default: Vec<String>) -> Vec<String> {
        self.read(key, default, text_list)
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn truthy(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::Number(number) => number.as_f64().map(|n| n != 0.0),
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "yes" | "y" | "1" => Some(true),
            "false" | "f" | "no" | "n" | "0" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// A list of scalars, or a single scalar standing for a one-element list.
fn text_list(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => items.iter().map(scalar_text).collect(),
        other => scalar_text(other).map(|text| vec![text]),
    }
}

#[derive(Debug, Default)]
struct PedCrossingProperties {
    road_segment_token: Option<String>,
}

impl PedCrossingProperties {
    fn read(reader: &PropertyReader) -> Self {
        Self {
            road_segment_token: reader.optional_string("road_segment_token"),
        }
    }
}

#[derive(Debug, Default)]
struct RoadSegmentProperties {
    is_intersection: bool,
    drivable_area_token: String,
}

impl RoadSegmentProperties {
    fn read(reader: &PropertyReader) -> Self {
        let defaults = Self::default();
        Self {
            is_intersection: reader.boolean("is_intersection", defaults.is_intersection),
            drivable_area_token: reader
                .string("drivable_area_token", defaults.drivable_area_token),
        }
    }
}

#[derive(Debug)]
struct LaneProperties {
    lane_type: String,
    from_edge_line_token: String,
    to_edge_line_token: String,
    left_divider_node_tokens: Vec<String>,
    right_divider_node_tokens: Vec<String>,
    left_segment_type: String,
    right_segment_type: String,
}

impl Default for LaneProperties {
    fn default() -> Self {
        Self {
            lane_type: DEFAULT_LANE_TYPE.to_string(),
            from_edge_line_token: UNUSED.to_string(),
            to_edge_line_token: UNUSED.to_string(),
            left_divider_node_tokens: vec![UNUSED.to_string(); 4],
            right_divider_node_tokens: vec![UNUSED.to_string()],
            left_segment_type: DEFAULT_SEGMENT_TYPE.to_string(),
            right_segment_type: DEFAULT_SEGMENT_TYPE.to_string(),
        }
    }
}

impl LaneProperties {
    fn read(reader: &PropertyReader) -> Self {
        let defaults = Self::default();
        Self {
            lane_type: reader.string("lane_type", defaults.lane_type),
            from_edge_line_token: reader
                .string("from_edge_line_token", defaults.from_edge_line_token),
            to_edge_line_token: reader.string("to_edge_line_token", defaults.to_edge_line_token),
            left_divider_node_tokens: reader
                .string_list("left_divider_node_tokens", defaults.left_divider_node_tokens),
            right_divider_node_tokens: reader
                .string_list("right_divider_node_tokens", defaults.right_divider_node_tokens),
            left_segment_type: reader.string("left_segment_type", defaults.left_segment_type),
            right_segment_type: reader.string("right_segment_type", defaults.right_segment_type),
        }
    }
}

#[derive(Debug)]
struct RoadDividerProperties {
    line_token: String,
    road_segment_token: Option<String>,
}

impl Default for RoadDividerProperties {
    fn default() -> Self {
        Self {
            line_token: UNUSED.to_string(),
            road_segment_token: None,
        }
    }
}

impl RoadDividerProperties {
    fn read(reader: &PropertyReader) -> Self {
        let defaults = Self::default();
        Self {
            line_token: reader.string("line_token", defaults.line_token),
            road_segment_token: reader.optional_string("road_segment_token"),
        }
    }
}

#[derive(Debug)]
struct LaneDividerProperties {
    line_token: String,
    divider_node_token: String,
    segment_type: String,
}

impl Default for LaneDividerProperties {
    fn default() -> Self {
        Self {
            line_token: UNUSED.to_string(),
            divider_node_token: UNUSED.to_string(),
            segment_type: DEFAULT_SEGMENT_TYPE.to_string(),
        }
    }
}

impl LaneDividerProperties {
    fn read(reader: &PropertyReader) -> Self {
        let defaults = Self::default();
        Self {
            line_token: reader.string("line_token", defaults.line_token),
            divider_node_token: reader.string("divider_node_token", defaults.divider_node_token),
            segment_type: reader.string("segment_type", defaults.segment_type),
        }
    }
}

fn segments(node_tokens: Vec<String>, segment_type: &str) -> Vec<DividerSegment> {
    node_tokens
        .into_iter()
        .map(|node_token| DividerSegment {
            node_token,
            segment_type: segment_type.to_string(),
        })
        .collect()
}

/// Builds the semantic record for polygon feature `feature_index`, whose
/// polygon token is `polygon_token`.
pub fn build_entry(
    layer: SemanticLayer,
    feature_index: usize,
    polygon_token: &str,
    properties: &JsonObject,
) -> SemanticEntry {
    let reader = PropertyReader {
        layer,
        feature_index,
        properties,
    };
    let token = generate_token();
    let polygon_token = polygon_token.to_string();

    match layer {
        SemanticLayer::PedCrossing => {
            let props = PedCrossingProperties::read(&reader);
            SemanticEntry::PedCrossing(PedCrossing {
                token,
                polygon_token,
                road_segment_token: props.road_segment_token,
            })
        }
        SemanticLayer::RoadSegment => {
            let props = RoadSegmentProperties::read(&reader);
            SemanticEntry::RoadSegment(RoadSegment {
                token,
                polygon_token,
                is_intersection: props.is_intersection,
                drivable_area_token: props.drivable_area_token,
            })
        }
        SemanticLayer::Lane => {
            let props = LaneProperties::read(&reader);
            SemanticEntry::Lane(Lane {
                token,
                polygon_token,
                lane_type: props.lane_type,
                from_edge_line_token: props.from_edge_line_token,
                to_edge_line_token: props.to_edge_line_token,
                left_lane_divider_segments: segments(
                    props.left_divider_node_tokens,
                    &props.left_segment_type,
                ),
                right_lane_divider_segments: segments(
                    props.right_divider_node_tokens,
                    &props.right_segment_type,
                ),
            })
        }
        SemanticLayer::RoadDivider => {
            let props = RoadDividerProperties::read(&reader);
            SemanticEntry::RoadDivider(RoadDivider {
                token,
                line_token: props.line_token,
                road_segment_token: props.road_segment_token,
            })
        }
        SemanticLayer::LaneDivider => {
            let props = LaneDividerProperties::read(&reader);
            SemanticEntry::LaneDivider(LaneDivider {
                token,
                line_token: props.line_token,
                lane_divider_segments: segments(
                    vec![props.divider_node_token],
                    &props.segment_type,
                ),
            })
        }
    }
}
