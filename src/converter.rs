use geojson::JsonObject;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::{ConvertOptions, MapFrame};
use crate::model::{generate_token, Line, NuScenesMap, Polygon, SemanticLayer};
use crate::parser::{Coord, InputCollection, InputFeature, InputGeometry};
use crate::registry::NodeRegistry;
use crate::semantic::{build_entry, extract_semantics};
use crate::transform::CoordinateTransformer;

/// Decomposes the features of one run into nodes, lines, polygons and
/// semantic records.
///
/// A converter owns its node registry, so every run starts with an empty
/// dedup table. `assemble` consumes it.
#[derive(Debug)]
pub struct Converter {
    frame: MapFrame,
    options: ConvertOptions,
    transformer: CoordinateTransformer,
    registry: NodeRegistry,
    map: NuScenesMap,
}

/// The feature's own `token` property, or a fresh one. Numeric tokens keep
/// their JSON text, since QGIS exports integer id columns as numbers.
fn feature_token(index: usize, properties: &JsonObject) -> String {
    match properties.get("token") {
        Some(Value::String(token)) => token.clone(),
        Some(Value::Number(number)) => {
            debug!("Feature {} has numeric token {}, using it as text", index, number);
            number.to_string()
        }
        None | Some(Value::Null) => generate_token(),
        Some(other) => {
            warn!(
                "Feature {} has unusable token {}, generating a new one",
                index, other
            );
            generate_token()
        }
    }
}

impl Converter {
    pub fn new(frame: MapFrame, options: ConvertOptions) -> Self {
        Self {
            frame,
            options,
            transformer: CoordinateTransformer::from_frame(&frame),
            registry: NodeRegistry::new(),
            map: NuScenesMap::default(),
        }
    }

    /// Converts a whole collection in feature order and assembles the result.
    pub fn convert(mut self, collection: &InputCollection) -> NuScenesMap {
        let semantic_type = extract_semantics(collection);
        info!(
            "Semantic type determined from FeatureCollection name: {}",
            semantic_type.map_or("unknown", |layer| layer.as_str())
        );

        for feature in &collection.features {
            self.process(feature, semantic_type);
        }

        let map = self.assemble();
        info!("Converted collection: {}", map.counts());
        map
    }

    pub fn process(&mut self, feature: &InputFeature, semantic_type: Option<SemanticLayer>) {
        let token = feature_token(feature.index, &feature.properties);

        match &feature.geometry {
            InputGeometry::Point([x, y]) => {
                let [x, y] = self.transformer.transform(*x, *y);
                self.registry.insert(token, x, y);
            }
            InputGeometry::LineString(coords) => {
                let mut node_tokens = self.register_ring(coords, true);
                if node_tokens.len() >= 2 {
                    node_tokens.drain(1..node_tokens.len() - 1);
                    self.map.line.push(Line { token, node_tokens });
                } else {
                    debug!(
                        "Feature {} has fewer than 2 vertices, no line emitted",
                        feature.index
                    );
                }
            }
            InputGeometry::Polygon {
                exterior,
                interiors,
            } => {
                let transform_holes = self.options.transform_holes;
                let exterior_node_tokens = self.register_ring(exterior, true);
                let holes = interiors
                    .iter()
                    .map(|ring| self.register_ring(ring, transform_holes))
                    .filter(|hole| !hole.is_empty())
                    .collect();

                if let Some(layer) = semantic_type {
                    let entry = build_entry(layer, feature.index, &token, &feature.properties);
                    self.map.push_semantic(entry);
                }

                self.map.polygon.push(Polygon {
                    token,
                    exterior_node_tokens,
                    holes,
                });
            }
        }
    }

    /// Aggregates everything decomposed so far into one document.
    pub fn assemble(self) -> NuScenesMap {
        let mut map = self.map;
        map.node = self.registry.into_nodes();
        map.canvas_edge = Some(self.frame.canvas_edge());
        map
    }

    fn register_ring(&mut self, coords: &[Coord], transform: bool) -> Vec<String> {
        coords
            .iter()
            .map(|&[x, y]| {
                let [x, y] = if transform {
                    self.transformer.transform(x, y)
                } else {
                    [x, y]
                };
                self.registry.register(x, y)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SemanticEntry;
    use serde_json::json;

    fn frame() -> MapFrame {
        MapFrame {
            resolution: 0.05,
            origin: [10.0, 10.0, 0.0],
            image_width: 2000,
            image_height: 1000,
        }
    }

    fn feature(index: usize, geometry: InputGeometry, properties: serde_json::Value) -> InputFeature {
        InputFeature {
            index,
            geometry,
            properties: match properties {
                serde_json::Value::Object(map) => map,
                _ => JsonObject::new(),
            },
        }
    }

    fn collection(name: &str, features: Vec<InputFeature>) -> InputCollection {
        InputCollection {
            name: Some(name.to_string()),
            features,
        }
    }

    fn square() -> Vec<Coord> {
        vec![[0.0, 0.0], [20.0, 0.0], [20.0, -20.0], [0.0, -20.0]]
    }

    #[test]
    fn test_ped_crossing_polygon() {
        let input = collection(
            "ped_crossing",
            vec![feature(
                0,
                InputGeometry::Polygon {
                    exterior: square(),
                    interiors: vec![],
                },
                json!({"road_segment_token": "rs1"}),
            )],
        );
        let map = Converter::new(frame(), ConvertOptions::default()).convert(&input);

        assert_eq!(map.node.len(), 4);
        assert_eq!(map.polygon.len(), 1);
        assert_eq!(map.ped_crossing.len(), 1);
        assert_eq!(map.ped_crossing[0].road_segment_token.as_deref(), Some("rs1"));
        assert_eq!(map.ped_crossing[0].polygon_token, map.polygon[0].token);
        assert_eq!(map.canvas_edge, Some([200.0, 100.0]));

        let first = &map.node[0];
        assert!((first.x - -10.0).abs() < 1e-9);
        assert!((first.y - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_line_keeps_only_endpoints() {
        let mut converter = Converter::new(frame(), ConvertOptions::default());
        let coords: Vec<Coord> = (0..7).map(|i| [i as f64, -(i as f64)]).collect();
        converter.process(
            &feature(0, InputGeometry::LineString(coords), json!({"token": "l1"})),
            None,
        );
        let map = converter.assemble();

        assert_eq!(map.node.len(), 7);
        assert_eq!(map.line.len(), 1);
        assert_eq!(map.line[0].token, "l1");
        assert_eq!(
            map.line[0].node_tokens,
            vec![map.node[0].token.clone(), map.node[6].token.clone()]
        );
    }

    #[test]
    fn test_short_line_emits_nothing() {
        let mut converter = Converter::new(frame(), ConvertOptions::default());
        converter.process(
            &feature(0, InputGeometry::LineString(vec![[1.0, 1.0]]), json!({})),
            None,
        );
        converter.process(&feature(1, InputGeometry::LineString(vec![]), json!({})), None);
        let map = converter.assemble();

        assert!(map.line.is_empty());
        assert_eq!(map.node.len(), 1);
    }

    #[test]
    fn test_closed_line_reuses_start_node() {
        let mut converter = Converter::new(frame(), ConvertOptions::default());
        let coords = vec![[0.0, 0.0], [5.0, 0.0], [0.0, 0.0]];
        converter.process(&feature(0, InputGeometry::LineString(coords), json!({})), None);
        let map = converter.assemble();

        assert_eq!(map.node.len(), 2);
        assert_eq!(map.line[0].node_tokens[0], map.line[0].node_tokens[1]);
    }

    #[test]
    fn test_shared_vertices_across_features() {
        let mut converter = Converter::new(frame(), ConvertOptions::default());
        converter.process(
            &feature(
                0,
                InputGeometry::LineString(vec![[0.0, 0.0], [20.0, 0.0]]),
                json!({}),
            ),
            None,
        );
        converter.process(
            &feature(
                1,
                InputGeometry::Polygon {
                    exterior: square(),
                    interiors: vec![],
                },
                json!({}),
            ),
            None,
        );
        let map = converter.assemble();

        assert_eq!(map.node.len(), 4);
        assert_eq!(map.line[0].node_tokens[0], map.polygon[0].exterior_node_tokens[0]);
        assert_eq!(map.line[0].node_tokens[1], map.polygon[0].exterior_node_tokens[1]);
    }

    #[test]
    fn test_polygon_keeps_full_exterior() {
        let mut converter = Converter::new(frame(), ConvertOptions::default());
        let mut ring = square();
        ring.push([0.0, 0.0]);
        converter.process(
            &feature(
                0,
                InputGeometry::Polygon {
                    exterior: ring,
                    interiors: vec![],
                },
                json!({}),
            ),
            None,
        );
        let map = converter.assemble();

        let exterior = &map.polygon[0].exterior_node_tokens;
        assert_eq!(exterior.len(), 5);
        assert_eq!(exterior[0], exterior[4]);
        assert_eq!(map.node.len(), 4);
        assert!(map.ped_crossing.is_empty());
    }

    #[test]
    fn test_holes_are_raw_by_default() {
        let hole = vec![[5.0, -5.0], [6.0, -5.0], [6.0, -6.0]];
        let geometry = InputGeometry::Polygon {
            exterior: square(),
            interiors: vec![hole, vec![]],
        };

        let mut converter = Converter::new(frame(), ConvertOptions::default());
        converter.process(&feature(0, geometry.clone(), json!({})), None);
        let map = converter.assemble();
        assert_eq!(map.polygon[0].holes.len(), 1);
        assert_eq!(map.polygon[0].holes[0].len(), 3);
        assert_eq!((map.node[4].x, map.node[4].y), (5.0, -5.0));

        let options = ConvertOptions {
            transform_holes: true,
        };
        let mut converter = Converter::new(frame(), options);
        converter.process(&feature(0, geometry, json!({})), None);
        let map = converter.assemble();
        let expected = CoordinateTransformer::from_frame(&frame()).transform(5.0, -5.0);
        assert_eq!([map.node[4].x, map.node[4].y], expected);
    }

    #[test]
    fn test_point_uses_feature_token() {
        let mut converter = Converter::new(frame(), ConvertOptions::default());
        converter.process(
            &feature(0, InputGeometry::Point([0.0, 0.0]), json!({"token": "p1"})),
            None,
        );
        converter.process(
            &feature(
                1,
                InputGeometry::LineString(vec![[0.0, 0.0], [1.0, 0.0]]),
                json!({}),
            ),
            None,
        );
        let map = converter.assemble();

        assert_eq!(map.node[0].token, "p1");
        assert_eq!(map.line[0].node_tokens[0], "p1");
    }

    #[test]
    fn test_semantic_entries_only_for_polygons() {
        let input = collection(
            "road_divider",
            vec![
                feature(
                    0,
                    InputGeometry::LineString(vec![[0.0, 0.0], [1.0, 1.0]]),
                    json!({}),
                ),
                feature(
                    1,
                    InputGeometry::Polygon {
                        exterior: square(),
                        interiors: vec![],
                    },
                    json!({"line_token": "l9"}),
                ),
            ],
        );
        let map = Converter::new(frame(), ConvertOptions::default()).convert(&input);

        assert_eq!(map.line.len(), 1);
        assert_eq!(map.road_divider.len(), 1);
        assert_eq!(map.road_divider[0].line_token, "l9");
    }

    #[test]
    fn test_unknown_collection_has_no_semantics() {
        let input = collection(
            "buildings",
            vec![feature(
                0,
                InputGeometry::Polygon {
                    exterior: square(),
                    interiors: vec![],
                },
                json!({}),
            )],
        );
        let map = Converter::new(frame(), ConvertOptions::default()).convert(&input);

        assert_eq!(map.polygon.len(), 1);
        assert_eq!(map.counts().semantic_entries, 0);
    }

    #[test]
    fn test_integer_attributes_do_not_abort() {
        let input = collection(
            "road_segment",
            vec![
                feature(
                    0,
                    InputGeometry::Polygon {
                        exterior: square(),
                        interiors: vec![],
                    },
                    json!({"is_intersection": 1}),
                ),
                feature(
                    1,
                    InputGeometry::Polygon {
                        exterior: square(),
                        interiors: vec![],
                    },
                    json!({"is_intersection": "maybe"}),
                ),
            ],
        );
        let map = Converter::new(frame(), ConvertOptions::default()).convert(&input);

        assert_eq!(map.road_segment.len(), 2);
        assert!(map.road_segment[0].is_intersection);
        assert!(!map.road_segment[1].is_intersection);
    }

    #[test]
    fn test_non_string_tokens() {
        let mut converter = Converter::new(frame(), ConvertOptions::default());
        converter.process(
            &feature(0, InputGeometry::Point([0.0, 0.0]), json!({"token": 42})),
            None,
        );
        converter.process(
            &feature(1, InputGeometry::Point([1.0, 0.0]), json!({"token": true})),
            None,
        );
        converter.process(
            &feature(2, InputGeometry::Point([2.0, 0.0]), json!({"token": null})),
            None,
        );
        let map = converter.assemble();

        assert_eq!(map.node[0].token, "42");
        assert_ne!(map.node[1].token, "true");
        assert_eq!(map.node[1].token.len(), 36);
        assert_eq!(map.node[2].token.len(), 36);
    }

    #[test]
    fn test_lane_entry_references_polygon_token() {
        let input = collection(
            "lane",
            vec![feature(
                0,
                InputGeometry::Polygon {
                    exterior: square(),
                    interiors: vec![],
                },
                json!({"token": "poly-1"}),
            )],
        );
        let mut map = Converter::new(frame(), ConvertOptions::default()).convert(&input);

        assert_eq!(map.polygon[0].token, "poly-1");
        let lane = map.lane.pop().unwrap();
        assert_eq!(lane.polygon_token, "poly-1");
        assert_eq!(SemanticEntry::Lane(lane).layer(), SemanticLayer::Lane);
    }
}
