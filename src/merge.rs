use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{MapCounts, MapDocument, SemanticLayer, GEOMETRY_KEYS};

const CANVAS_EDGE: &str = "canvas_edge";

fn is_list_key(key: &str) -> bool {
    GEOMETRY_KEYS.contains(&key) || SemanticLayer::from_name(key).is_some()
}

fn as_numbers(value: &Value) -> Option<Vec<f64>> {
    value.as_array()?.iter().map(Value::as_f64).collect()
}

/// `[200, 100]` and `[200.0, 100.0]` describe the same canvas.
fn same_canvas(a: &Value, b: &Value) -> bool {
    match (as_numbers(a), as_numbers(b)) {
        (Some(a), Some(b)) => a == b,
        _ => a == b,
    }
}

/// Appends `incoming` onto `existing`.
///
/// Both sides are untyped documents, so records are concatenated exactly as
/// they are, fields this crate does not know included. Geometry shared
/// between two runs ends up as separate nodes. The canvas edge must agree
/// when both sides have one; otherwise the merge fails and the caller leaves
/// `existing` untouched on disk.
///
/// Any key holding a list on both sides is extended. A key only `incoming`
/// has is added. For other collisions `existing` wins, except that a node,
/// line, polygon or semantic layer entry that is not a list is an error.
pub fn merge(mut existing: MapDocument, mut incoming: MapDocument) -> Result<MapDocument> {
    let new_edge = incoming.remove(CANVAS_EDGE);
    if let (Some(current), Some(new_edge)) = (existing.get(CANVAS_EDGE), &new_edge) {
        if !same_canvas(current, new_edge) {
            return Err(Error::CanvasEdgeMismatch {
                existing: current.clone(),
                incoming: new_edge.clone(),
            });
        }
    }

    debug!(
        "Merging {} into existing {}",
        MapCounts::of_document(&incoming),
        MapCounts::of_document(&existing)
    );

    for (key, value) in incoming {
        let Some(current) = existing.get_mut(&key) else {
            existing.insert(key, value);
            continue;
        };
        match (current, value) {
            (Value::Array(current), Value::Array(records)) => current.extend(records),
            _ if is_list_key(&key) => return Err(Error::NotAList { key }),
            _ => debug!("Keeping existing `{}` entry", key),
        }
    }

    if let Some(new_edge) = new_edge {
        existing.entry(CANVAS_EDGE).or_insert(new_edge);
    }

    Ok(existing)
}

/// Folds several documents, in order, into one.
pub fn merge_all(documents: impl IntoIterator<Item = MapDocument>) -> Result<MapDocument> {
    documents
        .into_iter()
        .try_fold(MapDocument::new(), |merged, document| merge(merged, document))
}
