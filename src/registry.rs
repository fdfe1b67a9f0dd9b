use std::collections::HashMap;

use crate::model::{generate_token, Node};

/// Identity of a coordinate under exact `f64` equality: `-0.0` folds into
/// `+0.0` so the key agrees with `==`.
type CoordKey = (u64, u64);

fn coord_key(x: f64, y: f64) -> CoordKey {
    ((x + 0.0).to_bits(), (y + 0.0).to_bits())
}

/// Deduplicates vertices of one conversion run into a node list.
///
/// Coordinates are matched exactly, with no spatial tolerance. A registry
/// belongs to a single run and is not meant to be shared across threads.
#[derive(Debug, Default)]
pub struct NodeRegistry {
    nodes: Vec<Node>,
    by_coord: HashMap<CoordKey, usize>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the token of the node at `(x, y)`, minting a new node if the
    /// coordinate has not been seen in this run.
    pub fn register(&mut self, x: f64, y: f64) -> String {
        if let Some(token) = self.token_at(x, y) {
            return token.to_string();
        }
        let token = generate_token();
        self.push(token.clone(), x, y);
        token
    }

    /// Appends a node with a caller-chosen token, even when the coordinate is
    /// already known. The earliest node at a coordinate stays the dedup target.
    pub fn insert(&mut self, token: String, x: f64, y: f64) {
        self.push(token, x, y);
    }

    pub fn token_at(&self, x: f64, y: f64) -> Option<&str> {
        self.by_coord
            .get(&coord_key(x, y))
            .map(|&idx| self.nodes[idx].token.as_str())
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn into_nodes(self) -> Vec<Node> {
        self.nodes
    }

    fn push(&mut self, token: String, x: f64, y: f64) {
        let idx = self.nodes.len();
        self.nodes.push(Node { token, x, y });
        self.by_coord.entry(coord_key(x, y)).or_insert(idx);
    }
}
