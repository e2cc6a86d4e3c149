//! Content hashing for graphs and graph elements.
//!
//! Hashes cover the serialized JSON form of a value. They are used for the
//! integrity checksum of IR files and to fingerprint graphs.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::graph::edge::PortRef;
use crate::graph::node::Node;
use crate::graph::Graph;

/// A 32-byte SHA-256 content hash.
pub type ContentHash = [u8; 32];

/// Compute the SHA-256 hash of a byte slice.
pub fn bytes_hash(bytes: &[u8]) -> ContentHash {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

/// Compute the SHA-256 content hash of any serializable value.
pub fn content_hash<T: Serialize>(value: &T) -> Result<ContentHash, serde_json::Error> {
    let json = serde_json::to_vec(value)?;
    Ok(bytes_hash(&json))
}

/// Structural hash of a graph: nodes ordered by id and edges by endpoints.
///
/// Edge ids and map iteration order do not contribute, so two graphs built
/// from the same nodes and connections hash equal.
pub fn graph_hash(graph: &Graph) -> Result<ContentHash, serde_json::Error> {
    let mut nodes: Vec<&Node> = graph.nodes().collect();
    nodes.sort_by(|a, b| a.id.cmp(&b.id));
    let mut edges: Vec<(&PortRef, &PortRef)> =
        graph.edges().map(|e| (&e.source, &e.target)).collect();
    edges.sort();
    content_hash(&(nodes, edges))
}

/// Format a content hash as a hex string.
pub fn hash_hex(hash: &ContentHash) -> String {
    hash.iter().map(|b| format!("{b:02x}")).collect()
}
