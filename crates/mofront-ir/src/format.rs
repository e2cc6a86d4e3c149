//! MOIR container implementation.
//!
//! A fixed-size header with magic bytes, version, flags, and element counts
//! is followed by a JSON-serialized graph payload and a SHA-256 hash over
//! everything before it.

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use sha2::{Digest, Sha256};
use thiserror::Error;

use mofront_core::graph::node::NodeKind;
use mofront_core::graph::Graph;

/// Magic bytes identifying a MOIR file: "MOIR"
pub const MAGIC: [u8; 4] = [0x4D, 0x4F, 0x49, 0x52];

/// 4 (magic) + 3 (version) + 1 (flags) + 8*3 (counts + payload_len) = 32 bytes
const HEADER_SIZE: usize = 32;

/// Size of the trailing content hash.
const HASH_SIZE: usize = 32;

/// Errors that can occur during MOIR file operations.
#[derive(Debug, Error)]
pub enum IrError {
    #[error("invalid magic bytes: expected MOIR")]
    InvalidMagic,

    #[error("unsupported format version {major}.{minor}.{patch}")]
    UnsupportedVersion { major: u8, minor: u8, patch: u8 },

    #[error("content hash mismatch: file is corrupted")]
    HashMismatch,

    #[error("header declares {declared} {what}, payload has {actual}")]
    CountMismatch {
        what: &'static str,
        declared: u64,
        actual: u64,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("file too small to be a valid MOIR file")]
    FileTooSmall,
}

/// MOIR format version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IrVersion {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

impl IrVersion {
    /// The current format version.
    pub const CURRENT: IrVersion = IrVersion {
        major: 0,
        minor: 1,
        patch: 0,
    };

    /// Check if this version can be read by the current implementation.
    pub fn is_compatible(&self) -> bool {
        // Pre-1.0: same major, minor not newer than ours
        self.major == Self::CURRENT.major && self.minor <= Self::CURRENT.minor
    }
}

impl std::fmt::Display for IrVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// MOIR format flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IrFlags {
    bits: u8,
}

impl IrFlags {
    /// No flags set.
    pub const NONE: IrFlags = IrFlags { bits: 0 };

    /// Graph contains `Const` nodes.
    pub const HAS_CONSTANTS: u8 = 0x01;

    /// Every `Parameter` carries a static shape.
    pub const HAS_STATIC_SHAPES: u8 = 0x02;

    pub fn new(bits: u8) -> Self {
        Self { bits }
    }

    pub fn has(&self, flag: u8) -> bool {
        self.bits & flag != 0
    }

    pub fn set(&mut self, flag: u8) {
        self.bits |= flag;
    }

    pub fn bits(&self) -> u8 {
        self.bits
    }
}

/// A MOIR file: header metadata + graph.
#[derive(Debug)]
pub struct IrFile {
    /// Format version.
    pub version: IrVersion,
    /// Format flags.
    pub flags: IrFlags,
    /// The graph data.
    pub graph: Graph,
}

impl IrFile {
    /// Wrap a graph, deriving flags from its contents.
    pub fn new(graph: Graph) -> Self {
        let mut flags = IrFlags::NONE;
        if graph.nodes().any(|n| n.kind == NodeKind::Const) {
            flags.set(IrFlags::HAS_CONSTANTS);
        }
        let static_shapes = {
            let mut parameters = graph
                .nodes()
                .filter(|n| n.kind == NodeKind::Parameter)
                .peekable();
            parameters.peek().is_some() && parameters.all(|n| n.shape.is_some())
        };
        if static_shapes {
            flags.set(IrFlags::HAS_STATIC_SHAPES);
        }
        Self {
            version: IrVersion::CURRENT,
            flags,
            graph,
        }
    }

    /// Serialize to a writer in MOIR format.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), IrError> {
        let payload = serde_json::to_vec(&self.graph)?;

        let node_count = self.graph.node_count() as u64;
        let edge_count = self.graph.edge_count() as u64;
        let payload_len = payload.len() as u64;

        let mut hasher = Sha256::new();

        writer.write_all(&MAGIC)?;
        hasher.update(MAGIC);

        let version_bytes = [self.version.major, self.version.minor, self.version.patch];
        writer.write_all(&version_bytes)?;
        hasher.update(version_bytes);

        writer.write_all(&[self.flags.bits()])?;
        hasher.update([self.flags.bits()]);

        // Counts and payload length, little-endian
        for val in [node_count, edge_count, payload_len] {
            let bytes = val.to_le_bytes();
            writer.write_all(&bytes)?;
            hasher.update(bytes);
        }

        writer.write_all(&payload)?;
        hasher.update(&payload);

        let hash: [u8; 32] = hasher.finalize().into();
        writer.write_all(&hash)?;

        Ok(())
    }

    /// Serialize to a byte vector.
    pub fn to_bytes(&self) -> Result<Vec<u8>, IrError> {
        let mut buf = Vec::new();
        self.write_to(&mut buf)?;
        Ok(buf)
    }

    /// Deserialize from a reader.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self, IrError> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes(&data)
    }

    /// Write to a file, replacing it if present.
    pub fn save(&self, path: &Path) -> Result<(), IrError> {
        fs::write(path, self.to_bytes()?)?;
        Ok(())
    }

    /// Read from a file.
    pub fn load(path: &Path) -> Result<Self, IrError> {
        Self::from_bytes(&fs::read(path)?)
    }

    /// Deserialize from a byte slice.
    pub fn from_bytes(data: &[u8]) -> Result<Self, IrError> {
        if data.len() < HEADER_SIZE + HASH_SIZE {
            return Err(IrError::FileTooSmall);
        }

        if data[0..4] != MAGIC {
            return Err(IrError::InvalidMagic);
        }

        let version = IrVersion {
            major: data[4],
            minor: data[5],
            patch: data[6],
        };
        if !version.is_compatible() {
            return Err(IrError::UnsupportedVersion {
                major: version.major,
                minor: version.minor,
                patch: version.patch,
            });
        }

        let flags = IrFlags::new(data[7]);

        let node_count = read_u64(data, 8);
        let edge_count = read_u64(data, 16);
        let payload_len =
            usize::try_from(read_u64(data, 24)).map_err(|_| IrError::FileTooSmall)?;

        let payload_end = HEADER_SIZE
            .checked_add(payload_len)
            .ok_or(IrError::FileTooSmall)?;
        let hash_end = payload_end
            .checked_add(HASH_SIZE)
            .ok_or(IrError::FileTooSmall)?;
        if data.len() < hash_end {
            return Err(IrError::FileTooSmall);
        }

        let stored_hash = &data[payload_end..hash_end];
        let mut hasher = Sha256::new();
        hasher.update(&data[..payload_end]);
        let computed_hash: [u8; 32] = hasher.finalize().into();
        if computed_hash != stored_hash {
            return Err(IrError::HashMismatch);
        }

        let graph: Graph = serde_json::from_slice(&data[HEADER_SIZE..payload_end])?;

        for (what, declared, actual) in [
            ("nodes", node_count, graph.node_count() as u64),
            ("edges", edge_count, graph.edge_count() as u64),
        ] {
            if declared != actual {
                return Err(IrError::CountMismatch {
                    what,
                    declared,
                    actual,
                });
            }
        }

        Ok(Self {
            version,
            flags,
            graph,
        })
    }
}

/// Read a little-endian u64 at `offset`; caller guarantees the bounds.
fn read_u64(data: &[u8], offset: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&data[offset..offset + 8]);
    u64::from_le_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mofront_core::builder::{parameter, regular_op, result, valued_const, GraphBuilder};
    use mofront_core::types::{ElementType, Tensor};

    fn sample_graph() -> Graph {
        let mut b = GraphBuilder::new();
        b.node(parameter("input", Some(vec![1, 3])))
            .node(regular_op("shape", NodeKind::ShapeOf).with_output_type(Some(ElementType::I32)))
            .node(valued_const("zero", Tensor::int64_scalar(0)))
            .node(regular_op("squeeze", NodeKind::Squeeze).with_name("my_rank"))
            .node(result("output"));
        b.connect("input", "shape").unwrap();
        b.connect("shape", "0:squeeze").unwrap();
        b.connect("zero", "1:squeeze").unwrap();
        b.connect("squeeze", "output").unwrap();
        b.build().unwrap()
    }

    #[test]
    fn round_trip() {
        let ir = IrFile::new(sample_graph());
        assert!(ir.flags.has(IrFlags::HAS_CONSTANTS));
        assert!(ir.flags.has(IrFlags::HAS_STATIC_SHAPES));

        let bytes = ir.to_bytes().unwrap();
        let loaded = IrFile::from_bytes(&bytes).unwrap();

        assert_eq!(loaded.version, IrVersion::CURRENT);
        assert_eq!(loaded.flags, ir.flags);
        assert_eq!(loaded.graph.node_count(), 5);
        assert_eq!(loaded.graph.edge_count(), 4);
        let squeeze = loaded.graph.get_node("squeeze").unwrap();
        assert_eq!(squeeze.soft_name(), "my_rank");
        assert_eq!(
            loaded.graph.producer("squeeze", 1),
            Some(&("zero".to_string(), 0))
        );
    }

    #[test]
    fn empty_graph_round_trip() {
        let ir = IrFile::new(Graph::new());
        assert_eq!(ir.flags, IrFlags::NONE);

        let loaded = IrFile::from_bytes(&ir.to_bytes().unwrap()).unwrap();
        assert_eq!(loaded.graph.node_count(), 0);
        assert_eq!(loaded.graph.edge_count(), 0);
    }

    #[test]
    fn invalid_magic_rejected() {
        let mut bytes = IrFile::new(Graph::new()).to_bytes().unwrap();
        bytes[0] = 0xFF;
        assert!(matches!(
            IrFile::from_bytes(&bytes),
            Err(IrError::InvalidMagic)
        ));
    }

    #[test]
    fn newer_version_rejected() {
        let mut bytes = IrFile::new(Graph::new()).to_bytes().unwrap();
        bytes[5] = IrVersion::CURRENT.minor + 1;
        assert!(matches!(
            IrFile::from_bytes(&bytes),
            Err(IrError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn corrupted_payload_rejected() {
        let mut bytes = IrFile::new(sample_graph()).to_bytes().unwrap();
        bytes[HEADER_SIZE + 10] ^= 0xFF;
        assert!(matches!(
            IrFile::from_bytes(&bytes),
            Err(IrError::HashMismatch)
        ));
    }

    #[test]
    fn truncated_file_rejected() {
        assert!(matches!(
            IrFile::from_bytes(&MAGIC),
            Err(IrError::FileTooSmall)
        ));

        let bytes = IrFile::new(sample_graph()).to_bytes().unwrap();
        assert!(matches!(
            IrFile::from_bytes(&bytes[..bytes.len() - 1]),
            Err(IrError::FileTooSmall)
        ));
    }

    #[test]
    fn oversized_payload_length_rejected() {
        let mut bytes = IrFile::new(Graph::new()).to_bytes().unwrap();
        for len in [u64::MAX, u64::MAX - 40, bytes.len() as u64] {
            bytes[24..32].copy_from_slice(&len.to_le_bytes());
            assert!(
                matches!(IrFile::from_bytes(&bytes), Err(IrError::FileTooSmall)),
                "payload length {len}"
            );
        }
    }

    #[test]
    fn flags_operations() {
        let mut flags = IrFlags::NONE;
        assert!(!flags.has(IrFlags::HAS_CONSTANTS));

        flags.set(IrFlags::HAS_STATIC_SHAPES);
        assert!(flags.has(IrFlags::HAS_STATIC_SHAPES));
        assert!(!flags.has(IrFlags::HAS_CONSTANTS));
        assert_eq!(flags.bits(), 0x02);
    }

    #[test]
    fn unshaped_parameter_clears_static_shape_flag() {
        let mut g = sample_graph();
        g.get_node_mut("input").unwrap().shape = None;
        assert!(!IrFile::new(g).flags.has(IrFlags::HAS_STATIC_SHAPES));
    }

    #[test]
    fn version_display() {
        assert_eq!(IrVersion::CURRENT.to_string(), "0.1.0");
    }

    #[test]
    fn save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.moir");
        IrFile::new(sample_graph()).save(&path).unwrap();

        let loaded = IrFile::load(&path).unwrap();
        assert_eq!(loaded.graph.node_count(), 5);
    }

    #[test]
    fn write_and_read_via_io() {
        let mut buf = Vec::new();
        IrFile::new(sample_graph()).write_to(&mut buf).unwrap();
        let loaded = IrFile::read_from(&mut buf.as_slice()).unwrap();
        assert_eq!(loaded.graph.edge_count(), 4);
    }
}
