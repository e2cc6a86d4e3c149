//! On-disk container (.moir) for mofront model graphs.
//!
//! Handles reading and writing graph files with integrity verification.
//!
//! ## File Layout
//!
//! ```text
//! MOIR File Layout:
//! ┌──────────────────────────────┐
//! │ Magic: 0x4D4F4952 ("MOIR")   │  4 bytes
//! │ Version: major.minor.patch   │  3 bytes
//! │ Flags                        │  1 byte
//! ├──────────────────────────────┤
//! │ Header                       │
//! │   node_count: u64            │
//! │   edge_count: u64            │
//! │   payload_length: u64        │
//! ├──────────────────────────────┤
//! │ JSON payload                 │
//! │   (graph data)               │
//! ├──────────────────────────────┤
//! │ Content Hash (SHA-256)       │  32 bytes
//! └──────────────────────────────┘
//! ```

mod format;

pub use format::{IrError, IrFile, IrFlags, IrVersion};
