//! # Protocell IO
//!
//! File-level I/O for the protocell engine.
//!
//! This crate provides:
//! - Structured error handling for everything that touches the disk
//! - Loaders for instruction sets, genomes and hardware configuration
//! - JSON and hex helpers for snapshots and genomes
//! - Binary (rkyv) hardware-state snapshots

/// Error types and result aliases for I/O operations
pub mod error;
/// Instruction-set, genome and configuration loaders
pub mod loader;
/// Validated binary snapshots of hardware state
pub mod persistence;
/// JSON and hex helpers for snapshots and genomes
pub mod serialization;

pub use error::{IoError, Result};
pub use loader::{load_config, load_genome, load_inst_set, save_genome, LoadedInstSet};
pub use persistence::{load_state, save_state};
pub use serialization::{
    from_json, read_json_file, sequence_from_hex, sequence_to_hex, to_json, to_json_pretty,
    write_json_file,
};
