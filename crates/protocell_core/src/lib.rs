//! # Protocell Core
//!
//! The execution engine for self-replicating digital organisms.
//!
//! This crate contains:
//! - The instruction library and priced instruction sets
//! - Code labels with directional and full-label search
//! - Threads, heads and the generic hardware core
//! - The mutation engine and the replication protocol
//! - Parasite injection between organisms
//! - Metrics collection and structured logging
//!
//! ## Architecture
//!
//! One [`Hardware`] type covers register machines, stack machines and
//! multi-space stack machines; the differences live in [`HardwareConfig`].
//! The core never touches population state directly. Everything it needs
//! from its owner goes through [`Host`], and the only cross-organism
//! operation is [`InjectHost::inject`]. All randomness comes from the
//! caller's generator.
//!
//! ## Example
//!
//! ```
//! use protocell_core::{Feedback, Hardware, HardwareConfig, InstSet, IsolatedHost};
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//! use std::sync::Arc;
//!
//! let mut feedback = Feedback::new();
//! let set = InstSet::from_description("INST nop-A\nINST inc\n", &mut feedback).unwrap();
//! let genome = set.parse_sequence(&"inc\n".repeat(10)).unwrap();
//!
//! let mut hardware =
//!     Hardware::new(Arc::new(set), Arc::new(HardwareConfig::default()), &genome).unwrap();
//! let mut host = IsolatedHost::new(genome);
//! let mut rng = ChaCha8Rng::seed_from_u64(42);
//! let report = hardware.step(&mut host, &mut rng);
//! assert_eq!(report.executed, 1);
//! ```

/// Hardware configuration (architecture, execution, genome, mutation, fitness test)
pub mod config;
/// Error types: configuration errors, faults and policy violations
pub mod error;
/// The hardware core and every instruction handler
pub mod hardware;
/// Head movement rules
pub mod head;
/// Services the owning organism provides to its hardware
pub mod host;
/// Opcode table with names, modifier roles and descriptions
pub mod inst_lib;
/// Instruction sets: loading, validation, weighted sampling
pub mod inst_set;
/// Code labels and label search
pub mod label;
/// Execution counters and structured logging
pub mod metrics;
/// Scoped and divide-time mutations
pub mod mutation;
/// Divide viability and fitness bands
pub mod replication;
/// Fixed-depth circular stacks
pub mod stack;
/// Isolated genome evaluation
pub mod test_cpu;
/// Execution threads and the thread set
pub mod thread;

pub use config::HardwareConfig;
pub use error::{CoreError, Fault, Feedback, InjectError, ThreadError};
pub use hardware::{Hardware, StepReport};
pub use host::{Host, InjectHost, IsolatedHost, Offspring};
pub use inst_lib::Opcode;
pub use inst_set::InstSet;
pub use label::CodeLabel;
pub use metrics::{init_logging, HardwareMetrics};
pub use protocell_data::{Genome, Head, HeadId, Instruction, Sequence, SiteFlags};
pub use test_cpu::{TestCpu, TestResult};
