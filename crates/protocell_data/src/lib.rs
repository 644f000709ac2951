//! # Protocell Data
//!
//! Plain data types shared by the protocell engine and its persistence layer.
//!
//! Nothing in here knows how an instruction behaves; these are containers
//! (instructions, flagged genomes, heads, snapshots) and the fault taxonomy.

pub mod data;

pub use data::fault::{FaultKind, FaultLocation};
pub use data::genome::{Genome, Instruction, Sequence, SiteFlags};
pub use data::head::{Head, HeadId, NUM_HEADS};
pub use data::state::{HardwareState, StackState, ThreadState};
