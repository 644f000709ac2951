use super::head::Head;
use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};
use serde::{Deserialize, Serialize};

/// Snapshot of one circular stack.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Archive, RkyvSerialize, RkyvDeserialize,
)]
#[archive(check_bytes)]
pub struct StackState {
    pub values: Vec<i32>,
    pub top: u32,
}

/// Snapshot of one execution thread.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Archive, RkyvSerialize, RkyvDeserialize,
)]
#[archive(check_bytes)]
pub struct ThreadState {
    pub id: u8,
    /// Heads in `HeadId` order.
    pub heads: Vec<Head>,
    pub registers: Vec<i32>,
    pub stacks: Vec<StackState>,
    pub cur_stack: u32,
    pub read_label: Vec<u8>,
    pub next_label: Vec<u8>,
    pub active_cost: u32,
}

/// Everything needed to resume the scheduler of a hardware core over the
/// same memory. Thread order is preserved exactly.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Archive, RkyvSerialize, RkyvDeserialize,
)]
#[archive(check_bytes)]
pub struct HardwareState {
    pub thread_count: u32,
    pub cur_thread: u32,
    pub threads: Vec<ThreadState>,
    pub global_stacks: Vec<StackState>,
}
