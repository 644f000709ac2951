use serde::{Deserialize, Serialize};
use std::fmt;

/// Where in the hardware a fault was raised.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FaultLocation {
    Execution,
    Math,
    Jump,
    Allocate,
    Divide,
    ThreadFork,
    ThreadKill,
    Inject,
    MemorySpace,
}

/// What went wrong.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FaultKind {
    DivideByZero,
    /// `i32::MIN` divided by -1.
    Overflow,
    LabelNotFound,
    AllocateAlreadyDone,
    AllocateTooSmall,
    AllocateTooLarge,
    AllocateInvalidSize,
    AllocateRequired,
    InvalidOffspringSize,
    InvalidParentSize,
    TooFewExecuted,
    TooFewCopied,
    DivideSpace,
    ThreadCap,
    LastThread,
    InjectFailed,
    InjectTooSmall,
    NoFreeSpace,
}

impl fmt::Display for FaultLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FaultLocation::Execution => "execution",
            FaultLocation::Math => "math",
            FaultLocation::Jump => "jump",
            FaultLocation::Allocate => "allocate",
            FaultLocation::Divide => "divide",
            FaultLocation::ThreadFork => "thread-fork",
            FaultLocation::ThreadKill => "thread-kill",
            FaultLocation::Inject => "inject",
            FaultLocation::MemorySpace => "memory-space",
        };
        f.write_str(s)
    }
}
