use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};
use serde::{Deserialize, Serialize};

/// Number of named heads every thread carries.
pub const NUM_HEADS: usize = 4;

/// The named heads of a thread. The discriminant doubles as the no-op
/// modifier value that selects the head.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HeadId {
    Ip = 0,
    Read = 1,
    Write = 2,
    Flow = 3,
}

impl HeadId {
    pub const ALL: [HeadId; NUM_HEADS] = [HeadId::Ip, HeadId::Read, HeadId::Write, HeadId::Flow];

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Maps a modifier value onto a head; out-of-range values yield `None`.
    #[must_use]
    pub fn from_modifier(value: usize) -> Option<HeadId> {
        Self::ALL.get(value).copied()
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            HeadId::Ip => "IP",
            HeadId::Read => "read",
            HeadId::Write => "write",
            HeadId::Flow => "flow",
        }
    }
}

/// A cursor into one memory space. Heads never own memory; the hardware
/// re-validates them against the current length of `space` before use.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Archive,
    RkyvSerialize,
    RkyvDeserialize,
)]
#[archive(check_bytes)]
pub struct Head {
    pub space: u32,
    pub position: u32,
}

impl Head {
    #[must_use]
    pub const fn new(space: usize, position: usize) -> Self {
        Self {
            space: space as u32,
            position: position as u32,
        }
    }

    #[must_use]
    pub const fn space(self) -> usize {
        self.space as usize
    }

    #[must_use]
    pub const fn position(self) -> usize {
        self.position as usize
    }
}
