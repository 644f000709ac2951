use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A single instruction: an index into the active instruction set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Instruction(pub u8);

impl Instruction {
    #[must_use]
    pub const fn new(op: u8) -> Self {
        Self(op)
    }

    #[must_use]
    pub const fn op(self) -> usize {
        self.0 as usize
    }
}

/// A bare instruction sequence, as handed to and from the population layer.
pub type Sequence = Vec<Instruction>;

/// Per-site bookkeeping flags carried alongside every instruction of a genome.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SiteFlags(u8);

impl SiteFlags {
    pub const MUTATED: Self = Self(1 << 0);
    pub const POINT_MUT: Self = Self(1 << 1);
    pub const COPY_MUT: Self = Self(1 << 2);
    pub const COPIED: Self = Self(1 << 3);
    pub const EXECUTED: Self = Self(1 << 4);
    pub const INJECTED: Self = Self(1 << 5);
    pub const BREAKPOINT: Self = Self(1 << 6);

    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

impl std::ops::BitOr for SiteFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// An ordered, resizable instruction buffer with per-site flags.
///
/// Used both for an organism's own genome and for every auxiliary memory
/// space. The two vectors always have the same length.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genome {
    insts: Vec<Instruction>,
    flags: Vec<SiteFlags>,
}

impl Genome {
    /// Creates a genome of `size` copies of `fill` with clear flags.
    #[must_use]
    pub fn filled(size: usize, fill: Instruction) -> Self {
        Self {
            insts: vec![fill; size],
            flags: vec![SiteFlags::empty(); size],
        }
    }

    #[must_use]
    pub fn from_sequence(seq: &[Instruction]) -> Self {
        Self {
            insts: seq.to_vec(),
            flags: vec![SiteFlags::empty(); seq.len()],
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.insts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.insts.is_empty()
    }

    #[must_use]
    pub fn get(&self, pos: usize) -> Option<Instruction> {
        self.insts.get(pos).copied()
    }

    /// Overwrites the instruction at `pos`. Flags are left to the caller.
    pub fn set(&mut self, pos: usize, inst: Instruction) {
        if let Some(slot) = self.insts.get_mut(pos) {
            *slot = inst;
        }
    }

    #[must_use]
    pub fn flags(&self, pos: usize) -> SiteFlags {
        self.flags.get(pos).copied().unwrap_or_default()
    }

    pub fn set_flag(&mut self, pos: usize, flag: SiteFlags) {
        if let Some(f) = self.flags.get_mut(pos) {
            f.insert(flag);
        }
    }

    pub fn clear_flag(&mut self, pos: usize, flag: SiteFlags) {
        if let Some(f) = self.flags.get_mut(pos) {
            f.remove(flag);
        }
    }

    pub fn clear_all_flags(&mut self) {
        self.flags.iter_mut().for_each(|f| *f = SiteFlags::empty());
    }

    /// Clears every flag except those in `keep`.
    pub fn retain_flags(&mut self, keep: SiteFlags) {
        self.flags.iter_mut().for_each(|f| *f = SiteFlags(f.0 & keep.0));
    }

    /// Inserts `inst` before `pos` (or appends when `pos == len`).
    pub fn insert(&mut self, pos: usize, inst: Instruction) {
        let pos = pos.min(self.insts.len());
        self.insts.insert(pos, inst);
        self.flags.insert(pos, SiteFlags::empty());
    }

    pub fn remove(&mut self, pos: usize) -> Option<Instruction> {
        if pos >= self.insts.len() {
            return None;
        }
        self.flags.remove(pos);
        Some(self.insts.remove(pos))
    }

    /// Grows with `fill` or truncates to `size`. New sites have clear flags.
    pub fn resize(&mut self, size: usize, fill: Instruction) {
        self.insts.resize(size, fill);
        self.flags.resize(size, SiteFlags::empty());
    }

    /// Copies `range` (clamped to the buffer) out as a new genome, flags included.
    #[must_use]
    pub fn crop(&self, range: Range<usize>) -> Genome {
        let end = range.end.min(self.len());
        let start = range.start.min(end);
        Genome {
            insts: self.insts[start..end].to_vec(),
            flags: self.flags[start..end].to_vec(),
        }
    }

    /// Removes `range` from the buffer.
    pub fn cut(&mut self, range: Range<usize>) {
        let end = range.end.min(self.len());
        let start = range.start.min(end);
        self.insts.drain(start..end);
        self.flags.drain(start..end);
    }

    /// Number of sites in `range` carrying `flag`.
    #[must_use]
    pub fn count_flag(&self, range: Range<usize>, flag: SiteFlags) -> usize {
        let end = range.end.min(self.len());
        let start = range.start.min(end);
        self.flags[start..end]
            .iter()
            .filter(|f| f.contains(flag))
            .count()
    }

    #[must_use]
    pub fn instructions(&self) -> &[Instruction] {
        &self.insts
    }

    #[must_use]
    pub fn to_sequence(&self) -> Sequence {
        self.insts.clone()
    }

    /// Replaces the content with `seq`, clearing every flag.
    pub fn assign(&mut self, seq: &[Instruction]) {
        self.insts.clear();
        self.insts.extend_from_slice(seq);
        self.flags.clear();
        self.flags.resize(seq.len(), SiteFlags::empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(ops: &[u8]) -> Vec<Instruction> {
        ops.iter().copied().map(Instruction).collect()
    }

    #[test]
    fn test_flags_track_inserts_and_removals() {
        let mut g = Genome::from_sequence(&seq(&[1, 2, 3]));
        g.set_flag(1, SiteFlags::EXECUTED);
        g.insert(0, Instruction(9));
        assert!(g.flags(2).contains(SiteFlags::EXECUTED));
        assert!(g.flags(0).is_empty());

        g.remove(0);
        assert!(g.flags(1).contains(SiteFlags::EXECUTED));
        assert_eq!(g.instructions(), seq(&[1, 2, 3]).as_slice());
    }

    #[test]
    fn test_crop_and_cut() {
        let mut g = Genome::from_sequence(&seq(&[0, 1, 2, 3, 4, 5]));
        g.set_flag(3, SiteFlags::COPIED);
        let child = g.crop(2..5);
        assert_eq!(child.instructions(), seq(&[2, 3, 4]).as_slice());
        assert!(child.flags(1).contains(SiteFlags::COPIED));

        g.cut(1..3);
        assert_eq!(g.instructions(), seq(&[0, 3, 4, 5]).as_slice());
        assert_eq!(g.count_flag(0..g.len(), SiteFlags::COPIED), 1);
    }

    #[test]
    fn test_crop_clamps_out_of_range() {
        let g = Genome::from_sequence(&seq(&[0, 1]));
        assert!(g.crop(5..9).is_empty());
        assert_eq!(g.crop(1..9).len(), 1);
    }

    #[test]
    fn test_site_flag_set_operations() {
        let mut f = SiteFlags::MUTATED | SiteFlags::POINT_MUT;
        assert!(f.contains(SiteFlags::MUTATED));
        f.remove(SiteFlags::MUTATED);
        assert!(!f.contains(SiteFlags::MUTATED));
        assert!(f.contains(SiteFlags::POINT_MUT));
    }
}
