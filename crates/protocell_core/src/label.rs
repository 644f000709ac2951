//! Code labels and label-based addressing.
//!
//! A label is the run of no-ops after an instruction, recorded as no-op
//! modifier values. Two searches exist: directional search accepts a match
//! anywhere inside a longer run of no-ops, full-label search only accepts a
//! self-contained run of exactly the label's length.

use crate::inst_set::InstSet;
use protocell_data::Genome;

/// Longest label the hardware will read.
pub const MAX_LABEL_SIZE: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CodeLabel {
    nops: Vec<u8>,
}

impl CodeLabel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_nops(nops: &[u8]) -> Self {
        let mut label = Self::new();
        for &n in nops {
            label.push(n);
        }
        label
    }

    /// Appends a modifier; ignored once the label is full.
    pub fn push(&mut self, nop: u8) {
        if self.nops.len() < MAX_LABEL_SIZE {
            self.nops.push(nop);
        }
    }

    pub fn clear(&mut self) {
        self.nops.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nops.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nops.is_empty()
    }

    #[must_use]
    pub fn nops(&self) -> &[u8] {
        &self.nops
    }

    /// Shifts every value by `amount` modulo `base`, turning a label into
    /// its complement when `amount == 1`.
    pub fn rotate(&mut self, amount: usize, base: usize) {
        if base == 0 {
            return;
        }
        for n in &mut self.nops {
            *n = ((usize::from(*n) + amount) % base) as u8;
        }
    }

    /// Reads the label as a base-`base` number, first value most significant.
    #[must_use]
    pub fn as_int(&self, base: usize) -> u64 {
        self.nops
            .iter()
            .fold(0u64, |acc, &n| acc.wrapping_mul(base as u64).wrapping_add(u64::from(n)))
    }

    #[must_use]
    pub fn as_string(&self) -> String {
        self.nops
            .iter()
            .map(|&n| char::from(b'A' + n.min(25)))
            .collect()
    }
}

fn is_nop(genome: &Genome, inst_set: &InstSet, pos: usize) -> bool {
    genome.get(pos).is_some_and(|i| inst_set.is_nop(i))
}

fn matches_at(label: &CodeLabel, genome: &Genome, inst_set: &InstSet, offset: usize) -> bool {
    label.nops().iter().enumerate().all(|(i, &want)| {
        genome
            .get(offset + i)
            .and_then(|inst| inst_set.nop_mod(inst))
            .is_some_and(|m| m == usize::from(want))
    })
}

/// Searches forward from just past a label that starts at `pos`.
///
/// Returns the position immediately following the matched sub-label.
#[must_use]
pub fn find_forward(
    label: &CodeLabel,
    genome: &Genome,
    inst_set: &InstSet,
    pos: usize,
) -> Option<usize> {
    let size = label.len();
    let len = genome.len();
    if size == 0 || pos >= len {
        return None;
    }
    let search_start = pos;
    let mut pos = pos + size;

    while pos < len {
        if is_nop(genome, inst_set, pos) {
            let mut start = pos;
            let mut end = pos + 1;
            while start > search_start && is_nop(genome, inst_set, start - 1) {
                start -= 1;
            }
            while end < len && is_nop(genome, inst_set, end) {
                end += 1;
            }
            let run = end - start;
            if run >= size {
                for offset in start..=start + run - size {
                    if matches_at(label, genome, inst_set, offset) {
                        return Some(offset + size);
                    }
                }
            }
            pos = end;
        }
        pos += size;
    }
    None
}

/// Searches backward from `pos`, which is the start of the label being
/// read minus its size.
///
/// Returns the position immediately following the no-op run that contains
/// the match.
#[must_use]
pub fn find_backward(
    label: &CodeLabel,
    genome: &Genome,
    inst_set: &InstSet,
    pos: isize,
) -> Option<usize> {
    let size = label.len() as isize;
    if size == 0 || pos >= genome.len() as isize {
        return None;
    }
    let search_start = pos;
    let mut pos = pos - size;

    while pos >= 0 {
        let p = pos as usize;
        if is_nop(genome, inst_set, p) {
            let mut start = p;
            let mut end = p + 1;
            while start > 0 && is_nop(genome, inst_set, start - 1) {
                start -= 1;
            }
            while (end as isize) < search_start && is_nop(genome, inst_set, end) {
                end += 1;
            }
            let run = (end - start) as isize;
            if run >= size {
                for offset in start..=start + (run - size) as usize {
                    if matches_at(label, genome, inst_set, offset) {
                        return Some(end);
                    }
                }
            }
            pos = start as isize - 1;
        }
        pos -= size;
    }
    None
}

/// Finds a self-contained run of no-ops equal to `label`.
///
/// Returns the position of the run's last no-op.
#[must_use]
pub fn find_full(label: &CodeLabel, genome: &Genome, inst_set: &InstSet) -> Option<usize> {
    let size = label.len();
    if size == 0 {
        return None;
    }
    let len = genome.len();
    let mut pos = 0;
    while pos < len {
        if !is_nop(genome, inst_set, pos) {
            pos += 1;
            continue;
        }
        let start = pos;
        while pos < len && is_nop(genome, inst_set, pos) {
            pos += 1;
        }
        if pos - start == size && matches_at(label, genome, inst_set, start) {
            return Some(pos - 1);
        }
    }
    None
}
