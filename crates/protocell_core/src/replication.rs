//! Divide viability and offspring fitness classification.

use crate::config::{FitnessTestConfig, GenomeConfig};
use crate::error::Fault;
use protocell_data::{FaultKind, FaultLocation};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Line counts gathered at divide time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DivideCounts {
    /// Length of the genome the organism was born with.
    pub genome_size: usize,
    pub parent_size: usize,
    pub child_size: usize,
    /// Parent lines flagged executed.
    pub executed: usize,
    /// Offspring lines flagged copied.
    pub copied: usize,
}

/// Checks a pending divide against the size and activity thresholds.
///
/// Both parent and offspring must fall within
/// `[max(min_size, genome / range), min(max_size, genome * range)]`.
pub fn check_viability(config: &GenomeConfig, counts: &DivideCounts) -> Result<(), Fault> {
    let genome = counts.genome_size as f64;
    let range = config.offspring_size_range;
    let min_size = (config.min_size as f64).max(genome / range);
    let max_size = (config.max_size as f64).min(genome * range);
    let in_bounds = |size: usize| (min_size..=max_size).contains(&(size as f64));

    if !in_bounds(counts.child_size) {
        return Err(Fault::new(
            FaultLocation::Divide,
            FaultKind::InvalidOffspringSize,
            format!(
                "offspring of {} lines outside [{min_size}, {max_size}]",
                counts.child_size
            ),
        ));
    }
    if !in_bounds(counts.parent_size) {
        return Err(Fault::new(
            FaultLocation::Divide,
            FaultKind::InvalidParentSize,
            format!(
                "parent of {} lines outside [{min_size}, {max_size}]",
                counts.parent_size
            ),
        ));
    }
    let min_executed = (counts.parent_size as f64 * config.min_exe_lines) as usize;
    if counts.executed < min_executed {
        return Err(Fault::new(
            FaultLocation::Divide,
            FaultKind::TooFewExecuted,
            format!("{} of {min_executed} lines executed", counts.executed),
        ));
    }
    let min_copied = (counts.child_size as f64 * config.min_copied_lines) as usize;
    if counts.copied < min_copied {
        return Err(Fault::new(
            FaultLocation::Divide,
            FaultKind::TooFewCopied,
            format!("{} of {min_copied} lines copied", counts.copied),
        ));
    }
    Ok(())
}

/// Offspring fitness relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitnessBand {
    /// The offspring cannot reproduce.
    Fatal,
    Negative,
    Neutral,
    Positive,
}

impl FitnessBand {
    #[must_use]
    pub fn classify(parent: f64, child: f64, config: &FitnessTestConfig) -> Self {
        if child <= 0.0 {
            FitnessBand::Fatal
        } else if child < parent * config.neutral_min {
            FitnessBand::Negative
        } else if child <= parent * config.neutral_max {
            FitnessBand::Neutral
        } else {
            FitnessBand::Positive
        }
    }
}

/// Outcome of a fitness test.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Replace the offspring with the parent genome.
    pub revert: bool,
    /// Mark the offspring infertile.
    pub sterilize: bool,
}

impl Verdict {
    /// Rolls revert and sterilize independently with the band's probabilities.
    pub fn roll<R: Rng>(band: FitnessBand, config: &FitnessTestConfig, rng: &mut R) -> Self {
        let (revert, sterilize) = match band {
            FitnessBand::Fatal => (config.revert_fatal, config.sterilize_fatal),
            FitnessBand::Negative => (config.revert_negative, config.sterilize_negative),
            FitnessBand::Neutral => (config.revert_neutral, config.sterilize_neutral),
            FitnessBand::Positive => (config.revert_positive, config.sterilize_positive),
        };
        let mut roll = |p: f64| p > 0.0 && rng.gen::<f64>() < p;
        Self {
            revert: roll(revert),
            sterilize: roll(sterilize),
        }
    }
}
