//! A dish holds one organism and, optionally, a neighbour that can receive
//! its parasites.

use protocell_core::host::DEFAULT_INPUTS;
use protocell_core::{
    Fault, Hardware, HardwareConfig, Host, InjectHost, InstSet, Offspring, Sequence,
};
use protocell_core::config::DivideMethod;
use protocell_data::Instruction;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Host side of a dish organism. Records everything the hardware reports.
#[derive(Debug, Clone, Default)]
pub struct DishHost {
    genome: Sequence,
    inputs: Vec<i32>,
    next_input: usize,
    pending: Option<Offspring>,
    pub offspring: Vec<Offspring>,
    pub outputs: Vec<i32>,
    pub faults: Vec<Fault>,
    pub dead: bool,
    pub neighbor: Option<Box<Hardware>>,
}

impl DishHost {
    #[must_use]
    pub fn new(genome: Sequence) -> Self {
        Self {
            genome,
            inputs: DEFAULT_INPUTS.to_vec(),
            ..Self::default()
        }
    }
}

impl Host for DishHost {
    fn genome(&self) -> &[Instruction] {
        &self.genome
    }

    fn set_child_genome(&mut self, offspring: Offspring) {
        self.pending = Some(offspring);
    }

    fn activate_divide(&mut self) -> bool {
        if let Some(child) = self.pending.take() {
            tracing::debug!(size = child.genome.len(), fertile = child.fertile, "offspring born");
            self.offspring.push(child);
        }
        true
    }

    fn die(&mut self) {
        self.dead = true;
    }

    fn fault(&mut self, fault: &Fault) {
        self.faults.push(fault.clone());
    }

    fn do_input(&mut self) -> i32 {
        if self.inputs.is_empty() {
            return 0;
        }
        let value = self.inputs[self.next_input];
        self.next_input = (self.next_input + 1) % self.inputs.len();
        value
    }

    fn do_output(&mut self, value: i32) {
        self.outputs.push(value);
    }

    fn flagged_to_die(&self) -> bool {
        self.dead
    }

    fn neighbor(&mut self) -> Option<&mut dyn InjectHost> {
        self.neighbor
            .as_deref_mut()
            .map(|hardware| hardware as &mut dyn InjectHost)
    }
}

/// Printable summary of one offspring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OffspringSummary {
    pub genome: String,
    /// The same genome as instruction bytes, hex encoded.
    pub hex: String,
    pub size: usize,
    pub fertile: bool,
    pub copy_true: bool,
    pub mutations: u32,
}

/// What happened during a dish run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub steps: u64,
    pub executed: u64,
    pub failed: u64,
    pub divides: u64,
    pub injections: u64,
    pub died: bool,
    /// Fault counts keyed by `location/kind`.
    pub faults: BTreeMap<String, u64>,
    pub offspring: Vec<OffspringSummary>,
}

/// One organism on its own hardware.
#[derive(Debug, Clone)]
pub struct Dish {
    pub hardware: Hardware,
    pub host: DishHost,
}

impl Dish {
    pub fn new(
        inst_set: Arc<InstSet>,
        config: Arc<HardwareConfig>,
        genome: Sequence,
    ) -> protocell_core::error::Result<Self> {
        let hardware = Hardware::new(inst_set, config, &genome)?;
        Ok(Self {
            hardware,
            host: DishHost::new(genome),
        })
    }

    /// Adds an empty neighbour that accepts injected code.
    pub fn with_neighbor(mut self) -> protocell_core::error::Result<Self> {
        let neighbor = Hardware::new(
            Arc::clone(self.hardware.inst_set()),
            Arc::clone(self.hardware.config()),
            &[],
        )?;
        self.host.neighbor = Some(Box::new(neighbor));
        Ok(self)
    }

    /// Writes the scheduler state as a binary snapshot.
    pub fn save_snapshot<P: AsRef<Path>>(&self, path: P) -> protocell_io::Result<()> {
        protocell_io::save_state(&self.hardware.save_state(), path)
    }

    /// Restores a snapshot written by [`Dish::save_snapshot`] onto the
    /// current memory. The hardware is untouched if the snapshot does not fit.
    pub fn resume<P: AsRef<Path>>(&mut self, path: P) -> protocell_io::Result<()> {
        let state = protocell_io::load_state(path)?;
        self.hardware.load_state(&state)?;
        Ok(())
    }

    /// Steps the organism up to `steps` times, stopping early if it dies.
    /// `observe` sees the hardware after every step.
    pub fn run<R, F>(&mut self, steps: u64, rng: &mut R, mut observe: F) -> RunReport
    where
        R: Rng,
        F: FnMut(u64, &Hardware),
    {
        let mut report = RunReport::default();
        for step in 1..=steps {
            let result = self.hardware.step(&mut self.host, rng);
            report.steps = step;
            observe(step, &self.hardware);
            if result.divided && self.hardware.config().divide.method != DivideMethod::Offspring {
                // Split and birth leave the parent as a new organism.
                self.host.genome = self.hardware.genome().to_sequence();
            }
            if result.died || self.host.dead {
                report.died = true;
                break;
            }
        }

        let metrics = self.hardware.metrics();
        report.executed = metrics.executed();
        report.failed = metrics.failed();
        report.divides = metrics.divides();
        report.injections = metrics.injections();
        report.faults = self
            .host
            .faults
            .iter()
            .fold(BTreeMap::new(), |mut counts, fault| {
                *counts
                    .entry(format!("{}/{:?}", fault.location, fault.kind))
                    .or_insert(0) += 1;
                counts
            });
        let inst_set = self.hardware.inst_set();
        report.offspring = self
            .host
            .offspring
            .iter()
            .map(|child| OffspringSummary {
                genome: inst_set.sequence_string(&child.genome),
                hex: protocell_io::sequence_to_hex(&child.genome),
                size: child.genome.len(),
                fertile: child.fertile,
                copy_true: child.copy_true,
                mutations: child.mutations,
            })
            .collect();
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocell_core::config::MutationConfig;
    use protocell_core::Feedback;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn dish(genome: &str) -> Dish {
        let mut fb = Feedback::new();
        let set = InstSet::from_description(
            "INST nop-A\nINST nop-B\nINST nop-C\nINST inc\nINST div\nINST IO\n",
            &mut fb,
        )
        .unwrap();
        let config = HardwareConfig {
            mutation: MutationConfig::disabled(),
            ..HardwareConfig::default()
        };
        let genome = set.parse_sequence(genome).unwrap();
        Dish::new(Arc::new(set), Arc::new(config), genome).unwrap()
    }

    #[test]
    fn test_run_counts_steps_and_faults() {
        let mut dish = dish("inc\ndiv\ninc\n");
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let report = dish.run(6, &mut rng, |_, _| {});
        assert_eq!(report.steps, 6);
        assert_eq!(report.executed, 4);
        assert_eq!(report.failed, 2);
        assert!(!report.died);
        assert_eq!(report.faults.values().sum::<u64>(), 2);
        assert!(report.offspring.is_empty());
    }

    #[test]
    fn test_io_cycles_default_inputs() {
        let mut dish = dish("IO\nIO\nIO\nIO\n");
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        dish.run(4, &mut rng, |_, _| {});
        assert_eq!(dish.host.outputs.len(), 4);
        assert_eq!(dish.host.outputs[0], 0);
        assert_eq!(dish.host.outputs[1], DEFAULT_INPUTS[0]);
    }

    #[test]
    fn test_observer_sees_every_step() {
        let mut dish = dish("inc\ninc\n");
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut seen = Vec::new();
        dish.run(3, &mut rng, |step, hw| seen.push((step, hw.time_used())));
        assert_eq!(seen.iter().map(|s| s.0).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_snapshot_resumes_scheduler() {
        let mut dish = dish("inc
inc
nop-A
inc
inc
");
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        dish.run(3, &mut rng, |_, _| {});
        let path = std::env::temp_dir().join(format!("protocell_dish_{}.rkyv", std::process::id()));
        dish.save_snapshot(&path).unwrap();
        let saved = dish.hardware.save_state();

        dish.hardware.reset();
        assert_ne!(dish.hardware.save_state(), saved);
        dish.resume(&path).unwrap();
        assert_eq!(dish.hardware.save_state(), saved);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_resume_rejects_garbage() {
        let mut dish = dish("inc
inc
");
        let path = std::env::temp_dir().join(format!("protocell_dish_{}_bad.rkyv", std::process::id()));
        std::fs::write(&path, b"not a snapshot").unwrap();
        let before = dish.hardware.save_state();
        assert!(matches!(dish.resume(&path), Err(protocell_io::IoError::Rkyv(_))));
        assert_eq!(dish.hardware.save_state(), before);
        std::fs::remove_file(path).ok();
    }
}
