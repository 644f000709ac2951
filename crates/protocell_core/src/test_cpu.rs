//! Isolated evaluation of a genome.
//!
//! Runs one organism on a private hardware core with mutations and nested
//! fitness testing switched off, stopping at its first offspring.

use crate::config::{DivideMethod, HardwareConfig, MutationConfig};
use crate::error::Result;
use crate::hardware::Hardware;
use crate::host::IsolatedHost;
use crate::inst_set::InstSet;
use protocell_data::Instruction;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Result of one isolated run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub divided: bool,
    /// Steps until the first divide, or the steps spent if none happened.
    pub gestation: u64,
    pub executed_size: usize,
    pub copied_size: usize,
    /// `min(executed_size, copied_size) / gestation`; 0 without a divide.
    pub fitness: f64,
    pub offspring: Vec<Instruction>,
}

#[derive(Debug, Clone)]
pub struct TestCpu {
    hardware: Hardware,
    steps_per_line: u64,
}

impl TestCpu {
    /// Derives the isolated configuration from `config`.
    pub fn new(inst_set: Arc<InstSet>, config: &HardwareConfig) -> Result<Self> {
        let mut isolated = config.clone();
        isolated.mutation = MutationConfig {
            rules: Vec::new(),
            ..MutationConfig::disabled()
        };
        isolated.fitness_test.enabled = false;
        isolated.divide.method = DivideMethod::Offspring;
        isolated.execution.max_executed = 0;
        let steps_per_line = config.fitness_test.max_test_steps_factor;
        Ok(Self {
            hardware: Hardware::new(inst_set, Arc::new(isolated), &[])?,
            steps_per_line,
        })
    }

    /// Runs `genome` until it divides, dies or exhausts its step budget.
    pub fn test_genome<R: Rng>(&mut self, genome: &[Instruction], rng: &mut R) -> TestResult {
        let mut host = IsolatedHost::new(genome.to_vec());
        self.hardware.load_genome(genome);
        let budget = self.steps_per_line * genome.len().max(1) as u64;

        let mut steps = 0;
        while steps < budget {
            steps += 1;
            let report = self.hardware.step(&mut host, rng);
            if report.divided || report.died {
                break;
            }
        }

        let Some(child) = host.offspring.first() else {
            return TestResult {
                gestation: steps,
                ..TestResult::default()
            };
        };
        let fitness = child.executed_size.min(child.copied_size) as f64 / steps as f64;
        TestResult {
            divided: true,
            gestation: steps,
            executed_size: child.executed_size,
            copied_size: child.copied_size,
            fitness,
            offspring: child.genome.clone(),
        }
    }
}
