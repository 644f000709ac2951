//! The boundary between a hardware core and the organism that owns it.
//!
//! The core never reaches into population state; everything it needs from
//! outside goes through [`Host`], and the only way it touches another
//! organism is the narrow [`InjectHost`] interface.

use crate::error::{Fault, InjectError};
use crate::label::CodeLabel;
use protocell_data::{Instruction, Sequence};

/// A finished offspring handed to the population layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Offspring {
    pub genome: Sequence,
    pub fertile: bool,
    /// The offspring was replaced by the parent genome after fitness testing.
    pub reverted: bool,
    /// Offspring is identical to the parent genome.
    pub copy_true: bool,
    pub mutations: u32,
    pub executed_size: usize,
    pub copied_size: usize,
}

/// Services the owning organism provides to its hardware.
pub trait Host {
    /// The genome the organism was born with.
    fn genome(&self) -> &[Instruction];

    fn set_child_genome(&mut self, offspring: Offspring);

    /// Hands the pending offspring to the population. Returns whether the
    /// parent survives the divide.
    fn activate_divide(&mut self) -> bool;

    fn die(&mut self);

    fn fault(&mut self, fault: &Fault);

    fn do_input(&mut self) -> i32;

    fn do_output(&mut self, value: i32);

    /// Pays an instruction's energy cost. Refusal kills the organism.
    fn consume_energy(&mut self, _amount: f64) -> bool {
        true
    }

    /// Called when the instruction pointer reaches a breakpoint-flagged line.
    fn breakpoint(&mut self, _space: usize, _position: usize) {}

    /// External death signal, checked once per step.
    fn flagged_to_die(&self) -> bool {
        false
    }

    /// Neighbouring organism for cross-organism instructions.
    fn neighbor(&mut self) -> Option<&mut dyn InjectHost> {
        None
    }
}

/// What an organism exposes to parasites trying to enter it.
pub trait InjectHost {
    /// Copies `code` into a free memory space, binds it to `label` and
    /// starts a thread on it. On failure nothing in the target changes.
    /// Returns the space used.
    fn inject(&mut self, label: &CodeLabel, code: &[Instruction]) -> Result<usize, InjectError>;
}

/// A self-contained host: fixed genome, cycling inputs, everything else
/// recorded for inspection.
#[derive(Debug, Clone, Default)]
pub struct IsolatedHost {
    genome: Sequence,
    inputs: Vec<i32>,
    next_input: usize,
    pub offspring: Vec<Offspring>,
    pub outputs: Vec<i32>,
    pub faults: Vec<Fault>,
    pub breakpoints: Vec<(usize, usize)>,
    pub dead: bool,
    /// When set, `activate_divide` reports the parent as not surviving.
    pub parent_dies_on_divide: bool,
    /// Remaining energy; `None` means unlimited.
    pub energy: Option<f64>,
}

/// Default environment inputs.
pub const DEFAULT_INPUTS: [i32; 3] = [0x0f13_149f, 0x3308_e53e, 0x5562_41eb];

impl IsolatedHost {
    #[must_use]
    pub fn new(genome: Sequence) -> Self {
        Self {
            genome,
            inputs: DEFAULT_INPUTS.to_vec(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_inputs(mut self, inputs: Vec<i32>) -> Self {
        self.inputs = inputs;
        self
    }

    #[must_use]
    pub fn with_energy(mut self, energy: f64) -> Self {
        self.energy = Some(energy);
        self
    }

    /// Makes the most recent offspring the organism's genome.
    pub fn set_genome(&mut self, genome: Sequence) {
        self.genome = genome;
    }
}

impl Host for IsolatedHost {
    fn genome(&self) -> &[Instruction] {
        &self.genome
    }

    fn set_child_genome(&mut self, offspring: Offspring) {
        self.offspring.push(offspring);
    }

    fn activate_divide(&mut self) -> bool {
        !self.parent_dies_on_divide
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
        let value = self.inputs[self.next_input % self.inputs.len()];
        self.next_input = (self.next_input + 1) % self.inputs.len();
        value
    }

    fn do_output(&mut self, value: i32) {
        self.outputs.push(value);
    }

    fn consume_energy(&mut self, amount: f64) -> bool {
        match self.energy.as_mut() {
            None => true,
            Some(e) if *e >= amount => {
                *e -= amount;
                true
            }
            Some(_) => false,
        }
    }

    fn breakpoint(&mut self, space: usize, position: usize) {
        self.breakpoints.push((space, position));
    }

    fn flagged_to_die(&self) -> bool {
        self.dead
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inputs_cycle() {
        let mut host = IsolatedHost::new(Vec::new()).with_inputs(vec![1, 2]);
        assert_eq!(host.do_input(), 1);
        assert_eq!(host.do_input(), 2);
        assert_eq!(host.do_input(), 1);
    }

    #[test]
    fn test_energy_budget() {
        let mut host = IsolatedHost::new(Vec::new()).with_energy(1.5);
        assert!(host.consume_energy(1.0));
        assert!(!host.consume_energy(1.0));
        assert!(host.consume_energy(0.5));
    }
}
