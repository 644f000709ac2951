pub mod macros;

use protocell_core::config::MutationConfig;
use protocell_core::{
    Fault, Feedback, Hardware, HardwareConfig, Host, InjectHost, InstSet, Offspring, Sequence,
};
use protocell_data::Instruction;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;

pub const HEADS_SET: &str = include_str!("../../support/config/instset-heads.cfg");
pub const HEADS_ANCESTOR: &str = include_str!("../../support/config/default-heads.org");
pub const SMT_SET: &str = include_str!("../../support/config/instset-smt.cfg");
pub const SMT_ANCESTOR: &str = include_str!("../../support/config/default-smt.org");
pub const SMT_CONFIG: &str = include_str!("../../support/config/config.toml");

/// Something the hardware told its host, in order.
#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    Fault(Fault),
    Divide(usize),
    Breakpoint(usize, usize),
    Output(i32),
    Died,
}

/// A host that records every callback and optionally owns a neighbour.
#[allow(dead_code)]
#[derive(Default)]
pub struct RecordingHost {
    pub genome: Sequence,
    pub events: Vec<HostEvent>,
    pub offspring: Vec<Offspring>,
    pub neighbor: Option<Hardware>,
    pub parent_survives: bool,
    pub dead: bool,
}

#[allow(dead_code)]
impl RecordingHost {
    pub fn new(genome: Sequence) -> Self {
        Self {
            genome,
            parent_survives: true,
            ..Self::default()
        }
    }

    pub fn faults(&self) -> Vec<&Fault> {
        self.events
            .iter()
            .filter_map(|e| match e {
                HostEvent::Fault(f) => Some(f),
                _ => None,
            })
            .collect()
    }
}

impl Host for RecordingHost {
    fn genome(&self) -> &[Instruction] {
        &self.genome
    }

    fn set_child_genome(&mut self, offspring: Offspring) {
        self.events.push(HostEvent::Divide(offspring.genome.len()));
        self.offspring.push(offspring);
    }

    fn activate_divide(&mut self) -> bool {
        self.parent_survives
    }

    fn die(&mut self) {
        self.dead = true;
        self.events.push(HostEvent::Died);
    }

    fn fault(&mut self, fault: &Fault) {
        self.events.push(HostEvent::Fault(fault.clone()));
    }

    fn do_input(&mut self) -> i32 {
        7
    }

    fn do_output(&mut self, value: i32) {
        self.events.push(HostEvent::Output(value));
    }

    fn breakpoint(&mut self, space: usize, position: usize) {
        self.events.push(HostEvent::Breakpoint(space, position));
    }

    fn neighbor(&mut self) -> Option<&mut dyn InjectHost> {
        self.neighbor.as_mut().map(|h| h as &mut dyn InjectHost)
    }
}

/// An organism under test: hardware, its host and a seeded generator.
#[allow(dead_code)]
pub struct Organism {
    pub inst_set: Arc<InstSet>,
    pub hardware: Hardware,
    pub host: RecordingHost,
    pub rng: ChaCha8Rng,
}

#[allow(dead_code)]
impl Organism {
    pub fn step(&mut self) -> protocell_core::StepReport {
        self.hardware.step(&mut self.host, &mut self.rng)
    }

    /// Steps until a divide, returning the number of steps taken, or `None`
    /// if `limit` steps pass without one.
    pub fn run_until_divide(&mut self, limit: u64) -> Option<u64> {
        (1..=limit).find(|_| self.step().divided)
    }

    /// A fresh hardware of the same kind, ready to be a neighbour.
    pub fn sibling(&self, genome: &[Instruction]) -> Hardware {
        Hardware::new(
            Arc::clone(&self.inst_set),
            Arc::clone(self.hardware.config()),
            genome,
        )
        .unwrap()
    }
}

#[allow(dead_code)]
pub struct HardwareBuilder {
    description: String,
    config: HardwareConfig,
    genome: String,
    seed: u64,
}

#[allow(dead_code)]
impl HardwareBuilder {
    /// Register machine, heads instruction set, no mutations.
    pub fn new() -> Self {
        Self {
            description: HEADS_SET.to_string(),
            config: HardwareConfig {
                mutation: MutationConfig::disabled(),
                ..HardwareConfig::default()
            },
            genome: String::new(),
            seed: 42,
        }
    }

    /// Multi-space stack machine from the support config, mutations off.
    pub fn smt() -> Self {
        let mut config = HardwareConfig::from_toml(SMT_CONFIG).unwrap();
        config.mutation = MutationConfig::disabled();
        Self {
            description: SMT_SET.to_string(),
            config,
            genome: String::new(),
            seed: 42,
        }
    }

    pub fn with_inst_set(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_config<F>(mut self, modifier: F) -> Self
    where
        F: FnOnce(&mut HardwareConfig),
    {
        modifier(&mut self.config);
        self
    }

    pub fn with_genome(mut self, text: &str) -> Self {
        self.genome = text.to_string();
        self
    }

    pub fn with_names(mut self, names: &[&str]) -> Self {
        self.genome = names.join("\n");
        self
    }

    pub fn build(self) -> Organism {
        let mut feedback = Feedback::new();
        let inst_set =
            Arc::new(InstSet::from_description(&self.description, &mut feedback).unwrap());
        assert!(!feedback.has_errors(), "{:?}", feedback.entries());
        let genome = inst_set.parse_sequence(&self.genome).unwrap();
        let hardware =
            Hardware::new(Arc::clone(&inst_set), Arc::new(self.config), &genome).unwrap();
        Organism {
            inst_set,
            hardware,
            host: RecordingHost::new(genome),
            rng: ChaCha8Rng::seed_from_u64(self.seed),
        }
    }
}
