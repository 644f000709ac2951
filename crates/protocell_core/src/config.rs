//! Configuration for the virtual CPU.
//!
//! Strongly-typed structures that map to a `config.toml` document. Every
//! section has defaults, so a file only needs to list what it overrides.
//!
//! ## Example `config.toml`
//!
//! ```toml
//! [architecture]
//! operand_model = "stacks"
//! local_stacks = 3
//! global_stacks = 1
//! memory_spaces = 4
//! divide_layout = "space"
//!
//! [execution]
//! max_threads = 4
//!
//! [mutation]
//! copy_mut_prob = 0.0075
//! ```

use serde::{Deserialize, Serialize};

/// Whether arithmetic operands live in registers or on stack tops.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OperandModel {
    #[default]
    Registers,
    Stacks,
}

/// How the offspring is carved out of memory on divide.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DivideLayout {
    /// Offspring is cropped out of the genome between the read and write heads.
    #[default]
    Crop,
    /// Offspring is the memory space the write head points into.
    Space,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DivideMethod {
    /// Parent untouched.
    Offspring,
    /// Parent hardware fully reset.
    #[default]
    Split,
    /// Only the dividing thread is reset.
    Birth,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ThreadSlicing {
    /// One instruction from the next thread per step.
    #[default]
    RoundRobin,
    /// One instruction from every thread per step.
    AllThreads,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AllocMethod {
    /// Fill with instruction 0.
    #[default]
    Default,
    /// Fill with random instructions.
    Random,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MutationTrigger {
    /// Applied by the external scheduler once per update.
    Update,
    /// After the read head is used by a copy.
    Read,
    /// After the write head is used by a copy.
    Write,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MutationScope {
    /// Probability that exactly one site anywhere mutates.
    Genome,
    /// Per-site probability at the triggering head only.
    Local,
    /// Per-site probability; binomial count of uniformly drawn sites.
    Global,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    Point,
    Insert,
    Delete,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct MutationRule {
    pub trigger: MutationTrigger,
    pub scope: MutationScope,
    pub kind: MutationKind,
    pub rate: f64,
}

/// Register/stack/memory shape of the hardware.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ArchitectureConfig {
    pub operand_model: OperandModel,
    pub registers: usize,
    pub local_stacks: usize,
    pub global_stacks: usize,
    pub stack_depth: usize,
    pub memory_spaces: usize,
    pub divide_layout: DivideLayout,
}

impl Default for ArchitectureConfig {
    fn default() -> Self {
        Self {
            operand_model: OperandModel::Registers,
            registers: 3,
            local_stacks: 1,
            global_stacks: 1,
            stack_depth: 10,
            memory_spaces: 1,
            divide_layout: DivideLayout::Crop,
        }
    }
}

impl ArchitectureConfig {
    /// Total stacks addressable by a thread (locals first, then globals).
    #[must_use]
    pub fn total_stacks(&self) -> usize {
        self.local_stacks + self.global_stacks
    }

    /// Number of values a modifier can select between.
    #[must_use]
    pub fn operand_count(&self) -> usize {
        match self.operand_model {
            OperandModel::Registers => self.registers,
            OperandModel::Stacks => self.total_stacks(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ExecutionConfig {
    pub max_threads: usize,
    pub thread_slicing: ThreadSlicing,
    /// Label sites beyond this length are read but not flagged executed.
    pub max_label_exe_size: usize,
    /// Steps before the organism is reported dead; 0 disables the limit.
    pub max_executed: u64,
    pub alloc_method: AllocMethod,
    pub require_allocate: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_threads: 1,
            thread_slicing: ThreadSlicing::RoundRobin,
            max_label_exe_size: 1,
            max_executed: 0,
            alloc_method: AllocMethod::Default,
            require_allocate: true,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct GenomeConfig {
    pub min_size: usize,
    pub max_size: usize,
    pub offspring_size_range: f64,
    pub min_exe_lines: f64,
    pub min_copied_lines: f64,
    pub inject_min_size: usize,
}

impl Default for GenomeConfig {
    fn default() -> Self {
        Self {
            min_size: 8,
            max_size: 2048,
            offspring_size_range: 2.0,
            min_exe_lines: 0.5,
            min_copied_lines: 0.5,
            inject_min_size: 1,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct DivideConfig {
    pub method: DivideMethod,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct MutationConfig {
    /// Per-copy chance that `h-copy`/`h-read` yields a random instruction.
    pub copy_mut_prob: f64,
    /// Single forced point mutation on the offspring.
    pub divide_mut_prob: f64,
    pub divide_ins_prob: f64,
    pub divide_del_prob: f64,
    /// Per-site rates applied to the offspring.
    pub div_mut_prob: f64,
    pub div_ins_prob: f64,
    pub div_del_prob: f64,
    /// Per-site substitution sweep over the parent after divide.
    pub parent_mut_prob: f64,
    pub inject_mut_prob: f64,
    pub inject_ins_prob: f64,
    pub inject_del_prob: f64,
    /// Whether insert/delete rules change memory length during execution.
    pub indels_during_execution: bool,
    pub rules: Vec<MutationRule>,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            copy_mut_prob: 0.0075,
            divide_mut_prob: 0.0,
            divide_ins_prob: 0.05,
            divide_del_prob: 0.05,
            div_mut_prob: 0.0,
            div_ins_prob: 0.0,
            div_del_prob: 0.0,
            parent_mut_prob: 0.0,
            inject_mut_prob: 0.0,
            inject_ins_prob: 0.0,
            inject_del_prob: 0.0,
            indels_during_execution: false,
            rules: Vec::new(),
        }
    }
}

impl MutationConfig {
    /// All rates zero; used for isolated evaluation.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            copy_mut_prob: 0.0,
            divide_ins_prob: 0.0,
            divide_del_prob: 0.0,
            ..Self::default()
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct FitnessTestConfig {
    pub enabled: bool,
    /// Lower neutral bound as a multiple of parent fitness.
    pub neutral_min: f64,
    /// Upper neutral bound as a multiple of parent fitness.
    pub neutral_max: f64,
    pub revert_fatal: f64,
    pub revert_negative: f64,
    pub revert_neutral: f64,
    pub revert_positive: f64,
    pub sterilize_fatal: f64,
    pub sterilize_negative: f64,
    pub sterilize_neutral: f64,
    pub sterilize_positive: f64,
    /// Evaluation budget in steps per genome line.
    pub max_test_steps_factor: u64,
}

impl Default for FitnessTestConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            neutral_min: 0.99,
            neutral_max: 1.01,
            revert_fatal: 0.0,
            revert_negative: 0.0,
            revert_neutral: 0.0,
            revert_positive: 0.0,
            sterilize_fatal: 0.0,
            sterilize_negative: 0.0,
            sterilize_neutral: 0.0,
            sterilize_positive: 0.0,
            max_test_steps_factor: 20,
        }
    }
}

/// Complete hardware configuration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct HardwareConfig {
    pub architecture: ArchitectureConfig,
    pub execution: ExecutionConfig,
    pub genome: GenomeConfig,
    pub divide: DivideConfig,
    pub mutation: MutationConfig,
    pub fitness_test: FitnessTestConfig,
}

fn ensure_prob(value: f64, name: &str) -> anyhow::Result<()> {
    anyhow::ensure!(
        (0.0..=1.0).contains(&value),
        "{name} must be within [0, 1] (got {value})"
    );
    Ok(())
}

impl HardwareConfig {
    /// Three registers, a local and a global stack, a single memory space.
    #[must_use]
    pub fn register_machine() -> Self {
        Self::default()
    }

    /// Four thread-local operand stacks over one memory space.
    #[must_use]
    pub fn stack_machine() -> Self {
        Self {
            architecture: ArchitectureConfig {
                operand_model: OperandModel::Stacks,
                registers: 0,
                local_stacks: 4,
                global_stacks: 0,
                ..ArchitectureConfig::default()
            },
            ..Self::default()
        }
    }

    /// Three local stacks plus a shared one, four memory spaces, offspring
    /// built in a separate space, and room for parasite threads.
    #[must_use]
    pub fn multi_stack_machine() -> Self {
        Self {
            architecture: ArchitectureConfig {
                operand_model: OperandModel::Stacks,
                registers: 0,
                local_stacks: 3,
                global_stacks: 1,
                memory_spaces: 4,
                divide_layout: DivideLayout::Space,
                ..ArchitectureConfig::default()
            },
            execution: ExecutionConfig {
                max_threads: 4,
                require_allocate: false,
                ..ExecutionConfig::default()
            },
            ..Self::default()
        }
    }

    /// Validates configuration values.
    pub fn validate(&self) -> anyhow::Result<()> {
        let arch = &self.architecture;
        anyhow::ensure!(arch.operand_count() > 0, "Operand model has no operands");
        anyhow::ensure!(
            arch.operand_count() <= 16,
            "Too many operands (max 16)"
        );
        anyhow::ensure!(arch.total_stacks() > 0, "At least one stack is required");
        anyhow::ensure!(arch.stack_depth > 0, "Stack depth must be positive");
        anyhow::ensure!(arch.memory_spaces > 0, "At least one memory space is required");
        anyhow::ensure!(
            arch.memory_spaces <= 64,
            "Too many memory spaces (max 64)"
        );
        anyhow::ensure!(
            arch.divide_layout != DivideLayout::Space || arch.memory_spaces > 1,
            "Space divide layout needs an auxiliary memory space"
        );

        let exec = &self.execution;
        anyhow::ensure!(exec.max_threads > 0, "Max threads must be positive");
        anyhow::ensure!(exec.max_threads <= 64, "Max threads too large (max 64)");

        let genome = &self.genome;
        anyhow::ensure!(genome.min_size > 0, "Minimum genome size must be positive");
        anyhow::ensure!(
            genome.min_size <= genome.max_size,
            "Minimum genome size exceeds maximum"
        );
        anyhow::ensure!(
            genome.max_size <= u32::MAX as usize,
            "Maximum genome size too large"
        );
        anyhow::ensure!(
            genome.offspring_size_range >= 1.0,
            "Offspring size range must be at least 1.0"
        );
        ensure_prob(genome.min_exe_lines, "min_exe_lines")?;
        ensure_prob(genome.min_copied_lines, "min_copied_lines")?;

        let m = &self.mutation;
        for (value, name) in [
            (m.copy_mut_prob, "copy_mut_prob"),
            (m.divide_mut_prob, "divide_mut_prob"),
            (m.divide_ins_prob, "divide_ins_prob"),
            (m.divide_del_prob, "divide_del_prob"),
            (m.div_mut_prob, "div_mut_prob"),
            (m.div_ins_prob, "div_ins_prob"),
            (m.div_del_prob, "div_del_prob"),
            (m.parent_mut_prob, "parent_mut_prob"),
            (m.inject_mut_prob, "inject_mut_prob"),
            (m.inject_ins_prob, "inject_ins_prob"),
            (m.inject_del_prob, "inject_del_prob"),
        ] {
            ensure_prob(value, name)?;
        }
        for rule in &m.rules {
            ensure_prob(rule.rate, "mutation rule rate")?;
        }

        let ft = &self.fitness_test;
        anyhow::ensure!(
            ft.neutral_min <= 1.0 && ft.neutral_max >= 1.0,
            "Neutral band must contain the parent fitness"
        );
        for (value, name) in [
            (ft.revert_fatal, "revert_fatal"),
            (ft.revert_negative, "revert_negative"),
            (ft.revert_neutral, "revert_neutral"),
            (ft.revert_positive, "revert_positive"),
            (ft.sterilize_fatal, "sterilize_fatal"),
            (ft.sterilize_negative, "sterilize_negative"),
            (ft.sterilize_neutral, "sterilize_neutral"),
            (ft.sterilize_positive, "sterilize_positive"),
        ] {
            ensure_prob(value, name)?;
        }
        anyhow::ensure!(
            ft.max_test_steps_factor > 0,
            "Test step factor must be positive"
        );

        Ok(())
    }

    /// Parses and validates a TOML document.
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config = toml::from_str::<Self>(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Stable digest of every parameter that changes organism behaviour.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(format!("{:?}", self.architecture).as_bytes());
        hasher.update(format!("{:?}", self.execution).as_bytes());
        hasher.update(format!("{:?}", self.genome).as_bytes());
        hasher.update(format!("{:?}", self.divide).as_bytes());
        hasher.update(format!("{:?}", self.mutation).as_bytes());
        hasher.update(format!("{:?}", self.fitness_test).as_bytes());
        hex::encode(hasher.finalize())
    }
}
