//! The hardware core: memory spaces, threads and the execution loop.
//!
//! One generic machine covers register, stack and multi-space layouts; the
//! differences live entirely in [`ArchitectureConfig`]. Heads are plain
//! `(space, position)` values owned by threads, and every edit that shifts
//! lines inside a space rebases the heads that point into it.

mod execute;
mod flow;
mod inject;
mod math;
mod replicate;
mod state;

pub use execute::StepReport;

use crate::config::{ArchitectureConfig, HardwareConfig, MutationKind, MutationTrigger, OperandModel};
use crate::error::{CoreError, Fault, Result};
use crate::head::HeadLogic;
use crate::host::Host;
use crate::inst_set::InstSet;
use crate::label::CodeLabel;
use crate::metrics::HardwareMetrics;
use crate::mutation;
use crate::stack::CpuStack;
use crate::thread::{Thread, ThreadSet};
use protocell_data::{Genome, Head, HeadId, Instruction, SiteFlags};
use rand::Rng;
use std::fmt::Write as _;
use std::ops::Range;
use std::sync::Arc;

/// Default operand slots.
pub(crate) const AX: usize = 0;
pub(crate) const BX: usize = 1;
pub(crate) const CX: usize = 2;

type Outcome = std::result::Result<(), Fault>;

#[derive(Debug, Clone)]
pub struct Hardware {
    inst_set: Arc<InstSet>,
    config: Arc<HardwareConfig>,
    /// Space 0 is the organism's genome; the rest hold offspring or parasites.
    memory: Vec<Genome>,
    threads: ThreadSet,
    global_stacks: Vec<CpuStack>,
    /// Label bound to each memory space by `mem-set` or injection.
    space_labels: Vec<Option<CodeLabel>>,
    /// Outstanding first-time cost per instruction-set entry.
    ft_costs: Vec<u32>,
    time_used: u64,
    allocated: bool,
    advance_ip: bool,
    divided: bool,
    to_die: bool,
    metrics: HardwareMetrics,
}

impl Hardware {
    /// Builds a core for `genome`. Fails if the configuration does not
    /// validate or the instruction set is empty.
    pub fn new(
        inst_set: Arc<InstSet>,
        config: Arc<HardwareConfig>,
        genome: &[Instruction],
    ) -> Result<Self> {
        config
            .validate()
            .map_err(|e| CoreError::InvalidConfig(e.to_string()))?;
        if inst_set.is_empty() {
            return Err(CoreError::EmptyInstructionSet);
        }
        let arch = &config.architecture;
        let mut hardware = Self {
            memory: vec![Genome::default(); arch.memory_spaces],
            threads: ThreadSet::new(arch, config.execution.max_threads),
            global_stacks: vec![CpuStack::new(arch.stack_depth); arch.global_stacks],
            space_labels: vec![None; arch.memory_spaces],
            ft_costs: Vec::new(),
            time_used: 0,
            allocated: false,
            advance_ip: true,
            divided: false,
            to_die: false,
            metrics: HardwareMetrics::new(),
            inst_set,
            config,
        };
        hardware.load_genome(genome);
        Ok(hardware)
    }

    /// Replaces the genome and resets all execution state.
    pub fn load_genome(&mut self, genome: &[Instruction]) {
        self.memory[0].assign(genome);
        self.reset();
    }

    /// Returns the core to its just-born state over the current genome:
    /// one thread at line 0, empty auxiliary spaces, fresh costs.
    pub fn reset(&mut self) {
        let fill = self.inst_set.default_instruction();
        self.memory[0].retain_flags(SiteFlags::BREAKPOINT);
        for space in self.memory.iter_mut().skip(1) {
            space.assign(&[fill]);
        }
        self.space_labels.iter_mut().for_each(|l| *l = None);
        self.threads.reset(&self.config.architecture);
        self.global_stacks.iter_mut().for_each(CpuStack::clear);
        self.reset_ft_costs();
        self.time_used = 0;
        self.allocated = false;
        self.advance_ip = true;
        self.divided = false;
        self.to_die = false;
    }

    fn reset_ft_costs(&mut self) {
        self.ft_costs.clear();
        self.ft_costs
            .extend(self.inst_set.entries().iter().map(|e| e.initial_cost));
    }

    #[must_use]
    pub fn inst_set(&self) -> &Arc<InstSet> {
        &self.inst_set
    }

    #[must_use]
    pub fn config(&self) -> &Arc<HardwareConfig> {
        &self.config
    }

    fn arch(&self) -> &ArchitectureConfig {
        &self.config.architecture
    }

    /// The organism's own genome (memory space 0).
    #[must_use]
    pub fn genome(&self) -> &Genome {
        &self.memory[0]
    }

    #[must_use]
    pub fn memory(&self, space: usize) -> Option<&Genome> {
        self.memory.get(space)
    }

    #[must_use]
    pub fn memory_spaces(&self) -> usize {
        self.memory.len()
    }

    #[must_use]
    pub fn space_label(&self, space: usize) -> Option<&CodeLabel> {
        self.space_labels.get(space).and_then(Option::as_ref)
    }

    /// Position of head `id` of the thread at `thread`.
    #[must_use]
    pub fn head(&self, id: HeadId, thread: usize) -> Option<Head> {
        self.threads.get(thread).map(|t| t.head(id))
    }

    #[must_use]
    pub fn threads(&self) -> &ThreadSet {
        &self.threads
    }

    #[must_use]
    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    #[must_use]
    pub fn current_thread(&self) -> &Thread {
        self.threads.current()
    }

    /// Direct access to the running thread, for priming registers and heads.
    pub fn current_thread_mut(&mut self) -> &mut Thread {
        self.threads.current_mut()
    }

    #[must_use]
    pub fn global_stack(&self, index: usize) -> Option<&CpuStack> {
        self.global_stacks.get(index)
    }

    /// Steps plus additional time costs since the last reset.
    #[must_use]
    pub fn time_used(&self) -> u64 {
        self.time_used
    }

    #[must_use]
    pub fn is_allocated(&self) -> bool {
        self.allocated
    }

    #[must_use]
    pub fn metrics(&self) -> &HardwareMetrics {
        &self.metrics
    }

    pub fn set_breakpoint(&mut self, space: usize, position: usize) {
        if let Some(genome) = self.memory.get_mut(space) {
            genome.set_flag(position, SiteFlags::BREAKPOINT);
        }
    }

    /// Value of operand `index` in the current thread.
    #[must_use]
    pub fn operand_value(&self, index: usize) -> i32 {
        self.operand(index % self.operand_count())
    }

    /// One-line dump of the running thread.
    #[must_use]
    pub fn status_line(&self) -> String {
        let t = self.threads.current();
        let ip = t.head(HeadId::Ip);
        let inst = self
            .memory
            .get(ip.space())
            .and_then(|g| g.get(ip.position()))
            .map_or("-", |i| self.inst_set.name(i));
        let mut line = format!(
            "t{} [{}] IP:{}:{} {:<10}",
            t.id,
            self.time_used,
            ip.space(),
            ip.position(),
            inst
        );
        for i in 0..self.operand_count() {
            let _ = write!(line, " {}X:{}", char::from(b'A' + (i as u8).min(25)), self.operand(i));
        }
        let _ = write!(
            line,
            "  R:{} W:{} F:{} RL:{}",
            t.head(HeadId::Read).position(),
            t.head(HeadId::Write).position(),
            t.head(HeadId::Flow).position(),
            t.read_label.as_string()
        );
        line
    }

    // ----- heads -----

    fn space_len(&self, space: usize) -> usize {
        self.memory.get(space).map_or(0, Genome::len)
    }

    fn head_of(&self, id: HeadId) -> Head {
        self.threads.current().head(id)
    }

    fn set_head_of(&mut self, id: HeadId, head: Head) {
        *self.threads.current_mut().head_mut(id) = head;
    }

    /// Re-validates head `id` against its space and returns it.
    fn adjusted(&mut self, id: HeadId) -> Head {
        let mut head = self.head_of(id);
        head.adjust(self.space_len(head.space()));
        self.set_head_of(id, head);
        head
    }

    fn advance_head(&mut self, id: HeadId) {
        let mut head = self.head_of(id);
        head.advance(self.space_len(head.space()));
        self.set_head_of(id, head);
    }

    fn adjust_all_heads(&mut self) {
        let lens: Vec<usize> = self.memory.iter().map(Genome::len).collect();
        for thread in self.threads.iter_mut() {
            for head in &mut thread.heads {
                head.adjust(lens.get(head.space()).copied().unwrap_or(0));
            }
        }
    }

    fn instruction_at(&self, head: Head) -> Option<Instruction> {
        self.memory.get(head.space())?.get(head.position())
    }

    /// Consumes the no-op after the IP as a modifier, if there is one. An
    /// instruction on the last line has no modifier.
    fn read_modifier(&mut self) -> Option<usize> {
        let ip = self.head_of(HeadId::Ip);
        let next = ip.following(self.space_len(ip.space()))?;
        let modifier = self
            .instruction_at(next)
            .and_then(|inst| self.inst_set.nop_mod(inst))?;
        self.set_head_of(HeadId::Ip, next);
        self.memory[next.space()].set_flag(next.position(), SiteFlags::EXECUTED);
        Some(modifier)
    }

    fn modified_head(&mut self, default: HeadId) -> HeadId {
        self.read_modifier()
            .and_then(HeadId::from_modifier)
            .unwrap_or(default)
    }

    /// Reads the no-op run after the IP into the thread's label buffer,
    /// leaving the IP on the last no-op read. The run ends at the end of
    /// the space.
    fn read_label(&mut self) {
        let max_exe = self.config.execution.max_label_exe_size;
        let mut label = CodeLabel::new();
        loop {
            let ip = self.head_of(HeadId::Ip);
            let Some(next) = ip.following(self.space_len(ip.space())) else {
                break;
            };
            let Some(nop) = self
                .instruction_at(next)
                .and_then(|inst| self.inst_set.nop_mod(inst))
            else {
                break;
            };
            if label.len() >= crate::label::MAX_LABEL_SIZE {
                break;
            }
            self.set_head_of(HeadId::Ip, next);
            label.push(nop as u8);
            if label.len() <= max_exe {
                self.memory[next.space()].set_flag(next.position(), SiteFlags::EXECUTED);
            }
        }
        self.threads.current_mut().next_label = label;
    }

    /// Records an instruction passing under the read head.
    fn note_read(&mut self, inst: Instruction) {
        let nop = self.inst_set.nop_mod(inst);
        let label = &mut self.threads.current_mut().read_label;
        match nop {
            Some(n) => label.push(n as u8),
            None => label.clear(),
        }
    }

    // ----- operands -----

    fn operand_count(&self) -> usize {
        self.arch().operand_count().max(1)
    }

    fn modified_operand(&mut self, default: usize) -> usize {
        let count = self.operand_count();
        self.read_modifier().unwrap_or(default) % count
    }

    /// A fixed operand slot folded into the configured operand count.
    fn slot(&self, index: usize) -> usize {
        index % self.operand_count()
    }

    fn next_operand(&self, index: usize) -> usize {
        (index + 1) % self.operand_count()
    }

    fn stack(&self, index: usize) -> &CpuStack {
        let t = self.threads.current();
        if index < t.stacks.len() {
            &t.stacks[index]
        } else {
            &self.global_stacks[index - t.stacks.len()]
        }
    }

    fn stack_mut(&mut self, index: usize) -> &mut CpuStack {
        let t = self.threads.current_mut();
        let local = t.stacks.len();
        if index < local {
            &mut t.stacks[index]
        } else {
            &mut self.global_stacks[index - local]
        }
    }

    /// Value of an operand without consuming it.
    fn operand(&self, index: usize) -> i32 {
        match self.arch().operand_model {
            OperandModel::Registers => self.threads.current().registers[index],
            OperandModel::Stacks => self.stack(index).top(),
        }
    }

    /// Stores into an operand: register assignment or stack push.
    fn set_operand(&mut self, index: usize, value: i32) {
        match self.arch().operand_model {
            OperandModel::Registers => self.threads.current_mut().registers[index] = value,
            OperandModel::Stacks => self.stack_mut(index).push(value),
        }
    }

    /// Reads an operand, popping it on stack architectures.
    fn take_operand(&mut self, index: usize) -> i32 {
        match self.arch().operand_model {
            OperandModel::Registers => self.threads.current().registers[index],
            OperandModel::Stacks => self.stack_mut(index).pop(),
        }
    }

    /// Overwrites an operand in place: register assignment or top replacement.
    fn replace_operand(&mut self, index: usize, value: i32) {
        match self.arch().operand_model {
            OperandModel::Registers => self.threads.current_mut().registers[index] = value,
            OperandModel::Stacks => {
                let stack = self.stack_mut(index);
                stack.pop();
                stack.push(value);
            }
        }
    }

    // ----- memory edits -----

    /// Inserts a line and shifts heads at or after it.
    fn insert_line(&mut self, space: usize, pos: usize, inst: Instruction) {
        self.memory[space].insert(pos, inst);
        for head in self.heads_in(space) {
            if head.position() >= pos {
                head.position += 1;
            }
        }
    }

    /// Removes a line and shifts heads after it.
    fn remove_line(&mut self, space: usize, pos: usize) -> bool {
        if self.memory[space].remove(pos).is_none() {
            return false;
        }
        for head in self.heads_in(space) {
            if head.position() > pos {
                head.position -= 1;
            }
        }
        true
    }

    /// Cuts `range` out of a space; heads inside it collapse onto its start.
    fn cut_lines(&mut self, space: usize, range: Range<usize>) {
        let size = range.end.saturating_sub(range.start);
        self.memory[space].cut(range.clone());
        for head in self.heads_in(space) {
            let pos = head.position();
            if pos >= range.end {
                head.position = (pos - size) as u32;
            } else if pos >= range.start {
                head.position = range.start as u32;
            }
        }
    }

    fn heads_in(&mut self, space: usize) -> impl Iterator<Item = &mut Head> {
        self.threads
            .iter_mut()
            .flat_map(|t| t.heads.iter_mut())
            .filter(move |h| h.space() == space)
    }

    /// Whether any head of any thread points into `space`.
    fn space_referenced(&self, space: usize) -> bool {
        self.threads
            .iter()
            .any(|t| t.heads.iter().any(|h| h.space() == space))
    }

    /// An auxiliary space no head points into and holding only no-ops.
    fn space_is_free(&self, space: usize) -> bool {
        space != 0
            && !self.space_referenced(space)
            && self.memory[space]
                .instructions()
                .iter()
                .all(|&i| self.inst_set.is_nop(i))
    }

    fn clear_space(&mut self, space: usize) {
        let fill = self.inst_set.default_instruction();
        self.memory[space].assign(&[fill]);
    }

    // ----- execution-time mutations -----

    /// Applies every rule registered for `trigger` around the relevant head
    /// of the running thread. Returns the number of mutations applied.
    pub fn apply_mutations<R: Rng>(&mut self, trigger: MutationTrigger, rng: &mut R) -> u32 {
        let head = match trigger {
            MutationTrigger::Update => self.head_of(HeadId::Ip),
            MutationTrigger::Read => self.head_of(HeadId::Read),
            MutationTrigger::Write => self.head_of(HeadId::Write),
        };
        self.mutate_at(trigger, head, rng)
    }

    fn mutate_at<R: Rng>(&mut self, trigger: MutationTrigger, head: Head, rng: &mut R) -> u32 {
        let config = Arc::clone(&self.config);
        let indels = config.mutation.indels_during_execution;
        let space = head.space();
        if space >= self.memory.len() {
            return 0;
        }
        let (min_size, max_size) = if space == 0 {
            (config.genome.min_size, config.genome.max_size)
        } else {
            (1, config.genome.max_size)
        };

        let mut count = 0;
        for rule in config.mutation.rules.iter().filter(|r| r.trigger == trigger) {
            let len = self.space_len(space);
            let sites = mutation::scoped_sites(rule.scope, rule.rate, len, head.position(), rng);
            for site in sites {
                match rule.kind {
                    MutationKind::Point => {
                        count += u32::from(mutation::point_mutate(
                            &mut self.memory[space],
                            site,
                            &self.inst_set,
                            rng,
                        ));
                    }
                    MutationKind::Insert if indels && self.space_len(space) < max_size => {
                        if let Some(inst) = self.inst_set.random_instruction(rng) {
                            let site = site.min(self.space_len(space));
                            self.insert_line(space, site, inst);
                            self.memory[space].set_flag(site, SiteFlags::MUTATED);
                            count += 1;
                        }
                    }
                    MutationKind::Delete if indels && self.space_len(space) > min_size => {
                        count += u32::from(self.remove_line(space, site));
                    }
                    _ => {}
                }
            }
        }
        if count > 0 {
            self.metrics.record_mutations(count);
            self.adjust_all_heads();
        }
        count
    }

    fn raise<H: Host + ?Sized>(&mut self, host: &mut H, fault: &Fault) {
        tracing::trace!(location = %fault.location, kind = ?fault.kind, "{}", fault.message);
        self.metrics
            .record_fault(&format!("{}/{:?}", fault.location, fault.kind));
        host.fault(fault);
    }
}
