//! Allocation, copying and divide.

use super::{Hardware, Outcome, AX, BX};
use crate::config::{AllocMethod, DivideLayout, DivideMethod, MutationTrigger};
use crate::error::Fault;
use crate::host::{Host, Offspring};
use crate::mutation;
use crate::replication::{check_viability, DivideCounts, FitnessBand, Verdict};
use crate::test_cpu::TestCpu;
use protocell_data::{FaultKind, FaultLocation, Genome, Head, HeadId, Instruction, SiteFlags};
use rand::Rng;
use std::sync::Arc;

fn alloc_fault(kind: FaultKind, message: String) -> Fault {
    Fault::new(FaultLocation::Allocate, kind, message)
}

fn divide_fault(kind: FaultKind, message: &str) -> Fault {
    Fault::new(FaultLocation::Divide, kind, message)
}

impl Hardware {
    /// Grows memory space 0 to make room for an offspring. AX receives the
    /// size before allocation.
    pub(super) fn inst_alloc<R: Rng>(&mut self, rng: &mut R) -> Outcome {
        let genome = &self.config.genome;
        let (min_size, max_size, range) =
            (genome.min_size, genome.max_size, genome.offspring_size_range);
        let execution = &self.config.execution;
        let (require, method) = (execution.require_allocate, execution.alloc_method);

        if require && self.allocated {
            return Err(alloc_fault(
                FaultKind::AllocateAlreadyDone,
                "allocate already active".to_string(),
            ));
        }
        let cur = self.memory[0].len();
        let alloc = ((range * cur as f64) as usize).min(max_size.saturating_sub(cur));
        if alloc < 1 {
            return Err(alloc_fault(
                FaultKind::AllocateTooSmall,
                format!("requested {alloc} lines"),
            ));
        }
        let new_size = cur + alloc;
        if new_size > max_size || new_size < min_size {
            return Err(alloc_fault(
                FaultKind::AllocateInvalidSize,
                format!("new size {new_size} outside [{min_size}, {max_size}]"),
            ));
        }
        if alloc > (cur as f64 * range) as usize {
            return Err(alloc_fault(
                FaultKind::AllocateTooLarge,
                format!("{alloc} lines for a genome of {cur}"),
            ));
        }
        if cur > (alloc as f64 * range) as usize {
            return Err(alloc_fault(
                FaultKind::AllocateTooSmall,
                format!("{alloc} lines for a genome of {cur}"),
            ));
        }

        let fill = self.inst_set.default_instruction();
        self.memory[0].resize(new_size, fill);
        if method == AllocMethod::Random {
            for pos in cur..new_size {
                if let Some(inst) = self.inst_set.random_instruction(rng) {
                    self.memory[0].set(pos, inst);
                }
            }
        }
        self.allocated = true;
        self.set_operand(self.slot(AX), cur as i32);
        Ok(())
    }

    fn copy_mutates<R: Rng>(&self, rng: &mut R) -> bool {
        let p = self.config.mutation.copy_mut_prob;
        p > 0.0 && rng.gen::<f64>() < p
    }

    /// Re-validates a writing head. An auxiliary space always keeps one
    /// line past the write position so the head can advance without
    /// wrapping.
    fn prepare_write(&mut self, id: HeadId) -> Head {
        let head = self.adjusted(id);
        let space = head.space();
        let len = self.space_len(space);
        let needed = (head.position() + 2).min(self.config.genome.max_size);
        if space != 0 && needed > len {
            let fill = self.inst_set.default_instruction();
            self.memory[space].resize(needed, fill);
        }
        head
    }

    fn write_line(&mut self, head: Head, inst: Instruction, flags: SiteFlags) {
        if let Some(genome) = self.memory.get_mut(head.space()) {
            if head.position() < genome.len() {
                genome.set(head.position(), inst);
                genome.set_flag(head.position(), flags);
            }
        }
    }

    pub(super) fn inst_copy<R: Rng>(&mut self, rng: &mut R) -> Outcome {
        let read = self.adjusted(HeadId::Read);
        let write = self.prepare_write(HeadId::Write);
        let Some(mut inst) = self.instruction_at(read) else {
            return Ok(());
        };
        self.note_read(inst);

        let mut flags = SiteFlags::COPIED;
        if self.copy_mutates(rng) {
            if let Some(random) = self.inst_set.random_instruction(rng) {
                inst = random;
                flags = flags | SiteFlags::MUTATED | SiteFlags::COPY_MUT;
            }
        }
        self.write_line(write, inst, flags);

        self.mutate_at(MutationTrigger::Read, read, rng);
        let write = self.head_of(HeadId::Write);
        self.mutate_at(MutationTrigger::Write, write, rng);
        self.advance_head(HeadId::Read);
        self.advance_head(HeadId::Write);
        Ok(())
    }

    pub(super) fn inst_read<R: Rng>(&mut self, rng: &mut R) -> Outcome {
        let id = self.modified_head(HeadId::Read);
        let head = self.adjusted(id);
        let Some(mut inst) = self.instruction_at(head) else {
            return Ok(());
        };
        if self.copy_mutates(rng) {
            inst = self.inst_set.random_instruction(rng).unwrap_or(inst);
        }
        self.note_read(inst);
        self.set_operand(self.slot(BX), i32::from(inst.0));
        self.advance_head(id);
        Ok(())
    }

    /// Writes BX as an instruction; values outside the set write instruction 0.
    pub(super) fn inst_write(&mut self) -> Outcome {
        let id = self.modified_head(HeadId::Write);
        let src = self.slot(BX);
        let head = self.prepare_write(id);
        let value = self.take_operand(src);
        let inst = if (0..self.inst_set.len() as i32).contains(&value) {
            Instruction(value as u8)
        } else {
            self.inst_set.default_instruction()
        };
        self.write_line(head, inst, SiteFlags::COPIED);
        self.advance_head(id);
        Ok(())
    }

    fn require_allocation(&self) -> Outcome {
        if self.config.execution.require_allocate && !self.allocated {
            return Err(Fault::new(
                FaultLocation::Divide,
                FaultKind::AllocateRequired,
                "divide before allocate",
            ));
        }
        Ok(())
    }

    pub(super) fn inst_divide<H, R>(&mut self, host: &mut H, rng: &mut R) -> Outcome
    where
        H: Host + ?Sized,
        R: Rng,
    {
        self.adjust_all_heads();
        let (child, counts) = match self.arch().divide_layout {
            DivideLayout::Crop => self.extract_cropped(host)?,
            DivideLayout::Space => self.extract_space(host)?,
        };
        self.finish_divide(host, rng, child, &counts);
        Ok(())
    }

    /// Offspring is `[read, write)` of space 0 (to the end when the write
    /// head sits at 0); the parent keeps `[0, read)`.
    fn extract_cropped<H: Host + ?Sized>(&mut self, host: &H) -> Result<(Genome, DivideCounts), Fault> {
        let read = self.head_of(HeadId::Read);
        let write = self.head_of(HeadId::Write);
        if read.space() != 0 || write.space() != 0 {
            return Err(divide_fault(
                FaultKind::DivideSpace,
                "crop divide needs read and write heads in the genome",
            ));
        }
        let len = self.memory[0].len();
        let div = read.position();
        let end = match write.position() {
            0 => len,
            pos => pos,
        }
        .max(div);
        self.require_allocation()?;

        let counts = DivideCounts {
            genome_size: host.genome().len(),
            parent_size: div,
            child_size: end - div,
            executed: self.memory[0].count_flag(0..div, SiteFlags::EXECUTED),
            copied: self.memory[0].count_flag(div..end, SiteFlags::COPIED),
        };
        check_viability(&self.config.genome, &counts)?;

        let child = self.memory[0].crop(div..end);
        let fill = self.inst_set.default_instruction();
        self.memory[0].resize(div, fill);
        Ok((child, counts))
    }

    /// Offspring is `[0, write)` of the auxiliary space holding the write
    /// head; the space is emptied and unbound afterwards.
    fn extract_space<H: Host + ?Sized>(&mut self, host: &H) -> Result<(Genome, DivideCounts), Fault> {
        let write = self.head_of(HeadId::Write);
        let space = write.space();
        if space == 0 {
            return Err(divide_fault(
                FaultKind::DivideSpace,
                "offspring must be written to an auxiliary memory space",
            ));
        }
        self.require_allocation()?;

        let child_size = write.position().min(self.space_len(space));
        let parent_size = self.memory[0].len();
        let counts = DivideCounts {
            genome_size: host.genome().len(),
            parent_size,
            child_size,
            executed: self.memory[0].count_flag(0..parent_size, SiteFlags::EXECUTED),
            copied: self.memory[space].count_flag(0..child_size, SiteFlags::COPIED),
        };
        check_viability(&self.config.genome, &counts)?;

        let child = self.memory[space].crop(0..child_size);
        self.clear_space(space);
        self.space_labels[space] = None;
        Ok((child, counts))
    }

    /// Mutates and optionally tests the offspring, hands it to the host and
    /// applies the parent reset policy.
    fn finish_divide<H, R>(&mut self, host: &mut H, rng: &mut R, mut child: Genome, counts: &DivideCounts)
    where
        H: Host + ?Sized,
        R: Rng,
    {
        let config = Arc::clone(&self.config);
        let bounds = (config.genome.min_size, config.genome.max_size);
        let mut mutations =
            mutation::mutate_offspring(&mut child, &config.mutation, bounds, &self.inst_set, rng);
        mutations += mutation::mutate_parent(
            &mut self.memory[0],
            config.mutation.parent_mut_prob,
            &self.inst_set,
            rng,
        );
        if mutations > 0 {
            self.metrics.record_mutations(mutations);
        }

        let mut genome = child.to_sequence();
        let copy_true = genome.as_slice() == host.genome();
        let mut verdict = Verdict::default();
        if config.fitness_test.enabled && !copy_true {
            verdict = self.test_offspring(host.genome(), &genome, rng);
            if verdict.revert {
                genome = host.genome().to_vec();
            }
        }

        self.reset_ft_costs();
        self.allocated = false;
        let child_size = genome.len();
        host.set_child_genome(Offspring {
            genome,
            fertile: !verdict.sterilize,
            reverted: verdict.revert,
            copy_true,
            mutations,
            executed_size: counts.executed,
            copied_size: counts.copied,
        });
        let alive = host.activate_divide();
        self.metrics.record_divide();
        tracing::debug!(
            child_size,
            parent_size = counts.parent_size,
            mutations,
            copy_true,
            alive,
            "divide succeeded"
        );

        if !alive {
            self.to_die = true;
        } else {
            match config.divide.method {
                DivideMethod::Offspring => {}
                DivideMethod::Split => {
                    self.reset();
                    self.advance_ip = false;
                }
                DivideMethod::Birth => {
                    self.threads.current_mut().reset_heads(0);
                    self.advance_ip = false;
                }
            }
        }
        self.divided = true;
        self.adjust_all_heads();
    }

    /// Measures parent and offspring in isolation and rolls the outcome
    /// for the offspring's fitness band.
    fn test_offspring<R: Rng>(&self, parent: &[Instruction], child: &[Instruction], rng: &mut R) -> Verdict {
        let mut cpu = match TestCpu::new(Arc::clone(&self.inst_set), &self.config) {
            Ok(cpu) => cpu,
            Err(e) => {
                tracing::warn!(error = %e, "fitness test unavailable");
                return Verdict::default();
            }
        };
        let parent_fitness = cpu.test_genome(parent, rng).fitness;
        let child_fitness = cpu.test_genome(child, rng).fitness;
        let band = FitnessBand::classify(parent_fitness, child_fitness, &self.config.fitness_test);
        let verdict = Verdict::roll(band, &self.config.fitness_test, rng);
        tracing::debug!(parent_fitness, child_fitness, ?band, ?verdict, "offspring tested");
        verdict
    }
}
