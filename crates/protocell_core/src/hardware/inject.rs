//! Memory-space binding and parasite injection.

use super::{Hardware, Outcome};
use crate::error::{Fault, InjectError};
use crate::host::{Host, InjectHost};
use crate::label::CodeLabel;
use crate::mutation;
use protocell_data::{FaultKind, FaultLocation, Genome, Head, HeadId, Instruction, SiteFlags};
use rand::Rng;

fn inject_fault(kind: FaultKind, message: String) -> Fault {
    Fault::new(FaultLocation::Inject, kind, message)
}

impl Hardware {
    /// Space bound to `label`, binding a free auxiliary space if needed.
    /// An empty label names the genome itself.
    fn space_for_label(&mut self, label: &CodeLabel) -> Option<usize> {
        if label.is_empty() {
            return Some(0);
        }
        if let Some(space) = self
            .space_labels
            .iter()
            .position(|l| l.as_ref() == Some(label))
        {
            return Some(space);
        }
        let space = (1..self.memory.len())
            .find(|&s| self.space_labels[s].is_none() && self.space_is_free(s))?;
        self.space_labels[space] = Some(label.clone());
        Some(space)
    }

    pub(super) fn inst_mem_set(&mut self) -> Outcome {
        self.read_label();
        let label = self.threads.current().next_label.clone();
        match self.space_for_label(&label) {
            Some(space) => {
                self.set_head_of(HeadId::Flow, Head::new(space, 0));
                Ok(())
            }
            None => Err(Fault::new(
                FaultLocation::MemorySpace,
                FaultKind::NoFreeSpace,
                format!("no memory space for label {}", label.as_string()),
            )),
        }
    }

    /// Sends the code between the read and write heads to the neighbour.
    /// The region is only removed here once the neighbour accepted it.
    pub(super) fn inst_inject<H, R>(&mut self, host: &mut H, rng: &mut R) -> Outcome
    where
        H: Host + ?Sized,
        R: Rng,
    {
        self.read_label();
        let label = self.threads.current().next_label.clone();
        let read = self.adjusted(HeadId::Read);
        let write = self.adjusted(HeadId::Write);

        let space = write.space();
        let start = if read.space() == space && read.position() < write.position() {
            read.position()
        } else {
            0
        };
        let end = write.position();
        let size = end - start;

        let genome_cfg = &self.config.genome;
        let (min_size, max_size, inject_min) =
            (genome_cfg.min_size, genome_cfg.max_size, genome_cfg.inject_min_size);
        if size == 0 {
            return Err(inject_fault(
                FaultKind::InjectFailed,
                "no code to inject".to_string(),
            ));
        }
        if size < inject_min {
            return Err(inject_fault(
                FaultKind::InjectTooSmall,
                format!("{size} lines, need {inject_min}"),
            ));
        }
        if space == 0 && self.memory[0].len() - size < min_size {
            return Err(inject_fault(
                FaultKind::InjectTooSmall,
                format!("host genome would shrink below {min_size}"),
            ));
        }

        let mut code: Genome = self.memory[space].crop(start..end);
        let config = std::sync::Arc::clone(&self.config);
        let mutations = mutation::mutate_injected(
            &mut code,
            &config.mutation,
            (inject_min, max_size),
            &self.inst_set,
            rng,
        );
        if mutations > 0 {
            self.metrics.record_mutations(mutations);
        }

        let Some(target) = host.neighbor() else {
            return Err(inject_fault(
                FaultKind::InjectFailed,
                "no neighbour to inject into".to_string(),
            ));
        };
        let target_space = target.inject(&label, code.instructions()).map_err(|e| {
            let kind = match e {
                InjectError::NoFreeSpace => FaultKind::NoFreeSpace,
                _ => FaultKind::InjectFailed,
            };
            inject_fault(kind, e.to_string())
        })?;

        if space == 0 {
            self.cut_lines(0, start..end);
        } else {
            self.clear_space(space);
            self.space_labels[space] = None;
            for head in self.heads_in(space) {
                *head = Head::new(0, 0);
            }
        }
        self.adjust_all_heads();
        self.metrics.record_injection();
        tracing::debug!(
            size,
            from_space = space,
            target_space,
            label = %label.as_string(),
            "parasite injected"
        );
        Ok(())
    }
}

impl InjectHost for Hardware {
    fn inject(&mut self, label: &CodeLabel, code: &[Instruction]) -> Result<usize, InjectError> {
        if code.is_empty() {
            return Err(InjectError::Empty);
        }
        if code.len() > self.config.genome.max_size {
            return Err(InjectError::TooLarge);
        }
        if !label.is_empty() && self.space_labels.iter().any(|l| l.as_ref() == Some(label)) {
            return Err(InjectError::NoFreeSpace);
        }
        let space = (1..self.memory.len())
            .find(|&s| self.space_labels[s].is_none() && self.space_is_free(s))
            .ok_or(InjectError::NoFreeSpace)?;
        if !self.threads.has_capacity() {
            return Err(InjectError::ThreadCap);
        }

        let arch = self.config.architecture.clone();
        self.threads
            .spawn_at(&arch, space)
            .map_err(|_| InjectError::ThreadCap)?;
        let target = &mut self.memory[space];
        target.assign(code);
        for pos in 0..target.len() {
            target.set_flag(pos, SiteFlags::INJECTED);
        }
        if !label.is_empty() {
            self.space_labels[space] = Some(label.clone());
        }
        tracing::debug!(space, size = code.len(), "parasite accepted");
        Ok(space)
    }
}
