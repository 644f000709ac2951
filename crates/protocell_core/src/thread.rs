//! Execution threads and the per-organism thread set.

use crate::config::ArchitectureConfig;
use crate::error::ThreadError;
use crate::label::CodeLabel;
use crate::stack::CpuStack;
use protocell_data::{Head, HeadId, NUM_HEADS};

/// One cooperative execution context.
#[derive(Debug, Clone, PartialEq)]
pub struct Thread {
    pub id: u8,
    pub heads: [Head; NUM_HEADS],
    pub registers: Vec<i32>,
    /// Thread-local stacks; global stacks live on the hardware.
    pub stacks: Vec<CpuStack>,
    pub cur_stack: usize,
    /// No-ops seen by the most recent copies.
    pub read_label: CodeLabel,
    /// Label read after the current instruction.
    pub next_label: CodeLabel,
    /// Remaining steady-state cost of the instruction being paid for.
    pub active_cost: u32,
}

impl Thread {
    #[must_use]
    pub fn new(id: u8, arch: &ArchitectureConfig, space: usize) -> Self {
        Self {
            id,
            heads: [Head::new(space, 0); NUM_HEADS],
            registers: vec![0; arch.registers],
            stacks: vec![CpuStack::new(arch.stack_depth); arch.local_stacks],
            cur_stack: 0,
            read_label: CodeLabel::new(),
            next_label: CodeLabel::new(),
            active_cost: 0,
        }
    }

    #[must_use]
    pub fn head(&self, id: HeadId) -> Head {
        self.heads[id.index()]
    }

    pub fn head_mut(&mut self, id: HeadId) -> &mut Head {
        &mut self.heads[id.index()]
    }

    /// Resets heads to the start of `space` and clears local stacks.
    pub fn reset_heads(&mut self, space: usize) {
        self.heads = [Head::new(space, 0); NUM_HEADS];
        self.stacks.iter_mut().for_each(CpuStack::clear);
    }
}

/// The threads of one organism; never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadSet {
    threads: Vec<Thread>,
    cur: usize,
    /// Bit `n` set while id `n` is in use.
    id_chart: u64,
    max_threads: usize,
}

impl ThreadSet {
    #[must_use]
    pub fn new(arch: &ArchitectureConfig, max_threads: usize) -> Self {
        Self {
            threads: vec![Thread::new(0, arch, 0)],
            cur: 0,
            id_chart: 1,
            max_threads: max_threads.clamp(1, 64),
        }
    }

    pub fn reset(&mut self, arch: &ArchitectureConfig) {
        self.threads.clear();
        self.threads.push(Thread::new(0, arch, 0));
        self.cur = 0;
        self.id_chart = 1;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.threads.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    #[must_use]
    pub fn max_threads(&self) -> usize {
        self.max_threads
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.cur
    }

    #[must_use]
    pub fn current(&self) -> &Thread {
        &self.threads[self.cur]
    }

    pub fn current_mut(&mut self) -> &mut Thread {
        &mut self.threads[self.cur]
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Thread> {
        self.threads.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Thread> {
        self.threads.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Thread> {
        self.threads.iter_mut()
    }

    /// Round-robin to the next thread.
    pub fn next_thread(&mut self) {
        self.cur = (self.cur + 1) % self.threads.len();
    }

    fn allocate_id(&mut self) -> Result<u8, ThreadError> {
        if self.threads.len() >= self.max_threads {
            return Err(ThreadError::AtCapacity(self.max_threads));
        }
        let id = self.id_chart.trailing_ones();
        if id >= 64 {
            return Err(ThreadError::IdSpaceExhausted);
        }
        self.id_chart |= 1 << id;
        Ok(id as u8)
    }

    /// Appends a copy of the current thread under the lowest free id.
    /// Returns the new thread's index.
    pub fn fork(&mut self) -> Result<usize, ThreadError> {
        let id = self.allocate_id()?;
        let mut child = self.threads[self.cur].clone();
        child.id = id;
        child.active_cost = 0;
        self.threads.push(child);
        tracing::trace!(id, threads = self.threads.len(), "thread forked");
        Ok(self.threads.len() - 1)
    }

    /// Appends a fresh thread whose heads all start at `space`.
    pub fn spawn_at(&mut self, arch: &ArchitectureConfig, space: usize) -> Result<usize, ThreadError> {
        let id = self.allocate_id()?;
        self.threads.push(Thread::new(id, arch, space));
        Ok(self.threads.len() - 1)
    }

    /// Whether another thread could be added right now.
    #[must_use]
    pub fn has_capacity(&self) -> bool {
        self.threads.len() < self.max_threads && self.id_chart != u64::MAX
    }

    /// Removes the current thread. Scheduling resumes with the thread that
    /// followed it.
    pub fn kill_current(&mut self) -> Result<(), ThreadError> {
        if self.threads.len() <= 1 {
            return Err(ThreadError::LastThread);
        }
        let kill = self.cur;
        let id = self.threads[kill].id;
        self.id_chart &= !(1u64 << id);
        self.threads.remove(kill);
        // The next round-robin advance lands on the thread that followed.
        self.cur = if kill == 0 {
            self.threads.len() - 1
        } else {
            kill - 1
        };
        tracing::trace!(id, threads = self.threads.len(), "thread killed");
        Ok(())
    }

    /// Replaces all threads; ids must be distinct and below 64.
    pub fn restore(&mut self, threads: Vec<Thread>, cur: usize) -> Result<(), String> {
        if threads.is_empty() || threads.len() > self.max_threads {
            return Err(format!("thread count {} out of range", threads.len()));
        }
        if cur >= threads.len() {
            return Err(format!("current thread {cur} out of range"));
        }
        let mut chart = 0u64;
        for t in &threads {
            if t.id >= 64 || chart & (1 << t.id) != 0 {
                return Err(format!("invalid or duplicate thread id {}", t.id));
            }
            chart |= 1 << t.id;
        }
        self.threads = threads;
        self.cur = cur;
        self.id_chart = chart;
        Ok(())
    }
}
