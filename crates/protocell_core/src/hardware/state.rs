//! Scheduler snapshots.

use super::Hardware;
use crate::error::{CoreError, Result};
use crate::label::{CodeLabel, MAX_LABEL_SIZE};
use crate::stack::CpuStack;
use crate::thread::Thread;
use protocell_data::{HardwareState, Head, StackState, ThreadState, NUM_HEADS};

impl Hardware {
    /// Captures thread count, current thread and every thread's heads,
    /// registers, stacks and labels, in scheduling order.
    #[must_use]
    pub fn save_state(&self) -> HardwareState {
        HardwareState {
            thread_count: self.threads.len() as u32,
            cur_thread: self.threads.current_index() as u32,
            threads: self
                .threads
                .iter()
                .map(|t| ThreadState {
                    id: t.id,
                    heads: t.heads.to_vec(),
                    registers: t.registers.clone(),
                    stacks: t.stacks.iter().map(CpuStack::to_state).collect(),
                    cur_stack: t.cur_stack as u32,
                    read_label: t.read_label.nops().to_vec(),
                    next_label: t.next_label.nops().to_vec(),
                    active_cost: t.active_cost,
                })
                .collect(),
            global_stacks: self.global_stacks.iter().map(CpuStack::to_state).collect(),
        }
    }

    /// Restores a snapshot taken from hardware of the same shape. Nothing
    /// changes unless the whole snapshot fits.
    pub fn load_state(&mut self, state: &HardwareState) -> Result<()> {
        if state.thread_count as usize != state.threads.len() {
            return Err(CoreError::state_mismatch(format!(
                "thread count {} but {} threads",
                state.thread_count,
                state.threads.len()
            )));
        }
        let threads = state
            .threads
            .iter()
            .map(|t| self.restore_thread(t))
            .collect::<Result<Vec<_>>>()?;

        let depth = self.arch().stack_depth;
        if state.global_stacks.len() != self.global_stacks.len() {
            return Err(CoreError::state_mismatch(format!(
                "{} global stacks, expected {}",
                state.global_stacks.len(),
                self.global_stacks.len()
            )));
        }
        let globals = state
            .global_stacks
            .iter()
            .map(|s| restore_stack(s, depth))
            .collect::<Result<Vec<_>>>()?;

        self.threads
            .restore(threads, state.cur_thread as usize)
            .map_err(CoreError::StateMismatch)?;
        self.global_stacks = globals;
        tracing::debug!(
            threads = state.thread_count,
            cur_thread = state.cur_thread,
            "hardware state loaded"
        );
        Ok(())
    }

    fn restore_thread(&self, state: &ThreadState) -> Result<Thread> {
        let arch = self.arch();
        if state.heads.len() != NUM_HEADS {
            return Err(CoreError::state_mismatch(format!(
                "thread {} has {} heads",
                state.id,
                state.heads.len()
            )));
        }
        if let Some(head) = state.heads.iter().find(|h| h.space() >= self.memory.len()) {
            return Err(CoreError::state_mismatch(format!(
                "head in memory space {} of {}",
                head.space(),
                self.memory.len()
            )));
        }
        if state.registers.len() != arch.registers {
            return Err(CoreError::state_mismatch(format!(
                "{} registers, expected {}",
                state.registers.len(),
                arch.registers
            )));
        }
        if state.stacks.len() != arch.local_stacks {
            return Err(CoreError::state_mismatch(format!(
                "{} local stacks, expected {}",
                state.stacks.len(),
                arch.local_stacks
            )));
        }
        if state.cur_stack as usize >= arch.total_stacks() {
            return Err(CoreError::state_mismatch(format!(
                "current stack {} out of range",
                state.cur_stack
            )));
        }

        let mut heads = [Head::default(); NUM_HEADS];
        heads.copy_from_slice(&state.heads);
        let stacks = state
            .stacks
            .iter()
            .map(|s| restore_stack(s, arch.stack_depth))
            .collect::<Result<Vec<_>>>()?;

        Ok(Thread {
            id: state.id,
            heads,
            registers: state.registers.clone(),
            stacks,
            cur_stack: state.cur_stack as usize,
            read_label: self.restore_label(&state.read_label)?,
            next_label: self.restore_label(&state.next_label)?,
            active_cost: state.active_cost,
        })
    }

    fn restore_label(&self, nops: &[u8]) -> Result<CodeLabel> {
        let base = self.inst_set.num_nops();
        if nops.len() > MAX_LABEL_SIZE || nops.iter().any(|&n| usize::from(n) >= base) {
            return Err(CoreError::state_mismatch(format!(
                "label {nops:?} invalid for {base} no-ops"
            )));
        }
        Ok(CodeLabel::from_nops(nops))
    }
}

fn restore_stack(state: &StackState, depth: usize) -> Result<CpuStack> {
    CpuStack::from_state(state, depth)
        .ok_or_else(|| CoreError::state_mismatch(format!("stack does not fit depth {depth}")))
}
