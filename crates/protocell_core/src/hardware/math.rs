//! Arithmetic, stack, I/O and thread instructions.

use super::{Hardware, Outcome, AX, BX, CX};
use crate::error::Fault;
use crate::host::Host;
use protocell_data::{FaultKind, FaultLocation, HeadId};

impl Hardware {
    pub(super) fn inst_unary(&mut self, op: fn(i32) -> i32) -> Outcome {
        let reg = self.modified_operand(BX);
        let value = self.operand(reg);
        self.replace_operand(reg, op(value));
        Ok(())
    }

    /// `?BX? = op(BX, CX)`. A `None` result is a math fault: division by
    /// zero, or overflow of `i32::MIN / -1`.
    pub(super) fn inst_binary(&mut self, op: fn(i32, i32) -> Option<i32>, name: &str) -> Outcome {
        let dst = self.modified_operand(BX);
        let lhs = self.operand(self.slot(BX));
        let rhs = self.operand(self.slot(CX));
        match op(lhs, rhs) {
            Some(value) => {
                self.set_operand(dst, value);
                Ok(())
            }
            None if rhs == 0 => Err(Fault::new(
                FaultLocation::Math,
                FaultKind::DivideByZero,
                format!("{name}: {lhs} by zero"),
            )),
            None => Err(Fault::new(
                FaultLocation::Math,
                FaultKind::Overflow,
                format!("{name}: {lhs} by {rhs} overflows"),
            )),
        }
    }

    pub(super) fn inst_push(&mut self) -> Outcome {
        let reg = self.modified_operand(BX);
        let value = self.operand(reg);
        let stack = self.threads.current().cur_stack;
        self.stack_mut(stack).push(value);
        Ok(())
    }

    pub(super) fn inst_pop(&mut self) -> Outcome {
        let reg = self.modified_operand(BX);
        let stack = self.threads.current().cur_stack;
        let value = self.stack_mut(stack).pop();
        self.set_operand(reg, value);
        Ok(())
    }

    pub(super) fn inst_swap_stack(&mut self) -> Outcome {
        let total = self.arch().total_stacks();
        let thread = self.threads.current_mut();
        thread.cur_stack = (thread.cur_stack + 1) % total;
        Ok(())
    }

    pub(super) fn inst_swap(&mut self) -> Outcome {
        let op1 = self.modified_operand(AX);
        let op2 = self.next_operand(op1);
        if op1 == op2 {
            return Ok(());
        }
        let a = self.take_operand(op1);
        let b = self.take_operand(op2);
        self.set_operand(op1, b);
        self.set_operand(op2, a);
        Ok(())
    }

    /// Outputs `?BX?`, then replaces it with the next input.
    pub(super) fn inst_io<H: Host + ?Sized>(&mut self, host: &mut H) -> Outcome {
        let reg = self.modified_operand(BX);
        let out = self.take_operand(reg);
        host.do_output(out);
        let input = host.do_input();
        self.set_operand(reg, input);
        Ok(())
    }

    pub(super) fn inst_read_code(&mut self) -> Outcome {
        let reg = self.modified_operand(BX);
        let read = self.head_of(HeadId::Read);
        let value = self
            .instruction_at(read)
            .and_then(|inst| self.inst_set.entry(inst).code_value())
            .unwrap_or(0);
        self.set_operand(reg, value);
        Ok(())
    }

    pub(super) fn inst_thread_id(&mut self) -> Outcome {
        let reg = self.modified_operand(BX);
        let id = i32::from(self.threads.current().id);
        self.set_operand(reg, id);
        Ok(())
    }

    /// The new thread starts on the line after `fork-th`; the parent skips it.
    pub(super) fn inst_fork(&mut self) -> Outcome {
        self.advance_head(HeadId::Ip);
        match self.threads.fork() {
            Ok(_) => {
                self.metrics.record_fork();
                Ok(())
            }
            Err(e) => Err(Fault::new(
                FaultLocation::ThreadFork,
                FaultKind::ThreadCap,
                e.to_string(),
            )),
        }
    }

    pub(super) fn inst_kill(&mut self) -> Outcome {
        match self.threads.kill_current() {
            Ok(()) => {
                self.advance_ip = false;
                self.metrics.record_kill();
                Ok(())
            }
            Err(e) => Err(Fault::new(
                FaultLocation::ThreadKill,
                FaultKind::LastThread,
                e.to_string(),
            )),
        }
    }
}
