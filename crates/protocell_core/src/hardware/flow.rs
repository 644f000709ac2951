//! Conditionals, head movement and label addressing.

use super::execute::Direction;
use super::{Hardware, Outcome, BX, CX};
use crate::error::Fault;
use crate::head::HeadLogic;
use crate::label::{find_backward, find_forward, find_full, CodeLabel};
use protocell_data::{FaultKind, FaultLocation, Head, HeadId};

impl Hardware {
    /// Skips the next line unless `test(?BX?, successor)` holds.
    pub(super) fn inst_if(&mut self, test: fn(i32, i32) -> bool) -> Outcome {
        let op1 = self.modified_operand(BX);
        let op2 = self.next_operand(op1);
        if !test(self.operand(op1), self.operand(op2)) {
            self.advance_head(HeadId::Ip);
        }
        Ok(())
    }

    pub(super) fn inst_if_label(&mut self) -> Outcome {
        let label = self.complement_label();
        if label != self.threads.current().read_label {
            self.advance_head(HeadId::Ip);
        }
        Ok(())
    }

    pub(super) fn inst_mov_head(&mut self) -> Outcome {
        let id = self.modified_head(HeadId::Ip);
        let flow = self.head_of(HeadId::Flow);
        self.set_head_of(id, flow);
        if id == HeadId::Ip {
            self.advance_ip = false;
        }
        Ok(())
    }

    pub(super) fn inst_jmp_head(&mut self) -> Outcome {
        let id = self.modified_head(HeadId::Ip);
        let offset = self.operand(self.slot(CX));
        let mut head = self.head_of(id);
        head.jump(i64::from(offset), self.space_len(head.space()));
        self.set_head_of(id, head);
        Ok(())
    }

    pub(super) fn inst_get_head(&mut self) -> Outcome {
        let id = self.modified_head(HeadId::Ip);
        let position = self.head_of(id).position();
        self.set_operand(self.slot(CX), position as i32);
        Ok(())
    }

    pub(super) fn inst_set_flow(&mut self) -> Outcome {
        let op = self.modified_operand(CX);
        let value = self.operand(op);
        let mut flow = self.head_of(HeadId::Flow);
        flow.set_position(i64::from(value), self.space_len(flow.space()));
        self.set_head_of(HeadId::Flow, flow);
        Ok(())
    }

    pub(super) fn inst_adv_head(&mut self) -> Outcome {
        let id = self.modified_head(HeadId::Write);
        self.advance_head(id);
        Ok(())
    }

    /// Reads the label after the IP and returns its complement. The
    /// complement is also left in the thread's label buffer.
    fn complement_label(&mut self) -> CodeLabel {
        self.read_label();
        let base = self.inst_set.num_nops();
        let thread = self.threads.current_mut();
        thread.next_label.rotate(1, base);
        thread.next_label.clone()
    }

    /// Position just past the complement of `label` in the IP's space.
    fn find_label(&self, direction: Direction, label: &CodeLabel) -> Option<usize> {
        let ip = self.head_of(HeadId::Ip);
        let genome = &self.memory[ip.space()];
        match direction {
            Direction::Forward => find_forward(label, genome, &self.inst_set, ip.position()),
            Direction::Backward => find_backward(
                label,
                genome,
                &self.inst_set,
                ip.position() as isize - label.len() as isize,
            ),
            Direction::Full => find_full(label, genome, &self.inst_set).map(|p| p + 1),
        }
    }

    pub(super) fn inst_jump(&mut self, direction: Direction) -> Outcome {
        let label = self.complement_label();
        let mut ip = self.head_of(HeadId::Ip);
        let len = self.space_len(ip.space());
        if label.is_empty() {
            let offset = self.operand(self.slot(BX));
            ip.jump(i64::from(offset), len);
            self.set_head_of(HeadId::Ip, ip);
            return Ok(());
        }
        match self.find_label(direction, &label) {
            Some(pos) if pos > 0 => {
                // Land on the last no-op of the match; the IP then advances past it.
                ip.set_position(pos as i64 - 1, len);
                self.set_head_of(HeadId::Ip, ip);
                Ok(())
            }
            _ => Err(Fault::new(
                FaultLocation::Jump,
                FaultKind::LabelNotFound,
                format!("{direction:?} jump: label {} not found", label.as_string()),
            )),
        }
    }

    /// Points the flow head just past the complement label, searching the
    /// whole space from its start. BX gets the distance from the IP and CX
    /// the label size.
    pub(super) fn inst_search(&mut self) -> Outcome {
        let label = self.complement_label();
        let ip = self.head_of(HeadId::Ip);
        let found = if label.is_empty() {
            None
        } else {
            find_forward(&label, &self.memory[ip.space()], &self.inst_set, 0)
        };
        let found_pos = match found {
            Some(pos) if pos > 0 => pos - 1,
            _ => ip.position(),
        };

        self.set_operand(self.slot(BX), found_pos as i32 - ip.position() as i32);
        self.set_operand(self.slot(CX), label.len() as i32);
        let flow = Head::new(ip.space(), found_pos);
        self.set_head_of(HeadId::Flow, flow);
        self.advance_head(HeadId::Flow);
        Ok(())
    }
}
