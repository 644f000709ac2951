use super::{Hardware, Outcome};
use crate::config::ThreadSlicing;
use crate::host::Host;
use crate::inst_lib::Opcode;
use protocell_data::{HeadId, Instruction, SiteFlags};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// What happened during one call to [`Hardware::step`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
    /// Instructions that ran to completion.
    pub executed: u64,
    /// Instructions skipped by `prob_fail` or aborted by a fault.
    pub failed: u64,
    pub faults: u64,
    pub divided: bool,
    /// The organism was reported dead to its host this step.
    pub died: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Direction {
    Forward,
    Backward,
    /// Whole-memory search for a self-contained label.
    Full,
}

impl Hardware {
    /// Advances the organism by one scheduler tick.
    pub fn step<H, R>(&mut self, host: &mut H, rng: &mut R) -> StepReport
    where
        H: Host + ?Sized,
        R: Rng,
    {
        let mut report = StepReport::default();
        self.time_used += 1;
        self.divided = false;

        let slices = match self.config.execution.thread_slicing {
            ThreadSlicing::RoundRobin => 1,
            ThreadSlicing::AllThreads => self.threads.len(),
        };
        for _ in 0..slices {
            self.threads.next_thread();
            self.advance_ip = true;
            let ip = self.adjusted(HeadId::Ip);
            let Some(inst) = self.instruction_at(ip) else {
                continue;
            };
            if self.memory[ip.space()]
                .flags(ip.position())
                .contains(SiteFlags::BREAKPOINT)
            {
                host.breakpoint(ip.space(), ip.position());
            }

            if !self.pay_costs(host, inst) {
                // Still paying; retry the same line next tick.
                self.advance_ip = false;
            } else {
                let entry = self.inst_set.entry(inst);
                let (opcode, prob_fail, addl_time) =
                    (entry.opcode, entry.prob_fail, entry.addl_time_cost);
                if prob_fail > 0.0 && rng.gen::<f64>() < prob_fail {
                    report.failed += 1;
                } else {
                    self.memory[ip.space()].set_flag(ip.position(), SiteFlags::EXECUTED);
                    match self.execute(opcode, host, rng) {
                        Ok(()) => report.executed += 1,
                        Err(fault) => {
                            report.failed += 1;
                            report.faults += 1;
                            self.raise(host, &fault);
                        }
                    }
                    self.time_used += u64::from(addl_time);
                }
            }

            if self.advance_ip {
                self.advance_head(HeadId::Ip);
            }
            if self.divided {
                report.divided = true;
                break;
            }
        }

        let max_executed = self.config.execution.max_executed;
        if (max_executed > 0 && self.time_used >= max_executed)
            || self.to_die
            || host.flagged_to_die()
        {
            report.died = true;
            host.die();
        }
        self.metrics.record_step(report.executed, report.failed);
        report
    }

    /// Charges first-time, energy and steady-state costs. Returns whether
    /// the instruction may execute this tick.
    fn pay_costs<H: Host + ?Sized>(&mut self, host: &mut H, inst: Instruction) -> bool {
        if let Some(ft) = self.ft_costs.get_mut(inst.op()) {
            if *ft > 0 {
                *ft -= 1;
                return false;
            }
        }
        let entry = self.inst_set.entry(inst);
        let (cost, energy) = (entry.cost, entry.energy_cost);

        let thread = self.threads.current_mut();
        if thread.active_cost > 1 {
            thread.active_cost -= 1;
            return false;
        }
        if thread.active_cost == 0 {
            if energy > 0.0 && !host.consume_energy(energy) {
                self.to_die = true;
                return false;
            }
            if cost > 1 {
                self.threads.current_mut().active_cost = cost - 1;
                return false;
            }
        }
        self.threads.current_mut().active_cost = 0;
        true
    }

    fn execute<H, R>(&mut self, opcode: Opcode, host: &mut H, rng: &mut R) -> Outcome
    where
        H: Host + ?Sized,
        R: Rng,
    {
        match opcode {
            Opcode::NopA | Opcode::NopB | Opcode::NopC | Opcode::NopD | Opcode::NopX => Ok(()),

            Opcode::IfNEqu => self.inst_if(|a, b| a != b),
            Opcode::IfEqu => self.inst_if(|a, b| a == b),
            Opcode::IfLess => self.inst_if(|a, b| a < b),
            Opcode::IfGrt => self.inst_if(|a, b| a > b),
            Opcode::IfLabel => self.inst_if_label(),

            Opcode::MovHead => self.inst_mov_head(),
            Opcode::JmpHead => self.inst_jmp_head(),
            Opcode::GetHead => self.inst_get_head(),
            Opcode::SetFlow => self.inst_set_flow(),
            Opcode::AdvHead => self.inst_adv_head(),
            Opcode::JumpF => self.inst_jump(Direction::Forward),
            Opcode::JumpB => self.inst_jump(Direction::Backward),
            Opcode::JumpSelf => self.inst_jump(Direction::Full),

            Opcode::ShiftR => self.inst_unary(|v| v >> 1),
            Opcode::ShiftL => self.inst_unary(|v| v.wrapping_shl(1)),
            Opcode::Inc => self.inst_unary(|v| v.wrapping_add(1)),
            Opcode::Dec => self.inst_unary(|v| v.wrapping_sub(1)),
            Opcode::Zero => self.inst_unary(|_| 0),
            Opcode::Not => self.inst_unary(|v| !v),
            Opcode::Add => self.inst_binary(|a, b| Some(a.wrapping_add(b)), "add"),
            Opcode::Sub => self.inst_binary(|a, b| Some(a.wrapping_sub(b)), "sub"),
            Opcode::Mult => self.inst_binary(|a, b| Some(a.wrapping_mul(b)), "mult"),
            Opcode::Div => self.inst_binary(i32::checked_div, "div"),
            Opcode::Mod => self.inst_binary(i32::checked_rem, "mod"),
            Opcode::Nand => self.inst_binary(|a, b| Some(!(a & b)), "nand"),

            Opcode::Push => self.inst_push(),
            Opcode::Pop => self.inst_pop(),
            Opcode::SwapStk => self.inst_swap_stack(),
            Opcode::Swap => self.inst_swap(),

            Opcode::HAlloc => self.inst_alloc(rng),
            Opcode::HDivide => self.inst_divide(host, rng),
            Opcode::HCopy => self.inst_copy(rng),
            Opcode::HRead => self.inst_read(rng),
            Opcode::HWrite => self.inst_write(),
            Opcode::HSearch => self.inst_search(),
            Opcode::MemSet => self.inst_mem_set(),
            Opcode::Inject => self.inst_inject(host, rng),
            Opcode::ReadCode => self.inst_read_code(),

            Opcode::Io => self.inst_io(host),
            Opcode::ForkThread => self.inst_fork(),
            Opcode::KillThread => self.inst_kill(),
            Opcode::ThreadId => self.inst_thread_id(),
        }
    }
}
