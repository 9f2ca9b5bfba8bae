use std::fmt::Write as _;

use crate::registers::Registers;

/// Records host-boundary I/O as stable text so two implementations can be
/// compared line by line. Use `IoTraceTracker::disabled()` when tracing is
/// not wanted; a disabled tracker records nothing and execution behaves
/// bit-identically with it on or off.
///
/// Within one host call the buffered events render sorted: memory reads by
/// address, then memory writes by address, then register assignments by
/// index, then the gas report.
#[derive(Debug, Default)]
pub struct IoTraceTracker {
    lines: Vec<String>,
    reads: Vec<(u32, Vec<u8>)>,
    writes: Vec<(u32, Vec<u8>)>,
    regs: Vec<(usize, u64)>,
    gas: Option<u64>,
    /// If active is set to false it won't trace.
    active: bool,
}

impl IoTraceTracker {
    pub fn new() -> IoTraceTracker {
        IoTraceTracker {
            active: true,
            ..Default::default()
        }
    }

    pub fn disabled() -> IoTraceTracker {
        IoTraceTracker::default()
    }

    /// The raw program container, before anything runs.
    pub fn program(&mut self, bytes: &[u8]) {
        if !self.active {
            return;
        }
        self.lines.push(format!("program {}", hex::encode(bytes)));
    }

    /// Initial machine state right after reset.
    pub fn start(&mut self, pc: u32, gas: u64, registers: &Registers) {
        if !self.active {
            return;
        }
        let line = state_line("start".into(), pc, gas, registers);
        self.lines.push(line);
    }

    /// A host-call suspension, recorded before the cost is charged.
    pub fn ecalli(&mut self, index: u32, pc: u32, gas: u64, registers: &Registers) {
        if !self.active {
            return;
        }
        let line = state_line(format!("ecalli={index}"), pc, gas, registers);
        self.lines.push(line);
    }

    pub fn memory_read(&mut self, address: u32, data: &[u8]) {
        if !self.active {
            return;
        }
        self.reads.push((address, data.to_vec()));
    }

    pub fn memory_write(&mut self, address: u32, data: &[u8]) {
        if !self.active {
            return;
        }
        self.writes.push((address, data.to_vec()));
    }

    pub fn set_reg(&mut self, index: usize, value: u64) {
        if !self.active {
            return;
        }
        self.regs.push((index, value));
    }

    pub fn set_gas(&mut self, remaining: u64) {
        if !self.active {
            return;
        }
        self.gas = Some(remaining);
    }

    /// Renders and clears everything buffered since the last `ecalli`.
    pub fn finish_host_call(&mut self) {
        if !self.active {
            return;
        }
        self.reads.sort_by_key(|(address, _)| *address);
        for (address, data) in self.reads.drain(..) {
            self.lines.push(format!(
                "memread {address:x} len={} -> {}",
                data.len(),
                hex::encode(&data)
            ));
        }
        self.writes.sort_by_key(|(address, _)| *address);
        for (address, data) in self.writes.drain(..) {
            self.lines.push(format!(
                "memwrite {address:x} len={} <- {}",
                data.len(),
                hex::encode(&data)
            ));
        }
        self.regs.sort_by_key(|(index, _)| *index);
        for (index, value) in self.regs.drain(..) {
            self.lines.push(format!("setreg r{index:02} <- {value:x}"));
        }
        if let Some(gas) = self.gas.take() {
            self.lines.push(format!("setgas <- {gas}"));
        }
    }

    pub fn halt(&mut self, pc: u32, gas: u64, registers: &Registers) {
        if !self.active {
            return;
        }
        let line = state_line("HALT".into(), pc, gas, registers);
        self.lines.push(line);
    }

    pub fn panic(&mut self, arg: u32, pc: u32, gas: u64, registers: &Registers) {
        if !self.active {
            return;
        }
        let line = state_line(format!("PANIC={arg}"), pc, gas, registers);
        self.lines.push(line);
    }

    pub fn out_of_gas(&mut self, pc: u32, gas: u64, registers: &Registers) {
        if !self.active {
            return;
        }
        let line = state_line("OOG".into(), pc, gas, registers);
        self.lines.push(line);
    }

    /// The whole trace, newline-separated without a trailing newline.
    pub fn render(&self) -> String {
        self.lines.join("\n")
    }
}

/// A machine-state line: the head token, then pc and gas, then every
/// non-zero register ascending, index zero-padded to two digits, value
/// unpadded lowercase hex.
fn state_line(head: String, pc: u32, gas: u64, registers: &Registers) -> String {
    let mut line = head;
    let _ = write!(line, " pc={pc} gas={gas}");
    for (index, value) in registers.values().iter().enumerate() {
        if *value != 0 {
            let _ = write!(line, " r{index:02}={value:x}");
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::Reg;

    #[test]
    fn state_lines_list_nonzero_registers_in_order() {
        let mut registers = Registers::new();
        registers.set(Reg::A1, 4);
        registers.set(Reg::SP, 0xfefe0000);

        let mut trace = IoTraceTracker::new();
        trace.start(0, 1000, &registers);
        assert_eq!(trace.render(), "start pc=0 gas=1000 r01=fefe0000 r08=4");
    }

    #[test]
    fn host_call_events_render_sorted() {
        let mut trace = IoTraceTracker::new();
        trace.ecalli(5, 2, 97, &Registers::new());
        trace.memory_write(0x30000, &[0xbb]);
        trace.memory_read(0x20008, &[1, 2]);
        trace.memory_read(0x20000, &[0xaa; 4]);
        trace.set_reg(9, 0);
        trace.set_reg(7, 42);
        trace.set_gas(90);
        trace.finish_host_call();

        assert_eq!(
            trace.render(),
            "ecalli=5 pc=2 gas=97\n\
             memread 20000 len=4 -> aaaaaaaa\n\
             memread 20008 len=2 -> 0102\n\
             memwrite 30000 len=1 <- bb\n\
             setreg r07 <- 2a\n\
             setreg r09 <- 0\n\
             setgas <- 90"
        );
    }

    #[test]
    fn disabled_tracker_records_nothing() {
        let mut trace = IoTraceTracker::disabled();
        trace.program(&[1, 2, 3]);
        trace.start(0, 10, &Registers::new());
        trace.memory_read(0, &[1]);
        trace.finish_host_call();
        trace.halt(0, 0, &Registers::new());
        assert_eq!(trace.render(), "");
    }
}
