use crate::{
    errors::PageFault,
    gas::GasCounter,
    gas_cost,
    instructions::{decode_args, dispatch},
    memory::Memory,
    opcodes::Opcode,
    program::Program,
    registers::Registers,
};

/// Where the machine stands. `Ready` and `Host` are resumable, the rest are
/// terminal for the current run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The next instruction can be stepped.
    Ready,
    /// Suspended on a host call, the exit parameter holds the host index.
    Host,
    /// Finished normally.
    Halt,
    /// The guest trapped. The exit parameter carries the fault address or
    /// offending jump target, zero for plain traps.
    Panic,
    /// The gas allowance ran out.
    OutOfGas,
}

/// What one dispatched instruction did with control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpcodeResult {
    /// Fall through to the instruction after this one.
    Continue,
    /// The program counter was redirected, do not advance it.
    Jumped,
    /// The machine left `Ready`, the status says why.
    Stopped,
}

/// A single guest machine: register file, gas counter, paged memory and the
/// program it executes. Instances are inert between runs and are rebuilt
/// with [`Vm::reset`] rather than reallocated.
#[derive(Debug)]
pub struct Vm {
    pub program: Program,
    pub registers: Registers,
    pub memory: Memory,
    pub gas: GasCounter,
    pub pc: u32,
    status: Status,
    exit_param: Option<u32>,
}

impl Vm {
    pub fn new() -> Vm {
        Vm {
            program: Program::default(),
            registers: Registers::new(),
            memory: Memory::new(),
            gas: GasCounter::new(0),
            pc: 0,
            status: Status::Ready,
            exit_param: None,
        }
    }

    /// Replaces every piece of machine state with the given one. Nothing of
    /// the previous run survives a reset.
    pub fn reset(
        &mut self,
        program: Program,
        registers: Registers,
        memory: Memory,
        pc: u32,
        gas: u64,
    ) {
        self.program = program;
        self.registers = registers;
        self.memory = memory;
        self.pc = pc;
        self.gas.reset(gas);
        self.status = Status::Ready;
        self.exit_param = None;
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Meaning depends on the status: the host index while suspended on a
    /// host call, the panic argument after a guest trap.
    pub fn exit_param(&self) -> Option<u32> {
        self.exit_param
    }

    /// Executes one instruction. Does nothing unless the machine is `Ready`.
    ///
    /// A program counter that does not sit on an instruction boundary is a
    /// guest panic, as is an opcode byte outside the instruction set. Gas is
    /// charged before the instruction runs, including for unknown bytes.
    pub fn step(&mut self) {
        if self.status != Status::Ready {
            return;
        }
        if !self.program.is_boundary(self.pc) {
            self.stop_with_panic(0);
            return;
        }
        let Some(opcode_byte) = self.program.code().get(self.pc as usize).copied() else {
            self.stop_with_panic(0);
            return;
        };
        let Some(opcode) = Opcode::from_byte(opcode_byte) else {
            if self.gas.sub(gas_cost::UNKNOWN) {
                self.stop_with_out_of_gas();
            } else {
                self.stop_with_panic(0);
            }
            return;
        };
        if self.gas.sub(gas_cost::of(opcode)) {
            self.stop_with_out_of_gas();
            return;
        }

        let skip = self.program.skip(self.pc);
        let args = {
            let start = self.pc as usize + 1;
            let operands = self
                .program
                .code()
                .get(start..start + skip as usize)
                .unwrap_or(&[]);
            decode_args(opcode.args_kind(), operands)
        };

        match dispatch(self, opcode, args) {
            Ok(OpcodeResult::Continue) => self.pc = self.pc.wrapping_add(1 + skip),
            Ok(OpcodeResult::Jumped | OpcodeResult::Stopped) => {}
            Err(PageFault(address)) => {
                self.stop_with_panic(address);
            }
        }
    }

    /// Steps until the machine leaves `Ready` and returns the status it
    /// stopped with.
    pub fn run(&mut self) -> Status {
        while self.status == Status::Ready {
            self.step();
        }
        self.status
    }

    /// Reopens a machine suspended on a host call, stepping the program
    /// counter past the suspending instruction.
    pub fn resume_after_host_call(&mut self) {
        self.pc = self.pc.wrapping_add(1 + self.program.skip(self.pc));
        self.status = Status::Ready;
        self.exit_param = None;
    }

    /// Redirects the program counter, panicking the guest when the target is
    /// not an instruction boundary.
    pub(crate) fn jump_to(&mut self, target: u32) -> OpcodeResult {
        if self.program.is_boundary(target) {
            self.pc = target;
            OpcodeResult::Jumped
        } else {
            self.stop_with_panic(target)
        }
    }

    pub(crate) fn stop_with_halt(&mut self) -> OpcodeResult {
        self.status = Status::Halt;
        OpcodeResult::Stopped
    }

    pub(crate) fn stop_with_panic(&mut self, arg: u32) -> OpcodeResult {
        self.status = Status::Panic;
        self.exit_param = Some(arg);
        OpcodeResult::Stopped
    }

    pub(crate) fn stop_with_host_call(&mut self, index: u32) -> OpcodeResult {
        self.status = Status::Host;
        self.exit_param = Some(index);
        OpcodeResult::Stopped
    }

    pub(crate) fn stop_with_out_of_gas(&mut self) {
        self.status = Status::OutOfGas;
    }

    /// An opcode that reached a dispatcher arm it has no business in. Treated
    /// exactly like an unknown opcode byte.
    pub(crate) fn invalid_instruction(&mut self) -> OpcodeResult {
        self.stop_with_panic(0)
    }
}

impl Default for Vm {
    fn default() -> Self {
        Vm::new()
    }
}
