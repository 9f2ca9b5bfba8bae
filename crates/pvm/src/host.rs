use std::sync::Arc;

use async_trait::async_trait;
use rustc_hash::FxHashMap;

use crate::{
    constants::{ENCODED_REGISTERS_SIZE, NUM_REGISTERS},
    errors::{EnvironmentError, HostCallError, InternalError, PageFault},
    memory::Memory,
    registers::{Reg, Registers},
    tracing::IoTraceTracker,
    vm::Vm,
};

/// What a host call charges before the handler runs.
#[derive(Clone, Copy)]
pub enum HostCallCost {
    Fixed(u64),
    /// Hosts predating fixed pricing derived the charge from the caller's
    /// registers. New handlers should use `Fixed`; this variant exists so
    /// the old pricing stays an explicit opt-in at registration.
    OfRegisters(fn(&Registers) -> u64),
}

impl HostCallCost {
    pub fn amount(&self, registers: &Registers) -> u64 {
        match self {
            HostCallCost::Fixed(cost) => *cost,
            HostCallCost::OfRegisters(price) => price(registers),
        }
    }
}

/// What the machine should do once a handler returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCallOutcome {
    /// Resume at the instruction after the suspending one.
    Continue,
    Halt,
    Panic,
    OutOfGas,
}

/// Guest memory as seen by a host handler. Successful accesses are recorded
/// by the trace tracker; faulted ones are not.
pub struct HostMemory<'a> {
    memory: &'a mut Memory,
    trace: &'a mut IoTraceTracker,
}

impl HostMemory<'_> {
    pub fn read(&mut self, address: u32, buffer: &mut [u8]) -> Result<(), PageFault> {
        self.memory.read(address, buffer)?;
        self.trace.memory_read(address, buffer);
        Ok(())
    }

    pub fn write(&mut self, address: u32, data: &[u8]) -> Result<(), PageFault> {
        self.memory.write(address, data)?;
        self.trace.memory_write(address, data);
        Ok(())
    }

    pub fn heap_break(&self) -> u32 {
        self.memory.heap_break()
    }
}

/// Everything a handler may touch while the machine is suspended. Registers
/// cross the boundary as the flat 104-byte encoding; whatever the handler
/// leaves in the buffer is decoded back into the machine afterwards.
pub struct HostCallContext<'a> {
    pub gas_remaining: u64,
    pub registers: [u8; ENCODED_REGISTERS_SIZE],
    pub memory: HostMemory<'a>,
}

impl HostCallContext<'_> {
    /// Decoded view of the register buffer.
    pub fn registers(&self) -> Registers {
        Registers::decode(&self.registers)
    }

    pub fn set_register(&mut self, reg: Reg, value: u64) {
        let mut registers = self.registers();
        registers.set(reg, value);
        self.registers = registers.encode();
    }
}

/// An externally-supplied function the guest reaches through `ecalli`.
#[async_trait]
pub trait HostCallHandler: Send + Sync {
    /// Charged against the guest's gas before `execute` runs.
    fn cost(&self) -> HostCallCost;

    /// Errors are embedder faults and abort the run; guest-visible failures
    /// must come back as an outcome instead.
    async fn execute(
        &self,
        context: &mut HostCallContext<'_>,
    ) -> Result<HostCallOutcome, HostCallError>;
}

/// Host call registry, index to handler.
#[derive(Default)]
pub struct HostCallTable {
    handlers: FxHashMap<u32, Arc<dyn HostCallHandler>>,
}

impl HostCallTable {
    pub fn new() -> HostCallTable {
        HostCallTable::default()
    }

    pub fn register(&mut self, index: u32, handler: Arc<dyn HostCallHandler>) {
        self.handlers.insert(index, handler);
    }

    pub fn get(&self, index: u32) -> Option<&Arc<dyn HostCallHandler>> {
        self.handlers.get(&index)
    }
}

/// Services one `Host` suspension: charges the handler's cost, runs it with
/// the encoded registers and guest memory, applies its mutations and maps
/// the outcome back onto the machine.
///
/// A cost underflow ends the run as `OutOfGas` without invoking the handler.
/// An index with no registered handler is an embedder error, not a guest
/// outcome.
pub(crate) async fn service_host_call(
    vm: &mut Vm,
    table: &HostCallTable,
    trace: &mut IoTraceTracker,
) -> Result<(), EnvironmentError> {
    let index = vm.exit_param().ok_or(InternalError::MissingExitParam)?;
    tracing::debug!(index, pc = vm.pc, "servicing host call");
    trace.ecalli(index, vm.pc, vm.gas.get(), &vm.registers);

    let handler = table
        .get(index)
        .ok_or(EnvironmentError::MissingHostHandler(index))?;

    if vm.gas.sub(handler.cost().amount(&vm.registers)) {
        vm.stop_with_out_of_gas();
        trace.finish_host_call();
        return Ok(());
    }

    let mut context = HostCallContext {
        gas_remaining: vm.gas.get(),
        registers: vm.registers.encode(),
        memory: HostMemory {
            memory: &mut vm.memory,
            trace,
        },
    };
    let outcome = handler
        .execute(&mut context)
        .await
        .map_err(|source| EnvironmentError::HostHandler { index, source })?;
    let HostCallContext {
        gas_remaining,
        registers,
        memory: _,
    } = context;

    let updated = Registers::decode(&registers);
    for index in 0..NUM_REGISTERS {
        let reg = Reg::from_nibble(index as u8);
        if updated.get(reg) != vm.registers.get(reg) {
            trace.set_reg(index, updated.get(reg));
        }
    }
    if gas_remaining != vm.gas.get() {
        trace.set_gas(gas_remaining);
        vm.gas.set(gas_remaining);
    }
    vm.registers = updated;
    trace.finish_host_call();

    match outcome {
        HostCallOutcome::Continue => vm.resume_after_host_call(),
        HostCallOutcome::Halt => {
            vm.stop_with_halt();
        }
        HostCallOutcome::Panic => {
            vm.stop_with_panic(0);
        }
        HostCallOutcome::OutOfGas => {
            vm.gas.set(0);
            vm.stop_with_out_of_gas();
        }
    }
    Ok(())
}
