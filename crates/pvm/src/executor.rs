use bytes::Bytes;

use crate::{
    constants::{
        ARGS_SEGMENT_START, EXIT_ADDRESS, MAX_ARGS_SIZE, PAGE_SIZE, RO_SEGMENT_START,
        SEGMENT_ALIGNMENT, STACK_SEGMENT_END,
    },
    errors::{EnvironmentError, InternalError, MemoryBuilderError, ProgramParseError},
    host::{HostCallTable, service_host_call},
    memory::{Memory, MemoryBuilder, MemoryRange, PageRange},
    pool::InstancePool,
    program::Program,
    registers::{Reg, Registers},
    tracing::IoTraceTracker,
    vm::{Status, Vm},
};

/// What a finished run hands back: the gas it consumed plus either the
/// guest's output bytes (clean halt) or the status it died with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnValue {
    Output { consumed_gas: u64, output: Bytes },
    Status { consumed_gas: u64, status: Status },
}

impl ReturnValue {
    pub fn consumed_gas(&self) -> u64 {
        match self {
            ReturnValue::Output { consumed_gas, .. } => *consumed_gas,
            ReturnValue::Status { consumed_gas, .. } => *consumed_gas,
        }
    }
}

/// Entry point of the engine: a bounded pool of reusable machines plus the
/// host-call registry shared by every run.
pub struct Executor {
    pool: InstancePool,
    hosts: HostCallTable,
}

impl Executor {
    pub fn new(instances: usize, hosts: HostCallTable) -> Executor {
        Executor {
            pool: InstancePool::new(instances),
            hosts,
        }
    }

    /// Runs a program to completion without recording an I/O trace.
    pub async fn run_program(
        &self,
        program_bytes: &[u8],
        args: &[u8],
        initial_pc: u32,
        initial_gas: u64,
    ) -> Result<ReturnValue, EnvironmentError> {
        let mut trace = IoTraceTracker::disabled();
        self.run_program_traced(program_bytes, args, initial_pc, initial_gas, &mut trace)
            .await
    }

    /// Runs a program to completion, recording host-call I/O into `trace`.
    /// Execution is bit-identical with tracing on or off.
    pub async fn run_program_traced(
        &self,
        program_bytes: &[u8],
        args: &[u8],
        initial_pc: u32,
        initial_gas: u64,
        trace: &mut IoTraceTracker,
    ) -> Result<ReturnValue, EnvironmentError> {
        let program = Program::parse(program_bytes)?;
        let (registers, memory) = standard_init(&program, args)?;

        let mut vm = self.pool.acquire().await;
        vm.reset(program, registers, memory, initial_pc, initial_gas);
        tracing::debug!(pc = initial_pc, gas = initial_gas, "starting run");
        trace.program(program_bytes);
        trace.start(vm.pc, vm.gas.get(), &vm.registers);

        loop {
            match vm.run() {
                Status::Host => service_host_call(&mut vm, &self.hosts, trace).await?,
                Status::Halt => {
                    trace.halt(vm.pc, vm.gas.get(), &vm.registers);
                    let output = halt_output(&vm);
                    tracing::debug!(
                        consumed = vm.gas.used(),
                        output_len = output.len(),
                        "run halted"
                    );
                    return Ok(ReturnValue::Output {
                        consumed_gas: vm.gas.used(),
                        output,
                    });
                }
                Status::Panic => {
                    let arg = vm.exit_param().unwrap_or(0);
                    trace.panic(arg, vm.pc, vm.gas.get(), &vm.registers);
                    tracing::debug!(arg, consumed = vm.gas.used(), "run panicked");
                    return Ok(ReturnValue::Status {
                        consumed_gas: vm.gas.used(),
                        status: Status::Panic,
                    });
                }
                Status::OutOfGas => {
                    trace.out_of_gas(vm.pc, vm.gas.get(), &vm.registers);
                    tracing::debug!(consumed = vm.gas.used(), "run exhausted its gas");
                    return Ok(ReturnValue::Status {
                        consumed_gas: vm.gas.used(),
                        status: Status::OutOfGas,
                    });
                }
                Status::Ready => {
                    return Err(InternalError::Custom("run returned while ready").into());
                }
            }
        }
    }
}

/// Assembles the standard initial machine state from the container's
/// segments: read-only data at its fixed base, read-write data on the next
/// segment boundary with the heap right behind it, stack descending from the
/// stack top, arguments in their own read-only segment. Registers start
/// zeroed with the entry convention applied.
pub fn standard_init(
    program: &Program,
    args: &[u8],
) -> Result<(Registers, Memory), EnvironmentError> {
    if args.len() > MAX_ARGS_SIZE as usize {
        return Err(ProgramParseError::ArgsTooLong(args.len()).into());
    }

    let mut builder = MemoryBuilder::new();

    let ro_len = program.ro_data().len() as u64;
    let rw_len = program.rw_data().len() as u64;

    if ro_len > 0 {
        builder.set_readable_pages(
            segment(u64::from(RO_SEGMENT_START), ro_len)?,
            program.ro_data(),
        )?;
    }

    let rw_start = align_up(
        u64::from(RO_SEGMENT_START) + ro_len,
        u64::from(SEGMENT_ALIGNMENT),
    );
    if rw_len > 0 {
        builder.set_writeable_pages(segment(rw_start, rw_len)?, program.rw_data())?;
    }

    let heap_start = align_up(rw_start + rw_len, u64::from(PAGE_SIZE));
    let heap_end = heap_start + u64::from(program.heap_pages()) * u64::from(PAGE_SIZE);

    let stack_len = align_up(u64::from(program.stack_size()), u64::from(PAGE_SIZE));
    let stack_start = u64::from(STACK_SEGMENT_END)
        .checked_sub(stack_len)
        .ok_or(MemoryBuilderError::InvalidRange(0, stack_len))?;
    if stack_len > 0 {
        builder.set_writeable_pages(segment(stack_start, stack_len)?, &[])?;
    }

    if !args.is_empty() {
        builder.set_readable_pages(
            segment(u64::from(ARGS_SEGMENT_START), args.len() as u64)?,
            args,
        )?;
    }

    let memory = builder.finalize(narrow(heap_start)?, narrow(heap_end)?)?;

    let mut registers = Registers::new();
    registers.set(Reg::RA, u64::from(EXIT_ADDRESS));
    registers.set(Reg::SP, u64::from(STACK_SEGMENT_END));
    registers.set(Reg::A0, u64::from(ARGS_SEGMENT_START));
    registers.set(Reg::A1, args.len() as u64);
    Ok((registers, memory))
}

/// The output convention on a clean halt: the bytes at the address in `A0`
/// with the length in `A1`. A length wider than the address space or a copy
/// that faults degrades to empty output.
fn halt_output(vm: &Vm) -> Bytes {
    let address = vm.registers.get(Reg::A0) as u32;
    let Ok(length) = u32::try_from(vm.registers.get(Reg::A1)) else {
        return Bytes::new();
    };
    let mut output = vec![0u8; length as usize];
    match vm.memory.read(address, &mut output) {
        Ok(()) => Bytes::from(output),
        Err(_) => Bytes::new(),
    }
}

// Segment placement is computed in u64 so a container demanding more than
// the 32-bit space rejects instead of wrapping.
fn segment(start: u64, length: u64) -> Result<PageRange, MemoryBuilderError> {
    let end = start + length;
    if end > 1 << 32 {
        return Err(MemoryBuilderError::InvalidRange(start, end));
    }
    Ok(PageRange::covering(MemoryRange::new(
        start as u32,
        length as u32,
    )))
}

fn narrow(address: u64) -> Result<u32, MemoryBuilderError> {
    u32::try_from(address).map_err(|_| MemoryBuilderError::InvalidRange(address, address))
}

fn align_up(value: u64, alignment: u64) -> u64 {
    value.div_ceil(alignment) * alignment
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::{Operation, ProgramLayout, encode_program, encode_program_with};

    fn parsed(operations: &[Operation], layout: &ProgramLayout) -> Program {
        Program::parse(&encode_program_with(operations, layout)).unwrap()
    }

    #[test]
    fn standard_init_lays_out_segments() {
        let layout = ProgramLayout {
            ro_data: vec![0xaa, 0xbb],
            rw_data: vec![0xcc; 5],
            heap_pages: 2,
            stack_size: 0x1800,
            jump_table: Vec::new(),
        };
        let program = parsed(&[Operation::Trap], &layout);
        let (registers, mut memory) = standard_init(&program, &[1, 2, 3]).unwrap();

        assert_eq!(registers.get(Reg::RA), u64::from(EXIT_ADDRESS));
        assert_eq!(registers.get(Reg::SP), u64::from(STACK_SEGMENT_END));
        assert_eq!(registers.get(Reg::A0), u64::from(ARGS_SEGMENT_START));
        assert_eq!(registers.get(Reg::A1), 3);

        // Read-only data sits at its fixed base and rejects writes.
        assert_eq!(memory.read_u16(RO_SEGMENT_START).unwrap(), 0xbbaa);
        assert!(memory.write_u8(RO_SEGMENT_START, 0).is_err());

        // Read-write data lands on the next segment boundary.
        let rw_start = RO_SEGMENT_START + SEGMENT_ALIGNMENT;
        assert_eq!(memory.read_u8(rw_start).unwrap(), 0xcc);
        memory.write_u8(rw_start, 1).unwrap();

        // Stack pages cover the aligned size below the stack top.
        memory.write_u8(STACK_SEGMENT_END - 0x2000, 7).unwrap();
        assert!(memory.write_u8(STACK_SEGMENT_END - 0x2000 - 1, 7).is_err());

        // Arguments are readable, not writable.
        let mut args = [0u8; 3];
        memory.read(ARGS_SEGMENT_START, &mut args).unwrap();
        assert_eq!(args, [1, 2, 3]);
        assert!(memory.write_u8(ARGS_SEGMENT_START, 0).is_err());

        // The heap begins on the page after rw data with two pages of room.
        assert_eq!(memory.heap_break(), rw_start + PAGE_SIZE);
        memory.sbrk(u64::from(2 * PAGE_SIZE)).unwrap();
        assert!(memory.sbrk(1).is_err());
    }

    #[test]
    fn standard_init_rejects_oversized_args() {
        let program = parsed(&[Operation::Trap], &ProgramLayout::default());
        let args = vec![0u8; MAX_ARGS_SIZE as usize + 1];
        assert!(matches!(
            standard_init(&program, &args),
            Err(EnvironmentError::Program(ProgramParseError::ArgsTooLong(_)))
        ));
    }

    #[test]
    fn halt_output_degrades_to_empty_on_fault() {
        let mut vm = Vm::new();
        vm.registers.set(Reg::A0, 0x5_0000);
        vm.registers.set(Reg::A1, 4);
        assert!(halt_output(&vm).is_empty());

        // A length that cannot fit the address space cannot be a mapped
        // region either.
        vm.registers.set(Reg::A1, u64::from(u32::MAX) + 1);
        assert!(halt_output(&vm).is_empty());
    }

    #[tokio::test]
    async fn immediate_halt_returns_the_args_as_output() {
        let executor = Executor::new(1, HostCallTable::new());
        let program = encode_program(&[Operation::JumpInd {
            base: Reg::RA,
            offset: 0,
        }]);

        let result = executor
            .run_program(&program, &[9, 8, 7, 6], 0, 100)
            .await
            .unwrap();
        match result {
            ReturnValue::Output {
                consumed_gas,
                output,
            } => {
                assert_eq!(output.as_ref(), &[9, 8, 7, 6]);
                assert_eq!(consumed_gas, 1);
            }
            ReturnValue::Status { .. } => panic!("expected output, not a status"),
        }
    }
}
