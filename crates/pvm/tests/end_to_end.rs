//! Whole-engine scenarios: assembled programs through the executor, host
//! calls included, checked against exact outputs, gas accounting and the
//! rendered I/O trace.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use async_trait::async_trait;
use hex_literal::hex;
use jamex_pvm::{
    Executor, HostCallContext, HostCallCost, HostCallHandler, HostCallOutcome, HostCallTable,
    IoTraceTracker, ReturnValue, Status,
    errors::{EnvironmentError, HostCallError},
    operations::{Operation, ProgramLayout, encode_program, encode_program_with},
    registers::Reg,
};

fn r(nibble: u8) -> Reg {
    Reg::from_nibble(nibble)
}

/// Copies the caller's argument bytes into the read-write segment, points
/// the output registers at the copy, marks register 9 and burns two gas.
struct CopyArgs;

// With no read-only data the read-write segment lands on the first segment
// boundary.
const RW_START: u32 = 0x1_0000;

#[async_trait]
impl HostCallHandler for CopyArgs {
    fn cost(&self) -> HostCallCost {
        HostCallCost::Fixed(3)
    }

    async fn execute(
        &self,
        context: &mut HostCallContext<'_>,
    ) -> Result<HostCallOutcome, HostCallError> {
        let registers = context.registers();
        let args_address = registers.get(Reg::A0) as u32;

        let mut args = [0u8; 4];
        context
            .memory
            .read(args_address, &mut args)
            .map_err(|fault| HostCallError::Custom(fault.to_string()))?;
        context
            .memory
            .write(RW_START, &args)
            .map_err(|fault| HostCallError::Custom(fault.to_string()))?;

        context.set_register(Reg::A0, u64::from(RW_START));
        context.set_register(r(9), 1);
        context.gas_remaining -= 2;
        Ok(HostCallOutcome::Continue)
    }
}

/// Counts invocations; used to show when a handler never ran.
struct Counting {
    cost: u64,
    calls: AtomicU64,
}

#[async_trait]
impl HostCallHandler for Counting {
    fn cost(&self) -> HostCallCost {
        HostCallCost::Fixed(self.cost)
    }

    async fn execute(
        &self,
        _context: &mut HostCallContext<'_>,
    ) -> Result<HostCallOutcome, HostCallError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Ok(HostCallOutcome::Continue)
    }
}

/// `ecalli 5`, then return through the exit convention.
fn copy_args_program() -> Vec<u8> {
    let layout = ProgramLayout {
        rw_data: vec![0; 4],
        ..ProgramLayout::default()
    };
    encode_program_with(
        &[
            Operation::Ecalli { index: 5 },
            Operation::JumpInd {
                base: Reg::RA,
                offset: 0,
            },
        ],
        &layout,
    )
}

fn copy_args_executor() -> Executor {
    let mut hosts = HostCallTable::new();
    hosts.register(5, Arc::new(CopyArgs));
    Executor::new(1, hosts)
}

#[tokio::test]
async fn host_call_round_trip_renders_the_golden_trace() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let program = copy_args_program();
    let executor = copy_args_executor();
    let mut trace = IoTraceTracker::new();

    let result = executor
        .run_program_traced(&program, &hex!("aabbccdd"), 0, 100, &mut trace)
        .await
        .expect("handler registered");

    assert_eq!(
        result,
        ReturnValue::Output {
            consumed_gas: 7,
            output: hex!("aabbccdd").to_vec().into(),
        }
    );

    let expected = format!(
        "program {}\n\
         start pc=0 gas=100 r00=ffff0000 r01=fefe0000 r07=feff0000 r08=4\n\
         ecalli=5 pc=0 gas=99 r00=ffff0000 r01=fefe0000 r07=feff0000 r08=4\n\
         memread feff0000 len=4 -> aabbccdd\n\
         memwrite 10000 len=4 <- aabbccdd\n\
         setreg r07 <- 10000\n\
         setreg r09 <- 1\n\
         setgas <- 94\n\
         HALT pc=2 gas=93 r00=ffff0000 r01=fefe0000 r07=10000 r08=4 r09=1",
        hex::encode(&program)
    );
    assert_eq!(trace.render(), expected);
}

#[tokio::test]
async fn disabled_tracing_changes_nothing_observable() {
    let program = copy_args_program();
    let executor = copy_args_executor();

    let mut trace = IoTraceTracker::new();
    let traced = executor
        .run_program_traced(&program, &hex!("aabbccdd"), 0, 100, &mut trace)
        .await
        .expect("handler registered");
    let untraced = executor
        .run_program(&program, &hex!("aabbccdd"), 0, 100)
        .await
        .expect("handler registered");

    assert_eq!(traced, untraced);
}

#[tokio::test]
async fn gas_exhaustion_mid_loop_consumes_the_whole_allowance() {
    let executor = Executor::new(1, HostCallTable::new());
    // A jump with offset zero spins in place until the meter runs dry.
    let program = encode_program(&[Operation::Jump { offset: 0 }]);

    let result = executor
        .run_program(&program, &[], 0, 7)
        .await
        .expect("no host calls involved");
    assert_eq!(
        result,
        ReturnValue::Status {
            consumed_gas: 7,
            status: Status::OutOfGas,
        }
    );
}

#[tokio::test]
async fn unregistered_host_index_fails_the_run() {
    let executor = Executor::new(1, HostCallTable::new());
    let program = encode_program(&[Operation::Ecalli { index: 99 }]);

    let error = executor
        .run_program(&program, &[], 0, 10)
        .await
        .expect_err("nothing registered");
    assert!(matches!(error, EnvironmentError::MissingHostHandler(99)));
}

#[tokio::test]
async fn host_cost_underflow_never_invokes_the_handler() {
    let handler = Arc::new(Counting {
        cost: 1000,
        calls: AtomicU64::new(0),
    });
    let mut hosts = HostCallTable::new();
    hosts.register(4, handler.clone() as Arc<dyn HostCallHandler>);
    let executor = Executor::new(1, hosts);

    let program = encode_program(&[Operation::Ecalli { index: 4 }]);
    let result = executor
        .run_program(&program, &[], 0, 50)
        .await
        .expect("underflow is a guest outcome");

    assert_eq!(
        result,
        ReturnValue::Status {
            consumed_gas: 50,
            status: Status::OutOfGas,
        }
    );
    assert_eq!(handler.calls.load(Ordering::Relaxed), 0);
}

#[tokio::test]
async fn guest_panic_reports_status_and_consumed_gas() {
    let executor = Executor::new(1, HostCallTable::new());
    let program = encode_program(&[
        Operation::LoadImm {
            reg: r(9),
            value: 0xdead,
        },
        Operation::Trap,
    ]);

    let result = executor
        .run_program(&program, &[], 0, 10)
        .await
        .expect("no host calls involved");
    assert_eq!(
        result,
        ReturnValue::Status {
            consumed_gas: 2,
            status: Status::Panic,
        }
    );
}

#[tokio::test]
async fn instances_are_pristine_between_runs() {
    // Capacity one: both runs are served by the same pooled instance.
    let executor = Executor::new(1, HostCallTable::new());

    let dirtying = encode_program(&[
        Operation::LoadImm {
            reg: r(9),
            value: 0xdead,
        },
        Operation::Trap,
    ]);
    let result = executor
        .run_program(&dirtying, &[], 0, 10)
        .await
        .expect("no host calls involved");
    assert!(matches!(
        result,
        ReturnValue::Status {
            status: Status::Panic,
            ..
        }
    ));

    // Halts via the exit convention only when register 9 still reads zero;
    // leaked state would fall through into the trap.
    let checking = encode_program(&[
        Operation::BranchEqImm {
            a: r(9),
            imm: 0,
            offset: 4,
        },
        Operation::Trap,
        Operation::JumpInd {
            base: Reg::RA,
            offset: 0,
        },
    ]);
    let result = executor
        .run_program(&checking, &[], 0, 10)
        .await
        .expect("no host calls involved");
    match result {
        ReturnValue::Output { output, .. } => assert!(output.is_empty()),
        ReturnValue::Status { status, .. } => panic!("leaked state, died with {status:?}"),
    }
}

#[tokio::test]
async fn malformed_containers_are_environment_errors() {
    let executor = Executor::new(1, HostCallTable::new());
    let error = executor
        .run_program(&[1, 2, 3], &[], 0, 10)
        .await
        .expect_err("truncated header");
    assert!(matches!(error, EnvironmentError::Program(_)));
}
