//! # jamex-pvm
//!
//! A deterministic, gas-metered PolkaVM-style virtual machine.
//!
//! ## Overview
//!
//! jamex-pvm interprets guest programs for the JAM family of protocols,
//! designed for:
//! - **Determinism**: identical inputs and host responses produce
//!   bit-identical results, a consensus requirement rather than a nicety
//! - **Isolation**: page-granular memory protection with a reserved low
//!   guard region; every guest fault is an in-band outcome, never a crash
//! - **Reuse**: machine instances live in a bounded pool and are reset
//!   between runs instead of reallocated
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                         Executor                           │
//! │  ┌──────────────┐   ┌───────────────┐   ┌───────────────┐  │
//! │  │ InstancePool │   │ HostCallTable │   │ IoTraceTracker│  │
//! │  └──────────────┘   └───────────────┘   └───────────────┘  │
//! └────────────────────────────┬───────────────────────────────┘
//!                              ▼
//! ┌────────────────────────────────────────────────────────────┐
//! │                            Vm                              │
//! │  ┌───────────┐  ┌────────────┐  ┌────────┐  ┌───────────┐  │
//! │  │ Registers │  │   Memory   │  │  Gas   │  │  Program  │  │
//! │  └───────────┘  └────────────┘  └────────┘  └───────────┘  │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Core Types
//!
//! - [`executor::Executor`]: pool-backed entry point, one call per guest run
//! - [`vm::Vm`]: a single machine; fetch, decode, dispatch until it stops
//! - [`memory::Memory`]: sparse paged address space with access classes
//! - [`host::HostCallHandler`]: async extension point reached via `ecalli`
//! - [`operations::Operation`]: typed assembler for building program blobs
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`executor`] | Run entry point, standard program init, return values |
//! | [`vm`] | Machine state and the step/run interpreter loop |
//! | [`instructions`] | Operand decoding and the per-group dispatchers |
//! | [`opcodes`] | Opcode enum and arity classes |
//! | [`operations`] | Instruction builder and container encoder |
//! | [`program`] | Program container parser (jump table, code, mask) |
//! | [`memory`] | Paged memory, builder, sbrk growth |
//! | [`registers`] | Register file and its flat wire encoding |
//! | [`gas`] / [`gas_cost`] | Remaining-gas meter and the cost schedule |
//! | [`host`] | Host-call bridge, cost policies, handler registry |
//! | [`pool`] | Bounded pool of reusable machine instances |
//! | [`tracing`] | Bit-stable I/O trace of host-call interactions |
//! | [`errors`] | Environment, builder, parse and internal error types |
//!
//! ## Quick Start
//!
//! ```ignore
//! use jamex_pvm::{Executor, HostCallTable, ReturnValue};
//!
//! let executor = Executor::new(8, HostCallTable::new());
//!
//! // Run a guest program with arguments, entry pc 0 and a gas budget.
//! match executor.run_program(&program, &args, 0, 1_000_000).await? {
//!     ReturnValue::Output { output, .. } => println!("output: {output:?}"),
//!     ReturnValue::Status { status, .. } => println!("died: {status:?}"),
//! }
//! ```

pub mod constants;
pub mod errors;
pub mod executor;
pub mod gas;
pub mod gas_cost;
pub mod host;
pub mod instructions;
pub mod memory;
pub mod opcodes;
pub mod operations;
pub mod pool;
pub mod program;
pub mod registers;
pub mod tracing;
pub mod vm;

pub use executor::{Executor, ReturnValue};
pub use host::{
    HostCallContext, HostCallCost, HostCallHandler, HostCallOutcome, HostCallTable, HostMemory,
};
pub use pool::{InstancePool, PooledVm};
pub use tracing::IoTraceTracker;
pub use vm::{Status, Vm};
