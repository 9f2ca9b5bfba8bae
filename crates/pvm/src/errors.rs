use thiserror::Error;

/// Faults raised while assembling initial guest memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MemoryBuilderError {
    /// The requested pages intersect the reserved low region.
    #[error("pages [{0:#x}, {1:#x}) fall inside the reserved region")]
    ReservedMemoryFault(u64, u64),
    /// `set_data` touched a page that was never declared.
    #[error("address {0:#x} does not fall on a declared page")]
    PageNotExist(u32),
    /// The heap range handed to `finalize` collides with declared pages or
    /// the reserved region, or is inverted.
    #[error("heap range [{0:#x}, {1:#x}) collides with declared memory")]
    IncorrectSbrkIndex(u32, u32),
    /// The builder was mutated after `finalize`.
    #[error("builder already finalized")]
    FinalizedBuilderModification,
    /// Page range ends before it starts or overruns the address space.
    #[error("invalid page range [{0:#x}, {1:#x})")]
    InvalidRange(u64, u64),
    /// Initial data does not fit in the declared range.
    #[error("{data} bytes of data for {space} bytes of pages")]
    DataTooLong { data: usize, space: usize },
}

/// Malformed program container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProgramParseError {
    #[error("program ended before {0}")]
    UnexpectedEnd(&'static str),
    #[error("varint byte {0:#x} extends the value past 32 bits")]
    VarintTooLong(u8),
    #[error("jump table entry size {0} (expected 0..=4)")]
    InvalidJumpTableEntrySize(u8),
    #[error("argument blob of {0} bytes exceeds the args segment")]
    ArgsTooLong(usize),
}

/// Failure raised by an embedder-provided host-call handler. The bridge
/// treats any of these as fatal for the run, not as a guest outcome.
#[derive(Debug, Error)]
pub enum HostCallError {
    #[error("{0}")]
    Custom(String),
}

/// Invariant violations. Reaching one of these is a bug in the machine,
/// never in the guest program or the embedder's configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InternalError {
    #[error("status is Host but no exit parameter is set")]
    MissingExitParam,
    #[error("arithmetic overflow")]
    Overflow,
    #[error("{0}")]
    Custom(&'static str),
}

/// Failures of the embedding environment, propagated to the caller of
/// `run_program` as `Err`. Guest-visible outcomes (halt, panic, out of gas,
/// access faults) never surface here; those travel as status values.
#[derive(Debug, Error)]
pub enum EnvironmentError {
    #[error("no host-call handler registered for index {0}")]
    MissingHostHandler(u32),
    #[error("host-call handler {index} failed: {source}")]
    HostHandler { index: u32, source: HostCallError },
    #[error("program: {0}")]
    Program(#[from] ProgramParseError),
    #[error("initial memory: {0}")]
    InitialMemory(#[from] MemoryBuilderError),
    #[error("internal: {0}")]
    Internal(#[from] InternalError),
}

/// Guest memory access fault carrying the faulting address. Translated into
/// a `Panic` outcome by the interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("memory access fault at {0:#x}")]
pub struct PageFault(pub u32);
