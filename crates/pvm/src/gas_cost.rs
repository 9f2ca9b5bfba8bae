use crate::opcodes::Opcode;

/// Contains the gas costs of the machine instructions
// The schedule currently prices every instruction at the base cost. `of` is
// the seam where benchmarked per-opcode prices land.
pub const BASE: u64 = 1;

// Charged for bytes that decode to no known instruction, before the panic.
pub const UNKNOWN: u64 = BASE;

pub const fn of(_opcode: Opcode) -> u64 {
    BASE
}
