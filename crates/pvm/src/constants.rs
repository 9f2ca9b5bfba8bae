// Register file
pub const NUM_REGISTERS: usize = 13;
pub const REGISTER_WIDTH: usize = 8;
// Flat little-endian encoding of the whole file, used across the host-call boundary
pub const ENCODED_REGISTERS_SIZE: usize = NUM_REGISTERS * REGISTER_WIDTH;

// Memory geometry. Guest addresses are 32-bit; pages are 2^12 bytes.
pub const PAGE_SHIFT: u32 = 12;
pub const PAGE_SIZE: u32 = 1 << PAGE_SHIFT;
pub const PAGE_COUNT: u32 = 1 << (32 - PAGE_SHIFT);

// The low guard region can never be declared or grown into. Keeps null
// pointers and small integer confusion faulting instead of aliasing data.
pub const RESERVED_MEMORY_END: u32 = 0x1_0000;
pub const RESERVED_PAGES: u32 = RESERVED_MEMORY_END / PAGE_SIZE;

// Standard program init segment layout. Segments start on 2^16 boundaries:
// read-only data first, read-write data plus heap on the next boundary after
// it, stack descending from STACK_SEGMENT_END, arguments at ARGS_SEGMENT_START.
pub const SEGMENT_ALIGNMENT: u32 = 0x1_0000;
pub const RO_SEGMENT_START: u32 = 0x1_0000;
pub const STACK_SEGMENT_END: u32 = 0xFEFE_0000;
pub const ARGS_SEGMENT_START: u32 = 0xFEFF_0000;
pub const MAX_ARGS_SIZE: u32 = EXIT_ADDRESS - ARGS_SEGMENT_START;

// Dynamic jump to this address is the clean-exit convention.
pub const EXIT_ADDRESS: u32 = 0xFFFF_0000;

// Dynamic jump targets must be nonzero multiples of this; (target / 2) - 1
// indexes the jump table.
pub const JUMP_ALIGNMENT: u32 = 2;

// Operand bytes of a single instruction (distance to the next opcode
// boundary) are clamped to this many bytes during decode.
pub const MAX_OPERAND_BYTES: u32 = 24;
