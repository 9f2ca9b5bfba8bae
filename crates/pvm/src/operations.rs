use crate::{
    instructions::{Args, sext},
    opcodes::Opcode,
    registers::Reg,
};

/// One instruction in assembler form, typed per operand role. Exists so
/// tests and embedders can build containers without a guest toolchain.
///
/// Immediates outside the signed 32-bit range truncate to their low four
/// bytes, mirroring what the variable-length coding can express (the sole
/// exception is `LoadImm64`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    // System
    Trap,
    Fallthrough,
    Ecalli { index: u64 },

    // Stores of immediate data at absolute addresses
    StoreImmU8 { address: u64, value: u64 },
    StoreImmU16 { address: u64, value: u64 },
    StoreImmU32 { address: u64, value: u64 },
    StoreImmU64 { address: u64, value: u64 },

    // Jumps
    Jump { offset: i32 },
    JumpInd { base: Reg, offset: u64 },
    LoadImmJump { reg: Reg, value: u64, offset: i32 },
    LoadImmJumpInd { d: Reg, base: Reg, value: u64, offset: u64 },

    // Register loads
    LoadImm { reg: Reg, value: u64 },
    LoadImm64 { reg: Reg, value: u64 },

    // Memory loads at absolute addresses
    LoadU8 { d: Reg, address: u64 },
    LoadI8 { d: Reg, address: u64 },
    LoadU16 { d: Reg, address: u64 },
    LoadI16 { d: Reg, address: u64 },
    LoadU32 { d: Reg, address: u64 },
    LoadI32 { d: Reg, address: u64 },
    LoadU64 { d: Reg, address: u64 },

    // Memory stores at absolute addresses
    StoreU8 { src: Reg, address: u64 },
    StoreU16 { src: Reg, address: u64 },
    StoreU32 { src: Reg, address: u64 },
    StoreU64 { src: Reg, address: u64 },

    // Stores of immediate data at register-relative addresses
    StoreImmIndU8 { base: Reg, offset: u64, value: u64 },
    StoreImmIndU16 { base: Reg, offset: u64, value: u64 },
    StoreImmIndU32 { base: Reg, offset: u64, value: u64 },
    StoreImmIndU64 { base: Reg, offset: u64, value: u64 },

    // Branches comparing a register with an immediate
    BranchEqImm { a: Reg, imm: u64, offset: i32 },
    BranchNeImm { a: Reg, imm: u64, offset: i32 },
    BranchLtUImm { a: Reg, imm: u64, offset: i32 },
    BranchLeUImm { a: Reg, imm: u64, offset: i32 },
    BranchGeUImm { a: Reg, imm: u64, offset: i32 },
    BranchGtUImm { a: Reg, imm: u64, offset: i32 },
    BranchLtSImm { a: Reg, imm: u64, offset: i32 },
    BranchLeSImm { a: Reg, imm: u64, offset: i32 },
    BranchGeSImm { a: Reg, imm: u64, offset: i32 },
    BranchGtSImm { a: Reg, imm: u64, offset: i32 },

    // Register-to-register unary forms
    MoveReg { d: Reg, s: Reg },
    Sbrk { d: Reg, size: Reg },
    CountSetBits64 { d: Reg, s: Reg },
    CountSetBits32 { d: Reg, s: Reg },
    LeadingZeroBits64 { d: Reg, s: Reg },
    LeadingZeroBits32 { d: Reg, s: Reg },
    TrailingZeroBits64 { d: Reg, s: Reg },
    TrailingZeroBits32 { d: Reg, s: Reg },
    SignExtend8 { d: Reg, s: Reg },
    SignExtend16 { d: Reg, s: Reg },
    ZeroExtend16 { d: Reg, s: Reg },
    ReverseBytes { d: Reg, s: Reg },

    // Memory accesses at register-relative addresses
    StoreIndU8 { src: Reg, base: Reg, offset: u64 },
    StoreIndU16 { src: Reg, base: Reg, offset: u64 },
    StoreIndU32 { src: Reg, base: Reg, offset: u64 },
    StoreIndU64 { src: Reg, base: Reg, offset: u64 },
    LoadIndU8 { d: Reg, base: Reg, offset: u64 },
    LoadIndI8 { d: Reg, base: Reg, offset: u64 },
    LoadIndU16 { d: Reg, base: Reg, offset: u64 },
    LoadIndI16 { d: Reg, base: Reg, offset: u64 },
    LoadIndU32 { d: Reg, base: Reg, offset: u64 },
    LoadIndI32 { d: Reg, base: Reg, offset: u64 },
    LoadIndU64 { d: Reg, base: Reg, offset: u64 },

    // Register-immediate arithmetic and logic
    AddImm32 { d: Reg, s: Reg, imm: u64 },
    AndImm { d: Reg, s: Reg, imm: u64 },
    XorImm { d: Reg, s: Reg, imm: u64 },
    OrImm { d: Reg, s: Reg, imm: u64 },
    MulImm32 { d: Reg, s: Reg, imm: u64 },
    SetLtUImm { d: Reg, s: Reg, imm: u64 },
    SetLtSImm { d: Reg, s: Reg, imm: u64 },
    ShloLImm32 { d: Reg, s: Reg, imm: u64 },
    ShloRImm32 { d: Reg, s: Reg, imm: u64 },
    SharRImm32 { d: Reg, s: Reg, imm: u64 },
    NegAddImm32 { d: Reg, s: Reg, imm: u64 },
    SetGtUImm { d: Reg, s: Reg, imm: u64 },
    SetGtSImm { d: Reg, s: Reg, imm: u64 },
    ShloLImmAlt32 { d: Reg, s: Reg, imm: u64 },
    ShloRImmAlt32 { d: Reg, s: Reg, imm: u64 },
    SharRImmAlt32 { d: Reg, s: Reg, imm: u64 },
    CmovIzImm { d: Reg, cond: Reg, imm: u64 },
    CmovNzImm { d: Reg, cond: Reg, imm: u64 },
    AddImm64 { d: Reg, s: Reg, imm: u64 },
    MulImm64 { d: Reg, s: Reg, imm: u64 },
    ShloLImm64 { d: Reg, s: Reg, imm: u64 },
    ShloRImm64 { d: Reg, s: Reg, imm: u64 },
    SharRImm64 { d: Reg, s: Reg, imm: u64 },
    NegAddImm64 { d: Reg, s: Reg, imm: u64 },
    ShloLImmAlt64 { d: Reg, s: Reg, imm: u64 },
    ShloRImmAlt64 { d: Reg, s: Reg, imm: u64 },
    SharRImmAlt64 { d: Reg, s: Reg, imm: u64 },
    RotR64Imm { d: Reg, s: Reg, imm: u64 },
    RotR64ImmAlt { d: Reg, s: Reg, imm: u64 },
    RotR32Imm { d: Reg, s: Reg, imm: u64 },
    RotR32ImmAlt { d: Reg, s: Reg, imm: u64 },

    // Branches comparing two registers
    BranchEq { a: Reg, b: Reg, offset: i32 },
    BranchNe { a: Reg, b: Reg, offset: i32 },
    BranchLtU { a: Reg, b: Reg, offset: i32 },
    BranchLtS { a: Reg, b: Reg, offset: i32 },
    BranchGeU { a: Reg, b: Reg, offset: i32 },
    BranchGeS { a: Reg, b: Reg, offset: i32 },

    // Three-register arithmetic and logic
    Add32 { d: Reg, a: Reg, b: Reg },
    Sub32 { d: Reg, a: Reg, b: Reg },
    Mul32 { d: Reg, a: Reg, b: Reg },
    DivU32 { d: Reg, a: Reg, b: Reg },
    DivS32 { d: Reg, a: Reg, b: Reg },
    RemU32 { d: Reg, a: Reg, b: Reg },
    RemS32 { d: Reg, a: Reg, b: Reg },
    ShloL32 { d: Reg, a: Reg, b: Reg },
    ShloR32 { d: Reg, a: Reg, b: Reg },
    SharR32 { d: Reg, a: Reg, b: Reg },
    Add64 { d: Reg, a: Reg, b: Reg },
    Sub64 { d: Reg, a: Reg, b: Reg },
    Mul64 { d: Reg, a: Reg, b: Reg },
    DivU64 { d: Reg, a: Reg, b: Reg },
    DivS64 { d: Reg, a: Reg, b: Reg },
    RemU64 { d: Reg, a: Reg, b: Reg },
    RemS64 { d: Reg, a: Reg, b: Reg },
    ShloL64 { d: Reg, a: Reg, b: Reg },
    ShloR64 { d: Reg, a: Reg, b: Reg },
    SharR64 { d: Reg, a: Reg, b: Reg },
    And { d: Reg, a: Reg, b: Reg },
    Xor { d: Reg, a: Reg, b: Reg },
    Or { d: Reg, a: Reg, b: Reg },
    MulUpperSS { d: Reg, a: Reg, b: Reg },
    MulUpperUU { d: Reg, a: Reg, b: Reg },
    MulUpperSU { d: Reg, a: Reg, b: Reg },
    SetLtU { d: Reg, a: Reg, b: Reg },
    SetLtS { d: Reg, a: Reg, b: Reg },
    CmovIz { d: Reg, s: Reg, cond: Reg },
    CmovNz { d: Reg, s: Reg, cond: Reg },
    RotL64 { d: Reg, a: Reg, b: Reg },
    RotL32 { d: Reg, a: Reg, b: Reg },
    RotR64 { d: Reg, a: Reg, b: Reg },
    RotR32 { d: Reg, a: Reg, b: Reg },
}

impl Operation {
    /// The opcode and decoded-form operand bundle this operation encodes to.
    pub(crate) fn parts(self) -> (Opcode, Args) {
        use Operation::*;
        match self {
            Trap => (Opcode::Trap, Args::NoArgs),
            Fallthrough => (Opcode::Fallthrough, Args::NoArgs),
            Ecalli { index } => (Opcode::Ecalli, Args::OneImm { imm: index }),

            StoreImmU8 { address, value } => (Opcode::StoreImmU8, two_imms(address, value)),
            StoreImmU16 { address, value } => (Opcode::StoreImmU16, two_imms(address, value)),
            StoreImmU32 { address, value } => (Opcode::StoreImmU32, two_imms(address, value)),
            StoreImmU64 { address, value } => (Opcode::StoreImmU64, two_imms(address, value)),

            Jump { offset } => (Opcode::Jump, Args::OneOff { offset }),
            JumpInd { base, offset } => (Opcode::JumpInd, reg_imm(base, offset)),
            LoadImmJump { reg, value, offset } => (
                Opcode::LoadImmJump,
                Args::OneRegOneImmOneOff { reg, imm: value, offset },
            ),
            LoadImmJumpInd { d, base, value, offset } => (
                Opcode::LoadImmJumpInd,
                Args::TwoRegsTwoImms { r1: d, r2: base, imm1: value, imm2: offset },
            ),

            LoadImm { reg, value } => (Opcode::LoadImm, reg_imm(reg, value)),
            LoadImm64 { reg, value } => {
                (Opcode::LoadImm64, Args::OneRegOneExtImm { reg, imm: value })
            }

            LoadU8 { d, address } => (Opcode::LoadU8, reg_imm(d, address)),
            LoadI8 { d, address } => (Opcode::LoadI8, reg_imm(d, address)),
            LoadU16 { d, address } => (Opcode::LoadU16, reg_imm(d, address)),
            LoadI16 { d, address } => (Opcode::LoadI16, reg_imm(d, address)),
            LoadU32 { d, address } => (Opcode::LoadU32, reg_imm(d, address)),
            LoadI32 { d, address } => (Opcode::LoadI32, reg_imm(d, address)),
            LoadU64 { d, address } => (Opcode::LoadU64, reg_imm(d, address)),

            StoreU8 { src, address } => (Opcode::StoreU8, reg_imm(src, address)),
            StoreU16 { src, address } => (Opcode::StoreU16, reg_imm(src, address)),
            StoreU32 { src, address } => (Opcode::StoreU32, reg_imm(src, address)),
            StoreU64 { src, address } => (Opcode::StoreU64, reg_imm(src, address)),

            StoreImmIndU8 { base, offset, value } => {
                (Opcode::StoreImmIndU8, reg_two_imms(base, offset, value))
            }
            StoreImmIndU16 { base, offset, value } => {
                (Opcode::StoreImmIndU16, reg_two_imms(base, offset, value))
            }
            StoreImmIndU32 { base, offset, value } => {
                (Opcode::StoreImmIndU32, reg_two_imms(base, offset, value))
            }
            StoreImmIndU64 { base, offset, value } => {
                (Opcode::StoreImmIndU64, reg_two_imms(base, offset, value))
            }

            BranchEqImm { a, imm, offset } => (Opcode::BranchEqImm, branch_imm(a, imm, offset)),
            BranchNeImm { a, imm, offset } => (Opcode::BranchNeImm, branch_imm(a, imm, offset)),
            BranchLtUImm { a, imm, offset } => (Opcode::BranchLtUImm, branch_imm(a, imm, offset)),
            BranchLeUImm { a, imm, offset } => (Opcode::BranchLeUImm, branch_imm(a, imm, offset)),
            BranchGeUImm { a, imm, offset } => (Opcode::BranchGeUImm, branch_imm(a, imm, offset)),
            BranchGtUImm { a, imm, offset } => (Opcode::BranchGtUImm, branch_imm(a, imm, offset)),
            BranchLtSImm { a, imm, offset } => (Opcode::BranchLtSImm, branch_imm(a, imm, offset)),
            BranchLeSImm { a, imm, offset } => (Opcode::BranchLeSImm, branch_imm(a, imm, offset)),
            BranchGeSImm { a, imm, offset } => (Opcode::BranchGeSImm, branch_imm(a, imm, offset)),
            BranchGtSImm { a, imm, offset } => (Opcode::BranchGtSImm, branch_imm(a, imm, offset)),

            MoveReg { d, s } => (Opcode::MoveReg, two_regs(d, s)),
            Sbrk { d, size } => (Opcode::Sbrk, two_regs(d, size)),
            CountSetBits64 { d, s } => (Opcode::CountSetBits64, two_regs(d, s)),
            CountSetBits32 { d, s } => (Opcode::CountSetBits32, two_regs(d, s)),
            LeadingZeroBits64 { d, s } => (Opcode::LeadingZeroBits64, two_regs(d, s)),
            LeadingZeroBits32 { d, s } => (Opcode::LeadingZeroBits32, two_regs(d, s)),
            TrailingZeroBits64 { d, s } => (Opcode::TrailingZeroBits64, two_regs(d, s)),
            TrailingZeroBits32 { d, s } => (Opcode::TrailingZeroBits32, two_regs(d, s)),
            SignExtend8 { d, s } => (Opcode::SignExtend8, two_regs(d, s)),
            SignExtend16 { d, s } => (Opcode::SignExtend16, two_regs(d, s)),
            ZeroExtend16 { d, s } => (Opcode::ZeroExtend16, two_regs(d, s)),
            ReverseBytes { d, s } => (Opcode::ReverseBytes, two_regs(d, s)),

            StoreIndU8 { src, base, offset } => (Opcode::StoreIndU8, regs_imm(src, base, offset)),
            StoreIndU16 { src, base, offset } => {
                (Opcode::StoreIndU16, regs_imm(src, base, offset))
            }
            StoreIndU32 { src, base, offset } => {
                (Opcode::StoreIndU32, regs_imm(src, base, offset))
            }
            StoreIndU64 { src, base, offset } => {
                (Opcode::StoreIndU64, regs_imm(src, base, offset))
            }
            LoadIndU8 { d, base, offset } => (Opcode::LoadIndU8, regs_imm(d, base, offset)),
            LoadIndI8 { d, base, offset } => (Opcode::LoadIndI8, regs_imm(d, base, offset)),
            LoadIndU16 { d, base, offset } => (Opcode::LoadIndU16, regs_imm(d, base, offset)),
            LoadIndI16 { d, base, offset } => (Opcode::LoadIndI16, regs_imm(d, base, offset)),
            LoadIndU32 { d, base, offset } => (Opcode::LoadIndU32, regs_imm(d, base, offset)),
            LoadIndI32 { d, base, offset } => (Opcode::LoadIndI32, regs_imm(d, base, offset)),
            LoadIndU64 { d, base, offset } => (Opcode::LoadIndU64, regs_imm(d, base, offset)),

            AddImm32 { d, s, imm } => (Opcode::AddImm32, regs_imm(d, s, imm)),
            AndImm { d, s, imm } => (Opcode::AndImm, regs_imm(d, s, imm)),
            XorImm { d, s, imm } => (Opcode::XorImm, regs_imm(d, s, imm)),
            OrImm { d, s, imm } => (Opcode::OrImm, regs_imm(d, s, imm)),
            MulImm32 { d, s, imm } => (Opcode::MulImm32, regs_imm(d, s, imm)),
            SetLtUImm { d, s, imm } => (Opcode::SetLtUImm, regs_imm(d, s, imm)),
            SetLtSImm { d, s, imm } => (Opcode::SetLtSImm, regs_imm(d, s, imm)),
            ShloLImm32 { d, s, imm } => (Opcode::ShloLImm32, regs_imm(d, s, imm)),
            ShloRImm32 { d, s, imm } => (Opcode::ShloRImm32, regs_imm(d, s, imm)),
            SharRImm32 { d, s, imm } => (Opcode::SharRImm32, regs_imm(d, s, imm)),
            NegAddImm32 { d, s, imm } => (Opcode::NegAddImm32, regs_imm(d, s, imm)),
            SetGtUImm { d, s, imm } => (Opcode::SetGtUImm, regs_imm(d, s, imm)),
            SetGtSImm { d, s, imm } => (Opcode::SetGtSImm, regs_imm(d, s, imm)),
            ShloLImmAlt32 { d, s, imm } => (Opcode::ShloLImmAlt32, regs_imm(d, s, imm)),
            ShloRImmAlt32 { d, s, imm } => (Opcode::ShloRImmAlt32, regs_imm(d, s, imm)),
            SharRImmAlt32 { d, s, imm } => (Opcode::SharRImmAlt32, regs_imm(d, s, imm)),
            CmovIzImm { d, cond, imm } => (Opcode::CmovIzImm, regs_imm(d, cond, imm)),
            CmovNzImm { d, cond, imm } => (Opcode::CmovNzImm, regs_imm(d, cond, imm)),
            AddImm64 { d, s, imm } => (Opcode::AddImm64, regs_imm(d, s, imm)),
            MulImm64 { d, s, imm } => (Opcode::MulImm64, regs_imm(d, s, imm)),
            ShloLImm64 { d, s, imm } => (Opcode::ShloLImm64, regs_imm(d, s, imm)),
            ShloRImm64 { d, s, imm } => (Opcode::ShloRImm64, regs_imm(d, s, imm)),
            SharRImm64 { d, s, imm } => (Opcode::SharRImm64, regs_imm(d, s, imm)),
            NegAddImm64 { d, s, imm } => (Opcode::NegAddImm64, regs_imm(d, s, imm)),
            ShloLImmAlt64 { d, s, imm } => (Opcode::ShloLImmAlt64, regs_imm(d, s, imm)),
            ShloRImmAlt64 { d, s, imm } => (Opcode::ShloRImmAlt64, regs_imm(d, s, imm)),
            SharRImmAlt64 { d, s, imm } => (Opcode::SharRImmAlt64, regs_imm(d, s, imm)),
            RotR64Imm { d, s, imm } => (Opcode::RotR64Imm, regs_imm(d, s, imm)),
            RotR64ImmAlt { d, s, imm } => (Opcode::RotR64ImmAlt, regs_imm(d, s, imm)),
            RotR32Imm { d, s, imm } => (Opcode::RotR32Imm, regs_imm(d, s, imm)),
            RotR32ImmAlt { d, s, imm } => (Opcode::RotR32ImmAlt, regs_imm(d, s, imm)),

            BranchEq { a, b, offset } => (Opcode::BranchEq, branch(a, b, offset)),
            BranchNe { a, b, offset } => (Opcode::BranchNe, branch(a, b, offset)),
            BranchLtU { a, b, offset } => (Opcode::BranchLtU, branch(a, b, offset)),
            BranchLtS { a, b, offset } => (Opcode::BranchLtS, branch(a, b, offset)),
            BranchGeU { a, b, offset } => (Opcode::BranchGeU, branch(a, b, offset)),
            BranchGeS { a, b, offset } => (Opcode::BranchGeS, branch(a, b, offset)),

            Add32 { d, a, b } => (Opcode::Add32, three_regs(d, a, b)),
            Sub32 { d, a, b } => (Opcode::Sub32, three_regs(d, a, b)),
            Mul32 { d, a, b } => (Opcode::Mul32, three_regs(d, a, b)),
            DivU32 { d, a, b } => (Opcode::DivU32, three_regs(d, a, b)),
            DivS32 { d, a, b } => (Opcode::DivS32, three_regs(d, a, b)),
            RemU32 { d, a, b } => (Opcode::RemU32, three_regs(d, a, b)),
            RemS32 { d, a, b } => (Opcode::RemS32, three_regs(d, a, b)),
            ShloL32 { d, a, b } => (Opcode::ShloL32, three_regs(d, a, b)),
            ShloR32 { d, a, b } => (Opcode::ShloR32, three_regs(d, a, b)),
            SharR32 { d, a, b } => (Opcode::SharR32, three_regs(d, a, b)),
            Add64 { d, a, b } => (Opcode::Add64, three_regs(d, a, b)),
            Sub64 { d, a, b } => (Opcode::Sub64, three_regs(d, a, b)),
            Mul64 { d, a, b } => (Opcode::Mul64, three_regs(d, a, b)),
            DivU64 { d, a, b } => (Opcode::DivU64, three_regs(d, a, b)),
            DivS64 { d, a, b } => (Opcode::DivS64, three_regs(d, a, b)),
            RemU64 { d, a, b } => (Opcode::RemU64, three_regs(d, a, b)),
            RemS64 { d, a, b } => (Opcode::RemS64, three_regs(d, a, b)),
            ShloL64 { d, a, b } => (Opcode::ShloL64, three_regs(d, a, b)),
            ShloR64 { d, a, b } => (Opcode::ShloR64, three_regs(d, a, b)),
            SharR64 { d, a, b } => (Opcode::SharR64, three_regs(d, a, b)),
            And { d, a, b } => (Opcode::And, three_regs(d, a, b)),
            Xor { d, a, b } => (Opcode::Xor, three_regs(d, a, b)),
            Or { d, a, b } => (Opcode::Or, three_regs(d, a, b)),
            MulUpperSS { d, a, b } => (Opcode::MulUpperSS, three_regs(d, a, b)),
            MulUpperUU { d, a, b } => (Opcode::MulUpperUU, three_regs(d, a, b)),
            MulUpperSU { d, a, b } => (Opcode::MulUpperSU, three_regs(d, a, b)),
            SetLtU { d, a, b } => (Opcode::SetLtU, three_regs(d, a, b)),
            SetLtS { d, a, b } => (Opcode::SetLtS, three_regs(d, a, b)),
            CmovIz { d, s, cond } => (Opcode::CmovIz, three_regs(d, s, cond)),
            CmovNz { d, s, cond } => (Opcode::CmovNz, three_regs(d, s, cond)),
            RotL64 { d, a, b } => (Opcode::RotL64, three_regs(d, a, b)),
            RotL32 { d, a, b } => (Opcode::RotL32, three_regs(d, a, b)),
            RotR64 { d, a, b } => (Opcode::RotR64, three_regs(d, a, b)),
            RotR32 { d, a, b } => (Opcode::RotR32, three_regs(d, a, b)),
        }
    }
}

fn two_imms(imm1: u64, imm2: u64) -> Args {
    Args::TwoImms { imm1, imm2 }
}

fn reg_imm(reg: Reg, imm: u64) -> Args {
    Args::OneRegOneImm { reg, imm }
}

fn reg_two_imms(reg: Reg, imm1: u64, imm2: u64) -> Args {
    Args::OneRegTwoImms { reg, imm1, imm2 }
}

fn branch_imm(reg: Reg, imm: u64, offset: i32) -> Args {
    Args::OneRegOneImmOneOff { reg, imm, offset }
}

fn two_regs(r1: Reg, r2: Reg) -> Args {
    Args::TwoRegs { r1, r2 }
}

fn regs_imm(r1: Reg, r2: Reg, imm: u64) -> Args {
    Args::TwoRegsOneImm { r1, r2, imm }
}

fn branch(r1: Reg, r2: Reg, offset: i32) -> Args {
    Args::TwoRegsOneOff { r1, r2, offset }
}

fn three_regs(d: Reg, a: Reg, b: Reg) -> Args {
    Args::ThreeRegs { r1: a, r2: b, r3: d }
}

/// Container pieces around the code blob. The default is empty data
/// segments, no heap or stack, and no jump table.
#[derive(Debug, Clone, Default)]
pub struct ProgramLayout {
    pub ro_data: Vec<u8>,
    pub rw_data: Vec<u8>,
    pub heap_pages: u16,
    pub stack_size: u32,
    pub jump_table: Vec<u32>,
}

/// Encodes operations into a complete program container with default layout.
pub fn encode_program(operations: &[Operation]) -> Vec<u8> {
    encode_program_with(operations, &ProgramLayout::default())
}

/// Encodes operations and layout into a complete program container: header,
/// data blobs, jump table, code and its boundary mask.
pub fn encode_program_with(operations: &[Operation], layout: &ProgramLayout) -> Vec<u8> {
    let mut code = Vec::new();
    let mut starts = Vec::new();
    for operation in operations {
        starts.push(code.len());
        let (opcode, args) = operation.parts();
        code.push(opcode as u8);
        code.extend_from_slice(&encode_args(&args));
    }
    let mut mask = vec![0u8; code.len().div_ceil(8)];
    for start in starts {
        mask[start / 8] |= 1 << (start % 8);
    }

    let entry_size = match layout.jump_table.iter().max().copied() {
        None => 0u8,
        Some(0) => 1,
        Some(max) => ((32 - max.leading_zeros() as usize).div_ceil(8)) as u8,
    };

    let mut bytes = Vec::new();
    bytes.extend_from_slice(&(layout.ro_data.len() as u32).to_le_bytes());
    bytes.extend_from_slice(&(layout.rw_data.len() as u32).to_le_bytes());
    bytes.extend_from_slice(&layout.heap_pages.to_le_bytes());
    bytes.extend_from_slice(&layout.stack_size.to_le_bytes());
    bytes.extend_from_slice(&layout.ro_data);
    bytes.extend_from_slice(&layout.rw_data);
    push_varint(&mut bytes, layout.jump_table.len() as u32);
    bytes.push(entry_size);
    for entry in &layout.jump_table {
        bytes.extend_from_slice(&entry.to_le_bytes()[..entry_size as usize]);
    }
    push_varint(&mut bytes, code.len() as u32);
    bytes.extend_from_slice(&code);
    bytes.extend_from_slice(&mask);
    bytes
}

/// Inverse of the operand decoder: shortest encoding that decodes back to
/// the same bundle.
fn encode_args(args: &Args) -> Vec<u8> {
    match args {
        Args::NoArgs => Vec::new(),
        Args::OneImm { imm } => imm_bytes(*imm),
        Args::TwoImms { imm1, imm2 } => {
            let first = imm_bytes(*imm1);
            let mut bytes = vec![first.len() as u8];
            bytes.extend_from_slice(&first);
            bytes.extend_from_slice(&imm_bytes(*imm2));
            bytes
        }
        Args::OneOff { offset } => offset_bytes(*offset),
        Args::OneRegOneImm { reg, imm } => {
            let mut bytes = vec![reg.index() as u8];
            bytes.extend_from_slice(&imm_bytes(*imm));
            bytes
        }
        Args::OneRegOneExtImm { reg, imm } => {
            let mut bytes = vec![reg.index() as u8];
            bytes.extend_from_slice(&imm.to_le_bytes());
            bytes
        }
        Args::OneRegTwoImms { reg, imm1, imm2 } => {
            let first = imm_bytes(*imm1);
            let mut bytes = vec![reg.index() as u8 | (first.len() as u8) << 4];
            bytes.extend_from_slice(&first);
            bytes.extend_from_slice(&imm_bytes(*imm2));
            bytes
        }
        Args::OneRegOneImmOneOff { reg, imm, offset } => {
            let first = imm_bytes(*imm);
            let mut bytes = vec![reg.index() as u8 | (first.len() as u8) << 4];
            bytes.extend_from_slice(&first);
            bytes.extend_from_slice(&offset_bytes(*offset));
            bytes
        }
        Args::TwoRegs { r1, r2 } => vec![pack_regs(*r1, *r2)],
        Args::TwoRegsOneImm { r1, r2, imm } => {
            let mut bytes = vec![pack_regs(*r1, *r2)];
            bytes.extend_from_slice(&imm_bytes(*imm));
            bytes
        }
        Args::TwoRegsOneOff { r1, r2, offset } => {
            let mut bytes = vec![pack_regs(*r1, *r2)];
            bytes.extend_from_slice(&offset_bytes(*offset));
            bytes
        }
        Args::TwoRegsTwoImms { r1, r2, imm1, imm2 } => {
            let first = imm_bytes(*imm1);
            let mut bytes = vec![pack_regs(*r1, *r2), first.len() as u8];
            bytes.extend_from_slice(&first);
            bytes.extend_from_slice(&imm_bytes(*imm2));
            bytes
        }
        Args::ThreeRegs { r1, r2, r3 } => vec![pack_regs(*r1, *r2), r3.index() as u8],
    }
}

fn pack_regs(r1: Reg, r2: Reg) -> u8 {
    (r1.index() | r2.index() << 4) as u8
}

/// Shortest little-endian suffix whose sign extension is `value`, up to
/// four bytes. Wider values truncate.
fn imm_bytes(value: u64) -> Vec<u8> {
    let bytes = value.to_le_bytes();
    (0..=4)
        .find(|len| sext(&bytes[..*len]) == value)
        .map_or_else(|| bytes[..4].to_vec(), |len| bytes[..len].to_vec())
}

fn offset_bytes(offset: i32) -> Vec<u8> {
    imm_bytes(offset as i64 as u64)
}

fn push_varint(out: &mut Vec<u8>, mut value: u32) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{instructions::decode_args, program::Program};

    fn r(nibble: u8) -> Reg {
        Reg::from_nibble(nibble)
    }

    /// One operation per operand arity class.
    fn one_of_each_arity() -> Vec<Operation> {
        vec![
            Operation::Trap,
            Operation::Ecalli { index: 3 },
            Operation::StoreImmU32 { address: 0x2_0000, value: 0xabcd },
            Operation::Jump { offset: -7 },
            Operation::LoadImm { reg: r(5), value: u64::MAX },
            Operation::LoadImm64 { reg: r(6), value: 0xdead_beef_dead_beef },
            Operation::StoreImmIndU16 { base: r(2), offset: 8, value: 0x1234 },
            Operation::BranchLtSImm { a: r(3), imm: u64::MAX, offset: 100 },
            Operation::MoveReg { d: r(1), s: r(12) },
            Operation::AddImm64 { d: r(7), s: r(8), imm: 0x7fff_ffff },
            Operation::BranchNe { a: r(9), b: r(10), offset: -128 },
            Operation::LoadImmJumpInd { d: r(4), base: r(11), value: 1, offset: 2 },
            Operation::Add64 { d: r(0), a: r(1), b: r(2) },
        ]
    }

    #[test]
    fn every_arity_class_round_trips() {
        let operations = one_of_each_arity();
        let program = Program::parse(&encode_program(&operations)).unwrap();

        let mut pc = 0u32;
        for operation in operations {
            let (opcode, args) = operation.parts();
            assert!(program.is_boundary(pc), "boundary lost at pc {pc}");
            assert_eq!(program.code()[pc as usize], opcode as u8);

            let skip = program.skip(pc);
            let start = pc as usize + 1;
            let operands = &program.code()[start..start + skip as usize];
            assert_eq!(decode_args(opcode.args_kind(), operands), args, "{opcode:?}");

            pc += 1 + skip;
        }
        assert_eq!(pc as usize, program.code().len());
    }

    #[test]
    fn layout_fields_land_in_the_container() {
        let layout = ProgramLayout {
            ro_data: vec![1, 2, 3],
            rw_data: vec![4, 5],
            heap_pages: 7,
            stack_size: 0x8000,
            jump_table: vec![0, 4],
        };
        let program =
            Program::parse(&encode_program_with(&[Operation::Trap], &layout)).unwrap();
        assert_eq!(program.ro_data().as_ref(), &[1, 2, 3]);
        assert_eq!(program.rw_data().as_ref(), &[4, 5]);
        assert_eq!(program.heap_pages(), 7);
        assert_eq!(program.stack_size(), 0x8000);
        assert_eq!(program.jump_table_get(0), Some(0));
        assert_eq!(program.jump_table_get(1), Some(4));
    }

    #[test]
    fn immediates_use_the_shortest_encoding() {
        assert_eq!(imm_bytes(0), Vec::<u8>::new());
        assert_eq!(imm_bytes(1), vec![1]);
        assert_eq!(imm_bytes(u64::MAX), vec![0xff]);
        assert_eq!(imm_bytes(128), vec![0x80, 0x00]);
        assert_eq!(imm_bytes(0x7fff_ffff), vec![0xff, 0xff, 0xff, 0x7f]);
    }
}
