/// Operand layout of an opcode. Decode produces one tagged bundle per kind;
/// dispatch never sees a loosely-typed argument list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgsKind {
    NoArgs,
    OneImm,
    TwoImms,
    OneOff,
    OneRegOneImm,
    OneRegOneExtImm,
    OneRegTwoImms,
    OneRegOneImmOneOff,
    TwoRegs,
    TwoRegsOneImm,
    TwoRegsOneOff,
    TwoRegsTwoImms,
    ThreeRegs,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, PartialOrd, Hash)]
pub enum Opcode {
    // System
    Trap = 0,
    Fallthrough = 1,

    // Host call
    Ecalli = 10,

    // Stores of immediate data at absolute addresses
    StoreImmU8 = 20,
    StoreImmU16 = 21,
    StoreImmU32 = 22,
    StoreImmU64 = 23,

    // Static jump
    Jump = 30,

    // One register, one immediate
    JumpInd = 40,
    LoadImm = 41,
    LoadU8 = 42,
    LoadI8 = 43,
    LoadU16 = 44,
    LoadI16 = 45,
    LoadU32 = 46,
    LoadI32 = 47,
    LoadU64 = 48,
    StoreU8 = 49,
    StoreU16 = 50,
    StoreU32 = 51,
    StoreU64 = 52,

    // Full-width immediate
    LoadImm64 = 60,

    // Stores of immediate data at register-relative addresses
    StoreImmIndU8 = 70,
    StoreImmIndU16 = 71,
    StoreImmIndU32 = 72,
    StoreImmIndU64 = 73,

    // One register, one immediate, one branch offset
    LoadImmJump = 80,
    BranchEqImm = 81,
    BranchNeImm = 82,
    BranchLtUImm = 83,
    BranchLeUImm = 84,
    BranchGeUImm = 85,
    BranchGtUImm = 86,
    BranchLtSImm = 87,
    BranchLeSImm = 88,
    BranchGeSImm = 89,
    BranchGtSImm = 90,

    // Two registers
    MoveReg = 100,
    Sbrk = 101,
    CountSetBits64 = 102,
    CountSetBits32 = 103,
    LeadingZeroBits64 = 104,
    LeadingZeroBits32 = 105,
    TrailingZeroBits64 = 106,
    TrailingZeroBits32 = 107,
    SignExtend8 = 108,
    SignExtend16 = 109,
    ZeroExtend16 = 110,
    ReverseBytes = 111,

    // Two registers, one immediate
    StoreIndU8 = 120,
    StoreIndU16 = 121,
    StoreIndU32 = 122,
    StoreIndU64 = 123,
    LoadIndU8 = 124,
    LoadIndI8 = 125,
    LoadIndU16 = 126,
    LoadIndI16 = 127,
    LoadIndU32 = 128,
    LoadIndI32 = 129,
    LoadIndU64 = 130,
    AddImm32 = 131,
    AndImm = 132,
    XorImm = 133,
    OrImm = 134,
    MulImm32 = 135,
    SetLtUImm = 136,
    SetLtSImm = 137,
    ShloLImm32 = 138,
    ShloRImm32 = 139,
    SharRImm32 = 140,
    NegAddImm32 = 141,
    SetGtUImm = 142,
    SetGtSImm = 143,
    ShloLImmAlt32 = 144,
    ShloRImmAlt32 = 145,
    SharRImmAlt32 = 146,
    CmovIzImm = 147,
    CmovNzImm = 148,
    AddImm64 = 149,
    MulImm64 = 150,
    ShloLImm64 = 151,
    ShloRImm64 = 152,
    SharRImm64 = 153,
    NegAddImm64 = 154,
    ShloLImmAlt64 = 155,
    ShloRImmAlt64 = 156,
    SharRImmAlt64 = 157,
    RotR64Imm = 158,
    RotR64ImmAlt = 159,
    RotR32Imm = 160,
    RotR32ImmAlt = 161,

    // Two registers, one branch offset
    BranchEq = 170,
    BranchNe = 171,
    BranchLtU = 172,
    BranchLtS = 173,
    BranchGeU = 174,
    BranchGeS = 175,

    // Two registers, two immediates
    LoadImmJumpInd = 180,

    // Three registers
    Add32 = 190,
    Sub32 = 191,
    Mul32 = 192,
    DivU32 = 193,
    DivS32 = 194,
    RemU32 = 195,
    RemS32 = 196,
    ShloL32 = 197,
    ShloR32 = 198,
    SharR32 = 199,
    Add64 = 200,
    Sub64 = 201,
    Mul64 = 202,
    DivU64 = 203,
    DivS64 = 204,
    RemU64 = 205,
    RemS64 = 206,
    ShloL64 = 207,
    ShloR64 = 208,
    SharR64 = 209,
    And = 210,
    Xor = 211,
    Or = 212,
    MulUpperSS = 213,
    MulUpperUU = 214,
    MulUpperSU = 215,
    SetLtU = 216,
    SetLtS = 217,
    CmovIz = 218,
    CmovNz = 219,
    RotL64 = 220,
    RotL32 = 221,
    RotR64 = 222,
    RotR32 = 223,
}

impl Opcode {
    pub const fn args_kind(self) -> ArgsKind {
        use Opcode::*;
        match self {
            Trap | Fallthrough => ArgsKind::NoArgs,
            Ecalli => ArgsKind::OneImm,
            StoreImmU8 | StoreImmU16 | StoreImmU32 | StoreImmU64 => ArgsKind::TwoImms,
            Jump => ArgsKind::OneOff,
            JumpInd | LoadImm | LoadU8 | LoadI8 | LoadU16 | LoadI16 | LoadU32 | LoadI32
            | LoadU64 | StoreU8 | StoreU16 | StoreU32 | StoreU64 => ArgsKind::OneRegOneImm,
            LoadImm64 => ArgsKind::OneRegOneExtImm,
            StoreImmIndU8 | StoreImmIndU16 | StoreImmIndU32 | StoreImmIndU64 => {
                ArgsKind::OneRegTwoImms
            }
            LoadImmJump | BranchEqImm | BranchNeImm | BranchLtUImm | BranchLeUImm
            | BranchGeUImm | BranchGtUImm | BranchLtSImm | BranchLeSImm | BranchGeSImm
            | BranchGtSImm => ArgsKind::OneRegOneImmOneOff,
            MoveReg | Sbrk | CountSetBits64 | CountSetBits32 | LeadingZeroBits64
            | LeadingZeroBits32 | TrailingZeroBits64 | TrailingZeroBits32 | SignExtend8
            | SignExtend16 | ZeroExtend16 | ReverseBytes => ArgsKind::TwoRegs,
            StoreIndU8 | StoreIndU16 | StoreIndU32 | StoreIndU64 | LoadIndU8 | LoadIndI8
            | LoadIndU16 | LoadIndI16 | LoadIndU32 | LoadIndI32 | LoadIndU64 | AddImm32
            | AndImm | XorImm | OrImm | MulImm32 | SetLtUImm | SetLtSImm | ShloLImm32
            | ShloRImm32 | SharRImm32 | NegAddImm32 | SetGtUImm | SetGtSImm | ShloLImmAlt32
            | ShloRImmAlt32 | SharRImmAlt32 | CmovIzImm | CmovNzImm | AddImm64 | MulImm64
            | ShloLImm64 | ShloRImm64 | SharRImm64 | NegAddImm64 | ShloLImmAlt64
            | ShloRImmAlt64 | SharRImmAlt64 | RotR64Imm | RotR64ImmAlt | RotR32Imm
            | RotR32ImmAlt => ArgsKind::TwoRegsOneImm,
            BranchEq | BranchNe | BranchLtU | BranchLtS | BranchGeU | BranchGeS => {
                ArgsKind::TwoRegsOneOff
            }
            LoadImmJumpInd => ArgsKind::TwoRegsTwoImms,
            Add32 | Sub32 | Mul32 | DivU32 | DivS32 | RemU32 | RemS32 | ShloL32 | ShloR32
            | SharR32 | Add64 | Sub64 | Mul64 | DivU64 | DivS64 | RemU64 | RemS64 | ShloL64
            | ShloR64 | SharR64 | And | Xor | Or | MulUpperSS | MulUpperUU | MulUpperSU
            | SetLtU | SetLtS | CmovIz | CmovNz | RotL64 | RotL32 | RotR64 | RotR32 => {
                ArgsKind::ThreeRegs
            }
        }
    }

    /// Looks an opcode up by its instruction byte. `None` means the byte is
    /// not part of the instruction set; the interpreter panics the guest on
    /// those instead of skipping them.
    pub fn from_byte(byte: u8) -> Option<Opcode> {
        OPCODE_TABLE[byte as usize]
    }
}

const ALL_OPCODES: [Opcode; 132] = {
    use Opcode::*;
    [
        Trap,
        Fallthrough,
        Ecalli,
        StoreImmU8,
        StoreImmU16,
        StoreImmU32,
        StoreImmU64,
        Jump,
        JumpInd,
        LoadImm,
        LoadU8,
        LoadI8,
        LoadU16,
        LoadI16,
        LoadU32,
        LoadI32,
        LoadU64,
        StoreU8,
        StoreU16,
        StoreU32,
        StoreU64,
        LoadImm64,
        StoreImmIndU8,
        StoreImmIndU16,
        StoreImmIndU32,
        StoreImmIndU64,
        LoadImmJump,
        BranchEqImm,
        BranchNeImm,
        BranchLtUImm,
        BranchLeUImm,
        BranchGeUImm,
        BranchGtUImm,
        BranchLtSImm,
        BranchLeSImm,
        BranchGeSImm,
        BranchGtSImm,
        MoveReg,
        Sbrk,
        CountSetBits64,
        CountSetBits32,
        LeadingZeroBits64,
        LeadingZeroBits32,
        TrailingZeroBits64,
        TrailingZeroBits32,
        SignExtend8,
        SignExtend16,
        ZeroExtend16,
        ReverseBytes,
        StoreIndU8,
        StoreIndU16,
        StoreIndU32,
        StoreIndU64,
        LoadIndU8,
        LoadIndI8,
        LoadIndU16,
        LoadIndI16,
        LoadIndU32,
        LoadIndI32,
        LoadIndU64,
        AddImm32,
        AndImm,
        XorImm,
        OrImm,
        MulImm32,
        SetLtUImm,
        SetLtSImm,
        ShloLImm32,
        ShloRImm32,
        SharRImm32,
        NegAddImm32,
        SetGtUImm,
        SetGtSImm,
        ShloLImmAlt32,
        ShloRImmAlt32,
        SharRImmAlt32,
        CmovIzImm,
        CmovNzImm,
        AddImm64,
        MulImm64,
        ShloLImm64,
        ShloRImm64,
        SharRImm64,
        NegAddImm64,
        ShloLImmAlt64,
        ShloRImmAlt64,
        SharRImmAlt64,
        RotR64Imm,
        RotR64ImmAlt,
        RotR32Imm,
        RotR32ImmAlt,
        BranchEq,
        BranchNe,
        BranchLtU,
        BranchLtS,
        BranchGeU,
        BranchGeS,
        LoadImmJumpInd,
        Add32,
        Sub32,
        Mul32,
        DivU32,
        DivS32,
        RemU32,
        RemS32,
        ShloL32,
        ShloR32,
        SharR32,
        Add64,
        Sub64,
        Mul64,
        DivU64,
        DivS64,
        RemU64,
        RemS64,
        ShloL64,
        ShloR64,
        SharR64,
        And,
        Xor,
        Or,
        MulUpperSS,
        MulUpperUU,
        MulUpperSU,
        SetLtU,
        SetLtS,
        CmovIz,
        CmovNz,
        RotL64,
        RotL32,
        RotR64,
        RotR32,
    ]
};

const OPCODE_TABLE: [Option<Opcode>; 256] = {
    let mut table = [None; 256];
    let mut index = 0;
    while index < ALL_OPCODES.len() {
        let opcode = ALL_OPCODES[index];
        table[opcode as usize] = Some(opcode);
        index += 1;
    }
    table
};
