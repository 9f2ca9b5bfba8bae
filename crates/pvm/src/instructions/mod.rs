pub mod arithmetic;
pub mod bitwise;
pub mod boolean;
pub mod branch;
pub mod jump;
pub mod memory;
pub mod moves;
pub mod rotate;
pub mod shift;
pub mod system;

use crate::{
    errors::PageFault,
    opcodes::{ArgsKind, Opcode},
    registers::Reg,
    vm::{OpcodeResult, Vm},
};

/// Decoded operand bundle of one instruction. One variant per arity class;
/// register nibbles are clamped at decode, immediates are little-endian and
/// sign-extended, offsets are relative to the instruction's own pc.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Args {
    NoArgs,
    OneImm { imm: u64 },
    TwoImms { imm1: u64, imm2: u64 },
    OneOff { offset: i32 },
    OneRegOneImm { reg: Reg, imm: u64 },
    OneRegOneExtImm { reg: Reg, imm: u64 },
    OneRegTwoImms { reg: Reg, imm1: u64, imm2: u64 },
    OneRegOneImmOneOff { reg: Reg, imm: u64, offset: i32 },
    TwoRegs { r1: Reg, r2: Reg },
    TwoRegsOneImm { r1: Reg, r2: Reg, imm: u64 },
    TwoRegsOneOff { r1: Reg, r2: Reg, offset: i32 },
    TwoRegsTwoImms { r1: Reg, r2: Reg, imm1: u64, imm2: u64 },
    ThreeRegs { r1: Reg, r2: Reg, r3: Reg },
}

/// Decodes the operand bytes of an instruction. Total: operand bytes beyond
/// the clamp are ignored and missing bytes decode as zero, exactly like the
/// length-clamping rules of the instruction coding.
pub fn decode_args(kind: ArgsKind, operands: &[u8]) -> Args {
    match kind {
        ArgsKind::NoArgs => Args::NoArgs,
        ArgsKind::OneImm => Args::OneImm {
            imm: sext(clamp4(operands)),
        },
        ArgsKind::TwoImms => {
            let (imm1, imm2) = two_imms(first_imm_len(operands, 0), rest(operands));
            Args::TwoImms { imm1, imm2 }
        }
        ArgsKind::OneOff => Args::OneOff {
            offset: offset(operands),
        },
        ArgsKind::OneRegOneImm => Args::OneRegOneImm {
            reg: low_reg(operands),
            imm: sext(clamp4(rest(operands))),
        },
        ArgsKind::OneRegOneExtImm => Args::OneRegOneExtImm {
            reg: low_reg(operands),
            imm: zext(rest(operands)),
        },
        ArgsKind::OneRegTwoImms => {
            let (imm1, imm2) = two_imms(first_imm_len(operands, 4), rest(operands));
            Args::OneRegTwoImms {
                reg: low_reg(operands),
                imm1,
                imm2,
            }
        }
        ArgsKind::OneRegOneImmOneOff => {
            let len = first_imm_len(operands, 4);
            let tail = rest(operands);
            let take = len.min(tail.len());
            Args::OneRegOneImmOneOff {
                reg: low_reg(operands),
                imm: sext(&tail[..take]),
                offset: offset(&tail[take..]),
            }
        }
        ArgsKind::TwoRegs => Args::TwoRegs {
            r1: low_reg(operands),
            r2: high_reg(operands),
        },
        ArgsKind::TwoRegsOneImm => Args::TwoRegsOneImm {
            r1: low_reg(operands),
            r2: high_reg(operands),
            imm: sext(clamp4(rest(operands))),
        },
        ArgsKind::TwoRegsOneOff => Args::TwoRegsOneOff {
            r1: low_reg(operands),
            r2: high_reg(operands),
            offset: offset(rest(operands)),
        },
        ArgsKind::TwoRegsTwoImms => {
            let len = operands
                .get(1)
                .map_or(0, |byte| ((byte & 7) as usize).min(4));
            let (imm1, imm2) = two_imms(len, operands.get(2..).unwrap_or(&[]));
            Args::TwoRegsTwoImms {
                r1: low_reg(operands),
                r2: high_reg(operands),
                imm1,
                imm2,
            }
        }
        ArgsKind::ThreeRegs => Args::ThreeRegs {
            r1: low_reg(operands),
            r2: high_reg(operands),
            r3: Reg::from_nibble(operands.get(1).copied().unwrap_or(0) & 0xf),
        },
    }
}

/// Routes a decoded instruction to its operation group. The bundle shape is
/// produced from the opcode's own arity class, so a mismatch can only mean a
/// corrupted dispatcher; those bytes panic the guest like unknown opcodes do.
pub fn dispatch(vm: &mut Vm, opcode: Opcode, args: Args) -> Result<OpcodeResult, PageFault> {
    match args {
        Args::NoArgs => Ok(match opcode {
            Opcode::Trap => vm.op_trap(),
            Opcode::Fallthrough => vm.op_fallthrough(),
            _ => vm.invalid_instruction(),
        }),
        Args::OneImm { imm } => Ok(match opcode {
            Opcode::Ecalli => vm.op_ecalli(imm),
            _ => vm.invalid_instruction(),
        }),
        Args::TwoImms { imm1, imm2 } => {
            match opcode {
                Opcode::StoreImmU8 => vm.op_store_imm_u8(imm1, imm2)?,
                Opcode::StoreImmU16 => vm.op_store_imm_u16(imm1, imm2)?,
                Opcode::StoreImmU32 => vm.op_store_imm_u32(imm1, imm2)?,
                Opcode::StoreImmU64 => vm.op_store_imm_u64(imm1, imm2)?,
                _ => return Ok(vm.invalid_instruction()),
            }
            Ok(OpcodeResult::Continue)
        }
        Args::OneOff { offset } => Ok(match opcode {
            Opcode::Jump => vm.op_jump(offset),
            _ => vm.invalid_instruction(),
        }),
        Args::OneRegOneImm { reg, imm } => {
            match opcode {
                Opcode::JumpInd => return Ok(vm.op_jump_ind(reg, imm)),
                Opcode::LoadImm => vm.op_load_imm(reg, imm),
                Opcode::LoadU8 => vm.op_load_u8(reg, imm)?,
                Opcode::LoadI8 => vm.op_load_i8(reg, imm)?,
                Opcode::LoadU16 => vm.op_load_u16(reg, imm)?,
                Opcode::LoadI16 => vm.op_load_i16(reg, imm)?,
                Opcode::LoadU32 => vm.op_load_u32(reg, imm)?,
                Opcode::LoadI32 => vm.op_load_i32(reg, imm)?,
                Opcode::LoadU64 => vm.op_load_u64(reg, imm)?,
                Opcode::StoreU8 => vm.op_store_u8(reg, imm)?,
                Opcode::StoreU16 => vm.op_store_u16(reg, imm)?,
                Opcode::StoreU32 => vm.op_store_u32(reg, imm)?,
                Opcode::StoreU64 => vm.op_store_u64(reg, imm)?,
                _ => return Ok(vm.invalid_instruction()),
            }
            Ok(OpcodeResult::Continue)
        }
        Args::OneRegOneExtImm { reg, imm } => {
            match opcode {
                Opcode::LoadImm64 => vm.op_load_imm_64(reg, imm),
                _ => return Ok(vm.invalid_instruction()),
            }
            Ok(OpcodeResult::Continue)
        }
        Args::OneRegTwoImms { reg, imm1, imm2 } => {
            match opcode {
                Opcode::StoreImmIndU8 => vm.op_store_imm_ind_u8(reg, imm1, imm2)?,
                Opcode::StoreImmIndU16 => vm.op_store_imm_ind_u16(reg, imm1, imm2)?,
                Opcode::StoreImmIndU32 => vm.op_store_imm_ind_u32(reg, imm1, imm2)?,
                Opcode::StoreImmIndU64 => vm.op_store_imm_ind_u64(reg, imm1, imm2)?,
                _ => return Ok(vm.invalid_instruction()),
            }
            Ok(OpcodeResult::Continue)
        }
        Args::OneRegOneImmOneOff { reg, imm, offset } => Ok(match opcode {
            Opcode::LoadImmJump => vm.op_load_imm_jump(reg, imm, offset),
            Opcode::BranchEqImm => vm.op_branch_eq_imm(reg, imm, offset),
            Opcode::BranchNeImm => vm.op_branch_ne_imm(reg, imm, offset),
            Opcode::BranchLtUImm => vm.op_branch_lt_u_imm(reg, imm, offset),
            Opcode::BranchLeUImm => vm.op_branch_le_u_imm(reg, imm, offset),
            Opcode::BranchGeUImm => vm.op_branch_ge_u_imm(reg, imm, offset),
            Opcode::BranchGtUImm => vm.op_branch_gt_u_imm(reg, imm, offset),
            Opcode::BranchLtSImm => vm.op_branch_lt_s_imm(reg, imm, offset),
            Opcode::BranchLeSImm => vm.op_branch_le_s_imm(reg, imm, offset),
            Opcode::BranchGeSImm => vm.op_branch_ge_s_imm(reg, imm, offset),
            Opcode::BranchGtSImm => vm.op_branch_gt_s_imm(reg, imm, offset),
            _ => vm.invalid_instruction(),
        }),
        Args::TwoRegs { r1, r2 } => {
            match opcode {
                Opcode::MoveReg => vm.op_move_reg(r1, r2),
                Opcode::Sbrk => vm.op_sbrk(r1, r2)?,
                Opcode::CountSetBits64 => vm.op_count_set_bits_64(r1, r2),
                Opcode::CountSetBits32 => vm.op_count_set_bits_32(r1, r2),
                Opcode::LeadingZeroBits64 => vm.op_leading_zero_bits_64(r1, r2),
                Opcode::LeadingZeroBits32 => vm.op_leading_zero_bits_32(r1, r2),
                Opcode::TrailingZeroBits64 => vm.op_trailing_zero_bits_64(r1, r2),
                Opcode::TrailingZeroBits32 => vm.op_trailing_zero_bits_32(r1, r2),
                Opcode::SignExtend8 => vm.op_sign_extend_8(r1, r2),
                Opcode::SignExtend16 => vm.op_sign_extend_16(r1, r2),
                Opcode::ZeroExtend16 => vm.op_zero_extend_16(r1, r2),
                Opcode::ReverseBytes => vm.op_reverse_bytes(r1, r2),
                _ => return Ok(vm.invalid_instruction()),
            }
            Ok(OpcodeResult::Continue)
        }
        Args::TwoRegsOneImm { r1, r2, imm } => {
            match opcode {
                Opcode::StoreIndU8 => vm.op_store_ind_u8(r1, r2, imm)?,
                Opcode::StoreIndU16 => vm.op_store_ind_u16(r1, r2, imm)?,
                Opcode::StoreIndU32 => vm.op_store_ind_u32(r1, r2, imm)?,
                Opcode::StoreIndU64 => vm.op_store_ind_u64(r1, r2, imm)?,
                Opcode::LoadIndU8 => vm.op_load_ind_u8(r1, r2, imm)?,
                Opcode::LoadIndI8 => vm.op_load_ind_i8(r1, r2, imm)?,
                Opcode::LoadIndU16 => vm.op_load_ind_u16(r1, r2, imm)?,
                Opcode::LoadIndI16 => vm.op_load_ind_i16(r1, r2, imm)?,
                Opcode::LoadIndU32 => vm.op_load_ind_u32(r1, r2, imm)?,
                Opcode::LoadIndI32 => vm.op_load_ind_i32(r1, r2, imm)?,
                Opcode::LoadIndU64 => vm.op_load_ind_u64(r1, r2, imm)?,
                Opcode::AddImm32 => vm.op_add_imm_32(r1, r2, imm),
                Opcode::AndImm => vm.op_and_imm(r1, r2, imm),
                Opcode::XorImm => vm.op_xor_imm(r1, r2, imm),
                Opcode::OrImm => vm.op_or_imm(r1, r2, imm),
                Opcode::MulImm32 => vm.op_mul_imm_32(r1, r2, imm),
                Opcode::SetLtUImm => vm.op_set_lt_u_imm(r1, r2, imm),
                Opcode::SetLtSImm => vm.op_set_lt_s_imm(r1, r2, imm),
                Opcode::ShloLImm32 => vm.op_shlo_l_imm_32(r1, r2, imm),
                Opcode::ShloRImm32 => vm.op_shlo_r_imm_32(r1, r2, imm),
                Opcode::SharRImm32 => vm.op_shar_r_imm_32(r1, r2, imm),
                Opcode::NegAddImm32 => vm.op_negate_and_add_imm_32(r1, r2, imm),
                Opcode::SetGtUImm => vm.op_set_gt_u_imm(r1, r2, imm),
                Opcode::SetGtSImm => vm.op_set_gt_s_imm(r1, r2, imm),
                Opcode::ShloLImmAlt32 => vm.op_shlo_l_imm_alt_32(r1, r2, imm),
                Opcode::ShloRImmAlt32 => vm.op_shlo_r_imm_alt_32(r1, r2, imm),
                Opcode::SharRImmAlt32 => vm.op_shar_r_imm_alt_32(r1, r2, imm),
                Opcode::CmovIzImm => vm.op_cmov_iz_imm(r1, r2, imm),
                Opcode::CmovNzImm => vm.op_cmov_nz_imm(r1, r2, imm),
                Opcode::AddImm64 => vm.op_add_imm_64(r1, r2, imm),
                Opcode::MulImm64 => vm.op_mul_imm_64(r1, r2, imm),
                Opcode::ShloLImm64 => vm.op_shlo_l_imm_64(r1, r2, imm),
                Opcode::ShloRImm64 => vm.op_shlo_r_imm_64(r1, r2, imm),
                Opcode::SharRImm64 => vm.op_shar_r_imm_64(r1, r2, imm),
                Opcode::NegAddImm64 => vm.op_negate_and_add_imm_64(r1, r2, imm),
                Opcode::ShloLImmAlt64 => vm.op_shlo_l_imm_alt_64(r1, r2, imm),
                Opcode::ShloRImmAlt64 => vm.op_shlo_r_imm_alt_64(r1, r2, imm),
                Opcode::SharRImmAlt64 => vm.op_shar_r_imm_alt_64(r1, r2, imm),
                Opcode::RotR64Imm => vm.op_rot_r_64_imm(r1, r2, imm),
                Opcode::RotR64ImmAlt => vm.op_rot_r_64_imm_alt(r1, r2, imm),
                Opcode::RotR32Imm => vm.op_rot_r_32_imm(r1, r2, imm),
                Opcode::RotR32ImmAlt => vm.op_rot_r_32_imm_alt(r1, r2, imm),
                _ => return Ok(vm.invalid_instruction()),
            }
            Ok(OpcodeResult::Continue)
        }
        Args::TwoRegsOneOff { r1, r2, offset } => Ok(match opcode {
            Opcode::BranchEq => vm.op_branch_eq(r1, r2, offset),
            Opcode::BranchNe => vm.op_branch_ne(r1, r2, offset),
            Opcode::BranchLtU => vm.op_branch_lt_u(r1, r2, offset),
            Opcode::BranchLtS => vm.op_branch_lt_s(r1, r2, offset),
            Opcode::BranchGeU => vm.op_branch_ge_u(r1, r2, offset),
            Opcode::BranchGeS => vm.op_branch_ge_s(r1, r2, offset),
            _ => vm.invalid_instruction(),
        }),
        Args::TwoRegsTwoImms { r1, r2, imm1, imm2 } => Ok(match opcode {
            Opcode::LoadImmJumpInd => vm.op_load_imm_jump_ind(r1, r2, imm1, imm2),
            _ => vm.invalid_instruction(),
        }),
        Args::ThreeRegs { r1, r2, r3 } => {
            match opcode {
                Opcode::Add32 => vm.op_add_32(r3, r1, r2),
                Opcode::Sub32 => vm.op_sub_32(r3, r1, r2),
                Opcode::Mul32 => vm.op_mul_32(r3, r1, r2),
                Opcode::DivU32 => vm.op_div_u_32(r3, r1, r2),
                Opcode::DivS32 => vm.op_div_s_32(r3, r1, r2),
                Opcode::RemU32 => vm.op_rem_u_32(r3, r1, r2),
                Opcode::RemS32 => vm.op_rem_s_32(r3, r1, r2),
                Opcode::ShloL32 => vm.op_shlo_l_32(r3, r1, r2),
                Opcode::ShloR32 => vm.op_shlo_r_32(r3, r1, r2),
                Opcode::SharR32 => vm.op_shar_r_32(r3, r1, r2),
                Opcode::Add64 => vm.op_add_64(r3, r1, r2),
                Opcode::Sub64 => vm.op_sub_64(r3, r1, r2),
                Opcode::Mul64 => vm.op_mul_64(r3, r1, r2),
                Opcode::DivU64 => vm.op_div_u_64(r3, r1, r2),
                Opcode::DivS64 => vm.op_div_s_64(r3, r1, r2),
                Opcode::RemU64 => vm.op_rem_u_64(r3, r1, r2),
                Opcode::RemS64 => vm.op_rem_s_64(r3, r1, r2),
                Opcode::ShloL64 => vm.op_shlo_l_64(r3, r1, r2),
                Opcode::ShloR64 => vm.op_shlo_r_64(r3, r1, r2),
                Opcode::SharR64 => vm.op_shar_r_64(r3, r1, r2),
                Opcode::And => vm.op_and(r3, r1, r2),
                Opcode::Xor => vm.op_xor(r3, r1, r2),
                Opcode::Or => vm.op_or(r3, r1, r2),
                Opcode::MulUpperSS => vm.op_mul_upper_s_s(r3, r1, r2),
                Opcode::MulUpperUU => vm.op_mul_upper_u_u(r3, r1, r2),
                Opcode::MulUpperSU => vm.op_mul_upper_s_u(r3, r1, r2),
                Opcode::SetLtU => vm.op_set_lt_u(r3, r1, r2),
                Opcode::SetLtS => vm.op_set_lt_s(r3, r1, r2),
                Opcode::CmovIz => vm.op_cmov_iz(r3, r1, r2),
                Opcode::CmovNz => vm.op_cmov_nz(r3, r1, r2),
                Opcode::RotL64 => vm.op_rot_l_64(r3, r1, r2),
                Opcode::RotL32 => vm.op_rot_l_32(r3, r1, r2),
                Opcode::RotR64 => vm.op_rot_r_64(r3, r1, r2),
                Opcode::RotR32 => vm.op_rot_r_32(r3, r1, r2),
                _ => return Ok(vm.invalid_instruction()),
            }
            Ok(OpcodeResult::Continue)
        }
    }
}

/// Little-endian read sign-extended to 64 bits. Empty input is zero.
pub(crate) fn sext(bytes: &[u8]) -> u64 {
    match bytes.last() {
        None => 0,
        Some(last) => {
            let mut word = if last & 0x80 != 0 { [0xff; 8] } else { [0; 8] };
            word[..bytes.len()].copy_from_slice(bytes);
            u64::from_le_bytes(word)
        }
    }
}

/// Little-endian read zero-extended to 64 bits, up to 8 bytes.
fn zext(bytes: &[u8]) -> u64 {
    let mut word = [0u8; 8];
    let take = bytes.len().min(8);
    word[..take].copy_from_slice(&bytes[..take]);
    u64::from_le_bytes(word)
}

fn clamp4(bytes: &[u8]) -> &[u8] {
    &bytes[..bytes.len().min(4)]
}

fn offset(bytes: &[u8]) -> i32 {
    sext(clamp4(bytes)) as u32 as i32
}

fn rest(operands: &[u8]) -> &[u8] {
    operands.get(1..).unwrap_or(&[])
}

fn low_reg(operands: &[u8]) -> Reg {
    Reg::from_nibble(operands.first().copied().unwrap_or(0) & 0xf)
}

fn high_reg(operands: &[u8]) -> Reg {
    Reg::from_nibble(operands.first().copied().unwrap_or(0) >> 4)
}

/// Length of the first of two immediates, carried in three bits of the
/// first operand byte at `shift`.
fn first_imm_len(operands: &[u8], shift: u32) -> usize {
    operands
        .first()
        .map_or(0, |byte| (((byte >> shift) & 7) as usize).min(4))
}

fn two_imms(len1: usize, tail: &[u8]) -> (u64, u64) {
    let take = len1.min(tail.len());
    (sext(&tail[..take]), sext(clamp4(&tail[take..])))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_extension() {
        assert_eq!(sext(&[]), 0);
        assert_eq!(sext(&[0x7f]), 0x7f);
        assert_eq!(sext(&[0x80]), 0xffff_ffff_ffff_ff80);
        assert_eq!(sext(&[0x00, 0x80]), 0xffff_ffff_ffff_8000);
        assert_eq!(sext(&[0xff, 0xff, 0xff, 0x7f]), 0x7fff_ffff);
    }

    #[test]
    fn register_nibbles() {
        let args = decode_args(ArgsKind::TwoRegs, &[0x21]);
        assert_eq!(
            args,
            Args::TwoRegs {
                r1: Reg::from_nibble(1),
                r2: Reg::from_nibble(2),
            }
        );
    }

    #[test]
    fn three_regs_layout() {
        let args = decode_args(ArgsKind::ThreeRegs, &[0x21, 0x03]);
        assert_eq!(
            args,
            Args::ThreeRegs {
                r1: Reg::from_nibble(1),
                r2: Reg::from_nibble(2),
                r3: Reg::from_nibble(3),
            }
        );
    }

    #[test]
    fn immediates_clamp_to_four_bytes() {
        let args = decode_args(ArgsKind::OneImm, &[1, 2, 3, 4, 5, 6]);
        assert_eq!(args, Args::OneImm { imm: 0x0403_0201 });
    }

    #[test]
    fn missing_operand_bytes_decode_as_zero() {
        assert_eq!(
            decode_args(ArgsKind::TwoRegsOneImm, &[]),
            Args::TwoRegsOneImm {
                r1: Reg::from_nibble(0),
                r2: Reg::from_nibble(0),
                imm: 0,
            }
        );
        assert_eq!(decode_args(ArgsKind::OneOff, &[]), Args::OneOff { offset: 0 });
    }

    #[test]
    fn two_imms_split_by_length_bits() {
        // Length bits say the first immediate takes 2 bytes.
        let args = decode_args(ArgsKind::TwoImms, &[0x02, 0x11, 0x22, 0x33]);
        assert_eq!(
            args,
            Args::TwoImms {
                imm1: 0x2211,
                imm2: 0x33,
            }
        );
    }

    #[test]
    fn one_reg_two_imms_length_bits_sit_in_the_high_nibble() {
        let args = decode_args(ArgsKind::OneRegTwoImms, &[0x15, 0xaa, 0xbb]);
        assert_eq!(
            args,
            Args::OneRegTwoImms {
                reg: Reg::from_nibble(5),
                imm1: sext(&[0xaa]),
                imm2: sext(&[0xbb]),
            }
        );
    }

    #[test]
    fn branch_offsets_are_signed() {
        let args = decode_args(ArgsKind::TwoRegsOneOff, &[0x21, 0xfe]);
        assert_eq!(
            args,
            Args::TwoRegsOneOff {
                r1: Reg::from_nibble(1),
                r2: Reg::from_nibble(2),
                offset: -2,
            }
        );
    }

    #[test]
    fn ext_imm_reads_eight_bytes() {
        let args = decode_args(
            ArgsKind::OneRegOneExtImm,
            &[0x01, 0xef, 0xcd, 0xab, 0x89, 0x67, 0x45, 0x23, 0x01],
        );
        assert_eq!(
            args,
            Args::OneRegOneExtImm {
                reg: Reg::from_nibble(1),
                imm: 0x0123_4567_89ab_cdef,
            }
        );
    }
}
