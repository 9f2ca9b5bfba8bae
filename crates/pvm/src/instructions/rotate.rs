use super::arithmetic::sext32;
use crate::{registers::Reg, vm::Vm};

impl Vm {
    // ROT_L_64 operation
    pub fn op_rot_l_64(&mut self, d: Reg, a: Reg, b: Reg) {
        let result = self
            .registers
            .get(a)
            .rotate_left(self.registers.get(b) as u32 % 64);
        self.registers.set(d, result);
    }

    // ROT_L_32 operation
    pub fn op_rot_l_32(&mut self, d: Reg, a: Reg, b: Reg) {
        let result =
            (self.registers.get(a) as u32).rotate_left(self.registers.get(b) as u32 % 32);
        self.registers.set(d, sext32(result));
    }

    // ROT_R_64 operation
    pub fn op_rot_r_64(&mut self, d: Reg, a: Reg, b: Reg) {
        let result = self
            .registers
            .get(a)
            .rotate_right(self.registers.get(b) as u32 % 64);
        self.registers.set(d, result);
    }

    // ROT_R_32 operation
    pub fn op_rot_r_32(&mut self, d: Reg, a: Reg, b: Reg) {
        let result =
            (self.registers.get(a) as u32).rotate_right(self.registers.get(b) as u32 % 32);
        self.registers.set(d, sext32(result));
    }

    // ROT_R_64_IMM operation
    pub fn op_rot_r_64_imm(&mut self, d: Reg, s: Reg, imm: u64) {
        self.registers
            .set(d, self.registers.get(s).rotate_right(imm as u32 % 64));
    }

    // ROT_R_64_IMM_ALT operation, the immediate is the rotated value
    pub fn op_rot_r_64_imm_alt(&mut self, d: Reg, s: Reg, imm: u64) {
        self.registers
            .set(d, imm.rotate_right(self.registers.get(s) as u32 % 64));
    }

    // ROT_R_32_IMM operation
    pub fn op_rot_r_32_imm(&mut self, d: Reg, s: Reg, imm: u64) {
        let result = (self.registers.get(s) as u32).rotate_right(imm as u32 % 32);
        self.registers.set(d, sext32(result));
    }

    // ROT_R_32_IMM_ALT operation
    pub fn op_rot_r_32_imm_alt(&mut self, d: Reg, s: Reg, imm: u64) {
        let result = (imm as u32).rotate_right(self.registers.get(s) as u32 % 32);
        self.registers.set(d, sext32(result));
    }
}
