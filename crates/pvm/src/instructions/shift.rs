use super::arithmetic::sext32;
use crate::{registers::Reg, vm::Vm};

// Shift amounts wrap at the operand width, matching the hardware shifters
// of the register machines this instruction set descends from.

impl Vm {
    // SHLO_L_32 operation
    pub fn op_shlo_l_32(&mut self, d: Reg, a: Reg, b: Reg) {
        let result = (self.registers.get(a) as u32) << (self.registers.get(b) % 32);
        self.registers.set(d, sext32(result));
    }

    // SHLO_L_64 operation
    pub fn op_shlo_l_64(&mut self, d: Reg, a: Reg, b: Reg) {
        let result = self.registers.get(a) << (self.registers.get(b) % 64);
        self.registers.set(d, result);
    }

    // SHLO_R_32 operation
    pub fn op_shlo_r_32(&mut self, d: Reg, a: Reg, b: Reg) {
        let result = (self.registers.get(a) as u32) >> (self.registers.get(b) % 32);
        self.registers.set(d, sext32(result));
    }

    // SHLO_R_64 operation
    pub fn op_shlo_r_64(&mut self, d: Reg, a: Reg, b: Reg) {
        let result = self.registers.get(a) >> (self.registers.get(b) % 64);
        self.registers.set(d, result);
    }

    // SHAR_R_32 operation
    pub fn op_shar_r_32(&mut self, d: Reg, a: Reg, b: Reg) {
        let result = (self.registers.get(a) as u32 as i32) >> (self.registers.get(b) % 32);
        self.registers.set(d, sext32(result as u32));
    }

    // SHAR_R_64 operation
    pub fn op_shar_r_64(&mut self, d: Reg, a: Reg, b: Reg) {
        let result = (self.registers.get(a) as i64) >> (self.registers.get(b) % 64);
        self.registers.set(d, result as u64);
    }

    // SHLO_L_IMM_32 operation
    pub fn op_shlo_l_imm_32(&mut self, d: Reg, s: Reg, imm: u64) {
        self.registers
            .set(d, sext32((self.registers.get(s) as u32) << (imm % 32)));
    }

    // SHLO_L_IMM_64 operation
    pub fn op_shlo_l_imm_64(&mut self, d: Reg, s: Reg, imm: u64) {
        self.registers.set(d, self.registers.get(s) << (imm % 64));
    }

    // SHLO_R_IMM_32 operation
    pub fn op_shlo_r_imm_32(&mut self, d: Reg, s: Reg, imm: u64) {
        self.registers
            .set(d, sext32((self.registers.get(s) as u32) >> (imm % 32)));
    }

    // SHLO_R_IMM_64 operation
    pub fn op_shlo_r_imm_64(&mut self, d: Reg, s: Reg, imm: u64) {
        self.registers.set(d, self.registers.get(s) >> (imm % 64));
    }

    // SHAR_R_IMM_32 operation
    pub fn op_shar_r_imm_32(&mut self, d: Reg, s: Reg, imm: u64) {
        let result = (self.registers.get(s) as u32 as i32) >> (imm % 32);
        self.registers.set(d, sext32(result as u32));
    }

    // SHAR_R_IMM_64 operation
    pub fn op_shar_r_imm_64(&mut self, d: Reg, s: Reg, imm: u64) {
        let result = (self.registers.get(s) as i64) >> (imm % 64);
        self.registers.set(d, result as u64);
    }

    // SHLO_L_IMM_ALT_32 operation, the immediate is the shifted value
    pub fn op_shlo_l_imm_alt_32(&mut self, d: Reg, s: Reg, imm: u64) {
        let result = (imm as u32) << (self.registers.get(s) % 32);
        self.registers.set(d, sext32(result));
    }

    // SHLO_L_IMM_ALT_64 operation
    pub fn op_shlo_l_imm_alt_64(&mut self, d: Reg, s: Reg, imm: u64) {
        self.registers.set(d, imm << (self.registers.get(s) % 64));
    }

    // SHLO_R_IMM_ALT_32 operation
    pub fn op_shlo_r_imm_alt_32(&mut self, d: Reg, s: Reg, imm: u64) {
        let result = (imm as u32) >> (self.registers.get(s) % 32);
        self.registers.set(d, sext32(result));
    }

    // SHLO_R_IMM_ALT_64 operation
    pub fn op_shlo_r_imm_alt_64(&mut self, d: Reg, s: Reg, imm: u64) {
        self.registers.set(d, imm >> (self.registers.get(s) % 64));
    }

    // SHAR_R_IMM_ALT_32 operation
    pub fn op_shar_r_imm_alt_32(&mut self, d: Reg, s: Reg, imm: u64) {
        let result = (imm as u32 as i32) >> (self.registers.get(s) % 32);
        self.registers.set(d, sext32(result as u32));
    }

    // SHAR_R_IMM_ALT_64 operation
    pub fn op_shar_r_imm_alt_64(&mut self, d: Reg, s: Reg, imm: u64) {
        let result = (imm as i64) >> (self.registers.get(s) % 64);
        self.registers.set(d, result as u64);
    }
}
