use crate::{registers::Reg, vm::Vm};

impl Vm {
    // ADD_32 operation
    pub fn op_add_32(&mut self, d: Reg, a: Reg, b: Reg) {
        let result = (self.registers.get(a) as u32).wrapping_add(self.registers.get(b) as u32);
        self.registers.set(d, sext32(result));
    }

    // ADD_64 operation
    pub fn op_add_64(&mut self, d: Reg, a: Reg, b: Reg) {
        let result = self.registers.get(a).wrapping_add(self.registers.get(b));
        self.registers.set(d, result);
    }

    // SUB_32 operation
    pub fn op_sub_32(&mut self, d: Reg, a: Reg, b: Reg) {
        let result = (self.registers.get(a) as u32).wrapping_sub(self.registers.get(b) as u32);
        self.registers.set(d, sext32(result));
    }

    // SUB_64 operation
    pub fn op_sub_64(&mut self, d: Reg, a: Reg, b: Reg) {
        let result = self.registers.get(a).wrapping_sub(self.registers.get(b));
        self.registers.set(d, result);
    }

    // MUL_32 operation
    pub fn op_mul_32(&mut self, d: Reg, a: Reg, b: Reg) {
        let result = (self.registers.get(a) as u32).wrapping_mul(self.registers.get(b) as u32);
        self.registers.set(d, sext32(result));
    }

    // MUL_64 operation
    pub fn op_mul_64(&mut self, d: Reg, a: Reg, b: Reg) {
        let result = self.registers.get(a).wrapping_mul(self.registers.get(b));
        self.registers.set(d, result);
    }

    // DIV_U_32 operation
    pub fn op_div_u_32(&mut self, d: Reg, a: Reg, b: Reg) {
        let dividend = self.registers.get(a) as u32;
        let divisor = self.registers.get(b) as u32;
        let result = match divisor {
            0 => u64::MAX,
            _ => sext32(dividend / divisor),
        };
        self.registers.set(d, result);
    }

    // DIV_U_64 operation
    pub fn op_div_u_64(&mut self, d: Reg, a: Reg, b: Reg) {
        let dividend = self.registers.get(a);
        let divisor = self.registers.get(b);
        let result = match divisor {
            0 => u64::MAX,
            _ => dividend / divisor,
        };
        self.registers.set(d, result);
    }

    // DIV_S_32 operation
    pub fn op_div_s_32(&mut self, d: Reg, a: Reg, b: Reg) {
        let dividend = self.registers.get(a) as u32 as i32;
        let divisor = self.registers.get(b) as u32 as i32;
        let result = match divisor {
            0 => u64::MAX,
            _ => sext32(dividend.wrapping_div(divisor) as u32),
        };
        self.registers.set(d, result);
    }

    // DIV_S_64 operation
    pub fn op_div_s_64(&mut self, d: Reg, a: Reg, b: Reg) {
        let dividend = self.registers.get(a) as i64;
        let divisor = self.registers.get(b) as i64;
        let result = match divisor {
            0 => u64::MAX,
            _ => dividend.wrapping_div(divisor) as u64,
        };
        self.registers.set(d, result);
    }

    // REM_U_32 operation
    pub fn op_rem_u_32(&mut self, d: Reg, a: Reg, b: Reg) {
        let dividend = self.registers.get(a) as u32;
        let divisor = self.registers.get(b) as u32;
        let result = match divisor {
            0 => sext32(dividend),
            _ => sext32(dividend % divisor),
        };
        self.registers.set(d, result);
    }

    // REM_U_64 operation
    pub fn op_rem_u_64(&mut self, d: Reg, a: Reg, b: Reg) {
        let dividend = self.registers.get(a);
        let divisor = self.registers.get(b);
        let result = match divisor {
            0 => dividend,
            _ => dividend % divisor,
        };
        self.registers.set(d, result);
    }

    // REM_S_32 operation
    pub fn op_rem_s_32(&mut self, d: Reg, a: Reg, b: Reg) {
        let dividend = self.registers.get(a) as u32 as i32;
        let divisor = self.registers.get(b) as u32 as i32;
        let result = match divisor {
            0 => sext32(dividend as u32),
            _ => sext32(dividend.wrapping_rem(divisor) as u32),
        };
        self.registers.set(d, result);
    }

    // REM_S_64 operation
    pub fn op_rem_s_64(&mut self, d: Reg, a: Reg, b: Reg) {
        let dividend = self.registers.get(a) as i64;
        let divisor = self.registers.get(b) as i64;
        let result = match divisor {
            0 => dividend as u64,
            _ => dividend.wrapping_rem(divisor) as u64,
        };
        self.registers.set(d, result);
    }

    // MUL_UPPER_S_S operation
    pub fn op_mul_upper_s_s(&mut self, d: Reg, a: Reg, b: Reg) {
        let product =
            i128::from(self.registers.get(a) as i64) * i128::from(self.registers.get(b) as i64);
        self.registers.set(d, (product >> 64) as u64);
    }

    // MUL_UPPER_U_U operation
    pub fn op_mul_upper_u_u(&mut self, d: Reg, a: Reg, b: Reg) {
        let product = u128::from(self.registers.get(a)) * u128::from(self.registers.get(b));
        self.registers.set(d, (product >> 64) as u64);
    }

    // MUL_UPPER_S_U operation
    pub fn op_mul_upper_s_u(&mut self, d: Reg, a: Reg, b: Reg) {
        let product =
            i128::from(self.registers.get(a) as i64) * i128::from(self.registers.get(b));
        self.registers.set(d, (product >> 64) as u64);
    }

    // ADD_IMM_32 operation
    pub fn op_add_imm_32(&mut self, d: Reg, s: Reg, imm: u64) {
        let result = (self.registers.get(s) as u32).wrapping_add(imm as u32);
        self.registers.set(d, sext32(result));
    }

    // ADD_IMM_64 operation
    pub fn op_add_imm_64(&mut self, d: Reg, s: Reg, imm: u64) {
        self.registers.set(d, self.registers.get(s).wrapping_add(imm));
    }

    // MUL_IMM_32 operation
    pub fn op_mul_imm_32(&mut self, d: Reg, s: Reg, imm: u64) {
        let result = (self.registers.get(s) as u32).wrapping_mul(imm as u32);
        self.registers.set(d, sext32(result));
    }

    // MUL_IMM_64 operation
    pub fn op_mul_imm_64(&mut self, d: Reg, s: Reg, imm: u64) {
        self.registers.set(d, self.registers.get(s).wrapping_mul(imm));
    }

    // NEG_ADD_IMM_32 operation
    pub fn op_negate_and_add_imm_32(&mut self, d: Reg, s: Reg, imm: u64) {
        let result = (imm as u32).wrapping_sub(self.registers.get(s) as u32);
        self.registers.set(d, sext32(result));
    }

    // NEG_ADD_IMM_64 operation
    pub fn op_negate_and_add_imm_64(&mut self, d: Reg, s: Reg, imm: u64) {
        self.registers.set(d, imm.wrapping_sub(self.registers.get(s)));
    }
}

/// Sign-extends a 32-bit result to the full register width.
pub(super) fn sext32(value: u32) -> u64 {
    value as i32 as i64 as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::Vm;

    fn regs(vm: &mut Vm, a: u64, b: u64) -> (Reg, Reg, Reg) {
        let (d, ra, rb) = (Reg::from_nibble(7), Reg::from_nibble(8), Reg::from_nibble(9));
        vm.registers.set(ra, a);
        vm.registers.set(rb, b);
        (d, ra, rb)
    }

    #[test]
    fn add_32_sign_extends() {
        let mut vm = Vm::new();
        let (d, a, b) = regs(&mut vm, 0xffff_ffff, 1);
        vm.op_add_32(d, a, b);
        assert_eq!(vm.registers.get(d), 0);

        let (d, a, b) = regs(&mut vm, 0x7fff_ffff, 1);
        vm.op_add_32(d, a, b);
        assert_eq!(vm.registers.get(d), 0xffff_ffff_8000_0000);
    }

    #[test]
    fn division_by_zero_yields_all_ones() {
        let mut vm = Vm::new();
        let (d, a, b) = regs(&mut vm, 1234, 0);
        vm.op_div_u_64(d, a, b);
        assert_eq!(vm.registers.get(d), u64::MAX);
        vm.op_div_s_64(d, a, b);
        assert_eq!(vm.registers.get(d), u64::MAX);
    }

    #[test]
    fn remainder_by_zero_yields_dividend() {
        let mut vm = Vm::new();
        let (d, a, b) = regs(&mut vm, 1234, 0);
        vm.op_rem_u_64(d, a, b);
        assert_eq!(vm.registers.get(d), 1234);
    }

    #[test]
    fn signed_overflow_division_yields_dividend() {
        let mut vm = Vm::new();
        let (d, a, b) = regs(&mut vm, i64::MIN as u64, u64::MAX);
        vm.op_div_s_64(d, a, b);
        assert_eq!(vm.registers.get(d), i64::MIN as u64);
        vm.op_rem_s_64(d, a, b);
        assert_eq!(vm.registers.get(d), 0);
    }

    #[test]
    fn mul_upper_takes_the_high_half() {
        let mut vm = Vm::new();
        let (d, a, b) = regs(&mut vm, u64::MAX, u64::MAX);
        vm.op_mul_upper_u_u(d, a, b);
        assert_eq!(vm.registers.get(d), u64::MAX - 1);
        // -1 * -1 = 1, upper half zero.
        vm.op_mul_upper_s_s(d, a, b);
        assert_eq!(vm.registers.get(d), 0);
        // -1 * u64::MAX sign/unsigned mix.
        vm.op_mul_upper_s_u(d, a, b);
        assert_eq!(vm.registers.get(d), u64::MAX);
    }

    #[test]
    fn negate_and_add_subtracts_the_register() {
        let mut vm = Vm::new();
        let (d, s, _) = regs(&mut vm, 7, 0);
        vm.op_negate_and_add_imm_64(d, s, 10);
        assert_eq!(vm.registers.get(d), 3);
    }
}
