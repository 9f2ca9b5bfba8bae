use crate::{registers::Reg, vm::Vm};

impl Vm {
    // SET_LT_U operation
    pub fn op_set_lt_u(&mut self, d: Reg, a: Reg, b: Reg) {
        let result = self.registers.get(a) < self.registers.get(b);
        self.registers.set(d, u64::from(result));
    }

    // SET_LT_S operation
    pub fn op_set_lt_s(&mut self, d: Reg, a: Reg, b: Reg) {
        let result = (self.registers.get(a) as i64) < (self.registers.get(b) as i64);
        self.registers.set(d, u64::from(result));
    }

    // SET_LT_U_IMM operation
    pub fn op_set_lt_u_imm(&mut self, d: Reg, s: Reg, imm: u64) {
        self.registers.set(d, u64::from(self.registers.get(s) < imm));
    }

    // SET_LT_S_IMM operation
    pub fn op_set_lt_s_imm(&mut self, d: Reg, s: Reg, imm: u64) {
        let result = (self.registers.get(s) as i64) < (imm as i64);
        self.registers.set(d, u64::from(result));
    }

    // SET_GT_U_IMM operation
    pub fn op_set_gt_u_imm(&mut self, d: Reg, s: Reg, imm: u64) {
        self.registers.set(d, u64::from(self.registers.get(s) > imm));
    }

    // SET_GT_S_IMM operation
    pub fn op_set_gt_s_imm(&mut self, d: Reg, s: Reg, imm: u64) {
        let result = (self.registers.get(s) as i64) > (imm as i64);
        self.registers.set(d, u64::from(result));
    }

    // CMOV_IZ operation
    pub fn op_cmov_iz(&mut self, d: Reg, s: Reg, cond: Reg) {
        if self.registers.get(cond) == 0 {
            self.registers.set(d, self.registers.get(s));
        }
    }

    // CMOV_NZ operation
    pub fn op_cmov_nz(&mut self, d: Reg, s: Reg, cond: Reg) {
        if self.registers.get(cond) != 0 {
            self.registers.set(d, self.registers.get(s));
        }
    }

    // CMOV_IZ_IMM operation
    pub fn op_cmov_iz_imm(&mut self, d: Reg, cond: Reg, imm: u64) {
        if self.registers.get(cond) == 0 {
            self.registers.set(d, imm);
        }
    }

    // CMOV_NZ_IMM operation
    pub fn op_cmov_nz_imm(&mut self, d: Reg, cond: Reg, imm: u64) {
        if self.registers.get(cond) != 0 {
            self.registers.set(d, imm);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::Vm;

    #[test]
    fn signed_and_unsigned_comparisons_differ() {
        let mut vm = Vm::new();
        let (d, a, b) = (Reg::from_nibble(7), Reg::from_nibble(8), Reg::from_nibble(9));
        vm.registers.set(a, u64::MAX); // -1 signed
        vm.registers.set(b, 1);
        vm.op_set_lt_u(d, a, b);
        assert_eq!(vm.registers.get(d), 0);
        vm.op_set_lt_s(d, a, b);
        assert_eq!(vm.registers.get(d), 1);
    }

    #[test]
    fn conditional_moves_keep_the_old_value_when_untaken() {
        let mut vm = Vm::new();
        let (d, s, cond) = (Reg::from_nibble(7), Reg::from_nibble(8), Reg::from_nibble(9));
        vm.registers.set(d, 11);
        vm.registers.set(s, 22);
        vm.registers.set(cond, 0);
        vm.op_cmov_nz(d, s, cond);
        assert_eq!(vm.registers.get(d), 11);
        vm.op_cmov_iz(d, s, cond);
        assert_eq!(vm.registers.get(d), 22);
        vm.op_cmov_nz_imm(d, cond, 33);
        assert_eq!(vm.registers.get(d), 22);
        vm.op_cmov_iz_imm(d, cond, 33);
        assert_eq!(vm.registers.get(d), 33);
    }
}
