use crate::{registers::Reg, vm::Vm};

impl Vm {
    // MOVE_REG operation
    pub fn op_move_reg(&mut self, d: Reg, s: Reg) {
        self.registers.set(d, self.registers.get(s));
    }

    // LOAD_IMM operation
    pub fn op_load_imm(&mut self, reg: Reg, imm: u64) {
        self.registers.set(reg, imm);
    }

    // LOAD_IMM_64 operation, the only instruction with a full-width immediate
    pub fn op_load_imm_64(&mut self, reg: Reg, imm: u64) {
        self.registers.set(reg, imm);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::Vm;

    #[test]
    fn moves_copy_the_source() {
        let mut vm = Vm::new();
        let (d, s) = (Reg::from_nibble(3), Reg::from_nibble(4));
        vm.registers.set(s, 99);
        vm.op_move_reg(d, s);
        assert_eq!(vm.registers.get(d), 99);
        vm.op_load_imm(d, u64::MAX);
        assert_eq!(vm.registers.get(d), u64::MAX);
    }
}
