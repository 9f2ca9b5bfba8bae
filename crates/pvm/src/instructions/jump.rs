use crate::{
    constants::{EXIT_ADDRESS, JUMP_ALIGNMENT},
    registers::Reg,
    vm::{OpcodeResult, Vm},
};

impl Vm {
    /// Resolves a computed jump target. The exit sentinel halts the machine;
    /// anything else must be a nonzero multiple of the jump alignment whose
    /// jump table entry lands on an instruction boundary.
    fn dynamic_jump(&mut self, target: u32) -> OpcodeResult {
        if target == EXIT_ADDRESS {
            return self.stop_with_halt();
        }
        if target == 0 || target % JUMP_ALIGNMENT != 0 {
            return self.stop_with_panic(target);
        }
        match self.program.jump_table_get(target / JUMP_ALIGNMENT - 1) {
            Some(destination) => self.jump_to(destination),
            None => self.stop_with_panic(target),
        }
    }

    // JUMP operation
    pub fn op_jump(&mut self, offset: i32) -> OpcodeResult {
        self.jump_to(self.pc.wrapping_add_signed(offset))
    }

    // JUMP_IND operation
    pub fn op_jump_ind(&mut self, base: Reg, offset: u64) -> OpcodeResult {
        let target = self.registers.get(base).wrapping_add(offset) as u32;
        self.dynamic_jump(target)
    }

    // LOAD_IMM_JUMP operation
    pub fn op_load_imm_jump(&mut self, reg: Reg, imm: u64, offset: i32) -> OpcodeResult {
        self.registers.set(reg, imm);
        self.op_jump(offset)
    }

    // LOAD_IMM_JUMP_IND operation
    pub fn op_load_imm_jump_ind(&mut self, d: Reg, base: Reg, imm: u64, offset: u64) -> OpcodeResult {
        // The target reads the base register before the destination register
        // is clobbered, the two may alias.
        let target = self.registers.get(base).wrapping_add(offset) as u32;
        self.registers.set(d, imm);
        self.dynamic_jump(target)
    }
}
