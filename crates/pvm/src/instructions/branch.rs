use crate::{
    registers::Reg,
    vm::{OpcodeResult, Vm},
};

impl Vm {
    /// Transfers control to `pc + offset` when the condition holds. Targets
    /// that are not instruction boundaries panic the guest.
    fn branch_if(&mut self, taken: bool, offset: i32) -> OpcodeResult {
        if taken {
            self.jump_to(self.pc.wrapping_add_signed(offset))
        } else {
            OpcodeResult::Continue
        }
    }

    // BRANCH_EQ operation
    pub fn op_branch_eq(&mut self, a: Reg, b: Reg, offset: i32) -> OpcodeResult {
        self.branch_if(self.registers.get(a) == self.registers.get(b), offset)
    }

    // BRANCH_NE operation
    pub fn op_branch_ne(&mut self, a: Reg, b: Reg, offset: i32) -> OpcodeResult {
        self.branch_if(self.registers.get(a) != self.registers.get(b), offset)
    }

    // BRANCH_LT_U operation
    pub fn op_branch_lt_u(&mut self, a: Reg, b: Reg, offset: i32) -> OpcodeResult {
        self.branch_if(self.registers.get(a) < self.registers.get(b), offset)
    }

    // BRANCH_LT_S operation
    pub fn op_branch_lt_s(&mut self, a: Reg, b: Reg, offset: i32) -> OpcodeResult {
        let taken = (self.registers.get(a) as i64) < (self.registers.get(b) as i64);
        self.branch_if(taken, offset)
    }

    // BRANCH_GE_U operation
    pub fn op_branch_ge_u(&mut self, a: Reg, b: Reg, offset: i32) -> OpcodeResult {
        self.branch_if(self.registers.get(a) >= self.registers.get(b), offset)
    }

    // BRANCH_GE_S operation
    pub fn op_branch_ge_s(&mut self, a: Reg, b: Reg, offset: i32) -> OpcodeResult {
        let taken = (self.registers.get(a) as i64) >= (self.registers.get(b) as i64);
        self.branch_if(taken, offset)
    }

    // BRANCH_EQ_IMM operation
    pub fn op_branch_eq_imm(&mut self, a: Reg, imm: u64, offset: i32) -> OpcodeResult {
        self.branch_if(self.registers.get(a) == imm, offset)
    }

    // BRANCH_NE_IMM operation
    pub fn op_branch_ne_imm(&mut self, a: Reg, imm: u64, offset: i32) -> OpcodeResult {
        self.branch_if(self.registers.get(a) != imm, offset)
    }

    // BRANCH_LT_U_IMM operation
    pub fn op_branch_lt_u_imm(&mut self, a: Reg, imm: u64, offset: i32) -> OpcodeResult {
        self.branch_if(self.registers.get(a) < imm, offset)
    }

    // BRANCH_LE_U_IMM operation
    pub fn op_branch_le_u_imm(&mut self, a: Reg, imm: u64, offset: i32) -> OpcodeResult {
        self.branch_if(self.registers.get(a) <= imm, offset)
    }

    // BRANCH_GE_U_IMM operation
    pub fn op_branch_ge_u_imm(&mut self, a: Reg, imm: u64, offset: i32) -> OpcodeResult {
        self.branch_if(self.registers.get(a) >= imm, offset)
    }

    // BRANCH_GT_U_IMM operation
    pub fn op_branch_gt_u_imm(&mut self, a: Reg, imm: u64, offset: i32) -> OpcodeResult {
        self.branch_if(self.registers.get(a) > imm, offset)
    }

    // BRANCH_LT_S_IMM operation
    pub fn op_branch_lt_s_imm(&mut self, a: Reg, imm: u64, offset: i32) -> OpcodeResult {
        self.branch_if((self.registers.get(a) as i64) < (imm as i64), offset)
    }

    // BRANCH_LE_S_IMM operation
    pub fn op_branch_le_s_imm(&mut self, a: Reg, imm: u64, offset: i32) -> OpcodeResult {
        self.branch_if((self.registers.get(a) as i64) <= (imm as i64), offset)
    }

    // BRANCH_GE_S_IMM operation
    pub fn op_branch_ge_s_imm(&mut self, a: Reg, imm: u64, offset: i32) -> OpcodeResult {
        self.branch_if((self.registers.get(a) as i64) >= (imm as i64), offset)
    }

    // BRANCH_GT_S_IMM operation
    pub fn op_branch_gt_s_imm(&mut self, a: Reg, imm: u64, offset: i32) -> OpcodeResult {
        self.branch_if((self.registers.get(a) as i64) > (imm as i64), offset)
    }
}
