use crate::{
    errors::PageFault,
    registers::Reg,
    vm::{OpcodeResult, Vm},
};

impl Vm {
    // TRAP operation
    pub fn op_trap(&mut self) -> OpcodeResult {
        self.stop_with_panic(0)
    }

    // FALLTHROUGH operation
    pub fn op_fallthrough(&mut self) -> OpcodeResult {
        OpcodeResult::Continue
    }

    // ECALLI operation, suspends the machine until the host answers
    pub fn op_ecalli(&mut self, index: u64) -> OpcodeResult {
        self.stop_with_host_call(index as u32)
    }

    // SBRK operation
    pub fn op_sbrk(&mut self, d: Reg, size: Reg) -> Result<(), PageFault> {
        let grown = self.memory.sbrk(self.registers.get(size))?;
        self.registers.set(d, u64::from(grown));
        Ok(())
    }
}
