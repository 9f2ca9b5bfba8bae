use crate::{errors::PageFault, registers::Reg, vm::Vm};

// Effective addresses truncate to the 32-bit address space after the
// base-plus-offset sum, so offsets may wrap deliberately.

impl Vm {
    fn effective(&self, base: Reg, offset: u64) -> u32 {
        self.registers.get(base).wrapping_add(offset) as u32
    }

    // LOAD_U8 operation
    pub fn op_load_u8(&mut self, d: Reg, address: u64) -> Result<(), PageFault> {
        let value = self.memory.read_u8(address as u32)?;
        self.registers.set(d, u64::from(value));
        Ok(())
    }

    // LOAD_I8 operation
    pub fn op_load_i8(&mut self, d: Reg, address: u64) -> Result<(), PageFault> {
        let value = self.memory.read_u8(address as u32)?;
        self.registers.set(d, value as i8 as i64 as u64);
        Ok(())
    }

    // LOAD_U16 operation
    pub fn op_load_u16(&mut self, d: Reg, address: u64) -> Result<(), PageFault> {
        let value = self.memory.read_u16(address as u32)?;
        self.registers.set(d, u64::from(value));
        Ok(())
    }

    // LOAD_I16 operation
    pub fn op_load_i16(&mut self, d: Reg, address: u64) -> Result<(), PageFault> {
        let value = self.memory.read_u16(address as u32)?;
        self.registers.set(d, value as i16 as i64 as u64);
        Ok(())
    }

    // LOAD_U32 operation
    pub fn op_load_u32(&mut self, d: Reg, address: u64) -> Result<(), PageFault> {
        let value = self.memory.read_u32(address as u32)?;
        self.registers.set(d, u64::from(value));
        Ok(())
    }

    // LOAD_I32 operation
    pub fn op_load_i32(&mut self, d: Reg, address: u64) -> Result<(), PageFault> {
        let value = self.memory.read_u32(address as u32)?;
        self.registers.set(d, value as i32 as i64 as u64);
        Ok(())
    }

    // LOAD_U64 operation
    pub fn op_load_u64(&mut self, d: Reg, address: u64) -> Result<(), PageFault> {
        let value = self.memory.read_u64(address as u32)?;
        self.registers.set(d, value);
        Ok(())
    }

    // STORE_U8 operation
    pub fn op_store_u8(&mut self, s: Reg, address: u64) -> Result<(), PageFault> {
        self.memory
            .write_u8(address as u32, self.registers.get(s) as u8)
    }

    // STORE_U16 operation
    pub fn op_store_u16(&mut self, s: Reg, address: u64) -> Result<(), PageFault> {
        self.memory
            .write_u16(address as u32, self.registers.get(s) as u16)
    }

    // STORE_U32 operation
    pub fn op_store_u32(&mut self, s: Reg, address: u64) -> Result<(), PageFault> {
        self.memory
            .write_u32(address as u32, self.registers.get(s) as u32)
    }

    // STORE_U64 operation
    pub fn op_store_u64(&mut self, s: Reg, address: u64) -> Result<(), PageFault> {
        self.memory.write_u64(address as u32, self.registers.get(s))
    }

    // STORE_IMM_U8 operation
    pub fn op_store_imm_u8(&mut self, address: u64, value: u64) -> Result<(), PageFault> {
        self.memory.write_u8(address as u32, value as u8)
    }

    // STORE_IMM_U16 operation
    pub fn op_store_imm_u16(&mut self, address: u64, value: u64) -> Result<(), PageFault> {
        self.memory.write_u16(address as u32, value as u16)
    }

    // STORE_IMM_U32 operation
    pub fn op_store_imm_u32(&mut self, address: u64, value: u64) -> Result<(), PageFault> {
        self.memory.write_u32(address as u32, value as u32)
    }

    // STORE_IMM_U64 operation
    pub fn op_store_imm_u64(&mut self, address: u64, value: u64) -> Result<(), PageFault> {
        self.memory.write_u64(address as u32, value)
    }

    // LOAD_IND_U8 operation
    pub fn op_load_ind_u8(&mut self, d: Reg, base: Reg, offset: u64) -> Result<(), PageFault> {
        let value = self.memory.read_u8(self.effective(base, offset))?;
        self.registers.set(d, u64::from(value));
        Ok(())
    }

    // LOAD_IND_I8 operation
    pub fn op_load_ind_i8(&mut self, d: Reg, base: Reg, offset: u64) -> Result<(), PageFault> {
        let value = self.memory.read_u8(self.effective(base, offset))?;
        self.registers.set(d, value as i8 as i64 as u64);
        Ok(())
    }

    // LOAD_IND_U16 operation
    pub fn op_load_ind_u16(&mut self, d: Reg, base: Reg, offset: u64) -> Result<(), PageFault> {
        let value = self.memory.read_u16(self.effective(base, offset))?;
        self.registers.set(d, u64::from(value));
        Ok(())
    }

    // LOAD_IND_I16 operation
    pub fn op_load_ind_i16(&mut self, d: Reg, base: Reg, offset: u64) -> Result<(), PageFault> {
        let value = self.memory.read_u16(self.effective(base, offset))?;
        self.registers.set(d, value as i16 as i64 as u64);
        Ok(())
    }

    // LOAD_IND_U32 operation
    pub fn op_load_ind_u32(&mut self, d: Reg, base: Reg, offset: u64) -> Result<(), PageFault> {
        let value = self.memory.read_u32(self.effective(base, offset))?;
        self.registers.set(d, u64::from(value));
        Ok(())
    }

    // LOAD_IND_I32 operation
    pub fn op_load_ind_i32(&mut self, d: Reg, base: Reg, offset: u64) -> Result<(), PageFault> {
        let value = self.memory.read_u32(self.effective(base, offset))?;
        self.registers.set(d, value as i32 as i64 as u64);
        Ok(())
    }

    // LOAD_IND_U64 operation
    pub fn op_load_ind_u64(&mut self, d: Reg, base: Reg, offset: u64) -> Result<(), PageFault> {
        let value = self.memory.read_u64(self.effective(base, offset))?;
        self.registers.set(d, value);
        Ok(())
    }

    // STORE_IND_U8 operation
    pub fn op_store_ind_u8(&mut self, s: Reg, base: Reg, offset: u64) -> Result<(), PageFault> {
        self.memory
            .write_u8(self.effective(base, offset), self.registers.get(s) as u8)
    }

    // STORE_IND_U16 operation
    pub fn op_store_ind_u16(&mut self, s: Reg, base: Reg, offset: u64) -> Result<(), PageFault> {
        self.memory
            .write_u16(self.effective(base, offset), self.registers.get(s) as u16)
    }

    // STORE_IND_U32 operation
    pub fn op_store_ind_u32(&mut self, s: Reg, base: Reg, offset: u64) -> Result<(), PageFault> {
        self.memory
            .write_u32(self.effective(base, offset), self.registers.get(s) as u32)
    }

    // STORE_IND_U64 operation
    pub fn op_store_ind_u64(&mut self, s: Reg, base: Reg, offset: u64) -> Result<(), PageFault> {
        self.memory
            .write_u64(self.effective(base, offset), self.registers.get(s))
    }

    // STORE_IMM_IND_U8 operation
    pub fn op_store_imm_ind_u8(
        &mut self,
        base: Reg,
        offset: u64,
        value: u64,
    ) -> Result<(), PageFault> {
        self.memory
            .write_u8(self.effective(base, offset), value as u8)
    }

    // STORE_IMM_IND_U16 operation
    pub fn op_store_imm_ind_u16(
        &mut self,
        base: Reg,
        offset: u64,
        value: u64,
    ) -> Result<(), PageFault> {
        self.memory
            .write_u16(self.effective(base, offset), value as u16)
    }

    // STORE_IMM_IND_U32 operation
    pub fn op_store_imm_ind_u32(
        &mut self,
        base: Reg,
        offset: u64,
        value: u64,
    ) -> Result<(), PageFault> {
        self.memory
            .write_u32(self.effective(base, offset), value as u32)
    }

    // STORE_IMM_IND_U64 operation
    pub fn op_store_imm_ind_u64(
        &mut self,
        base: Reg,
        offset: u64,
        value: u64,
    ) -> Result<(), PageFault> {
        self.memory.write_u64(self.effective(base, offset), value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        memory::{MemoryBuilder, PageRange},
        registers::Reg,
        vm::Vm,
    };

    fn vm_with_writable_page() -> (Vm, u32) {
        let mut vm = Vm::new();
        let mut builder = MemoryBuilder::new();
        let base = 0x2_0000;
        builder
            .set_writeable_pages(PageRange::new(base >> 12, 1), &[])
            .unwrap();
        vm.memory = builder.finalize(0, 0).unwrap();
        (vm, base)
    }

    #[test]
    fn signed_loads_extend_the_top_bit() {
        let (mut vm, base) = vm_with_writable_page();
        let (d, s) = (Reg::from_nibble(7), Reg::from_nibble(8));
        vm.registers.set(s, 0x80);
        vm.op_store_u8(s, u64::from(base)).unwrap();
        vm.op_load_i8(d, u64::from(base)).unwrap();
        assert_eq!(vm.registers.get(d), 0xffff_ffff_ffff_ff80);
        vm.op_load_u8(d, u64::from(base)).unwrap();
        assert_eq!(vm.registers.get(d), 0x80);
    }

    #[test]
    fn indirect_accesses_add_the_offset() {
        let (mut vm, base) = vm_with_writable_page();
        let (d, reg) = (Reg::from_nibble(7), Reg::from_nibble(8));
        vm.registers.set(reg, u64::from(base));
        vm.op_store_imm_ind_u32(reg, 16, 0xdead_beef).unwrap();
        vm.op_load_ind_u32(d, reg, 16).unwrap();
        assert_eq!(vm.registers.get(d), 0xdead_beef);
    }

    #[test]
    fn faults_carry_the_address() {
        let (mut vm, _) = vm_with_writable_page();
        let d = Reg::from_nibble(7);
        let err = vm.op_load_u64(d, 0x9000_0000).unwrap_err();
        assert_eq!(err, PageFault(0x9000_0000));
    }
}
