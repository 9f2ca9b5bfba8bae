use crate::{registers::Reg, vm::Vm};

impl Vm {
    // AND operation
    pub fn op_and(&mut self, d: Reg, a: Reg, b: Reg) {
        self.registers
            .set(d, self.registers.get(a) & self.registers.get(b));
    }

    // XOR operation
    pub fn op_xor(&mut self, d: Reg, a: Reg, b: Reg) {
        self.registers
            .set(d, self.registers.get(a) ^ self.registers.get(b));
    }

    // OR operation
    pub fn op_or(&mut self, d: Reg, a: Reg, b: Reg) {
        self.registers
            .set(d, self.registers.get(a) | self.registers.get(b));
    }

    // AND_IMM operation
    pub fn op_and_imm(&mut self, d: Reg, s: Reg, imm: u64) {
        self.registers.set(d, self.registers.get(s) & imm);
    }

    // XOR_IMM operation
    pub fn op_xor_imm(&mut self, d: Reg, s: Reg, imm: u64) {
        self.registers.set(d, self.registers.get(s) ^ imm);
    }

    // OR_IMM operation
    pub fn op_or_imm(&mut self, d: Reg, s: Reg, imm: u64) {
        self.registers.set(d, self.registers.get(s) | imm);
    }

    // COUNT_SET_BITS_64 operation
    pub fn op_count_set_bits_64(&mut self, d: Reg, s: Reg) {
        self.registers
            .set(d, u64::from(self.registers.get(s).count_ones()));
    }

    // COUNT_SET_BITS_32 operation
    pub fn op_count_set_bits_32(&mut self, d: Reg, s: Reg) {
        self.registers
            .set(d, u64::from((self.registers.get(s) as u32).count_ones()));
    }

    // LEADING_ZERO_BITS_64 operation
    pub fn op_leading_zero_bits_64(&mut self, d: Reg, s: Reg) {
        self.registers
            .set(d, u64::from(self.registers.get(s).leading_zeros()));
    }

    // LEADING_ZERO_BITS_32 operation
    pub fn op_leading_zero_bits_32(&mut self, d: Reg, s: Reg) {
        self.registers
            .set(d, u64::from((self.registers.get(s) as u32).leading_zeros()));
    }

    // TRAILING_ZERO_BITS_64 operation
    pub fn op_trailing_zero_bits_64(&mut self, d: Reg, s: Reg) {
        self.registers
            .set(d, u64::from(self.registers.get(s).trailing_zeros()));
    }

    // TRAILING_ZERO_BITS_32 operation
    pub fn op_trailing_zero_bits_32(&mut self, d: Reg, s: Reg) {
        self.registers
            .set(d, u64::from((self.registers.get(s) as u32).trailing_zeros()));
    }

    // SIGN_EXTEND_8 operation
    pub fn op_sign_extend_8(&mut self, d: Reg, s: Reg) {
        self.registers
            .set(d, self.registers.get(s) as u8 as i8 as i64 as u64);
    }

    // SIGN_EXTEND_16 operation
    pub fn op_sign_extend_16(&mut self, d: Reg, s: Reg) {
        self.registers
            .set(d, self.registers.get(s) as u16 as i16 as i64 as u64);
    }

    // ZERO_EXTEND_16 operation
    pub fn op_zero_extend_16(&mut self, d: Reg, s: Reg) {
        self.registers.set(d, u64::from(self.registers.get(s) as u16));
    }

    // REVERSE_BYTES operation
    pub fn op_reverse_bytes(&mut self, d: Reg, s: Reg) {
        self.registers.set(d, self.registers.get(s).swap_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::Vm;

    #[test]
    fn bit_counting() {
        let mut vm = Vm::new();
        let (d, s) = (Reg::from_nibble(7), Reg::from_nibble(8));
        vm.registers.set(s, 0xff00_0000_0000_00f0);
        vm.op_count_set_bits_64(d, s);
        assert_eq!(vm.registers.get(d), 12);
        vm.op_count_set_bits_32(d, s);
        assert_eq!(vm.registers.get(d), 4);
        vm.op_leading_zero_bits_32(d, s);
        assert_eq!(vm.registers.get(d), 24);
        vm.op_trailing_zero_bits_64(d, s);
        assert_eq!(vm.registers.get(d), 4);
    }

    #[test]
    fn narrow_extensions() {
        let mut vm = Vm::new();
        let (d, s) = (Reg::from_nibble(7), Reg::from_nibble(8));
        vm.registers.set(s, 0x1_8080);
        vm.op_sign_extend_8(d, s);
        assert_eq!(vm.registers.get(d), 0xffff_ffff_ffff_ff80);
        vm.op_sign_extend_16(d, s);
        assert_eq!(vm.registers.get(d), 0xffff_ffff_ffff_8080);
        vm.op_zero_extend_16(d, s);
        assert_eq!(vm.registers.get(d), 0x8080);
    }

    #[test]
    fn byte_reversal() {
        let mut vm = Vm::new();
        let (d, s) = (Reg::from_nibble(7), Reg::from_nibble(8));
        vm.registers.set(s, 0x0102_0304_0506_0708);
        vm.op_reverse_bytes(d, s);
        assert_eq!(vm.registers.get(d), 0x0807_0605_0403_0201);
    }
}
