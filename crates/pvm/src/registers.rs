use crate::constants::{ENCODED_REGISTERS_SIZE, NUM_REGISTERS, REGISTER_WIDTH};

/// A validated register index. The only constructors clamp into range, so
/// indexing the register file can never fail at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Reg(u8);

impl Reg {
    /// Return address of the standard entry sequence. A dynamic jump through
    /// it reaches the exit address and halts cleanly.
    pub const RA: Reg = Reg(0);
    /// Stack pointer, initialized to the top of the stack segment.
    pub const SP: Reg = Reg(1);
    /// First argument register: argument-segment address on entry, output
    /// address on halt.
    pub const A0: Reg = Reg(7);
    /// Second argument register: argument length on entry, output length on
    /// halt.
    pub const A1: Reg = Reg(8);

    /// Decodes a register nibble. Out-of-range values clamp to the last
    /// register, as the instruction coding prescribes.
    pub const fn from_nibble(nibble: u8) -> Reg {
        if nibble as usize >= NUM_REGISTERS {
            Reg((NUM_REGISTERS - 1) as u8)
        } else {
            Reg(nibble)
        }
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for Reg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// The guest register file: thirteen 64-bit registers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registers([u64; NUM_REGISTERS]);

impl Registers {
    pub fn new() -> Self {
        Registers([0; NUM_REGISTERS])
    }

    pub fn get(&self, reg: Reg) -> u64 {
        self.0[reg.index()]
    }

    pub fn set(&mut self, reg: Reg, value: u64) {
        self.0[reg.index()] = value;
    }

    pub fn reset(&mut self) {
        self.0 = [0; NUM_REGISTERS];
    }

    pub fn values(&self) -> &[u64; NUM_REGISTERS] {
        &self.0
    }

    /// Flat little-endian encoding of the whole file, register 0 first. This
    /// is the representation handed across the host-call boundary.
    pub fn encode(&self) -> [u8; ENCODED_REGISTERS_SIZE] {
        let mut buffer = [0u8; ENCODED_REGISTERS_SIZE];
        for (index, value) in self.0.iter().enumerate() {
            let start = index * REGISTER_WIDTH;
            buffer[start..start + REGISTER_WIDTH].copy_from_slice(&value.to_le_bytes());
        }
        buffer
    }

    /// Inverse of [`Registers::encode`].
    pub fn decode(buffer: &[u8; ENCODED_REGISTERS_SIZE]) -> Registers {
        let mut values = [0u64; NUM_REGISTERS];
        for (index, value) in values.iter_mut().enumerate() {
            let start = index * REGISTER_WIDTH;
            let mut word = [0u8; REGISTER_WIDTH];
            word.copy_from_slice(&buffer[start..start + REGISTER_WIDTH]);
            *value = u64::from_le_bytes(word);
        }
        Registers(values)
    }
}

impl Default for Registers {
    fn default() -> Self {
        Registers::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_is_little_endian_and_104_bytes() {
        let mut registers = Registers::new();
        registers.set(Reg::SP, 0x0102_0304_0506_0708);

        let encoded = registers.encode();
        assert_eq!(encoded.len(), ENCODED_REGISTERS_SIZE);
        assert_eq!(
            &encoded[8..16],
            &[0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01]
        );
        assert!(encoded[16..].iter().all(|byte| *byte == 0));
    }

    #[test]
    fn decode_round_trips() {
        let mut registers = Registers::new();
        for nibble in 0..NUM_REGISTERS as u8 {
            registers.set(Reg::from_nibble(nibble), u64::from(nibble) << 32 | 0xabcd);
        }
        assert_eq!(Registers::decode(&registers.encode()), registers);
    }

    #[test]
    fn nibble_clamps_to_last_register() {
        assert_eq!(Reg::from_nibble(15), Reg::from_nibble(12));
        assert_eq!(Reg::from_nibble(15).index(), 12);
    }
}
