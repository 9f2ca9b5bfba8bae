use bytes::Bytes;

use crate::{constants::MAX_OPERAND_BYTES, errors::ProgramParseError};

/// A parsed guest program.
///
/// The container starts with the memory layout header (read-only data
/// length, read-write data length, heap page count, stack size, all
/// little-endian), followed by both data blobs and the code blob: jump
/// table length (varint), jump table entry size in bytes, the entries,
/// code length (varint), the code, and one boundary-mask bit per code byte
/// (LSB first). Mask bit `i` set means `code[i]` starts an instruction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    ro_data: Bytes,
    rw_data: Bytes,
    heap_pages: u16,
    stack_size: u32,
    jump_table: Vec<u32>,
    code: Vec<u8>,
    mask: Vec<u8>,
}

impl Program {
    pub fn parse(bytes: &[u8]) -> Result<Program, ProgramParseError> {
        let mut reader = Reader::new(bytes);

        let ro_len = reader.u32_le("ro data length")? as usize;
        let rw_len = reader.u32_le("rw data length")? as usize;
        let heap_pages = reader.u16_le("heap page count")?;
        let stack_size = reader.u32_le("stack size")?;
        let ro_data = Bytes::copy_from_slice(reader.take(ro_len, "ro data")?);
        let rw_data = Bytes::copy_from_slice(reader.take(rw_len, "rw data")?);

        let jump_table_len = reader.varint("jump table length")? as usize;
        let entry_size = reader.u8("jump table entry size")?;
        if entry_size > 4 {
            return Err(ProgramParseError::InvalidJumpTableEntrySize(entry_size));
        }
        // Bound the allocation by the input before trusting the length.
        if jump_table_len
            .checked_mul(entry_size as usize)
            .is_none_or(|total| total > reader.remaining())
        {
            return Err(ProgramParseError::UnexpectedEnd("jump table"));
        }
        let mut jump_table = Vec::with_capacity(jump_table_len);
        for _ in 0..jump_table_len {
            let entry = reader.take(entry_size as usize, "jump table entry")?;
            let mut word = [0u8; 4];
            word[..entry.len()].copy_from_slice(entry);
            jump_table.push(u32::from_le_bytes(word));
        }

        let code_len = reader.varint("code length")? as usize;
        let code = reader.take(code_len, "code")?.to_vec();
        let mask = reader.take(code_len.div_ceil(8), "instruction mask")?.to_vec();

        Ok(Program {
            ro_data,
            rw_data,
            heap_pages,
            stack_size,
            jump_table,
            code,
            mask,
        })
    }

    pub fn ro_data(&self) -> &Bytes {
        &self.ro_data
    }

    pub fn rw_data(&self) -> &Bytes {
        &self.rw_data
    }

    pub fn heap_pages(&self) -> u16 {
        self.heap_pages
    }

    pub fn stack_size(&self) -> u32 {
        self.stack_size
    }

    pub fn code(&self) -> &[u8] {
        &self.code
    }

    pub fn jump_table_get(&self, entry: u32) -> Option<u32> {
        self.jump_table.get(entry as usize).copied()
    }

    /// Whether `pc` starts an instruction.
    pub fn is_boundary(&self, pc: u32) -> bool {
        let index = pc as usize;
        index < self.code.len() && self.mask_bit(index)
    }

    /// Operand bytes of the instruction at `pc`: the distance to the next
    /// boundary minus one, clamped to the operand limit and the code end.
    pub fn skip(&self, pc: u32) -> u32 {
        let len = self.code.len() as u32;
        let mut next = pc.saturating_add(1);
        while next < len && next - pc <= MAX_OPERAND_BYTES && !self.mask_bit(next as usize) {
            next += 1;
        }
        next.min(len) - pc - 1
    }

    fn mask_bit(&self, index: usize) -> bool {
        self.mask
            .get(index / 8)
            .is_some_and(|byte| byte >> (index % 8) & 1 == 1)
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Reader<'a> {
        Reader { bytes, offset: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    fn take(&mut self, len: usize, what: &'static str) -> Result<&'a [u8], ProgramParseError> {
        let end = self
            .offset
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(ProgramParseError::UnexpectedEnd(what))?;
        let slice = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn u8(&mut self, what: &'static str) -> Result<u8, ProgramParseError> {
        Ok(self.take(1, what)?[0])
    }

    fn u16_le(&mut self, what: &'static str) -> Result<u16, ProgramParseError> {
        let bytes = self.take(2, what)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn u32_le(&mut self, what: &'static str) -> Result<u32, ProgramParseError> {
        let bytes = self.take(4, what)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// LEB128, capped at 32 bits.
    fn varint(&mut self, what: &'static str) -> Result<u32, ProgramParseError> {
        let mut value = 0u32;
        for shift in (0..32).step_by(7) {
            let byte = self.u8(what)?;
            let payload = u32::from(byte & 0x7f);
            if payload << shift >> shift != payload {
                return Err(ProgramParseError::VarintTooLong(byte));
            }
            value |= payload << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(ProgramParseError::VarintTooLong(self.bytes[self.offset - 1]))
    }
}
