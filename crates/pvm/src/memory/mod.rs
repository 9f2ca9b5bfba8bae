pub mod builder;
pub mod page;

pub use builder::MemoryBuilder;
pub use page::{MemoryRange, Page, PageRange};

use rustc_hash::FxHashMap;

use crate::{
    constants::{PAGE_SHIFT, PAGE_SIZE},
    errors::PageFault,
    memory::page::PAGE_SIZE_USIZE,
};

/// Page-protected guest memory. Reads require a mapped page; writes require
/// a writable one. Accesses that span pages are split per page and fault at
/// the first byte that cannot be served. Every fault carries that address.
#[derive(Debug, Default, PartialEq)]
pub struct Memory {
    pages: FxHashMap<u32, Page>,
    /// Current heap break. Everything below it inside the heap bounds has
    /// been materialized as writable pages.
    sbrk_index: u32,
    end_heap: u32,
}

impl Memory {
    /// An unmapped memory: every access faults, `sbrk` has no room.
    pub fn new() -> Memory {
        Memory::default()
    }

    pub(crate) fn from_parts(pages: FxHashMap<u32, Page>, sbrk_index: u32, end_heap: u32) -> Memory {
        Memory {
            pages,
            sbrk_index,
            end_heap,
        }
    }

    pub fn heap_break(&self) -> u32 {
        self.sbrk_index
    }

    pub fn read(&self, address: u32, buffer: &mut [u8]) -> Result<(), PageFault> {
        let mut address = address;
        let mut remaining: &mut [u8] = buffer;
        while !remaining.is_empty() {
            let offset = (address % PAGE_SIZE) as usize;
            let take = remaining.len().min(PAGE_SIZE_USIZE - offset);
            let page = self
                .pages
                .get(&(address >> PAGE_SHIFT))
                .ok_or(PageFault(address))?;
            remaining[..take].copy_from_slice(&page.bytes()[offset..offset + take]);
            remaining = &mut remaining[take..];
            address = address.wrapping_add(take as u32);
        }
        Ok(())
    }

    pub fn write(&mut self, address: u32, data: &[u8]) -> Result<(), PageFault> {
        // Probe every page first so a spanning write either fully applies
        // or faults without side effects.
        let probe = MemoryRange::new(address, data.len() as u32);
        let covered = PageRange::covering(probe);
        for (chunk, index) in covered.indexes().enumerate() {
            match self.pages.get(&index) {
                Some(page) if page.is_writable() => {}
                _ => {
                    let page_base = index << PAGE_SHIFT;
                    return Err(PageFault(if chunk == 0 { address } else { page_base }));
                }
            }
        }

        let mut address = address;
        let mut remaining = data;
        while !remaining.is_empty() {
            let offset = (address % PAGE_SIZE) as usize;
            let take = remaining.len().min(PAGE_SIZE_USIZE - offset);
            let page = self
                .pages
                .get_mut(&(address >> PAGE_SHIFT))
                .ok_or(PageFault(address))?;
            let bytes = page.bytes_mut().ok_or(PageFault(address))?;
            bytes[offset..offset + take].copy_from_slice(&remaining[..take]);
            remaining = &remaining[take..];
            address = address.wrapping_add(take as u32);
        }
        Ok(())
    }

    pub fn read_u8(&self, address: u32) -> Result<u8, PageFault> {
        let mut bytes = [0u8; 1];
        self.read(address, &mut bytes)?;
        Ok(bytes[0])
    }

    pub fn read_u16(&self, address: u32) -> Result<u16, PageFault> {
        let mut bytes = [0u8; 2];
        self.read(address, &mut bytes)?;
        Ok(u16::from_le_bytes(bytes))
    }

    pub fn read_u32(&self, address: u32) -> Result<u32, PageFault> {
        let mut bytes = [0u8; 4];
        self.read(address, &mut bytes)?;
        Ok(u32::from_le_bytes(bytes))
    }

    pub fn read_u64(&self, address: u32) -> Result<u64, PageFault> {
        let mut bytes = [0u8; 8];
        self.read(address, &mut bytes)?;
        Ok(u64::from_le_bytes(bytes))
    }

    pub fn write_u8(&mut self, address: u32, value: u8) -> Result<(), PageFault> {
        self.write(address, &[value])
    }

    pub fn write_u16(&mut self, address: u32, value: u16) -> Result<(), PageFault> {
        self.write(address, &value.to_le_bytes())
    }

    pub fn write_u32(&mut self, address: u32, value: u32) -> Result<(), PageFault> {
        self.write(address, &value.to_le_bytes())
    }

    pub fn write_u64(&mut self, address: u32, value: u64) -> Result<(), PageFault> {
        self.write(address, &value.to_le_bytes())
    }

    /// Advances the heap break by `size`, materializing writable zero pages
    /// as needed, and returns the previous break. Requests past the heap
    /// bound fault with the break at the failed request.
    pub fn sbrk(&mut self, size: u64) -> Result<u32, PageFault> {
        let old = self.sbrk_index;
        let new = u64::from(old)
            .checked_add(size)
            .filter(|new| *new <= u64::from(self.end_heap))
            .ok_or(PageFault(old))? as u32;

        let grown = PageRange::covering(MemoryRange::new(old, new - old));
        for index in grown.indexes() {
            self.pages.entry(index).or_insert_with(Page::zeroed_writable);
        }
        self.sbrk_index = new;
        Ok(old)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::RESERVED_MEMORY_END;

    fn two_writable_pages() -> Memory {
        let mut builder = MemoryBuilder::new();
        builder
            .set_writeable_pages(PageRange::new(16, 2), &[])
            .unwrap();
        builder.finalize(0, 0).unwrap()
    }

    #[test]
    fn cross_page_write_reads_back() {
        let mut memory = two_writable_pages();
        let address = RESERVED_MEMORY_END + PAGE_SIZE - 2;
        memory.write(address, &[1, 2, 3, 4]).unwrap();

        let mut bytes = [0u8; 4];
        memory.read(address, &mut bytes).unwrap();
        assert_eq!(bytes, [1, 2, 3, 4]);
    }

    #[test]
    fn unmapped_read_faults_with_address() {
        let memory = two_writable_pages();
        let mut bytes = [0u8; 1];
        let beyond = RESERVED_MEMORY_END + 2 * PAGE_SIZE;
        assert_eq!(memory.read(beyond, &mut bytes), Err(PageFault(beyond)));
    }

    #[test]
    fn readonly_write_faults() {
        let mut builder = MemoryBuilder::new();
        builder
            .set_readable_pages(PageRange::new(16, 1), &[0xaa])
            .unwrap();
        let mut memory = builder.finalize(0, 0).unwrap();

        assert_eq!(
            memory.write(RESERVED_MEMORY_END + 5, &[1]),
            Err(PageFault(RESERVED_MEMORY_END + 5))
        );
        // The page data stays intact and readable.
        assert_eq!(memory.read_u8(RESERVED_MEMORY_END).unwrap(), 0xaa);
    }

    #[test]
    fn spanning_write_into_readonly_tail_applies_nothing() {
        let mut builder = MemoryBuilder::new();
        builder
            .set_writeable_pages(PageRange::new(16, 1), &[])
            .unwrap();
        builder
            .set_readable_pages(PageRange::new(17, 1), &[])
            .unwrap();
        let mut memory = builder.finalize(0, 0).unwrap();

        let address = RESERVED_MEMORY_END + PAGE_SIZE - 1;
        let fault = memory.write(address, &[7, 7]);
        assert_eq!(fault, Err(PageFault(RESERVED_MEMORY_END + PAGE_SIZE)));
        // First byte must not have been written.
        assert_eq!(memory.read_u8(address).unwrap(), 0);
    }

    #[test]
    fn word_accessors_are_little_endian() {
        let mut memory = two_writable_pages();
        let address = RESERVED_MEMORY_END + 8;
        memory.write_u64(address, 0x0102_0304_0506_0708).unwrap();
        assert_eq!(memory.read_u8(address).unwrap(), 0x08);
        assert_eq!(memory.read_u16(address).unwrap(), 0x0708);
        assert_eq!(memory.read_u32(address).unwrap(), 0x0506_0708);
        assert_eq!(memory.read_u64(address).unwrap(), 0x0102_0304_0506_0708);
    }

    #[test]
    fn sbrk_grows_until_the_bound() {
        let mut builder = MemoryBuilder::new();
        let heap_start = 40 * PAGE_SIZE;
        let heap_end = heap_start + 2 * PAGE_SIZE;
        let mut memory = builder.finalize(heap_start, heap_end).unwrap();

        assert_eq!(memory.sbrk(10).unwrap(), heap_start);
        assert_eq!(memory.heap_break(), heap_start + 10);
        // The materialized page is writable and zeroed.
        memory.write_u8(heap_start + 9, 0xff).unwrap();
        assert_eq!(memory.read_u8(heap_start).unwrap(), 0);

        // Growing past the bound faults and leaves the break untouched.
        let break_before = memory.heap_break();
        assert_eq!(
            memory.sbrk(u64::from(3 * PAGE_SIZE)),
            Err(PageFault(break_before))
        );
        assert_eq!(memory.heap_break(), break_before);

        // Growing exactly to the bound is fine.
        memory.sbrk(u64::from(2 * PAGE_SIZE) - 10).unwrap();
        assert_eq!(memory.heap_break(), heap_end);
    }

    #[test]
    fn unused_builder_memory_faults_everywhere() {
        let memory = Memory::new();
        let mut byte = [0u8];
        assert!(memory.read(0, &mut byte).is_err());
        assert!(memory.read(RESERVED_MEMORY_END, &mut byte).is_err());
    }
}
