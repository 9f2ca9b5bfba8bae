use rustc_hash::FxHashMap;

use crate::{
    constants::{PAGE_COUNT, PAGE_SHIFT, PAGE_SIZE},
    errors::MemoryBuilderError,
    memory::{
        Memory,
        page::{MemoryRange, PAGE_SIZE_USIZE, Page, PageRange},
    },
};

/// Assembles the initial memory of a run. Pages are declared with their
/// access class, optionally pre-populated, and the builder is sealed by
/// `finalize`, which places the heap and hands the page table to [`Memory`].
#[derive(Debug, Default)]
pub struct MemoryBuilder {
    pages: FxHashMap<u32, Page>,
    finalized: bool,
}

impl MemoryBuilder {
    pub fn new() -> MemoryBuilder {
        MemoryBuilder::default()
    }

    /// Declares read-only pages, filling them with `data` (zero padded).
    pub fn set_readable_pages(
        &mut self,
        range: PageRange,
        data: &[u8],
    ) -> Result<(), MemoryBuilderError> {
        self.set_pages(range, data, Page::zeroed_readable)
    }

    /// Declares writable pages, filling them with `data` (zero padded).
    pub fn set_writeable_pages(
        &mut self,
        range: PageRange,
        data: &[u8],
    ) -> Result<(), MemoryBuilderError> {
        self.set_pages(range, data, Page::zeroed_writable)
    }

    fn set_pages(
        &mut self,
        range: PageRange,
        data: &[u8],
        empty_page: fn() -> Page,
    ) -> Result<(), MemoryBuilderError> {
        if self.finalized {
            return Err(MemoryBuilderError::FinalizedBuilderModification);
        }
        if range.start > range.end || range.end > PAGE_COUNT {
            return Err(MemoryBuilderError::InvalidRange(
                range.start_address(),
                range.end_address(),
            ));
        }
        if range.intersects_reserved() {
            return Err(MemoryBuilderError::ReservedMemoryFault(
                range.start_address(),
                range.end_address(),
            ));
        }
        let space = (range.end - range.start) as usize * PAGE_SIZE_USIZE;
        if data.len() > space {
            return Err(MemoryBuilderError::DataTooLong {
                data: data.len(),
                space,
            });
        }

        let mut chunks = data.chunks(PAGE_SIZE_USIZE);
        for index in range.indexes() {
            let mut page = empty_page();
            if let Some(chunk) = chunks.next() {
                page.bytes_init()[..chunk.len()].copy_from_slice(chunk);
            }
            self.pages.insert(index, page);
        }
        Ok(())
    }

    /// Writes initial bytes into already-declared pages, regardless of their
    /// access class. Touching an undeclared page is `PageNotExist`.
    pub fn set_data(&mut self, address: u32, data: &[u8]) -> Result<(), MemoryBuilderError> {
        if self.finalized {
            return Err(MemoryBuilderError::FinalizedBuilderModification);
        }

        let mut address = address;
        let mut remaining = data;
        while !remaining.is_empty() {
            let offset = (address % PAGE_SIZE) as usize;
            let take = remaining.len().min(PAGE_SIZE_USIZE - offset);
            let page = self
                .pages
                .get_mut(&(address >> PAGE_SHIFT))
                .ok_or(MemoryBuilderError::PageNotExist(address))?;
            page.bytes_init()[offset..offset + take].copy_from_slice(&remaining[..take]);
            remaining = &remaining[take..];
            address = address.wrapping_add(take as u32);
        }
        Ok(())
    }

    /// Places the heap over `[heap_start, heap_end)` and seals the builder.
    /// The heap pages must be virgin: any overlap with declared pages or the
    /// reserved region is `IncorrectSbrkIndex`. Heap pages are not mapped
    /// here; `sbrk` materializes them on demand.
    pub fn finalize(&mut self, heap_start: u32, heap_end: u32) -> Result<Memory, MemoryBuilderError> {
        if self.finalized {
            return Err(MemoryBuilderError::FinalizedBuilderModification);
        }
        if heap_start > heap_end {
            return Err(MemoryBuilderError::IncorrectSbrkIndex(heap_start, heap_end));
        }

        let heap = PageRange::covering(MemoryRange::new(heap_start, heap_end - heap_start));
        if heap.intersects_reserved() {
            return Err(MemoryBuilderError::IncorrectSbrkIndex(heap_start, heap_end));
        }
        for index in heap.indexes() {
            if self.pages.contains_key(&index) {
                return Err(MemoryBuilderError::IncorrectSbrkIndex(heap_start, heap_end));
            }
        }

        self.finalized = true;
        Ok(Memory::from_parts(
            std::mem::take(&mut self.pages),
            heap_start,
            heap_end,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::RESERVED_PAGES;

    #[test]
    fn rejects_reserved_pages() {
        let mut builder = MemoryBuilder::new();
        let result = builder.set_writeable_pages(PageRange::new(RESERVED_PAGES - 1, 2), &[]);
        assert_eq!(
            result,
            Err(MemoryBuilderError::ReservedMemoryFault(
                u64::from((RESERVED_PAGES - 1) * PAGE_SIZE),
                u64::from((RESERVED_PAGES + 1) * PAGE_SIZE),
            ))
        );
    }

    #[test]
    fn rejects_ranges_past_the_address_space() {
        let mut builder = MemoryBuilder::new();
        let result = builder.set_readable_pages(PageRange::new(PAGE_COUNT - 1, 2), &[]);
        assert!(matches!(result, Err(MemoryBuilderError::InvalidRange(_, _))));
    }

    #[test]
    fn rejects_oversized_data() {
        let mut builder = MemoryBuilder::new();
        let data = vec![1u8; PAGE_SIZE_USIZE + 1];
        let result = builder.set_writeable_pages(PageRange::new(16, 1), &data);
        assert_eq!(
            result,
            Err(MemoryBuilderError::DataTooLong {
                data: PAGE_SIZE_USIZE + 1,
                space: PAGE_SIZE_USIZE,
            })
        );
    }

    #[test]
    fn set_data_requires_declared_pages() {
        let mut builder = MemoryBuilder::new();
        let address = 20 * PAGE_SIZE;
        assert_eq!(
            builder.set_data(address, &[1, 2, 3]),
            Err(MemoryBuilderError::PageNotExist(address))
        );

        builder
            .set_readable_pages(PageRange::new(20, 1), &[])
            .unwrap();
        builder.set_data(address, &[1, 2, 3]).unwrap();

        let memory = builder.finalize(0, 0).unwrap();
        let mut bytes = [0u8; 3];
        memory.read(address, &mut bytes).unwrap();
        assert_eq!(bytes, [1, 2, 3]);
    }

    #[test]
    fn finalize_rejects_heap_over_declared_pages() {
        let mut builder = MemoryBuilder::new();
        builder
            .set_writeable_pages(PageRange::new(32, 4), &[])
            .unwrap();
        let heap_start = 33 * PAGE_SIZE;
        assert_eq!(
            builder.finalize(heap_start, heap_start + PAGE_SIZE),
            Err(MemoryBuilderError::IncorrectSbrkIndex(
                heap_start,
                heap_start + PAGE_SIZE,
            ))
        );
    }

    #[test]
    fn finalize_seals_the_builder() {
        let mut builder = MemoryBuilder::new();
        builder
            .set_writeable_pages(PageRange::new(16, 1), &[])
            .unwrap();
        builder.finalize(0, 0).unwrap();

        assert_eq!(
            builder.set_writeable_pages(PageRange::new(17, 1), &[]),
            Err(MemoryBuilderError::FinalizedBuilderModification)
        );
        assert_eq!(
            builder.set_data(16 * PAGE_SIZE, &[0]),
            Err(MemoryBuilderError::FinalizedBuilderModification)
        );
        assert_eq!(
            builder.finalize(0, 0),
            Err(MemoryBuilderError::FinalizedBuilderModification)
        );
    }
}
