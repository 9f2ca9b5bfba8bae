use crate::constants::{PAGE_SHIFT, PAGE_SIZE, RESERVED_PAGES};

pub const PAGE_SIZE_USIZE: usize = PAGE_SIZE as usize;

/// A mapped guest page. The access class is part of the page itself:
/// readable pages reject guest writes for their whole lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Page {
    Readable(Box<[u8; PAGE_SIZE_USIZE]>),
    Writable(Box<[u8; PAGE_SIZE_USIZE]>),
}

impl Page {
    pub fn zeroed_readable() -> Page {
        Page::Readable(Box::new([0; PAGE_SIZE_USIZE]))
    }

    pub fn zeroed_writable() -> Page {
        Page::Writable(Box::new([0; PAGE_SIZE_USIZE]))
    }

    pub fn bytes(&self) -> &[u8; PAGE_SIZE_USIZE] {
        match self {
            Page::Readable(bytes) | Page::Writable(bytes) => bytes,
        }
    }

    /// Mutable view for the guest. `None` on readable pages; the builder
    /// writes initial data through [`Page::bytes_init`] instead.
    pub fn bytes_mut(&mut self) -> Option<&mut [u8; PAGE_SIZE_USIZE]> {
        match self {
            Page::Readable(_) => None,
            Page::Writable(bytes) => Some(bytes),
        }
    }

    /// Mutable view for initial-state population, ignoring the access class.
    pub fn bytes_init(&mut self) -> &mut [u8; PAGE_SIZE_USIZE] {
        match self {
            Page::Readable(bytes) | Page::Writable(bytes) => bytes,
        }
    }

    pub fn is_writable(&self) -> bool {
        matches!(self, Page::Writable(_))
    }
}

/// Byte range in the guest address space. The exclusive end may reach 2^32,
/// which a `u32` cannot hold, so it is exposed as `u64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRange {
    pub start: u32,
    pub length: u32,
}

impl MemoryRange {
    pub fn new(start: u32, length: u32) -> MemoryRange {
        MemoryRange { start, length }
    }

    pub fn end(&self) -> u64 {
        u64::from(self.start) + u64::from(self.length)
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

/// Half-open range of page indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub start: u32,
    pub end: u32,
}

impl PageRange {
    /// `count` pages starting at `start`. Saturates instead of wrapping;
    /// consumers validate against the page count of the address space.
    pub fn new(start: u32, count: u32) -> PageRange {
        PageRange {
            start,
            end: start.saturating_add(count),
        }
    }

    /// Pages covering a byte range. This is the one conversion from byte
    /// ranges to page ranges; the builder, heap placement and the heap
    /// allocator all go through it.
    pub fn covering(range: MemoryRange) -> PageRange {
        if range.is_empty() {
            return PageRange {
                start: range.start >> PAGE_SHIFT,
                end: range.start >> PAGE_SHIFT,
            };
        }
        let end = range.end().div_ceil(u64::from(PAGE_SIZE));
        PageRange {
            start: range.start >> PAGE_SHIFT,
            // A u32 byte range covers at most 2^20 pages.
            end: end as u32,
        }
    }

    pub fn indexes(&self) -> std::ops::Range<u32> {
        self.start..self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn intersects_reserved(&self) -> bool {
        !self.is_empty() && self.start < RESERVED_PAGES
    }

    /// Byte address of the first page, for diagnostics.
    pub fn start_address(&self) -> u64 {
        u64::from(self.start) << PAGE_SHIFT
    }

    /// Byte address one past the last page, for diagnostics.
    pub fn end_address(&self) -> u64 {
        u64::from(self.end) << PAGE_SHIFT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn covering_rounds_to_whole_pages() {
        let range = PageRange::covering(MemoryRange::new(PAGE_SIZE + 1, PAGE_SIZE));
        assert_eq!(range.start, 1);
        assert_eq!(range.end, 3);
    }

    #[test]
    fn covering_empty_range_is_empty() {
        let range = PageRange::covering(MemoryRange::new(123, 0));
        assert!(range.is_empty());
    }

    #[test]
    fn covering_reaches_the_top_of_the_address_space() {
        let range = PageRange::covering(MemoryRange::new(u32::MAX - 2, 3));
        assert_eq!(range.end, 1 << 20);
    }

    #[test]
    fn reserved_intersection() {
        assert!(PageRange::new(0, 1).intersects_reserved());
        assert!(PageRange::new(15, 2).intersects_reserved());
        assert!(!PageRange::new(16, 4).intersects_reserved());
        assert!(!PageRange::new(0, 0).intersects_reserved());
    }
}
