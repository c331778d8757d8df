//! [`Journal`] over NOR flash that is programmed one page at a time.
//!
//! Stored text never contains 0xFF, so the first erased byte marks the end of
//! the log. Bytes are buffered one page at a time; a flush reprograms the
//! current page, which only clears bits and leaves the already written prefix
//! untouched. A sector is erased the first time one of its pages is written.

use crate::journal::Journal;

pub const PAGE_SIZE: usize = 256;
pub const SECTOR_SIZE: usize = 4096;
pub const ERASED: u8 = 0xFF;

/// A flash range reserved for the journal, addressed from its first byte.
pub trait FlashRegion {
    /// Current content of the whole range.
    fn region(&self) -> &[u8];

    /// Programs one page at `offset`, after erasing its sector if `erase`.
    fn program(&mut self, offset: usize, page: &[u8; PAGE_SIZE], erase: bool);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PagedError {
    /// The reserved region has no room left.
    Full,
}

pub struct PagedJournal<F> {
    flash: F,
    len: usize,
    flushed: usize,
    page: [u8; PAGE_SIZE],
}

impl<F: FlashRegion> PagedJournal<F> {
    /// Picks up the log where the previous run left it.
    pub fn open(flash: F) -> Self {
        let stored = flash.region();
        let len = stored.iter().position(|&b| b == ERASED).unwrap_or(stored.len());
        let page_start = len - len % PAGE_SIZE;

        let mut page = [ERASED; PAGE_SIZE];
        page[..len - page_start].copy_from_slice(&stored[page_start..len]);

        debug!("journal opened with {} bytes", len);
        Self {
            flash,
            len,
            flushed: len,
            page,
        }
    }

    pub fn storage(&self) -> &F {
        &self.flash
    }

    /// Everything written up to the last flush.
    pub fn stored_log(&self) -> &[u8] {
        &self.flash.region()[..self.flushed]
    }

    fn program_current_page(&mut self, page_start: usize) {
        // First write into a sector: wipe whatever an older image left there
        let erase = page_start % SECTOR_SIZE == 0
            && self.flash.region()[page_start..page_start + PAGE_SIZE]
                .iter()
                .all(|&b| b == ERASED);
        self.flash.program(page_start, &self.page, erase);
        self.flushed = self.len;
    }
}

impl<F: FlashRegion> Journal for PagedJournal<F> {
    type Error = PagedError;

    fn len(&mut self) -> Result<usize, PagedError> {
        Ok(self.len)
    }

    fn append(&mut self, bytes: &[u8]) -> Result<(), PagedError> {
        if self.len + bytes.len() > self.flash.region().len() {
            return Err(PagedError::Full);
        }
        for &byte in bytes {
            self.page[self.len % PAGE_SIZE] = byte;
            self.len += 1;
            if self.len % PAGE_SIZE == 0 {
                self.program_current_page(self.len - PAGE_SIZE);
                self.page = [ERASED; PAGE_SIZE];
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), PagedError> {
        if self.flushed != self.len {
            self.program_current_page(self.len - self.len % PAGE_SIZE);
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), PagedError> {
        debug!("journal closed at {} bytes", self.len);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// NOR flash in RAM: programming ANDs bits in, erasing sets a sector to 0xFF.
    struct RamFlash {
        bytes: Vec<u8>,
        programs: Vec<(usize, bool)>,
    }

    impl RamFlash {
        fn erased(size: usize) -> Self {
            Self {
                bytes: vec![ERASED; size],
                programs: Vec::new(),
            }
        }

        fn with(size: usize, contents: &[u8]) -> Self {
            let mut flash = Self::erased(size);
            flash.bytes[..contents.len()].copy_from_slice(contents);
            flash
        }
    }

    impl FlashRegion for RamFlash {
        fn region(&self) -> &[u8] {
            &self.bytes
        }

        fn program(&mut self, offset: usize, page: &[u8; PAGE_SIZE], erase: bool) {
            assert_eq!(offset % PAGE_SIZE, 0);
            if erase {
                let sector = offset - offset % SECTOR_SIZE;
                self.bytes[sector..sector + SECTOR_SIZE].fill(ERASED);
            }
            for (cell, &byte) in self.bytes[offset..offset + PAGE_SIZE].iter_mut().zip(page) {
                *cell &= byte;
            }
            self.programs.push((offset, erase));
        }
    }

    const REGION: usize = 0x4_0000;

    #[test]
    fn fresh_region_is_empty() {
        let mut journal = PagedJournal::open(RamFlash::erased(REGION));

        assert_eq!(journal.len(), Ok(0));
        assert!(journal.stored_log().is_empty());
    }

    #[test]
    fn resumes_in_the_middle_of_a_page() {
        let existing = b"timestamp,temps_ecoule\n2024-03-01 10:00:20,15\n";
        let mut journal = PagedJournal::open(RamFlash::with(REGION, existing));
        assert_eq!(journal.len(), Ok(existing.len()));

        journal.append(b"2024-03-01 10:01:00,16\n").unwrap();
        journal.flush().unwrap();

        assert_eq!(
            journal.stored_log(),
            &b"timestamp,temps_ecoule\n2024-03-01 10:00:20,15\n2024-03-01 10:01:00,16\n"[..]
        );
        // Same page reprogrammed, no erase since it already held data
        assert_eq!(journal.storage().programs, vec![(0, false)]);
    }

    #[test]
    fn flush_reprograms_a_page_already_written() {
        let mut journal = PagedJournal::open(RamFlash::erased(REGION));
        journal.append(b"first\n").unwrap();
        journal.flush().unwrap();
        journal.append(b"second\n").unwrap();
        journal.flush().unwrap();
        // Nothing pending, nothing programmed
        journal.flush().unwrap();

        assert_eq!(journal.stored_log(), &b"first\nsecond\n"[..]);
        assert_eq!(journal.storage().programs, vec![(0, true), (0, false)]);
    }

    #[test]
    fn append_across_a_page_boundary() {
        let mut journal = PagedJournal::open(RamFlash::erased(REGION));
        let line = [b'x'; 100];
        for _ in 0..3 {
            journal.append(&line).unwrap();
        }

        // The full first page went out on its own, the tail waits for a flush
        assert_eq!(journal.storage().programs, vec![(0, true)]);
        assert_eq!(journal.stored_log().len(), PAGE_SIZE);
        journal.flush().unwrap();

        assert_eq!(journal.storage().programs, vec![(0, true), (PAGE_SIZE, false)]);
        assert_eq!(journal.stored_log(), &[b'x'; 300][..]);

        let reopened = PagedJournal::open(RamFlash::with(REGION, journal.stored_log()));
        assert_eq!(reopened.stored_log().len(), 300);
    }

    #[test]
    fn new_sector_is_erased_before_first_write() {
        let mut flash = RamFlash::erased(REGION);
        flash.bytes[..SECTOR_SIZE].fill(b'a');
        // Leftover garbage deeper in the next sector
        flash.bytes[SECTOR_SIZE + 512] = 0;
        let mut journal = PagedJournal::open(flash);
        assert_eq!(journal.len(), Ok(SECTOR_SIZE));

        journal.append(b"z\n").unwrap();
        journal.flush().unwrap();

        assert_eq!(journal.storage().programs, vec![(SECTOR_SIZE, true)]);
        assert_eq!(journal.storage().bytes[SECTOR_SIZE + 512], ERASED);
    }

    #[test]
    fn refuses_to_grow_past_the_region() {
        let mut journal = PagedJournal::open(RamFlash::with(REGION, &vec![b'a'; REGION - 4]));

        assert_eq!(journal.append(b"12345"), Err(PagedError::Full));
        assert_eq!(journal.len(), Ok(REGION - 4));
        assert_eq!(journal.append(b"1234"), Ok(()));
        assert_eq!(journal.append(b"5"), Err(PagedError::Full));
    }
}
