//! Journal storage in the last 256K of the on-board QSPI flash.
//!
//! The region is reserved in `memory.x`. Page and offset bookkeeping lives in
//! [`PagedJournal`]; this module only reads the range through XIP and writes
//! it with the boot ROM routines.

use core::slice;

use cortex_m::interrupt;
use interval_game::paged::{FlashRegion, PAGE_SIZE, SECTOR_SIZE};
use interval_game::PagedJournal;
use rp_pico::hal::rom_data;

const XIP_BASE: u32 = 0x1000_0000;
const JOURNAL_OFFSET: u32 = 0x1C_0000;
const JOURNAL_SIZE: usize = 0x4_0000;
const SECTOR_ERASE: u8 = 0x20;

pub type FlashJournal = PagedJournal<Rp2040Flash>;

pub struct Rp2040Flash {
    _private: (),
}

impl Rp2040Flash {
    pub fn journal() -> FlashJournal {
        PagedJournal::open(Self { _private: () })
    }

    /// XIP address of the first journal byte.
    pub fn address(&self) -> u32 {
        XIP_BASE + JOURNAL_OFFSET
    }
}

impl FlashRegion for Rp2040Flash {
    fn region(&self) -> &[u8] {
        // SAFETY: memory.x keeps the program image out of this range and only
        // write_page modifies it, with interrupts masked.
        unsafe { slice::from_raw_parts((XIP_BASE + JOURNAL_OFFSET) as *const u8, JOURNAL_SIZE) }
    }

    fn program(&mut self, offset: usize, page: &[u8; PAGE_SIZE], erase: bool) {
        let offset = JOURNAL_OFFSET + offset as u32;
        let rom = Rom::lookup();
        interrupt::free(|_| unsafe { write_page(&rom, offset, page, erase) });
    }
}

/// Boot ROM flash routines, resolved while XIP is still available.
struct Rom {
    connect_internal_flash: unsafe extern "C" fn(),
    flash_exit_xip: unsafe extern "C" fn(),
    flash_range_erase: unsafe extern "C" fn(u32, usize, u32, u8),
    flash_range_program: unsafe extern "C" fn(u32, *const u8, usize),
    flash_flush_cache: unsafe extern "C" fn(),
    flash_enter_cmd_xip: unsafe extern "C" fn(),
}

impl Rom {
    fn lookup() -> Self {
        Self {
            connect_internal_flash: rom_data::connect_internal_flash::ptr(),
            flash_exit_xip: rom_data::flash_exit_xip::ptr(),
            flash_range_erase: rom_data::flash_range_erase::ptr(),
            flash_range_program: rom_data::flash_range_program::ptr(),
            flash_flush_cache: rom_data::flash_flush_cache::ptr(),
            flash_enter_cmd_xip: rom_data::flash_enter_cmd_xip::ptr(),
        }
    }
}

/// Runs from RAM: flash is not executable between exit_xip and enter_cmd_xip.
#[inline(never)]
#[link_section = ".data.ram_func"]
unsafe fn write_page(rom: &Rom, offset: u32, page: &[u8; PAGE_SIZE], erase: bool) {
    (rom.connect_internal_flash)();
    (rom.flash_exit_xip)();
    if erase {
        let sector = offset - offset % SECTOR_SIZE as u32;
        (rom.flash_range_erase)(sector, SECTOR_SIZE, SECTOR_SIZE as u32, SECTOR_ERASE);
    }
    (rom.flash_range_program)(offset, page.as_ptr(), PAGE_SIZE);
    (rom.flash_flush_cache)();
    (rom.flash_enter_cmd_xip)();
}
