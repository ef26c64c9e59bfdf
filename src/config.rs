/*!

Fixed addresses shared with the legacy images, and the tunables of one
bridge run.

 */


use log::LevelFilter;


//
// Low memory map (below 1 MiB)
//
//	0x00000 - 0x07DFF : IVT, BDA, loader stack
//	0x07E00 - 0x1FFFF : conventional memory handed to the CSM16 image
//	0x20000 - 0x7FFFF : low stub (thunk + tables + E820) and low PMM
//	0x80000 - 0xBFFFF : EBDA and legacy video memory
//	0xC0000 - 0xC7FFF : VGA BIOS
//	0xC8000 - 0xFFFFF : CSM16 image (placed against the top)
//
pub const CONVEN_START: u32 = 0x0000_7E00;
pub const LOW_STUB_BASE: u32 = 0x0002_0000;
pub const CONVEN_END: u32 = 0x0008_0000;
pub const EBDA_BASE: u32 = CONVEN_END;
pub const VGABIOS_START: u32 = 0x000C_0000;
pub const VGABIOS_END: u32 = 0x000C_8000;
pub const BIOSROM_START: u32 = VGABIOS_END;
pub const BIOSROM_END: u32 = 0x0010_0000;

/// Size of the POST memory pool reserved at the top of 32-bit RAM.
pub const HIPMM_SIZE: u32 = 0x0040_0000;

/// Capacity of the E820 array inside the low stub.
pub const E820_MAX_ENTRIES: usize = 32;


/// Tunables for one bridge run.
#[derive(Clone, Copy, Debug)]
pub struct BridgeConfig {
    /// Start of the low PMM pool; `None` puts it right after the low stub.
    pub low_pmm_base: Option<u32>,
    /// Size of the reserved high PMM pool.
    pub hi_pmm_size: u32,
    /// Accept a "$EFI" candidate only if its checksum is valid.
    pub validate_table_checksums: bool,
    /// Halt when no RAM region can hold the high PMM pool.
    pub require_high_pool: bool,
    pub console_fg: u32,
    pub console_bg: u32,
    pub log_level: LevelFilter,
}

impl BridgeConfig {
    pub const DEFAULT: Self = Self {
	low_pmm_base: None,
	hi_pmm_size: HIPMM_SIZE,
	validate_table_checksums: false,
	require_high_pool: false,
	console_fg: 0xFFFF_FFFF,
	console_bg: 0x0000_0000,
	log_level: LevelFilter::Info,
    };
}

impl Default for BridgeConfig {
    fn default() -> Self {
	Self::DEFAULT
    }
}
