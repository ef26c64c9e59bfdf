//
// CSM16 interface tables (EFI Compatibility Support Module, 16-bit side)
//
// Layouts follow the Intel CSM specification 0.98 as packed records: the
// CSM16 image reads them byte for byte through the pointers we hand it.
//
// Supplementary Resource:
//	Intel Platform Innovation Framework for EFI, Compatibility Support
//	Module Specification, Version 0.98
//

use core::mem::size_of;

use static_assertions::assert_eq_size;

use super::locator;
use super::patch::ImagePatch;
use crate::x86::X86FarPtr;


pub const COMPATIBILITY16_SIGNATURE: u32 = locator::signature(b"$EFI");

pub const EFI_TO_LEGACY_MAJOR_VERSION: u16 = 0x02;
pub const EFI_TO_LEGACY_MINOR_VERSION: u16 = 0x00;

pub const MAX_IDE_CONTROLLER: usize = 8;


/// Function selectors passed in AX to the Compatibility16 entry point.
#[repr(u16)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Legacy16Function {
    InitializeYourself = 0x0000,
    UpdateBbs = 0x0001,
    PrepareToBoot = 0x0002,
    Boot = 0x0003,
    RetrieveLastBootDevice = 0x0004,
    DispatchOprom = 0x0005,
    GetTableAddress = 0x0006,
    SetKeyboardLeds = 0x0007,
    InstallPciHandler = 0x0008,
}


//
// EFI_COMPATIBILITY16_TABLE ("$EFI"), the part the bridge touches.
//
//	00-03 : Signature
//	04    : TableChecksum
//	05    : TableLength
//	0C-0D : Compatibility16CallSegment
//	0E-0F : Compatibility16CallOffset
//	10-11 : PnPInstallationCheckSegment
//	12-13 : PnPInstallationCheckOffset
//	22-25 : E820Pointer
//	26-29 : E820Length
//
pub mod field {
    pub const TABLE_CHECKSUM: usize = 0x04;
    pub const TABLE_LENGTH: usize = 0x05;
    pub const CALL_SEGMENT: usize = 0x0C;
    pub const CALL_OFFSET: usize = 0x0E;
    pub const PNP_SEGMENT: usize = 0x10;
    pub const PNP_OFFSET: usize = 0x12;
    pub const E820_POINTER: u16 = 0x22;
    pub const E820_LENGTH: u16 = 0x26;
}

/// Bytes of the table that must be present for the fields above.
const MIN_TABLE_LEN: usize = 0x2A;


/// The "$EFI" table as found inside the CSM16 image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Compat16Table {
    /// Offset of the table inside the CSM16 image.
    pub offset: usize,
    pub table_length: u8,
    pub entry: X86FarPtr,
    pub pnp_installation_check: X86FarPtr,
}

impl Compat16Table {
    /// Reads the table at `offset`; `None` if the image is too short.
    pub fn parse(image: &[u8], offset: usize) -> Option<Self> {
	let table = image.get(offset .. offset.checked_add(MIN_TABLE_LEN)?)?;
	let word = |at: usize| u16::from_le_bytes([table[at], table[at + 1]]);

	Some(Self {
	    offset,
	    table_length: table[field::TABLE_LENGTH],
	    entry: X86FarPtr::new(word(field::CALL_SEGMENT),
				  word(field::CALL_OFFSET)),
	    pnp_installation_check: X86FarPtr::new(word(field::PNP_SEGMENT),
						   word(field::PNP_OFFSET)),
	})
    }

    /// Checksum test for `locator::find_table_checked`: the `TableLength`
    /// bytes starting at the signature sum to zero.
    pub fn checksum_valid(window: &[u8]) -> bool {
	let Some(&len) = window.get(field::TABLE_LENGTH) else {
	    return false;
	};
	let len = len as usize;
	if len < MIN_TABLE_LEN {
	    return false;
	}
	window.get(..len)
	    .map(|bytes| bytes.iter().fold(0u8, |sum, b| sum.wrapping_add(*b)))
	    == Some(0)
    }

    /// Patch that tells the CSM16 image where the E820 map lives.
    pub fn e820_patch(&self, e820_addr: u32, entries: u32) -> ImagePatch {
	let length = entries * size_of::<super::e820::E820Entry>() as u32;
	ImagePatch::from_writes(self.offset, [
	    (field::E820_POINTER, e820_addr),
	    (field::E820_LENGTH, length),
	])
    }
}


/// EFI_TO_COMPATIBILITY16_INIT_TABLE
#[repr(C, packed)]
#[derive(Clone, Copy, Debug, Default)]
pub struct InitTable {
    pub bios_less_than_1mb: u32,
    pub hi_pmm_memory: u32,
    pub hi_pmm_memory_size_in_bytes: u32,
    pub reverse_thunk_call_segment: u16,
    pub reverse_thunk_call_offset: u16,
    pub number_e820_entries: u32,
    pub os_memory_above_1mb: u32,
    pub thunk_start: u32,
    pub thunk_size_in_bytes: u32,
    pub low_pmm_memory: u32,
    pub low_pmm_memory_size_in_bytes: u32,
}

assert_eq_size!(InitTable, [u8; 40]);


#[repr(C, packed)]
#[derive(Clone, Copy, Debug, Default)]
pub struct SerialPortInfo {
    pub address: u16,
    pub irq: u8,
    pub mode: u8,
}

#[repr(C, packed)]
#[derive(Clone, Copy, Debug, Default)]
pub struct ParallelPortInfo {
    pub address: u16,
    pub irq: u8,
    pub dma: u8,
    pub mode: u8,
}

#[repr(C, packed)]
#[derive(Clone, Copy, Debug, Default)]
pub struct FloppyInfo {
    pub address: u16,
    pub irq: u8,
    pub dma: u8,
    pub number_of_floppy: u8,
}

/// DEVICE_PRODUCER_DATA_HEADER
#[repr(C, packed)]
#[derive(Clone, Copy, Debug, Default)]
pub struct SioData {
    pub serial: [SerialPortInfo; 4],
    pub parallel: [ParallelPortInfo; 3],
    pub floppy: FloppyInfo,
    pub mouse_present: u8,
    pub flags: u8,
}

assert_eq_size!(SioData, [u8; 38]);

/// HDD_INFO; the two ATAPI identify blocks are kept opaque.
#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct HddInfo {
    pub status: u16,
    pub bus: u32,
    pub device: u32,
    pub function: u32,
    pub command_base_address: u16,
    pub control_base_address: u16,
    pub bus_master_address: u16,
    pub hdd_irq: u8,
    pub identify_drive: [[u16; 256]; 2],
}

assert_eq_size!(HddInfo, [u8; 1045]);

/// EFI_TO_COMPATIBILITY16_BOOT_TABLE
#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct BootTable {
    pub major_version: u16,
    pub minor_version: u16,
    pub acpi_table: u32,
    pub smbios_table: u32,
    pub smbios_table_length: u32,
    pub sio_data: SioData,
    pub device_path_type: u16,
    pub pci_irq_mask: u16,
    pub number_e820_entries: u32,
    pub hdd_info: [HddInfo; MAX_IDE_CONTROLLER],
    pub number_bbs_entries: u32,
    pub bbs_table: u32,
    pub smm_table: u32,
    pub os_memory_above_1mb: u32,
    pub unconventional_device_table: u32,
}

assert_eq_size!(BootTable, [u8; 8442]);

/// EFI_DISPATCH_OPROM_TABLE
#[repr(C, packed)]
#[derive(Clone, Copy, Debug, Default)]
pub struct DispatchOpromTable {
    pub pnp_installation_check_segment: u16,
    pub pnp_installation_check_offset: u16,
    pub oprom_segment: u16,
    pub pci_bus: u8,
    pub pci_device_function: u8,
    pub number_bbs_entries: u8,
    pub bbs_table_pointer: u32,
    pub runtime_segment: u16,
}

assert_eq_size!(DispatchOpromTable, [u8; 15]);


#[cfg(test)]
mod tests {
    use super::*;

    fn table_bytes() -> Vec<u8> {
	let mut t = vec![0u8; 0x40];
	t[0..4].copy_from_slice(b"$EFI");
	t[field::TABLE_LENGTH] = 0x40;
	t[field::CALL_SEGMENT..][..2].copy_from_slice(&0xf000u16.to_le_bytes());
	t[field::CALL_OFFSET..][..2].copy_from_slice(&0x1234u16.to_le_bytes());
	t[field::PNP_SEGMENT..][..2].copy_from_slice(&0xf000u16.to_le_bytes());
	t[field::PNP_OFFSET..][..2].copy_from_slice(&0x0420u16.to_le_bytes());
	let sum = t.iter().fold(0u8, |s, b| s.wrapping_add(*b));
	t[field::TABLE_CHECKSUM] = 0u8.wrapping_sub(sum);
	t
    }

    #[test]
    fn parses_entry_and_pnp_pointers() {
	let mut image = vec![0u8; 0x100];
	image[0x50..0x90].copy_from_slice(&table_bytes());

	let table = Compat16Table::parse(&image, 0x50).unwrap();
	assert_eq!(table.entry, X86FarPtr::new(0xf000, 0x1234));
	assert_eq!(table.pnp_installation_check, X86FarPtr::new(0xf000, 0x420));
	assert_eq!(table.table_length, 0x40);
    }

    #[test]
    fn short_image_does_not_parse() {
	let image = table_bytes();
	assert!(Compat16Table::parse(&image[..0x20], 0).is_none());
	assert!(Compat16Table::parse(&image, 0x30).is_none());
    }

    #[test]
    fn checksum_is_over_table_length_bytes() {
	let mut t = table_bytes();
	assert!(Compat16Table::checksum_valid(&t));
	t[0x30] ^= 0xff;
	assert!(!Compat16Table::checksum_valid(&t));
	assert!(!Compat16Table::checksum_valid(&t[..4]));
    }

    #[test]
    fn e820_patch_sets_pointer_and_byte_length() {
	let table = Compat16Table::parse(&table_bytes(), 0).unwrap();
	let patch = table.e820_patch(0x2_1000, 3);
	assert_eq!(patch.get_u32(field::E820_POINTER), Some(0x2_1000));
	assert_eq!(patch.get_u32(field::E820_LENGTH), Some(60));
    }
}
