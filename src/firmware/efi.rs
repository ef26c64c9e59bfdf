//
// The subset of EFI data structures the bridge reads.
//
// Supplementary Resource:
//	UEFI Specification 2.10, 7.2 (GetMemoryMap) and 4.6 (Configuration Table)
//

use core::mem::size_of;
use core::ptr;
use core::slice;

use static_assertions::assert_eq_size;


pub const PAGE_SIZE: u64 = 4096;


#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Guid {
    pub data1: u32,
    pub data2: u16,
    pub data3: u16,
    pub data4: [u8; 8],
}

impl Guid {
    pub const fn new(data1: u32, data2: u16, data3: u16, data4: [u8; 8])
		     -> Self {
	Self { data1, data2, data3, data4 }
    }
}

pub const ACPI_TABLE_GUID: Guid =
    Guid::new(0xeb9d2d30, 0x2d88, 0x11d3,
	      [0x9a, 0x16, 0x00, 0x90, 0x27, 0x3f, 0xc1, 0x4d]);
pub const ACPI_20_TABLE_GUID: Guid =
    Guid::new(0x8868e871, 0xe4f1, 0x11d3,
	      [0xbc, 0x22, 0x00, 0x80, 0xc7, 0x3c, 0x88, 0x81]);
pub const SMBIOS_TABLE_GUID: Guid =
    Guid::new(0xeb9d2d31, 0x2d88, 0x11d3,
	      [0x9a, 0x16, 0x00, 0x90, 0x27, 0x3f, 0xc1, 0x4d]);
pub const SMBIOS3_TABLE_GUID: Guid =
    Guid::new(0xf2fd1544, 0x9794, 0x4a2c,
	      [0x99, 0x2e, 0xe5, 0xbb, 0xcf, 0x20, 0xe3, 0x94]);


/// EFI memory types, in firmware numbering.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemoryType {
    Reserved = 0,
    LoaderCode = 1,
    LoaderData = 2,
    BootServicesCode = 3,
    BootServicesData = 4,
    RuntimeServicesCode = 5,
    RuntimeServicesData = 6,
    Conventional = 7,
    Unusable = 8,
    AcpiReclaim = 9,
    AcpiNvs = 10,
    MemoryMappedIo = 11,
    MemoryMappedIoPortSpace = 12,
    PalCode = 13,
    Persistent = 14,
    Unaccepted = 15,
}

impl MemoryType {
    pub const fn from_raw(raw: u32) -> Option<Self> {
	Some(match raw {
	    0 => Self::Reserved,
	    1 => Self::LoaderCode,
	    2 => Self::LoaderData,
	    3 => Self::BootServicesCode,
	    4 => Self::BootServicesData,
	    5 => Self::RuntimeServicesCode,
	    6 => Self::RuntimeServicesData,
	    7 => Self::Conventional,
	    8 => Self::Unusable,
	    9 => Self::AcpiReclaim,
	    10 => Self::AcpiNvs,
	    11 => Self::MemoryMappedIo,
	    12 => Self::MemoryMappedIoPortSpace,
	    13 => Self::PalCode,
	    14 => Self::Persistent,
	    15 => Self::Unaccepted,
	    _ => return None,
	})
    }
}


#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemoryDescriptor {
    pub ty: u32,		// 00-03
    pub pad: u32,		// 04-07
    pub physical_start: u64,	// 08-0F
    pub virtual_start: u64,	// 10-17
    pub number_of_pages: u64,	// 18-1F
    pub attribute: u64,		// 20-27
}

assert_eq_size!(MemoryDescriptor, [u8; 0x28]);

impl MemoryDescriptor {
    pub fn end(&self) -> u64 {
	self.physical_start
	    .wrapping_add(self.number_of_pages.wrapping_mul(PAGE_SIZE))
    }
}


/// The memory map as handed over by the loader: a byte range holding
/// descriptors `desc_size` bytes apart.
///
/// `desc_size` comes from the firmware and may exceed
/// `size_of::<MemoryDescriptor>()`; it is never assumed.
#[derive(Clone, Copy)]
pub struct MemoryMap<'a> {
    bytes: &'a [u8],
    desc_size: usize,
}

impl<'a> MemoryMap<'a> {
    /// Returns `None` when the stride cannot hold a descriptor.
    pub fn new(bytes: &'a [u8], desc_size: usize) -> Option<Self> {
	if desc_size < size_of::<MemoryDescriptor>() {
	    return None;
	}
	Some(Self { bytes, desc_size })
    }

    /// Views a memory map in physical memory.
    ///
    /// # Safety
    ///
    /// `addr .. addr + size` must be readable for `'a`.
    pub unsafe fn from_raw(addr: usize, size: usize, desc_size: usize)
			   -> Option<Self> {
	if addr == 0 {
	    return None;
	}
	Self::new(slice::from_raw_parts(addr as *const u8, size), desc_size)
    }

    pub fn len(&self) -> usize {
	self.bytes.len() / self.desc_size
    }

    pub fn is_empty(&self) -> bool {
	self.len() == 0
    }

    pub fn iter(&self) -> MemoryMapIter<'a> {
	MemoryMapIter {
	    bytes: self.bytes,
	    desc_size: self.desc_size,
	}
    }
}

impl core::fmt::Debug for MemoryMap<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
	f.debug_struct("MemoryMap")
	    .field("addr", &self.bytes.as_ptr())
	    .field("entries", &self.len())
	    .field("desc_size", &self.desc_size)
	    .finish()
    }
}

pub struct MemoryMapIter<'a> {
    bytes: &'a [u8],
    desc_size: usize,
}

impl<'a> Iterator for MemoryMapIter<'a> {
    type Item = MemoryDescriptor;

    fn next(&mut self) -> Option<MemoryDescriptor> {
	if self.bytes.len() < size_of::<MemoryDescriptor>() {
	    return None;
	}
	let desc = unsafe {
	    ptr::read_unaligned(self.bytes.as_ptr() as *const MemoryDescriptor)
	};
	let advance = self.desc_size.min(self.bytes.len());
	self.bytes = &self.bytes[advance..];
	Some(desc)
    }
}


#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct TableHeader {
    pub signature: u64,
    pub revision: u32,
    pub header_size: u32,
    pub crc32: u32,
    pub reserved: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct ConfigurationTable {
    pub vendor_guid: Guid,
    pub vendor_table: usize,
}

/// EFI system table.  Pointers are native-width: the firmware and the
/// bridge must share the same word size.
#[repr(C)]
pub struct SystemTable {
    pub hdr: TableHeader,
    pub firmware_vendor: usize,
    pub firmware_revision: u32,
    pub console_in_handle: usize,
    pub con_in: usize,
    pub console_out_handle: usize,
    pub con_out: usize,
    pub standard_error_handle: usize,
    pub std_err: usize,
    pub runtime_services: usize,
    pub boot_services: usize,
    pub number_of_table_entries: usize,
    pub configuration_table: usize,
}

pub const SYSTEM_TABLE_SIGNATURE: u64 = 0x5453_5953_2049_4249; // "IBI SYST"

impl SystemTable {
    pub fn is_valid(&self) -> bool {
	self.hdr.signature == SYSTEM_TABLE_SIGNATURE
    }

    /// # Safety
    ///
    /// The configuration table pointer and count must describe readable
    /// memory for as long as `self` is borrowed.
    pub unsafe fn configuration_tables(&self) -> &[ConfigurationTable] {
	if self.configuration_table == 0 {
	    return &[];
	}
	slice::from_raw_parts(self.configuration_table
			      as *const ConfigurationTable,
			      self.number_of_table_entries)
    }
}


/// Finds a vendor table by GUID in the configuration table.
pub fn find_config_table(tables: &[ConfigurationTable], guid: &Guid)
			 -> Option<usize> {
    tables.iter()
	.find(|entry| entry.vendor_guid == *guid)
	.map(|entry| entry.vendor_table)
}


#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Serializes descriptors with the given stride, as firmware would.
    pub(crate) fn raw_map(descs: &[MemoryDescriptor], stride: usize)
			  -> Vec<u8> {
	let mut bytes = vec![0u8; descs.len() * stride];
	for (i, desc) in descs.iter().enumerate() {
	    let at = &mut bytes[i * stride..];
	    at[0..4].copy_from_slice(&desc.ty.to_ne_bytes());
	    at[8..16].copy_from_slice(&desc.physical_start.to_ne_bytes());
	    at[16..24].copy_from_slice(&desc.virtual_start.to_ne_bytes());
	    at[24..32].copy_from_slice(&desc.number_of_pages.to_ne_bytes());
	    at[32..40].copy_from_slice(&desc.attribute.to_ne_bytes());
	}
	bytes
    }

    pub(crate) fn desc(ty: MemoryType, start: u64, pages: u64)
		       -> MemoryDescriptor {
	MemoryDescriptor {
	    ty: ty as u32,
	    physical_start: start,
	    number_of_pages: pages,
	    ..Default::default()
	}
    }

    #[test]
    fn iterates_at_firmware_stride() {
	let descs = [
	    desc(MemoryType::Conventional, 0x1000, 2),
	    desc(MemoryType::AcpiNvs, 0x8000_0000, 1),
	];
	let bytes = raw_map(&descs, 48);
	let map = MemoryMap::new(&bytes, 48).unwrap();

	assert_eq!(map.len(), 2);
	assert_eq!(map.iter().collect::<Vec<_>>(), descs);
    }

    #[test]
    fn rejects_stride_smaller_than_descriptor() {
	assert!(MemoryMap::new(&[0u8; 64], 32).is_none());
    }

    #[test]
    fn ignores_trailing_partial_descriptor() {
	let mut bytes = raw_map(&[desc(MemoryType::LoaderData, 0, 1)], 40);
	bytes.extend_from_slice(&[0xaa; 12]);
	let map = MemoryMap::new(&bytes, 40).unwrap();
	assert_eq!(map.iter().count(), 1);
    }

    #[test]
    fn memory_type_numbering_matches_firmware() {
	assert_eq!(MemoryType::from_raw(7), Some(MemoryType::Conventional));
	assert_eq!(MemoryType::from_raw(15), Some(MemoryType::Unaccepted));
	assert_eq!(MemoryType::from_raw(16), None);
	assert_eq!(MemoryType::from_raw(0x8000_0000), None);
    }

    #[test]
    fn finds_config_table_by_guid() {
	let tables = [
	    ConfigurationTable { vendor_guid: ACPI_20_TABLE_GUID,
				 vendor_table: 0xe_0000 },
	    ConfigurationTable { vendor_guid: SMBIOS_TABLE_GUID,
				 vendor_table: 0xf_0000 },
	];
	assert_eq!(find_config_table(&tables, &SMBIOS_TABLE_GUID),
		   Some(0xf_0000));
	assert_eq!(find_config_table(&tables, &SMBIOS3_TABLE_GUID), None);
    }
}
