//
// E820 memory map as the CSM16 image reads it, built from the EFI map.
//
// Supplementary Resources:
//	https://wiki.osdev.org/Detecting_Memory_(x86)
//	https://uefi.org/specs/ACPI/6.4/15_System_Address_Map_Interfaces/int-15h-e820h---query-system-address-map.html
//

use static_assertions::assert_eq_size;

use crate::firmware::efi::{MemoryMap, MemoryType};


#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum E820Type {
    Ram = 1,
    Reserved = 2,
    AcpiReclaim = 3,
    AcpiNvs = 4,
    Unusable = 5,
}

impl E820Type {
    /// Maps a firmware memory type.  Total: anything unknown is reserved.
    pub fn from_firmware(raw: u32) -> Self {
	match MemoryType::from_raw(raw) {
	    Some(ty) => Self::from_memory_type(ty),
	    None => {
		log::warn!("unknown EFI memory type {:#x}, treated as reserved",
			   raw);
		E820Type::Reserved
	    },
	}
    }

    pub fn from_memory_type(ty: MemoryType) -> Self {
	use MemoryType::*;

	match ty {
	    AcpiReclaim => E820Type::AcpiReclaim,
	    RuntimeServicesCode | RuntimeServicesData |
	    MemoryMappedIo | MemoryMappedIoPortSpace |
	    PalCode | Reserved => E820Type::Reserved,
	    LoaderCode | LoaderData |
	    BootServicesCode | BootServicesData |
	    Conventional => E820Type::Ram,
	    AcpiNvs => E820Type::AcpiNvs,
	    Unusable => E820Type::Unusable,
	    Persistent | Unaccepted => {
		log::warn!("EFI memory type {:?} treated as reserved", ty);
		E820Type::Reserved
	    },
	}
    }

    pub fn from_raw(raw: u32) -> Option<Self> {
	Some(match raw {
	    1 => E820Type::Ram,
	    2 => E820Type::Reserved,
	    3 => E820Type::AcpiReclaim,
	    4 => E820Type::AcpiNvs,
	    5 => E820Type::Unusable,
	    _ => return None,
	})
    }

    pub fn name(self) -> &'static str {
	match self {
	    E820Type::Ram => "Usable",
	    E820Type::Reserved => "Reserved",
	    E820Type::AcpiReclaim => "ACPI Reclaimable",
	    E820Type::AcpiNvs => "ACPI Non-Volatile Storage",
	    E820Type::Unusable => "Unusable",
	}
    }
}


#[repr(C, packed)]
#[derive(Clone, Copy, Default)]
pub struct E820Entry {
    pub addr: u64,	// 00-07: Base Address
    pub size: u64,	// 08-0F: Length in Bytes
    pub etype: u32,	// 10-13: Address Type
}

assert_eq_size!(E820Entry, [u8; 0x14]);

impl E820Entry {
    pub const SIZE: u32 = 0x14;

    pub fn new(addr: u64, size: u64, etype: E820Type) -> Self {
	Self {
	    addr,
	    size,
	    etype: etype as u32,
	}
    }

    pub fn end(&self) -> u64 {
	let (addr, size) = (self.addr, self.size);
	addr.saturating_add(size)
    }

    pub fn is_ram(&self) -> bool {
	let etype = self.etype;
	etype == E820Type::Ram as u32
    }
}

impl core::fmt::Debug for E820Entry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
	let (addr, size, etype) = (self.addr, self.size, self.etype);
	write!(f, "E820 [{:#x}-{:#x}] ", addr,
	       addr.wrapping_add(size).wrapping_sub(1))?;
	match E820Type::from_raw(etype) {
	    Some(ty) => f.write_str(ty.name()),
	    None => write!(f, "type {}", etype),
	}
    }
}

impl PartialEq for E820Entry {
    fn eq(&self, other: &Self) -> bool {
	let lhs = (self.addr, self.size, self.etype);
	let rhs = (other.addr, other.size, other.etype);
	lhs == rhs
    }
}

impl Eq for E820Entry {}


/// Outcome of one translation pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Translation {
    /// Entries written to the front of the output array.
    pub count: usize,
    /// The output filled up before every descriptor was visited.
    pub truncated: bool,
}


/// Converts the EFI memory map into E820 entries in `out`.
///
/// Descriptors are visited in firmware order.  A descriptor extends the
/// entry written just before it when both have the same type and touch;
/// no other merging happens.  Zero-length descriptors are skipped and do
/// not disturb that lookback.  Once `out` is full the pass stops.
pub fn translate(map: &MemoryMap, out: &mut [E820Entry]) -> Translation {
    let mut count = 0;
    let mut descs = map.iter();

    while count < out.len() {
	let Some(desc) = descs.next() else {
	    break;
	};

	let start = desc.physical_start;
	let end = desc.end();
	if start == end {
	    continue;
	}
	let etype = E820Type::from_firmware(desc.ty);

	if count > 0 {
	    let prev = &mut out[count - 1];
	    let prev_type = prev.etype;
	    if prev.end() == start && prev_type == etype as u32 {
		prev.size = prev.size.wrapping_add(end.wrapping_sub(start));
		continue;
	    }
	}

	out[count] = E820Entry::new(start, end.wrapping_sub(start), etype);
	count += 1;
    }

    // Only descriptors with bytes in them are lost.  One that would have
    // extended the last entry still counts: its range goes uncovered.
    let truncated = descs.any(|desc| desc.end() != desc.physical_start);
    if truncated {
	log::warn!("E820 map full at {} entries; remaining descriptors dropped",
		   out.len());
    }

    log::info!("E820 memory map created with {} entries", count);
    for entry in &out[..count] {
	log::debug!("{:?}", entry);
    }

    Translation { count, truncated }
}
