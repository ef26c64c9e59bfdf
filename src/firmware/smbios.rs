//
// SMBIOS entry point discovery through the EFI configuration table.
//
// Supplementary Resource:
//	DMTF DSP0134, 5.2 (Table convention)
//

use core::slice;

use super::efi::{self, ConfigurationTable};
use crate::error::{BridgeError, TableKind};


#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SmbiosKind {
    /// 32-bit entry point, anchor "_SM_".
    V2,
    /// 64-bit entry point, anchor "_SM3_".
    V3,
}

impl SmbiosKind {
    fn anchor(self) -> &'static [u8] {
	match self {
	    SmbiosKind::V2 => b"_SM_",
	    SmbiosKind::V3 => b"_SM3_",
	}
    }

    fn length_offset(self) -> usize {
	match self {
	    SmbiosKind::V2 => 5,
	    SmbiosKind::V3 => 6,
	}
    }
}


#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SmbiosEntryPoint {
    pub kind: SmbiosKind,
    pub address: u32,
}

impl SmbiosEntryPoint {
    /// Reads the entry point length from its header bytes.
    pub fn length_from(&self, header: &[u8]) -> Option<u32> {
	let anchor = self.kind.anchor();
	if !header.starts_with(anchor) {
	    return None;
	}
	header.get(self.kind.length_offset()).map(|&len| len as u32)
    }

    /// Reads the entry point length in place.
    ///
    /// # Safety
    ///
    /// `address` must point to a readable entry point header.
    pub unsafe fn read_length(&self) -> Option<u32> {
	let header = slice::from_raw_parts(self.address as usize as *const u8,
					   self.kind.length_offset() + 1);
	self.length_from(header)
    }
}


/// Finds the SMBIOS entry point, preferring the 32-bit one legacy
/// software understands.
pub fn locate(tables: &[ConfigurationTable])
	      -> Result<SmbiosEntryPoint, BridgeError> {
    let candidates = [
	(SmbiosKind::V2, efi::SMBIOS_TABLE_GUID),
	(SmbiosKind::V3, efi::SMBIOS3_TABLE_GUID),
    ];

    for (kind, guid) in candidates {
	let Some(addr) = efi::find_config_table(tables, &guid) else {
	    continue;
	};
	match u32::try_from(addr) {
	    Ok(address) if address != 0 => {
		return Ok(SmbiosEntryPoint { kind, address });
	    },
	    _ => {
		log::warn!("SMBIOS {:?} entry point at {:#x} is unusable",
			   kind, addr);
	    },
	}
    }

    Err(BridgeError::TableNotFound(TableKind::Smbios))
}
