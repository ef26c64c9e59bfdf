//
// Boot arguments handed over by the external loader.
//

use super::efi::{MemoryMap, SystemTable};
use crate::error::BridgeError;


pub const DISPLAY_MODE_GRAPHICS: u32 = 1;
pub const DISPLAY_MODE_TEXT: u32 = 2;


/// Display mode the loader left the screen in.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DisplayMode {
    pub display_mode: u32,
    pub base: u64,
    pub size: u64,
    pub pitch: u32,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

impl DisplayMode {
    pub fn is_text(&self) -> bool {
	self.display_mode == DISPLAY_MODE_TEXT
    }
}


#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct BootArgs {
    pub revision: u16,
    pub version: u16,
    pub efi_mem_map_ptr: u32,
    pub efi_mem_map_size: u32,
    pub efi_mem_desc_size: u32,
    pub efi_mem_desc_version: u32,
    pub efi_system_table: u32,
    pub video: DisplayMode,
}

impl BootArgs {
    /// Views the firmware memory map described by the boot arguments.
    ///
    /// # Safety
    ///
    /// The pointer/size pair must describe readable memory for `'a`.
    pub unsafe fn memory_map<'a>(&self) -> Result<MemoryMap<'a>, BridgeError> {
	MemoryMap::from_raw(self.efi_mem_map_ptr as usize,
			    self.efi_mem_map_size as usize,
			    self.efi_mem_desc_size as usize)
	    .ok_or(BridgeError::InvalidBootArgs("memory map"))
    }

    /// # Safety
    ///
    /// `efi_system_table` must point to a live system table for `'a`.
    pub unsafe fn system_table<'a>(&self)
				   -> Result<&'a SystemTable, BridgeError> {
	let table = (self.efi_system_table as usize as *const SystemTable)
	    .as_ref()
	    .ok_or(BridgeError::InvalidBootArgs("system table"))?;
	if !table.is_valid() {
	    return Err(BridgeError::InvalidBootArgs("system table signature"));
	}
	Ok(table)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> BootArgs {
	BootArgs {
	    revision: 1,
	    version: 1,
	    efi_mem_map_ptr: 0,
	    efi_mem_map_size: 0,
	    efi_mem_desc_size: 48,
	    efi_mem_desc_version: 1,
	    efi_system_table: 0,
	    video: DisplayMode::default(),
	}
    }

    #[test]
    fn null_pointers_are_invalid_boot_args() {
	let ba = args();
	unsafe {
	    assert_eq!(ba.memory_map().err(),
		       Some(BridgeError::InvalidBootArgs("memory map")));
	    assert_eq!(ba.system_table().err(),
		       Some(BridgeError::InvalidBootArgs("system table")));
	}
    }

    #[test]
    fn text_mode_is_recognized() {
	let mode = DisplayMode { display_mode: DISPLAY_MODE_TEXT,
				 ..Default::default() };
	assert!(mode.is_text());
	let mode = DisplayMode { display_mode: DISPLAY_MODE_GRAPHICS, ..mode };
	assert!(!mode.is_text());
    }
}
