//
// Firmware table discovery through the EFI configuration table.
//

use crate::error::BridgeError;
use crate::firmware::efi::{self, ConfigurationTable};
use crate::firmware::smbios;

use super::{FirmwareTables, SmbiosInfo};


pub struct EfiConfigTables<'a> {
    tables: &'a [ConfigurationTable],
}

impl<'a> EfiConfigTables<'a> {
    /// # Safety
    ///
    /// The table pointers in `tables` must point to readable memory.
    pub unsafe fn new(tables: &'a [ConfigurationTable]) -> Self {
	Self { tables }
    }
}

impl FirmwareTables for EfiConfigTables<'_> {
    fn acpi_rsdp(&mut self) -> Option<u32> {
	let addr = efi::find_config_table(self.tables, &efi::ACPI_20_TABLE_GUID)
	    .or_else(|| efi::find_config_table(self.tables, &efi::ACPI_TABLE_GUID))?;

	match u32::try_from(addr) {
	    Ok(rsdp) if rsdp != 0 => Some(rsdp),
	    _ => {
		log::warn!("ACPI RSDP at {:#x} is out of reach", addr);
		None
	    },
	}
    }

    fn smbios(&mut self) -> Result<SmbiosInfo, BridgeError> {
	let entry = smbios::locate(self.tables)?;
	// The entry point address was vetted by `locate`.
	let length = unsafe { entry.read_length() }.unwrap_or_else(|| {
	    log::warn!("SMBIOS entry point at {:#x} has a bad anchor",
		       entry.address);
	    0
	});
	log::debug!("SMBIOS {:?} entry point at {:#x}, {} bytes",
		    entry.kind, entry.address, length);

	Ok(SmbiosInfo { address: entry.address, length })
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TableKind;
    use crate::firmware::efi::{ACPI_20_TABLE_GUID, ACPI_TABLE_GUID};

    fn table(guid: efi::Guid, addr: usize) -> ConfigurationTable {
	ConfigurationTable { vendor_guid: guid, vendor_table: addr }
    }

    #[test]
    fn prefers_the_acpi_20_rsdp() {
	let tables = [table(ACPI_TABLE_GUID, 0xE_0000),
		      table(ACPI_20_TABLE_GUID, 0x7FF7_E014)];
	let mut efi = unsafe { EfiConfigTables::new(&tables) };
	assert_eq!(efi.acpi_rsdp(), Some(0x7FF7_E014));

	let mut efi = unsafe { EfiConfigTables::new(&tables[..1]) };
	assert_eq!(efi.acpi_rsdp(), Some(0xE_0000));
    }

    #[test]
    fn missing_tables_are_reported() {
	let mut efi = unsafe { EfiConfigTables::new(&[]) };
	assert_eq!(efi.acpi_rsdp(), None);
	assert_eq!(efi.smbios(),
		   Err(BridgeError::TableNotFound(TableKind::Smbios)));
    }
}
