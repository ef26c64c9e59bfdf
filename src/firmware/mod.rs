/*!

What the modern firmware leaves behind for us: boot arguments, the EFI
memory map and the EFI configuration table.

 */


pub mod boot_args;
pub mod efi;
pub mod smbios;

pub use boot_args::{BootArgs, DisplayMode};
pub use efi::{ConfigurationTable, MemoryDescriptor, MemoryMap, MemoryType};
pub use smbios::SmbiosEntryPoint;
