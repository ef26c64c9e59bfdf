/*!

The seams between the bridge and the machine.

The layout and the handoff only talk to the outside world through the
traits below.  The `x86` module holds the implementations that touch
real hardware; tests drive the same code through recording mocks.

 */


use crate::bios::patch::ImagePatch;
use crate::bios::vga_table::VgaTable;
use crate::error::BridgeError;
use crate::firmware::DisplayMode;
use crate::layout::LowStub;
use crate::sequencer::InvocationRequest;

pub mod efi_tables;
pub mod framebuffer;
#[cfg(target_arch = "x86")]
pub mod pci;
#[cfg(target_arch = "x86")]
pub mod serial;
#[cfg(target_arch = "x86")]
pub mod thunk;
#[cfg(target_arch = "x86")]
pub mod x86;


/// Framebuffer console the loader left behind.
pub trait Console {
    /// Returns `false` when the display cannot be used as a console.
    fn init(&mut self, mode: &DisplayMode, fg: u32, bg: u32) -> bool;
    fn clear(&mut self, color: u32);
}


#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SmbiosInfo {
    pub address: u32,
    pub length: u32,
}

/// Discovery of the firmware tables legacy software looks for.
pub trait FirmwareTables {
    /// Physical address of the ACPI RSDP, if the firmware published one.
    fn acpi_rsdp(&mut self) -> Option<u32>;
    fn smbios(&mut self) -> Result<SmbiosInfo, BridgeError>;
}


#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PciLocation {
    pub bus: u8,
    pub device: u8,
    pub function: u8,
}

impl PciLocation {
    /// Device and function packed the way legacy tables carry them.
    pub fn devfn(&self) -> u8 {
	(self.device & 0x1F) << 3 | (self.function & 0x7)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VideoSetup {
    /// Display controller the VGA BIOS is dispatched for.
    pub pci: PciLocation,
    /// Writes into the "$VGT" table of the VGA BIOS.
    pub vga_patch: ImagePatch,
}

/// Video bring-up for the VGA BIOS.
pub trait VideoProvider {
    fn init(&mut self, vga_table: &VgaTable, mode: &DisplayMode) -> VideoSetup;
}


/// The collaborators a bridge run borrows for its whole duration.
pub struct Collaborators<'c> {
    pub console: &'c mut dyn Console,
    pub tables: &'c mut dyn FirmwareTables,
    pub video: &'c mut dyn VideoProvider,
}


/// Privileged machine operations of the handoff.
///
/// Implementations own the machine: every call has an immediate hardware
/// effect and none of them can fail in a way the bridge could recover from.
pub trait Platform {
    fn disable_interrupts(&mut self);
    fn write_port(&mut self, port: u16, value: u8);
    /// Makes the shadow RAM at 0xC0000..0x100000 writable.
    fn unlock_legacy_region(&mut self);
    /// Copies `image` to physical address `base`, then applies `patch`.
    fn install_image(&mut self, base: u32, image: &[u8], patch: &ImagePatch);
    /// Loads `request` into the thunk of `stub` and performs the real-mode
    /// far call, returning once the callee does.  The legacy side reads the
    /// stub during the call, so it must be the one `prepare` filled in.
    fn far_call(&mut self, stub: &mut LowStub, request: &InvocationRequest);
}
