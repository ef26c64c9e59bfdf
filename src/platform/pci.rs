//
// PCI configuration mechanism #1: display controller lookup for the VGA
// option ROM dispatch, and the PAM registers that shadow 0xC0000-0xFFFFF.
//

use crate::bios::patch::ImagePatch;
use crate::bios::vga_table::VgaTable;
use crate::firmware::DisplayMode;
use crate::x86::port::{inl, outl};

use super::{PciLocation, VideoProvider, VideoSetup};


const PCI_CONFIG_ADDRESS: u16 = 0xCF8;
const PCI_CONFIG_DATA: u16 = 0xCFC;

const CLASS_DISPLAY: u8 = 0x03;

const VENDOR_INTEL: u16 = 0x8086;
const DEVICE_I440FX: u16 = 0x1237;
const DEVICE_Q35: u16 = 0x29C0;


fn config_address(loc: PciLocation, offset: u8) -> u32 {
    0x8000_0000
	| (loc.bus as u32) << 16
	| (loc.device as u32) << 11
	| (loc.function as u32) << 8
	| (offset as u32 & 0xFC)
}

pub fn read32(loc: PciLocation, offset: u8) -> u32 {
    unsafe {
	outl(PCI_CONFIG_ADDRESS, config_address(loc, offset));
	inl(PCI_CONFIG_DATA)
    }
}

pub fn write8(loc: PciLocation, offset: u8, value: u8) {
    let shift = (offset & 3) * 8;
    let current = read32(loc, offset);
    let updated = current & !(0xFF << shift) | (value as u32) << shift;
    unsafe {
	outl(PCI_CONFIG_ADDRESS, config_address(loc, offset));
	outl(PCI_CONFIG_DATA, updated);
    }
}

fn exists(loc: PciLocation) -> bool {
    read32(loc, 0x00) & 0xFFFF != 0xFFFF
}


/// First display controller in bus order.
pub fn find_display_controller() -> Option<PciLocation> {
    for bus in 0..=255u8 {
	for device in 0..32u8 {
	    let dev0 = PciLocation { bus, device, function: 0 };
	    if !exists(dev0) {
		continue;
	    }
	    let multifunction = read32(dev0, 0x0C) >> 16 & 0x80 != 0;
	    let functions = if multifunction { 8 } else { 1 };

	    for function in 0..functions {
		let loc = PciLocation { bus, device, function };
		if function > 0 && !exists(loc) {
		    continue;
		}
		let class = (read32(loc, 0x08) >> 24) as u8;
		if class == CLASS_DISPLAY {
		    return Some(loc);
		}
	    }
	}
    }
    None
}


/// Makes the legacy BIOS area read/write through the host bridge PAM
/// registers.  PAM0 covers 0xF0000 in its high nibble; PAM1-6 cover
/// 0xC0000-0xEFFFF two 16 KiB halves each.
pub fn unlock_shadow_ram() -> bool {
    let host = PciLocation::default();
    let id = read32(host, 0x00);
    let (vendor, device) = (id as u16, (id >> 16) as u16);

    let pam0 = match (vendor, device) {
	(VENDOR_INTEL, DEVICE_I440FX) => 0x59,
	(VENDOR_INTEL, DEVICE_Q35) => 0x90,
	(VENDOR_INTEL, _) => 0x80,
	_ => {
	    log::warn!("host bridge {:04x}:{:04x} has no known PAM registers",
		       vendor, device);
	    return false;
	},
    };

    write8(host, pam0, 0x30);
    for pam in pam0 + 1 ..= pam0 + 6 {
	write8(host, pam, 0x33);
    }
    log::debug!("shadow RAM unlocked through PAM at {:#x}", pam0);
    true
}


/// Video bring-up over the framebuffer the loader left behind.
pub struct PciVideo;

impl VideoProvider for PciVideo {
    fn init(&mut self, vga_table: &VgaTable, mode: &DisplayMode) -> VideoSetup {
	let pci = find_display_controller().unwrap_or_else(|| {
	    log::warn!("no PCI display controller; dispatching VGA BIOS for 00:00.0");
	    PciLocation::default()
	});
	log::info!("display controller at {:02x}:{:02x}.{}",
		   pci.bus, pci.device, pci.function);

	let vga_patch = if mode.base != 0 {
	    vga_table.framebuffer_patch(mode)
	} else {
	    log::warn!("loader left no framebuffer for the VGA BIOS");
	    ImagePatch::new(vga_table.offset)
	};

	VideoSetup { pci, vga_patch }
    }
}
