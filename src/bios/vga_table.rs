//
// VGA table ("$VGT") inside the VGA BIOS image
//
// The VGA BIOS shipped with the bridge drives the framebuffer the loader
// left behind instead of real VGA hardware.  It finds that framebuffer in
// this table:
//
//	00-03 : Signature "$VGT"
//	04-07 : Framebuffer base, low 32 bits
//	08-0B : Framebuffer base, high 32 bits
//	0C-0F : Width in pixels
//	10-13 : Height in pixels
//	14-17 : Bytes per scan line
//	18-1B : Bits per pixel
//

use super::locator;
use super::patch::ImagePatch;
use crate::firmware::DisplayMode;


pub const VGA_TABLE_SIGNATURE: u32 = locator::signature(b"$VGT");

pub mod field {
    pub const FB_BASE_LO: u16 = 0x04;
    pub const FB_BASE_HI: u16 = 0x08;
    pub const WIDTH: u16 = 0x0C;
    pub const HEIGHT: u16 = 0x10;
    pub const PITCH: u16 = 0x14;
    pub const DEPTH: u16 = 0x18;
}


#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VgaTable {
    /// Offset of the table inside the VGA BIOS image.
    pub offset: usize,
}

impl VgaTable {
    /// Describes the loader's framebuffer to the VGA BIOS.
    pub fn framebuffer_patch(&self, mode: &DisplayMode) -> ImagePatch {
	ImagePatch::from_writes(self.offset, [
	    (field::FB_BASE_LO, mode.base as u32),
	    (field::FB_BASE_HI, (mode.base >> 32) as u32),
	    (field::WIDTH, mode.width),
	    (field::HEIGHT, mode.height),
	    (field::PITCH, mode.pitch),
	    (field::DEPTH, mode.depth),
	])
    }
}
