//
// Placement of the embedded images below 1 MiB
//
//	VGA BIOS : VGABIOS_START, at most VGABIOS_END - VGABIOS_START bytes
//	CSM16    : ends exactly at BIOSROM_END
//

use core::ops::Range;

use crate::config::{BIOSROM_END, VGABIOS_END, VGABIOS_START};
use crate::error::{BridgeError, Conflict};


#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageSlot {
    pub base: u32,
    pub len: u32,
}

impl ImageSlot {
    pub fn end(&self) -> u32 {
	self.base + self.len
    }

    fn overlaps(&self, range: &Range<u32>) -> bool {
	self.len != 0 && self.base < range.end && range.start < self.end()
    }
}


#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Placement {
    pub vgabios: ImageSlot,
    pub csm: ImageSlot,
}


/// Decides where both images go.  Nothing is copied here: a conflict is
/// reported before either image touches memory.
pub fn resolve(csm_len: usize, vgabios_len: usize, window: Range<u32>)
	       -> Result<Placement, BridgeError> {
    let conflict = BridgeError::LayoutConflict;

    let vga_len = u32::try_from(vgabios_len)
	.ok()
	.filter(|len| *len <= VGABIOS_END - VGABIOS_START)
	.ok_or(conflict(Conflict::VgaBiosTooLarge { len: vgabios_len }))?;
    let vgabios = ImageSlot { base: VGABIOS_START, len: vga_len };

    let csm_base = u32::try_from(csm_len)
	.ok()
	.and_then(|len| BIOSROM_END.checked_sub(len))
	.ok_or(conflict(Conflict::CsmTooLarge { len: csm_len }))?;
    if csm_base < VGABIOS_END {
	return Err(conflict(Conflict::CsmBelowVgaBios { csm_base }));
    }
    let csm = ImageSlot { base: csm_base, len: BIOSROM_END - csm_base };

    for image in [&vgabios, &csm] {
	if image.overlaps(&window) {
	    return Err(conflict(Conflict::WindowOverlap {
		window: window.start,
		image: image.base,
	    }));
	}
    }

    log::debug!("VGA BIOS at {:#x}..{:#x}, CSM16 at {:#x}..{:#x}",
		vgabios.base, vgabios.end(), csm.base, csm.end());
    Ok(Placement { vgabios, csm })
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CONVEN_END, LOW_STUB_BASE};

    const WINDOW: Range<u32> = LOW_STUB_BASE..CONVEN_END;

    #[test]
    fn csm_is_placed_against_the_top() {
	let placement = resolve(0x2_0000, 0x8000, WINDOW).unwrap();
	assert_eq!(placement.csm, ImageSlot { base: 0xE_0000, len: 0x2_0000 });
	assert_eq!(placement.vgabios.base, VGABIOS_START);
	assert_eq!(placement.csm.end(), BIOSROM_END);
    }

    #[test]
    fn csm_may_end_right_at_the_vga_bios() {
	let placement = resolve(0x3_8000, 0x8000, WINDOW).unwrap();
	assert_eq!(placement.csm.base, VGABIOS_END);
    }

    #[test]
    fn csm_reaching_into_the_vga_bios_is_a_conflict() {
	assert_eq!(resolve(0x3_8001, 0x8000, WINDOW),
		   Err(BridgeError::LayoutConflict(
		       Conflict::CsmBelowVgaBios { csm_base: 0xC_7FFF })));
    }

    #[test]
    fn oversized_images_are_conflicts() {
	assert_eq!(resolve(0x10_0001, 0, WINDOW),
		   Err(BridgeError::LayoutConflict(
		       Conflict::CsmTooLarge { len: 0x10_0001 })));
	assert_eq!(resolve(0x1000, 0x8001, WINDOW),
		   Err(BridgeError::LayoutConflict(
		       Conflict::VgaBiosTooLarge { len: 0x8001 })));
    }

    #[test]
    fn window_overlapping_an_image_is_a_conflict() {
	assert_eq!(resolve(0x1_0000, 0x8000, 0xC_4000..0xC_6000),
		   Err(BridgeError::LayoutConflict(Conflict::WindowOverlap {
		       window: 0xC_4000,
		       image: VGABIOS_START,
		   })));
	assert!(matches!(resolve(0x1_0000, 0x8000, 0xF_8000..0xF_9000),
			 Err(BridgeError::LayoutConflict(
			     Conflict::WindowOverlap { image: 0xF_0000, .. }))));
    }
}
