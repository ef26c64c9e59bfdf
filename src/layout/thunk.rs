use core::mem::{offset_of, size_of};

use crate::x86::X86FarPtr;


pub const THUNK_CODE_SIZE: usize = 0x200;
pub const THUNK_STACK_SIZE: usize = 0x1000;

//
// Segment selectors of the thunk GDT
//	0x08 : 32-bit code, flat
//	0x10 : 32-bit data, flat
//	0x18 : 16-bit code, base = thunk, limit 64KiB
//	0x20 : 16-bit data, base = thunk, limit 64KiB
//
pub const SEL_CODE32: u16 = 0x08;
pub const SEL_DATA32: u16 = 0x10;
pub const SEL_CODE16: u16 = 0x18;
pub const SEL_DATA16: u16 = 0x20;

const GDT_ENTRIES: usize = 5;


/// Operand of LGDT/LIDT/SGDT/SIDT.
#[repr(C, packed)]
#[derive(Clone, Copy, Debug, Default)]
pub struct DescriptorPtr {
    pub limit: u16,
    pub base: u32,
}


/// Request and save area of the real-mode thunk.
#[repr(C, packed)]
#[derive(Clone, Copy, Debug, Default)]
pub struct ThunkFrame {		// Offset:
    pub gdt: [u64; GDT_ENTRIES],	// 00-27 : Thunk GDT
    pub gdtr: DescriptorPtr,	// 28-2D : Points at `gdt`
    pub real_idtr: DescriptorPtr,	// 2E-33 : Real-mode IVT
    pub saved_gdtr: DescriptorPtr,	// 34-39 : Caller GDTR
    pub saved_idtr: DescriptorPtr,	// 3A-3F : Caller IDTR
    pub saved_esp: u32,		// 40-43 : Caller ESP
    pub saved_cs: u16,		// 44-45 : Caller CS
    pub saved_ds: u16,		// 46-47 : Caller DS
    pub saved_ss: u16,		// 48-49 : Caller SS
    pub target: X86FarPtr,	// 4A-4D : Far call target	(IN)
    pub ax: u16,		// 4E-4F : AX			(IN)
    pub bx: u16,		// 50-51 : BX			(IN)
    pub es: u16,		// 52-53 : ES			(IN)
}

const _: () = assert!(size_of::<ThunkFrame>() == 0x54);


/// The thunk area of the low stub: code, frame and real-mode stack.
#[repr(C, packed)]
pub struct LowMemoryThunk {
    pub code: [u8; THUNK_CODE_SIZE],
    pub frame: ThunkFrame,
    pub stack: [u8; THUNK_STACK_SIZE],
}

// Everything is reached through one real-mode segment.
const _: () = assert!(size_of::<LowMemoryThunk>() <= 0x1_0000);

impl LowMemoryThunk {
    pub const FRAME_OFFSET: usize = offset_of!(LowMemoryThunk, frame);
    pub const STACK_TOP: usize =
	offset_of!(LowMemoryThunk, stack) + THUNK_STACK_SIZE;

    /// Copies the trampoline and builds its descriptor tables for a thunk
    /// living at physical address `base`.
    ///
    /// Returns `false` if the code does not fit the code area.
    pub fn install(&mut self, code: &[u8], base: u32) -> bool {
	let Some(dest) = self.code.get_mut(..code.len()) else {
	    return false;
	};
	dest.copy_from_slice(code);

	let gdt_base = base + (Self::FRAME_OFFSET
			       + offset_of!(ThunkFrame, gdt)) as u32;
	self.frame.gdt = [
	    0,
	    descriptor(0, 0xF_FFFF, 0x9A, 0xC),
	    descriptor(0, 0xF_FFFF, 0x92, 0xC),
	    descriptor(base, 0xFFFF, 0x9A, 0x0),
	    descriptor(base, 0xFFFF, 0x92, 0x0),
	];
	self.frame.gdtr = DescriptorPtr {
	    limit: (GDT_ENTRIES * 8 - 1) as u16,
	    base: gdt_base,
	};
	self.frame.real_idtr = DescriptorPtr { limit: 0x3FF, base: 0 };
	true
    }

    /// Loads the far call request the trampoline consumes next.
    pub fn load_request(&mut self, target: X86FarPtr, ax: u16,
			params: Option<X86FarPtr>) {
	let params = params.unwrap_or_default();
	self.frame.target = target;
	self.frame.ax = ax;
	self.frame.es = params.segment;
	self.frame.bx = params.offset;
    }
}


/// Builds one segment descriptor.  `flags` is the high nibble of byte 6.
pub const fn descriptor(base: u32, limit: u32, access: u8, flags: u8) -> u64 {
    let base = base as u64;
    let limit = limit as u64;

    (limit & 0xFFFF)
	| (base & 0xFF_FFFF) << 16
	| (access as u64) << 40
	| ((limit >> 16) & 0xF) << 48
	| ((flags as u64) & 0xF) << 52
	| ((base >> 24) & 0xFF) << 56
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_descriptors_match_the_usual_encoding() {
	assert_eq!(descriptor(0, 0xF_FFFF, 0x9A, 0xC), 0x00CF_9A00_0000_FFFF);
	assert_eq!(descriptor(0, 0xF_FFFF, 0x92, 0xC), 0x00CF_9200_0000_FFFF);
	assert_eq!(descriptor(0x2_0000, 0xFFFF, 0x9A, 0), 0x0000_9A02_0000_FFFF);
    }

    #[test]
    fn frame_offsets_match_the_layout_comment() {
	assert_eq!(offset_of!(ThunkFrame, gdtr), 0x28);
	assert_eq!(offset_of!(ThunkFrame, saved_esp), 0x40);
	assert_eq!(offset_of!(ThunkFrame, target), 0x4A);
	assert_eq!(offset_of!(ThunkFrame, es), 0x52);
    }
}
