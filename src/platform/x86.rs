//
// The `Platform` of the production build: bare i686 with the low stub
// at its fixed address.
//

use core::slice;

use crate::bios::patch::ImagePatch;
use crate::layout::LowStub;
use crate::sequencer::InvocationRequest;
use crate::x86::port::outb;

use super::{pci, thunk, Platform};


pub struct X86Platform {
    _private: (),
}

impl X86Platform {
    /// # Safety
    ///
    /// Ring 0 with paging off and the legacy areas below 1 MiB unused by
    /// anything else.  Far calls are only valid with the stub at
    /// `LOW_STUB_BASE` once `layout::prepare` has filled it in.
    pub unsafe fn new() -> Self {
	Self { _private: () }
    }
}

impl Platform for X86Platform {
    fn disable_interrupts(&mut self) {
	unsafe {
	    core::arch::asm!("cli", options(nomem, nostack));
	}
    }

    fn write_port(&mut self, port: u16, value: u8) {
	unsafe {
	    outb(port, value);
	}
    }

    fn unlock_legacy_region(&mut self) {
	if !pci::unlock_shadow_ram() {
	    log::warn!("legacy BIOS area may still be read-only");
	}
    }

    fn install_image(&mut self, base: u32, image: &[u8], patch: &ImagePatch) {
	let dest = unsafe {
	    slice::from_raw_parts_mut(base as usize as *mut u8, image.len())
	};
	dest.copy_from_slice(image);

	let skipped = patch.apply(dest);
	if skipped != 0 {
	    log::warn!("{} patch writes fell outside the image at {:#x}",
		       skipped, base);
	}
    }

    fn far_call(&mut self, stub: &mut LowStub, request: &InvocationRequest) {
	stub.thunk.load_request(request.entry, request.function as u16,
				request.params);
	unsafe {
	    thunk::enter(stub);
	}
    }
}
