//
// Bridge driver: console, layout, handoff.  Every run ends in a `Halt`.
//

use crate::config::BridgeConfig;
use crate::error::Halt;
use crate::firmware::{DisplayMode, MemoryMap};
use crate::layout::{self, LowStub};
use crate::platform::{Collaborators, Platform};
use crate::sequencer::LegacyCallSequencer;


/// Inputs of one bridge run.  Built once at entry and only read after.
#[derive(Clone, Copy, Debug)]
pub struct BridgeContext<'a> {
    pub config: BridgeConfig,
    pub video: DisplayMode,
    pub memory_map: MemoryMap<'a>,
    pub csm_image: &'a [u8],
    pub vgabios_image: &'a [u8],
    /// Real-mode trampoline copied into the low stub.
    pub thunk_code: &'a [u8],
}


pub fn run<P: Platform + ?Sized>(ctx: &BridgeContext, stub: &mut LowStub,
				 collab: &mut Collaborators<'_>,
				 platform: &mut P) -> Halt {
    let config = &ctx.config;
    if collab.console.init(&ctx.video, config.console_fg, config.console_bg) {
	if ctx.video.is_text() {
	    collab.console.clear(config.console_bg);
	}
    } else {
	log::warn!("no usable framebuffer console");
    }

    log::info!("CSM16 image {:#x} bytes, VGA BIOS {:#x} bytes, {} memory descriptors",
	       ctx.csm_image.len(), ctx.vgabios_image.len(),
	       ctx.memory_map.len());

    let layout = match layout::prepare(ctx, stub, collab) {
	Ok(layout) => layout,
	Err(err) => {
	    log::error!("low memory layout failed: {}", err);
	    return Halt::Fatal(err);
	},
    };

    LegacyCallSequencer::new(platform, stub).run(&layout)
}
