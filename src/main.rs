#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]

#[cfg(all(target_os = "none", not(target_arch = "x86")))]
compile_error!("the bridge image only targets i686 (config/i686-unknown-none.json)");


#[cfg(all(target_os = "none", target_arch = "x86"))]
mod entry {
    use core::panic::PanicInfo;

    use csm_bridge::bridge;
    use csm_bridge::firmware::BootArgs;
    use csm_bridge::layout::LowStub;
    use csm_bridge::logger;
    use csm_bridge::platform::efi_tables::EfiConfigTables;
    use csm_bridge::platform::framebuffer::{self, FramebufferConsole};
    use csm_bridge::platform::pci::PciVideo;
    use csm_bridge::platform::serial;
    use csm_bridge::platform::thunk;
    use csm_bridge::platform::x86::X86Platform;
    use csm_bridge::platform::Collaborators;
    use csm_bridge::text_writer;
    use csm_bridge::x86::{halt_forever, idle_forever};
    use csm_bridge::{BridgeConfig, BridgeContext, BridgeError, Halt};


    static CSM16_IMAGE: &[u8] =
	include_bytes!(concat!(env!("OUT_DIR"), "/csm16.bin"));
    static VGABIOS_IMAGE: &[u8] =
	include_bytes!(concat!(env!("OUT_DIR"), "/vgabios.bin"));


    #[panic_handler]
    fn panic(info: &PanicInfo) -> ! {
	log::error!("panic: {}", info);
	idle_forever();
    }


    /// Entered by the loader with the boot arguments it built.
    #[no_mangle]
    pub extern "C" fn csm_bridge_start(ba: *const BootArgs) -> ! {
	if let Some(com1) = serial::take_com1() {
	    text_writer::add_sink(com1);
	}
	if let Some(screen) = framebuffer::take_sink() {
	    text_writer::add_sink(screen);
	}

	let config = BridgeConfig::DEFAULT;
	// Only fails if a logger is already installed.
	let _ = logger::init(config.log_level);
	log::info!("csm_bridge {}", env!("CARGO_PKG_VERSION"));

	let halt = unsafe { boot(ba, &config) }.unwrap_or_else(|err| {
	    log::error!("cannot start: {}", err);
	    Halt::Fatal(err)
	});
	halt_forever(halt)
    }

    unsafe fn boot(ba: *const BootArgs, config: &BridgeConfig)
		   -> Result<Halt, BridgeError> {
	let ba = ba.as_ref()
	    .ok_or(BridgeError::InvalidBootArgs("null pointer"))?;
	log::debug!("boot arguments revision {}.{}", ba.revision, ba.version);

	let ctx = BridgeContext {
	    config: *config,
	    video: ba.video,
	    memory_map: ba.memory_map()?,
	    csm_image: CSM16_IMAGE,
	    vgabios_image: VGABIOS_IMAGE,
	    thunk_code: thunk::code(),
	};
	let system_table = ba.system_table()?;

	let mut console = FramebufferConsole;
	let mut tables = EfiConfigTables::new(system_table.configuration_tables());
	let mut video = PciVideo;
	let mut collab = Collaborators {
	    console: &mut console,
	    tables: &mut tables,
	    video: &mut video,
	};

	let mut platform = X86Platform::new();
	Ok(bridge::run(&ctx, LowStub::at_fixed_address(), &mut collab,
		       &mut platform))
    }
}


#[cfg(not(target_os = "none"))]
fn main() {
    eprintln!("csm_bridge runs as a freestanding image; build it with \
	       --target config/i686-unknown-none.json");
    std::process::exit(1);
}
