use crate::error::Halt;


/// Idles forever.  The only way a bridge run ends.
pub fn halt_forever(halt: Halt) -> ! {
    match halt {
	Halt::HandedOff => log::info!("legacy BIOS returned from Boot; idling"),
	Halt::Fatal(err) => log::error!("halting: {}", err),
    }
    idle_forever()
}

/// Parks the processor with interrupts off.
pub fn idle_forever() -> ! {
    loop {
	idle();
    }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
#[inline]
fn idle() {
    unsafe {
	core::arch::asm!("cli", "hlt", options(nomem, nostack));
    }
}

#[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
#[inline]
fn idle() {
    core::hint::spin_loop();
}
