//
// Port I/O
//

use core::arch::asm;


/// Reads a byte from an I/O port.
#[inline]
pub unsafe fn inb(port: u16) -> u8 {
    let value: u8;
    asm!("in al, dx",
	 out("al") value,
	 in("dx") port,
	 options(nomem, nostack, preserves_flags));
    value
}

/// Writes a byte to an I/O port.
#[inline]
pub unsafe fn outb(port: u16, value: u8) {
    asm!("out dx, al",
	 in("dx") port,
	 in("al") value,
	 options(nomem, nostack, preserves_flags));
}

/// Reads a double word from an I/O port.
#[inline]
pub unsafe fn inl(port: u16) -> u32 {
    let value: u32;
    asm!("in eax, dx",
	 out("eax") value,
	 in("dx") port,
	 options(nomem, nostack, preserves_flags));
    value
}

/// Writes a double word to an I/O port.
#[inline]
pub unsafe fn outl(port: u16, value: u32) {
    asm!("out dx, eax",
	 in("dx") port,
	 in("eax") value,
	 options(nomem, nostack, preserves_flags));
}
