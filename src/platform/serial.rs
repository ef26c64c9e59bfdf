//
// 16550 UART on COM1, the log sink of the production build.
//

use core::fmt;
use core::ptr;
use core::sync::atomic::{AtomicBool, Ordering};

use crate::x86::port::{inb, outb};


pub const COM1: u16 = 0x3F8;

const LSR_THR_EMPTY: u8 = 0x20;


pub struct SerialPort {
    base: u16,
}

impl SerialPort {
    /// Programs the UART for 115200 8N1 with FIFOs and no interrupts.
    ///
    /// # Safety
    ///
    /// `base` must be the I/O base of a 16550-compatible UART.
    pub unsafe fn init(base: u16) -> Self {
	outb(base + 1, 0x00);	// IER: no interrupts
	outb(base + 3, 0x80);	// LCR: DLAB
	outb(base, 0x01);	// DLL: divisor 1
	outb(base + 1, 0x00);	// DLM
	outb(base + 3, 0x03);	// LCR: 8N1
	outb(base + 2, 0xC7);	// FCR: enable and clear, 14-byte threshold
	outb(base + 4, 0x03);	// MCR: DTR, RTS
	Self { base }
    }

    fn write_byte(&mut self, byte: u8) {
	unsafe {
	    while inb(self.base + 5) & LSR_THR_EMPTY == 0 {
		core::hint::spin_loop();
	    }
	    outb(self.base, byte);
	}
    }
}

/// Bytes go out as given; `println!` already ends lines with CR LF.
impl fmt::Write for SerialPort {
    fn write_str(&mut self, s: &str) -> fmt::Result {
	for byte in s.bytes() {
	    self.write_byte(byte);
	}
	Ok(())
    }
}


static mut COM1_PORT: SerialPort = SerialPort { base: COM1 };
static COM1_TAKEN: AtomicBool = AtomicBool::new(false);

/// Initializes COM1 and hands out its only `'static` handle.
pub fn take_com1() -> Option<&'static mut SerialPort> {
    if COM1_TAKEN.swap(true, Ordering::AcqRel) {
	return None;
    }
    unsafe {
	let port = &mut *ptr::addr_of_mut!(COM1_PORT);
	*port = SerialPort::init(COM1);
	Some(port)
    }
}
