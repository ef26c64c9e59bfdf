//
// TextWriter - Formatted text output to the registered console sinks
//
// Every sink gets the same output.  Before a sink is registered (and
// whenever the sinks are busy) output is dropped, so printing is always
// safe to call.
//

use core::fmt;

use crate::mu::MuMutex;


pub type Sink = &'static mut (dyn fmt::Write + Send);

const MAX_SINKS: usize = 2;

static SINKS: MuMutex<[Option<Sink>; MAX_SINKS]> = MuMutex::new([None, None]);


/// Adds `sink` to the outputs of `print!`/`println!` (and therefore of
/// logging).  Returns `false` when every slot is taken.
pub fn add_sink(sink: Sink) -> bool {
    let mut sinks = SINKS.lock();
    match sinks.iter_mut().find(|slot| slot.is_none()) {
	Some(slot) => {
	    *slot = Some(sink);
	    true
	},
	None => false,
    }
}


pub struct TextWriter;

impl TextWriter {
    pub fn write_ascii_printables(&mut self, utf8_str: &str) -> fmt::Result {
	let Some(mut sinks) = SINKS.try_lock() else {
	    return Ok(());
	};

	let mut result = Ok(());
	for sink in sinks.iter_mut().flatten() {
	    // One failing sink does not starve the others.
	    for byte in utf8_str.bytes() {
		if sink.write_char(printable(byte) as char).is_err() {
		    result = Err(fmt::Error);
		    break;
		}
	    }
	}
	result
    }
}

impl fmt::Write for TextWriter {
    fn write_str(&mut self, utf8_str: &str) -> fmt::Result {
	self.write_ascii_printables(utf8_str)
    }
}

fn printable(byte: u8) -> u8 {
    match byte {
	0x20 ..= 0x7E | b'\n' | b'\r' => byte,
	_ => b'.'
    }
}


#[macro_export]
macro_rules! println {
    () => {
	$crate::print!("\r\n")
    };
    ( $($arg:tt)* ) => {
	$crate::print!("{}\r\n", format_args!( $($arg)* ))
    };
}

#[macro_export]
macro_rules! print {
    ( $($arg:tt)* ) => {
	$crate::text_writer::_text_print(format_args!( $($arg)* ))
    };
}

#[doc(hidden)]
pub fn _text_print(args: fmt::Arguments) {
    use core::fmt::Write;
    // Nothing useful can be done about a failing console.
    let _ = TextWriter.write_fmt(args);
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::string::String;

    #[test]
    fn non_printables_become_dots() {
	let out: Vec<u8> = b"ok\r\n\x00\x7f\xe2".iter()
	    .map(|&b| printable(b))
	    .collect();
	assert_eq!(out, b"ok\r\n...");
    }

    static CAPTURED: MuMutex<String> = MuMutex::new(String::new());

    struct Capture;

    impl fmt::Write for Capture {
	fn write_str(&mut self, s: &str) -> fmt::Result {
	    CAPTURED.lock().push_str(s);
	    Ok(())
	}
    }

    // The only test touching the global sinks.
    #[test]
    fn every_sink_receives_the_output() {
	assert!(add_sink(Box::leak(Box::new(Capture))));
	assert!(add_sink(Box::leak(Box::new(Capture))));
	assert!(!add_sink(Box::leak(Box::new(Capture))));

	crate::println!("E820 {}\t", 3);

	assert_eq!(*CAPTURED.lock(), "E820 3.\r\nE820 3.\r\n");
    }
}
