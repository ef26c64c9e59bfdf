//
// Framebuffer console over the linear framebuffer the loader left behind.
//
// Colours are given as 0xRRGGBBAA and packed into the channel layout of
// the framebuffer.  Text is drawn with the 8x8 glyphs of `font8x8`, one
// cell per character, scrolling up a line once the bottom row is full.
//
// There is one console.  `FramebufferConsole` is a handle on it: the
// bridge run sets it up through `Console`, the text writer prints through
// `fmt::Write`.
//

use core::fmt::{self, Write};
use core::ops::Range;
use core::ptr;
use core::sync::atomic::{AtomicBool, Ordering};

use font8x8::legacy::BASIC_LEGACY;

use crate::firmware::DisplayMode;
use crate::mu::MuMutex;

use super::Console;


const GLYPH_SIZE: usize = 8;


/// Bit position of each 8-bit channel inside a native pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelLayout {
    pub red_shift: u32,
    pub green_shift: u32,
    pub blue_shift: u32,
    pub reserved_shift: u32,
}

impl PixelLayout {
    /// Blue in the low byte, as GOP framebuffers are laid out.
    pub const XRGB8888: PixelLayout = PixelLayout {
	red_shift: 16,
	green_shift: 8,
	blue_shift: 0,
	reserved_shift: 24,
    };

    pub fn for_depth(depth: u32) -> Option<Self> {
	match depth {
	    32 => Some(Self::XRGB8888),
	    _ => None,
	}
    }

    /// 0xRRGGBBAA to a native pixel.
    pub const fn pack(&self, rgba: u32) -> u32 {
	((rgba >> 24) & 0xFF) << self.red_shift
	    | ((rgba >> 16) & 0xFF) << self.green_shift
	    | ((rgba >> 8) & 0xFF) << self.blue_shift
	    | (rgba & 0xFF) << self.reserved_shift
    }
}


#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Framebuffer {
    base: usize,
    pitch: usize,
    width: usize,
    height: usize,
    layout: PixelLayout,
}

impl Framebuffer {
    fn pixel(&self, x: usize, y: usize) -> *mut u32 {
	(self.base + y * self.pitch + x * 4) as *mut u32
    }

    fn fill_rows(&self, rows: Range<usize>, pixel: u32) {
	for y in rows {
	    for x in 0..self.width {
		unsafe {
		    ptr::write_volatile(self.pixel(x, y), pixel);
		}
	    }
	}
    }

    /// Moves pixel rows `lines..used` up to the top.
    fn scroll_up(&self, lines: usize, used: usize) {
	unsafe {
	    ptr::copy(self.pixel(0, lines) as *const u8,
		      self.base as *mut u8,
		      (used - lines) * self.pitch);
	}
    }
}


/// Text state of the console.
#[derive(Debug)]
pub struct TextConsole {
    fb: Option<Framebuffer>,
    fg: u32,
    bg: u32,
    col: usize,
    row: usize,
}

impl TextConsole {
    pub const fn new() -> Self {
	Self { fb: None, fg: 0, bg: 0, col: 0, row: 0 }
    }

    /// Takes over the framebuffer described by `mode`.  Returns `false`,
    /// leaving the console disabled, if it cannot hold a single cell.
    pub fn init(&mut self, mode: &DisplayMode, fg: u32, bg: u32) -> bool {
	self.fb = None;
	self.col = 0;
	self.row = 0;

	let Some(layout) = PixelLayout::for_depth(mode.depth) else {
	    return false;
	};
	let Ok(base) = usize::try_from(mode.base) else {
	    return false;
	};
	if base == 0
	    || (mode.pitch as u64) * (mode.height as u64) > mode.size
	    || (mode.pitch as u64) < (mode.width as u64) * 4
	    || (mode.width as usize) < GLYPH_SIZE
	    || (mode.height as usize) < GLYPH_SIZE {
	    return false;
	}

	self.fg = layout.pack(fg);
	self.bg = layout.pack(bg);
	self.fb = Some(Framebuffer {
	    base,
	    pitch: mode.pitch as usize,
	    width: mode.width as usize,
	    height: mode.height as usize,
	    layout,
	});
	true
    }

    /// Fills the screen with `color` and homes the cursor.
    pub fn clear(&mut self, color: u32) {
	let Some(fb) = self.fb else {
	    return;
	};
	fb.fill_rows(0..fb.height, fb.layout.pack(color));
	self.col = 0;
	self.row = 0;
    }

    pub fn write_byte(&mut self, byte: u8) {
	let Some(fb) = self.fb else {
	    return;
	};

	match byte {
	    b'\r' => self.col = 0,
	    b'\n' => self.line_feed(&fb),
	    _ => {
		if self.col == fb.width / GLYPH_SIZE {
		    self.col = 0;
		    self.line_feed(&fb);
		}
		self.draw_glyph(&fb, byte);
		self.col += 1;
	    },
	}
    }

    fn line_feed(&mut self, fb: &Framebuffer) {
	let rows = fb.height / GLYPH_SIZE;
	if self.row + 1 < rows {
	    self.row += 1;
	    return;
	}

	let used = rows * GLYPH_SIZE;
	fb.scroll_up(GLYPH_SIZE, used);
	fb.fill_rows(used - GLYPH_SIZE .. used, self.bg);
    }

    fn draw_glyph(&self, fb: &Framebuffer, byte: u8) {
	let glyph = BASIC_LEGACY.get(byte as usize).copied().unwrap_or_default();
	let x0 = self.col * GLYPH_SIZE;
	let y0 = self.row * GLYPH_SIZE;

	for (dy, bits) in glyph.into_iter().enumerate() {
	    // Bit 0 is the leftmost pixel.
	    for dx in 0..GLYPH_SIZE {
		let pixel = if (bits >> dx) & 1 != 0 { self.fg } else { self.bg };
		unsafe {
		    ptr::write_volatile(fb.pixel(x0 + dx, y0 + dy), pixel);
		}
	    }
	}
    }
}

impl fmt::Write for TextConsole {
    fn write_str(&mut self, s: &str) -> fmt::Result {
	for byte in s.bytes() {
	    self.write_byte(byte);
	}
	Ok(())
    }
}


static CONSOLE: MuMutex<TextConsole> = MuMutex::new(TextConsole::new());

/// Handle on the framebuffer console.
#[derive(Debug, Default)]
pub struct FramebufferConsole;

impl Console for FramebufferConsole {
    fn init(&mut self, mode: &DisplayMode, fg: u32, bg: u32) -> bool {
	CONSOLE.lock().init(mode, fg, bg)
    }

    fn clear(&mut self, color: u32) {
	CONSOLE.lock().clear(color);
    }
}

impl fmt::Write for FramebufferConsole {
    fn write_str(&mut self, s: &str) -> fmt::Result {
	// Output printed while the console is being set up is dropped.
	match CONSOLE.try_lock() {
	    Some(mut console) => console.write_str(s),
	    None => Ok(()),
	}
    }
}


static mut SINK: FramebufferConsole = FramebufferConsole;
static SINK_TAKEN: AtomicBool = AtomicBool::new(false);

/// The console as a text sink.  Prints nothing until `init` succeeds.
pub fn take_sink() -> Option<&'static mut FramebufferConsole> {
    if SINK_TAKEN.swap(true, Ordering::AcqRel) {
	return None;
    }
    unsafe {
	Some(&mut *ptr::addr_of_mut!(SINK))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::firmware::boot_args::DISPLAY_MODE_TEXT;

    const WHITE: u32 = 0xFFFF_FFFF;
    const BLACK: u32 = 0x0000_00FF;

    fn mode_over(buf: &mut [u32], width: u32, height: u32) -> DisplayMode {
	DisplayMode {
	    display_mode: DISPLAY_MODE_TEXT,
	    base: buf.as_mut_ptr() as usize as u64,
	    size: (buf.len() * 4) as u64,
	    pitch: width * 4,
	    width,
	    height,
	    depth: 32,
	}
    }

    /// The 8x8 cell at text position (col, row) as rows of on/off pixels.
    fn cell(buf: &[u32], width: usize, col: usize, row: usize, fg: u32)
	    -> [u8; 8] {
	let mut rows = [0u8; 8];
	for (dy, bits) in rows.iter_mut().enumerate() {
	    for dx in 0..8 {
		let at = (row * 8 + dy) * width + col * 8 + dx;
		if buf[at] == fg {
		    *bits |= 1 << dx;
		}
	    }
	}
	rows
    }

    #[test]
    fn packs_rgba_into_the_channel_layout() {
	let xrgb = PixelLayout::XRGB8888;
	assert_eq!(xrgb.pack(0x1234_5600), 0x0012_3456);
	assert_eq!(xrgb.pack(0x1234_56FF), 0xFF12_3456);

	let bgrx = PixelLayout {
	    red_shift: 0,
	    green_shift: 8,
	    blue_shift: 16,
	    reserved_shift: 24,
	};
	assert_eq!(bgrx.pack(0x1234_5600), 0x0056_3412);
	assert_eq!(PixelLayout::for_depth(16), None);
    }

    #[test]
    fn clear_fills_every_visible_pixel() {
	let mut buf = vec![0u32; 8 * 8];
	let mode = mode_over(&mut buf, 8, 8);
	let mut console = TextConsole::new();

	assert!(console.init(&mode, WHITE, 0));
	console.clear(0xAABB_CC00);
	assert!(buf.iter().all(|&p| p == 0x00AA_BBCC));
    }

    #[test]
    fn prints_glyphs_into_the_framebuffer() {
	let (width, height) = (32usize, 16usize);
	let mut buf = vec![0u32; width * height];
	let mode = mode_over(&mut buf, width as u32, height as u32);
	let mut console = TextConsole::new();
	assert!(console.init(&mode, WHITE, BLACK));

	write!(console, "Hi\r\nA").unwrap();

	let fg = PixelLayout::XRGB8888.pack(WHITE);
	assert_eq!(cell(&buf, width, 0, 0, fg), BASIC_LEGACY[b'H' as usize]);
	assert_eq!(cell(&buf, width, 1, 0, fg), BASIC_LEGACY[b'i' as usize]);
	assert_eq!(cell(&buf, width, 0, 1, fg), BASIC_LEGACY[b'A' as usize]);
	// Cells never written keep their old contents.
	assert!(buf[2 * 8..3 * 8].iter().all(|&p| p == 0));
    }

    #[test]
    fn long_lines_wrap_and_the_last_row_scrolls() {
	let (width, height) = (16usize, 16usize);
	let mut buf = vec![0u32; width * height];
	let mode = mode_over(&mut buf, width as u32, height as u32);
	let mut console = TextConsole::new();
	assert!(console.init(&mode, WHITE, BLACK));

	// Two columns and two rows: "CD" wraps onto row 1, "E" scrolls.
	write!(console, "ABCDE").unwrap();

	let fg = PixelLayout::XRGB8888.pack(WHITE);
	assert_eq!(cell(&buf, width, 0, 0, fg), BASIC_LEGACY[b'C' as usize]);
	assert_eq!(cell(&buf, width, 1, 0, fg), BASIC_LEGACY[b'D' as usize]);
	assert_eq!(cell(&buf, width, 0, 1, fg), BASIC_LEGACY[b'E' as usize]);
	assert_eq!(cell(&buf, width, 1, 1, fg), [0; 8]);
    }

    #[test]
    fn rejects_unusable_modes() {
	let mut buf = vec![0u32; 16 * 16];
	let mut console = TextConsole::new();

	let mut mode = mode_over(&mut buf, 16, 16);
	mode.depth = 16;
	assert!(!console.init(&mode, 0, 0));

	let mut mode = mode_over(&mut buf, 16, 16);
	mode.height = 17;
	assert!(!console.init(&mode, 0, 0));

	let mode = mode_over(&mut buf, 4, 4);
	assert!(!console.init(&mode, 0, 0));

	assert!(!console.init(&DisplayMode::default(), 0, 0));

	// A disabled console ignores everything.
	console.clear(WHITE);
	write!(console, "x").unwrap();
	assert!(buf.iter().all(|&p| p == 0));
    }

    #[test]
    fn the_sink_is_handed_out_once() {
	assert!(take_sink().is_some());
	assert!(take_sink().is_none());
    }
}
