use core::fmt;


/// X86 Far Pointer (i.e., segment and offset)
///
/// Laid out as in memory operands of far calls: offset, then segment.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct X86FarPtr {
    pub offset: u16,
    pub segment: u16,
}

impl X86FarPtr {
    pub const fn new(segment: u16, offset: u16) -> Self {
	Self {
	    offset,
	    segment,
	}
    }

    /// Converts a linear address into an X86 far pointer
    /// if the linear address is in 20-bit address space.
    ///
    /// The offset is kept within one paragraph, so the segment
    /// alone locates the object.
    pub const fn from_linear_addr(linear_addr: u32) -> Option<Self> {
	if linear_addr < (1_u32 << 20) {
	    Some(Self {
		offset: (linear_addr as u16) & 0x000f,
		segment: (linear_addr >> 4) as u16,
	    })
	} else {
	    None
	}
    }

    /// Converts the X86 far pointer into a linear address.
    pub const fn to_linear_addr(&self) -> u32 {
	((self.segment as u32) << 4) + self.offset as u32
    }
}


impl fmt::Display for X86FarPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
	write!(f, "{:04x}:{:04x}", self.segment, self.offset)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_address_round_trips_below_1mib() {
	let fp = X86FarPtr::from_linear_addr(0x2_0123).unwrap();
	assert_eq!(fp, X86FarPtr::new(0x2012, 0x3));
	assert_eq!(fp.to_linear_addr(), 0x2_0123);
    }

    #[test]
    fn addresses_above_1mib_have_no_far_pointer() {
	assert_eq!(X86FarPtr::from_linear_addr(0x10_0000), None);
    }

    #[test]
    fn display_is_segment_colon_offset() {
	assert_eq!(std::format!("{}", X86FarPtr::new(0xf000, 0x1c)),
		   "f000:001c");
    }
}
