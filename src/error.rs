//
// Fatal conditions of the bridge and the ways a run can end.
//

use core::fmt;

use thiserror::Error;


/// Tables the bridge has to find before it can lay out low memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum TableKind {
    #[error("compatibility16 ($EFI)")]
    Compatibility16,
    #[error("VGA ($VGT)")]
    Vga,
    #[error("SMBIOS")]
    Smbios,
}


/// Placement problems detected before anything is copied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum Conflict {
    /// The CSM16 image would start below the end of the VGA BIOS.
    #[error("CSM16 image at {csm_base:#x} overlaps the VGA BIOS")]
    CsmBelowVgaBios { csm_base: u32 },
    /// The CSM16 image is larger than the whole BIOS ROM area.
    #[error("CSM16 image of {len:#x} bytes does not fit below 1MiB")]
    CsmTooLarge { len: usize },
    /// The VGA BIOS does not fit in its fixed slot.
    #[error("VGA BIOS of {len:#x} bytes does not fit its slot")]
    VgaBiosTooLarge { len: usize },
    /// The low stub window overlaps one of the placed images.
    #[error("low stub at {window:#x} overlaps image at {image:#x}")]
    WindowOverlap { window: u32, image: u32 },
    /// The real-mode trampoline does not fit its code area.
    #[error("thunk of {len:#x} bytes does not fit its code area")]
    ThunkTooLarge { len: usize },
}


#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error("{0} table not found")]
    TableNotFound(TableKind),
    #[error("layout conflict: {0}")]
    LayoutConflict(Conflict),
    #[error("no RAM region can hold the high PMM pool")]
    NoHighPool,
    #[error("invalid boot arguments: {0}")]
    InvalidBootArgs(&'static str),
}


/// Terminal states of a bridge run.  Every run ends in exactly one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Halt {
    /// The Boot call was issued; the legacy environment owns the machine.
    HandedOff,
    /// Setup failed before any legacy code ran.
    Fatal(BridgeError),
}

impl fmt::Display for Halt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
	match self {
	    Halt::HandedOff => f.write_str("handed off to legacy BIOS"),
	    Halt::Fatal(err) => write!(f, "fatal: {}", err),
	}
    }
}
