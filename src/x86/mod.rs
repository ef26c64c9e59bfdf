pub mod far_ptr;
pub mod halt;
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub mod port;

pub use self::far_ptr::X86FarPtr;
pub use self::halt::{halt_forever, idle_forever};
