/*!

Boots a legacy CSM16 BIOS image, together with a VGA BIOS image, on a
machine that an EFI firmware has already handed over to us.

The bridge translates the firmware memory map into E820 form, lays out
the fixed low memory record the CSM16 image reads, installs both images
below 1 MiB and issues the four Compatibility16 calls that end in Boot.
It runs once, with no heap and no interrupts, and never returns.

 */

#![cfg_attr(not(test), no_std)]

pub mod bios;
pub mod bridge;
pub mod config;
pub mod error;
pub mod firmware;
pub mod layout;
pub mod logger;
pub mod mu;
pub mod platform;
pub mod sequencer;
pub mod text_writer;
pub mod x86;

pub use bridge::BridgeContext;
pub use config::BridgeConfig;
pub use error::{BridgeError, Halt};
