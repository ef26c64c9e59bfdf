/*!

The legacy side of the bridge: the tables inside the CSM16 and VGA BIOS
images, and the E820 map the CSM16 image consumes.

 */


pub mod compat16;
pub mod e820;
pub mod locator;
pub mod patch;
pub mod vga_table;

pub use compat16::{Compat16Table, Legacy16Function};
pub use e820::{E820Entry, E820Type, Translation};
pub use patch::ImagePatch;
pub use vga_table::VgaTable;
