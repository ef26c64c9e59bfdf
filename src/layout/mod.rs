/*!

The low memory window shared with the CSM16 image.

[`LowStub`] is the byte-exact record placed at `LOW_STUB_BASE`.  Every
pointer handed to the legacy side is computed from its field offsets, so
both sides agree on the layout without sharing any code.  [`prepare`]
fills it in and works out where everything else goes; nothing is copied
to the legacy areas until the sequencer runs.

 */


pub mod high_pool;
pub mod placement;
pub mod thunk;

use core::mem::{offset_of, size_of};
use core::ops::Range;
use core::ptr;

use static_assertions::const_assert;

use crate::bios::compat16::{self, BootTable, Compat16Table,
			    DispatchOpromTable, InitTable};
use crate::bios::e820::{self, E820Entry, Translation};
use crate::bios::locator;
use crate::bios::patch::ImagePatch;
use crate::bios::vga_table::{VgaTable, VGA_TABLE_SIGNATURE};
use crate::bridge::BridgeContext;
use crate::config::{BIOSROM_END, CONVEN_END, CONVEN_START, E820_MAX_ENTRIES,
		    LOW_STUB_BASE, VGABIOS_START};
use crate::error::{BridgeError, Conflict, TableKind};
use crate::platform::Collaborators;
use crate::x86::X86FarPtr;

pub use self::high_pool::ReservedHighPool;
pub use self::placement::{ImageSlot, Placement};
pub use self::thunk::LowMemoryThunk;


#[repr(C, packed)]
pub struct LowStub {
    pub thunk: LowMemoryThunk,
    pub init_table: InitTable,
    pub boot_table: BootTable,
    pub vga_oprom_table: DispatchOpromTable,
    pub e820_entries: u32,
    pub e820_map: [E820Entry; E820_MAX_ENTRIES],
}

const_assert!(size_of::<LowStub>() <= (CONVEN_END - LOW_STUB_BASE) as usize);

const fn field_addr(offset: usize) -> u32 {
    LOW_STUB_BASE + offset as u32
}

impl LowStub {
    pub const THUNK_ADDR: u32 = field_addr(offset_of!(LowStub, thunk));
    pub const INIT_TABLE_ADDR: u32 = field_addr(offset_of!(LowStub, init_table));
    pub const BOOT_TABLE_ADDR: u32 = field_addr(offset_of!(LowStub, boot_table));
    pub const OPROM_TABLE_ADDR: u32 =
	field_addr(offset_of!(LowStub, vga_oprom_table));
    pub const E820_MAP_ADDR: u32 = field_addr(offset_of!(LowStub, e820_map));
    pub const END: u32 = field_addr(size_of::<LowStub>());

    /// The window reserved for the stub and the low PMM pool.
    pub const fn window() -> Range<u32> {
	LOW_STUB_BASE..CONVEN_END
    }

    /// The stub at its fixed physical address.
    ///
    /// # Safety
    ///
    /// The window must be identity mapped RAM owned by the caller, and no
    /// other reference to it may exist.
    pub unsafe fn at_fixed_address() -> &'static mut LowStub {
	&mut *(LOW_STUB_BASE as usize as *mut LowStub)
    }

    /// Zeroes every byte of the stub.
    pub fn clear(&mut self) {
	// All-zero is a valid value for every field.
	unsafe {
	    ptr::write_bytes(self as *mut LowStub, 0, 1);
	}
    }

    /// The translated entries.
    pub fn e820(&self) -> &[E820Entry] {
	let count = (self.e820_entries as usize).min(E820_MAX_ENTRIES);
	&self.e820_map[..count]
    }
}


/// Everything the sequencer needs once the stub is filled in.
#[derive(Clone, Copy, Debug)]
pub struct PreparedLayout<'a> {
    pub placement: Placement,
    pub csm_image: &'a [u8],
    pub vgabios_image: &'a [u8],
    pub compat: Compat16Table,
    /// Writes into "$EFI", applied after the CSM16 image is installed.
    pub compat_patch: ImagePatch,
    /// Writes into "$VGT", applied after the VGA BIOS is installed.
    pub vga_patch: ImagePatch,
    pub e820: Translation,
    pub high_pool: Option<ReservedHighPool>,
}

impl PreparedLayout<'_> {
    pub fn entry(&self) -> X86FarPtr {
	self.compat.entry
    }
}


fn locate_compat16(ctx: &BridgeContext) -> Result<Compat16Table, BridgeError> {
    let image = ctx.csm_image;
    let offset = if ctx.config.validate_table_checksums {
	locator::find_table_checked(image, compat16::COMPATIBILITY16_SIGNATURE,
				    Compat16Table::checksum_valid)
    } else {
	locator::find_table(image, compat16::COMPATIBILITY16_SIGNATURE)
    };

    offset
	.and_then(|offset| Compat16Table::parse(image, offset))
	.ok_or(BridgeError::TableNotFound(TableKind::Compatibility16))
}

fn locate_vga(ctx: &BridgeContext) -> Result<VgaTable, BridgeError> {
    locator::find_table(ctx.vgabios_image, VGA_TABLE_SIGNATURE)
	.map(|offset| VgaTable { offset })
	.ok_or(BridgeError::TableNotFound(TableKind::Vga))
}

const fn align_up_paragraph(addr: u32) -> u32 {
    (addr + 0xF) & !0xF
}


/// Lays out low memory for one bridge run.
///
/// On success the stub holds the init, boot and option ROM tables, the
/// E820 map and the trampoline; the returned layout says where the images
/// go and what to patch into them.  Any error leaves the legacy areas
/// untouched.
pub fn prepare<'a>(ctx: &BridgeContext<'a>, stub: &mut LowStub,
		   collab: &mut Collaborators<'_>)
		   -> Result<PreparedLayout<'a>, BridgeError> {
    stub.clear();

    let placement = placement::resolve(ctx.csm_image.len(),
				       ctx.vgabios_image.len(),
				       LowStub::window())?;

    let compat = locate_compat16(ctx)?;
    let vga_table = locate_vga(ctx)?;
    log::debug!("$EFI at +{:#x}, entry {}; $VGT at +{:#x}",
		compat.offset, compat.entry, vga_table.offset);

    let acpi = collab.tables.acpi_rsdp().unwrap_or_else(|| {
	log::warn!("no ACPI RSDP published by the firmware");
	0
    });
    let smbios = collab.tables.smbios()?;
    let video = collab.video.init(&vga_table, &ctx.video);

    let e820 = e820::translate(&ctx.memory_map, &mut stub.e820_map);
    stub.e820_entries = e820.count as u32;
    let compat_patch = compat.e820_patch(LowStub::E820_MAP_ADDR,
					 stub.e820_entries);

    let hi_pmm_size = ctx.config.hi_pmm_size;
    let high_pool = high_pool::find_high_pool(stub.e820(), hi_pmm_size);
    match high_pool {
	Some(pool) => log::info!("high PMM pool at {:#x}, {:#x} bytes",
				 pool.base, pool.size),
	None if ctx.config.require_high_pool => {
	    return Err(BridgeError::NoHighPool);
	},
	None => log::warn!("no RAM region holds a {:#x} byte high PMM pool",
			   hi_pmm_size),
    }
    let memory_above_1mb = high_pool::memory_above_1mb(stub.e820());

    if !stub.thunk.install(ctx.thunk_code, LowStub::THUNK_ADDR) {
	return Err(BridgeError::LayoutConflict(
	    Conflict::ThunkTooLarge { len: ctx.thunk_code.len() }));
    }

    let low_pmm = ctx.config.low_pmm_base
	.unwrap_or(align_up_paragraph(LowStub::END));

    let init = &mut stub.init_table;
    init.bios_less_than_1mb = CONVEN_START;
    init.thunk_start = LowStub::THUNK_ADDR;
    init.thunk_size_in_bytes = size_of::<LowMemoryThunk>() as u32;
    init.low_pmm_memory = low_pmm;
    init.low_pmm_memory_size_in_bytes = CONVEN_END.saturating_sub(low_pmm);
    init.hi_pmm_memory = high_pool.map_or(0, |pool| pool.base as u32);
    init.hi_pmm_memory_size_in_bytes = high_pool.map_or(0, |pool| pool.size as u32);
    init.number_e820_entries = stub.e820_entries;
    init.os_memory_above_1mb = memory_above_1mb;

    let boot = &mut stub.boot_table;
    boot.major_version = compat16::EFI_TO_LEGACY_MAJOR_VERSION;
    boot.minor_version = compat16::EFI_TO_LEGACY_MINOR_VERSION;
    boot.acpi_table = acpi;
    boot.smbios_table = smbios.address;
    boot.smbios_table_length = smbios.length;
    boot.number_e820_entries = stub.e820_entries;
    boot.os_memory_above_1mb = memory_above_1mb;

    let oprom = &mut stub.vga_oprom_table;
    oprom.pnp_installation_check_segment = compat.pnp_installation_check.segment;
    oprom.pnp_installation_check_offset = compat.pnp_installation_check.offset;
    oprom.oprom_segment = (VGABIOS_START >> 4) as u16;
    oprom.pci_bus = video.pci.bus;
    oprom.pci_device_function = video.pci.devfn();

    log::info!("low stub {:#x}..{:#x}, low PMM {:#x}..{:#x}, CSM16 {:#x}..{:#x}",
	       LOW_STUB_BASE, LowStub::END, low_pmm, CONVEN_END,
	       placement.csm.base, BIOSROM_END);

    Ok(PreparedLayout {
	placement,
	csm_image: ctx.csm_image,
	vgabios_image: ctx.vgabios_image,
	compat,
	compat_patch,
	vga_patch: video.vga_patch,
	e820,
	high_pool,
    })
}
