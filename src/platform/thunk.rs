//
// Real-mode far call trampoline
//
// The code below is assembled into the bridge image but only ever runs
// from the thunk area of the low stub, where `prepare` copies it.  It is
// entered with a near call from 32-bit protected mode and:
//
//	1. saves the caller's registers, stack, GDTR, IDTR and selectors;
//	2. loads the thunk GDT and drops to 16-bit protected mode (0x18/0x20);
//	3. clears CR0.PE/PG and far jumps to real mode at THUNK_ADDR >> 4;
//	4. loads the IVT, the real-mode stack and AX/ES:BX from the frame,
//	   then far calls the target;
//	5. sets CR0.PE, far jumps to flat 32-bit code (0x08/0x10);
//	6. restores the caller's descriptor tables, selectors and stack.
//
// Interrupts must be disabled by the caller; the trampoline never
// enables them.
//

use core::arch::global_asm;
use core::mem::offset_of;
use core::ptr;
use core::slice;

use crate::config::LOW_STUB_BASE;
use crate::layout::thunk::{ThunkFrame, SEL_CODE16, SEL_CODE32, SEL_DATA16,
			   SEL_DATA32};
use crate::layout::{LowMemoryThunk, LowStub};


global_asm!(
    ".pushsection .text.csm_thunk, \"ax\"",
    ".code32",
    ".global csm_thunk_start",
    ".global csm_thunk_end",
    "csm_thunk_start:",
    "push ebp",
    "push ebx",
    "push esi",
    "push edi",
    "pushfd",
    "mov dword ptr [{base} + {frame} + {saved_esp}], esp",
    "sgdt [{base} + {frame} + {saved_gdtr}]",
    "sidt [{base} + {frame} + {saved_idtr}]",
    "mov ax, cs",
    "mov word ptr [{base} + {frame} + {saved_cs}], ax",
    "mov ax, ds",
    "mov word ptr [{base} + {frame} + {saved_ds}], ax",
    "mov ax, ss",
    "mov word ptr [{base} + {frame} + {saved_ss}], ax",
    "lgdt [{base} + {frame} + {gdtr}]",
    // jmp SEL_CODE16:csm_thunk_pm16
    ".byte 0xEA",
    ".long csm_thunk_pm16 - csm_thunk_start",
    ".word {code16}",

    ".code16",
    "csm_thunk_pm16:",
    "mov ax, {data16}",
    "mov ds, ax",
    "mov es, ax",
    "mov fs, ax",
    "mov gs, ax",
    "mov ss, ax",
    "mov eax, cr0",
    "and eax, 0x7FFFFFFE",
    "mov cr0, eax",
    // jmp THUNK_SEGMENT:csm_thunk_rm
    ".byte 0xEA",
    ".word csm_thunk_rm - csm_thunk_start",
    ".word {segment}",

    "csm_thunk_rm:",
    "mov ax, cs",
    "mov ds, ax",
    "mov ss, ax",
    "mov sp, {stack_top}",
    "lidt [{frame} + {real_idtr}]",
    "mov ax, word ptr [{frame} + {reg_es}]",
    "mov es, ax",
    "mov bx, word ptr [{frame} + {reg_bx}]",
    "mov ax, word ptr [{frame} + {reg_ax}]",
    // call far [frame.target]
    ".byte 0xFF, 0x1E",
    ".word {frame} + {target}",

    "cli",
    "mov ax, cs",
    "mov ds, ax",
    "lgdt [{frame} + {gdtr}]",
    "mov eax, cr0",
    "or eax, 1",
    "mov cr0, eax",
    // jmp dword SEL_CODE32:(base + csm_thunk_pm32)
    ".byte 0x66, 0xEA",
    ".long {base} + csm_thunk_pm32 - csm_thunk_start",
    ".word {code32}",

    ".code32",
    "csm_thunk_pm32:",
    "mov ax, {data32}",
    "mov ds, ax",
    "mov es, ax",
    "mov fs, ax",
    "mov gs, ax",
    "mov ss, ax",
    "lgdt [{base} + {frame} + {saved_gdtr}]",
    "lidt [{base} + {frame} + {saved_idtr}]",
    "mov ax, word ptr [{base} + {frame} + {saved_ss}]",
    "mov ss, ax",
    "mov esp, dword ptr [{base} + {frame} + {saved_esp}]",
    "movzx eax, word ptr [{base} + {frame} + {saved_cs}]",
    "push eax",
    // push imm32 (base + csm_thunk_back)
    ".byte 0x68",
    ".long {base} + csm_thunk_back - csm_thunk_start",
    "mov ax, word ptr [{base} + {frame} + {saved_ds}]",
    "mov ds, ax",
    "mov es, ax",
    "mov fs, ax",
    "mov gs, ax",
    "retf",

    "csm_thunk_back:",
    "popfd",
    "pop edi",
    "pop esi",
    "pop ebx",
    "pop ebp",
    "ret",
    "csm_thunk_end:",
    ".popsection",

    base = const LowStub::THUNK_ADDR,
    segment = const LowStub::THUNK_ADDR >> 4,
    frame = const LowMemoryThunk::FRAME_OFFSET,
    stack_top = const LowMemoryThunk::STACK_TOP,
    gdtr = const offset_of!(ThunkFrame, gdtr),
    real_idtr = const offset_of!(ThunkFrame, real_idtr),
    saved_gdtr = const offset_of!(ThunkFrame, saved_gdtr),
    saved_idtr = const offset_of!(ThunkFrame, saved_idtr),
    saved_esp = const offset_of!(ThunkFrame, saved_esp),
    saved_cs = const offset_of!(ThunkFrame, saved_cs),
    saved_ds = const offset_of!(ThunkFrame, saved_ds),
    saved_ss = const offset_of!(ThunkFrame, saved_ss),
    target = const offset_of!(ThunkFrame, target),
    reg_ax = const offset_of!(ThunkFrame, ax),
    reg_bx = const offset_of!(ThunkFrame, bx),
    reg_es = const offset_of!(ThunkFrame, es),
    code16 = const SEL_CODE16,
    data16 = const SEL_DATA16,
    code32 = const SEL_CODE32,
    data32 = const SEL_DATA32,
);

extern "C" {
    static csm_thunk_start: u8;
    static csm_thunk_end: u8;
}

// The real-mode part addresses the frame and the stack through one segment.
const _: () = assert!(LowStub::THUNK_ADDR & 0xF == 0);
const _: () = assert!(LowMemoryThunk::STACK_TOP <= 0x1_0000);


/// The trampoline as linked into the bridge image.
pub fn code() -> &'static [u8] {
    unsafe {
	let start = ptr::addr_of!(csm_thunk_start);
	let end = ptr::addr_of!(csm_thunk_end);
	slice::from_raw_parts(start, end as usize - start as usize)
    }
}

/// Enters the installed trampoline.
///
/// The trampoline ignores its argument.  Passing `stub` makes the call a
/// use of it: no store to the stub stays pending across the call.
///
/// # Safety
///
/// `stub` must live at `LOW_STUB_BASE` with `code()` installed in its
/// thunk and a request loaded, and interrupts must be disabled.
pub unsafe fn enter(stub: &mut LowStub) {
    debug_assert_eq!(&*stub as *const LowStub as usize, LOW_STUB_BASE as usize);
    let entry: extern "C" fn(*mut LowStub) =
	core::mem::transmute(LowStub::THUNK_ADDR as usize);
    entry(stub);
}
