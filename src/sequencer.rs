//
// Legacy Call Sequencer - the one-way handoff to the CSM16 image
//
//	Initialize -> DispatchOprom -> PrepareToBoot -> Boot -> (halt)
//
// There is no way back: each stage is entered exactly once, in order,
// and no far call result is inspected.
//

use crate::bios::compat16::Legacy16Function;
use crate::error::Halt;
use crate::layout::{LowStub, PreparedLayout};
use crate::platform::Platform;
use crate::x86::X86FarPtr;


const PIC1_DATA: u16 = 0x21;
const PIC2_DATA: u16 = 0xA1;
const PIT_CHANNEL0: u16 = 0x40;
const PIT_COMMAND: u16 = 0x43;

/// Channel 0, lobyte/hibyte, mode 3 (square wave), binary.
const PIT_MODE3_CHANNEL0: u8 = 0x36;


#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Initialize,
    DispatchOprom,
    PrepareToBoot,
    Boot,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
	Stage::Initialize,
	Stage::DispatchOprom,
	Stage::PrepareToBoot,
	Stage::Boot,
    ];

    pub fn function(self) -> Legacy16Function {
	match self {
	    Stage::Initialize => Legacy16Function::InitializeYourself,
	    Stage::DispatchOprom => Legacy16Function::DispatchOprom,
	    Stage::PrepareToBoot => Legacy16Function::PrepareToBoot,
	    Stage::Boot => Legacy16Function::Boot,
	}
    }

    /// Physical address of the table passed with this stage.
    pub fn params_addr(self) -> Option<u32> {
	match self {
	    Stage::Initialize => Some(LowStub::INIT_TABLE_ADDR),
	    Stage::DispatchOprom => Some(LowStub::OPROM_TABLE_ADDR),
	    Stage::PrepareToBoot => Some(LowStub::BOOT_TABLE_ADDR),
	    Stage::Boot => None,
	}
    }
}


/// One far call into the Compatibility16 entry point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InvocationRequest {
    pub entry: X86FarPtr,
    pub function: Legacy16Function,
    /// Passed in ES:BX.
    pub params: Option<X86FarPtr>,
}

impl InvocationRequest {
    pub fn for_stage(stage: Stage, entry: X86FarPtr) -> Self {
	Self {
	    entry,
	    function: stage.function(),
	    params: stage.params_addr().and_then(X86FarPtr::from_linear_addr),
	}
    }
}


pub struct LegacyCallSequencer<'p, P: Platform + ?Sized> {
    platform: &'p mut P,
    /// The stub `prepare` filled in; the far calls go through it.
    stub: &'p mut LowStub,
}

impl<'p, P: Platform + ?Sized> LegacyCallSequencer<'p, P> {
    pub fn new(platform: &'p mut P, stub: &'p mut LowStub) -> Self {
	Self { platform, stub }
    }

    /// Quiets the legacy interrupt hardware the CSM16 image will own.
    fn quiesce(&mut self) {
	self.platform.disable_interrupts();
	self.platform.write_port(PIC1_DATA, 0xFF);
	self.platform.write_port(PIC2_DATA, 0xFF);

	self.platform.write_port(PIT_COMMAND, PIT_MODE3_CHANNEL0);
	self.platform.write_port(PIT_CHANNEL0, 0x00);
	self.platform.write_port(PIT_CHANNEL0, 0x00);
    }

    fn install(&mut self, layout: &PreparedLayout) {
	self.platform.unlock_legacy_region();

	let vgabios = layout.placement.vgabios;
	log::info!("installing VGA BIOS at {:#x} ({:#x} bytes)",
		   vgabios.base, vgabios.len);
	self.platform.install_image(vgabios.base, layout.vgabios_image,
				    &layout.vga_patch);

	let csm = layout.placement.csm;
	log::info!("installing CSM16 at {:#x} ({:#x} bytes)", csm.base, csm.len);
	self.platform.install_image(csm.base, layout.csm_image,
				    &layout.compat_patch);
    }

    /// Runs the handoff to completion.  Only returns once Boot has been
    /// issued; the caller idles from then on.
    pub fn run(mut self, layout: &PreparedLayout) -> Halt {
	self.quiesce();
	self.install(layout);

	let entry = layout.entry();
	for stage in Stage::ALL {
	    let request = InvocationRequest::for_stage(stage, entry);
	    log::info!("{:?}: {:?} via {}", stage, request.function, entry);
	    self.platform.far_call(self.stub, &request);
	}

	Halt::HandedOff
    }
}


#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::bios::patch::ImagePatch;
    use crate::layout::tests::{boxed_stub, Fixture};
    use crate::layout::thunk::ThunkFrame;

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum Op {
	Cli,
	Out(u16, u8),
	Unlock,
	Install { base: u32, len: usize, patch: ImagePatch },
	Call(InvocationRequest),
    }

    /// What a far call found in the stub when it was made.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct StubSnapshot {
	pub target: X86FarPtr,
	pub ax: u16,
	pub es: u16,
	pub bx: u16,
	pub init_e820_entries: u32,
	pub boot_e820_entries: u32,
    }

    /// Records every hardware effect in order.  Far calls load the request
    /// into the stub the way the hardware platform does.
    #[derive(Default)]
    pub struct RecordingPlatform {
	pub ops: Vec<Op>,
	pub snapshots: Vec<StubSnapshot>,
    }

    impl Platform for RecordingPlatform {
	fn disable_interrupts(&mut self) {
	    self.ops.push(Op::Cli);
	}

	fn write_port(&mut self, port: u16, value: u8) {
	    self.ops.push(Op::Out(port, value));
	}

	fn unlock_legacy_region(&mut self) {
	    self.ops.push(Op::Unlock);
	}

	fn install_image(&mut self, base: u32, image: &[u8], patch: &ImagePatch) {
	    self.ops.push(Op::Install { base, len: image.len(), patch: *patch });
	}

	fn far_call(&mut self, stub: &mut LowStub, request: &InvocationRequest) {
	    stub.thunk.load_request(request.entry, request.function as u16,
				    request.params);
	    let frame: ThunkFrame = stub.thunk.frame;
	    self.snapshots.push(StubSnapshot {
		target: frame.target,
		ax: frame.ax,
		es: frame.es,
		bx: frame.bx,
		init_e820_entries: stub.init_table.number_e820_entries,
		boot_e820_entries: stub.boot_table.number_e820_entries,
	    });
	    self.ops.push(Op::Call(*request));
	}
    }

    #[test]
    fn stages_map_to_selectors_and_tables() {
	let selectors: Vec<u16> = Stage::ALL.iter()
	    .map(|stage| stage.function() as u16)
	    .collect();
	assert_eq!(selectors, [0, 5, 2, 3]);
	assert_eq!(Stage::Boot.params_addr(), None);
    }

    #[test]
    fn request_params_point_at_the_stub_tables() {
	let entry = X86FarPtr::new(0xF000, 0x8000);
	let request = InvocationRequest::for_stage(Stage::PrepareToBoot, entry);
	let params = request.params.unwrap();
	assert_eq!(params.to_linear_addr(), LowStub::BOOT_TABLE_ADDR);
	assert!(params.offset < 0x10);
    }

    #[test]
    fn handoff_runs_in_order() {
	let mut fx = Fixture::new();
	let mut stub = boxed_stub();
	let layout = fx.prepare(&mut stub).unwrap();

	let mut platform = RecordingPlatform::default();
	let halt = LegacyCallSequencer::new(&mut platform, &mut stub)
	    .run(&layout);
	assert_eq!(halt, Halt::HandedOff);

	let entry = X86FarPtr::new(0xF000, 0x8000);
	let far = |addr| X86FarPtr::from_linear_addr(addr);
	assert_eq!(platform.ops, [
	    Op::Cli,
	    Op::Out(0x21, 0xFF),
	    Op::Out(0xA1, 0xFF),
	    Op::Out(0x43, 0x36),
	    Op::Out(0x40, 0x00),
	    Op::Out(0x40, 0x00),
	    Op::Unlock,
	    Op::Install { base: 0xC_0000, len: 0x8000, patch: layout.vga_patch },
	    Op::Install { base: 0xE_0000, len: 0x2_0000,
			  patch: layout.compat_patch },
	    Op::Call(InvocationRequest {
		entry,
		function: Legacy16Function::InitializeYourself,
		params: far(LowStub::INIT_TABLE_ADDR),
	    }),
	    Op::Call(InvocationRequest {
		entry,
		function: Legacy16Function::DispatchOprom,
		params: far(LowStub::OPROM_TABLE_ADDR),
	    }),
	    Op::Call(InvocationRequest {
		entry,
		function: Legacy16Function::PrepareToBoot,
		params: far(LowStub::BOOT_TABLE_ADDR),
	    }),
	    Op::Call(InvocationRequest {
		entry,
		function: Legacy16Function::Boot,
		params: None,
	    }),
	]);
    }

    #[test]
    fn far_calls_see_the_prepared_stub() {
	let mut fx = Fixture::new();
	let mut stub = boxed_stub();
	let layout = fx.prepare(&mut stub).unwrap();
	let count = layout.e820.count as u32;

	let mut platform = RecordingPlatform::default();
	LegacyCallSequencer::new(&mut platform, &mut stub).run(&layout);

	let entry = X86FarPtr::new(0xF000, 0x8000);
	let init = X86FarPtr::from_linear_addr(LowStub::INIT_TABLE_ADDR)
	    .unwrap();
	assert_eq!(platform.snapshots.len(), 4);
	assert_eq!(platform.snapshots[0], StubSnapshot {
	    target: entry,
	    ax: 0,
	    es: init.segment,
	    bx: init.offset,
	    init_e820_entries: count,
	    boot_e820_entries: count,
	});
	let functions: Vec<u16> = platform.snapshots.iter()
	    .map(|snap| snap.ax)
	    .collect();
	assert_eq!(functions, [0, 5, 2, 3]);
	assert_eq!(platform.snapshots[3].es, 0);
	assert_eq!(platform.snapshots[3].bx, 0);

	// The last request stays in the stub after the handoff.
	let last = stub.thunk.frame;
	assert_eq!({ last.ax }, 3);
    }
}
