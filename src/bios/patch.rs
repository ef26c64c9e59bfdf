//
// Image Patch - field writes into a table inside an embedded image
//
// The embedded images are read-only.  Fields the bridge must set inside
// their tables are recorded here while low memory is laid out, and
// written into the installed copy right after it is placed.
//

const MAX_WRITES: usize = 8;


#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct PatchWrite {
    field: u16,
    value: u32,
}


#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImagePatch {
    table: usize,
    writes: [PatchWrite; MAX_WRITES],
    len: usize,
}

impl ImagePatch {
    /// An empty patch against the table at `table` bytes into the image.
    pub const fn new(table: usize) -> Self {
	Self {
	    table,
	    writes: [PatchWrite { field: 0, value: 0 }; MAX_WRITES],
	    len: 0,
	}
    }

    /// Little-endian `u32` writes as `(field, value)` pairs, each `field`
    /// bytes into the table.  More than `MAX_WRITES` fails to compile.
    pub fn from_writes<const N: usize>(table: usize,
				       writes: [(u16, u32); N]) -> Self {
	const { assert!(N <= MAX_WRITES) };

	let mut patch = Self::new(table);
	for (slot, (field, value)) in patch.writes.iter_mut().zip(writes) {
	    *slot = PatchWrite { field, value };
	}
	patch.len = N;
	patch
    }

    pub fn table_offset(&self) -> usize {
	self.table
    }

    /// Value recorded for `field`, if any (the last write wins).
    pub fn get_u32(&self, field: u16) -> Option<u32> {
	self.writes[..self.len].iter()
	    .rev()
	    .find(|w| w.field == field)
	    .map(|w| w.value)
    }

    /// Applies the recorded writes to an installed image.  Writes that
    /// would fall outside `image` are skipped and counted.
    pub fn apply(&self, image: &mut [u8]) -> usize {
	let mut skipped = 0;

	for write in &self.writes[..self.len] {
	    let at = self.table + write.field as usize;
	    match image.get_mut(at .. at + 4) {
		Some(dest) => dest.copy_from_slice(&write.value.to_le_bytes()),
		None => skipped += 1,
	    }
	}
	skipped
    }
}
