//
// Reserved high pool: POST memory for the CSM16 image above 1 MiB.
//

use crate::bios::e820::E820Entry;


const FOUR_GIB: u64 = 0x1_0000_0000;
const ONE_MIB: u64 = 0x10_0000;


#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReservedHighPool {
    pub base: u64,
    pub size: u64,
}


/// Carves `size` bytes off the top of the highest RAM region below 4 GiB
/// that is larger than `size`.  Regions crossing 4 GiB are clipped first.
pub fn find_high_pool(map: &[E820Entry], size: u32) -> Option<ReservedHighPool> {
    let size = size as u64;

    map.iter()
	.filter(|entry| entry.is_ram())
	.filter_map(|entry| {
	    let start = entry.addr;
	    let end = entry.end().min(FOUR_GIB);
	    (start < end && end - start > size).then_some((start, end))
	})
	.max_by_key(|&(start, _)| start)
	.map(|(_, end)| ReservedHighPool { base: end - size, size })
}


/// Size of the RAM run starting at 1 MiB, clipped at 4 GiB.
pub fn memory_above_1mb(map: &[E820Entry]) -> u32 {
    map.iter()
	.find(|entry| {
	    let addr = entry.addr;
	    entry.is_ram() && addr == ONE_MIB
	})
	.map(|entry| (entry.end().min(FOUR_GIB) - ONE_MIB) as u32)
	.unwrap_or(0)
}
