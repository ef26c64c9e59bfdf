use csm_bridge::bios::e820::{translate, E820Entry, E820Type};
use csm_bridge::firmware::efi::PAGE_SIZE;
use csm_bridge::firmware::MemoryMap;
use proptest::prelude::*;

#[derive(Debug, Clone, Copy)]
struct Desc {
    ty: u32,
    start: u64,
    pages: u64,
}

fn serialize(descs: &[Desc], stride: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; descs.len() * stride];
    for (i, d) in descs.iter().enumerate() {
	let at = &mut bytes[i * stride..];
	at[0..4].copy_from_slice(&d.ty.to_ne_bytes());
	at[8..16].copy_from_slice(&d.start.to_ne_bytes());
	at[24..32].copy_from_slice(&d.pages.to_ne_bytes());
    }
    bytes
}

fn run(descs: &[Desc], stride: usize, cap: usize) -> (Vec<E820Entry>, bool) {
    let bytes = serialize(descs, stride);
    let map = MemoryMap::new(&bytes, stride).unwrap();
    let mut out = vec![E820Entry::default(); cap];
    let result = translate(&map, &mut out);
    out.truncate(result.count);
    (out, result.truncated)
}

fn desc_strategy() -> impl Strategy<Value = Desc> {
    (0u32..20, 0u64..0x4000, 0u64..16).prop_map(|(ty, page, pages)| Desc {
	ty,
	start: page * PAGE_SIZE,
	pages,
    })
}

/// Back-to-back descriptors whose firmware types all become RAM.
fn ram_run_strategy() -> impl Strategy<Value = Vec<Desc>> {
    let ram_types = prop::sample::select(vec![1u32, 2, 3, 4, 7]);
    prop::collection::vec((ram_types, 1u64..64), 1..40).prop_map(|parts| {
	let mut start = 0x10_0000;
	parts
	    .into_iter()
	    .map(|(ty, pages)| {
		let d = Desc { ty, start, pages };
		start += pages * PAGE_SIZE;
		d
	    })
	    .collect()
    })
}

proptest! {
    #[test]
    fn output_respects_capacity_and_skips_empty_regions(
	descs in prop::collection::vec(desc_strategy(), 0..80),
	cap in 1usize..40,
    ) {
	let (out, truncated) = run(&descs, 40, cap);
	let nonempty = descs.iter().filter(|d| d.pages != 0).count();

	prop_assert!(out.len() <= cap);
	prop_assert!(out.len() <= nonempty);
	let all_sizes_positive = out.iter().all(|e| {
	    let size = e.size;
	    size > 0
	});
	prop_assert!(all_sizes_positive);
	if truncated {
	    prop_assert_eq!(out.len(), cap);
	}
    }

    #[test]
    fn neighbours_never_remain_mergeable(
	descs in prop::collection::vec(desc_strategy(), 0..80),
    ) {
	let (out, _) = run(&descs, 40, 32);
	for pair in out.windows(2) {
	    let (a, b) = (pair[0], pair[1]);
	    prop_assert!(!(a.end() == { b.addr } && { a.etype } == { b.etype }),
			 "{:?} and {:?} should have merged", a, b);
	}
    }

    #[test]
    fn covered_bytes_are_preserved_without_truncation(
	descs in prop::collection::vec(desc_strategy(), 0..32),
    ) {
	let (out, truncated) = run(&descs, 40, 32);
	prop_assert!(!truncated);

	let input: u64 = descs.iter().map(|d| d.pages * PAGE_SIZE).sum();
	let output: u64 = out.iter().map(|e| e.size).sum();
	prop_assert_eq!(input, output);
    }

    #[test]
    fn contiguous_ram_collapses_into_one_entry(descs in ram_run_strategy()) {
	let (out, _) = run(&descs, 40, 32);
	let total: u64 = descs.iter().map(|d| d.pages * PAGE_SIZE).sum();

	prop_assert_eq!(out, vec![E820Entry::new(0x10_0000, total, E820Type::Ram)]);
    }

    #[test]
    fn stride_does_not_change_the_result(
	descs in prop::collection::vec(desc_strategy(), 0..40),
	extra in 0usize..64,
    ) {
	let stride = 40 + extra;
	prop_assert_eq!(run(&descs, 40, 32), run(&descs, stride, 32));
    }
}
