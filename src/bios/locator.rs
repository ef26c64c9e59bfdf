//
// Table Locator - finds signature-tagged tables inside a legacy image
//
// Tables inside the CSM16 and VGA BIOS images start on a paragraph
// boundary, so only every 16th byte is a candidate.  The scan trusts the
// signature alone unless the caller supplies a check.
//

pub const TABLE_STRIDE: usize = 16;


/// Builds a table signature the way the legacy images store it.
pub const fn signature(tag: &[u8; 4]) -> u32 {
    u32::from_ne_bytes(*tag)
}


/// Returns the offset of the first 16-byte aligned window whose first
/// four bytes equal `signature`.
pub fn find_table(image: &[u8], signature: u32) -> Option<usize> {
    find_table_checked(image, signature, |_| true)
}

/// Like `find_table`, but a candidate is accepted only if `check` accepts
/// the image bytes starting at it.  Rejected candidates do not stop the
/// scan.
pub fn find_table_checked<F>(image: &[u8], signature: u32, check: F)
			     -> Option<usize>
where
    F: Fn(&[u8]) -> bool,
{
    let tag = signature.to_ne_bytes();

    (0 .. image.len())
	.step_by(TABLE_STRIDE)
	.find(|&offset| {
	    let window = &image[offset..];
	    window.starts_with(&tag) && check(window)
	})
}
