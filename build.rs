use std::env;
use std::fs;
use std::path::{Path, PathBuf};


// Legacy images embedded into the bridge: (output name, override variable,
// default location under the manifest directory).
const IMAGES: [(&str, &str, &str); 2] = [
    ("csm16.bin", "CSM16_BIN", "blobs/Csm16.bin"),
    ("vgabios.bin", "VGABIOS_BIN", "blobs/vgabios.bin"),
];


fn main() {
    println!("cargo:rerun-if-changed=config/i686-unknown-none.json");
    println!("cargo:rerun-if-changed=config/i686-unknown-none.ld");

    let manifest_dir = PathBuf::from(env::var_os("CARGO_MANIFEST_DIR")
				     .expect("CARGO_MANIFEST_DIR is set"));
    let out_dir = PathBuf::from(env::var_os("OUT_DIR")
				.expect("OUT_DIR is set"));

    for (name, var, default) in IMAGES {
	println!("cargo:rerun-if-env-changed={}", var);

	let source = match env::var_os(var) {
	    Some(path) => PathBuf::from(path),
	    None => manifest_dir.join(default),
	};
	println!("cargo:rerun-if-changed={}", source.display());

	stage_image(&source, &out_dir.join(name));
    }

    // The linker script only applies to the freestanding target.
    if env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("none") {
	let script = manifest_dir.join("config/i686-unknown-none.ld");
	println!("cargo:rustc-link-arg-bins=-T{}", script.display());
    }
}

fn stage_image(source: &Path, dest: &Path) {
    if source.is_file() {
	fs::copy(source, dest).expect("failed to stage legacy image");
    } else {
	// Keep hosted builds and tests working without the images.
	println!("cargo:warning={} not found, embedding an empty image",
		 source.display());
	fs::write(dest, []).expect("failed to write placeholder image");
    }
}
