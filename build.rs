use std::env;
use std::path::PathBuf;

// Bakes the source checkout in as the last-resort data root for
// `find_data_root`; runtime `FEATUREFENCE_ROOT` always wins over it.
fn main() {
    println!("cargo:rerun-if-changed=schema/flag_catalog.schema.json");
    println!("cargo:rerun-if-changed=catalogs");

    let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") else {
        return;
    };
    let root = PathBuf::from(manifest_dir);
    if !root.join("schema").join("flag_catalog.schema.json").is_file() {
        println!("cargo:warning=schema/ missing; no build-time data root baked in");
        return;
    }
    let root = root.canonicalize().unwrap_or(root);
    println!("cargo:rustc-env=FEATUREFENCE_ROOT_HINT={}", root.display());
}
