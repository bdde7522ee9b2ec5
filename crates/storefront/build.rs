//! Build script for the storefront crate.
//!
//! Fingerprints `static/css/main.css` so the shell can bust caches with
//! `?v={CSS_HASH}`.

use std::env;
use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};

fn main() {
    let manifest_dir =
        env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR must be set by Cargo");
    let css_path = Path::new(&manifest_dir).join("static/css/main.css");
    println!("cargo:rerun-if-changed={}", css_path.display());

    let fingerprint = fs::read(&css_path).map_or_else(
        |e| {
            println!("cargo:warning=Could not read main.css: {e}");
            String::from("dev")
        },
        |content| {
            let digest = format!("{:x}", Sha256::digest(&content));
            digest[..8].to_string()
        },
    );

    println!("cargo:rustc-env=CSS_HASH={fingerprint}");
}
