//! Generates `include/booklist.h` for C hosts.
//!
//! Header generation failures are reported as warnings so a Rust-only build
//! never breaks on them.

use std::env;
use std::path::PathBuf;

fn main() {
    let crate_dir = env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());
    let out = PathBuf::from(&crate_dir).join("include").join("booklist.h");

    println!("cargo:rerun-if-changed=src/lib.rs");
    println!("cargo:rerun-if-changed=src/types.rs");

    match cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_language(cbindgen::Language::C)
        .with_include_guard("BOOKLIST_H")
        .generate()
    {
        Ok(bindings) => {
            if let Some(dir) = out.parent() {
                if let Err(err) = std::fs::create_dir_all(dir) {
                    println!("cargo:warning=cannot create {}: {err}", dir.display());
                    return;
                }
            }
            let mut header = Vec::new();
            bindings.write(&mut header);
            if let Err(err) = std::fs::write(&out, header) {
                println!("cargo:warning=cannot write {}: {err}", out.display());
            }
        }
        Err(err) => println!("cargo:warning=skipping booklist.h: {err}"),
    }
}
