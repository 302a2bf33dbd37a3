//! Build script for the transmit firmware
//!
//! Handles:
//! - Memory layout configuration
//! - cortex-m-rt and defmt linker scripts for the target binary

fn main() {
    // Tell Cargo to re-run this if the linker script changes
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");

    // Host builds (the test-suite) need no linker setup
    let embedded = std::env::var_os("CARGO_FEATURE_EMBEDDED").is_some();
    let arm = std::env::var("CARGO_CFG_TARGET_ARCH").is_ok_and(|arch| arch == "arm");
    if !(embedded && arm) {
        return;
    }

    // Link memory.x from project directory when one is provided
    if let Ok(dir) = std::env::var("CARGO_MANIFEST_DIR") {
        println!("cargo:rustc-link-search={dir}");
    }

    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
}
