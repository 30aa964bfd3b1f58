use std::env;
use std::fs;
use std::path::PathBuf;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=cbindgen.toml");

    let src_dir = PathBuf::from("src");
    if let Ok(entries) = fs::read_dir(&src_dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some("rs") {
                println!("cargo:rerun-if-changed={}", path.display());
            }
        }
    }

    if Command::new("cbindgen").arg("--version").output().is_err() {
        println!("cargo:warning=cbindgen not found. Install with: cargo install cbindgen");
        println!("cargo:warning=complex_qr.h will not be regenerated.");
        return;
    }

    let crate_dir = env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR is set by cargo");
    let include_dir = PathBuf::from(&crate_dir).join("include").join("complex_qr");
    let header = include_dir.join("complex_qr.h");

    fs::create_dir_all(&include_dir).expect("Failed to create include/complex_qr directory");

    let output = Command::new("cbindgen")
        .arg("--config")
        .arg("cbindgen.toml")
        .arg("--cpp-compat")
        .arg("--output")
        .arg(&header)
        .current_dir(&crate_dir)
        .output()
        .expect("Failed to run cbindgen");

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!("cbindgen failed:\n{}", stderr);
    }
}
