use std::path::PathBuf;
use std::process::Command;

/// Stamps `tally --version` with the commit it was built from.
fn main() {
    let root = std::env::var("CARGO_MANIFEST_DIR")
        .map(|d| PathBuf::from(d).join(".."))
        .unwrap_or_else(|_| PathBuf::from(".."));

    let git_head = root.join(".git").join("HEAD");
    if git_head.exists() {
        println!("cargo:rerun-if-changed={}", git_head.display());
    }

    let describe = Command::new("git")
        .arg("-C")
        .arg(&root)
        .args(["describe", "--always", "--dirty", "--abbrev=8"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_owned())
        .filter(|s| !s.is_empty());

    println!(
        "cargo:rustc-env=TALLY_BUILD_SHA={}",
        describe.as_deref().unwrap_or("unknown")
    );
}
