use std::path::{Path, PathBuf};
use std::process::Command;

/// `git describe` of the workspace, e.g. `a1b2c3d` or `a1b2c3d-dirty`
fn describe(workspace: &Path) -> Option<String> {
    let out = Command::new("git")
        .arg("-C")
        .arg(workspace)
        .args(["describe", "--always", "--dirty", "--abbrev=7"])
        .output()
        .ok()?;
    if !out.status.success() {
        return None;
    }
    let text = String::from_utf8(out.stdout).ok()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn main() {
    let workspace = std::env::var_os("CARGO_MANIFEST_DIR")
        .map(PathBuf::from)
        .and_then(|dir| dir.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from(".."));

    let build = describe(&workspace).unwrap_or_else(|| "unknown".to_string());
    println!("cargo:rustc-env=NOTA_BUILD_SHA={build}");

    // A new commit moves HEAD or the ref it points at
    for p in [".git/HEAD", ".git/refs/heads", ".git/index"] {
        println!("cargo:rerun-if-changed={}", workspace.join(p).display());
    }
}
