use std::process::Command;

/// `git describe` of the working tree, marked `-dirty` when it has local edits.
fn describe_head() -> Option<String> {
    let output = Command::new("git")
        .args(["describe", "--always", "--dirty", "--abbrev=12"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let described = String::from_utf8(output.stdout).ok()?;
    let described = described.trim();
    (!described.is_empty()).then(|| described.to_string())
}

fn main() {
    for path in [".git/HEAD", ".git/refs", ".git/index"] {
        println!("cargo:rerun-if-changed={path}");
    }
    if let Some(described) = describe_head() {
        println!("cargo:rustc-env=DMS_CLONE_BUILD_GIT_SHA={described}");
    }
}
