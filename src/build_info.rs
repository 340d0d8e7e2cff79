/// `git describe` output stamped by build.rs, when the build ran in a checkout.
pub fn git_sha() -> Option<&'static str> {
    option_env!("DMS_CLONE_BUILD_GIT_SHA")
}

/// Crate version plus the stamped commit, e.g. `0.1.0 (3f2a9c01be44-dirty)`.
pub fn version_string() -> String {
    match git_sha() {
        Some(described) => format!("{} ({described})", env!("CARGO_PKG_VERSION")),
        None => env!("CARGO_PKG_VERSION").to_string(),
    }
}
