//! Version constants rendered by `--version`.
//!
//! The workspace tracks an upstream syncoid release and brands itself with
//! the `-rust` suffix, so diagnostics always show both the compatibility
//! baseline and the fact that this is the Rust implementation.

/// Program name rendered in banners and diagnostics.
pub const PROGRAM_NAME: &str = "oc-syncoid";

/// Upstream syncoid release this implementation tracks.
pub const UPSTREAM_BASE_VERSION: &str = "2.5.4";

/// Full version identifier with the Rust branding suffix.
pub const RUST_VERSION: &str = "2.5.4-rust";

/// Renders the `--version` banner.
#[must_use]
pub fn version_banner() -> String {
    format!("{PROGRAM_NAME} version {RUST_VERSION} (compatible with syncoid {UPSTREAM_BASE_VERSION})")
}

#[cfg(test)]
mod tests {
    use super::{version_banner, RUST_VERSION, UPSTREAM_BASE_VERSION};

    #[test]
    fn rust_version_embeds_upstream_base() {
        assert!(RUST_VERSION.starts_with(UPSTREAM_BASE_VERSION));
        assert!(RUST_VERSION.ends_with("-rust"));
    }

    #[test]
    fn banner_names_the_program() {
        assert!(version_banner().starts_with("oc-syncoid version"));
    }
}
