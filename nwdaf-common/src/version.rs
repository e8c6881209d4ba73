//! `--version` string used by every binary's [clap::Parser].

/// Expands to a `"<CARGO_PKG_VERSION> (<git revision>)"` string, so a
/// deployed binary's exact commit is always one `--version` away.
#[macro_export]
macro_rules! version {
    () => {
        concat!(env!("CARGO_PKG_VERSION"), " (", $crate::GIT_VERSION, ")")
    };
}

pub const GIT_VERSION: &str = git_version::git_version!(fallback = "unknown");
