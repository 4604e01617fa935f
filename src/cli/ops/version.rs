use std::fmt;

use clap::Args;

#[derive(Args, Debug, Clone)]
pub struct Version {}

#[derive(Debug)]
pub struct VersionOutput {
    version: &'static str,
    os: &'static str,
    arch: &'static str,
}

impl fmt::Display for VersionOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dochubfs {} ({} {})", self.version, self.os, self.arch)
    }
}

impl Version {
    /// Needs no configuration, so it bypasses the op context.
    pub fn output(&self) -> VersionOutput {
        VersionOutput {
            version: env!("CARGO_PKG_VERSION"),
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
        }
    }
}
