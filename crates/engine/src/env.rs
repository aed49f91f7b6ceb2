//! Facts about the host the engine is running in.

use semver::Version;
use quench_pack::{RuntimeFamily, RuntimeTarget};

/// Receipt file left next to an install by the package manager. Its
/// presence switches extension discovery to the verified-install layout.
pub const INSTALL_RECEIPT_FILE: &str = "INSTALL_RECEIPT.json";

/// Version of the running engine, used to gate extensions that require a
/// newer host.
pub fn engine_version() -> Version {
    // CARGO_PKG_VERSION is always valid semver.
    Version::parse(env!("CARGO_PKG_VERSION")).expect("package version is semver")
}

/// Host facts the discovery and driver layers need. Constructed once by
/// the embedder and passed down explicitly; the engine keeps no
/// process-wide state.
#[derive(Debug, Clone)]
pub struct HostEnv {
    /// Version this engine reports to extensions.
    pub engine_version: Version,
    /// Runtime the runner itself executes on.
    pub runtime: RuntimeTarget,
}

impl HostEnv {
    pub fn new(runtime: RuntimeTarget) -> Self {
        HostEnv {
            engine_version: engine_version(),
            runtime,
        }
    }

    /// Overrides the reported engine version. Test hook.
    pub fn with_engine_version(mut self, version: Version) -> Self {
        self.engine_version = version;
        self
    }
}

impl Default for HostEnv {
    fn default() -> Self {
        HostEnv::new(RuntimeTarget::new(RuntimeFamily::Modern, Version::new(6, 0, 0)))
    }
}
