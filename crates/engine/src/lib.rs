//! Test engine core: extension discovery and framework drivers.
//!
//! The engine finds test packs and extension packs on disk, decides
//! which framework version each test pack was built against, and drives
//! the framework's controller process through a version-appropriate
//! calling convention. Embedders construct an [`env::HostEnv`], point an
//! [`discovery::ExtensionManager`] at their install layout, and ask a
//! [`drivers::DriverService`] for a driver per pack.

pub mod addons;
pub mod bridge;
pub mod discovery;
pub mod drivers;
pub mod env;
pub mod error;
pub mod events;
pub mod fs;
pub mod results;

#[cfg(test)]
pub(crate) mod test_support;

pub use addons::{AddonsEntry, AddonsFile};
pub use discovery::{DiscoveryState, ExtensionManager};
pub use drivers::{DriverFactory, DriverService, FrameworkDriver};
pub use env::HostEnv;
pub use error::{EngineError, Result};
pub use events::{EventCallback, TestEventListener};
