//! Framework drivers.
//!
//! A driver fronts one test pack for its whole session: load first, then
//! count, explore, and run against the loaded state. [`DriverService`]
//! picks the driver for a pack; packs that cannot be driven still get a
//! driver, one whose operations report why instead of failing.

mod fallback;
mod registry;
mod versioned;

pub use fallback::{InvalidPackDriver, SkippedPackDriver};
pub use registry::{
    DriverFactory, DriverService, LegacyQuenchDriverFactory, QuenchDriverFactory, FRAMEWORK_NAME,
};
pub use versioned::VersionedDriver;

use std::path::Path;

use crate::error::Result;
use crate::events::{EventCallback, TestEventListener};
use quench_pack::PackSettings;

/// Operations every driver supports, regardless of framework version.
///
/// `load` must be called before any operation that touches the loaded
/// state. `stop_run` is the exception twice over: it works from another
/// thread while `run` is blocked, and it is a no-op when nothing runs.
pub trait FrameworkDriver: Send + Sync {
    /// Identifier prefixing every test id this driver reports.
    fn id(&self) -> &str;

    /// Loads the pack and returns the load report.
    fn load(&self, pack_path: &Path, settings: &PackSettings) -> Result<String>;

    /// Number of test cases selected by `filter`.
    fn count_test_cases(&self, filter: &str) -> Result<u32>;

    /// Runs the selected tests and returns the final result document.
    /// Progress reports go to `listener` as they arrive; without a
    /// listener they are dropped.
    fn run(&self, listener: Option<&dyn TestEventListener>, filter: &str) -> Result<String>;

    /// Fire-and-forget variant of `run`. Every report, the final result
    /// included, goes through `callback`.
    fn run_async(&self, callback: EventCallback, filter: &str) -> Result<()>;

    /// Describes the selected tests without running them.
    fn explore(&self, filter: &str) -> Result<String>;

    /// Requests cancellation of the run in progress, cooperatively or
    /// forcibly.
    fn stop_run(&self, force: bool) -> Result<()>;
}
