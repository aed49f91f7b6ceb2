//! Settings passed through the engine to drivers and controllers.

use std::collections::BTreeMap;

/// String-keyed settings for one test pack. The engine treats the map as
/// opaque apart from the keys in [`keys`].
pub type PackSettings = BTreeMap<String, String>;

/// Well-known settings keys the built-in drivers understand.
pub mod keys {
    /// Runtime the user asked the pack to run under, as a target string
    /// such as `classic-4.8`.
    pub const REQUESTED_RUNTIME: &str = "RequestedRuntime";

    /// Working directory for the controller process.
    pub const WORK_DIRECTORY: &str = "WorkDirectory";
}
