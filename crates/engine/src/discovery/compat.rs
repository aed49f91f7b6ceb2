//! Cross-runtime rules for loading extension candidates.

use semver::Version;
use quench_pack::{RuntimeFamily, RuntimeTarget};

use crate::error::{EngineError, Result};

/// Newest major version of the classic runtime line. Classic runners on
/// this major load every classic extension; older runners only load
/// extensions from earlier majors.
pub const CLASSIC_CURRENT_MAJOR: u64 = 4;

/// Lowest classic version whose standard surface is complete enough to
/// host standard-target extensions.
pub fn classic_standard_floor() -> Version {
    Version::new(4, 7, 2)
}

/// Fails if the runner's own target can never load extensions. Such a
/// runner is misinstalled; this is a configuration error, not a skip.
pub fn ensure_runner_can_load(runner: &RuntimeTarget) -> Result<()> {
    if runner.family.is_runnable() {
        Ok(())
    } else {
        Err(EngineError::UnsupportedRunnerTarget {
            runner: runner.to_string(),
        })
    }
}

/// Decides whether a runner may load an extension built for `extension`.
///
/// | runner  | extension target    | loads                                |
/// |---------|---------------------|--------------------------------------|
/// | modern  | modern or standard  | yes                                  |
/// | modern  | classic             | no                                   |
/// | classic | classic             | runner on the current major, or the  |
/// |         |                     | extension's major below it           |
/// | classic | standard            | extension at or above the classic    |
/// |         |                     | standard floor                       |
/// | classic | modern              | no                                   |
pub fn can_load_target(runner: &RuntimeTarget, extension: &RuntimeTarget) -> Result<bool> {
    ensure_runner_can_load(runner)?;
    Ok(match runner.family {
        RuntimeFamily::Modern => {
            matches!(extension.family, RuntimeFamily::Modern | RuntimeFamily::Standard)
        }
        RuntimeFamily::Classic => match extension.family {
            RuntimeFamily::Classic => {
                runner.version.major == CLASSIC_CURRENT_MAJOR
                    || extension.version.major < CLASSIC_CURRENT_MAJOR
            }
            RuntimeFamily::Standard => extension.version >= classic_standard_floor(),
            _ => false,
        },
        // unreachable: ensure_runner_can_load rejected these
        _ => false,
    })
}
