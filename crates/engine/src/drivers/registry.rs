//! Driver selection for test packs.

use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};

use semver::Version;
use tracing::debug;

use quench_pack::{is_pack_file_type, PackFile, Requirement};

use super::fallback::{InvalidPackDriver, SkippedPackDriver};
use super::versioned::VersionedDriver;
use super::FrameworkDriver;

/// Framework name the built-in factories claim.
pub const FRAMEWORK_NAME: &str = "quench";

/// Recognizes one band of framework versions and builds drivers for it.
/// Factories are stateless; the service tries them in registration order.
pub trait DriverFactory: Send + Sync {
    /// True when this factory can drive packs built against `reference`.
    fn supports(&self, reference: &Requirement) -> bool;

    /// Builds a driver bound to `reference`. Called only with references
    /// `supports` accepted.
    fn create(&self, reference: &Requirement, id: String) -> Box<dyn FrameworkDriver>;
}

/// Factory for the current framework line.
#[derive(Debug, Default)]
pub struct QuenchDriverFactory;

impl DriverFactory for QuenchDriverFactory {
    fn supports(&self, reference: &Requirement) -> bool {
        reference.name == FRAMEWORK_NAME && reference.version.major == 3
    }

    fn create(&self, reference: &Requirement, id: String) -> Box<dyn FrameworkDriver> {
        Box::new(VersionedDriver::new(id, reference.clone()))
    }
}

/// Factory for the 2.x framework line. Ships with the engine but is not
/// registered by default; runners that still carry 2.x packs opt in.
#[derive(Debug, Default)]
pub struct LegacyQuenchDriverFactory;

impl DriverFactory for LegacyQuenchDriverFactory {
    fn supports(&self, reference: &Requirement) -> bool {
        reference.name == FRAMEWORK_NAME
            && reference.version >= Version::new(2, 5, 0)
            && reference.version < Version::new(3, 0, 0)
    }

    fn create(&self, reference: &Requirement, id: String) -> Box<dyn FrameworkDriver> {
        Box::new(VersionedDriver::new(id, reference.clone()))
    }
}

/// Hands out a driver for any pack path. Selection is total: a pack that
/// cannot be driven gets a fallback driver describing why, never an
/// error.
pub struct DriverService {
    factories: Vec<Box<dyn DriverFactory>>,
    next_id: AtomicU32,
}

impl Default for DriverService {
    fn default() -> Self {
        DriverService::new()
    }
}

impl DriverService {
    /// Service with the current-line factory registered.
    pub fn new() -> Self {
        DriverService {
            factories: vec![Box::new(QuenchDriverFactory)],
            next_id: AtomicU32::new(1),
        }
    }

    pub fn register_factory(&mut self, factory: Box<dyn DriverFactory>) {
        self.factories.push(factory);
    }

    pub fn with_factory(mut self, factory: Box<dyn DriverFactory>) -> Self {
        self.register_factory(factory);
        self
    }

    /// Picks the driver for `pack_path`.
    ///
    /// `skip_non_tests` turns packs that merely carry no tests into
    /// Skipped results instead of Invalid ones; genuine failures such
    /// as a missing file stay Invalid either way.
    pub fn driver_for(&self, pack_path: &Path, skip_non_tests: bool) -> Box<dyn FrameworkDriver> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed).to_string();

        if !pack_path.exists() {
            return Box::new(InvalidPackDriver::new(
                pack_path,
                id,
                format!("File not found: {}", pack_path.display()),
            ));
        }
        if !is_pack_file_type(pack_path) {
            return Box::new(InvalidPackDriver::new(
                pack_path,
                id,
                "File type is not supported",
            ));
        }

        let pack = match PackFile::open(pack_path) {
            Ok(pack) => pack,
            // bad envelope, wrong format, torn header
            Err(err) => return Box::new(InvalidPackDriver::new(pack_path, id, err.to_string())),
        };

        if let Some(target) = pack.target() {
            if !target.family.is_runnable() {
                return if skip_non_tests {
                    Box::new(SkippedPackDriver::new(pack_path, id))
                } else {
                    Box::new(InvalidPackDriver::new(
                        pack_path,
                        id,
                        format!("The {target} target cannot be run by this engine"),
                    ))
                };
            }
        }

        if skip_non_tests && pack.is_tool() {
            return Box::new(SkippedPackDriver::new(pack_path, id));
        }

        for factory in &self.factories {
            for reference in pack.requires() {
                if factory.supports(reference) {
                    debug!(
                        pack = %pack_path.display(),
                        framework = %reference.name,
                        version = %reference.version,
                        "matched driver factory"
                    );
                    return factory.create(reference, id);
                }
            }
        }

        if skip_non_tests {
            Box::new(SkippedPackDriver::new(pack_path, id))
        } else {
            Box::new(InvalidPackDriver::new(
                pack_path,
                id,
                format!(
                    "No suitable tests found in '{}'.\n\
                     Either the pack contains no tests or no matching driver was registered.",
                    pack_path.display()
                ),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::test_support;
    use pretty_assertions::assert_eq;
    use quench_pack::PackSettings;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write_pack(dir: &TempDir, file: &str, bytes: Vec<u8>) -> PathBuf {
        let path = dir.path().join(file);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    fn load_document(driver: &dyn FrameworkDriver, path: &Path) -> String {
        driver.load(path, &PackSettings::new()).unwrap()
    }

    fn reference(version: &str) -> Requirement {
        Requirement::new(FRAMEWORK_NAME, test_support::version(version))
    }

    #[test]
    fn missing_file_is_invalid() {
        let service = DriverService::new();
        let path = Path::new("/nowhere/suite.qpack");
        let driver = service.driver_for(path, true);
        let document = load_document(driver.as_ref(), path);
        assert!(document.contains("runstate=\"NotRunnable\""));
        assert!(document.contains("File not found"));
    }

    #[test]
    fn unrecognized_file_type_is_invalid() {
        let dir = TempDir::new().unwrap();
        let path = write_pack(&dir, "notes.txt", b"just text".to_vec());
        let driver = DriverService::new().driver_for(&path, true);
        let document = load_document(driver.as_ref(), &path);
        assert!(document.contains("File type is not supported"));
    }

    #[test]
    fn torn_envelope_is_invalid() {
        let dir = TempDir::new().unwrap();
        let path = write_pack(&dir, "torn.qpack", b"QPXCK\0nonsense".to_vec());
        let driver = DriverService::new().driver_for(&path, true);
        let document = load_document(driver.as_ref(), &path);
        assert!(document.contains("runstate=\"NotRunnable\""));
    }

    #[test]
    fn non_runnable_target_skips_or_fails_by_flag() {
        let dir = TempDir::new().unwrap();
        let path = write_pack(
            &dir,
            "portable.qpack",
            test_support::plain_pack("portable", "1.0.0", Some("portable-1.0")),
        );

        let service = DriverService::new();
        let skipped = service.driver_for(&path, true);
        assert!(load_document(skipped.as_ref(), &path).contains("runstate=\"Runnable\""));

        let invalid = service.driver_for(&path, false);
        let document = load_document(invalid.as_ref(), &path);
        assert!(document.contains("runstate=\"NotRunnable\""));
        assert!(document.contains("portable-1.0"));
    }

    #[test]
    fn tool_packs_are_skipped_only_when_allowed() {
        let dir = TempDir::new().unwrap();
        let path = write_pack(
            &dir,
            "tool.qpack",
            test_support::tool_pack("reporter", "1.0.0", Vec::new()),
        );

        let service = DriverService::new();
        let skipped = service.driver_for(&path, true);
        assert!(load_document(skipped.as_ref(), &path).contains("value=\"Skipping non-test pack\""));

        // without the flag a tool pack falls through to the no-tests diagnostic
        let invalid = service.driver_for(&path, false);
        assert!(load_document(invalid.as_ref(), &path).contains("No suitable tests found"));
    }

    #[test]
    fn current_framework_reference_selects_the_versioned_driver() {
        let dir = TempDir::new().unwrap();
        let path = write_pack(
            &dir,
            "suite.qpack",
            test_support::test_pack("suite", FRAMEWORK_NAME, "3.2.0"),
        );

        let driver = DriverService::new().driver_for(&path, true);
        // a versioned driver insists on load-first; fallbacks never fail
        assert!(matches!(
            driver.count_test_cases("").unwrap_err(),
            EngineError::NotLoaded { .. }
        ));
    }

    #[test]
    fn legacy_reference_needs_the_opt_in_factory() {
        let dir = TempDir::new().unwrap();
        let path = write_pack(
            &dir,
            "suite.qpack",
            test_support::test_pack("suite", FRAMEWORK_NAME, "2.9.0"),
        );

        let default_service = DriverService::new();
        let fallback = default_service.driver_for(&path, false);
        assert!(load_document(fallback.as_ref(), &path).contains("No suitable tests found"));

        let service = DriverService::new().with_factory(Box::new(LegacyQuenchDriverFactory));
        let driver = service.driver_for(&path, false);
        assert!(matches!(
            driver.count_test_cases("").unwrap_err(),
            EngineError::NotLoaded { .. }
        ));
    }

    #[test]
    fn factory_version_bands() {
        let current = QuenchDriverFactory;
        assert!(current.supports(&reference("3.0.0")));
        assert!(current.supports(&reference("3.9.1")));
        assert!(!current.supports(&reference("2.9.0")));
        assert!(!current.supports(&Requirement::new(
            "other.framework",
            test_support::version("3.2.0")
        )));

        let legacy = LegacyQuenchDriverFactory;
        assert!(legacy.supports(&reference("2.5.0")));
        assert!(legacy.supports(&reference("2.9.9")));
        assert!(!legacy.supports(&reference("2.4.9")));
        assert!(!legacy.supports(&reference("3.0.0")));
    }

    #[test]
    fn driver_ids_increment_per_service() {
        let dir = TempDir::new().unwrap();
        let path = write_pack(
            &dir,
            "plain.qpack",
            test_support::plain_pack("plain", "1.0.0", None),
        );

        let service = DriverService::new();
        let first = service.driver_for(&path, true);
        let second = service.driver_for(&path, true);
        assert_eq!(first.id(), "1");
        assert_eq!(second.id(), "2");
    }
}
