//! Drivers for packs that cannot run.
//!
//! Selection never fails with an error for "this is not a test pack".
//! Such packs get one of the drivers here instead, and every operation
//! yields the same fixed diagnostic document, so downstream aggregation
//! treats all packs uniformly.

use std::path::{Path, PathBuf};

use quench_pack::{is_pack_file_type, PackSettings};

use super::FrameworkDriver;
use crate::error::Result;
use crate::events::{EventCallback, TestEventListener};
use crate::results::XmlBuilder;

/// The one document a not-runnable driver ever produces, in its load and
/// run shapes. Also borrowed by [`VersionedDriver`] to report a run that
/// died in the background.
///
/// [`VersionedDriver`]: super::VersionedDriver
pub(crate) struct NotRunnableReport {
    pack_path: PathBuf,
    id: String,
    message: String,
    run_state: &'static str,
    result: &'static str,
    label: &'static str,
}

impl NotRunnableReport {
    /// Report for a run that started but failed with an engine error.
    pub(crate) fn errored(pack_path: &Path, id: &str, message: &str) -> Self {
        NotRunnableReport {
            pack_path: pack_path.to_path_buf(),
            id: id.to_string(),
            message: message.to_string(),
            run_state: "NotRunnable",
            result: "Failed",
            label: "Error",
        }
    }

    fn load_document(&self) -> String {
        self.document(false)
    }

    pub(crate) fn run_document(&self) -> String {
        self.document(true)
    }

    fn document(&self, ran: bool) -> String {
        let suite_type = if is_pack_file_type(&self.pack_path) {
            "Pack"
        } else {
            "Unknown"
        };
        let id = format!("{}-1", self.id);
        let name = self
            .pack_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let fullname = self.pack_path.display().to_string();

        let mut attrs = vec![
            ("type", suite_type),
            ("id", id.as_str()),
            ("name", name.as_str()),
            ("fullname", fullname.as_str()),
            ("testcasecount", "0"),
            ("runstate", self.run_state),
        ];
        if ran {
            attrs.push(("result", self.result));
            attrs.push(("label", self.label));
        }

        let mut xml = XmlBuilder::new();
        xml.open("test-suite", &attrs);
        xml.open("properties", &[]);
        xml.empty("property", &[("name", "_SKIPREASON"), ("value", &self.message)]);
        xml.close("properties");
        if ran {
            xml.open("reason", &[]);
            xml.text_element("message", &self.message);
            xml.close("reason");
        }
        xml.close("test-suite");
        xml.finish()
    }
}

/// Driver for a pack that cannot be loaded. Reports a failed,
/// not-runnable suite carrying the reason.
pub struct InvalidPackDriver {
    report: NotRunnableReport,
}

impl InvalidPackDriver {
    pub fn new(pack_path: &Path, id: impl Into<String>, message: impl Into<String>) -> Self {
        InvalidPackDriver {
            report: NotRunnableReport {
                pack_path: pack_path.to_path_buf(),
                id: id.into(),
                message: message.into(),
                run_state: "NotRunnable",
                result: "Failed",
                label: "Invalid",
            },
        }
    }
}

impl FrameworkDriver for InvalidPackDriver {
    fn id(&self) -> &str {
        &self.report.id
    }

    fn load(&self, _pack_path: &Path, _settings: &PackSettings) -> Result<String> {
        Ok(self.report.load_document())
    }

    fn count_test_cases(&self, _filter: &str) -> Result<u32> {
        Ok(0)
    }

    fn run(&self, _listener: Option<&dyn TestEventListener>, _filter: &str) -> Result<String> {
        Ok(self.report.run_document())
    }

    fn run_async(&self, callback: EventCallback, _filter: &str) -> Result<()> {
        callback(&self.report.run_document());
        Ok(())
    }

    fn explore(&self, _filter: &str) -> Result<String> {
        Ok(self.report.load_document())
    }

    fn stop_run(&self, _force: bool) -> Result<()> {
        Ok(())
    }
}

/// Driver for a pack the caller chose to skip rather than fail. Reports
/// a runnable suite whose result is Skipped with label NoTests.
pub struct SkippedPackDriver {
    report: NotRunnableReport,
}

impl SkippedPackDriver {
    pub fn new(pack_path: &Path, id: impl Into<String>) -> Self {
        SkippedPackDriver {
            report: NotRunnableReport {
                pack_path: pack_path.to_path_buf(),
                id: id.into(),
                message: "Skipping non-test pack".to_string(),
                run_state: "Runnable",
                result: "Skipped",
                label: "NoTests",
            },
        }
    }
}

impl FrameworkDriver for SkippedPackDriver {
    fn id(&self) -> &str {
        &self.report.id
    }

    fn load(&self, _pack_path: &Path, _settings: &PackSettings) -> Result<String> {
        Ok(self.report.load_document())
    }

    fn count_test_cases(&self, _filter: &str) -> Result<u32> {
        Ok(0)
    }

    fn run(&self, _listener: Option<&dyn TestEventListener>, _filter: &str) -> Result<String> {
        Ok(self.report.run_document())
    }

    fn run_async(&self, callback: EventCallback, _filter: &str) -> Result<()> {
        callback(&self.report.run_document());
        Ok(())
    }

    fn explore(&self, _filter: &str) -> Result<String> {
        Ok(self.report.load_document())
    }

    fn stop_run(&self, _force: bool) -> Result<()> {
        Ok(())
    }
}
