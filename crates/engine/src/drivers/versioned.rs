//! Driver for packs built against a supported framework version.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::thread;

use tracing::{debug, warn};

use super::fallback::NotRunnableReport;
use super::FrameworkDriver;
use crate::bridge::{ControllerClient, Convention, SubprocessTransport};
use crate::error::{EngineError, Result};
use crate::events::{EventCallback, TestEventListener};
use quench_pack::settings::keys;
use quench_pack::{PackFile, PackSettings, Requirement, RuntimeFamily, RuntimeTarget};

/// Drives one test pack through the controller its framework ships.
///
/// The calling convention is fixed at construction from the framework
/// reference: the 2.x line speaks the legacy protocol, 3.x the direct
/// one. `load` spawns the controller; dropping the driver tears the
/// process down.
pub struct VersionedDriver {
    id: String,
    reference: Requirement,
    convention: Convention,
    session: Mutex<Option<Session>>,
}

/// Connection plus the pack it was loaded for. Clones share the
/// connection.
#[derive(Clone)]
struct Session {
    client: ControllerClient,
    pack_path: PathBuf,
}

impl VersionedDriver {
    pub fn new(id: impl Into<String>, reference: Requirement) -> Self {
        let convention = Convention::for_framework(&reference.version);
        VersionedDriver {
            id: id.into(),
            reference,
            convention,
            session: Mutex::new(None),
        }
    }

    pub fn convention(&self) -> Convention {
        self.convention
    }

    pub fn reference(&self) -> &Requirement {
        &self.reference
    }

    /// Locates the framework pack shipped beside the test pack and the
    /// controller executable it names.
    fn resolve_controller(&self, pack_dir: &Path) -> Result<PathBuf> {
        let framework_path = pack_dir.join(format!("{}.qpack", self.reference.name));
        if !framework_path.exists() {
            return Err(EngineError::ControllerStart {
                path: framework_path,
                reason: format!(
                    "framework pack for '{}' not found beside the test pack",
                    self.reference.name
                ),
            });
        }

        let framework = PackFile::open(&framework_path)?;
        if *framework.version() != self.reference.version {
            warn!(
                referenced = %self.reference.version,
                shipped = %framework.version(),
                "framework pack version differs from the pack's reference"
            );
        }
        let Some(info) = &framework.header().framework else {
            return Err(EngineError::ControllerStart {
                path: framework_path,
                reason: "pack declares no [framework] controller".to_string(),
            });
        };

        let controller = pack_dir.join(&info.controller);
        if !controller.exists() {
            return Err(EngineError::ControllerStart {
                path: controller,
                reason: "controller executable is missing".to_string(),
            });
        }
        Ok(controller)
    }

    /// Clones the session out of the state lock, so long-running
    /// operations never hold it.
    fn session(&self) -> Result<Session> {
        self.lock_session()
            .clone()
            .ok_or_else(|| EngineError::NotLoaded {
                id: self.id.clone(),
            })
    }

    fn lock_session(&self) -> MutexGuard<'_, Option<Session>> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    #[cfg(test)]
    pub(crate) fn from_parts(
        id: impl Into<String>,
        reference: Requirement,
        client: ControllerClient,
        pack_path: &Path,
    ) -> Self {
        let convention = client.convention();
        VersionedDriver {
            id: id.into(),
            reference,
            convention,
            session: Mutex::new(Some(Session {
                client,
                pack_path: pack_path.to_path_buf(),
            })),
        }
    }
}

impl FrameworkDriver for VersionedDriver {
    fn id(&self) -> &str {
        &self.id
    }

    fn load(&self, pack_path: &Path, settings: &PackSettings) -> Result<String> {
        let mut state = self.lock_session();
        if state.is_some() {
            return Err(EngineError::AlreadyLoaded {
                id: self.id.clone(),
            });
        }

        let pack = PackFile::open(pack_path)?;
        if let Some(requested) = settings.get(keys::REQUESTED_RUNTIME) {
            let requested = RuntimeTarget::parse(requested)?;
            if let Some(declared) = pack.target() {
                if !runtime_satisfies(&requested, declared) {
                    return Err(EngineError::RuntimeMismatch {
                        requested: requested.to_string(),
                        declared: declared.to_string(),
                    });
                }
            }
        }

        let pack_dir = pack_path.parent().unwrap_or_else(|| Path::new("."));
        let controller = self.resolve_controller(pack_dir)?;

        let args = match self.convention {
            Convention::Direct => vec!["serve".to_string()],
            // Legacy controllers take their construction arguments on
            // the command line.
            Convention::Legacy => {
                let mut args = vec![pack_path.display().to_string(), self.id.clone()];
                args.extend(settings.iter().map(|(key, value)| format!("{key}={value}")));
                args
            }
        };
        let work_dir = settings.get(keys::WORK_DIRECTORY).map(Path::new);

        debug!(
            pack = %pack_path.display(),
            controller = %controller.display(),
            convention = ?self.convention,
            "starting framework controller"
        );
        let transport = SubprocessTransport::spawn(&controller, &args, work_dir)?;
        let client = ControllerClient::new(transport, self.convention);
        client.create_controller(pack_path, &self.id, settings)?;
        let report = client.load()?;
        *state = Some(Session {
            client,
            pack_path: pack_path.to_path_buf(),
        });
        Ok(report)
    }

    fn count_test_cases(&self, filter: &str) -> Result<u32> {
        let reply = self.session()?.client.count(filter)?;
        reply.trim().parse().map_err(|_| {
            EngineError::Protocol(format!("count reply is not a number: {reply}"))
        })
    }

    fn run(&self, listener: Option<&dyn TestEventListener>, filter: &str) -> Result<String> {
        self.session()?.client.run(filter, &|report| {
            if let Some(listener) = listener {
                listener.on_test_event(report);
            }
        })
    }

    fn run_async(&self, callback: EventCallback, filter: &str) -> Result<()> {
        let session = self.session()?;
        let filter = filter.to_string();
        let id = self.id.clone();
        thread::Builder::new()
            .name(format!("run-{}", self.id))
            .spawn(move || {
                let outcome = session.client.run(&filter, &|report| callback(report));
                match outcome {
                    Ok(report) => callback(&report),
                    // A fire-and-forget caller has no other way to see
                    // the run die, so the failure becomes the terminal
                    // document.
                    Err(err) => {
                        warn!(%err, "background run failed");
                        let report = NotRunnableReport::errored(
                            &session.pack_path,
                            &id,
                            &err.to_string(),
                        );
                        callback(&report.run_document());
                    }
                }
            })?;
        Ok(())
    }

    fn explore(&self, filter: &str) -> Result<String> {
        self.session()?.client.explore(filter)
    }

    fn stop_run(&self, force: bool) -> Result<()> {
        // Not an error when nothing was loaded; there is no run to stop.
        match &*self.lock_session() {
            Some(session) => session.client.stop_run(force),
            None => Ok(()),
        }
    }
}

/// Whether a requested runtime can host a pack declaring `declared`.
/// Same-family upgrades are fine; standard-target packs run under either
/// runnable family.
fn runtime_satisfies(requested: &RuntimeTarget, declared: &RuntimeTarget) -> bool {
    if requested.family == declared.family {
        return requested.version >= declared.version;
    }
    matches!(
        (requested.family, declared.family),
        (
            RuntimeFamily::Modern | RuntimeFamily::Classic,
            RuntimeFamily::Standard
        )
    )
}
