//! RPC client over a controller transport.
//!
//! Controllers speak one of two conventions. The legacy line protocol of
//! 2.x frameworks carries verbs and percent-encoded payload lines; every
//! intermediate reply is a progress callback and the last one before the
//! terminator is the result. The direct protocol of 3.x frameworks
//! exchanges one JSON object per line with explicit ok/error replies and
//! interleaved event frames. The client hides the difference behind one
//! operation surface.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use semver::Version;
use serde_json::{json, Value};
use tracing::warn;

use super::{ControllerTransport, FrameSink, FrameSource, ProcessGuard};
use crate::error::{EngineError, Result};
use quench_pack::PackSettings;

/// Calling convention spoken by a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convention {
    /// Line-framed verbs; spoken by 2.x frameworks.
    Legacy,
    /// JSON requests and replies; spoken by 3.x frameworks.
    Direct,
}

impl Convention {
    /// Lowest framework version that speaks the direct protocol.
    pub fn direct_floor() -> Version {
        Version::new(3, 0, 0)
    }

    /// Convention for a framework version. Decided once, when a driver
    /// is constructed.
    pub fn for_framework(version: &Version) -> Convention {
        if *version < Convention::direct_floor() {
            Convention::Legacy
        } else {
            Convention::Direct
        }
    }
}

/// Client for one controller connection.
///
/// Clones share the connection. The write half and the read half are
/// locked separately so that a cancellation can be sent while another
/// thread is blocked reading run replies.
pub struct ControllerClient {
    convention: Convention,
    sink: Arc<Mutex<Box<dyn FrameSink>>>,
    source: Arc<Mutex<Box<dyn FrameSource>>>,
    guard: Option<Arc<ProcessGuard>>,
}

impl Clone for ControllerClient {
    fn clone(&self) -> Self {
        ControllerClient {
            convention: self.convention,
            sink: Arc::clone(&self.sink),
            source: Arc::clone(&self.source),
            guard: self.guard.clone(),
        }
    }
}

impl ControllerClient {
    pub fn new(transport: ControllerTransport, convention: Convention) -> Self {
        ControllerClient {
            convention,
            sink: Arc::new(Mutex::new(transport.sink)),
            source: Arc::new(Mutex::new(transport.source)),
            guard: transport.guard.map(Arc::new),
        }
    }

    pub fn convention(&self) -> Convention {
        self.convention
    }

    /// Direct-convention construction step. Legacy controllers receive
    /// their construction arguments on the command line instead, so this
    /// is a no-op for them.
    pub fn create_controller(
        &self,
        pack: &Path,
        id_prefix: &str,
        settings: &PackSettings,
    ) -> Result<()> {
        match self.convention {
            Convention::Legacy => Ok(()),
            Convention::Direct => self
                .request(
                    "CreateController",
                    json!({
                        "pack": pack.display().to_string(),
                        "idPrefix": id_prefix,
                        "settings": settings,
                    }),
                    None,
                )
                .map(|_| ()),
        }
    }

    /// Loads the pack; returns the load report.
    pub fn load(&self) -> Result<String> {
        self.operation("LoadTests", "LOAD", None, None)
    }

    /// Describes the tests selected by `filter` without running them.
    pub fn explore(&self, filter: &str) -> Result<String> {
        self.operation("ExploreTests", "EXPLORE", Some(filter), None)
    }

    /// Counts the tests selected by `filter`; the reply is the bare count.
    pub fn count(&self, filter: &str) -> Result<String> {
        self.operation("CountTests", "COUNT", Some(filter), None)
    }

    /// Runs the tests selected by `filter`. Progress reports are passed
    /// to `on_event`; the returned string is the final result document.
    pub fn run(&self, filter: &str, on_event: &dyn Fn(&str)) -> Result<String> {
        self.operation("RunTests", "RUN", Some(filter), Some(on_event))
    }

    /// Asks the controller to cancel the run in progress. Writes on the
    /// send half only and never waits for a reply, so it is safe while
    /// another thread is blocked inside `run`.
    pub fn stop_run(&self, force: bool) -> Result<()> {
        match self.convention {
            Convention::Legacy => {
                self.send(&format!("STOP {}", if force { "FORCE" } else { "SOFT" }))
            }
            Convention::Direct => self.send(
                &json!({
                    "notify": "StopRun",
                    "params": { "force": force },
                })
                .to_string(),
            ),
        }
    }

    fn operation(
        &self,
        method: &str,
        verb: &str,
        filter: Option<&str>,
        on_event: Option<&dyn Fn(&str)>,
    ) -> Result<String> {
        match self.convention {
            Convention::Direct => {
                let params = match filter {
                    Some(filter) => json!({ "filter": filter }),
                    None => json!({}),
                };
                self.request(method, params, on_event)
            }
            Convention::Legacy => self.exchange(verb, filter, on_event),
        }
    }

    /// One direct-protocol request. Event frames arriving before the
    /// reply are forwarded to `on_event`.
    fn request(&self, method: &str, params: Value, on_event: Option<&dyn Fn(&str)>) -> Result<String> {
        self.send(&json!({ "method": method, "params": params }).to_string())?;

        let mut source = self.lock_source();
        loop {
            let Some(line) = source.recv()? else {
                return Err(EngineError::Protocol(format!(
                    "controller closed the stream during {method}"
                )));
            };
            if line.trim().is_empty() {
                continue;
            }
            let value: Value = serde_json::from_str(&line).map_err(|err| {
                EngineError::Protocol(format!("frame is not valid JSON: {err}"))
            })?;

            if let Some(event) = value.get("event") {
                match event.as_str() {
                    Some(report) => {
                        if let Some(callback) = on_event {
                            callback(report);
                        }
                    }
                    None => warn!("event frame without a string payload; dropped"),
                }
                continue;
            }

            match value.get("ok").and_then(Value::as_bool) {
                Some(true) => {
                    return Ok(match value.get("result") {
                        Some(Value::String(text)) => text.clone(),
                        Some(other) => other.to_string(),
                        None => String::new(),
                    });
                }
                Some(false) => {
                    let (kind, message) = error_parts(&value);
                    if kind == "missing-method" {
                        return Err(EngineError::MissingOperation {
                            operation: method.to_string(),
                        });
                    }
                    return Err(EngineError::Controller {
                        operation: method.to_string(),
                        message,
                    });
                }
                None => {
                    return Err(EngineError::Protocol(format!("unexpected frame: {line}")));
                }
            }
        }
    }

    /// One legacy-protocol exchange. Every reply but the last is a
    /// progress callback; one reply is held back until the next frame
    /// shows whether it was final.
    fn exchange(
        &self,
        verb: &str,
        arg: Option<&str>,
        on_event: Option<&dyn Fn(&str)>,
    ) -> Result<String> {
        let frame = match arg {
            Some(arg) => format!("{verb} {}", encode(arg)),
            None => verb.to_string(),
        };
        self.send(&frame)?;

        let mut source = self.lock_source();
        let mut held: Option<String> = None;
        loop {
            let Some(line) = source.recv()? else {
                return Err(EngineError::Protocol(format!(
                    "controller closed the stream during {verb}"
                )));
            };
            if let Some(payload) = line.strip_prefix("R ") {
                if let Some(previous) = held.replace(decode(payload)) {
                    if let Some(callback) = on_event {
                        callback(&previous);
                    }
                }
            } else if let Some(payload) = line.strip_prefix("E ") {
                return Err(EngineError::Controller {
                    operation: verb.to_string(),
                    message: decode(payload),
                });
            } else if let Some(unknown) = line.strip_prefix("NAK ") {
                return Err(EngineError::MissingOperation {
                    operation: unknown.trim().to_string(),
                });
            } else if line == "DONE" {
                return held.ok_or_else(|| {
                    EngineError::Protocol(format!("{verb} produced no result"))
                });
            } else {
                return Err(EngineError::Protocol(format!("unexpected frame: {line}")));
            }
        }
    }

    fn send(&self, frame: &str) -> Result<()> {
        let mut sink = self.sink.lock().unwrap_or_else(|e| e.into_inner());
        sink.send(frame)
    }

    fn lock_source(&self) -> MutexGuard<'_, Box<dyn FrameSource>> {
        self.source.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn error_parts(value: &Value) -> (String, String) {
    let error = value.get("error");
    let kind = error
        .and_then(|e| e.get("kind"))
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();
    let message = error
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .unwrap_or("controller reported an unspecified failure")
        .to_string();
    (kind, message)
}

/// Percent-encodes the characters a payload line cannot carry.
fn encode(text: &str) -> String {
    text.replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Reverses [`encode`]. The escape introducer is decoded last so encoded
/// escapes survive.
fn decode(text: &str) -> String {
    text.replace("%0A", "\n")
        .replace("%0D", "\r")
        .replace("%25", "%")
}
