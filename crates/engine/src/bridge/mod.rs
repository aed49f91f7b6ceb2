//! Stdio bridge to framework controller processes.
//!
//! A controller is an executable shipped by a framework pack. The engine
//! talks to it over line-framed stdio; [`ControllerClient`] normalizes
//! the two calling conventions controllers may speak.

mod client;
#[cfg(test)]
pub(crate) mod scripted;
mod subprocess;

pub use client::{ControllerClient, Convention};
pub use subprocess::{ProcessGuard, SubprocessTransport};

use crate::error::Result;

/// Sends request frames to a controller. A frame is one line on the
/// wire; implementations append the terminator.
pub trait FrameSink: Send {
    fn send(&mut self, frame: &str) -> Result<()>;
}

/// Receives reply frames from a controller.
pub trait FrameSource: Send {
    /// Blocks until the next frame arrives. `None` means the controller
    /// closed its end of the channel.
    fn recv(&mut self) -> Result<Option<String>>;
}

/// Both ends of a controller connection, plus teardown of the process
/// when the connection owns one.
pub struct ControllerTransport {
    pub sink: Box<dyn FrameSink>,
    pub source: Box<dyn FrameSource>,
    pub guard: Option<ProcessGuard>,
}
