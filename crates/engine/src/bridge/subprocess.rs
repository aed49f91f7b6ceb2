//! Controller subprocess transport.

use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use tracing::debug;

use super::{ControllerTransport, FrameSink, FrameSource};
use crate::error::{EngineError, Result};

/// Kills the controller process when dropped.
#[derive(Debug)]
pub struct ProcessGuard {
    child: Child,
}

impl ProcessGuard {
    /// OS process id of the controller.
    pub fn id(&self) -> u32 {
        self.child.id()
    }
}

impl Drop for ProcessGuard {
    fn drop(&mut self) {
        // The process may have exited on its own; both calls tolerate that.
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Spawns controller processes wired for line-framed stdio.
pub struct SubprocessTransport;

impl SubprocessTransport {
    /// Starts `program` with `args`, piping its stdin and stdout as the
    /// frame channel. Stderr is discarded.
    pub fn spawn(
        program: &Path,
        args: &[String],
        work_dir: Option<&Path>,
    ) -> Result<ControllerTransport> {
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        if let Some(dir) = work_dir {
            command.current_dir(dir);
        }
        debug!(program = %program.display(), ?args, "starting controller process");

        let start_error = |reason: String| EngineError::ControllerStart {
            path: program.to_path_buf(),
            reason,
        };
        let mut child = command.spawn().map_err(|err| start_error(err.to_string()))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| start_error("stdin was not captured".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| start_error("stdout was not captured".to_string()))?;

        Ok(ControllerTransport {
            sink: Box::new(PipeSink { stdin }),
            source: Box::new(PipeSource {
                reader: BufReader::new(stdout),
            }),
            guard: Some(ProcessGuard { child }),
        })
    }
}

struct PipeSink {
    stdin: ChildStdin,
}

impl FrameSink for PipeSink {
    fn send(&mut self, frame: &str) -> Result<()> {
        self.stdin.write_all(frame.as_bytes())?;
        self.stdin.write_all(b"\n")?;
        self.stdin.flush()?;
        Ok(())
    }
}

struct PipeSource {
    reader: BufReader<ChildStdout>,
}

impl FrameSource for PipeSource {
    fn recv(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(Some(line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(unix)]
    fn round_trips_lines_through_a_real_process() {
        let mut transport =
            SubprocessTransport::spawn(Path::new("cat"), &[], None).unwrap();
        transport.sink.send("hello controller").unwrap();
        assert_eq!(
            transport.source.recv().unwrap(),
            Some("hello controller".to_string())
        );
        drop(transport.sink);
        assert_eq!(transport.source.recv().unwrap(), None);
    }

    #[test]
    fn missing_program_reports_controller_start() {
        let err = SubprocessTransport::spawn(
            Path::new("/definitely/not/a/controller"),
            &[],
            None,
        )
        .map(|_| ())
        .unwrap_err();
        assert!(matches!(err, EngineError::ControllerStart { .. }));
    }
}
