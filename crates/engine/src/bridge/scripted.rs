//! Scripted transport for exercising the client without a process.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::{ControllerTransport, FrameSink, FrameSource};
use crate::error::Result;

struct RecordingSink {
    sent: Arc<Mutex<Vec<String>>>,
}

impl FrameSink for RecordingSink {
    fn send(&mut self, frame: &str) -> Result<()> {
        self.sent.lock().unwrap().push(frame.to_string());
        Ok(())
    }
}

struct QueueSource {
    replies: VecDeque<String>,
}

impl FrameSource for QueueSource {
    fn recv(&mut self) -> Result<Option<String>> {
        Ok(self.replies.pop_front())
    }
}

/// Builds a transport that replays `replies` and records every sent
/// frame into the returned log.
pub(crate) fn scripted(replies: &[&str]) -> (ControllerTransport, Arc<Mutex<Vec<String>>>) {
    let sent = Arc::new(Mutex::new(Vec::new()));
    let transport = ControllerTransport {
        sink: Box::new(RecordingSink { sent: Arc::clone(&sent) }),
        source: Box::new(QueueSource {
            replies: replies.iter().map(|reply| reply.to_string()).collect(),
        }),
        guard: None,
    };
    (transport, sent)
}
