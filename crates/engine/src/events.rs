//! Progress events emitted while tests run.

use std::sync::{Arc, Mutex};

/// Receives progress reports from a running driver. Reports are XML
/// fragments produced by the framework; the engine forwards them without
/// interpretation.
pub trait TestEventListener: Send + Sync {
    fn on_test_event(&self, report: &str);
}

/// Owned callback form used by asynchronous runs.
pub type EventCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Listener that collects every report it receives.
#[derive(Debug, Default)]
pub struct EventRecorder {
    events: Mutex<Vec<String>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        EventRecorder::default()
    }

    /// Reports received so far, in arrival order.
    pub fn events(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl TestEventListener for EventRecorder {
    fn on_test_event(&self, report: &str) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(report.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorder_keeps_arrival_order() {
        let recorder = EventRecorder::new();
        recorder.on_test_event("<a/>");
        recorder.on_test_event("<b/>");
        assert_eq!(recorder.events(), vec!["<a/>".to_string(), "<b/>".to_string()]);
    }
}
