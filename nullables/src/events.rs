//! Nullable event sink: records every event for assertions.

use idgate_verification::{EventSink, VerificationEvent};
use std::sync::Mutex;

#[derive(Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<VerificationEvent>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything emitted so far, in order.
    pub fn events(&self) -> Vec<VerificationEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Event kinds emitted so far, in order.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().iter().map(|e| e.kind()).collect()
    }

    pub fn count_of(&self, kind: &str) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.kind() == kind)
            .count()
    }

    /// Drain recorded events.
    pub fn take(&self) -> Vec<VerificationEvent> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }
}

impl EventSink for RecordingEventSink {
    fn emit(&self, event: VerificationEvent) {
        self.events.lock().unwrap().push(event);
    }
}
