//! Mock input source for unit testing.
//!
//! Tests script batches of [`RawInputEvent`]s; each call to
//! [`InputSource::poll_events`] returns the next batch (or nothing once the
//! script runs out). Every overlay update is recorded so tests can assert on
//! what the user would have seen.
//!
//! The mock is `Clone` and all clones share state, so a test can hand one
//! clone to the capture loop and keep another for assertions.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::{CaptureError, InputSource, RawInputEvent};

#[derive(Default)]
struct State {
    batches: VecDeque<Vec<RawInputEvent>>,
    poll_error: Option<String>,
    shown: bool,
    polls: u32,
    renders: Vec<String>,
    refreshes: u32,
}

/// A mock implementation of [`InputSource`] driven by a script.
#[derive(Clone, Default)]
pub struct MockInputSource {
    state: Arc<Mutex<State>>,
}

impl MockInputSource {
    /// Creates a mock with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a batch to be returned by one future poll.
    pub fn push_batch(&self, batch: impl IntoIterator<Item = RawInputEvent>) {
        let mut state = self.state.lock().expect("lock poisoned");
        state.batches.push_back(batch.into_iter().collect());
    }

    /// Makes every poll after the scripted batches fail with `message`.
    pub fn fail_polls(&self, message: impl Into<String>) {
        self.state.lock().expect("lock poisoned").poll_error = Some(message.into());
    }

    /// Returns `true` once [`InputSource::show`] has been called.
    pub fn shown(&self) -> bool {
        self.state.lock().expect("lock poisoned").shown
    }

    /// Number of polls so far.
    pub fn polls(&self) -> u32 {
        self.state.lock().expect("lock poisoned").polls
    }

    /// Every text passed to [`InputSource::render`], in order.
    pub fn renders(&self) -> Vec<String> {
        self.state.lock().expect("lock poisoned").renders.clone()
    }

    /// Number of refreshes so far.
    pub fn refreshes(&self) -> u32 {
        self.state.lock().expect("lock poisoned").refreshes
    }
}

impl InputSource for MockInputSource {
    fn show(&mut self) -> Result<(), CaptureError> {
        self.state.lock().expect("lock poisoned").shown = true;
        Ok(())
    }

    fn poll_events(&mut self) -> Result<Vec<RawInputEvent>, CaptureError> {
        let mut state = self.state.lock().expect("lock poisoned");
        state.polls += 1;
        if let Some(batch) = state.batches.pop_front() {
            return Ok(batch);
        }
        match &state.poll_error {
            Some(message) => Err(CaptureError::Failed(message.clone())),
            None => Ok(Vec::new()),
        }
    }

    fn render(&mut self, text: &str) -> Result<(), CaptureError> {
        self.state
            .lock()
            .expect("lock poisoned")
            .renders
            .push(text.to_string());
        Ok(())
    }

    fn refresh(&mut self) -> Result<(), CaptureError> {
        self.state.lock().expect("lock poisoned").refreshes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::input_capture::RawModifiers;

    #[test]
    fn test_batches_are_returned_in_order_then_empty() {
        // Arrange
        let mut source = MockInputSource::new();
        source.push_batch([RawInputEvent::KeyDown {
            scancode: 0x04,
            modifiers: RawModifiers::NONE,
        }]);
        source.push_batch([RawInputEvent::Quit]);

        // Act
        let first = source.poll_events().unwrap();
        let second = source.poll_events().unwrap();
        let third = source.poll_events().unwrap();

        // Assert
        assert!(matches!(first[0], RawInputEvent::KeyDown { scancode: 0x04, .. }));
        assert_eq!(second, vec![RawInputEvent::Quit]);
        assert!(third.is_empty());
        assert_eq!(source.polls(), 3);
    }

    #[test]
    fn test_fail_polls_applies_after_script() {
        let mut source = MockInputSource::new();
        source.push_batch([]);
        source.fail_polls("tty gone");

        assert!(source.poll_events().is_ok());
        assert!(matches!(source.poll_events(), Err(CaptureError::Failed(_))));
    }

    #[test]
    fn test_clones_share_recorded_state() {
        // Arrange
        let observer = MockInputSource::new();
        let mut source = observer.clone();

        // Act
        source.show().unwrap();
        source.render("LSHIFT + A").unwrap();
        source.refresh().unwrap();

        // Assert
        assert!(observer.shown());
        assert_eq!(observer.renders(), vec!["LSHIFT + A".to_string()]);
        assert_eq!(observer.refreshes(), 1);
    }
}
