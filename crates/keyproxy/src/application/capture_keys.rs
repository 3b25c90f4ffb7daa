//! KeyboardCapturer: turns key presses into queued [`KeyEvent`]s.
//!
//! The capturer runs a fixed-rate loop on the foreground task:
//!
//! 1. drain whatever the [`InputSource`] collected since the last tick;
//! 2. push every key event onto the event queue and update the overlay;
//! 3. redraw;
//! 4. stop if the sender has died;
//! 5. sleep one tick.
//!
//! The capturer never waits on the sender. Pushing onto the queue cannot block,
//! so keys typed while the peripheral is still being found or reconnected are
//! simply kept in order until the sender can drain them.
//!
//! Faults from the BLE side are never shown on the overlay; the only thing the
//! capturer learns about the sender is whether it is still alive.

use std::time::Duration;

use keyproxy_core::keymap::scancode_name;
use keyproxy_core::{EventQueueProducer, KeyEvent, SenderLiveness};
use tokio::time;
use tracing::{debug, error, info};

use crate::infrastructure::input_capture::{InputSource, RawInputEvent, RawModifiers};

/// Default pause between two capture iterations.
pub const DEFAULT_CAPTURE_DELAY: Duration = Duration::from_millis(50);

/// Why the capture loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    /// The user closed the capture window.
    WindowClosed,
    /// The sender is no longer running.
    SenderDied,
    /// The input source reported an error.
    InputFailed(String),
}

/// Builds the overlay text for one key event.
///
/// Lists the held modifiers joined with `" + "`. On key-down the name of the
/// pressed key is appended, when it has one. Returns an empty string when
/// there is nothing to show.
///
/// ```text
/// LSHIFT + LCTRL + A
/// ```
pub fn status_text(pressed: bool, scancode: u8, modifiers: RawModifiers) -> String {
    let mut parts = modifiers.names();
    if pressed {
        if let Some(name) = scancode_name(scancode) {
            parts.push(name);
        }
    }
    parts.join(" + ")
}

/// The capture loop.
pub struct KeyboardCapturer {
    input: Box<dyn InputSource>,
    queue: EventQueueProducer,
    liveness: SenderLiveness,
    delay: Duration,
    captured: u64,
}

impl KeyboardCapturer {
    pub fn new(
        input: Box<dyn InputSource>,
        queue: EventQueueProducer,
        liveness: SenderLiveness,
        delay: Duration,
    ) -> Self {
        Self {
            input,
            queue,
            liveness,
            delay,
            captured: 0,
        }
    }

    /// Number of key events pushed onto the queue so far.
    pub fn captured(&self) -> u64 {
        self.captured
    }

    /// Runs until the window closes, the sender dies or input fails.
    pub async fn run(&mut self) -> ExitReason {
        if let Err(e) = self.input.show().and_then(|()| self.input.render("")) {
            error!("failed to open capture window: {e}");
            return ExitReason::InputFailed(e.to_string());
        }
        info!("capturing keys every {:?}", self.delay);

        loop {
            let events = match self.input.poll_events() {
                Ok(events) => events,
                Err(e) => {
                    error!("input source failed: {e}");
                    return ExitReason::InputFailed(e.to_string());
                }
            };

            for event in events {
                match event {
                    RawInputEvent::Quit => {
                        info!("capture window closed");
                        return ExitReason::WindowClosed;
                    }
                    RawInputEvent::KeyDown { scancode, modifiers } => {
                        self.capture(true, scancode, modifiers);
                    }
                    RawInputEvent::KeyUp { scancode, modifiers } => {
                        self.capture(false, scancode, modifiers);
                    }
                }
            }

            if let Err(e) = self.input.refresh() {
                error!("failed to redraw capture window: {e}");
                return ExitReason::InputFailed(e.to_string());
            }

            if !self.liveness.is_alive() {
                info!("sender is not alive, closing capture window");
                return ExitReason::SenderDied;
            }

            time::sleep(self.delay).await;
        }
    }

    fn capture(&mut self, pressed: bool, scancode: u8, modifiers: RawModifiers) {
        let event = KeyEvent {
            pressed,
            scancode,
            modifiers: modifiers.to_mask(),
        };
        match self.queue.push(&event) {
            Ok(()) => {
                self.captured += 1;
                debug!("queued {event}");
            }
            // The sender dropped its end; the liveness check ends the loop.
            Err(e) => debug!("dropping {event}: {e}"),
        }

        let text = status_text(pressed, scancode, modifiers);
        if let Err(e) = self.input.render(&text) {
            debug!("failed to update overlay: {e}");
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use keyproxy_core::{event_queue, EventQueueConsumer, ModifierMask};

    use super::*;
    use crate::infrastructure::input_capture::mock::MockInputSource;

    fn key_down(scancode: u8, modifiers: u16) -> RawInputEvent {
        RawInputEvent::KeyDown {
            scancode,
            modifiers: RawModifiers(modifiers),
        }
    }

    fn key_up(scancode: u8, modifiers: u16) -> RawInputEvent {
        RawInputEvent::KeyUp {
            scancode,
            modifiers: RawModifiers(modifiers),
        }
    }

    fn drain(consumer: &mut EventQueueConsumer) -> Vec<KeyEvent> {
        let mut events = Vec::new();
        while let Ok(Some(event)) = consumer.try_pop() {
            events.push(event);
        }
        events
    }

    // ── status_text ───────────────────────────────────────────────────────────

    #[test]
    fn test_status_text_key_down_appends_key_name() {
        let text = status_text(
            true,
            0x04,
            RawModifiers(RawModifiers::LSHIFT | RawModifiers::LCTRL),
        );

        assert_eq!(text, "LSHIFT + LCTRL + A");
    }

    #[test]
    fn test_status_text_key_up_shows_only_modifiers() {
        let text = status_text(false, 0x04, RawModifiers(RawModifiers::RALT));

        assert_eq!(text, "RALT");
    }

    #[test]
    fn test_status_text_is_empty_for_plain_release() {
        assert_eq!(status_text(false, 0x04, RawModifiers::NONE), "");
    }

    #[test]
    fn test_status_text_omits_modifier_key_names() {
        // Pressing Left Shift on its own only lists the modifier once.
        let text = status_text(true, 0xE1, RawModifiers(RawModifiers::LSHIFT));

        assert_eq!(text, "LSHIFT");
    }

    // ── run ───────────────────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn test_key_events_are_queued_in_order_with_translated_modifiers() {
        // Arrange
        let source = MockInputSource::new();
        source.push_batch([key_down(0x04, RawModifiers::LSHIFT), key_up(0x04, 0)]);
        source.push_batch([key_down(0x05, RawModifiers::RCTRL), RawInputEvent::Quit]);
        let (producer, mut consumer) = event_queue();
        let (liveness, _guard) = SenderLiveness::new();
        let mut capturer = KeyboardCapturer::new(
            Box::new(source.clone()),
            producer,
            liveness,
            DEFAULT_CAPTURE_DELAY,
        );

        // Act
        let reason = capturer.run().await;

        // Assert
        assert_eq!(reason, ExitReason::WindowClosed);
        assert_eq!(capturer.captured(), 3);
        assert_eq!(
            drain(&mut consumer),
            vec![
                KeyEvent::down(0x04, ModifierMask(ModifierMask::LEFT_SHIFT)),
                KeyEvent::up(0x04, ModifierMask::NONE),
                KeyEvent::down(0x05, ModifierMask(ModifierMask::RIGHT_CTRL)),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlay_is_cleared_then_follows_key_events() {
        // Arrange
        let source = MockInputSource::new();
        source.push_batch([
            key_down(0x04, RawModifiers::LSHIFT),
            key_up(0x04, 0),
            RawInputEvent::Quit,
        ]);
        let (producer, _consumer) = event_queue();
        let (liveness, _guard) = SenderLiveness::new();
        let mut capturer = KeyboardCapturer::new(
            Box::new(source.clone()),
            producer,
            liveness,
            DEFAULT_CAPTURE_DELAY,
        );

        // Act
        capturer.run().await;

        // Assert
        assert!(source.shown());
        assert_eq!(
            source.renders(),
            vec!["".to_string(), "LSHIFT + A".to_string(), "".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_after_quit_in_same_batch_are_dropped() {
        let source = MockInputSource::new();
        source.push_batch([RawInputEvent::Quit, key_down(0x04, 0)]);
        let (producer, consumer) = event_queue();
        let (liveness, _guard) = SenderLiveness::new();
        let mut capturer =
            KeyboardCapturer::new(Box::new(source), producer, liveness, DEFAULT_CAPTURE_DELAY);

        capturer.run().await;

        assert!(consumer.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dead_sender_stops_capture_after_refresh() {
        // Arrange
        let source = MockInputSource::new();
        source.push_batch([key_down(0x04, 0)]);
        let (producer, consumer) = event_queue();
        let (liveness, guard) = SenderLiveness::new();
        drop(guard);
        let mut capturer = KeyboardCapturer::new(
            Box::new(source.clone()),
            producer,
            liveness,
            DEFAULT_CAPTURE_DELAY,
        );

        // Act
        let reason = capturer.run().await;

        // Assert
        assert_eq!(reason, ExitReason::SenderDied);
        assert_eq!(source.polls(), 1);
        assert_eq!(source.refreshes(), 1);
        assert_eq!(consumer.len(), 1, "the batch is still processed");
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_polls_once_per_tick() {
        // Arrange
        let source = MockInputSource::new();
        let (producer, _consumer) = event_queue();
        let (liveness, guard) = SenderLiveness::new();
        let mut capturer = KeyboardCapturer::new(
            Box::new(source.clone()),
            producer,
            liveness,
            Duration::from_millis(50),
        );
        let task = tokio::spawn(async move { capturer.run().await });

        // Act
        time::sleep(Duration::from_millis(225)).await;
        drop(guard);
        let reason = task.await.unwrap();

        // Assert
        assert_eq!(reason, ExitReason::SenderDied);
        assert_eq!(source.polls(), 6, "polls at 0, 50, 100, 150, 200 and 250 ms");
    }

    #[tokio::test(start_paused = true)]
    async fn test_input_failure_ends_capture() {
        let source = MockInputSource::new();
        source.fail_polls("tty lost");
        let (producer, _consumer) = event_queue();
        let (liveness, _guard) = SenderLiveness::new();
        let mut capturer =
            KeyboardCapturer::new(Box::new(source), producer, liveness, DEFAULT_CAPTURE_DELAY);

        let reason = capturer.run().await;

        assert!(matches!(reason, ExitReason::InputFailed(message) if message.contains("tty lost")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_queue_does_not_stop_capture() {
        // Arrange
        let source = MockInputSource::new();
        source.push_batch([key_down(0x04, 0)]);
        source.push_batch([RawInputEvent::Quit]);
        let (producer, consumer) = event_queue();
        drop(consumer);
        let (liveness, _guard) = SenderLiveness::new();
        let mut capturer = KeyboardCapturer::new(
            Box::new(source.clone()),
            producer,
            liveness,
            DEFAULT_CAPTURE_DELAY,
        );

        // Act
        let reason = capturer.run().await;

        // Assert
        assert_eq!(reason, ExitReason::WindowClosed);
        assert_eq!(capturer.captured(), 0);
        assert_eq!(source.renders().last().map(String::as_str), Some("A"));
    }
}
