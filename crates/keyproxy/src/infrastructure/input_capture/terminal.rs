//! Terminal-backed input source built on `crossterm`.
//!
//! The terminal is switched to raw mode so that every key reaches us instead
//! of being line-buffered or turned into signals. On terminals that speak the
//! kitty keyboard protocol we also push [`KeyboardEnhancementFlags`], which
//! gives us real key-release events and reports modifier keys on their own.
//!
//! # Terminals without release events (for beginners)
//!
//! A classic terminal only sends bytes when a key goes down. There is no way to
//! know when it comes back up. The peripheral, however, needs a release for
//! every press or the host would see the key as stuck. So when enhancement is
//! not available, [`KeyTranslator`] emits a synthetic `KeyUp` straight after
//! each `KeyDown`. Modifiers are then only known from the flags attached to the
//! key itself, and are attributed to the left-hand key.
//!
//! # Quitting
//!
//! Every key is relayed, including Ctrl+C, so the capture window closes on
//! `Ctrl+]` instead (the telnet escape). A closed input stream also counts as
//! closing the window.
//!
//! The overlay is a single status line redrawn in place on stdout. Logs should
//! go to stderr so they do not tear it.

use std::io::{self, Stdout, Write};
use std::time::Duration;

use crossterm::cursor::{Hide, MoveToColumn, Show};
use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyEventState, KeyModifiers,
    KeyboardEnhancementFlags, MediaKeyCode, ModifierKeyCode, PopKeyboardEnhancementFlags,
    PushKeyboardEnhancementFlags,
};
use crossterm::style::Print;
use crossterm::terminal::{self, Clear, ClearType};
use crossterm::tty::IsTty;
use crossterm::{execute, queue};
use keyproxy_core::HidKeyCode;
use tracing::{debug, warn};

use super::{CaptureError, InputSource, RawInputEvent, RawModifiers};

const BANNER: &str = "keyproxy: keys typed here are relayed, Ctrl+] closes";

// ── Terminal input source ─────────────────────────────────────────────────────

/// [`InputSource`] reading from the controlling terminal.
///
/// Raw mode is entered in [`InputSource::show`] and left again on drop.
pub struct TerminalInput {
    out: Stdout,
    translator: KeyTranslator,
    text: String,
    dirty: bool,
    active: bool,
}

impl TerminalInput {
    /// Checks that stdin is a terminal.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::NotATerminal`] when stdin is redirected.
    pub fn new() -> Result<Self, CaptureError> {
        if !io::stdin().is_tty() {
            return Err(CaptureError::NotATerminal);
        }
        Ok(Self {
            out: io::stdout(),
            translator: KeyTranslator::new(false),
            text: String::new(),
            dirty: false,
            active: false,
        })
    }

    fn restore(&mut self) -> io::Result<()> {
        if self.translator.enhanced {
            execute!(self.out, PopKeyboardEnhancementFlags)?;
        }
        execute!(self.out, Show, Print("\r\n"))?;
        terminal::disable_raw_mode()
    }
}

impl InputSource for TerminalInput {
    fn show(&mut self) -> Result<(), CaptureError> {
        terminal::enable_raw_mode()?;
        self.active = true;

        let enhanced = terminal::supports_keyboard_enhancement().unwrap_or(false);
        if enhanced {
            execute!(
                self.out,
                PushKeyboardEnhancementFlags(
                    KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                        | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
                        | KeyboardEnhancementFlags::REPORT_ALL_KEYS_AS_ESCAPE_CODES
                )
            )?;
        } else {
            warn!("terminal does not report key releases; each press is sent as a tap");
        }
        self.translator = KeyTranslator::new(enhanced);

        execute!(self.out, Hide, Print(BANNER), Print("\r\n"))?;
        Ok(())
    }

    fn poll_events(&mut self) -> Result<Vec<RawInputEvent>, CaptureError> {
        let mut events = Vec::new();
        loop {
            let ready = match event::poll(Duration::ZERO) {
                Ok(ready) => ready,
                Err(e) if is_closed(&e) => {
                    events.push(RawInputEvent::Quit);
                    return Ok(events);
                }
                Err(e) => return Err(e.into()),
            };
            if !ready {
                return Ok(events);
            }
            match event::read() {
                Ok(Event::Key(key)) => events.extend(self.translator.translate(key)),
                Ok(other) => debug!("ignoring terminal event {other:?}"),
                Err(e) if is_closed(&e) => {
                    events.push(RawInputEvent::Quit);
                    return Ok(events);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn render(&mut self, text: &str) -> Result<(), CaptureError> {
        if self.text != text {
            self.text = text.to_string();
            self.dirty = true;
        }
        Ok(())
    }

    fn refresh(&mut self) -> Result<(), CaptureError> {
        if !self.dirty {
            return Ok(());
        }
        queue!(
            self.out,
            MoveToColumn(0),
            Clear(ClearType::CurrentLine),
            Print(&self.text)
        )?;
        self.out.flush()?;
        self.dirty = false;
        Ok(())
    }
}

impl Drop for TerminalInput {
    fn drop(&mut self) {
        if self.active {
            if let Err(e) = self.restore() {
                warn!("failed to restore terminal: {e}");
            }
        }
    }
}

fn is_closed(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::UnexpectedEof | io::ErrorKind::BrokenPipe
    )
}

// ── Key translation ───────────────────────────────────────────────────────────

/// Turns crossterm key events into [`RawInputEvent`]s.
///
/// Tracks which modifier keys are held when the terminal reports them, and
/// synthesizes releases when it cannot.
#[derive(Debug)]
pub struct KeyTranslator {
    enhanced: bool,
    held: RawModifiers,
}

impl KeyTranslator {
    /// `enhanced` says whether the terminal reports releases and modifier keys.
    pub fn new(enhanced: bool) -> Self {
        Self {
            enhanced,
            held: RawModifiers::NONE,
        }
    }

    pub fn translate(&mut self, key: KeyEvent) -> Vec<RawInputEvent> {
        if self.is_quit_chord(&key) {
            return vec![RawInputEvent::Quit];
        }

        if let KeyCode::Modifier(modifier) = key.code {
            let (bit, usage) = modifier_key(modifier);
            self.held = self.held.with(bit, key.kind != KeyEventKind::Release);
            let modifiers = self.lock_bits(key.state);
            return self.emit(key.kind, usage as u8, modifiers);
        }

        let Some((usage, implied_shift)) = hid_usage(key.code, key.state) else {
            debug!("no HID usage for {:?}", key.code);
            return Vec::new();
        };
        let modifiers = self.modifiers_for(key.modifiers, key.state, implied_shift);
        self.emit(key.kind, usage as u8, modifiers)
    }

    fn is_quit_chord(&self, key: &KeyEvent) -> bool {
        if !key.modifiers.contains(KeyModifiers::CONTROL) || key.kind == KeyEventKind::Release {
            return false;
        }
        match key.code {
            KeyCode::Char(']') => true,
            // Legacy terminals deliver Ctrl+] as 0x1D, which decodes as Ctrl+5.
            KeyCode::Char('5') => !self.enhanced,
            _ => false,
        }
    }

    fn emit(&self, kind: KeyEventKind, scancode: u8, modifiers: RawModifiers) -> Vec<RawInputEvent> {
        match kind {
            KeyEventKind::Press if !self.enhanced => vec![
                RawInputEvent::KeyDown { scancode, modifiers },
                RawInputEvent::KeyUp { scancode, modifiers },
            ],
            KeyEventKind::Press | KeyEventKind::Repeat => {
                vec![RawInputEvent::KeyDown { scancode, modifiers }]
            }
            KeyEventKind::Release => vec![RawInputEvent::KeyUp { scancode, modifiers }],
        }
    }

    fn lock_bits(&self, state: KeyEventState) -> RawModifiers {
        self.held
            .with(RawModifiers::CAPS, state.contains(KeyEventState::CAPS_LOCK))
            .with(RawModifiers::NUM, state.contains(KeyEventState::NUM_LOCK))
    }

    fn modifiers_for(
        &self,
        flags: KeyModifiers,
        state: KeyEventState,
        implied_shift: bool,
    ) -> RawModifiers {
        let mut raw = self.lock_bits(state);
        let either = |raw: RawModifiers, left: u16, right: u16| raw.0 & (left | right) != 0;

        if (flags.contains(KeyModifiers::SHIFT) || implied_shift)
            && !either(raw, RawModifiers::LSHIFT, RawModifiers::RSHIFT)
        {
            raw = raw.with(RawModifiers::LSHIFT, true);
        }
        if flags.contains(KeyModifiers::CONTROL)
            && !either(raw, RawModifiers::LCTRL, RawModifiers::RCTRL)
        {
            raw = raw.with(RawModifiers::LCTRL, true);
        }
        if flags.contains(KeyModifiers::ALT) && !either(raw, RawModifiers::LALT, RawModifiers::RALT)
        {
            raw = raw.with(RawModifiers::LALT, true);
        }
        if flags.intersects(KeyModifiers::SUPER | KeyModifiers::META | KeyModifiers::HYPER)
            && !either(raw, RawModifiers::LGUI, RawModifiers::RGUI)
        {
            raw = raw.with(RawModifiers::LGUI, true);
        }
        raw
    }
}

fn modifier_key(modifier: ModifierKeyCode) -> (u16, HidKeyCode) {
    match modifier {
        ModifierKeyCode::LeftShift => (RawModifiers::LSHIFT, HidKeyCode::ShiftLeft),
        ModifierKeyCode::RightShift => (RawModifiers::RSHIFT, HidKeyCode::ShiftRight),
        ModifierKeyCode::LeftControl => (RawModifiers::LCTRL, HidKeyCode::ControlLeft),
        ModifierKeyCode::RightControl => (RawModifiers::RCTRL, HidKeyCode::ControlRight),
        ModifierKeyCode::LeftAlt => (RawModifiers::LALT, HidKeyCode::AltLeft),
        ModifierKeyCode::RightAlt | ModifierKeyCode::IsoLevel3Shift => {
            (RawModifiers::RALT, HidKeyCode::AltRight)
        }
        ModifierKeyCode::LeftSuper | ModifierKeyCode::LeftHyper | ModifierKeyCode::LeftMeta => {
            (RawModifiers::LGUI, HidKeyCode::MetaLeft)
        }
        ModifierKeyCode::RightSuper
        | ModifierKeyCode::RightHyper
        | ModifierKeyCode::RightMeta
        | ModifierKeyCode::IsoLevel5Shift => (RawModifiers::RGUI, HidKeyCode::MetaRight),
    }
}

/// Maps a crossterm key to its HID usage on a US layout.
///
/// The flag is `true` when the character implies Shift (`'A'`, `'!'`, ...).
pub fn hid_usage(code: KeyCode, state: KeyEventState) -> Option<(HidKeyCode, bool)> {
    let keypad = state.contains(KeyEventState::KEYPAD);
    let usage = match code {
        KeyCode::Char(c) if keypad => (keypad_char(c)?, false),
        KeyCode::Char(c) => char_usage(c)?,
        KeyCode::Enter if keypad => (HidKeyCode::NumpadEnter, false),
        KeyCode::Enter => (HidKeyCode::Enter, false),
        KeyCode::Esc => (HidKeyCode::Escape, false),
        KeyCode::Backspace => (HidKeyCode::Backspace, false),
        KeyCode::Tab => (HidKeyCode::Tab, false),
        KeyCode::BackTab => (HidKeyCode::Tab, true),
        KeyCode::Insert => (HidKeyCode::Insert, false),
        KeyCode::Delete => (HidKeyCode::Delete, false),
        KeyCode::Home => (HidKeyCode::Home, false),
        KeyCode::End => (HidKeyCode::End, false),
        KeyCode::PageUp => (HidKeyCode::PageUp, false),
        KeyCode::PageDown => (HidKeyCode::PageDown, false),
        KeyCode::Left => (HidKeyCode::ArrowLeft, false),
        KeyCode::Right => (HidKeyCode::ArrowRight, false),
        KeyCode::Up => (HidKeyCode::ArrowUp, false),
        KeyCode::Down => (HidKeyCode::ArrowDown, false),
        KeyCode::F(n @ 1..=12) => (HidKeyCode::from_u8(HidKeyCode::F1 as u8 + n - 1), false),
        KeyCode::F(n @ 13..=24) => (HidKeyCode::from_u8(HidKeyCode::F13 as u8 + n - 13), false),
        KeyCode::CapsLock => (HidKeyCode::CapsLock, false),
        KeyCode::ScrollLock => (HidKeyCode::ScrollLock, false),
        KeyCode::NumLock => (HidKeyCode::NumLock, false),
        KeyCode::PrintScreen => (HidKeyCode::PrintScreen, false),
        KeyCode::Pause => (HidKeyCode::Pause, false),
        KeyCode::Menu => (HidKeyCode::ContextMenu, false),
        KeyCode::Media(MediaKeyCode::MuteVolume) => (HidKeyCode::Mute, false),
        KeyCode::Media(MediaKeyCode::RaiseVolume) => (HidKeyCode::VolumeUp, false),
        KeyCode::Media(MediaKeyCode::LowerVolume) => (HidKeyCode::VolumeDown, false),
        _ => return None,
    };
    Some(usage)
}

fn keypad_char(c: char) -> Option<HidKeyCode> {
    let usage = match c {
        '1'..='9' => HidKeyCode::from_u8(HidKeyCode::Numpad1 as u8 + (c as u8 - b'1')),
        '0' => HidKeyCode::Numpad0,
        '/' => HidKeyCode::NumpadDivide,
        '*' => HidKeyCode::NumpadMultiply,
        '-' => HidKeyCode::NumpadSubtract,
        '+' => HidKeyCode::NumpadAdd,
        '.' => HidKeyCode::NumpadDecimal,
        _ => return char_usage(c).map(|(usage, _)| usage),
    };
    Some(usage)
}

fn char_usage(c: char) -> Option<(HidKeyCode, bool)> {
    let usage = match c {
        'a'..='z' => (HidKeyCode::from_u8(HidKeyCode::KeyA as u8 + (c as u8 - b'a')), false),
        'A'..='Z' => (HidKeyCode::from_u8(HidKeyCode::KeyA as u8 + (c as u8 - b'A')), true),
        '1'..='9' => (HidKeyCode::from_u8(HidKeyCode::Digit1 as u8 + (c as u8 - b'1')), false),
        '0' => (HidKeyCode::Digit0, false),
        '!' => (HidKeyCode::Digit1, true),
        '@' => (HidKeyCode::Digit2, true),
        '#' => (HidKeyCode::Digit3, true),
        '$' => (HidKeyCode::Digit4, true),
        '%' => (HidKeyCode::Digit5, true),
        '^' => (HidKeyCode::Digit6, true),
        '&' => (HidKeyCode::Digit7, true),
        '*' => (HidKeyCode::Digit8, true),
        '(' => (HidKeyCode::Digit9, true),
        ')' => (HidKeyCode::Digit0, true),
        ' ' => (HidKeyCode::Space, false),
        '-' => (HidKeyCode::Minus, false),
        '_' => (HidKeyCode::Minus, true),
        '=' => (HidKeyCode::Equal, false),
        '+' => (HidKeyCode::Equal, true),
        '[' => (HidKeyCode::BracketLeft, false),
        '{' => (HidKeyCode::BracketLeft, true),
        ']' => (HidKeyCode::BracketRight, false),
        '}' => (HidKeyCode::BracketRight, true),
        '\\' => (HidKeyCode::Backslash, false),
        '|' => (HidKeyCode::Backslash, true),
        ';' => (HidKeyCode::Semicolon, false),
        ':' => (HidKeyCode::Semicolon, true),
        '\'' => (HidKeyCode::Quote, false),
        '"' => (HidKeyCode::Quote, true),
        '`' => (HidKeyCode::Backquote, false),
        '~' => (HidKeyCode::Backquote, true),
        ',' => (HidKeyCode::Comma, false),
        '<' => (HidKeyCode::Comma, true),
        '.' => (HidKeyCode::Period, false),
        '>' => (HidKeyCode::Period, true),
        '/' => (HidKeyCode::Slash, false),
        '?' => (HidKeyCode::Slash, true),
        _ => return None,
    };
    Some(usage)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
