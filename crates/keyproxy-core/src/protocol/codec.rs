//! Binary codec for the key event frames written to the GATT characteristic.
//!
//! Wire format:
//! ```text
//! [pressed:1][scancode:1][modifiers:1]
//! ```
//! Total frame size: 3 bytes, fields in big-endian order. `pressed` is `1` for
//! key-down and `0` for key-up. `modifiers` is the canonical
//! [`ModifierMask`] byte.
//!
//! The keepalive frame is three zero bytes on the same characteristic. The
//! peripheral discards it: an all-zero frame would otherwise read as
//! "release scancode 0", which is not a real key.

use thiserror::Error;

use crate::domain::key_event::{KeyEvent, ModifierMask};

/// Size of every frame on the wire.
pub const FRAME_LEN: usize = 3;

/// Payload of the periodic keepalive write.
pub const KEEPALIVE_PAYLOAD: [u8; FRAME_LEN] = [0x00, 0x00, 0x00];

const PRESSED: u8 = 0x01;
const RELEASED: u8 = 0x00;

/// Errors that can occur while decoding a frame.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    /// The frame is not exactly [`FRAME_LEN`] bytes long.
    #[error("frame must be {expected} bytes, got {actual}")]
    WrongLength { expected: usize, actual: usize },

    /// The pressed byte is neither 0 nor 1.
    #[error("invalid pressed flag: 0x{0:02X}")]
    InvalidPressedFlag(u8),
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes a [`KeyEvent`] into its 3-byte frame.
///
/// # Examples
///
/// ```rust
/// use keyproxy_core::{encode_key_event, KeyEvent, ModifierMask};
///
/// let frame = encode_key_event(&KeyEvent::down(0x04, ModifierMask(0x02)));
/// assert_eq!(frame, [0x01, 0x04, 0x02]);
/// ```
pub fn encode_key_event(event: &KeyEvent) -> [u8; FRAME_LEN] {
    [
        if event.pressed { PRESSED } else { RELEASED },
        event.scancode,
        event.modifiers.bits(),
    ]
}

/// Decodes a 3-byte frame back into a [`KeyEvent`].
///
/// The keepalive frame decodes to `KeyEvent::up(0, ModifierMask::NONE)`; use
/// [`is_keepalive`] first when the distinction matters.
///
/// # Errors
///
/// Returns [`ProtocolError`] if the frame has the wrong length or an invalid
/// pressed flag.
///
/// # Examples
///
/// ```rust
/// use keyproxy_core::{decode_key_event, KeyEvent, ModifierMask};
///
/// let event = decode_key_event(&[0x00, 0x2C, 0x00]).unwrap();
/// assert_eq!(event, KeyEvent::up(0x2C, ModifierMask::NONE));
/// ```
pub fn decode_key_event(bytes: &[u8]) -> Result<KeyEvent, ProtocolError> {
    if bytes.len() != FRAME_LEN {
        return Err(ProtocolError::WrongLength {
            expected: FRAME_LEN,
            actual: bytes.len(),
        });
    }

    let pressed = match bytes[0] {
        PRESSED => true,
        RELEASED => false,
        other => return Err(ProtocolError::InvalidPressedFlag(other)),
    };

    Ok(KeyEvent {
        pressed,
        scancode: bytes[1],
        modifiers: ModifierMask(bytes[2]),
    })
}

/// Returns `true` if `bytes` is the keepalive frame.
pub fn is_keepalive(bytes: &[u8]) -> bool {
    bytes == KEEPALIVE_PAYLOAD
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_key_down_layout() {
        let frame = encode_key_event(&KeyEvent::down(0x1E, ModifierMask(0x22)));
        assert_eq!(frame, [0x01, 0x1E, 0x22]);
    }

    #[test]
    fn test_encode_key_up_layout() {
        let frame = encode_key_event(&KeyEvent::up(0xE1, ModifierMask(0x02)));
        assert_eq!(frame, [0x00, 0xE1, 0x02]);
    }

    #[test]
    fn test_round_trip_covers_full_domain() {
        for pressed in [false, true] {
            for scancode in 0..=u8::MAX {
                for modifiers in 0..=u8::MAX {
                    let event = KeyEvent {
                        pressed,
                        scancode,
                        modifiers: ModifierMask(modifiers),
                    };
                    let decoded = decode_key_event(&encode_key_event(&event))
                        .expect("valid frame must decode");
                    assert_eq!(decoded, event);
                }
            }
        }
    }

    #[test]
    fn test_decode_rejects_short_frame() {
        let result = decode_key_event(&[0x01, 0x04]);
        assert_eq!(
            result,
            Err(ProtocolError::WrongLength {
                expected: 3,
                actual: 2
            })
        );
    }

    #[test]
    fn test_decode_rejects_long_frame() {
        let result = decode_key_event(&[0x01, 0x04, 0x00, 0x00]);
        assert!(matches!(result, Err(ProtocolError::WrongLength { actual: 4, .. })));
    }

    #[test]
    fn test_decode_rejects_invalid_pressed_flag() {
        let result = decode_key_event(&[0x02, 0x04, 0x00]);
        assert_eq!(result, Err(ProtocolError::InvalidPressedFlag(0x02)));
    }

    #[test]
    fn test_keepalive_is_three_zero_bytes() {
        assert_eq!(KEEPALIVE_PAYLOAD.len(), FRAME_LEN);
        assert!(KEEPALIVE_PAYLOAD.iter().all(|b| *b == 0));
        assert!(is_keepalive(&KEEPALIVE_PAYLOAD));
    }

    #[test]
    fn test_real_key_frames_are_not_keepalive() {
        assert!(!is_keepalive(&encode_key_event(&KeyEvent::up(0x04, ModifierMask::NONE))));
        assert!(!is_keepalive(&encode_key_event(&KeyEvent::down(0x00, ModifierMask::NONE))));
        assert!(!is_keepalive(&[0x00, 0x00]));
    }
}
