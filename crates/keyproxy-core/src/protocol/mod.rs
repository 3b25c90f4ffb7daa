//! Protocol module containing the 3-byte key event codec.

pub mod codec;

pub use codec::{
    decode_key_event, encode_key_event, is_keepalive, ProtocolError, FRAME_LEN, KEEPALIVE_PAYLOAD,
};
