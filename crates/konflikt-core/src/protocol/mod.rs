//! Protocol module: the wire message types, the JSON codec, the shared
//! control-message envelope, and the peer session state machine.

pub mod codec;
pub mod envelope;
pub mod messages;
pub mod session;

pub use codec::{
    decode_console_message, decode_message, encode_console_message, encode_message, CodecError,
};
pub use envelope::{now_epoch_millis, Envelope, EpochMillis};
pub use messages::*;
pub use session::{PeerSession, SessionError, SessionState};
