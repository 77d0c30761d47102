//! JSON codec for the peer wire protocol.
//!
//! Each [`Message`] maps to exactly one JSON text frame. Decoding a frame
//! whose `"type"` this build does not recognize never fails: it decodes to
//! [`Message::Unknown`] via `#[serde(other)]`, so that newer peers on the
//! same cluster can send message types an older peer just shrugs off with
//! an `error{code=UNKNOWN_MESSAGE_TYPE}` reply rather than a dropped
//! connection.

use thiserror::Error;

use crate::protocol::messages::{ConsoleMessage, ErrorCode, Message};

/// Errors that can occur while encoding or decoding a frame.
#[derive(Debug, Error, PartialEq)]
pub enum CodecError {
    /// The frame is not valid JSON, or is JSON but not a valid message
    /// shape (missing a required field, wrong field type, ...).
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// Serialization of an outgoing message failed. In practice this only
    /// happens for non-finite floats, which the wire types here don't use;
    /// kept so the error type covers both directions.
    #[error("failed to encode message: {0}")]
    EncodeFailed(String),
}

impl CodecError {
    /// The structured [`ErrorCode`] an `error` reply should carry for this
    /// failure.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            CodecError::InvalidMessage(_) => ErrorCode::InvalidMessage,
            CodecError::EncodeFailed(_) => ErrorCode::InvalidMessage,
        }
    }
}

/// Encodes a [`Message`] to its JSON text form for a single WebSocket text
/// frame.
pub fn encode_message(msg: &Message) -> Result<String, CodecError> {
    serde_json::to_string(msg).map_err(|e| CodecError::EncodeFailed(e.to_string()))
}

/// Decodes a single WebSocket text frame into a [`Message`].
///
/// An unrecognized `"type"` decodes successfully to [`Message::Unknown`]
/// rather than erroring; only malformed JSON or a message shape missing
/// required fields for a *recognized* type produces [`CodecError`].
pub fn decode_message(frame: &str) -> Result<Message, CodecError> {
    serde_json::from_str(frame).map_err(|e| CodecError::InvalidMessage(e.to_string()))
}

/// Encodes a [`ConsoleMessage`] for the `/console` channel.
pub fn encode_console_message(msg: &ConsoleMessage) -> Result<String, CodecError> {
    serde_json::to_string(msg).map_err(|e| CodecError::EncodeFailed(e.to_string()))
}

/// Decodes a single `/console` channel frame.
pub fn decode_console_message(frame: &str) -> Result<ConsoleMessage, CodecError> {
    serde_json::from_str(frame).map_err(|e| CodecError::InvalidMessage(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::envelope::Envelope;

    #[test]
    fn heartbeat_round_trips() {
        let msg = Message::Heartbeat { envelope: Envelope::new("srv".into()) };
        let frame = encode_message(&msg).unwrap();
        let decoded = decode_message(&frame).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn garbage_frame_is_invalid_message() {
        let err = decode_message("not json").unwrap_err();
        assert!(matches!(err, CodecError::InvalidMessage(_)));
    }

    #[test]
    fn unknown_type_still_decodes_successfully() {
        let decoded = decode_message(r#"{"type":"future_feature"}"#).unwrap();
        assert_eq!(decoded, Message::Unknown);
    }

    #[test]
    fn error_code_for_invalid_message_is_invalid_message() {
        let err = CodecError::InvalidMessage("bad".into());
        assert_eq!(err.error_code(), ErrorCode::InvalidMessage);
    }
}
