//! The peer wire protocol: a tagged-union JSON message, one per text
//! WebSocket frame.
//!
//! Every message carries a `"type"` discriminator. The administrative
//! handshake/heartbeat/disconnect/error messages additionally carry the
//! shared [`Envelope`] (id, timestamp, source); the rest of the messages
//! carry their own identity and timing fields explicitly, since they are
//! addressed or timestamped in more specific ways than a generic envelope
//! would give them.

use serde::{Deserialize, Serialize};

use crate::domain::layout::{AdjacencyIds, InstanceId, ScreenEntry};
use crate::protocol::envelope::{Envelope, EpochMillis};

/// `{width, height}` reported by a handshaking peer or a registering client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenGeometry {
    pub width: u32,
    pub height: u32,
}

/// Cursor position within a screen, used by `layout_assignment`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

/// The four kinds of input event a peer can forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InputEventType {
    KeyPress,
    KeyRelease,
    MousePress,
    MouseRelease,
    MouseMove,
}

/// The payload of an `input_event` message: a keyboard or mouse event in the
/// source instance's coordinate space, plus the active modifier/button
/// bitmasks at the time it was captured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputEventData {
    pub x: i32,
    pub y: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dx: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dy: Option<i32>,
    pub timestamp: EpochMillis,
    /// Bitflags over a 32-bit integer; see [`KeyboardModifiers`].
    pub keyboard_modifiers: u32,
    /// Bitflags over a 32-bit integer; see [`MouseButtons`].
    pub mouse_buttons: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keycode: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button: Option<String>,
}

/// Bit positions within [`InputEventData::keyboard_modifiers`].
pub mod keyboard_modifiers {
    pub const CTRL: u32 = 1 << 0;
    pub const SHIFT: u32 = 1 << 1;
    pub const ALT: u32 = 1 << 2;
    pub const META: u32 = 1 << 3;
}

/// Bit positions within [`InputEventData::mouse_buttons`].
pub mod mouse_buttons {
    pub const LEFT: u32 = 1 << 0;
    pub const RIGHT: u32 = 1 << 1;
    pub const MIDDLE: u32 = 1 << 2;
}

/// A structured error code carried by `error` messages. Serialized as the
/// SCREAMING_SNAKE_CASE string the console/log output shows operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    #[serde(rename = "UNKNOWN_MESSAGE_TYPE")]
    UnknownMessageType,
    #[serde(rename = "INVALID_MESSAGE")]
    InvalidMessage,
    #[serde(rename = "UNEXPECTED_HANDSHAKE")]
    UnexpectedHandshake,
    #[serde(rename = "HANDSHAKE_TIMEOUT")]
    HandshakeTimeout,
    #[serde(rename = "UNEXPECTED_BINARY_FRAME")]
    UnexpectedBinaryFrame,
}

/// One peer-protocol message. Every variant's wire form is a JSON object
/// with a `"type"` field naming the variant in snake_case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    #[serde(rename = "handshake_request", rename_all = "camelCase")]
    HandshakeRequest {
        #[serde(flatten)]
        envelope: Envelope,
        instance_id: InstanceId,
        instance_name: String,
        version: String,
        capabilities: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        screen_geometry: Option<ScreenGeometry>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        git_commit: Option<String>,
    },

    #[serde(rename = "handshake_response", rename_all = "camelCase")]
    HandshakeResponse {
        #[serde(flatten)]
        envelope: Envelope,
        accepted: bool,
        instance_id: InstanceId,
        instance_name: String,
        version: String,
        capabilities: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        git_commit: Option<String>,
    },

    #[serde(rename = "heartbeat")]
    Heartbeat {
        #[serde(flatten)]
        envelope: Envelope,
    },

    #[serde(rename = "disconnect")]
    Disconnect {
        #[serde(flatten)]
        envelope: Envelope,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    #[serde(rename = "error")]
    Error {
        #[serde(flatten)]
        envelope: Envelope,
        code: ErrorCode,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<String>,
    },

    #[serde(rename = "client_registration", rename_all = "camelCase")]
    ClientRegistration {
        instance_id: InstanceId,
        display_name: String,
        machine_id: String,
        screen_width: u32,
        screen_height: u32,
    },

    #[serde(rename = "layout_assignment", rename_all = "camelCase")]
    LayoutAssignment {
        position: Position,
        adjacency: AdjacencyIds,
        full_layout: Vec<ScreenEntry>,
    },

    #[serde(rename = "layout_update", rename_all = "camelCase")]
    LayoutUpdate {
        screens: Vec<ScreenEntry>,
        timestamp: EpochMillis,
    },

    #[serde(rename = "activate_client", rename_all = "camelCase")]
    ActivateClient {
        target_instance_id: InstanceId,
        cursor_x: i32,
        cursor_y: i32,
        timestamp: EpochMillis,
    },

    #[serde(rename = "deactivation_request", rename_all = "camelCase")]
    DeactivationRequest {
        instance_id: InstanceId,
        timestamp: EpochMillis,
    },

    #[serde(rename = "instance_info", rename_all = "camelCase")]
    InstanceInfo {
        instance_id: InstanceId,
        display_id: String,
        machine_id: String,
        timestamp: EpochMillis,
        screen_geometry: ScreenGeometry,
    },

    #[serde(rename = "input_event", rename_all = "camelCase")]
    InputEvent {
        source_instance_id: InstanceId,
        source_display_id: String,
        source_machine_id: String,
        event_type: InputEventType,
        event_data: InputEventData,
    },

    #[serde(rename = "update_required", rename_all = "camelCase")]
    UpdateRequired {
        server_commit: String,
        client_commit: String,
        timestamp: EpochMillis,
    },

    #[serde(rename = "restart_request", rename_all = "camelCase")]
    RestartRequest {
        reason: String,
        client_commit: String,
        server_commit: String,
        timestamp: EpochMillis,
    },

    /// Sentinel for any `type` this version of the codec does not
    /// recognize. Decoding never fails on an unknown type; the dispatcher
    /// replies with `error{code=UNKNOWN_MESSAGE_TYPE}` instead of dropping
    /// the frame.
    #[serde(other)]
    Unknown,
}

impl Message {
    /// The wire `type` string for this message, for logging.
    pub fn type_name(&self) -> &'static str {
        match self {
            Message::HandshakeRequest { .. } => "handshake_request",
            Message::HandshakeResponse { .. } => "handshake_response",
            Message::Heartbeat { .. } => "heartbeat",
            Message::Disconnect { .. } => "disconnect",
            Message::Error { .. } => "error",
            Message::ClientRegistration { .. } => "client_registration",
            Message::LayoutAssignment { .. } => "layout_assignment",
            Message::LayoutUpdate { .. } => "layout_update",
            Message::ActivateClient { .. } => "activate_client",
            Message::DeactivationRequest { .. } => "deactivation_request",
            Message::InstanceInfo { .. } => "instance_info",
            Message::InputEvent { .. } => "input_event",
            Message::UpdateRequired { .. } => "update_required",
            Message::RestartRequest { .. } => "restart_request",
            Message::Unknown => "unknown",
        }
    }
}

/// The administrative `/console` channel's own small message set. Distinct
/// from [`Message`] because it never crosses the peer `/ws` channel and
/// carries no envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ConsoleMessage {
    #[serde(rename = "console_command", rename_all = "camelCase")]
    ConsoleCommand {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<EpochMillis>,
    },

    #[serde(rename = "console_response")]
    ConsoleResponse { output: String },

    #[serde(rename = "console_error")]
    ConsoleError { error: String },

    #[serde(rename = "pong")]
    Pong { timestamp: EpochMillis },

    #[serde(rename = "console_log", rename_all = "camelCase")]
    ConsoleLog {
        level: ConsoleLogLevel,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<EpochMillis>,
    },

    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleLogLevel {
    Verbose,
    Debug,
    Log,
    Error,
}
