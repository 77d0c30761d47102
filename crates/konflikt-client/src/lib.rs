//! konflikt-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does konflikt-client do?
//!
//! The client is the remote computer whose keyboard and mouse are being
//! controlled by the coordinator. When the coordinator's cursor crosses the
//! edge adjacent to this client's screen, the coordinator starts forwarding
//! input events over a WebSocket connection.
//!
//! 1. Connects to the coordinator's `/ws` endpoint and completes the
//!    `handshake_request`/`handshake_response` exchange.
//! 2. Sends `client_registration` with its combined screen geometry so the
//!    coordinator can place it in the virtual layout.
//! 3. Receives `layout_assignment`/`layout_update`, `activate_client`, and
//!    `input_event` messages.
//! 4. Translates the platform-independent HID key codes to OS-native codes
//!    and replays the event via the platform input emulation API
//!    (`SendInput` on Windows, XTest on Linux, CoreGraphics on macOS).
//! 5. Watches the real cursor position after each injected move and signals
//!    `deactivation_request` once it reaches the screen's left edge.

/// Application layer: use cases for the client.
pub mod application;

/// Infrastructure layer: OS adapters, network, and UI bridge.
pub mod infrastructure;
