//! Application layer use cases for the client application.
//!
//! # What use cases does the client have?
//!
//! - **`coordinator`** – The client-side cursor-ownership state machine:
//!   tracks whether this instance is active, warps the cursor on
//!   `activate_client`, and watches the real cursor position to emit a
//!   debounced `deactivation_request` when an incoming `mouseMove` lands at
//!   the screen's left edge.
//!
//! - **`emulate_input`** – Translates received `input_event` payloads (which
//!   use platform-independent HID key codes) into OS-native input calls. The
//!   actual OS call is made by a `PlatformInputEmulator` implementation that
//!   is injected at construction time.
//!
//! - **`report_screens`** – Enumerates the client's physical monitors and
//!   formats the information for the `client_registration` message sent to
//!   the coordinator after connecting, so it can size this client correctly
//!   in the virtual layout.

pub mod coordinator;
pub mod emulate_input;
pub mod report_screens;
