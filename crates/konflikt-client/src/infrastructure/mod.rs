//! Infrastructure layer for the client application.
//!
//! Contains OS-facing adapters: input emulation APIs, the WebSocket
//! connection to the coordinator and mDNS discovery, screen enumeration,
//! and instance-id persistence.
//!
//! **Dependency rule**: this layer may depend on `application` and `konflikt_core`,
//! but MUST NOT be imported by the `application` or domain layers.

pub mod input_emulation;
pub mod network;
pub mod screen_info;
pub mod storage;
