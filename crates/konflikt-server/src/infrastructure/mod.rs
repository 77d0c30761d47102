//! Infrastructure layer for the coordinator.
//!
//! Contains OS-facing adapters: input capture hooks and the `PlatformIo`
//! cursor-visibility implementation, the network endpoint and discovery,
//! JSON persistence, structured logging, and the UI DTO contract.
//!
//! **Dependency rule**: this layer may depend on `application` and `konflikt_core`,
//! but MUST NOT be imported by the `application` or domain layers.

pub mod input_capture;
pub mod logging;
pub mod network;
pub mod storage;
pub mod ui_bridge;
