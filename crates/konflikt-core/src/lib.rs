//! # konflikt-core
//!
//! Shared library for Konflikt: the domain layout/geometry model, the peer
//! wire protocol and its JSON codec, key code translation tables, and mDNS
//! service discovery.
//!
//! This crate is used by both the server and client binaries. It has zero
//! dependencies on OS input APIs or UI frameworks.

pub mod discovery;
pub mod domain;
pub mod keymap;
pub mod protocol;

/// Re-export commonly used types at the crate root for convenience.
pub use domain::geometry::{Point, Rect, Side, EDGE_TOLERANCE};
pub use domain::instance::{machine_id, InstanceRole};
pub use domain::layout::{
    Adjacency, AdjacencyIds, InstanceId, LayoutError, LayoutFile, LayoutManager, ScreenEntry,
    TransitionTarget,
};
pub use keymap::hid::HidKeyCode;
pub use protocol::{decode_message, encode_message, CodecError, Envelope, Message};
