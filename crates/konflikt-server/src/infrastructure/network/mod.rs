//! Network infrastructure for the coordinator.
//!
//! # Sub-modules
//!
//! - **`server_endpoint`** – Binds the listening TCP port, accepts peer
//!   (`/ws`) and administrative (`/console`) WebSocket sessions, and
//!   implements [`crate::application::coordinator::Broadcast`] over the
//!   resulting per-session sender table.
//!
//! - **`discovery`** – Advertises this process over mDNS and resolves the
//!   case where two coordinators end up running on the same host.

pub mod discovery;
pub mod server_endpoint;
