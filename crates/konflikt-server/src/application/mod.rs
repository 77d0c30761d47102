//! Application layer use cases for the coordinator.
//!
//! In Clean Architecture the *application* layer sits between the domain
//! (pure business rules, in `konflikt-core`) and the infrastructure
//! (OS/network/storage). Use cases in this layer orchestrate domain objects
//! to fulfil a use case, depend on abstractions (traits) rather than
//! concrete implementations, and contain no OS calls, no network I/O, no
//! file-system access.
//!
//! # Sub-modules
//!
//! - **`coordinator`** – the cursor-ownership state machine: the most
//!   critical use case, run on every local mouse move and on every peer
//!   message that touches activation, deactivation, or layout.
//! - **`coordinator_loop`** – the single-task driver that owns one
//!   `ServerCoordinator` and serializes every event onto it.
//! - **`console`** – pure interpreter for the `/console` administrative
//!   channel's commands.

pub mod console;
pub mod coordinator;
pub mod coordinator_loop;
