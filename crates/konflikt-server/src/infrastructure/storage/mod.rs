//! Storage infrastructure: JSON persistence for the layout file and the
//! per-machine instance identifier.
//!
//! This module is a thin adapter between the application and the file
//! system. The `config` sub-module handles:
//!
//! - Resolving the platform-appropriate config directory (or an override).
//! - Reading/writing `layout.json` as a whole-file replace.
//! - Generating and persisting the `instance-id` UUID on first run.
//!
//! Keeping storage concerns here, rather than scattered throughout the
//! application layer, means the on-disk format can change without touching
//! anything that calls into it.

pub mod config;
