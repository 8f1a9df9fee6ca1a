//! Pushable, self-resetting block obstacles for a zone-based world server.
//!
//! `domain` holds plain value types (directions, tiles, entities, the
//! open/closed capability). `sim` holds the block state machine, the zone it
//! lives in, the turn notifier and the world that ties them together. `ui`
//! is the console driver's presentation side.

pub mod config;
pub mod domain;
pub mod error;
pub mod sim;
pub mod ui;

pub use error::{BlockError, Result, ZoneError};
