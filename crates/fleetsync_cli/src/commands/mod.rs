//! CLI command implementations.

pub mod diff;
pub mod dump_log;
pub mod inspect;
pub mod ranges;
pub mod verify;
