//! Subcommand implementations

pub mod features;
pub mod show;
pub mod verify;
