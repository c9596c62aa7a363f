//! Command-line entry point: argument parsing, telemetry, and the actions the
//! `foilctf` binary runs.

pub mod actions;
pub mod commands;
pub mod dispatch;
pub mod telemetry;

mod start;
pub use self::start::start;
