//! Shared runtime helpers used by the binary and the service crate.
//! - `utils::logging`: tracing subscriber setup (compact or JSON output)
//! - `env`: startup checks for the directories the stores write into

pub mod env;
pub mod utils;
