//! Storage abstractions for service layer
//!
//! Contains the durable-file helper shared by the snapshot backends: whole-file
//! reads and atomic replacement through a staged temporary file.

pub mod snapshot_file;
