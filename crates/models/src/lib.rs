//! SeaORM entities and connection helpers for the embedded-database service store.

pub mod errors;
pub mod db;
pub mod service;

#[cfg(test)]
mod tests;
