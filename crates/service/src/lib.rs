//! openEO service store.
//! - `store`: the CRUD contract and its backends (memory, JSON, SQLite, Parquet).
//! - `codec` / `storage`: snapshot encodings and atomic file replacement.
//! - `stac`: STAC API client held by the application state.
//! - `runtime`: startup and shutdown of the application state.

pub mod codec;
pub mod errors;
pub mod ids;
pub mod record;
pub mod runtime;
pub mod stac;
pub mod storage;
pub mod store;
pub mod table;
#[cfg(test)]
pub mod test_support;

pub use errors::StoreError;
pub use record::ServiceRecord;
pub use store::{open_store, ServiceStore, StoreKind};
