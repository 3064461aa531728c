//! Configuration
//!
//! Settings are kept in a JSON file and cached in memory for lock-free reads.

mod schema;
mod store;

pub use schema::*;
pub use store::ConfigStore;
