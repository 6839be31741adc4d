//! Database module: records, schema migrations and the SQLite storage handle.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows, plus insert payloads
//! - `schema.rs`: versioned SQL migrations (SQLite-first)
//! - `sqlite.rs`: connection setup, migration runner and queries

pub mod models;
pub mod schema;
pub mod sqlite;

pub use models::{Image, Micropost, NewImage, NewMicropost};
pub use schema::{MIGRATIONS, Migration};
pub use sqlite::{SqlitePool, Storage};
