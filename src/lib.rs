//! One-shot MongoDB schema bootstrap for the wallpaper bot.
//!
//! - `config`: YAML/env configuration and validation.
//! - `schema`: the declarative collection and index set.
//! - `db`: the `SchemaStore` seam and its MongoDB implementation.
//! - `bootstrap`: `ensure_schema`, `verify_schema` and the scoped `run`.

pub mod bootstrap;
pub mod config;
pub mod db;
pub mod error;
pub mod schema;

pub use bootstrap::{ensure_schema, run, run_with, verify_schema, Mode, Outcome};
pub use error::BootstrapError;
