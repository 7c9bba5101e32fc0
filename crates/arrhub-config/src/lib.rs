#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Typed hub settings, file loading, and validation.
//!
//! Layout: `model.rs` (settings types and defaults), `loader.rs` (YAML file
//! loading), `validate.rs` (structural validation), `error.rs` (error types).

mod error;
mod loader;
mod model;
mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::load_settings;
pub use model::{BackendConfig, HubSettings, default_port};
pub use validate::validate_settings;
