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

//! Arrhub application wiring.
//!
//! Layout: `bootstrap.rs` (startup sequence), `supervisor.rs` (hub
//! lifecycle), `store.rs` (file-backed snapshot store), `error.rs`
//! (application errors).

/// Application bootstrap and environment loading.
pub mod bootstrap;
/// Application-level error types.
pub mod error;
/// File-backed snapshot store.
pub mod store;
/// Hub lifecycle supervision.
pub mod supervisor;

pub use bootstrap::run_app;
pub use error::{AppError, AppResult};
