//! Core types and trait definitions for Tapet.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! store backend, the remote adapters and the background jobs all depend on
//! it; it depends on nothing proprietary.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod clock;
pub mod crop;
pub mod error;
pub mod history;
pub mod platform;
pub mod policy;
pub mod prefs;
pub mod query;
pub mod source;
pub mod store;
pub mod wallpaper;

pub use error::{Error, Result};
