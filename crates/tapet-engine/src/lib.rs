//! Background jobs for Tapet.
//!
//! - [`mediator`] and [`pager`]: remote-backed pagination over a cached
//!   search query.
//! - [`cleanup`]: the retention pass that expires old queries and reclaims
//!   wallpapers and temp files nobody references any more.
//! - [`rotation`]: picks, downloads, applies and records the next wallpaper.
//!
//! Every job receives its collaborators at construction; nothing here holds
//! global state.

pub mod cleanup;
pub mod download;
pub mod error;
pub mod local;
pub mod mediator;
pub mod pager;
pub mod rotation;
pub mod tempfiles;

pub use error::{CleanupError, DownloadError, LoadError, RotationError};

#[cfg(test)]
mod tests;
