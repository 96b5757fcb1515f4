//! Host side of Tapet: configuration, platform adapters backed by external
//! commands, and the periodic job scheduler used by the `tapet` binary.

pub mod config;
pub mod platform;
pub mod scheduler;

pub use config::DaemonConfig;
