//! Compile-time retention, freshness and retry policy.

use chrono::TimeDelta;

/// A cached query younger than this is served without a network refresh.
pub const FRESHNESS_WINDOW: TimeDelta = TimeDelta::hours(3);

/// Cached queries (and their exclusive wallpapers and temp files) older than
/// this are garbage collected.
pub const RETENTION_WINDOW: TimeDelta = TimeDelta::days(7);

/// Total download attempts before a wallpaper is given up on.
pub const MAX_DOWNLOAD_ATTEMPTS: u32 = 3;

/// How often the cleanup job runs.
pub const CLEANUP_INTERVAL: TimeDelta = TimeDelta::hours(24);
