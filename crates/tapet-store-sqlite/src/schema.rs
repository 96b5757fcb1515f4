//! SQL schema for the Tapet SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per distinct upstream wallpaper, shared by every query that
-- returned it.
CREATE TABLE IF NOT EXISTS wallpapers (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    source        TEXT    NOT NULL,   -- 'wallhaven' | 'local'
    source_id     TEXT    NOT NULL,
    url           TEXT    NOT NULL,
    file_size     INTEGER NOT NULL,
    width         INTEGER NOT NULL,
    height        INTEGER NOT NULL,
    created_at    TEXT    NOT NULL,   -- RFC 3339 UTC
    metadata_json TEXT    NOT NULL DEFAULT 'null',
    UNIQUE (source, source_id)
);

CREATE TABLE IF NOT EXISTS search_queries (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    query_string    TEXT    NOT NULL UNIQUE,
    last_updated_on TEXT    NOT NULL
);

-- Reference-counts wallpapers across queries. `position` keeps upstream
-- order within one query.
CREATE TABLE IF NOT EXISTS search_query_wallpapers (
    search_query_id INTEGER NOT NULL REFERENCES search_queries(id) ON DELETE CASCADE,
    wallpaper_id    INTEGER NOT NULL REFERENCES wallpapers(id)     ON DELETE CASCADE,
    position        INTEGER NOT NULL,
    PRIMARY KEY (search_query_id, wallpaper_id)
);

CREATE TABLE IF NOT EXISTS search_query_remote_keys (
    search_query_id  INTEGER PRIMARY KEY REFERENCES search_queries(id) ON DELETE CASCADE,
    next_page_number INTEGER            -- NULL once the last page is stored
);

-- Keyed by external id, not by wallpapers.id: evicting a cached wallpaper
-- must not erase its history.
CREATE TABLE IF NOT EXISTS auto_wallpaper_history (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    source_id     TEXT NOT NULL,
    source        TEXT NOT NULL,
    source_choice TEXT NOT NULL,      -- 'saved_search' | 'favorites' | 'local'
    set_on        TEXT NOT NULL,
    UNIQUE (source_id, source)
);

CREATE TABLE IF NOT EXISTS saved_searches (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    name       TEXT NOT NULL UNIQUE,
    query_json TEXT NOT NULL
);

-- Snapshots, independent of the cache so retention never drops favorites.
CREATE TABLE IF NOT EXISTS favorites (
    source_id      TEXT NOT NULL,
    source         TEXT NOT NULL,
    wallpaper_json TEXT NOT NULL,
    favorited_on   TEXT NOT NULL,
    PRIMARY KEY (source_id, source)
);

CREATE TABLE IF NOT EXISTS preferences (
    key        TEXT PRIMARY KEY,
    value_json TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS sqw_wallpaper_idx    ON search_query_wallpapers(wallpaper_id);
CREATE INDEX IF NOT EXISTS sq_updated_idx       ON search_queries(last_updated_on);
CREATE INDEX IF NOT EXISTS history_set_on_idx   ON auto_wallpaper_history(set_on);

PRAGMA user_version = 1;
";
