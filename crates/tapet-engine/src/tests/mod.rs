//! Behaviour tests for the engine against a real in-memory `SqliteStore`.

mod fakes;
