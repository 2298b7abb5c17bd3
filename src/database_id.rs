//! The row ID type shared by every table.

/// The `INTEGER PRIMARY KEY` of a row, as SQLite stores it.
pub type DatabaseId = i64;
