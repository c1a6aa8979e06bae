//! Datastore schema

/// SQL DDL for the bouncer datastore.
pub const PRAGMAS: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
"#;

pub const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS networks (
    name TEXT PRIMARY KEY,
    hostname TEXT NOT NULL,
    port INTEGER NOT NULL,
    nickname TEXT NOT NULL,
    username TEXT NOT NULL,
    realname TEXT NOT NULL,
    password TEXT,
    usermode INTEGER NOT NULL DEFAULT 0
);
"#;

pub const PASSWORD_KEY: &str = "password";
