//! SQL schema for the Stall SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS identities (
    id              TEXT PRIMARY KEY,
    display_name    TEXT NOT NULL,
    email           TEXT NOT NULL UNIQUE COLLATE NOCASE,
    credential_hash TEXT NOT NULL,   -- argon2 PHC string
    avatar_url      TEXT,
    created_at      TEXT NOT NULL    -- RFC 3339 UTC, fixed width
);

-- rowid doubles as the insertion-order tie-breaker for stable pagination.
CREATE TABLE IF NOT EXISTS products (
    id             TEXT PRIMARY KEY,
    title          TEXT NOT NULL,
    description    TEXT NOT NULL,
    price          TEXT NOT NULL,    -- normalized decimal string
    image_url      TEXT,
    image_asset_id TEXT,
    owner_id       TEXT NOT NULL REFERENCES identities(id),
    is_active      INTEGER NOT NULL DEFAULT 1,
    created_at     TEXT NOT NULL,
    updated_at     TEXT NOT NULL,
    CHECK ((image_url IS NULL) = (image_asset_id IS NULL)),
    CHECK (CAST(price AS REAL) >= 0)
);

CREATE INDEX IF NOT EXISTS products_owner_idx   ON products(owner_id);
CREATE INDEX IF NOT EXISTS products_created_idx ON products(created_at);
CREATE INDEX IF NOT EXISTS products_active_idx  ON products(is_active);

PRAGMA user_version = 1;
";
