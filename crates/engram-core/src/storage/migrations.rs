//! Database migrations.
//!
//! Schema migration definitions for the storage layer, grounded in the
//! teacher's `storage::migrations` array-of-`Migration`/`apply_migrations`
//! shape. This crate ships a single schema generation — spec §6.3 makes no
//! file-format compatibility guarantee across schema versions ("migrations
//! handled externally") — but the versioned-table mechanism is kept so a
//! second generation can be added the way the teacher adds one per release.

use rusqlite::Connection;

use crate::error::Result;

/// A database migration.
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub up: &'static str,
}

pub const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "Initial retrieval-engine schema",
    up: MIGRATION_V1_UP,
}];

const MIGRATION_V1_UP: &str = r#"
CREATE TABLE IF NOT EXISTS banks (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    config TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS memory_units (
    id TEXT PRIMARY KEY,
    bank_id TEXT NOT NULL REFERENCES banks(id) ON DELETE CASCADE,
    content TEXT NOT NULL,
    source_text TEXT,
    gist TEXT,
    fact_type TEXT NOT NULL DEFAULT 'world',
    confidence REAL NOT NULL DEFAULT 1.0,
    occurred_start INTEGER,
    occurred_end INTEGER,
    mentioned_at INTEGER,
    event_date INTEGER,
    created_at INTEGER NOT NULL,
    access_count INTEGER NOT NULL DEFAULT 0,
    last_accessed INTEGER,
    encoding_strength REAL NOT NULL DEFAULT 1.0,
    tags TEXT,
    document_id TEXT,
    chunk_id TEXT,
    source_memory_ids TEXT,
    scope_profile TEXT,
    scope_project TEXT
);

CREATE INDEX IF NOT EXISTS idx_memory_units_bank ON memory_units(bank_id);
CREATE INDEX IF NOT EXISTS idx_memory_units_fact_type ON memory_units(bank_id, fact_type);
CREATE INDEX IF NOT EXISTS idx_memory_units_scope ON memory_units(bank_id, scope_profile, scope_project);

CREATE TABLE IF NOT EXISTS entities (
    id TEXT PRIMARY KEY,
    bank_id TEXT NOT NULL REFERENCES banks(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    canonical_name TEXT NOT NULL,
    entity_type TEXT NOT NULL DEFAULT 'unknown',
    mention_count INTEGER NOT NULL DEFAULT 0,
    UNIQUE(bank_id, canonical_name)
);

CREATE TABLE IF NOT EXISTS memory_entities (
    memory_id TEXT NOT NULL REFERENCES memory_units(id) ON DELETE CASCADE,
    entity_id TEXT NOT NULL REFERENCES entities(id) ON DELETE CASCADE,
    UNIQUE(memory_id, entity_id)
);

CREATE INDEX IF NOT EXISTS idx_memory_entities_entity ON memory_entities(entity_id);

CREATE TABLE IF NOT EXISTS memory_links (
    id TEXT PRIMARY KEY,
    bank_id TEXT NOT NULL REFERENCES banks(id) ON DELETE CASCADE,
    source_id TEXT NOT NULL REFERENCES memory_units(id) ON DELETE CASCADE,
    target_id TEXT NOT NULL REFERENCES memory_units(id) ON DELETE CASCADE,
    link_type TEXT NOT NULL,
    weight REAL NOT NULL DEFAULT 1.0,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_memory_links_source ON memory_links(source_id, link_type);
CREATE INDEX IF NOT EXISTS idx_memory_links_target ON memory_links(target_id, link_type);

CREATE TABLE IF NOT EXISTS chunks (
    id TEXT PRIMARY KEY,
    document_id TEXT NOT NULL,
    chunk_index INTEGER NOT NULL,
    content TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS paths (
    id TEXT PRIMARY KEY,
    bank_id TEXT NOT NULL REFERENCES banks(id) ON DELETE CASCADE,
    normalized_path TEXT NOT NULL,
    access_count INTEGER NOT NULL DEFAULT 0,
    last_accessed INTEGER,
    profile TEXT,
    project TEXT,
    UNIQUE(bank_id, normalized_path)
);

CREATE TABLE IF NOT EXISTS path_memories (
    path_id TEXT NOT NULL REFERENCES paths(id) ON DELETE CASCADE,
    memory_id TEXT NOT NULL REFERENCES memory_units(id) ON DELETE CASCADE,
    UNIQUE(path_id, memory_id)
);

CREATE INDEX IF NOT EXISTS idx_path_memories_memory ON path_memories(memory_id);

CREATE TABLE IF NOT EXISTS path_coaccess (
    path_a TEXT NOT NULL REFERENCES paths(id) ON DELETE CASCADE,
    path_b TEXT NOT NULL REFERENCES paths(id) ON DELETE CASCADE,
    strength REAL NOT NULL DEFAULT 0.0,
    UNIQUE(path_a, path_b)
);

CREATE TABLE IF NOT EXISTS node_embeddings (
    owner_kind TEXT NOT NULL,
    id TEXT NOT NULL,
    dim INTEGER NOT NULL,
    vector BLOB NOT NULL,
    PRIMARY KEY (owner_kind, id)
);

CREATE VIRTUAL TABLE IF NOT EXISTS memory_fts USING fts5(
    content,
    tags,
    bank_id UNINDEXED,
    content='memory_units',
    content_rowid='rowid',
    tokenize='porter'
);

CREATE TRIGGER IF NOT EXISTS memory_units_ai AFTER INSERT ON memory_units BEGIN
    INSERT INTO memory_fts(rowid, content, tags, bank_id)
    VALUES (new.rowid, new.content, COALESCE(new.tags, ''), new.bank_id);
END;

CREATE TRIGGER IF NOT EXISTS memory_units_ad AFTER DELETE ON memory_units BEGIN
    INSERT INTO memory_fts(memory_fts, rowid, content, tags, bank_id)
    VALUES ('delete', old.rowid, old.content, COALESCE(old.tags, ''), old.bank_id);
END;

CREATE TRIGGER IF NOT EXISTS memory_units_au AFTER UPDATE ON memory_units BEGIN
    INSERT INTO memory_fts(memory_fts, rowid, content, tags, bank_id)
    VALUES ('delete', old.rowid, old.content, COALESCE(old.tags, ''), old.bank_id);
    INSERT INTO memory_fts(rowid, content, tags, bank_id)
    VALUES (new.rowid, new.content, COALESCE(new.tags, ''), new.bank_id);
END;

CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);
"#;

/// Apply all pending migrations in order, tracked by `schema_version`.
pub fn apply_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);",
    )?;

    let current: u32 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))
        .unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version > current {
            tracing::info!(version = migration.version, description = migration.description, "applying migration");
            conn.execute_batch(migration.up)?;
            conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [migration.version])?;
        }
    }
    Ok(())
}
