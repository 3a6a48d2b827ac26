//! Storage schema + indexes (C1) and the row-level CRUD/query surface the
//! rest of the engine is built on.
//!
//! Grounded in the teacher's `storage::sqlite::Storage`: a reader/writer
//! `Mutex<Connection>` split so all methods take `&self` (the struct stays
//! `Send + Sync`, usable behind a plain `Arc`), the same PRAGMA set, and the
//! same `ProjectDirs`-rooted default location with owner-only permissions on
//! Unix.

pub mod migrations;

use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use crate::error::{EngineError, Result};
use crate::model::{Bank, Chunk, Entity, FactType, LinkType, MemoryLink, MemoryUnit, PathRecord};
use crate::tags::parse_tags_json;

/// Reader/writer connection pair over a single SQLite file.
pub struct Storage {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
}

/// Coarse read-only aggregate over a bank, for host-side reporting. Not
/// part of the retrieval core (spec §6.1 marks CRUD/reporting surfaces as
/// thin layers over the same schema).
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct BankStats {
    pub total_memories: u32,
    pub total_entities: u32,
    pub total_links: u32,
    pub with_embeddings: u32,
    pub average_confidence: f64,
}

fn ts(d: DateTime<Utc>) -> i64 {
    d.timestamp_millis()
}

fn from_ts(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_else(Utc::now)
}

/// Lowercases and collapses any run of non-alphanumeric characters to a
/// single space, so punctuation immediately trailing a mention (`rust?`,
/// `rust,`) doesn't defeat the space-delimited containment check below.
fn normalize_for_token_match(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_was_space = false;
    for c in s.to_lowercase().chars() {
        if c.is_alphanumeric() {
            out.push(c);
            last_was_space = false;
        } else if !last_was_space {
            out.push(' ');
            last_was_space = true;
        }
    }
    out.trim().to_string()
}

fn opt_ts(ms: Option<i64>) -> Option<DateTime<Utc>> {
    ms.map(from_ts)
}

impl Storage {
    fn configure_connection(conn: &Connection) -> Result<()> {
        #[cfg(feature = "encryption")]
        {
            if let Ok(key) = std::env::var("ENGRAM_ENCRYPTION_KEY") {
                if !key.is_empty() {
                    conn.pragma_update(None, "key", &key)?;
                }
            }
        }

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -64000;
             PRAGMA temp_store = MEMORY;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;
             PRAGMA mmap_size = 268435456;",
        )?;
        Ok(())
    }

    /// Open (and migrate) storage at `db_path`, or the platform-default data
    /// directory when `None`.
    pub fn new(db_path: Option<PathBuf>) -> Result<Self> {
        let path = match db_path {
            Some(p) => p,
            None => {
                let proj_dirs = ProjectDirs::from("com", "engram", "core")
                    .ok_or_else(|| EngineError::Init("could not determine project directories".into()))?;
                let data_dir = proj_dirs.data_dir();
                std::fs::create_dir_all(data_dir)?;
                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    let _ = std::fs::set_permissions(data_dir, std::fs::Permissions::from_mode(0o700));
                }
                data_dir.join("engram.db")
            }
        };

        let writer_conn = Connection::open(&path)?;
        #[cfg(unix)]
        if path.exists() {
            use std::os::unix::fs::PermissionsExt;
            let _ = std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600));
        }
        Self::configure_connection(&writer_conn)?;
        migrations::apply_migrations(&writer_conn)?;

        let reader_conn = Connection::open(&path)?;
        Self::configure_connection(&reader_conn)?;

        Ok(Self {
            writer: Mutex::new(writer_conn),
            reader: Mutex::new(reader_conn),
        })
    }

    /// In-memory storage, for tests: every connection in the pair shares the
    /// same named in-memory database via a shared cache URI.
    pub fn open_in_memory() -> Result<Self> {
        let uri = format!("file:engram-{}?mode=memory&cache=shared", crate::model::new_id());
        let writer_conn = Connection::open(&uri)?;
        Self::configure_connection(&writer_conn)?;
        migrations::apply_migrations(&writer_conn)?;
        let reader_conn = Connection::open(&uri)?;
        Self::configure_connection(&reader_conn)?;
        Ok(Self {
            writer: Mutex::new(writer_conn),
            reader: Mutex::new(reader_conn),
        })
    }

    // ---- banks -----------------------------------------------------------

    pub fn create_bank(&self, name: &str, config: Option<serde_json::Value>) -> Result<Bank> {
        let now = Utc::now();
        let bank = Bank {
            id: crate::model::new_id(),
            name: name.to_string(),
            config,
            created_at: now,
            updated_at: now,
        };
        let writer = self.writer.lock().expect("writer poisoned");
        writer.execute(
            "INSERT INTO banks (id, name, config, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                bank.id,
                bank.name,
                bank.config.as_ref().map(|c| c.to_string()),
                ts(bank.created_at),
                ts(bank.updated_at),
            ],
        )?;
        Ok(bank)
    }

    pub fn get_bank(&self, id: &str) -> Result<Bank> {
        let reader = self.reader.lock().expect("reader poisoned");
        reader
            .query_row(
                "SELECT id, name, config, created_at, updated_at FROM banks WHERE id = ?1",
                [id],
                |row| {
                    let config: Option<String> = row.get(2)?;
                    Ok(Bank {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        config: config.and_then(|c| serde_json::from_str(&c).ok()),
                        created_at: from_ts(row.get(3)?),
                        updated_at: from_ts(row.get(4)?),
                    })
                },
            )
            .optional()?
            .ok_or_else(|| EngineError::NotFound(format!("bank {id}")))
    }

    /// Look up a bank by its unique `name`, for host-side callers that deal
    /// in names rather than ids (e.g. the CLI's `--bank` flag).
    pub fn get_bank_by_name(&self, name: &str) -> Result<Option<Bank>> {
        let reader = self.reader.lock().expect("reader poisoned");
        reader
            .query_row(
                "SELECT id, name, config, created_at, updated_at FROM banks WHERE name = ?1",
                [name],
                |row| {
                    let config: Option<String> = row.get(2)?;
                    Ok(Bank {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        config: config.and_then(|c| serde_json::from_str(&c).ok()),
                        created_at: from_ts(row.get(3)?),
                        updated_at: from_ts(row.get(4)?),
                    })
                },
            )
            .optional()
            .map_err(EngineError::from)
    }

    /// Coarse counts for the CLI's `stats` command: not part of the
    /// retrieval core, a thin read-only aggregate over the same schema.
    pub fn bank_stats(&self, bank_id: &str) -> Result<BankStats> {
        let reader = self.reader.lock().expect("reader poisoned");
        let total_memories: u32 = reader.query_row(
            "SELECT COUNT(*) FROM memory_units WHERE bank_id = ?1",
            [bank_id],
            |r| r.get(0),
        )?;
        let total_entities: u32 = reader.query_row(
            "SELECT COUNT(*) FROM entities WHERE bank_id = ?1",
            [bank_id],
            |r| r.get(0),
        )?;
        let total_links: u32 = reader.query_row(
            "SELECT COUNT(*) FROM memory_links WHERE bank_id = ?1",
            [bank_id],
            |r| r.get(0),
        )?;
        let with_embeddings: u32 = reader.query_row(
            "SELECT COUNT(*) FROM node_embeddings ne JOIN memory_units mu ON mu.id = ne.id
             WHERE ne.owner_kind = 'memory' AND mu.bank_id = ?1",
            [bank_id],
            |r| r.get(0),
        )?;
        let average_confidence: f64 = reader
            .query_row(
                "SELECT AVG(confidence) FROM memory_units WHERE bank_id = ?1",
                [bank_id],
                |r| r.get::<_, Option<f64>>(0),
            )?
            .unwrap_or(0.0);
        Ok(BankStats {
            total_memories,
            total_entities,
            total_links,
            with_embeddings,
            average_confidence,
        })
    }

    // ---- memory units ------------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    pub fn insert_memory(&self, memory: &MemoryUnit) -> Result<()> {
        if let (Some(s), Some(e)) = (memory.occurred_start, memory.occurred_end) {
            if s > e {
                return Err(EngineError::InvariantViolation(
                    "occurred_start must be <= occurred_end".into(),
                ));
            }
        }
        let writer = self.writer.lock().expect("writer poisoned");
        writer.execute(
            "INSERT INTO memory_units (
                id, bank_id, content, source_text, gist, fact_type, confidence,
                occurred_start, occurred_end, mentioned_at, event_date, created_at,
                access_count, last_accessed, encoding_strength, tags,
                document_id, chunk_id, source_memory_ids, scope_profile, scope_project
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19,?20,?21)",
            params![
                memory.id,
                memory.bank_id,
                memory.content,
                memory.source_text,
                memory.gist,
                memory.fact_type.as_str(),
                memory.confidence,
                memory.occurred_start.map(ts),
                memory.occurred_end.map(ts),
                memory.mentioned_at.map(ts),
                memory.event_date.map(ts),
                ts(memory.created_at),
                memory.access_count,
                memory.last_accessed.map(ts),
                memory.encoding_strength,
                memory.tags.as_ref().map(|t| serde_json::to_string(t).unwrap_or_default()),
                memory.document_id,
                memory.chunk_id,
                memory
                    .source_memory_ids
                    .as_ref()
                    .map(|t| serde_json::to_string(t).unwrap_or_default()),
                memory.scope_profile,
                memory.scope_project,
            ],
        )?;
        Ok(())
    }

    fn row_to_memory(row: &rusqlite::Row) -> rusqlite::Result<MemoryUnit> {
        let fact_type_str: String = row.get("fact_type")?;
        let tags_raw: Option<String> = row.get("tags")?;
        let source_ids_raw: Option<String> = row.get("source_memory_ids")?;
        Ok(MemoryUnit {
            id: row.get("id")?,
            bank_id: row.get("bank_id")?,
            content: row.get("content")?,
            source_text: row.get("source_text")?,
            gist: row.get("gist")?,
            fact_type: FactType::parse(&fact_type_str).unwrap_or(FactType::World),
            confidence: row.get("confidence")?,
            occurred_start: row.get::<_, Option<i64>>("occurred_start")?.map(from_ts),
            occurred_end: row.get::<_, Option<i64>>("occurred_end")?.map(from_ts),
            mentioned_at: row.get::<_, Option<i64>>("mentioned_at")?.map(from_ts),
            event_date: row.get::<_, Option<i64>>("event_date")?.map(from_ts),
            created_at: from_ts(row.get("created_at")?),
            access_count: row.get("access_count")?,
            last_accessed: row.get::<_, Option<i64>>("last_accessed")?.map(from_ts),
            encoding_strength: row.get("encoding_strength")?,
            tags: Some(parse_tags_json(tags_raw.as_deref())).filter(|t| !t.is_empty()),
            document_id: row.get("document_id")?,
            chunk_id: row.get("chunk_id")?,
            source_memory_ids: source_ids_raw.and_then(|s| serde_json::from_str(&s).ok()),
            scope_profile: row.get("scope_profile")?,
            scope_project: row.get("scope_project")?,
        })
    }

    /// Batch-load memory rows by id with a single `IN (...)` query, grounded
    /// in the teacher's `Storage::generate_embeddings` placeholder-building
    /// pattern (spec §4.9 "avoids N+1"). Scoped to `bank_id` so a ranked id
    /// list that somehow contains another bank's memory (a fused candidate
    /// pool bug, a stale cache) can never hydrate across the boundary.
    pub fn get_memories_by_ids(&self, bank_id: &str, ids: &[String]) -> Result<Vec<MemoryUnit>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let reader = self.reader.lock().expect("reader poisoned");
        let placeholders = std::iter::repeat("?").take(ids.len()).collect::<Vec<_>>().join(",");
        let sql = format!("SELECT * FROM memory_units WHERE bank_id = ? AND id IN ({placeholders})");
        let mut stmt = reader.prepare(&sql)?;
        let mut bind: Vec<&dyn rusqlite::ToSql> = Vec::with_capacity(1 + ids.len());
        bind.push(&bank_id);
        for id in ids {
            bind.push(id);
        }
        let rows = stmt.query_map(bind.as_slice(), Self::row_to_memory)?;
        let mut out = Vec::with_capacity(ids.len());
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    pub fn get_memory(&self, id: &str) -> Result<MemoryUnit> {
        let reader = self.reader.lock().expect("reader poisoned");
        reader
            .query_row("SELECT * FROM memory_units WHERE id = ?1", [id], Self::row_to_memory)
            .optional()?
            .ok_or_else(|| EngineError::NotFound(format!("memory {id}")))
    }

    /// FTS5 `MATCH` query against the porter-stemmed index (C5 fulltext
    /// strategy). Returns `(id, bm25_rank)` pairs; rank is SQLite's raw
    /// (more-negative-is-better) `bm25()` value — normalization into `[0,1]`
    /// happens in `retrieval::fulltext`.
    pub fn fts_search(&self, bank_id: &str, query: &str, limit: usize) -> Result<Vec<(String, f64)>> {
        let sanitized = sanitize_fts5_query(query);
        if sanitized.is_empty() {
            return Ok(Vec::new());
        }
        let reader = self.reader.lock().expect("reader poisoned");
        let mut stmt = reader.prepare(
            "SELECT mu.id, bm25(memory_fts) as rank
             FROM memory_fts
             JOIN memory_units mu ON mu.rowid = memory_fts.rowid
             WHERE memory_fts MATCH ?1 AND mu.bank_id = ?2
             ORDER BY rank
             LIMIT ?3",
        )?;
        let rows = stmt.query_map(params![sanitized, bank_id, limit as i64], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    /// All memories in `bank_id` with a non-null temporal anchor overlapping
    /// `[from, to]` per the occurrence-based predicate (spec §4.3.4).
    pub fn temporal_candidates(&self, bank_id: &str, from: i64, to: i64) -> Result<Vec<MemoryUnit>> {
        let reader = self.reader.lock().expect("reader poisoned");
        let mut stmt = reader.prepare(
            "SELECT * FROM memory_units WHERE bank_id = ?1 AND (
                (occurred_start IS NOT NULL AND occurred_end IS NOT NULL
                    AND occurred_start <= ?3 AND occurred_end >= ?2)
                OR (
                    (occurred_start IS NULL OR occurred_end IS NULL)
                    AND (
                        (mentioned_at IS NOT NULL AND mentioned_at BETWEEN ?2 AND ?3)
                        OR (occurred_start IS NOT NULL AND occurred_start BETWEEN ?2 AND ?3)
                        OR (occurred_end IS NOT NULL AND occurred_end BETWEEN ?2 AND ?3)
                    )
                )
            )",
        )?;
        let rows = stmt.query_map(params![bank_id, from, to], Self::row_to_memory)?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    /// Access write-through (C13): one UPDATE covering `access_count`,
    /// `last_accessed`, and the `encoding_strength` bump, executed
    /// synchronously before `recall` returns.
    pub fn touch_access(&self, ids: &[String], now: DateTime<Utc>) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let writer = self.writer.lock().expect("writer poisoned");
        let placeholders = std::iter::repeat("?").take(ids.len()).collect::<Vec<_>>().join(",");
        let sql = format!(
            "UPDATE memory_units SET
                access_count = access_count + 1,
                last_accessed = {now},
                encoding_strength = MIN(3.0, encoding_strength + 0.02)
             WHERE id IN ({placeholders})",
            now = ts(now),
        );
        let mut params_vec: Vec<&dyn rusqlite::ToSql> = Vec::with_capacity(ids.len());
        for id in ids {
            params_vec.push(id);
        }
        writer.execute(&sql, params_vec.as_slice())?;
        Ok(())
    }

    // ---- entities ----------------------------------------------------------

    pub fn upsert_entity(&self, bank_id: &str, name: &str, entity_type: &str) -> Result<Entity> {
        let canonical = name.trim().to_lowercase();
        let writer = self.writer.lock().expect("writer poisoned");
        let existing: Option<String> = writer
            .query_row(
                "SELECT id FROM entities WHERE bank_id = ?1 AND canonical_name = ?2",
                params![bank_id, canonical],
                |r| r.get(0),
            )
            .optional()?;
        let id = if let Some(id) = existing {
            writer.execute(
                "UPDATE entities SET mention_count = mention_count + 1 WHERE id = ?1",
                [&id],
            )?;
            id
        } else {
            let id = crate::model::new_id();
            writer.execute(
                "INSERT INTO entities (id, bank_id, name, canonical_name, entity_type, mention_count)
                 VALUES (?1, ?2, ?3, ?4, ?5, 1)",
                params![id, bank_id, name, canonical, entity_type],
            )?;
            id
        };
        writer
            .query_row(
                "SELECT id, bank_id, name, canonical_name, entity_type, mention_count FROM entities WHERE id = ?1",
                [&id],
                |row| {
                    Ok(Entity {
                        id: row.get(0)?,
                        bank_id: row.get(1)?,
                        name: row.get(2)?,
                        canonical_name: row.get(3)?,
                        entity_type: row.get(4)?,
                        mention_count: row.get(5)?,
                    })
                },
            )
            .map_err(EngineError::from)
    }

    pub fn link_memory_entity(&self, memory_id: &str, entity_id: &str) -> Result<()> {
        let writer = self.writer.lock().expect("writer poisoned");
        writer.execute(
            "INSERT OR IGNORE INTO memory_entities (memory_id, entity_id) VALUES (?1, ?2)",
            params![memory_id, entity_id],
        )?;
        Ok(())
    }

    /// Seed resolution for the graph strategy: entities whose name appears
    /// as a word-bounded token in `query`, excluding entities mentioned more
    /// than `frequency_threshold` times (too generic to seed a useful walk).
    pub fn find_entities_in_query(&self, bank_id: &str, query: &str, frequency_threshold: u32) -> Result<Vec<Entity>> {
        let reader = self.reader.lock().expect("reader poisoned");
        let mut stmt = reader.prepare(
            "SELECT id, bank_id, name, canonical_name, entity_type, mention_count
             FROM entities WHERE bank_id = ?1 AND mention_count <= ?2",
        )?;
        let lower_query = format!(" {} ", normalize_for_token_match(query));
        let rows = stmt.query_map(params![bank_id, frequency_threshold], |row| {
            Ok(Entity {
                id: row.get(0)?,
                bank_id: row.get(1)?,
                name: row.get(2)?,
                canonical_name: row.get(3)?,
                entity_type: row.get(4)?,
                mention_count: row.get(5)?,
            })
        })?;
        let mut out = Vec::new();
        for r in rows {
            let entity = r?;
            let needle = format!(" {} ", normalize_for_token_match(&entity.canonical_name));
            if lower_query.contains(&needle) {
                out.push(entity);
            }
        }
        Ok(out)
    }

    /// Batch-load `(memory_id, entity_id)` junctions for a set of memories
    /// (spec §4.9 hydration step 2, first of two IN-queries).
    pub fn entity_links_for_memories(&self, memory_ids: &[String]) -> Result<Vec<(String, String)>> {
        if memory_ids.is_empty() {
            return Ok(Vec::new());
        }
        let reader = self.reader.lock().expect("reader poisoned");
        let placeholders = std::iter::repeat("?").take(memory_ids.len()).collect::<Vec<_>>().join(",");
        let sql = format!("SELECT memory_id, entity_id FROM memory_entities WHERE memory_id IN ({placeholders})");
        let mut stmt = reader.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(memory_ids.iter()), |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    /// Batch-load entity rows by id (spec §4.9 hydration step 2, second of
    /// two IN-queries).
    pub fn get_entities_by_ids(&self, ids: &[String]) -> Result<Vec<Entity>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let reader = self.reader.lock().expect("reader poisoned");
        let placeholders = std::iter::repeat("?").take(ids.len()).collect::<Vec<_>>().join(",");
        let sql = format!("SELECT id, bank_id, name, canonical_name, entity_type, mention_count FROM entities WHERE id IN ({placeholders})");
        let mut stmt = reader.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(ids.iter()), |row| {
            Ok(Entity {
                id: row.get(0)?,
                bank_id: row.get(1)?,
                name: row.get(2)?,
                canonical_name: row.get(3)?,
                entity_type: row.get(4)?,
                mention_count: row.get(5)?,
            })
        })?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    pub fn memories_for_entity(&self, entity_id: &str) -> Result<Vec<String>> {
        let reader = self.reader.lock().expect("reader poisoned");
        let mut stmt = reader.prepare("SELECT memory_id FROM memory_entities WHERE entity_id = ?1")?;
        let rows = stmt.query_map([entity_id], |r| r.get::<_, String>(0))?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    // ---- links (graph) -----------------------------------------------------

    pub fn insert_link(&self, link: &MemoryLink) -> Result<()> {
        if link.source_id == link.target_id {
            return Err(EngineError::InvariantViolation("link source_id must differ from target_id".into()));
        }
        let writer = self.writer.lock().expect("writer poisoned");
        writer.execute(
            "INSERT INTO memory_links (id, bank_id, source_id, target_id, link_type, weight, created_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7)",
            params![
                link.id,
                link.bank_id,
                link.source_id,
                link.target_id,
                link.link_type.as_str(),
                link.weight,
                ts(link.created_at),
            ],
        )?;
        Ok(())
    }

    /// Batch-fetch edges of `link_type` touching any node in `frontier`,
    /// chunked to stay within SQLite's `IN`-clause limits (spec §4.3.3: "in
    /// chunks of ≤500"), grounded in the teacher's depth-bounded BFS
    /// batching in `get_memory_subgraph`.
    /// `min_weight`, when set, restricts to edges whose `weight` is at
    /// least that value (spec §9 `causal_weight_threshold` — callers pass
    /// `None` for non-causal link types, which carry no such gate).
    pub fn edges_for_frontier(
        &self,
        link_type: LinkType,
        frontier: &[String],
        chunk_size: usize,
        min_weight: Option<f32>,
    ) -> Result<Vec<(String, String, f32)>> {
        if frontier.is_empty() {
            return Ok(Vec::new());
        }
        let reader = self.reader.lock().expect("reader poisoned");
        let mut out = Vec::new();
        for chunk in frontier.chunks(chunk_size.max(1)) {
            let placeholders = std::iter::repeat("?").take(chunk.len()).collect::<Vec<_>>().join(",");
            let weight_clause = if min_weight.is_some() { " AND weight >= ?" } else { "" };
            let sql = format!(
                "SELECT source_id, target_id, weight FROM memory_links
                 WHERE link_type = ? AND (source_id IN ({placeholders}) OR target_id IN ({placeholders})){weight_clause}"
            );
            let mut stmt = reader.prepare(&sql)?;
            let mut bind: Vec<&dyn rusqlite::ToSql> = Vec::with_capacity(2 + chunk.len() * 2);
            let lt = link_type.as_str();
            bind.push(&lt);
            for id in chunk {
                bind.push(id);
            }
            for id in chunk {
                bind.push(id);
            }
            if let Some(w) = &min_weight {
                bind.push(w);
            }
            let rows = stmt.query_map(bind.as_slice(), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, f32>(2)?))
            })?;
            for r in rows {
                out.push(r?);
            }
        }
        Ok(out)
    }

    // ---- chunks / paths -----------------------------------------------------

    pub fn get_chunk(&self, id: &str) -> Result<Chunk> {
        let reader = self.reader.lock().expect("reader poisoned");
        reader
            .query_row(
                "SELECT id, document_id, chunk_index, content FROM chunks WHERE id = ?1",
                [id],
                |row| {
                    Ok(Chunk {
                        id: row.get(0)?,
                        document_id: row.get(1)?,
                        chunk_index: row.get(2)?,
                        content: row.get(3)?,
                    })
                },
            )
            .optional()?
            .ok_or_else(|| EngineError::NotFound(format!("chunk {id}")))
    }

    pub fn upsert_path(&self, bank_id: &str, normalized_path: &str, profile: Option<&str>, project: Option<&str>) -> Result<PathRecord> {
        let writer = self.writer.lock().expect("writer poisoned");
        let existing: Option<String> = writer
            .query_row(
                "SELECT id FROM paths WHERE bank_id = ?1 AND normalized_path = ?2",
                params![bank_id, normalized_path],
                |r| r.get(0),
            )
            .optional()?;
        let id = if let Some(id) = existing {
            writer.execute(
                "UPDATE paths SET access_count = access_count + 1, last_accessed = ?2 WHERE id = ?1",
                params![id, ts(Utc::now())],
            )?;
            id
        } else {
            let id = crate::model::new_id();
            writer.execute(
                "INSERT INTO paths (id, bank_id, normalized_path, access_count, last_accessed, profile, project)
                 VALUES (?1, ?2, ?3, 1, ?4, ?5, ?6)",
                params![id, bank_id, normalized_path, ts(Utc::now()), profile, project],
            )?;
            id
        };
        writer
            .query_row(
                "SELECT id, bank_id, normalized_path, access_count, last_accessed, profile, project FROM paths WHERE id = ?1",
                [&id],
                |row| {
                    Ok(PathRecord {
                        id: row.get(0)?,
                        bank_id: row.get(1)?,
                        normalized_path: row.get(2)?,
                        access_count: row.get(3)?,
                        last_accessed: row.get::<_, Option<i64>>(4)?.map(from_ts),
                        profile: row.get(5)?,
                        project: row.get(6)?,
                    })
                },
            )
            .map_err(EngineError::from)
    }

    /// Pure read of a path's current record. Unlike `upsert_path`, never
    /// creates the row and never bumps `access_count`/`last_accessed`.
    pub fn get_path(&self, bank_id: &str, normalized_path: &str) -> Result<Option<PathRecord>> {
        let reader = self.reader.lock().expect("reader poisoned");
        reader
            .query_row(
                "SELECT id, bank_id, normalized_path, access_count, last_accessed, profile, project
                 FROM paths WHERE bank_id = ?1 AND normalized_path = ?2",
                params![bank_id, normalized_path],
                |row| {
                    Ok(PathRecord {
                        id: row.get(0)?,
                        bank_id: row.get(1)?,
                        normalized_path: row.get(2)?,
                        access_count: row.get(3)?,
                        last_accessed: row.get::<_, Option<i64>>(4)?.map(from_ts),
                        profile: row.get(5)?,
                        project: row.get(6)?,
                    })
                },
            )
            .optional()
            .map_err(EngineError::from)
    }

    pub fn associate_path_memory(&self, path_id: &str, memory_id: &str) -> Result<()> {
        let writer = self.writer.lock().expect("writer poisoned");
        writer.execute(
            "INSERT OR IGNORE INTO path_memories (path_id, memory_id) VALUES (?1, ?2)",
            params![path_id, memory_id],
        )?;
        Ok(())
    }

    pub fn bump_coaccess(&self, path_a: &str, path_b: &str, delta: f32) -> Result<()> {
        if path_a == path_b {
            return Ok(());
        }
        let (a, b) = if path_a < path_b { (path_a, path_b) } else { (path_b, path_a) };
        let writer = self.writer.lock().expect("writer poisoned");
        writer.execute(
            "INSERT INTO path_coaccess (path_a, path_b, strength) VALUES (?1, ?2, ?3)
             ON CONFLICT(path_a, path_b) DO UPDATE SET strength = strength + excluded.strength",
            params![a, b, delta],
        )?;
        Ok(())
    }

    pub fn memories_for_path(&self, bank_id: &str, normalized_path: &str) -> Result<Vec<String>> {
        let reader = self.reader.lock().expect("reader poisoned");
        reader
            .query_row(
                "SELECT id FROM paths WHERE bank_id = ?1 AND normalized_path = ?2",
                params![bank_id, normalized_path],
                |r| r.get::<_, String>(0),
            )
            .optional()?
            .map(|path_id| {
                let mut stmt = reader.prepare("SELECT memory_id FROM path_memories WHERE path_id = ?1")?;
                let rows = stmt.query_map([&path_id], |r| r.get::<_, String>(0))?;
                let mut out = Vec::new();
                for r in rows {
                    out.push(r?);
                }
                Ok(out)
            })
            .transpose()
            .map(|o| o.unwrap_or_default())
    }

    pub fn coaccess_strength(&self, path_a: &str, path_b: &str) -> Result<f32> {
        let (a, b) = if path_a < path_b { (path_a, path_b) } else { (path_b, path_a) };
        let reader = self.reader.lock().expect("reader poisoned");
        reader
            .query_row(
                "SELECT strength FROM path_coaccess WHERE path_a = ?1 AND path_b = ?2",
                params![a, b],
                |r| r.get(0),
            )
            .optional()
            .map(|v| v.unwrap_or(0.0))
            .map_err(EngineError::from)
    }

    pub fn max_coaccess_strength(&self, bank_id: &str) -> Result<f32> {
        let reader = self.reader.lock().expect("reader poisoned");
        reader
            .query_row(
                "SELECT COALESCE(MAX(pc.strength), 0.0) FROM path_coaccess pc
                 JOIN paths p ON p.id = pc.path_a WHERE p.bank_id = ?1",
                [bank_id],
                |r| r.get(0),
            )
            .map_err(EngineError::from)
    }

    // ---- embedding rows (see embedding::store for the in-memory index) ----

    pub fn store_embedding(&self, owner_kind: &str, id: &str, vector: &[f32]) -> Result<()> {
        let writer = self.writer.lock().expect("writer poisoned");
        let bytes: Vec<u8> = vector.iter().flat_map(|f| f.to_le_bytes()).collect();
        writer.execute(
            "INSERT INTO node_embeddings (owner_kind, id, dim, vector) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(owner_kind, id) DO UPDATE SET dim = excluded.dim, vector = excluded.vector",
            params![owner_kind, id, vector.len() as i64, bytes],
        )?;
        Ok(())
    }

    pub fn delete_embedding(&self, owner_kind: &str, id: &str) -> Result<()> {
        let writer = self.writer.lock().expect("writer poisoned");
        writer.execute(
            "DELETE FROM node_embeddings WHERE owner_kind = ?1 AND id = ?2",
            params![owner_kind, id],
        )?;
        Ok(())
    }

    /// Load every stored memory embedding with its owning bank, used to warm
    /// one in-memory brute-force index per bank at startup (C2).
    /// `node_embeddings` carries no `bank_id` of its own, so this joins
    /// through `memory_units` to recover it — each bank's index is built
    /// from only its own rows, never a process-wide pool.
    pub fn load_memory_embeddings_by_bank(&self) -> Result<Vec<(String, String, Vec<f32>)>> {
        let reader = self.reader.lock().expect("reader poisoned");
        let mut stmt = reader.prepare(
            "SELECT m.bank_id, e.id, e.dim, e.vector
             FROM node_embeddings e
             JOIN memory_units m ON m.id = e.id
             WHERE e.owner_kind = 'memory'",
        )?;
        let rows = stmt.query_map([], |row| {
            let dim: i64 = row.get(2)?;
            let bytes: Vec<u8> = row.get(3)?;
            let vector = bytes
                .chunks_exact(4)
                .take(dim as usize)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect();
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, vector))
        })?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }
}

/// FTS5 query tokens are split on whitespace and quoted for literal
/// matching, then joined with OR (spec §4.3.2) — this also sidesteps FTS5
/// syntax errors from user-supplied punctuation.
pub fn sanitize_fts5_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(|tok| tok.replace('"', "\"\""))
        .filter(|tok| !tok.is_empty())
        .map(|tok| format!("\"{tok}\""))
        .collect::<Vec<_>>()
        .join(" OR ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> Storage {
        Storage::open_in_memory().expect("open in-memory storage")
    }

    #[test]
    fn bank_round_trips() {
        let s = storage();
        let bank = s.create_bank("demo", None).unwrap();
        let fetched = s.get_bank(&bank.id).unwrap();
        assert_eq!(fetched.name, "demo");
    }

    #[test]
    fn memory_insert_rejects_reversed_interval() {
        let s = storage();
        let bank = s.create_bank("demo", None).unwrap();
        let now = Utc::now();
        let memory = MemoryUnit {
            id: crate::model::new_id(),
            bank_id: bank.id,
            content: "x".into(),
            source_text: None,
            gist: None,
            fact_type: FactType::World,
            confidence: 1.0,
            occurred_start: Some(now),
            occurred_end: Some(now - chrono::Duration::days(1)),
            mentioned_at: None,
            event_date: None,
            created_at: now,
            access_count: 0,
            last_accessed: None,
            encoding_strength: 1.0,
            tags: None,
            document_id: None,
            chunk_id: None,
            source_memory_ids: None,
            scope_profile: None,
            scope_project: None,
        };
        assert!(matches!(s.insert_memory(&memory), Err(EngineError::InvariantViolation(_))));
    }

    #[test]
    fn fts_search_finds_inserted_content() {
        let s = storage();
        let bank = s.create_bank("demo", None).unwrap();
        let now = Utc::now();
        let memory = MemoryUnit {
            id: crate::model::new_id(),
            bank_id: bank.id.clone(),
            content: "the quick brown fox".into(),
            source_text: None,
            gist: None,
            fact_type: FactType::World,
            confidence: 1.0,
            occurred_start: None,
            occurred_end: None,
            mentioned_at: None,
            event_date: None,
            created_at: now,
            access_count: 0,
            last_accessed: None,
            encoding_strength: 1.0,
            tags: None,
            document_id: None,
            chunk_id: None,
            source_memory_ids: None,
            scope_profile: None,
            scope_project: None,
        };
        s.insert_memory(&memory).unwrap();
        let hits = s.fts_search(&bank.id, "fox", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, memory.id);
    }
}
