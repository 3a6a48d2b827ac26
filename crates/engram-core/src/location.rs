//! Location boost (C9): file-path signal detection and boost computation
//! for path-associated memories (spec §4.7).
//!
//! The teacher has no direct counterpart for path normalization or signal
//! detection (a `grep` across the corpus for `normalize` only turns up
//! vector-normalization code) — this module is adapted from the shape of
//! the teacher's path/session bookkeeping in `storage::sqlite`, not copied
//! from a single source; see `DESIGN.md`.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::storage::Storage;

/// Lowercase, trim, forward-slash, collapse repeated slashes, strip
/// trailing slash except root (spec §4.7 `normalize_path`). Idempotent:
/// `normalize_path(normalize_path(p)) == normalize_path(p)` (spec §8.2).
pub fn normalize_path(path: &str) -> String {
    let lowered = path.trim().to_lowercase().replace('\\', "/");
    let mut collapsed = String::with_capacity(lowered.len());
    let mut prev_slash = false;
    for c in lowered.chars() {
        if c == '/' {
            if prev_slash {
                continue;
            }
            prev_slash = true;
        } else {
            prev_slash = false;
        }
        collapsed.push(c);
    }
    if collapsed.len() > 1 && collapsed.ends_with('/') {
        collapsed.pop();
    }
    collapsed
}

/// A triple like `1.2.3` that looks like a module path but is actually a
/// version number (spec §4.7: "rejecting version-number-like triples").
fn looks_like_version(token: &str) -> bool {
    let parts: Vec<&str> = token.split('.').collect();
    parts.len() == 3 && parts.iter().all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
}

/// Extract absolute/relative paths (`src/foo/bar.ts`) and word-bounded
/// module tokens (`utils.logger`) from `query` (spec §4.7
/// `detect_location_signals`).
pub fn detect_location_signals(query: &str) -> Vec<String> {
    let mut signals = Vec::new();
    for raw in query.split_whitespace() {
        let token: String = raw.trim_matches(|c: char| !c.is_alphanumeric() && c != '/' && c != '.' && c != '_' && c != '-').to_string();
        if token.is_empty() || looks_like_version(&token) {
            continue;
        }
        let has_path_slash = token.contains('/');
        let has_dotted_module = token.contains('.') && !token.starts_with('.') && !token.ends_with('.');
        if has_path_slash || has_dotted_module {
            signals.push(normalize_path(&token));
        }
    }
    signals
}

/// Per-session running set of touched path ids, used to derive co-access
/// associations (spec §4.7 `record`: "create co-access associations with
/// every other path in the same session"). Process-local, like working
/// memory (C8) — never a global.
#[derive(Debug, Default)]
pub struct LocationSessions {
    touched: HashMap<(String, String), HashSet<String>>,
}

impl LocationSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a path access and, if `session` is set, bump co-access
    /// strength with every other path already touched this session.
    pub fn record(
        &mut self,
        storage: &Storage,
        bank_id: &str,
        path: &str,
        memory_id: &str,
        session: Option<&str>,
        profile: Option<&str>,
        project: Option<&str>,
    ) -> Result<()> {
        let normalized = normalize_path(path);
        let record = storage.upsert_path(bank_id, &normalized, profile, project)?;
        storage.associate_path_memory(&record.id, memory_id)?;

        if let Some(session) = session {
            let key = (bank_id.to_string(), session.to_string());
            let prior = self.touched.entry(key.clone()).or_default();
            for other in prior.iter() {
                storage.bump_coaccess(&record.id, other, 1.0)?;
            }
            self.touched.get_mut(&key).unwrap().insert(record.id);
        }
        Ok(())
    }
}

/// `direct_path_boost = 0.12` when directly associated with a query path;
/// plus a familiarity term decaying with time-since-last-access (<=0.10);
/// plus a co-access term <=0.08 proportional to association strength
/// normalized against `max_co_access_strength` (spec §4.7 `boost`).
pub fn location_boost(
    storage: &Storage,
    config: &crate::config::EngineConfig,
    bank_id: &str,
    memory_id: &str,
    query_paths: &[String],
    max_co_access_strength: f32,
    now: DateTime<Utc>,
) -> Result<f32> {
    if query_paths.is_empty() {
        return Ok(0.0);
    }
    let mut boost = 0.0_f32;
    let mut direct = false;
    let mut best_coaccess = 0.0_f32;
    let mut last_access: Option<DateTime<Utc>> = None;

    for path in query_paths {
        let associated = storage.memories_for_path(bank_id, path)?;
        if associated.iter().any(|id| id == memory_id) {
            direct = true;
            if let Some(record) = storage.get_path(bank_id, path)? {
                if last_access.is_none() || record.last_accessed > last_access {
                    last_access = record.last_accessed;
                }
            }
        }
        for other_path in query_paths {
            if other_path == path {
                continue;
            }
            let strength = storage.coaccess_strength(path, other_path)?;
            if strength > best_coaccess {
                best_coaccess = strength;
            }
        }
    }

    if direct {
        boost += config.location_direct_boost;
    }

    if let Some(last) = last_access {
        let days = (now - last).num_milliseconds().max(0) as f32 / 86_400_000.0;
        let familiarity = (config.location_familiarity_cap * (-days / 30.0).exp()).min(config.location_familiarity_cap);
        boost += familiarity;
    }

    if max_co_access_strength > 0.0 {
        let co_access = config.location_coaccess_cap * (best_coaccess / max_co_access_strength).clamp(0.0, 1.0);
        boost += co_access;
    }

    Ok(boost)
}
