//! Working memory (C8).
//!
//! Process-local, non-persistent. `bank_id -> session_id -> list<(memory_id,
//! touched_at)>`. Capacity/decay-window/boost-scale default to 40 entries,
//! 15 minutes, 0.2 (spec §4.6) but are `EngineConfig`-driven rather than
//! hardcoded (spec §9 "Ambiguities": magic constants surfaced as
//! configuration). Modeled as an explicit store threaded through `recall`,
//! never a global/static (spec §9, "Global mutable state").

use std::collections::HashMap;

const DEFAULT_CAPACITY: usize = 40;
const DEFAULT_DECAY_WINDOW_MS: i64 = 15 * 60 * 1000;
const DEFAULT_BOOST_SCALE: f32 = 0.2;

#[derive(Debug, Clone, Default)]
struct SessionEntries(Vec<(String, i64)>);

#[derive(Debug)]
pub struct WorkingMemory {
    sessions: HashMap<(String, String), SessionEntries>,
    capacity: usize,
    decay_window_ms: i64,
    boost_scale: f32,
}

impl Default for WorkingMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkingMemory {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
            capacity: DEFAULT_CAPACITY,
            decay_window_ms: DEFAULT_DECAY_WINDOW_MS,
            boost_scale: DEFAULT_BOOST_SCALE,
        }
    }

    pub fn with_config(capacity: usize, decay_window_ms: i64, boost_scale: f32) -> Self {
        Self {
            sessions: HashMap::new(),
            capacity,
            decay_window_ms,
            boost_scale,
        }
    }

    /// Drop entries older than the decay window, upsert each touched id with
    /// `touched_at = now`, sort ascending by `touched_at`, and keep only the
    /// newest `capacity` entries (spec §4.6 `touch`).
    pub fn touch(&mut self, bank_id: &str, session_id: &str, ids: &[String], now: i64) {
        let decay_window_ms = self.decay_window_ms;
        let capacity = self.capacity;
        let entry = self
            .sessions
            .entry((bank_id.to_string(), session_id.to_string()))
            .or_default();

        entry.0.retain(|(_, touched_at)| now - touched_at < decay_window_ms);

        for id in ids {
            if let Some(existing) = entry.0.iter_mut().find(|(existing_id, _)| existing_id == id) {
                existing.1 = now;
            } else {
                entry.0.push((id.clone(), now));
            }
        }

        entry.0.sort_by_key(|(_, touched_at)| *touched_at);
        if entry.0.len() > capacity {
            let drop = entry.0.len() - capacity;
            entry.0.drain(0..drop);
        }
    }

    /// `boost_scale * exp(-age / decay_window_ms)` for a live entry, else `0`
    /// (spec §4.6 `get_boost`). Maximum possible boost is `boost_scale`.
    pub fn get_boost(&self, bank_id: &str, session_id: &str, id: &str, now: i64) -> f32 {
        let Some(entry) = self.sessions.get(&(bank_id.to_string(), session_id.to_string())) else {
            return 0.0;
        };
        entry
            .0
            .iter()
            .find(|(existing_id, touched_at)| existing_id == id && now - touched_at < self.decay_window_ms)
            .map(|(_, touched_at)| {
                let age = (now - touched_at) as f32;
                self.boost_scale * (-age / self.decay_window_ms as f32).exp()
            })
            .unwrap_or(0.0)
    }
}
