//! Data model — Bank, MemoryUnit, Entity, MemoryLink, Chunk, Path(Association),
//! EmbeddingRow, exactly as spec §3 describes, modeled as plain
//! serde-derived structs the way the teacher's `memory::node::KnowledgeNode`
//! sits alongside its row mapper in `storage::sqlite`.

pub mod ids;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use ids::new_id;

/// A memory namespace. Owns all memories, entities, links, chunks, and the
/// FTS/vector rows derived from them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bank {
    pub id: String,
    pub name: String,
    pub config: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The tagged union of fact kinds a memory unit can hold (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactType {
    Experience,
    World,
    Opinion,
    Observation,
}

impl FactType {
    pub fn as_str(self) -> &'static str {
        match self {
            FactType::Experience => "experience",
            FactType::World => "world",
            FactType::Opinion => "opinion",
            FactType::Observation => "observation",
        }
    }

    /// Parse from storage, rejecting unknown values rather than silently
    /// defaulting — the extractor's contract is only on the post-parse
    /// schema (spec §9, "Dynamic extraction results").
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "experience" => Some(FactType::Experience),
            "world" => Some(FactType::World),
            "opinion" => Some(FactType::Opinion),
            "observation" => Some(FactType::Observation),
            _ => None,
        }
    }
}

/// The atomic retrievable fact (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryUnit {
    pub id: String,
    pub bank_id: String,
    pub content: String,
    pub source_text: Option<String>,
    pub gist: Option<String>,
    pub fact_type: FactType,
    pub confidence: f32,
    pub occurred_start: Option<DateTime<Utc>>,
    pub occurred_end: Option<DateTime<Utc>>,
    pub mentioned_at: Option<DateTime<Utc>>,
    pub event_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub access_count: u32,
    pub last_accessed: Option<DateTime<Utc>>,
    /// Multiplier in [1.0, 3.0]; grows monotonically with repeated recall.
    pub encoding_strength: f32,
    pub tags: Option<Vec<String>>,
    pub document_id: Option<String>,
    pub chunk_id: Option<String>,
    pub source_memory_ids: Option<Vec<String>>,
    pub scope_profile: Option<String>,
    pub scope_project: Option<String>,
}

impl MemoryUnit {
    /// The anchor instant used by temporal scoring and recency decay
    /// (spec §4.3.4 / §4.5.1): midpoint of `occurred_start`/`occurred_end`
    /// when both are known, else the first non-null of
    /// `occurred_start, occurred_end, mentioned_at, event_date, created_at`.
    pub fn anchor(&self) -> DateTime<Utc> {
        if let (Some(s), Some(e)) = (self.occurred_start, self.occurred_end) {
            let mid = s.timestamp_millis() / 2 + e.timestamp_millis() / 2;
            return DateTime::from_timestamp_millis(mid).unwrap_or(self.created_at);
        }
        self.occurred_start
            .or(self.occurred_end)
            .or(self.mentioned_at)
            .or(self.event_date)
            .unwrap_or(self.created_at)
    }
}

/// A named referent (person, place, thing).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub bank_id: String,
    pub name: String,
    pub canonical_name: String,
    pub entity_type: String,
    pub mention_count: u32,
}

/// The typed directed edge kinds a [`MemoryLink`] can carry (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    Semantic,
    Temporal,
    Entity,
    CausedBy,
    Causes,
    Enables,
    Prevents,
}

impl LinkType {
    pub fn as_str(self) -> &'static str {
        match self {
            LinkType::Semantic => "semantic",
            LinkType::Temporal => "temporal",
            LinkType::Entity => "entity",
            LinkType::CausedBy => "caused_by",
            LinkType::Causes => "causes",
            LinkType::Enables => "enables",
            LinkType::Prevents => "prevents",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "semantic" => Some(LinkType::Semantic),
            "temporal" => Some(LinkType::Temporal),
            "entity" => Some(LinkType::Entity),
            "caused_by" => Some(LinkType::CausedBy),
            "causes" => Some(LinkType::Causes),
            "enables" => Some(LinkType::Enables),
            "prevents" => Some(LinkType::Prevents),
            _ => None,
        }
    }

    /// True for the four causal-relation variants, as distinct from the
    /// structural `Semantic`/`Temporal`/`Entity` link types.
    pub fn is_causal(self) -> bool {
        matches!(self, LinkType::CausedBy | LinkType::Causes | LinkType::Enables | LinkType::Prevents)
    }
}

/// A typed, weighted, directed edge between two memories in the same bank.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryLink {
    pub id: String,
    pub bank_id: String,
    pub source_id: String,
    pub target_id: String,
    pub link_type: LinkType,
    pub weight: f32,
    pub created_at: DateTime<Utc>,
}

/// A text region of a larger document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub chunk_index: u32,
    pub content: String,
}

/// A normalized filesystem path tracked by the location graph (C9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathRecord {
    pub id: String,
    pub bank_id: String,
    pub normalized_path: String,
    pub access_count: u32,
    pub last_accessed: Option<DateTime<Utc>>,
    pub profile: Option<String>,
    pub project: Option<String>,
}

/// A co-access edge between two paths touched in the same session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathCoAccess {
    pub path_a: String,
    pub path_b: String,
    pub strength: f32,
}

/// A `(id, vector)` row in one of the per-owner-kind vector indexes.
#[derive(Debug, Clone)]
pub struct EmbeddingRow {
    pub id: String,
    pub vector: Vec<f32>,
}

/// The scope lineage attached to a memory (spec glossary: Scope).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScopeMode {
    #[default]
    Strict,
    ProfileOnly,
    ProjectOnly,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scope {
    pub profile: Option<String>,
    pub project: Option<String>,
    pub session: Option<String>,
}
