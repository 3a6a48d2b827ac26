//! Multi-strategy agent memory retrieval engine: four retrieval
//! strategies fused by Reciprocal Rank Fusion, scored by a hybrid or
//! ACT-R-inspired cognitive mode, boosted by working memory and
//! location signals, filtered by scope, and packed under a token
//! budget. Embedding generation, LLM fact extraction, and cross-encoder
//! reranking are injected collaborators, not implemented here.
//!
//! Module layout follows the teacher's (`storage`, `search` →
//! `retrieval`/`fusion`/`scoring`, `memory` → `model`) split, generalized
//! to this crate's component boundaries. See `DESIGN.md` for the
//! grounding of each module.

pub mod config;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod fusion;
pub mod hydration;
pub mod location;
pub mod model;
pub mod packer;
pub mod recall;
pub mod retain;
pub mod retrieval;
pub mod scope;
pub mod scoring;
pub mod storage;
pub mod tags;
pub mod temporal;
pub mod trace;
pub mod traits;
pub mod working_memory;

pub use engine::Engine;
pub use error::{EngineError, Result};
pub use recall::{RecallOptions, RecallResult, RetrievalMethod};
pub use retain::{RetainOptions, RetainResult};
pub use storage::{BankStats, Storage};
pub use traits::{Embedder, Extractor, ExtractedFact, Reranker};
