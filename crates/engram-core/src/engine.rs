//! The engine façade: owns storage, one in-memory vector index per bank,
//! working memory, and the injected collaborators, and exposes
//! `retain`/`recall` as the two operations spec §6.1 names for the core.
//!
//! Grounded in the teacher's top-level `VestigeCore` struct in `lib.rs` —
//! same idea (one struct bundling the connection pool and indexes behind
//! `Arc`-friendly interior mutability), rebuilt around this spec's module
//! set instead of the teacher's FSRS/dream/neuroscience subsystems.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, RwLock};

use crate::config::EngineConfig;
use crate::embedding::VectorIndex;
use crate::error::Result;
use crate::location::LocationSessions;
use crate::model::Bank;
use crate::recall::{recall, RecallOptions, RecallResult};
use crate::retain::{retain, RetainOptions, RetainResult};
use crate::storage::Storage;
use crate::traits::{Embedder, Extractor, Reranker};
use crate::working_memory::WorkingMemory;

pub struct Engine {
    storage: Storage,
    config: EngineConfig,
    /// One `VectorIndex` per bank (spec §3 bank isolation) — a bank's
    /// semantic channel must never see another bank's embeddings.
    vector_indexes: RwLock<HashMap<String, VectorIndex>>,
    working_memory: Mutex<WorkingMemory>,
    location_sessions: Mutex<LocationSessions>,
    embedder: Box<dyn Embedder>,
    extractor: Box<dyn Extractor>,
    reranker: Option<Box<dyn Reranker>>,
}

impl Engine {
    pub fn new(db_path: Option<PathBuf>, config: EngineConfig, embedder: Box<dyn Embedder>, extractor: Box<dyn Extractor>, reranker: Option<Box<dyn Reranker>>) -> Result<Self> {
        Self::from_storage(Storage::new(db_path)?, config, embedder, extractor, reranker)
    }

    /// In-memory storage, for tests and short-lived sessions — mirrors
    /// `Storage::open_in_memory` at the engine façade's level.
    pub fn new_in_memory(config: EngineConfig, embedder: Box<dyn Embedder>, extractor: Box<dyn Extractor>, reranker: Option<Box<dyn Reranker>>) -> Result<Self> {
        Self::from_storage(Storage::open_in_memory()?, config, embedder, extractor, reranker)
    }

    fn from_storage(storage: Storage, config: EngineConfig, embedder: Box<dyn Embedder>, extractor: Box<dyn Extractor>, reranker: Option<Box<dyn Reranker>>) -> Result<Self> {
        let mut rows_by_bank: HashMap<String, Vec<(String, Vec<f32>)>> = HashMap::new();
        for (bank_id, memory_id, vector) in storage.load_memory_embeddings_by_bank()? {
            rows_by_bank.entry(bank_id).or_default().push((memory_id, vector));
        }
        let vector_indexes: HashMap<String, VectorIndex> =
            rows_by_bank.into_iter().map(|(bank_id, rows)| (bank_id, VectorIndex::from_rows(rows))).collect();
        let working_memory = WorkingMemory::with_config(
            config.working_memory_capacity,
            config.working_memory_decay_window_ms,
            config.working_memory_boost_scale,
        );
        Ok(Self {
            storage,
            config,
            vector_indexes: RwLock::new(vector_indexes),
            working_memory: Mutex::new(working_memory),
            location_sessions: Mutex::new(LocationSessions::new()),
            embedder,
            extractor,
            reranker,
        })
    }

    pub fn create_bank(&self, name: &str) -> Result<Bank> {
        self.storage.create_bank(name, None)
    }

    /// Look up a bank by name, creating it if absent. Host-side convenience
    /// for callers that address banks by name (the CLI's `--bank` flag);
    /// the core itself always addresses banks by id.
    pub fn get_or_create_bank(&self, name: &str) -> Result<Bank> {
        match self.storage.get_bank_by_name(name)? {
            Some(bank) => Ok(bank),
            None => self.create_bank(name),
        }
    }

    pub fn bank_stats(&self, bank_id: &str) -> Result<crate::storage::BankStats> {
        self.storage.bank_stats(bank_id)
    }

    pub fn retain(&self, bank_id: &str, content: &str, options: &RetainOptions) -> Result<RetainResult> {
        let mut indexes = self.vector_indexes.write().expect("vector index poisoned");
        let index = indexes.entry(bank_id.to_string()).or_insert_with(VectorIndex::new);
        retain(&self.storage, index, self.embedder.as_ref(), self.extractor.as_ref(), bank_id, content, options)
    }

    /// Record a path access from a host-side tool invocation, feeding the
    /// location boost (C9). Not part of `recall` itself — callers invoke
    /// it alongside whatever host action touched `path`.
    pub fn record_location(&self, bank_id: &str, path: &str, memory_id: &str, session: Option<&str>, profile: Option<&str>, project: Option<&str>) -> Result<()> {
        let mut sessions = self.location_sessions.lock().expect("location sessions poisoned");
        sessions.record(&self.storage, bank_id, path, memory_id, session, profile, project)
    }

    pub async fn recall(&self, bank_id: &str, query: &str, options: &RecallOptions) -> Result<RecallResult> {
        let indexes = self.vector_indexes.read().expect("vector index poisoned");
        let empty = VectorIndex::new();
        let index = indexes.get(bank_id).unwrap_or(&empty);
        let mut working_memory = self.working_memory.lock().expect("working memory poisoned");
        recall(
            &self.storage,
            &self.config,
            index,
            &mut working_memory,
            self.embedder.as_ref(),
            self.reranker.as_deref(),
            bank_id,
            query,
            options,
        )
        .await
    }
}
