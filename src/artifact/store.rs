//! Append-only artifact store
//!
//! Keys are written at most once per run. Writes to different keys are
//! race-free; concurrent writers on the same key lose with a conflict
//! error, which aborts the run. Every stored value gets a content
//! fingerprint so the final report can carry an evidence trail.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::ArtifactError;
use crate::hash_utils;

use super::value::ArtifactValue;

#[derive(Debug, Clone)]
struct StoredArtifact {
    value: Arc<ArtifactValue>,
    fingerprint: String,
}

/// Evidence-trail entry for one stored artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub key: String,
    /// SHA-256 over the canonical JSON encoding of the payload.
    pub fingerprint: String,
}

/// Run-scoped artifact store.
#[derive(Debug, Default)]
pub struct ArtifactStore {
    entries: RwLock<BTreeMap<String, StoredArtifact>>,
}

impl ArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes an artifact. Fails with [`ArtifactError::Conflict`] when
    /// the key exists and [`ArtifactError::SchemaMismatch`] when a
    /// well-known key gets the wrong payload shape. Returns the key as
    /// the artifact id on success.
    pub fn put(&self, key: &str, value: ArtifactValue) -> Result<String, ArtifactError> {
        if !value.matches_key(key) {
            return Err(ArtifactError::SchemaMismatch {
                key: key.to_string(),
                expected: ArtifactValue::expected_kind(key).unwrap_or("unknown"),
            });
        }

        let fingerprint = serde_json::to_vec(&value)
            .map(|bytes| hash_utils::sha256_hex(&bytes))
            .unwrap_or_default();

        let mut entries = self.entries.write();
        if entries.contains_key(key) {
            return Err(ArtifactError::Conflict(key.to_string()));
        }
        entries.insert(
            key.to_string(),
            StoredArtifact {
                value: Arc::new(value),
                fingerprint,
            },
        );
        Ok(key.to_string())
    }

    pub fn get(&self, key: &str) -> Option<Arc<ArtifactValue>> {
        self.entries.read().get(key).map(|a| Arc::clone(&a.value))
    }

    pub fn has(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Key and fingerprint of every stored artifact, ordered by key.
    pub fn records(&self) -> Vec<ArtifactRecord> {
        self.entries
            .read()
            .iter()
            .map(|(key, stored)| ArtifactRecord {
                key: key.clone(),
                fingerprint: stored.fingerprint.clone(),
            })
            .collect()
    }

    /// Read-only handle handed to analyzers.
    pub fn view(&self) -> ArtifactView<'_> {
        ArtifactView { store: self }
    }
}

/// Read-only snapshot handle over the store. Analyzers consume one of
/// these; only the orchestrator writes.
#[derive(Clone, Copy)]
pub struct ArtifactView<'a> {
    store: &'a ArtifactStore,
}

impl<'a> ArtifactView<'a> {
    pub fn get(&self, key: &str) -> Option<Arc<ArtifactValue>> {
        self.store.get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.store.has(key)
    }
}
