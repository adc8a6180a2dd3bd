// Persistence collaborator: word mappings, mutation counters, and per-channel
// setting overrides.
//
// The read side the mutation engine needs is split out as `MappingLookup`,
// so the engine can run against a store, against `NoMappings` when lookup is
// disabled for a channel, or against a plain test double. `BotStore` adds the
// write side used by the orchestrator and the admin directives.
//
// Both implementations hold the same `StoreDocument`:
// - `MemoryStore` keeps it in memory (tests, and runs without a store file).
// - `JsonFileStore` mirrors it to a JSON file, written to a sibling temp file
//   and renamed into place after every write so a crash never leaves a
//   half-written document behind. The file is created on first write; a
//   missing file on open is an empty store.
//
// Mapping keys are exact literals: "Cat" and "cat" are different mappings.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::{ChannelOverrides, channel_key};
use crate::error::StoreError;

/// Score given to mappings created through the admin directive.
pub const NEUTRAL_SCORE: i64 = 0;

/// A learned or administratively set replacement for one literal word.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordMapping {
    pub original: String,
    pub mutated: String,
    pub score: i64,
}

/// Read access to word mappings.
pub trait MappingLookup {
    fn find_mapping(&self, word: &str) -> Result<Option<WordMapping>, StoreError>;
}

/// Lookup that never finds anything; used when mapping lookup is disabled.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoMappings;

impl MappingLookup for NoMappings {
    fn find_mapping(&self, _word: &str) -> Result<Option<WordMapping>, StoreError> {
        Ok(None)
    }
}

/// Full persistence interface used by the bot.
pub trait BotStore: MappingLookup + Send {
    /// Create or overwrite the mapping for `original`, with a neutral score.
    fn set_mapping(&mut self, original: &str, mutated: &str) -> Result<(), StoreError>;

    /// Remove the mapping for `original`. Returns whether one existed.
    fn remove_mapping(&mut self, original: &str) -> Result<bool, StoreError>;

    /// Record one emitted mutation for `channel`; returns the new count.
    fn increment_mutation_counter(&mut self, channel: &str) -> Result<u64, StoreError>;

    fn mutation_count(&self, channel: &str) -> Result<u64, StoreError>;

    /// Mutations across all channels since the store was created.
    fn total_mutations(&self) -> Result<u64, StoreError>;

    fn channel_overrides(&self, channel: &str) -> Result<Option<ChannelOverrides>, StoreError>;

    fn set_channel_overrides(
        &mut self,
        channel: &str,
        overrides: ChannelOverrides,
    ) -> Result<(), StoreError>;
}

/// Per-channel persisted data.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelRecord {
    pub mutation_count: u64,
    pub settings: Option<ChannelOverrides>,
}

/// Everything a store holds. Channel keys are normalized with
/// `channel_key`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreDocument {
    pub words: BTreeMap<String, WordMapping>,
    pub channels: BTreeMap<String, ChannelRecord>,
    pub total_mutations: u64,
}

impl StoreDocument {
    fn set_mapping(&mut self, original: &str, mutated: &str) {
        self.words.insert(
            original.to_string(),
            WordMapping {
                original: original.to_string(),
                mutated: mutated.to_string(),
                score: NEUTRAL_SCORE,
            },
        );
    }

    fn increment(&mut self, channel: &str) -> u64 {
        let record = self.channels.entry(channel_key(channel)).or_default();
        record.mutation_count += 1;
        self.total_mutations += 1;
        record.mutation_count
    }

    fn count(&self, channel: &str) -> u64 {
        self.channels
            .get(&channel_key(channel))
            .map_or(0, |r| r.mutation_count)
    }

    fn overrides(&self, channel: &str) -> Option<ChannelOverrides> {
        self.channels
            .get(&channel_key(channel))
            .and_then(|r| r.settings.clone())
    }

    fn set_overrides(&mut self, channel: &str, overrides: ChannelOverrides) {
        self.channels
            .entry(channel_key(channel))
            .or_default()
            .settings = Some(overrides);
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-memory store.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    doc: StoreDocument,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a mapping with an explicit score.
    pub fn insert_scored(&mut self, original: &str, mutated: &str, score: i64) {
        self.doc.words.insert(
            original.to_string(),
            WordMapping {
                original: original.to_string(),
                mutated: mutated.to_string(),
                score,
            },
        );
    }
}

impl MappingLookup for MemoryStore {
    fn find_mapping(&self, word: &str) -> Result<Option<WordMapping>, StoreError> {
        Ok(self.doc.words.get(word).cloned())
    }
}

impl BotStore for MemoryStore {
    fn set_mapping(&mut self, original: &str, mutated: &str) -> Result<(), StoreError> {
        self.doc.set_mapping(original, mutated);
        Ok(())
    }

    fn remove_mapping(&mut self, original: &str) -> Result<bool, StoreError> {
        Ok(self.doc.words.remove(original).is_some())
    }

    fn increment_mutation_counter(&mut self, channel: &str) -> Result<u64, StoreError> {
        Ok(self.doc.increment(channel))
    }

    fn mutation_count(&self, channel: &str) -> Result<u64, StoreError> {
        Ok(self.doc.count(channel))
    }

    fn total_mutations(&self) -> Result<u64, StoreError> {
        Ok(self.doc.total_mutations)
    }

    fn channel_overrides(&self, channel: &str) -> Result<Option<ChannelOverrides>, StoreError> {
        Ok(self.doc.overrides(channel))
    }

    fn set_channel_overrides(
        &mut self,
        channel: &str,
        overrides: ChannelOverrides,
    ) -> Result<(), StoreError> {
        self.doc.set_overrides(channel, overrides);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// JsonFileStore
// ---------------------------------------------------------------------------

/// Store backed by a single JSON document on disk.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    doc: StoreDocument,
}

impl JsonFileStore {
    /// Open the store at `path`, reading the document if the file exists.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let doc = match fs::read_to_string(&path) {
            Ok(json) => serde_json::from_str(&json)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreDocument::default(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        Ok(Self { path, doc })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `change` to a copy of the document, persist it, then commit it
    /// in memory. A failed write leaves the in-memory state untouched.
    fn write_with<T>(&mut self, change: impl FnOnce(&mut StoreDocument) -> T) -> Result<T, StoreError> {
        let mut next = self.doc.clone();
        let out = change(&mut next);
        self.persist(&next)?;
        self.doc = next;
        Ok(out)
    }

    fn persist(&self, doc: &StoreDocument) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        let json = serde_json::to_string_pretty(doc)?;
        let mut tmp_name = self.path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(".tmp");
        let tmp = self.path.with_file_name(tmp_name);

        let mut file = fs::File::create(&tmp).map_err(io_err)?;
        file.write_all(json.as_bytes()).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)
    }
}

impl MappingLookup for JsonFileStore {
    fn find_mapping(&self, word: &str) -> Result<Option<WordMapping>, StoreError> {
        Ok(self.doc.words.get(word).cloned())
    }
}

impl BotStore for JsonFileStore {
    fn set_mapping(&mut self, original: &str, mutated: &str) -> Result<(), StoreError> {
        self.write_with(|doc| doc.set_mapping(original, mutated))
    }

    fn remove_mapping(&mut self, original: &str) -> Result<bool, StoreError> {
        if !self.doc.words.contains_key(original) {
            return Ok(false);
        }
        self.write_with(|doc| doc.words.remove(original).is_some())
    }

    fn increment_mutation_counter(&mut self, channel: &str) -> Result<u64, StoreError> {
        self.write_with(|doc| doc.increment(channel))
    }

    fn mutation_count(&self, channel: &str) -> Result<u64, StoreError> {
        Ok(self.doc.count(channel))
    }

    fn total_mutations(&self) -> Result<u64, StoreError> {
        Ok(self.doc.total_mutations)
    }

    fn channel_overrides(&self, channel: &str) -> Result<Option<ChannelOverrides>, StoreError> {
        Ok(self.doc.overrides(channel))
    }

    fn set_channel_overrides(
        &mut self,
        channel: &str,
        overrides: ChannelOverrides,
    ) -> Result<(), StoreError> {
        self.write_with(|doc| doc.set_overrides(channel, overrides))
    }
}
