//! Async persistence ports: save slot backends and remote progress sync.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::engine::{AffectionChange, Engine, MiniGameScore};
use crate::error::VnError;
use crate::storage::{SaveData, SaveError, SaveSlotMetadata, SaveSlotStore, SaveStoreError, SlotIndex};

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("slot {0} is empty")]
    EmptySlot(SlotIndex),
    #[error("save backend failed: {0}")]
    Backend(String),
    #[error(transparent)]
    Save(#[from] SaveError),
    #[error(transparent)]
    Store(SaveStoreError),
    #[error("saved state rejected: {0}")]
    InvalidState(#[from] VnError),
}

impl From<SaveStoreError> for PersistError {
    fn from(value: SaveStoreError) -> Self {
        match value {
            SaveStoreError::EmptySlot(slot) => PersistError::EmptySlot(slot),
            SaveStoreError::Save(err) => PersistError::Save(err),
            other => PersistError::Store(other),
        }
    }
}

/// Storage for save slots: local files, a remote API, or memory.
#[async_trait]
pub trait SaveBackend: Send + Sync {
    async fn write_slot(
        &self,
        slot: SlotIndex,
        save: &SaveData,
    ) -> Result<SaveSlotMetadata, PersistError>;

    async fn read_slot(&self, slot: SlotIndex) -> Result<SaveData, PersistError>;

    async fn delete_slot(&self, slot: SlotIndex) -> Result<(), PersistError>;

    /// Occupied slots, newest first.
    async fn list_slots(&self) -> Result<Vec<SaveSlotMetadata>, PersistError>;
}

/// Affection and best scores as stored by a remote profile.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RemoteProgress {
    pub affection: BTreeMap<String, i32>,
    pub minigame_scores: BTreeMap<String, u32>,
}

/// Remote player profile holding affection and minigame best scores.
#[async_trait]
pub trait ProgressSync: Send + Sync {
    async fn push_affection(&self, change: &AffectionChange) -> Result<(), PersistError>;

    async fn push_minigame_score(&self, score: &MiniGameScore) -> Result<(), PersistError>;

    async fn fetch_progress(&self) -> Result<RemoteProgress, PersistError>;
}

#[async_trait]
impl SaveBackend for SaveSlotStore {
    async fn write_slot(
        &self,
        slot: SlotIndex,
        save: &SaveData,
    ) -> Result<SaveSlotMetadata, PersistError> {
        Ok(self.save_slot(slot, save)?)
    }

    async fn read_slot(&self, slot: SlotIndex) -> Result<SaveData, PersistError> {
        Ok(self.load_slot(slot)?)
    }

    async fn delete_slot(&self, slot: SlotIndex) -> Result<(), PersistError> {
        Ok(self.remove_slot(slot)?)
    }

    async fn list_slots(&self) -> Result<Vec<SaveSlotMetadata>, PersistError> {
        Ok(SaveSlotStore::list_slots(self)?)
    }
}

/// In-memory backend keeping encoded saves per slot.
#[derive(Debug, Default)]
pub struct MemorySaveBackend {
    slots: Mutex<BTreeMap<SlotIndex, Vec<u8>>>,
}

impl MemorySaveBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_slots<T>(
        &self,
        f: impl FnOnce(&mut BTreeMap<SlotIndex, Vec<u8>>) -> Result<T, PersistError>,
    ) -> Result<T, PersistError> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| PersistError::Backend("memory backend lock poisoned".to_string()))?;
        f(&mut slots)
    }
}

#[async_trait]
impl SaveBackend for MemorySaveBackend {
    async fn write_slot(
        &self,
        slot: SlotIndex,
        save: &SaveData,
    ) -> Result<SaveSlotMetadata, PersistError> {
        let bytes = save.to_binary()?;
        self.with_slots(|slots| {
            slots.insert(slot, bytes);
            Ok(save.metadata(slot))
        })
    }

    async fn read_slot(&self, slot: SlotIndex) -> Result<SaveData, PersistError> {
        let bytes = self.with_slots(|slots| {
            slots.get(&slot).cloned().ok_or(PersistError::EmptySlot(slot))
        })?;
        Ok(SaveData::from_binary(&bytes)?)
    }

    async fn delete_slot(&self, slot: SlotIndex) -> Result<(), PersistError> {
        self.with_slots(|slots| {
            slots.remove(&slot);
            Ok(())
        })
    }

    async fn list_slots(&self) -> Result<Vec<SaveSlotMetadata>, PersistError> {
        let encoded = self.with_slots(|slots| Ok(slots.clone()))?;
        let mut entries = encoded
            .into_iter()
            .map(|(slot, bytes)| Ok(SaveData::from_binary(&bytes)?.metadata(slot)))
            .collect::<Result<Vec<_>, PersistError>>()?;
        entries.sort_by(|a, b| b.saved_unix_ms.cmp(&a.saved_unix_ms));
        Ok(entries)
    }
}

impl Engine {
    /// Persists the current state to `slot`.
    pub async fn save<B: SaveBackend + ?Sized>(
        &self,
        backend: &B,
        slot: SlotIndex,
    ) -> Result<SaveSlotMetadata, PersistError> {
        let preview = self.view().map(|view| view.text).unwrap_or_default();
        let save = SaveData::new(*self.script_id(), self.snapshot(), preview);
        let metadata = backend.write_slot(slot, &save).await?;
        info!(
            slot = %slot,
            event = %metadata.event_id,
            step = metadata.step_index,
            "game saved"
        );
        Ok(metadata)
    }

    /// Replaces the current state with the one saved in `slot`.
    ///
    /// Any failure leaves the in-memory state untouched.
    pub async fn load<B: SaveBackend + ?Sized>(
        &mut self,
        backend: &B,
        slot: SlotIndex,
    ) -> Result<(), PersistError> {
        let save = backend.read_slot(slot).await?;
        save.validate_script_id(self.script_id())?;
        self.restore(save.state)?;
        info!(slot = %slot, "game loaded");
        Ok(())
    }

    /// Pushes queued affection updates to `remote`.
    ///
    /// Failures are logged and dropped; local scores are never rolled back.
    /// Returns the number of updates delivered.
    pub async fn sync_affection<S: ProgressSync + ?Sized>(&mut self, remote: &S) -> usize {
        let mut delivered = 0;
        for change in self.drain_affection_changes() {
            match remote.push_affection(&change).await {
                Ok(()) => delivered += 1,
                Err(err) => warn!(
                    character = %change.character_id,
                    value = change.value,
                    error = %err,
                    "affection sync failed"
                ),
            }
        }
        delivered
    }

    /// Pushes queued minigame best scores to `remote`, like [`Engine::sync_affection`].
    pub async fn sync_minigame_scores<S: ProgressSync + ?Sized>(&mut self, remote: &S) -> usize {
        let mut delivered = 0;
        for score in self.drain_minigame_scores() {
            match remote.push_minigame_score(&score).await {
                Ok(()) => delivered += 1,
                Err(err) => warn!(
                    game = %score.game_id,
                    best = score.best,
                    error = %err,
                    "minigame score sync failed"
                ),
            }
        }
        delivered
    }

    /// Replaces local affection and best scores with the remote profile.
    ///
    /// On failure local state is kept and the error returned.
    pub async fn pull_progress<S: ProgressSync + ?Sized>(
        &mut self,
        remote: &S,
    ) -> Result<(), PersistError> {
        let progress = remote.fetch_progress().await.map_err(|err| {
            warn!(error = %err, "remote progress unavailable, keeping local scores");
            err
        })?;
        info!(
            characters = progress.affection.len(),
            games = progress.minigame_scores.len(),
            "remote progress adopted"
        );
        self.adopt_remote_progress(progress.affection, progress.minigame_scores);
        Ok(())
    }
}
