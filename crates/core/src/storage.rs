//! Canonical script identity, save data and the file-backed slot store.
//!
//! Saves are bound to a script through the SHA-256 of its compiled binary.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

use crate::state::EngineState;
use crate::version::{SAVE_BINARY_MAGIC, SAVE_FORMAT_VERSION};

/// Unique identifier for a compiled script, computed as SHA-256 of its binary representation.
pub type ScriptId = [u8; 32];

/// Computes the canonical script_id from compiled script bytes.
pub fn compute_script_id(compiled_bytes: &[u8]) -> ScriptId {
    let mut hasher = Sha256::new();
    hasher.update(compiled_bytes);
    hasher.finalize().into()
}

pub fn script_id_hex(script_id: &ScriptId) -> String {
    let mut output = String::with_capacity(script_id.len() * 2);
    for byte in script_id {
        use std::fmt::Write as _;
        let _ = write!(&mut output, "{byte:02x}");
    }
    output
}

/// Save slot number, `0..SlotIndex::MAX_SLOTS`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct SlotIndex(u8);

impl SlotIndex {
    pub const MAX_SLOTS: u8 = 10;

    pub fn new(index: u8) -> Result<Self, SaveError> {
        if index < Self::MAX_SLOTS {
            Ok(Self(index))
        } else {
            Err(SaveError::InvalidSlot(index))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn all() -> impl Iterator<Item = SlotIndex> {
        (0..Self::MAX_SLOTS).map(SlotIndex)
    }

    /// File stem used by file-based stores, e.g. `slot_03`.
    pub fn file_stem(self) -> String {
        format!("slot_{:02}", self.0)
    }
}

impl TryFrom<u8> for SlotIndex {
    type Error = SaveError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SlotIndex> for u8 {
    fn from(value: SlotIndex) -> Self {
        value.0
    }
}

impl fmt::Display for SlotIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Save data with script identity, preview text and timestamp.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveData {
    /// SHA-256 of the compiled script this save belongs to.
    pub script_id: ScriptId,
    /// The engine state at the time of saving.
    pub state: EngineState,
    /// Text of the step the save was made on.
    pub preview: String,
    pub saved_unix_ms: u64,
}

impl SaveData {
    pub fn new(script_id: ScriptId, state: EngineState, preview: impl Into<String>) -> Self {
        Self {
            script_id,
            state,
            preview: preview_line(&preview.into()),
            saved_unix_ms: now_unix_ms(),
        }
    }

    /// Serializes save data to binary format with magic bytes and version.
    pub fn to_binary(&self) -> Result<Vec<u8>, SaveError> {
        let payload =
            postcard::to_allocvec(self).map_err(|e| SaveError::Serialization(e.to_string()))?;
        let checksum = crc32fast::hash(&payload);
        let payload_len = u32::try_from(payload.len()).map_err(|_| SaveError::TooLarge)?;

        let mut output = Vec::with_capacity(4 + 2 + 4 + 4 + payload.len());
        output.extend_from_slice(&SAVE_BINARY_MAGIC);
        output.extend_from_slice(&SAVE_FORMAT_VERSION.to_le_bytes());
        output.extend_from_slice(&checksum.to_le_bytes());
        output.extend_from_slice(&payload_len.to_le_bytes());
        output.extend_from_slice(&payload);
        Ok(output)
    }

    /// Deserializes save data from binary format, validating magic, version, and checksum.
    pub fn from_binary(input: &[u8]) -> Result<Self, SaveError> {
        if input.len() < 14 {
            return Err(SaveError::TooSmall);
        }
        if input[0..4] != SAVE_BINARY_MAGIC {
            return Err(SaveError::InvalidMagic);
        }
        let version = u16::from_le_bytes([input[4], input[5]]);
        if version != SAVE_FORMAT_VERSION {
            return Err(SaveError::IncompatibleVersion {
                found: version,
                expected: SAVE_FORMAT_VERSION,
            });
        }
        let checksum = u32::from_le_bytes([input[6], input[7], input[8], input[9]]);
        let payload_len = u32::from_le_bytes([input[10], input[11], input[12], input[13]]) as usize;
        let payload = input.get(14..).ok_or(SaveError::MissingPayload)?;
        if payload.len() != payload_len {
            return Err(SaveError::LengthMismatch);
        }
        if crc32fast::hash(payload) != checksum {
            return Err(SaveError::ChecksumMismatch);
        }
        postcard::from_bytes(payload).map_err(|e| SaveError::Serialization(e.to_string()))
    }

    /// Validates that this save matches the given script_id.
    pub fn validate_script_id(&self, expected: &ScriptId) -> Result<(), SaveError> {
        if &self.script_id != expected {
            return Err(SaveError::ScriptMismatch);
        }
        Ok(())
    }

    pub fn metadata(&self, slot: SlotIndex) -> SaveSlotMetadata {
        SaveSlotMetadata {
            slot,
            saved_unix_ms: self.saved_unix_ms,
            preview: self.preview.clone(),
            event_id: self.state.cursor.event_id.clone(),
            step_index: self.state.cursor.step_index,
            script_id_hex: script_id_hex(&self.script_id),
        }
    }
}

/// Errors that can occur while encoding or decoding saves.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SaveError {
    #[error("save data too small")]
    TooSmall,
    #[error("save data too large")]
    TooLarge,
    #[error("invalid save file magic bytes")]
    InvalidMagic,
    #[error("incompatible save version: found {found}, expected {expected}")]
    IncompatibleVersion { found: u16, expected: u16 },
    #[error("save file checksum mismatch")]
    ChecksumMismatch,
    #[error("save file length mismatch")]
    LengthMismatch,
    #[error("save file missing payload")]
    MissingPayload,
    #[error("save does not match current script")]
    ScriptMismatch,
    #[error("slot {0} is out of range")]
    InvalidSlot(u8),
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Listing entry for a saved slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveSlotMetadata {
    pub slot: SlotIndex,
    pub saved_unix_ms: u64,
    pub preview: String,
    pub event_id: String,
    pub step_index: u32,
    pub script_id_hex: String,
}

#[derive(Debug, Error)]
pub enum SaveStoreError {
    #[error("save store io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("save store serialization error: {0}")]
    Save(#[from] SaveError),
    #[error("slot {0} is empty")]
    EmptySlot(SlotIndex),
    #[error("save store recovery failed (primary: {primary}, backup: {})", describe_backup(.backup))]
    RecoveryFailed {
        primary: SaveError,
        backup: Option<SaveError>,
    },
}

fn describe_backup(backup: &Option<SaveError>) -> String {
    match backup {
        Some(err) => err.to_string(),
        None => "missing".to_string(),
    }
}

/// Save slots as files under one directory.
///
/// Layout: `slots/slot_NN.vnsav` (with a `.bak` of the previous write) and
/// `meta/slot_NN.json`.
#[derive(Debug, Clone)]
pub struct SaveSlotStore {
    root: PathBuf,
}

impl SaveSlotStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ensure_layout(&self) -> Result<(), SaveStoreError> {
        fs::create_dir_all(self.root.join("slots"))?;
        fs::create_dir_all(self.root.join("meta"))?;
        Ok(())
    }

    pub fn save_slot(
        &self,
        slot: SlotIndex,
        save: &SaveData,
    ) -> Result<SaveSlotMetadata, SaveStoreError> {
        self.ensure_layout()?;
        self.atomic_write_binary(&self.slot_path(slot), &save.to_binary()?)?;
        let metadata = save.metadata(slot);
        self.atomic_write_binary(
            &self.metadata_path(slot),
            serde_json::to_vec_pretty(&metadata)
                .map_err(|err| SaveError::Serialization(err.to_string()))?
                .as_slice(),
        )?;
        Ok(metadata)
    }

    pub fn load_slot(&self, slot: SlotIndex) -> Result<SaveData, SaveStoreError> {
        let slot_path = self.slot_path(slot);
        let backup_path = backup_path(&slot_path);
        if !slot_path.exists() && !backup_path.exists() {
            return Err(SaveStoreError::EmptySlot(slot));
        }
        self.load_binary_with_recovery(&slot_path, &backup_path)
    }

    pub fn remove_slot(&self, slot: SlotIndex) -> Result<(), SaveStoreError> {
        let slot_path = self.slot_path(slot);
        for path in [
            backup_path(&slot_path),
            slot_path,
            self.metadata_path(slot),
        ] {
            if path.exists() {
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }

    /// Occupied slots, newest first.
    pub fn list_slots(&self) -> Result<Vec<SaveSlotMetadata>, SaveStoreError> {
        self.ensure_layout()?;
        let mut entries = Vec::new();
        for entry in fs::read_dir(self.root.join("meta"))? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let bytes = fs::read(&path)?;
            let metadata: SaveSlotMetadata = serde_json::from_slice(&bytes)
                .map_err(|err| SaveError::Serialization(err.to_string()))?;
            if self.slot_path(metadata.slot).exists() {
                entries.push(metadata);
            }
        }
        entries.sort_by(|a, b| b.saved_unix_ms.cmp(&a.saved_unix_ms));
        Ok(entries)
    }

    fn load_binary_with_recovery(
        &self,
        primary_path: &Path,
        backup_path: &Path,
    ) -> Result<SaveData, SaveStoreError> {
        let primary = fs::read(primary_path)
            .map_err(|err| SaveError::Serialization(err.to_string()))
            .and_then(|bytes| SaveData::from_binary(&bytes));
        let primary_err = match primary {
            Ok(save) => return Ok(save),
            Err(err) => err,
        };
        match fs::read(backup_path) {
            Ok(backup_bytes) => match SaveData::from_binary(&backup_bytes) {
                Ok(save) => {
                    tracing::warn!(
                        path = %primary_path.display(),
                        error = %primary_err,
                        "save slot recovered from backup"
                    );
                    Ok(save)
                }
                Err(backup_err) => Err(SaveStoreError::RecoveryFailed {
                    primary: primary_err,
                    backup: Some(backup_err),
                }),
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(SaveStoreError::RecoveryFailed {
                    primary: primary_err,
                    backup: None,
                })
            }
            Err(err) => Err(SaveStoreError::Io(err)),
        }
    }

    fn atomic_write_binary(&self, path: &Path, bytes: &[u8]) -> Result<(), SaveStoreError> {
        let parent = path.parent().ok_or_else(|| {
            SaveStoreError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "target path has no parent",
            ))
        })?;
        fs::create_dir_all(parent)?;
        if path.exists() {
            fs::copy(path, backup_path(path))?;
        }
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, bytes)?;
        if path.exists() {
            fs::remove_file(path)?;
        }
        fs::rename(&tmp_path, path)?;
        Ok(())
    }

    fn slot_path(&self, slot: SlotIndex) -> PathBuf {
        self.root
            .join("slots")
            .join(format!("{}.vnsav", slot.file_stem()))
    }

    fn metadata_path(&self, slot: SlotIndex) -> PathBuf {
        self.root
            .join("meta")
            .join(format!("{}.json", slot.file_stem()))
    }
}

fn now_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as u64)
        .unwrap_or(0)
}

fn preview_line(text: &str) -> String {
    const MAX_CHARS: usize = 96;
    let text = text.trim();
    if text.chars().count() <= MAX_CHARS {
        return text.to_string();
    }
    let mut truncated = text
        .chars()
        .take(MAX_CHARS.saturating_sub(3))
        .collect::<String>();
    truncated.push_str("...");
    truncated
}

fn backup_path(path: &Path) -> PathBuf {
    let mut output = path.as_os_str().to_os_string();
    output.push(".bak");
    PathBuf::from(output)
}

#[cfg(test)]
#[path = "tests/storage_tests.rs"]
mod tests;
