mod common;

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use common::{campus_engine, engine_at_choice, event_and_index};
use scenario_engine::{
    AffectionChange, MemorySaveBackend, MiniGameOutcome, MiniGameScore, PersistError,
    ProgressSync, RemoteProgress, SaveBackend, SaveData, SaveSlotMetadata, SaveSlotStore,
    SlotIndex,
};

fn slot(index: u8) -> SlotIndex {
    SlotIndex::new(index).expect("valid slot")
}

/// Backend whose every call fails, like an unreachable save server.
struct OfflineBackend;

#[async_trait]
impl SaveBackend for OfflineBackend {
    async fn write_slot(
        &self,
        _slot: SlotIndex,
        _save: &SaveData,
    ) -> Result<SaveSlotMetadata, PersistError> {
        Err(PersistError::Backend("connection refused".to_string()))
    }

    async fn read_slot(&self, _slot: SlotIndex) -> Result<SaveData, PersistError> {
        Err(PersistError::Backend("connection refused".to_string()))
    }

    async fn delete_slot(&self, _slot: SlotIndex) -> Result<(), PersistError> {
        Err(PersistError::Backend("connection refused".to_string()))
    }

    async fn list_slots(&self) -> Result<Vec<SaveSlotMetadata>, PersistError> {
        Err(PersistError::Backend("connection refused".to_string()))
    }
}

/// Remote profile that records pushes and serves a fixed profile.
#[derive(Default)]
struct RecordingRemote {
    received: Mutex<Vec<AffectionChange>>,
    scores: Mutex<Vec<MiniGameScore>>,
    fail_for: Option<&'static str>,
    profile: Option<RemoteProgress>,
}

impl RecordingRemote {
    fn values(&self) -> Vec<(String, i32)> {
        self.received
            .lock()
            .expect("remote lock")
            .iter()
            .map(|change| (change.character_id.clone(), change.value))
            .collect()
    }
}

#[async_trait]
impl ProgressSync for RecordingRemote {
    async fn push_affection(&self, change: &AffectionChange) -> Result<(), PersistError> {
        if self.fail_for == Some(change.character_id.as_str()) {
            return Err(PersistError::Backend("timeout".to_string()));
        }
        self.received
            .lock()
            .expect("remote lock")
            .push(change.clone());
        Ok(())
    }

    async fn push_minigame_score(&self, score: &MiniGameScore) -> Result<(), PersistError> {
        if self.fail_for == Some(score.game_id.as_str()) {
            return Err(PersistError::Backend("timeout".to_string()));
        }
        self.scores.lock().expect("remote lock").push(score.clone());
        Ok(())
    }

    async fn fetch_progress(&self) -> Result<RemoteProgress, PersistError> {
        self.profile
            .clone()
            .ok_or_else(|| PersistError::Backend("profile not found".to_string()))
    }
}

#[tokio::test]
async fn save_then_load_restores_exact_state() {
    let backend = MemorySaveBackend::new();
    let mut engine = engine_at_choice();
    engine.select_choice("library").expect("choice");
    let saved = engine.snapshot();

    let metadata = engine.save(&backend, slot(3)).await.expect("save");
    assert_eq!(metadata.event_id, "library");
    assert_eq!(metadata.preview, "책 냄새.");

    engine.advance();
    engine.reset();
    assert_ne!(engine.snapshot(), saved);

    engine.load(&backend, slot(3)).await.expect("load");
    assert_eq!(engine.snapshot(), saved);
    assert_eq!(
        engine.view().and_then(|view| view.background),
        Some("/backgrounds/library.png".to_string())
    );
}

#[tokio::test]
async fn failing_backend_leaves_state_untouched() {
    let mut engine = engine_at_choice();
    let before = engine.snapshot();

    let err = engine
        .save(&OfflineBackend, slot(0))
        .await
        .expect_err("offline save");
    assert!(matches!(err, PersistError::Backend(_)));
    let err = engine
        .load(&OfflineBackend, slot(0))
        .await
        .expect_err("offline load");
    assert!(matches!(err, PersistError::Backend(_)));
    assert_eq!(engine.snapshot(), before);
}

#[tokio::test]
async fn empty_slot_load_is_an_error() {
    let backend = MemorySaveBackend::new();
    let mut engine = campus_engine();
    let err = engine
        .load(&backend, slot(9))
        .await
        .expect_err("empty slot");
    assert!(matches!(err, PersistError::EmptySlot(index) if index == slot(9)));
    assert_eq!(event_and_index(&engine), ("init".to_string(), 0));
}

#[tokio::test]
async fn save_from_other_script_is_rejected() {
    let backend = MemorySaveBackend::new();
    let engine = campus_engine();
    let foreign = SaveData::new([7u8; 32], engine.snapshot(), "elsewhere");
    backend.write_slot(slot(1), &foreign).await.expect("write");

    let mut engine = engine_at_choice();
    let before = engine.snapshot();
    let err = engine
        .load(&backend, slot(1))
        .await
        .expect_err("script mismatch");
    assert!(matches!(err, PersistError::Save(_)));
    assert_eq!(engine.snapshot(), before);
}

#[tokio::test]
async fn file_store_backend_lists_and_deletes_slots() {
    let dir = tempfile::tempdir().expect("temp dir");
    let store = SaveSlotStore::new(dir.path().to_path_buf());
    let mut engine = campus_engine();

    engine.save(&store, slot(0)).await.expect("save 0");
    engine.advance();
    engine.save(&store, slot(2)).await.expect("save 2");

    let mut slots: Vec<_> = SaveBackend::list_slots(&store)
        .await
        .expect("list")
        .into_iter()
        .map(|meta| meta.slot)
        .collect();
    slots.sort();
    assert_eq!(slots, vec![slot(0), slot(2)]);

    store.delete_slot(slot(0)).await.expect("delete");
    assert!(matches!(
        engine.load(&store, slot(0)).await,
        Err(PersistError::EmptySlot(_))
    ));
    engine.jump_to("dorm").expect("jump");
    engine.load(&store, slot(2)).await.expect("load 2");
    assert_eq!(event_and_index(&engine), ("init".to_string(), 1));
}

#[tokio::test]
async fn affection_sync_is_fire_and_forget() {
    let mut engine = engine_at_choice();
    engine.select_choice("library").expect("choice");
    let remote = RecordingRemote::default();
    assert_eq!(engine.sync_affection(&remote).await, 1);

    engine.advance();
    engine
        .resolve_minigame(MiniGameOutcome::Win, None)
        .expect("minigame");
    assert_eq!(engine.sync_affection(&remote).await, 1);
    assert_eq!(
        remote.values(),
        vec![("jisoo".to_string(), 5), ("jisoo".to_string(), 15)]
    );
    assert_eq!(engine.sync_affection(&remote).await, 0);

    let mut engine = engine_at_choice();
    engine.select_choice("library").expect("choice");
    let failing = RecordingRemote {
        fail_for: Some("jisoo"),
        ..RecordingRemote::default()
    };
    assert_eq!(engine.sync_affection(&failing).await, 0);
    assert_eq!(engine.affection().get("jisoo"), 5);
    assert!(engine.drain_affection_changes().is_empty());
}

#[test]
fn unsynced_updates_keep_only_the_latest_value() {
    let mut engine = engine_at_choice();
    let at_choice = engine.snapshot();
    for _ in 0..50 {
        engine.restore(at_choice.clone()).expect("restore");
        engine.select_choice("library").expect("choice");
    }
    assert_eq!(
        engine.drain_affection_changes(),
        vec![AffectionChange {
            character_id: "jisoo".to_string(),
            value: 5,
        }]
    );
}

#[tokio::test]
async fn load_then_sync_pushes_the_loaded_scores() {
    let backend = MemorySaveBackend::new();
    let remote = RecordingRemote::default();
    let mut engine = engine_at_choice();
    engine.select_choice("library").expect("choice");
    engine.save(&backend, slot(4)).await.expect("save");
    engine.sync_affection(&remote).await;

    engine.advance();
    engine
        .resolve_minigame(MiniGameOutcome::Lose, Some(80))
        .expect("minigame");
    assert_eq!(engine.affection().get("jisoo"), 0);

    engine.load(&backend, slot(4)).await.expect("load");
    assert_eq!(engine.affection().get("jisoo"), 5);
    assert_eq!(engine.sync_affection(&remote).await, 1);
    assert_eq!(
        remote.values(),
        vec![("jisoo".to_string(), 5), ("jisoo".to_string(), 5)]
    );
    assert_eq!(engine.sync_minigame_scores(&remote).await, 0);
}

#[tokio::test]
async fn improved_minigame_best_is_pushed() {
    let mut engine = engine_at_choice();
    engine.select_choice("library").expect("choice");
    engine.advance();
    engine
        .resolve_minigame(MiniGameOutcome::Win, Some(300))
        .expect("minigame");
    assert_eq!(engine.record_minigame_score("cards", 120), 300);
    assert_eq!(engine.record_minigame_score("cards", 450), 450);

    let remote = RecordingRemote::default();
    assert_eq!(engine.sync_minigame_scores(&remote).await, 1);
    assert_eq!(
        *remote.scores.lock().expect("remote lock"),
        vec![MiniGameScore {
            game_id: "cards".to_string(),
            best: 450,
        }]
    );

    engine.record_minigame_score("cards", 200);
    assert_eq!(engine.sync_minigame_scores(&remote).await, 0);

    let failing = RecordingRemote {
        fail_for: Some("cards"),
        ..RecordingRemote::default()
    };
    engine.record_minigame_score("cards", 900);
    assert_eq!(engine.sync_minigame_scores(&failing).await, 0);
    assert_eq!(engine.state().minigame_scores.get("cards"), Some(&900));
}

#[tokio::test]
async fn pull_replaces_local_scores_with_clamped_remote_values() {
    let mut engine = engine_at_choice();
    engine.select_choice("library").expect("choice");

    let profile = RemoteProgress {
        affection: BTreeMap::from([
            ("jisoo".to_string(), 140),
            ("minji".to_string(), -3),
            ("seoyeon".to_string(), 42),
        ]),
        minigame_scores: BTreeMap::from([("cards".to_string(), 700)]),
    };
    let remote = RecordingRemote {
        profile: Some(profile),
        ..RecordingRemote::default()
    };
    engine.pull_progress(&remote).await.expect("pull");

    assert_eq!(engine.affection().get("jisoo"), 100);
    assert_eq!(engine.affection().get("minji"), 0);
    assert_eq!(engine.affection().get("seoyeon"), 42);
    assert_eq!(engine.state().minigame_scores.get("cards"), Some(&700));
    assert!(engine.drain_affection_changes().is_empty());
    assert_eq!(event_and_index(&engine), ("library".to_string(), 0));

    let before = engine.snapshot();
    let offline = RecordingRemote::default();
    assert!(matches!(
        engine.pull_progress(&offline).await,
        Err(PersistError::Backend(_))
    ));
    assert_eq!(engine.snapshot(), before);
}
