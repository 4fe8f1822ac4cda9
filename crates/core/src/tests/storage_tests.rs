use super::*;

fn sample_save(event_id: &str, step_index: u32) -> SaveData {
    let mut state = EngineState::new(event_id);
    state.cursor.step_index = step_index;
    state.affection.apply_delta("jisoo", 42);
    state.display_name = Some("김민수".to_string());
    SaveData::new([1u8; 32], state, "안녕, 민수야.")
}

fn temp_store() -> (tempfile::TempDir, SaveSlotStore) {
    let dir = tempfile::tempdir().expect("temp dir");
    let store = SaveSlotStore::new(dir.path().join("saves"));
    (dir, store)
}

fn slot(index: u8) -> SlotIndex {
    SlotIndex::new(index).expect("valid slot")
}

#[test]
fn slot_index_rejects_out_of_range() {
    assert!(SlotIndex::new(9).is_ok());
    assert_eq!(SlotIndex::new(10), Err(SaveError::InvalidSlot(10)));
    assert_eq!(slot(3).file_stem(), "slot_03");
    assert_eq!(SlotIndex::all().count(), usize::from(SlotIndex::MAX_SLOTS));
    assert!(serde_json::from_str::<SlotIndex>("12").is_err());
}

#[test]
fn slot_store_roundtrip_and_list() {
    let (_dir, store) = temp_store();
    let save = sample_save("chapter1_scene2", 7);

    let metadata = store
        .save_slot(slot(1), &save)
        .expect("slot save should succeed");
    assert_eq!(metadata.slot, slot(1));
    assert_eq!(metadata.event_id, "chapter1_scene2");
    assert_eq!(metadata.step_index, 7);
    assert_eq!(metadata.preview, "안녕, 민수야.");
    assert_eq!(metadata.script_id_hex, "01".repeat(32));

    let loaded = store.load_slot(slot(1)).expect("slot load should succeed");
    assert_eq!(loaded, save);

    let slots = store.list_slots().expect("list slots should succeed");
    assert_eq!(slots, vec![metadata]);
}

#[test]
fn empty_slot_is_reported() {
    let (_dir, store) = temp_store();
    assert!(matches!(
        store.load_slot(slot(4)),
        Err(SaveStoreError::EmptySlot(index)) if index == slot(4)
    ));
}

#[test]
fn remove_slot_deletes_data_and_metadata() {
    let (_dir, store) = temp_store();
    store
        .save_slot(slot(2), &sample_save("init", 0))
        .expect("save");
    store
        .save_slot(slot(2), &sample_save("init", 1))
        .expect("second save writes a backup");
    store.remove_slot(slot(2)).expect("remove");
    assert!(store.list_slots().expect("list").is_empty());
    assert!(matches!(
        store.load_slot(slot(2)),
        Err(SaveStoreError::EmptySlot(_))
    ));
}

#[test]
fn corrupted_slot_recovers_from_backup() {
    let (_dir, store) = temp_store();
    let first = sample_save("init", 1);
    store.save_slot(slot(0), &first).expect("first save");
    store
        .save_slot(slot(0), &sample_save("init", 2))
        .expect("second save");

    let slot_path = store.root().join("slots").join("slot_00.vnsav");
    fs::write(&slot_path, b"garbage").expect("corrupt primary");

    let recovered = store.load_slot(slot(0)).expect("backup should load");
    assert_eq!(recovered.state.cursor.step_index, 1);
}

#[test]
fn corrupted_slot_without_backup_fails() {
    let (_dir, store) = temp_store();
    store
        .save_slot(slot(5), &sample_save("init", 0))
        .expect("save");
    let slot_path = store.root().join("slots").join("slot_05.vnsav");
    fs::write(&slot_path, b"garbage").expect("corrupt primary");

    match store.load_slot(slot(5)) {
        Err(SaveStoreError::RecoveryFailed { backup: None, .. }) => {}
        other => panic!("expected recovery failure, got {other:?}"),
    }
}

#[test]
fn binary_rejects_tampering() {
    let save = sample_save("init", 3);
    let mut bytes = save.to_binary().expect("encode");
    assert_eq!(SaveData::from_binary(&bytes).expect("decode"), save);

    let last = bytes.len() - 1;
    bytes[last] ^= 0xff;
    assert_eq!(
        SaveData::from_binary(&bytes),
        Err(SaveError::ChecksumMismatch)
    );
    assert_eq!(SaveData::from_binary(b"SCSV"), Err(SaveError::TooSmall));
}

#[test]
fn preview_is_truncated() {
    let long = "가".repeat(200);
    let save = SaveData::new([0u8; 32], EngineState::new("init"), long);
    assert_eq!(save.preview.chars().count(), 96);
    assert!(save.preview.ends_with("..."));
}

#[test]
fn script_id_mismatch_is_detected() {
    let save = sample_save("init", 0);
    assert!(save.validate_script_id(&[1u8; 32]).is_ok());
    assert_eq!(
        save.validate_script_id(&[2u8; 32]),
        Err(SaveError::ScriptMismatch)
    );
}
