#![allow(dead_code)]

use scenario_engine::{Engine, EngineConfig, ScriptRaw};

/// Two chapters of a campus route: naming, chat, a scored choice and a minigame.
pub const CAMPUS_SCRIPT: &str = r#"{
    "script_schema_version": "1.0",
    "events": {
        "init": {
            "chapter_id": "chapter_1",
            "next_event_id": "dorm",
            "sequence": 1,
            "steps": [
                {"id": "intro", "text": "봄이 왔다.", "type": "narration",
                 "background_image_id": "campus", "background_sound_id": "spring",
                 "character_images": {"1": "jisoo_smile"}},
                {"id": "name", "text": "이름을 입력하세요.", "type": "name_input"},
                {"id": "greet", "text": "안녕, 도훈아!", "speaker_id": "jisoo",
                 "character_images": {"2": "minji_wave"}},
                {"id": "reply", "text": "반가워.", "speaker_id": "character_hero"}
            ]
        },
        "dorm": {
            "chapter_id": "chapter_1",
            "next_event_id": "arcade",
            "sequence": 2,
            "steps": [
                {"id": "chat1", "text": "뭐해?", "type": "chat", "speaker_id": "jisoo"},
                {"id": "chat2", "text": "과제 중", "type": "chat", "speaker_id": "character_hero"},
                {"id": "pick", "text": "어디로 갈까?", "type": "thought", "choices": [
                    {"id": "library", "text": "도서관", "target_event_id": "library",
                     "score_deltas": [{"character_id": "jisoo", "delta": 5}]},
                    {"id": "stay", "text": "그냥 있자",
                     "score_deltas": [{"character_id": "jisoo", "delta": -20}]}
                ]},
                {"id": "after", "text": "조용한 밤이다.", "type": "narration"}
            ]
        },
        "library": {
            "chapter_id": "chapter_1",
            "next_event_id": "arcade",
            "steps": [
                {"id": "books", "text": "책 냄새.", "background_image_id": "library.png"}
            ]
        },
        "arcade": {
            "chapter_id": "chapter_2",
            "steps": [
                {"id": "play", "text": "한 판 할래?", "type": "minigame",
                 "mini_game": {"id": "cards", "name": "Card Match",
                               "win_event_id": "win", "lose_event_id": "lose",
                               "win_score_deltas": [{"character_id": "jisoo", "delta": 10}],
                               "lose_score_deltas": [{"character_id": "jisoo", "delta": -10}]}}
            ]
        },
        "win": {
            "chapter_id": "chapter_2",
            "steps": [{"id": "yay", "text": "이겼다!", "type": "system"}]
        },
        "lose": {
            "chapter_id": "chapter_2",
            "next_event_id": "missing_event",
            "steps": [{"id": "boo", "text": "졌다...", "type": "system"}]
        }
    }
}"#;

pub fn campus_script() -> ScriptRaw {
    ScriptRaw::from_json(CAMPUS_SCRIPT).expect("campus script should parse")
}

pub fn campus_engine() -> Engine {
    Engine::new(campus_script(), EngineConfig::default()).expect("campus engine")
}

/// Engine positioned on the `dorm/pick` choice step with the hero named.
pub fn engine_at_choice() -> Engine {
    let mut engine = campus_engine();
    engine.advance();
    engine.commit_name("김민수").expect("name input");
    for _ in 0..5 {
        engine.advance();
    }
    assert_eq!(
        engine.current_step().map(|step| step.id.as_ref()),
        Some("pick")
    );
    engine
}

pub fn event_and_index(engine: &Engine) -> (String, u32) {
    let cursor = &engine.state().cursor;
    (cursor.event_id.clone(), cursor.step_index)
}
