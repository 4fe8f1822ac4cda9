use super::*;
use crate::event::{CharacterImagesRaw, ChatStyle, MiniGameRaw};

fn single_step_script(step: StepRaw) -> ScriptRaw {
    let mut events = BTreeMap::new();
    events.insert(
        "init".to_string(),
        EventRaw {
            chapter_id: "chapter_1".to_string(),
            next_event_id: None,
            sequence: 1,
            steps: vec![step],
        },
    );
    ScriptRaw::new(events)
}

fn game(win: &str, lose: &str) -> MiniGameRaw {
    MiniGameRaw {
        id: "cards".to_string(),
        name: Some("Card Match".to_string()),
        win_event_id: win.to_string(),
        lose_event_id: lose.to_string(),
        win_score_deltas: Vec::new(),
        lose_score_deltas: Vec::new(),
    }
}

#[test]
fn compile_rejects_unknown_step_type() {
    let mut step = StepRaw::text("s0", "hello");
    step.kind = "hologram".to_string();
    let err = single_step_script(step)
        .compile()
        .expect_err("unknown type must fail");
    assert!(err.to_string().contains("unknown step type 'hologram'"));
}

#[test]
fn compile_rejects_minigame_without_config() {
    let mut step = StepRaw::text("s0", "play");
    step.kind = "minigame".to_string();
    let err = single_step_script(step)
        .compile()
        .expect_err("minigame without config must fail");
    assert!(err.to_string().contains("requires a 'mini_game' config"));
}

#[test]
fn compile_rejects_minigame_config_on_text_step() {
    let mut step = StepRaw::text("s0", "hello");
    step.mini_game = Some(game("win", "lose"));
    let err = single_step_script(step)
        .compile()
        .expect_err("stray minigame config must fail");
    assert!(err.to_string().contains("only allowed on minigame steps"));
}

#[test]
fn compile_rejects_choices_on_transition() {
    let mut step = StepRaw::text("s0", "init()");
    step.kind = "transition".to_string();
    step.choices = vec![ChoiceRaw {
        id: "c0".to_string(),
        text: "go".to_string(),
        target_event_id: None,
        score_deltas: Vec::new(),
    }];
    let err = single_step_script(step)
        .compile()
        .expect_err("transition choices must fail");
    assert!(err.to_string().contains("cannot offer choices"));
}

#[test]
fn compile_rejects_duplicate_choice_ids_and_empty_score_targets() {
    let choice = ChoiceRaw {
        id: "c0".to_string(),
        text: "go".to_string(),
        target_event_id: None,
        score_deltas: Vec::new(),
    };
    let mut step = StepRaw::text("s0", "pick");
    step.choices = vec![choice.clone(), choice.clone()];
    let err = single_step_script(step)
        .compile()
        .expect_err("duplicate choice ids must fail");
    assert!(err.to_string().contains("duplicate choice id 'c0'"));

    let mut step = StepRaw::text("s0", "pick");
    step.choices = vec![ChoiceRaw {
        score_deltas: vec![ScoreDeltaRaw {
            character_id: " ".to_string(),
            delta: 3,
        }],
        ..choice
    }];
    let err = single_step_script(step)
        .compile()
        .expect_err("malformed score list must fail");
    assert!(err.to_string().contains("empty character id"));
}

#[test]
fn compile_resolves_all_shorthand_over_positions() {
    let mut step = StepRaw::text("s0", "hello");
    step.character_images = Some(CharacterImagesRaw {
        first: Some("a.png".to_string()),
        second: None,
        third: Some("c.png".to_string()),
        all: Some("nobody".to_string()),
    });
    let compiled = single_step_script(step).compile().expect("compile");
    let step = compiled.step("init", 0).expect("step");
    for slot in &step.channels.characters {
        assert_eq!(slot.as_deref(), Some("nobody"));
    }
}

#[test]
fn compile_treats_empty_strings_as_missing() {
    let mut step = StepRaw::text("s0", "hello");
    step.background_image_id = Some(String::new());
    step.speaker_id = Some("  ".to_string());
    let mut script = single_step_script(step);
    if let Some(event) = script.events.get_mut("init") {
        event.next_event_id = Some(String::new());
    }
    let compiled = script.compile().expect("compile");
    let event = compiled.get_event("init").expect("event");
    assert!(event.next_event_id.is_none());
    assert!(event.steps[0].channels.background_image.is_none());
    assert!(event.steps[0].speaker_id.is_none());
}

#[test]
fn from_json_accepts_authoring_aliases() {
    let json = r#"{
        "events": {
            "chapter1_scene1": {
                "chapter_id": "chapter_1",
                "next_scene_id": "chapter1_scene2",
                "event": 1,
                "scenario": [
                    {"id": "a", "index": 0, "script": "init()", "type": "전환",
                     "character_image_id": {"all": "nobody"}},
                    {"id": "b", "index": 1, "script": "Hi", "type": "카톡",
                     "character_id": "jisoo", "where": "dorm", "when": "night"},
                    {"id": "c", "index": 2, "script": "Pick", "type": "think",
                     "options": [{"id": "o1", "text": "Yes", "nextSceneId": "x",
                                  "score_list": [{"id": "s", "character_id": "jisoo", "score": 5}]}]},
                    {"id": "d", "index": 3, "script": "Play", "type": "game",
                     "game": {"game_id": "cards", "win_scene_id": "w", "lose_scene_id": "l",
                              "win_score_list": [{"character_id": "jisoo", "score": 2}]}}
                ]
            }
        }
    }"#;
    let script = ScriptRaw::from_json(json).expect("aliases should parse");
    let compiled = script.compile().expect("compile");
    let event = compiled.get_event("chapter1_scene1").expect("event");
    assert_eq!(event.next_event_id.as_deref(), Some("chapter1_scene2"));
    assert_eq!(event.sequence, 1);
    assert_eq!(event.steps[0].kind, StepKind::Transition);
    assert_eq!(event.steps[1].kind, StepKind::Chat(ChatStyle::Message));
    assert_eq!(event.steps[1].location.as_deref(), Some("dorm"));
    assert_eq!(event.steps[2].kind, StepKind::Thought);
    let choice = event.steps[2].choice("o1").expect("choice");
    assert_eq!(choice.target_event_id.as_deref(), Some("x"));
    assert_eq!(choice.score_deltas[0].delta, 5);
    let game = event.steps[3].mini_game().expect("minigame");
    assert_eq!(game.win_event_id.as_ref(), "w");
    assert_eq!(game.win_score_deltas[0].character_id.as_ref(), "jisoo");
}

#[test]
fn schema_versions_compare_numerically() {
    assert!(schema_compatible("1.0"));
    assert!(schema_compatible(" 1.0 "));
    assert!(!schema_compatible("1"));
    assert!(!schema_compatible("1.-1"));
    assert!(!schema_compatible("1.10"));
    assert!(!schema_compatible("1.x"));
    assert!(!schema_compatible("0.9"));
    assert!(!schema_compatible("2.0"));
    assert_eq!(parse_schema_version("3.12"), Some((3, 12)));

    let json = r#"{"script_schema_version": "1", "events": {}}"#;
    assert!(matches!(
        ScriptRaw::from_json(json),
        Err(VnError::InvalidScript(_))
    ));
}
