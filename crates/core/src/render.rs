//! Render-ready projection of the current step.

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::event::{EventCompiled, StepCompiled, StepKind, CHARACTER_POSITIONS};
use crate::state::{ChatLine, EngineState};

/// Everything a UI needs to draw the current step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepView {
    pub event_id: String,
    pub chapter_id: String,
    pub step_id: String,
    pub step_index: u32,
    pub kind: String,
    pub speaker: Option<String>,
    pub text: String,
    pub location: Option<String>,
    pub time: Option<String>,
    /// Resolved background image path.
    pub background: Option<String>,
    /// Resolved portrait path per screen position.
    pub characters: [Option<String>; CHARACTER_POSITIONS],
    pub background_sound: Option<String>,
    pub effect_sound: Option<String>,
    pub overlay: Option<String>,
    pub choices: Vec<ChoiceView>,
    pub minigame: Option<MiniGameView>,
    pub chat_log: Vec<ChatLine>,
    pub input: InputMode,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceView {
    pub id: String,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiniGameView {
    pub id: String,
    pub name: Option<String>,
    pub best_score: Option<u32>,
}

/// What the UI should wait for before calling back into the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    /// Advance on click.
    Click,
    /// Advance without user input.
    AutoAdvance,
    /// Pick one of the offered choices.
    Choice,
    /// Submit a name, then advance.
    NameEntry,
    /// Run the minigame and report its outcome.
    MiniGame,
}

impl InputMode {
    pub fn for_step(step: &StepCompiled) -> Self {
        match &step.kind {
            StepKind::MiniGame(_) => InputMode::MiniGame,
            StepKind::NameInput => InputMode::NameEntry,
            StepKind::Transition => InputMode::AutoAdvance,
            _ if !step.choices.is_empty() => InputMode::Choice,
            _ => InputMode::Click,
        }
    }
}

/// Name currently used for the hero: the committed one, else the default.
pub fn hero_name<'a>(state: &'a EngineState, config: &'a EngineConfig) -> &'a str {
    state
        .display_name
        .as_deref()
        .unwrap_or(config.hero.default_name.as_str())
}

/// Display form of a speaker id.
pub fn display_speaker(
    speaker_id: Option<&str>,
    state: &EngineState,
    config: &EngineConfig,
) -> Option<String> {
    let speaker = speaker_id?;
    if speaker == config.hero.character_id {
        Some(hero_name(state, config).to_string())
    } else {
        Some(config.hero.substitute(speaker, hero_name(state, config)))
    }
}

/// Step text with hero name tokens substituted.
pub fn display_text(text: &str, state: &EngineState, config: &EngineConfig) -> String {
    config.hero.substitute(text, hero_name(state, config))
}

impl StepView {
    pub fn project(
        event: &EventCompiled,
        step: &StepCompiled,
        state: &EngineState,
        config: &EngineConfig,
    ) -> Self {
        let assets = &config.assets;
        let owned = |value: &Option<crate::event::SharedStr>| value.as_deref().map(str::to_string);
        let characters = state
            .carried
            .characters
            .clone()
            .map(|portrait| portrait.and_then(|id| assets.character(&id)));
        Self {
            event_id: event.id.to_string(),
            chapter_id: event.chapter_id.to_string(),
            step_id: step.id.to_string(),
            step_index: state.cursor.step_index,
            kind: step.kind.label().to_string(),
            speaker: display_speaker(step.speaker_id.as_deref(), state, config),
            text: display_text(&step.text, state, config),
            location: owned(&step.location),
            time: owned(&step.time),
            background: state
                .carried
                .background_image
                .as_deref()
                .map(|id| assets.background(id)),
            characters,
            background_sound: owned(&state.carried.background_sound),
            effect_sound: owned(&step.effect_sound),
            overlay: owned(&step.overlay_image),
            choices: step
                .choices
                .iter()
                .map(|choice| ChoiceView {
                    id: choice.id.to_string(),
                    text: display_text(&choice.text, state, config),
                })
                .collect(),
            minigame: step.mini_game().map(|game| MiniGameView {
                id: game.id.to_string(),
                name: owned(&game.name),
                best_score: state.minigame_scores.get(game.id.as_ref()).copied(),
            }),
            chat_log: state.chat_log.iter().cloned().collect(),
            input: InputMode::for_step(step),
        }
    }
}

/// Renderer interface used by the engine.
pub trait RenderBackend {
    fn render(&self, view: &StepView) -> RenderOutput;
}

/// Rendered text output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderOutput {
    pub text: String,
}

/// Simple renderer that formats steps as text.
#[derive(Clone, Debug, Default)]
pub struct TextRenderer;

impl TextRenderer {
    fn render_scene(&self, view: &StepView) -> Option<String> {
        let mut parts = Vec::new();
        if let Some(background) = &view.background {
            parts.push(format!("Background: {background}"));
        }
        if let Some(sound) = &view.background_sound {
            parts.push(format!("Music: {sound}"));
        }
        let roster = view
            .characters
            .iter()
            .enumerate()
            .filter_map(|(idx, portrait)| {
                portrait
                    .as_ref()
                    .map(|portrait| format!("{}={portrait}", idx + 1))
            })
            .collect::<Vec<_>>();
        if !roster.is_empty() {
            parts.push(format!("Characters: {}", roster.join(", ")));
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" | "))
        }
    }
}

impl RenderBackend for TextRenderer {
    fn render(&self, view: &StepView) -> RenderOutput {
        let mut lines = Vec::new();
        if let Some(scene) = self.render_scene(view) {
            lines.push(format!("[{scene}]"));
        }
        match (&view.location, &view.time) {
            (Some(location), Some(time)) => lines.push(format!("@ {location}, {time}")),
            (Some(place), None) | (None, Some(place)) => lines.push(format!("@ {place}")),
            (None, None) => {}
        }
        let body = match (view.kind.as_str(), &view.speaker) {
            ("thought", _) => format!("({})", view.text),
            ("narration" | "system", _) | (_, None) => view.text.clone(),
            (_, Some(speaker)) if view.kind.starts_with("chat") => {
                format!("[chat] {speaker}: {}", view.text)
            }
            (_, Some(speaker)) => format!("{speaker}: {}", view.text),
        };
        lines.push(body);
        for (idx, choice) in view.choices.iter().enumerate() {
            lines.push(format!("{}. {}", idx + 1, choice.text));
        }
        match view.input {
            InputMode::NameEntry => lines.push("> enter a name".to_string()),
            InputMode::MiniGame => {
                if let Some(game) = &view.minigame {
                    let name = game.name.as_deref().unwrap_or(game.id.as_str());
                    lines.push(format!("> minigame: {name}"));
                }
            }
            _ => {}
        }
        RenderOutput {
            text: lines.join("\n"),
        }
    }
}
