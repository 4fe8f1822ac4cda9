use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{
    ChannelPatch, CharacterImagesRaw, ChoiceCompiled, ChoiceRaw, MiniGameCompiled, MiniGameRaw,
    SharedStr,
};

/// Authored beat in raw form, exactly as it appears in script JSON.
///
/// `kind` stays a plain string here; the compiler turns it into [`StepKind`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StepRaw {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
    #[serde(default, alias = "script")]
    pub text: String,
    #[serde(default, alias = "character_id", skip_serializing_if = "Option::is_none")]
    pub speaker_id: Option<String>,
    #[serde(default, alias = "where", skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, alias = "when", skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(
        default,
        alias = "character_image_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub character_images: Option<CharacterImagesRaw>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_image_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_sound_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect_sound_id: Option<String>,
    #[serde(rename = "type", default = "default_step_type")]
    pub kind: String,
    #[serde(default, alias = "options", skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<ChoiceRaw>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlay_image_id: Option<String>,
    #[serde(default, alias = "game", skip_serializing_if = "Option::is_none")]
    pub mini_game: Option<MiniGameRaw>,
}

fn default_step_type() -> String {
    "text".to_string()
}

impl StepRaw {
    /// Creates a plain text step with no channel overrides.
    pub fn text(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            index: None,
            text: text.into(),
            speaker_id: None,
            location: None,
            time: None,
            character_images: None,
            background_image_id: None,
            background_sound_id: None,
            effect_sound_id: None,
            kind: default_step_type(),
            choices: Vec::new(),
            overlay_image_id: None,
            mini_game: None,
        }
    }
}

/// Presentation of a messenger-style chat line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatStyle {
    Message,
    DrawStart,
    DrawLeft,
    DrawRight,
}

/// How a step is displayed and whether it blocks the advance operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepKind {
    Text,
    Narration,
    Thought,
    System,
    Chat(ChatStyle),
    NameInput,
    Transition,
    MiniGame(MiniGameCompiled),
}

impl StepKind {
    /// Maps an authored `type` string to a step kind.
    ///
    /// The minigame config is accepted only by the minigame kind.
    pub fn parse(name: &str, mini_game: Option<MiniGameCompiled>) -> Result<Self, String> {
        let kind = match name {
            "text" => StepKind::Text,
            "narration" => StepKind::Narration,
            "thought" | "think" => StepKind::Thought,
            "system" | "시스템" => StepKind::System,
            "chat" | "카톡" => StepKind::Chat(ChatStyle::Message),
            "chat_draw_start" | "카톡_뽑기_시작" => StepKind::Chat(ChatStyle::DrawStart),
            "chat_draw_left" | "카톡_뽑기_좌" => StepKind::Chat(ChatStyle::DrawLeft),
            "chat_draw_right" | "카톡_뽑기_우" => StepKind::Chat(ChatStyle::DrawRight),
            "name_input" | "input" => StepKind::NameInput,
            "transition" | "전환" => StepKind::Transition,
            "minigame" | "game" => {
                return mini_game
                    .map(StepKind::MiniGame)
                    .ok_or_else(|| "minigame step requires a 'mini_game' config".to_string());
            }
            other => return Err(format!("unknown step type '{other}'")),
        };
        if mini_game.is_some() {
            return Err(format!(
                "'mini_game' config is only allowed on minigame steps, found '{name}'"
            ));
        }
        Ok(kind)
    }

    /// Canonical snake_case name of the kind.
    pub fn label(&self) -> &'static str {
        match self {
            StepKind::Text => "text",
            StepKind::Narration => "narration",
            StepKind::Thought => "thought",
            StepKind::System => "system",
            StepKind::Chat(ChatStyle::Message) => "chat",
            StepKind::Chat(ChatStyle::DrawStart) => "chat_draw_start",
            StepKind::Chat(ChatStyle::DrawLeft) => "chat_draw_left",
            StepKind::Chat(ChatStyle::DrawRight) => "chat_draw_right",
            StepKind::NameInput => "name_input",
            StepKind::Transition => "transition",
            StepKind::MiniGame(_) => "minigame",
        }
    }

    pub fn is_chat(&self) -> bool {
        matches!(self, StepKind::Chat(_))
    }

    /// Whether steps of this kind may offer choices.
    pub fn allows_choices(&self) -> bool {
        !matches!(
            self,
            StepKind::MiniGame(_) | StepKind::NameInput | StepKind::Transition
        )
    }
}

/// Validated step with interned strings and a typed kind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepCompiled {
    pub id: SharedStr,
    pub index: u32,
    pub text: SharedStr,
    pub speaker_id: Option<SharedStr>,
    pub location: Option<SharedStr>,
    pub time: Option<SharedStr>,
    pub channels: ChannelPatch,
    pub effect_sound: Option<SharedStr>,
    pub overlay_image: Option<SharedStr>,
    pub kind: StepKind,
    pub choices: Vec<ChoiceCompiled>,
}

impl StepCompiled {
    pub fn choice(&self, choice_id: &str) -> Option<&ChoiceCompiled> {
        self.choices
            .iter()
            .find(|choice| choice.id.as_ref() == choice_id)
    }

    pub fn mini_game(&self) -> Option<&MiniGameCompiled> {
        match &self.kind {
            StepKind::MiniGame(game) => Some(game),
            _ => None,
        }
    }
}
