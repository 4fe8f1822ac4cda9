//! Event (scene) definitions for raw and compiled scripts.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub mod choice;
pub mod minigame;
pub mod scene;
pub mod step;

pub use choice::{ChoiceCompiled, ChoiceRaw, ScoreDelta, ScoreDeltaRaw};
pub use minigame::{MiniGameCompiled, MiniGameOutcome, MiniGameRaw};
pub use scene::{ChannelPatch, CharacterImagesRaw, CHARACTER_POSITIONS};
pub use step::{ChatStyle, StepCompiled, StepKind, StepRaw};

/// Shared string storage used by compiled events.
pub type SharedStr = Arc<str>;

/// JSON-facing event: one authored scene with its ordered steps.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EventRaw {
    #[serde(default)]
    pub chapter_id: String,
    #[serde(
        default,
        alias = "next_scene_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub next_event_id: Option<String>,
    #[serde(default, alias = "event")]
    pub sequence: u32,
    #[serde(alias = "scenario")]
    pub steps: Vec<StepRaw>,
}

/// Runtime event with validated steps and interned strings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCompiled {
    pub id: SharedStr,
    pub chapter_id: SharedStr,
    pub next_event_id: Option<SharedStr>,
    pub sequence: u32,
    pub steps: Vec<StepCompiled>,
}

impl EventCompiled {
    pub fn step(&self, index: usize) -> Option<&StepCompiled> {
        self.steps.get(index)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Every event id this event can route to: successor, choice targets and
    /// minigame outcomes.
    pub fn outgoing_targets(&self) -> impl Iterator<Item = &SharedStr> + '_ {
        let steps = self.steps.iter().flat_map(|step| {
            let choices = step
                .choices
                .iter()
                .filter_map(|choice| choice.target_event_id.as_ref());
            let games = step
                .mini_game()
                .into_iter()
                .flat_map(|game| [&game.win_event_id, &game.lose_event_id]);
            choices.chain(games)
        });
        self.next_event_id.iter().chain(steps)
    }
}
