use serde::{Deserialize, Serialize};

/// Upper bounds applied to authored content before it is compiled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceLimiter {
    pub max_events: usize,
    pub max_steps_per_event: usize,
    pub max_text_length: usize,
    pub max_id_length: usize,
    pub max_asset_length: usize,
    pub max_choices: usize,
    pub max_script_bytes: usize,
}

impl Default for ResourceLimiter {
    fn default() -> Self {
        Self {
            max_events: 10_000,
            max_steps_per_event: 2_000,
            max_text_length: 4_096,
            max_id_length: 128,
            max_asset_length: 256,
            max_choices: 8,
            max_script_bytes: 8 * 1024 * 1024,
        }
    }
}

/// Counts the string bytes a value contributes to the script budget.
pub(crate) trait StringBudget {
    fn string_bytes(&self) -> usize;
}

impl StringBudget for str {
    fn string_bytes(&self) -> usize {
        self.len()
    }
}

impl StringBudget for String {
    fn string_bytes(&self) -> usize {
        self.len()
    }
}

impl<T: StringBudget> StringBudget for Option<T> {
    fn string_bytes(&self) -> usize {
        self.as_ref().map(StringBudget::string_bytes).unwrap_or(0)
    }
}

impl<T: StringBudget> StringBudget for Vec<T> {
    fn string_bytes(&self) -> usize {
        self.iter()
            .fold(0usize, |total, item| total.saturating_add(item.string_bytes()))
    }
}

impl StringBudget for crate::event::ScoreDeltaRaw {
    fn string_bytes(&self) -> usize {
        self.character_id.len()
    }
}

impl StringBudget for crate::event::ChoiceRaw {
    fn string_bytes(&self) -> usize {
        self.id
            .len()
            .saturating_add(self.text.len())
            .saturating_add(self.target_event_id.string_bytes())
            .saturating_add(self.score_deltas.string_bytes())
    }
}

impl StringBudget for crate::event::MiniGameRaw {
    fn string_bytes(&self) -> usize {
        self.id
            .len()
            .saturating_add(self.name.string_bytes())
            .saturating_add(self.win_event_id.len())
            .saturating_add(self.lose_event_id.len())
            .saturating_add(self.win_score_deltas.string_bytes())
            .saturating_add(self.lose_score_deltas.string_bytes())
    }
}

impl StringBudget for crate::event::CharacterImagesRaw {
    fn string_bytes(&self) -> usize {
        [&self.first, &self.second, &self.third, &self.all]
            .into_iter()
            .fold(0usize, |total, value| total.saturating_add(value.string_bytes()))
    }
}

impl StringBudget for crate::event::StepRaw {
    fn string_bytes(&self) -> usize {
        [
            self.id.string_bytes(),
            self.text.string_bytes(),
            self.speaker_id.string_bytes(),
            self.location.string_bytes(),
            self.time.string_bytes(),
            self.character_images.string_bytes(),
            self.background_image_id.string_bytes(),
            self.background_sound_id.string_bytes(),
            self.effect_sound_id.string_bytes(),
            self.kind.string_bytes(),
            self.choices.string_bytes(),
            self.overlay_image_id.string_bytes(),
            self.mini_game.string_bytes(),
        ]
        .into_iter()
        .fold(0usize, usize::saturating_add)
    }
}

impl StringBudget for crate::event::EventRaw {
    fn string_bytes(&self) -> usize {
        self.chapter_id
            .len()
            .saturating_add(self.next_event_id.string_bytes())
            .saturating_add(self.steps.string_bytes())
    }
}
