//! Content policy validation for authored scripts.

use crate::error::{VnError, VnResult};
use crate::event::{ChoiceRaw, MiniGameRaw, ScoreDeltaRaw, StepRaw};
use crate::resource::ResourceLimiter;
use crate::script::ScriptRaw;

/// Policy applied to raw scripts before they are compiled.
#[derive(Clone, Debug, Default)]
pub struct ContentPolicy {
    /// Accept choices with empty labels.
    pub allow_empty_choice_text: bool,
    /// Accept scripts without any event.
    pub allow_empty_script: bool,
}

impl ContentPolicy {
    /// Validates a raw script against policy and resource limits.
    pub fn validate_raw(&self, script: &ScriptRaw, limits: ResourceLimiter) -> VnResult<()> {
        if script.events.len() > limits.max_events {
            return Err(VnError::ResourceLimit("event count".to_string()));
        }
        if script.events.is_empty() && !self.allow_empty_script {
            return Err(VnError::ContentPolicy("script has no events".to_string()));
        }

        for (event_id, event) in &script.events {
            validate_id(event_id, "event id", limits)?;
            if event.steps.len() > limits.max_steps_per_event {
                return Err(VnError::ResourceLimit(format!(
                    "step count in event '{event_id}'"
                )));
            }
            validate_id(&event.chapter_id, "chapter id", limits)?;
            if let Some(next) = &event.next_event_id {
                validate_id(next, "next event id", limits)?;
            }
            for step in &event.steps {
                self.validate_step(step, limits).map_err(|err| match err {
                    VnError::ResourceLimit(what) => VnError::ResourceLimit(format!(
                        "{what} in event '{event_id}', step '{}'",
                        step.id
                    )),
                    VnError::ContentPolicy(what) => VnError::ContentPolicy(format!(
                        "{what} in event '{event_id}', step '{}'",
                        step.id
                    )),
                    other => other,
                })?;
            }
        }
        Ok(())
    }

    fn validate_step(&self, step: &StepRaw, limits: ResourceLimiter) -> VnResult<()> {
        validate_id(&step.id, "step id", limits)?;
        validate_text(&step.text, "step text", limits)?;
        for (value, name) in [
            (&step.speaker_id, "speaker id"),
            (&step.location, "location"),
            (&step.time, "time"),
        ] {
            if let Some(value) = value {
                validate_id(value, name, limits)?;
            }
        }
        for (value, name) in [
            (&step.background_image_id, "background image"),
            (&step.background_sound_id, "background sound"),
            (&step.effect_sound_id, "effect sound"),
            (&step.overlay_image_id, "overlay image"),
        ] {
            if let Some(value) = value {
                validate_path(value, name, limits)?;
            }
        }
        if let Some(images) = &step.character_images {
            for image in [&images.first, &images.second, &images.third, &images.all]
                .into_iter()
                .flatten()
            {
                validate_path(image, "character image", limits)?;
            }
        }
        if step.choices.len() > limits.max_choices {
            return Err(VnError::ResourceLimit("choice count".to_string()));
        }
        for choice in &step.choices {
            self.validate_choice(choice, limits)?;
        }
        if let Some(game) = &step.mini_game {
            validate_mini_game(game, limits)?;
        }
        Ok(())
    }

    fn validate_choice(&self, choice: &ChoiceRaw, limits: ResourceLimiter) -> VnResult<()> {
        validate_id(&choice.id, "choice id", limits)?;
        validate_text(&choice.text, "choice text", limits)?;
        if !self.allow_empty_choice_text && choice.text.trim().is_empty() {
            return Err(VnError::ContentPolicy(format!(
                "choice '{}' has no text",
                choice.id
            )));
        }
        if let Some(target) = &choice.target_event_id {
            validate_id(target, "choice target", limits)?;
        }
        validate_scores(&choice.score_deltas, limits)
    }
}

fn validate_mini_game(game: &MiniGameRaw, limits: ResourceLimiter) -> VnResult<()> {
    validate_id(&game.id, "minigame id", limits)?;
    if let Some(name) = &game.name {
        validate_text(name, "minigame name", limits)?;
    }
    validate_id(&game.win_event_id, "minigame win event", limits)?;
    validate_id(&game.lose_event_id, "minigame lose event", limits)?;
    validate_scores(&game.win_score_deltas, limits)?;
    validate_scores(&game.lose_score_deltas, limits)
}

fn validate_scores(scores: &[ScoreDeltaRaw], limits: ResourceLimiter) -> VnResult<()> {
    for score in scores {
        validate_id(&score.character_id, "score character id", limits)?;
    }
    Ok(())
}

fn validate_id(value: &str, name: &str, limits: ResourceLimiter) -> VnResult<()> {
    if value.len() > limits.max_id_length {
        Err(VnError::ResourceLimit(name.to_string()))
    } else {
        Ok(())
    }
}

fn validate_text(value: &str, name: &str, limits: ResourceLimiter) -> VnResult<()> {
    if value.len() > limits.max_text_length {
        Err(VnError::ResourceLimit(name.to_string()))
    } else {
        Ok(())
    }
}

fn validate_path(value: &str, name: &str, limits: ResourceLimiter) -> VnResult<()> {
    if value.len() > limits.max_asset_length {
        Err(VnError::ResourceLimit(name.to_string()))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::event::EventRaw;

    fn script_with(step: StepRaw) -> ScriptRaw {
        let mut events = BTreeMap::new();
        events.insert(
            "init".to_string(),
            EventRaw {
                steps: vec![step],
                ..EventRaw::default()
            },
        );
        ScriptRaw::new(events)
    }

    #[test]
    fn rejects_long_text() {
        let limits = ResourceLimiter {
            max_text_length: 4,
            ..ResourceLimiter::default()
        };
        let script = script_with(StepRaw::text("s0", "too long"));
        let err = ContentPolicy::default()
            .validate_raw(&script, limits)
            .expect_err("text over limit");
        assert!(matches!(err, VnError::ResourceLimit(message) if message.contains("step text")));
    }

    #[test]
    fn rejects_too_many_choices() {
        let limits = ResourceLimiter {
            max_choices: 1,
            ..ResourceLimiter::default()
        };
        let mut step = StepRaw::text("s0", "pick");
        step.choices = (0..2)
            .map(|idx| ChoiceRaw {
                id: format!("c{idx}"),
                text: "go".to_string(),
                target_event_id: None,
                score_deltas: Vec::new(),
            })
            .collect();
        let err = ContentPolicy::default()
            .validate_raw(&script_with(step), limits)
            .expect_err("choice count over limit");
        assert!(matches!(err, VnError::ResourceLimit(_)));
    }

    #[test]
    fn empty_choice_text_is_a_policy_switch() {
        let mut step = StepRaw::text("s0", "pick");
        step.choices = vec![ChoiceRaw {
            id: "c0".to_string(),
            text: " ".to_string(),
            target_event_id: None,
            score_deltas: Vec::new(),
        }];
        let script = script_with(step);
        let strict = ContentPolicy::default();
        assert!(matches!(
            strict.validate_raw(&script, ResourceLimiter::default()),
            Err(VnError::ContentPolicy(_))
        ));
        let lenient = ContentPolicy {
            allow_empty_choice_text: true,
            ..ContentPolicy::default()
        };
        assert!(lenient
            .validate_raw(&script, ResourceLimiter::default())
            .is_ok());
    }

    #[test]
    fn empty_script_is_rejected_by_default() {
        let script = ScriptRaw::default();
        assert!(ContentPolicy::default()
            .validate_raw(&script, ResourceLimiter::default())
            .is_err());
    }
}
