//! Runtime engine that plays a compiled scenario.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{VnError, VnResult};
use crate::event::{MiniGameOutcome, ScoreDelta, StepCompiled, StepKind};
use crate::policy::ContentPolicy;
use crate::render::{self, RenderBackend, RenderOutput, StepView};
use crate::script::{ScriptCompiled, ScriptRaw};
use crate::state::{AffectionMap, ChatLine, Cursor, EngineState};
use crate::storage::{compute_script_id, ScriptId};
use crate::visual::CarriedChannels;

/// Result of a call to [`Engine::advance`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Advance {
    /// Moved to the next step of the same event.
    Moved,
    /// Entered the first step of another event.
    EnteredEvent(String),
    /// The current step waits for a specific input.
    Blocked(BlockReason),
    /// Nothing left to play.
    EndOfContent,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    MiniGame,
    NameInput,
}

/// Affection value after an update, queued for remote sync.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffectionChange {
    pub character_id: String,
    pub value: i32,
}

/// New best score for a minigame, queued for remote sync.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiniGameScore {
    pub game_id: String,
    pub best: u32,
}

/// Playback engine: one script, one mutable state, single writer.
#[derive(Clone, Debug)]
pub struct Engine {
    script: ScriptCompiled,
    script_id: ScriptId,
    state: EngineState,
    config: EngineConfig,
    name_committed: bool,
    /// Latest unsynced value per character.
    affection_outbox: BTreeMap<String, i32>,
    /// Latest unsynced best score per minigame.
    score_outbox: BTreeMap<String, u32>,
}

impl Engine {
    /// Builds an engine by validating and compiling a raw script.
    pub fn new(script: ScriptRaw, config: EngineConfig) -> VnResult<Self> {
        ContentPolicy::default().validate_raw(&script, config.limits)?;
        let script = script.compile()?;
        Self::from_compiled(script, config)
    }

    /// Builds an engine from an already compiled script.
    pub fn from_compiled(script: ScriptCompiled, config: EngineConfig) -> VnResult<Self> {
        if !script.contains_event(&config.start_event) {
            return Err(VnError::UnknownEvent(config.start_event.clone()));
        }
        let script_id = compute_script_id(&script.to_binary()?);
        let state = EngineState::new(config.start_event.as_str());
        let mut engine = Self {
            script,
            script_id,
            state,
            config,
            name_committed: false,
            affection_outbox: BTreeMap::new(),
            score_outbox: BTreeMap::new(),
        };
        engine.enter_step();
        info!(start = %engine.config.start_event, "engine ready");
        Ok(engine)
    }

    pub fn script(&self) -> &ScriptCompiled {
        &self.script
    }

    /// SHA-256 of the compiled script, stored in saves.
    pub fn script_id(&self) -> &ScriptId {
        &self.script_id
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn affection(&self) -> &AffectionMap {
        &self.state.affection
    }

    pub fn is_finished(&self) -> bool {
        self.state.finished
    }

    /// Returns the step under the cursor, if any.
    pub fn current_step(&self) -> Option<&StepCompiled> {
        if self.state.finished {
            return None;
        }
        let cursor = &self.state.cursor;
        self.script
            .step(&cursor.event_id, cursor.step_index as usize)
    }

    /// Projects the current step for rendering.
    pub fn view(&self) -> Option<StepView> {
        if self.state.finished {
            return None;
        }
        let event = self.script.get_event(&self.state.cursor.event_id)?;
        let step = event.step(self.state.cursor.step_index as usize)?;
        Some(StepView::project(event, step, &self.state, &self.config))
    }

    /// Renders the current step using the provided renderer.
    pub fn render_current<R: RenderBackend>(&self, renderer: &R) -> Option<RenderOutput> {
        self.view().map(|view| renderer.render(&view))
    }

    /// Moves to the next step, or to the successor event once the current
    /// event is exhausted.
    pub fn advance(&mut self) -> Advance {
        if self.state.finished {
            return Advance::EndOfContent;
        }
        let cursor = &self.state.cursor;
        let Some(event) = self.script.get_event(&cursor.event_id) else {
            let missing = cursor.event_id.clone();
            return self.halt_on_missing(&missing);
        };
        if let Some(step) = event.step(cursor.step_index as usize) {
            match step.kind {
                StepKind::MiniGame(_) => {
                    debug!(step = %step.id, "advance ignored on minigame step");
                    return Advance::Blocked(BlockReason::MiniGame);
                }
                StepKind::NameInput if !self.name_committed => {
                    debug!(step = %step.id, "advance blocked until a name is committed");
                    return Advance::Blocked(BlockReason::NameInput);
                }
                _ => {}
            }
        }

        let next_index = cursor.step_index.saturating_add(1);
        if (next_index as usize) < event.len() {
            self.state.cursor.step_index = next_index;
            self.enter_step();
            return Advance::Moved;
        }
        match event.next_event_id.clone() {
            Some(next) => self.enter_event(&next),
            None => {
                info!(event = %event.id, "reached the end of the scenario");
                self.state.finished = true;
                Advance::EndOfContent
            }
        }
    }

    /// Moves the cursor to the first step of `event_id`.
    ///
    /// Unknown ids are rejected and leave the state untouched.
    pub fn jump_to(&mut self, event_id: &str) -> VnResult<()> {
        if !self.script.contains_event(event_id) {
            warn!(event = event_id, "jump to unknown event rejected");
            return Err(VnError::UnknownEvent(event_id.to_string()));
        }
        self.enter_event(event_id);
        Ok(())
    }

    /// Applies a choice's score deltas, then follows its target, or advances
    /// when it has none.
    pub fn select_choice(&mut self, choice_id: &str) -> VnResult<Advance> {
        let step = self.current_step().ok_or(VnError::EndOfContent)?;
        let Some(choice) = step.choice(choice_id) else {
            warn!(step = %step.id, choice = choice_id, "unknown choice selected");
            return Err(VnError::InvalidChoice(choice_id.to_string()));
        };
        let deltas = choice.score_deltas.clone();
        let target = choice.target_event_id.clone();
        debug!(choice = choice_id, target = ?target, "choice selected");

        self.apply_scores(&deltas);
        Ok(match target {
            Some(target) => self.enter_event(&target),
            None => self.advance(),
        })
    }

    /// Stores the hero's name; unblocks the current name input step.
    pub fn commit_name(&mut self, name: &str) -> VnResult<()> {
        match self.current_step().map(|step| &step.kind) {
            Some(StepKind::NameInput) => {}
            _ => return Err(VnError::NotANameInput),
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(VnError::EmptyName);
        }
        info!(name, "hero name committed");
        self.state.display_name = Some(name.to_string());
        self.name_committed = true;
        Ok(())
    }

    /// Routes a finished minigame to its win or lose event.
    ///
    /// `score` is kept as the game's best score when it beats the previous one.
    pub fn resolve_minigame(
        &mut self,
        outcome: MiniGameOutcome,
        score: Option<u32>,
    ) -> VnResult<Advance> {
        let game = self
            .current_step()
            .and_then(StepCompiled::mini_game)
            .ok_or(VnError::NotAMiniGame)?;
        let game_id = game.id.clone();
        let (target, deltas) = game.route(outcome);
        let target = target.clone();
        let deltas = deltas.to_vec();
        info!(game = %game_id, ?outcome, "minigame resolved");

        self.apply_scores(&deltas);
        if let Some(score) = score {
            self.record_minigame_score(&game_id, score);
        }
        Ok(self.enter_event(&target))
    }

    /// Keeps the best score for a minigame; returns the stored best.
    ///
    /// An improved best is queued for remote sync.
    pub fn record_minigame_score(&mut self, game_id: &str, score: u32) -> u32 {
        let previous = self.state.minigame_scores.get(game_id).copied();
        let best = self.state.record_minigame_score(game_id, score);
        if previous != Some(best) {
            debug!(game = game_id, best, "minigame best score improved");
            self.score_outbox.insert(game_id.to_string(), best);
        }
        best
    }

    /// Starts a new game from the configured start event.
    ///
    /// Only playback position is reset: affection, minigame best scores and
    /// the hero's name belong to the player and are kept.
    pub fn reset(&mut self) {
        let start = self.config.start_event.as_str();
        self.state.cursor = Cursor::new(start);
        self.state.carried = CarriedChannels::default();
        self.state.chat_log.clear();
        self.state.finished = false;
        self.enter_step();
        info!(start = %self.config.start_event, "new game started");
    }

    /// Copy of the current state, suitable for saving.
    pub fn snapshot(&self) -> EngineState {
        self.state.clone()
    }

    /// Replaces the current state after checking it against the script.
    ///
    /// The state is restored as saved; channels are not merged again. The
    /// sync queues are rebuilt from the restored scores so a remote profile
    /// follows the loaded game.
    pub fn restore(&mut self, state: EngineState) -> VnResult<()> {
        self.validate_state(&state)?;
        self.state = state;
        self.name_committed = false;
        self.affection_outbox = self
            .state
            .affection
            .iter()
            .map(|(id, value)| (id.to_string(), value))
            .collect();
        self.score_outbox = self.state.minigame_scores.clone();
        info!(
            event = %self.state.cursor.event_id,
            step = self.state.cursor.step_index,
            "state restored"
        );
        Ok(())
    }

    /// Takes the affection updates made since the last drain.
    pub fn drain_affection_changes(&mut self) -> Vec<AffectionChange> {
        std::mem::take(&mut self.affection_outbox)
            .into_iter()
            .map(|(character_id, value)| AffectionChange {
                character_id,
                value,
            })
            .collect()
    }

    /// Takes the best scores improved since the last drain.
    pub fn drain_minigame_scores(&mut self) -> Vec<MiniGameScore> {
        std::mem::take(&mut self.score_outbox)
            .into_iter()
            .map(|(game_id, best)| MiniGameScore { game_id, best })
            .collect()
    }

    /// Replaces affection and best scores with values from a remote profile.
    ///
    /// Affection is clamped into range; nothing is left queued for sync.
    pub fn adopt_remote_progress(
        &mut self,
        affection: BTreeMap<String, i32>,
        minigame_scores: BTreeMap<String, u32>,
    ) {
        self.state.affection = affection.into_iter().collect();
        self.state.minigame_scores = minigame_scores;
        self.affection_outbox.clear();
        self.score_outbox.clear();
    }

    fn validate_state(&self, state: &EngineState) -> VnResult<()> {
        let cursor = &state.cursor;
        let event = self
            .script
            .get_event(&cursor.event_id)
            .ok_or_else(|| VnError::StateMismatch(format!("unknown event '{}'", cursor.event_id)))?;
        let index = cursor.step_index as usize;
        if index >= event.len() && !(event.is_empty() && index == 0) {
            return Err(VnError::StateMismatch(format!(
                "step {} outside event '{}' ({} steps)",
                cursor.step_index,
                cursor.event_id,
                event.len()
            )));
        }
        if !state.affection.is_within_bounds() {
            return Err(VnError::StateMismatch(
                "affection value out of range".to_string(),
            ));
        }
        Ok(())
    }

    fn apply_scores(&mut self, deltas: &[ScoreDelta]) {
        for (character_id, value) in self.state.affection.apply_all(deltas) {
            debug!(character = %character_id, value, "affection updated");
            self.affection_outbox.insert(character_id, value);
        }
    }

    /// Enters `event_id` at step 0, or halts when it does not exist.
    fn enter_event(&mut self, event_id: &str) -> Advance {
        if !self.script.contains_event(event_id) {
            return self.halt_on_missing(event_id);
        }
        self.state.finished = false;
        self.state.cursor.enter(event_id);
        self.enter_step();
        info!(event = event_id, "entered event");
        Advance::EnteredEvent(event_id.to_string())
    }

    fn halt_on_missing(&mut self, event_id: &str) -> Advance {
        warn!(event = event_id, "event not found, playback halted");
        self.state.finished = true;
        Advance::EndOfContent
    }

    /// Applies the side effects of landing on the cursor's step.
    fn enter_step(&mut self) {
        self.name_committed = false;
        let cursor = &self.state.cursor;
        let Some(step) = self
            .script
            .step(&cursor.event_id, cursor.step_index as usize)
        else {
            return;
        };
        debug!(
            event = %cursor.event_id,
            step = %step.id,
            index = cursor.step_index,
            kind = step.kind.label(),
            "entered step"
        );
        self.state.carried.apply(&step.channels);
        match &step.kind {
            StepKind::Chat(style) => {
                let line = ChatLine {
                    step_id: step.id.to_string(),
                    speaker: render::display_speaker(
                        step.speaker_id.as_deref(),
                        &self.state,
                        &self.config,
                    ),
                    text: render::display_text(&step.text, &self.state, &self.config),
                    style: *style,
                };
                self.state.record_chat(line, self.config.chat_history_limit);
            }
            _ => self.state.chat_log.clear(),
        }
    }
}

