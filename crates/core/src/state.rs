//! Engine state storage for playback.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::event::{ChatStyle, ScoreDelta};
use crate::visual::CarriedChannels;

pub const AFFECTION_MIN: i32 = 0;
pub const AFFECTION_MAX: i32 = 100;

/// Position of playback inside the script graph.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub event_id: String,
    pub step_index: u32,
    /// Every event entered, in order, starting with the first one.
    pub history: Vec<String>,
}

impl Cursor {
    pub fn new(event_id: impl Into<String>) -> Self {
        let event_id = event_id.into();
        Self {
            history: vec![event_id.clone()],
            event_id,
            step_index: 0,
        }
    }

    pub(crate) fn enter(&mut self, event_id: &str) {
        self.event_id = event_id.to_string();
        self.step_index = 0;
        self.history.push(event_id.to_string());
    }
}

/// Affection score per character, always within `AFFECTION_MIN..=AFFECTION_MAX`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffectionMap {
    scores: BTreeMap<String, i32>,
}

impl AffectionMap {
    /// Unknown characters read as zero.
    pub fn get(&self, character_id: &str) -> i32 {
        self.scores.get(character_id).copied().unwrap_or(AFFECTION_MIN)
    }

    /// Applies a delta and returns the stored, clamped value.
    pub fn apply_delta(&mut self, character_id: &str, delta: i32) -> i32 {
        let value = apply_delta(self.get(character_id), delta);
        self.scores.insert(character_id.to_string(), value);
        value
    }

    pub fn apply_all(&mut self, deltas: &[ScoreDelta]) -> Vec<(String, i32)> {
        deltas
            .iter()
            .map(|delta| {
                let value = self.apply_delta(&delta.character_id, delta.delta);
                (delta.character_id.to_string(), value)
            })
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i32)> + '_ {
        self.scores.iter().map(|(id, value)| (id.as_str(), *value))
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Whether every stored score lies in range.
    pub fn is_within_bounds(&self) -> bool {
        self.scores
            .values()
            .all(|value| (AFFECTION_MIN..=AFFECTION_MAX).contains(value))
    }
}

impl FromIterator<(String, i32)> for AffectionMap {
    fn from_iter<I: IntoIterator<Item = (String, i32)>>(iter: I) -> Self {
        let mut map = Self::default();
        for (id, value) in iter {
            map.scores
                .insert(id, value.clamp(AFFECTION_MIN, AFFECTION_MAX));
        }
        map
    }
}

/// `clamp(current + delta, 0, 100)`.
pub fn apply_delta(current: i32, delta: i32) -> i32 {
    current
        .saturating_add(delta)
        .clamp(AFFECTION_MIN, AFFECTION_MAX)
}

/// One line of the messenger-style chat log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatLine {
    pub step_id: String,
    pub speaker: Option<String>,
    pub text: String,
    pub style: ChatStyle,
}

/// Runtime state for the engine: cursor, scores, carried channels and chat.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineState {
    pub cursor: Cursor,
    pub affection: AffectionMap,
    /// Channels resolved for the current step.
    pub carried: CarriedChannels,
    pub display_name: Option<String>,
    pub chat_log: VecDeque<ChatLine>,
    pub minigame_scores: BTreeMap<String, u32>,
    pub finished: bool,
}

impl EngineState {
    pub fn new(start_event: impl Into<String>) -> Self {
        Self {
            cursor: Cursor::new(start_event),
            affection: AffectionMap::default(),
            carried: CarriedChannels::default(),
            display_name: None,
            chat_log: VecDeque::new(),
            minigame_scores: BTreeMap::new(),
            finished: false,
        }
    }

    /// Records a chat line, dropping the oldest past `limit`.
    pub fn record_chat(&mut self, line: ChatLine, limit: usize) {
        if limit == 0 {
            return;
        }
        while self.chat_log.len() >= limit {
            self.chat_log.pop_front();
        }
        self.chat_log.push_back(line);
    }

    /// Keeps the best score seen for a minigame and returns it.
    pub fn record_minigame_score(&mut self, game_id: &str, score: u32) -> u32 {
        let best = self
            .minigame_scores
            .entry(game_id.to_string())
            .or_insert(score);
        *best = (*best).max(score);
        *best
    }
}
