use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{ScoreDelta, ScoreDeltaRaw, SharedStr};

/// Minigame trigger in raw form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MiniGameRaw {
    #[serde(alias = "game_id")]
    pub id: String,
    #[serde(default, alias = "game_name", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(alias = "win_scene_id")]
    pub win_event_id: String,
    #[serde(alias = "lose_scene_id")]
    pub lose_event_id: String,
    #[serde(default, alias = "win_score_list", skip_serializing_if = "Vec::is_empty")]
    pub win_score_deltas: Vec<ScoreDeltaRaw>,
    #[serde(default, alias = "lose_score_list", skip_serializing_if = "Vec::is_empty")]
    pub lose_score_deltas: Vec<ScoreDeltaRaw>,
}

/// Minigame trigger with interned strings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiniGameCompiled {
    pub id: SharedStr,
    pub name: Option<SharedStr>,
    pub win_event_id: SharedStr,
    pub lose_event_id: SharedStr,
    pub win_score_deltas: Vec<ScoreDelta>,
    pub lose_score_deltas: Vec<ScoreDelta>,
}

/// Result reported by the UI once a minigame finishes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MiniGameOutcome {
    Win,
    Lose,
}

impl MiniGameCompiled {
    /// Returns the branch target and score list for an outcome.
    pub fn route(&self, outcome: MiniGameOutcome) -> (&SharedStr, &[ScoreDelta]) {
        match outcome {
            MiniGameOutcome::Win => (&self.win_event_id, &self.win_score_deltas),
            MiniGameOutcome::Lose => (&self.lose_event_id, &self.lose_score_deltas),
        }
    }
}
