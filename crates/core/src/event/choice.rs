use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::SharedStr;

/// Selectable choice in raw form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ChoiceRaw {
    pub id: String,
    pub text: String,
    #[serde(
        default,
        alias = "next_scene_id",
        alias = "nextSceneId",
        skip_serializing_if = "Option::is_none"
    )]
    pub target_event_id: Option<String>,
    #[serde(default, alias = "score_list", skip_serializing_if = "Vec::is_empty")]
    pub score_deltas: Vec<ScoreDeltaRaw>,
}

/// Affection change attached to a choice or minigame outcome.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ScoreDeltaRaw {
    pub character_id: String,
    #[serde(alias = "score")]
    pub delta: i32,
}

/// Choice with interned strings and an optional branch target.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceCompiled {
    pub id: SharedStr,
    pub text: SharedStr,
    pub target_event_id: Option<SharedStr>,
    pub score_deltas: Vec<ScoreDelta>,
}

/// Validated affection change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreDelta {
    pub character_id: SharedStr,
    pub delta: i32,
}
