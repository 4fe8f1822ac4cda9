use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::SharedStr;

/// Number of character portrait positions on screen.
pub const CHARACTER_POSITIONS: usize = 3;

/// Character portraits by screen position in raw form.
///
/// `all` sets every position at once and wins over the positional fields.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CharacterImagesRaw {
    #[serde(rename = "1", default, skip_serializing_if = "Option::is_none")]
    pub first: Option<String>,
    #[serde(rename = "2", default, skip_serializing_if = "Option::is_none")]
    pub second: Option<String>,
    #[serde(rename = "3", default, skip_serializing_if = "Option::is_none")]
    pub third: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all: Option<String>,
}

impl CharacterImagesRaw {
    /// Resolves the `all` shorthand into one value per position.
    pub fn positions(&self) -> [Option<&str>; CHARACTER_POSITIONS] {
        if let Some(all) = self.all.as_deref() {
            return [Some(all); CHARACTER_POSITIONS];
        }
        [
            self.first.as_deref(),
            self.second.as_deref(),
            self.third.as_deref(),
        ]
    }
}

/// Channel overrides a compiled step applies to the carried visual state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelPatch {
    pub characters: [Option<SharedStr>; CHARACTER_POSITIONS],
    pub background_image: Option<SharedStr>,
    pub background_sound: Option<SharedStr>,
}

impl ChannelPatch {
    pub fn is_empty(&self) -> bool {
        self.background_image.is_none()
            && self.background_sound.is_none()
            && self.characters.iter().all(Option::is_none)
    }
}
