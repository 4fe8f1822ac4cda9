//! Carried visual and audio channels.

use serde::{Deserialize, Serialize};

use crate::event::{ChannelPatch, SharedStr, CHARACTER_POSITIONS};

/// Last explicitly set value per channel, as seen by the current step.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarriedChannels {
    pub characters: [Option<SharedStr>; CHARACTER_POSITIONS],
    pub background_image: Option<SharedStr>,
    pub background_sound: Option<SharedStr>,
}

impl CarriedChannels {
    /// Applies a step's overrides in place.
    pub fn apply(&mut self, patch: &ChannelPatch) {
        for (slot, value) in self.characters.iter_mut().zip(&patch.characters) {
            if let Some(value) = value {
                *slot = Some(value.clone());
            }
        }
        if let Some(background) = &patch.background_image {
            self.background_image = Some(background.clone());
        }
        if let Some(sound) = &patch.background_sound {
            self.background_sound = Some(sound.clone());
        }
    }
}

/// Resolves the channels a step displays from the previously carried ones.
///
/// A channel is replaced only when the patch sets it.
pub fn merge_channels(previous: &CarriedChannels, patch: &ChannelPatch) -> CarriedChannels {
    let mut resolved = previous.clone();
    resolved.apply(patch);
    resolved
}
