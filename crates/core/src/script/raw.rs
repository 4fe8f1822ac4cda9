use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use schemars::JsonSchema;

use crate::error::{VnError, VnResult};
use crate::event::{
    ChannelPatch, ChoiceCompiled, ChoiceRaw, EventCompiled, EventRaw, MiniGameCompiled,
    MiniGameRaw, ScoreDelta, ScoreDeltaRaw, SharedStr, StepCompiled, StepKind, StepRaw,
};
use crate::resource::ResourceLimiter;
use crate::version::SCRIPT_SCHEMA_VERSION;

use super::compiled::ScriptCompiled;

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize, JsonSchema)]
struct ScriptEnvelope {
    #[serde(default)]
    script_schema_version: Option<String>,
    events: BTreeMap<String, EventRaw>,
}

/// JSON-facing script: events keyed by id, with raw string data.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize, JsonSchema)]
pub struct ScriptRaw {
    pub events: BTreeMap<String, EventRaw>,
}

impl ScriptRaw {
    pub fn new(events: BTreeMap<String, EventRaw>) -> Self {
        Self { events }
    }

    /// Parses a JSON script into a raw script structure.
    pub fn from_json(input: &str) -> VnResult<Self> {
        Self::from_json_with_limits(input, ResourceLimiter::default())
    }

    /// Serializes the script to a JSON string with the current schema version.
    pub fn to_json(&self) -> VnResult<String> {
        let envelope = ScriptEnvelope {
            script_schema_version: Some(SCRIPT_SCHEMA_VERSION.to_string()),
            events: self.events.clone(),
        };
        serde_json::to_string_pretty(&envelope).map_err(|e| VnError::Serialization {
            message: e.to_string(),
            src: "".to_string(),
            span: (0, 0).into(),
        })
    }

    /// Parses a JSON script into a raw script structure with resource limits.
    pub fn from_json_with_limits(input: &str, limits: ResourceLimiter) -> VnResult<Self> {
        if input.len() > limits.max_script_bytes {
            return Err(VnError::ResourceLimit("script size".to_string()));
        }
        let envelope: ScriptEnvelope =
            serde_json::from_str(input).map_err(|err| json_deserialize_error(input, &err))?;
        if let Some(version) = envelope.script_schema_version.as_deref() {
            if !schema_compatible(version) {
                return Err(VnError::InvalidScript(format!(
                    "schema incompatible: found {version}, expected {SCRIPT_SCHEMA_VERSION}"
                )));
            }
        }
        let script = Self {
            events: envelope.events,
        };
        script.ensure_string_budget(limits.max_script_bytes)?;
        Ok(script)
    }

    pub fn ensure_string_budget(&self, max_bytes: usize) -> VnResult<()> {
        use crate::resource::StringBudget;

        let mut total = 0usize;
        for (id, event) in &self.events {
            total = total
                .saturating_add(id.len())
                .saturating_add(event.string_bytes());
            if total > max_bytes {
                return Err(VnError::ResourceLimit("script string budget".to_string()));
            }
        }
        Ok(())
    }

    /// JSON schema of the authored script format, envelope included.
    pub fn json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ScriptEnvelope)
    }

    /// Compiles a raw script into its runtime representation.
    ///
    /// Parses step kinds into their typed form, resolves the `all` portrait
    /// shorthand, drops empty optional ids and interns repeated strings.
    /// Dangling event references are left for [`ScriptCompiled::lint`].
    pub fn compile(&self) -> VnResult<ScriptCompiled> {
        let mut pool = StringPool::default();
        let mut events = BTreeMap::new();
        for (id, event) in &self.events {
            let compiled = compile_event(&mut pool, id, event)?;
            events.insert(id.clone(), compiled);
        }
        Ok(ScriptCompiled { events })
    }
}

/// Accepts the current schema and any older minor revision of the same major.
fn schema_compatible(version: &str) -> bool {
    match (
        parse_schema_version(version),
        parse_schema_version(SCRIPT_SCHEMA_VERSION),
    ) {
        (Some((major, minor)), Some((current_major, current_minor))) => {
            major == current_major && minor <= current_minor
        }
        _ => false,
    }
}

/// `MAJOR.MINOR` with both parts unsigned integers.
fn parse_schema_version(version: &str) -> Option<(u32, u32)> {
    let (major, minor) = version.trim().split_once('.')?;
    let digits = |part: &str| !part.is_empty() && part.bytes().all(|byte| byte.is_ascii_digit());
    if !digits(major) || !digits(minor) {
        return None;
    }
    Some((major.parse().ok()?, minor.parse().ok()?))
}

fn compile_event(pool: &mut StringPool, id: &str, event: &EventRaw) -> VnResult<EventCompiled> {
    let steps = event
        .steps
        .iter()
        .enumerate()
        .map(|(position, step)| {
            compile_step(pool, position, step)
                .map_err(|message| invalid(format!("event '{id}', step '{}': {message}", step.id)))
        })
        .collect::<VnResult<Vec<_>>>()?;
    Ok(EventCompiled {
        id: pool.intern(id),
        chapter_id: pool.intern(&event.chapter_id),
        next_event_id: pool.intern_non_empty(event.next_event_id.as_deref()),
        sequence: event.sequence,
        steps,
    })
}

fn compile_step(
    pool: &mut StringPool,
    position: usize,
    step: &StepRaw,
) -> Result<StepCompiled, String> {
    if step.id.trim().is_empty() {
        return Err("step id cannot be empty".to_string());
    }
    let mini_game = step
        .mini_game
        .as_ref()
        .map(|game| compile_mini_game(pool, game))
        .transpose()?;
    let kind = StepKind::parse(step.kind.trim(), mini_game)?;
    if !step.choices.is_empty() && !kind.allows_choices() {
        return Err(format!("'{}' steps cannot offer choices", kind.label()));
    }

    let mut seen = HashSet::new();
    let mut choices = Vec::with_capacity(step.choices.len());
    for choice in &step.choices {
        if !seen.insert(choice.id.as_str()) {
            return Err(format!("duplicate choice id '{}'", choice.id));
        }
        choices.push(compile_choice(pool, choice)?);
    }

    let mut channels = ChannelPatch::default();
    if let Some(images) = &step.character_images {
        for (slot, image) in channels.characters.iter_mut().zip(images.positions()) {
            *slot = pool.intern_non_empty(image);
        }
    }
    channels.background_image = pool.intern_non_empty(step.background_image_id.as_deref());
    channels.background_sound = pool.intern_non_empty(step.background_sound_id.as_deref());

    let index = u32::try_from(position).map_err(|_| "step position exceeds u32".to_string())?;
    Ok(StepCompiled {
        id: pool.intern(&step.id),
        index: step.index.unwrap_or(index),
        text: pool.intern(&step.text),
        speaker_id: pool.intern_non_empty(step.speaker_id.as_deref()),
        location: pool.intern_non_empty(step.location.as_deref()),
        time: pool.intern_non_empty(step.time.as_deref()),
        channels,
        effect_sound: pool.intern_non_empty(step.effect_sound_id.as_deref()),
        overlay_image: pool.intern_non_empty(step.overlay_image_id.as_deref()),
        kind,
        choices,
    })
}

fn compile_choice(pool: &mut StringPool, choice: &ChoiceRaw) -> Result<ChoiceCompiled, String> {
    if choice.id.trim().is_empty() {
        return Err("choice id cannot be empty".to_string());
    }
    Ok(ChoiceCompiled {
        id: pool.intern(&choice.id),
        text: pool.intern(&choice.text),
        target_event_id: pool.intern_non_empty(choice.target_event_id.as_deref()),
        score_deltas: compile_scores(pool, &choice.score_deltas)?,
    })
}

fn compile_mini_game(pool: &mut StringPool, game: &MiniGameRaw) -> Result<MiniGameCompiled, String> {
    if game.id.trim().is_empty() {
        return Err("minigame id cannot be empty".to_string());
    }
    if game.win_event_id.trim().is_empty() || game.lose_event_id.trim().is_empty() {
        return Err(format!(
            "minigame '{}' needs both a win and a lose event",
            game.id
        ));
    }
    Ok(MiniGameCompiled {
        id: pool.intern(&game.id),
        name: pool.intern_non_empty(game.name.as_deref()),
        win_event_id: pool.intern(&game.win_event_id),
        lose_event_id: pool.intern(&game.lose_event_id),
        win_score_deltas: compile_scores(pool, &game.win_score_deltas)?,
        lose_score_deltas: compile_scores(pool, &game.lose_score_deltas)?,
    })
}

fn compile_scores(pool: &mut StringPool, scores: &[ScoreDeltaRaw]) -> Result<Vec<ScoreDelta>, String> {
    scores
        .iter()
        .map(|score| {
            if score.character_id.trim().is_empty() {
                return Err("score entry has an empty character id".to_string());
            }
            Ok(ScoreDelta {
                character_id: pool.intern(&score.character_id),
                delta: score.delta,
            })
        })
        .collect()
}

fn invalid(message: String) -> VnError {
    VnError::InvalidScript(message)
}

#[cold]
#[inline(never)]
fn json_deserialize_error(input: &str, err: &serde_json::Error) -> VnError {
    let (offset, length) = json_error_span(input, err);
    let (window, local_offset) = json_error_window(input, offset, length);
    let max_len = window.len().saturating_sub(local_offset);
    let span_len = if max_len == 0 { 0 } else { length.min(max_len) };
    VnError::Serialization {
        message: err.to_string(),
        src: window,
        span: (local_offset, span_len).into(),
    }
}

#[cold]
#[inline(never)]
fn json_error_span(input: &str, error: &serde_json::Error) -> (usize, usize) {
    let line = error.line();
    let column = error.column();
    if line == 0 || column == 0 {
        return (0, 1);
    }
    let mut current_line = 1usize;
    let mut offset = 0usize;
    for chunk in input.split_inclusive('\n') {
        if current_line == line {
            let column_index = column.saturating_sub(1);
            let byte_index = chunk
                .char_indices()
                .nth(column_index)
                .map(|(idx, _)| idx)
                .unwrap_or(chunk.len().saturating_sub(1));
            offset += byte_index;
            return (offset, 1);
        }
        offset += chunk.len();
        current_line += 1;
    }
    (input.len().saturating_sub(1), 1)
}

#[cold]
#[inline(never)]
fn json_error_window(input: &str, offset: usize, length: usize) -> (String, usize) {
    const CONTEXT: usize = 160;
    let mut start = offset.saturating_sub(CONTEXT).min(input.len());
    let mut end = (offset + length + CONTEXT).min(input.len());
    while start > 0 && !input.is_char_boundary(start) {
        start = start.saturating_sub(1);
    }
    while end < input.len() && !input.is_char_boundary(end) {
        end = end.saturating_add(1).min(input.len());
    }
    let window = input[start..end].to_string();
    (window, offset.saturating_sub(start))
}

#[derive(Default)]
struct StringPool {
    cache: HashMap<String, SharedStr>,
}

impl StringPool {
    fn intern(&mut self, value: &str) -> SharedStr {
        if let Some(existing) = self.cache.get(value) {
            return existing.clone();
        }
        let shared: SharedStr = Arc::from(value);
        self.cache.insert(value.to_string(), shared.clone());
        shared
    }

    /// Authored data uses `""` and missing fields interchangeably.
    fn intern_non_empty(&mut self, value: Option<&str>) -> Option<SharedStr> {
        value
            .filter(|value| !value.trim().is_empty())
            .map(|value| self.intern(value))
    }
}

#[cfg(test)]
#[path = "tests/raw_tests.rs"]
mod tests;
