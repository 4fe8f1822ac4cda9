//! Headless playthrough traces for deterministic regression checks.
//!
//! A trace records what the player sees at every step plus a digest of the
//! state, using only contractual data.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::engine::{Advance, Engine};
use crate::event::MiniGameOutcome;
use crate::render::{InputMode, StepView};

/// Name committed on name input steps during a headless run.
pub const TRACE_HERO_NAME: &str = "Player";

/// A single step in the execution trace.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceStep {
    /// Step number (0-indexed).
    pub step: u32,
    /// `None` while the cursor sits on an event without steps.
    pub view: Option<StepView>,
    pub state: StateDigest,
    /// What the runner did to leave this step.
    pub action: TraceAction,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TraceAction {
    Advance { outcome: Advance },
    Choose { choice_id: String, outcome: Advance },
    CommitName { name: String, outcome: Advance },
    MiniGame { outcome: MiniGameOutcome, result: Advance },
    Failed { message: String },
}

/// Simplified engine state for deterministic comparison.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDigest {
    pub event_id: String,
    pub step_index: u32,
    pub history_len: usize,
    pub affection: BTreeMap<String, i32>,
    pub display_name: Option<String>,
    pub chat_lines: usize,
}

impl StateDigest {
    pub fn from_engine(engine: &Engine) -> Self {
        let state = engine.state();
        Self {
            event_id: state.cursor.event_id.clone(),
            step_index: state.cursor.step_index,
            history_len: state.cursor.history.len(),
            affection: state
                .affection
                .iter()
                .map(|(id, value)| (id.to_string(), value))
                .collect(),
            display_name: state.display_name.clone(),
            chat_lines: state.chat_log.len(),
        }
    }
}

/// A complete execution trace.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayTrace {
    pub steps: Vec<TraceStep>,
    /// Whether the run reached the end of content within its step budget.
    pub finished: bool,
}

impl PlayTrace {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Plays `engine` without a UI for at most `max_steps` steps.
///
/// Picks the first choice, wins every minigame and commits
/// [`TRACE_HERO_NAME`] at name inputs. Events without steps are advanced
/// through and recorded without a view.
pub fn run_headless(engine: &mut Engine, max_steps: usize) -> PlayTrace {
    let mut trace = PlayTrace::new();
    for step in 0..max_steps {
        if engine.is_finished() {
            break;
        }
        let view = engine.view();
        let state = StateDigest::from_engine(engine);
        let action = match &view {
            Some(view) => drive(engine, view),
            None => TraceAction::Advance {
                outcome: engine.advance(),
            },
        };
        let stop = matches!(action, TraceAction::Failed { .. });
        trace.steps.push(TraceStep {
            step: step as u32,
            view,
            state,
            action,
        });
        if stop {
            break;
        }
    }
    trace.finished = engine.is_finished();
    trace
}

fn drive(engine: &mut Engine, view: &StepView) -> TraceAction {
    let failed = |err: crate::error::VnError| TraceAction::Failed {
        message: err.to_string(),
    };
    match view.input {
        InputMode::Choice => {
            let Some(choice) = view.choices.first() else {
                return TraceAction::Advance {
                    outcome: engine.advance(),
                };
            };
            match engine.select_choice(&choice.id) {
                Ok(outcome) => TraceAction::Choose {
                    choice_id: choice.id.clone(),
                    outcome,
                },
                Err(err) => failed(err),
            }
        }
        InputMode::NameEntry => match engine.commit_name(TRACE_HERO_NAME) {
            Ok(()) => TraceAction::CommitName {
                name: TRACE_HERO_NAME.to_string(),
                outcome: engine.advance(),
            },
            Err(err) => failed(err),
        },
        InputMode::MiniGame => match engine.resolve_minigame(MiniGameOutcome::Win, None) {
            Ok(result) => TraceAction::MiniGame {
                outcome: MiniGameOutcome::Win,
                result,
            },
            Err(err) => failed(err),
        },
        InputMode::Click | InputMode::AutoAdvance => TraceAction::Advance {
            outcome: engine.advance(),
        },
    }
}
