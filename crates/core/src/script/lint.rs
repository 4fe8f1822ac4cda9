//! Soft checks over a compiled script.
//!
//! Nothing here rejects a script: dangling references are legal at runtime
//! and end playback, so they are reported instead.

use std::collections::{HashSet, VecDeque};
use std::fmt;

use serde::Serialize;

use super::ScriptCompiled;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IssueKind {
    DanglingNextEvent { target: String },
    DanglingChoiceTarget { choice_id: String, target: String },
    DanglingMiniGameTarget { game_id: String, target: String },
    IndexMismatch { authored: u32, position: usize },
    DuplicateStepId,
    EmptyEvent,
    MissingStartEvent { start: String },
    Unreachable,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ScriptIssue {
    pub event_id: String,
    pub step_id: Option<String>,
    #[serde(flatten)]
    pub kind: IssueKind,
}

impl fmt::Display for ScriptIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}", self.event_id)?;
        if let Some(step) = &self.step_id {
            write!(f, "/{step}")?;
        }
        write!(f, "] ")?;
        match &self.kind {
            IssueKind::DanglingNextEvent { target } => {
                write!(f, "next event '{target}' does not exist")
            }
            IssueKind::DanglingChoiceTarget { choice_id, target } => {
                write!(f, "choice '{choice_id}' targets missing event '{target}'")
            }
            IssueKind::DanglingMiniGameTarget { game_id, target } => {
                write!(f, "minigame '{game_id}' routes to missing event '{target}'")
            }
            IssueKind::IndexMismatch { authored, position } => {
                write!(f, "authored index {authored} but step sits at {position}")
            }
            IssueKind::DuplicateStepId => write!(f, "duplicate step id"),
            IssueKind::EmptyEvent => write!(f, "event has no steps"),
            IssueKind::MissingStartEvent { start } => {
                write!(f, "start event '{start}' does not exist")
            }
            IssueKind::Unreachable => write!(f, "event cannot be reached from the start event"),
        }
    }
}

impl ScriptCompiled {
    /// Reports dangling references and authoring slips.
    ///
    /// When `start_event` is given it must exist, and events it cannot reach
    /// are reported as unreachable.
    pub fn lint(&self, start_event: Option<&str>) -> Vec<ScriptIssue> {
        let mut issues = Vec::new();
        if let Some(start) = start_event {
            if self.contains_event(start) {
                let reachable = self.reachable_from(start);
                for event_id in self.event_ids().filter(|id| !reachable.contains(id)) {
                    issues.push(ScriptIssue {
                        event_id: event_id.to_string(),
                        step_id: None,
                        kind: IssueKind::Unreachable,
                    });
                }
            } else {
                issues.push(ScriptIssue {
                    event_id: start.to_string(),
                    step_id: None,
                    kind: IssueKind::MissingStartEvent {
                        start: start.to_string(),
                    },
                });
            }
        }

        for (event_id, event) in &self.events {
            let issue = |step_id: Option<&str>, kind| ScriptIssue {
                event_id: event_id.clone(),
                step_id: step_id.map(str::to_string),
                kind,
            };
            if event.is_empty() {
                issues.push(issue(None, IssueKind::EmptyEvent));
            }
            if let Some(next) = &event.next_event_id {
                if !self.contains_event(next) {
                    issues.push(issue(
                        None,
                        IssueKind::DanglingNextEvent {
                            target: next.to_string(),
                        },
                    ));
                }
            }

            let mut step_ids = HashSet::new();
            for (position, step) in event.steps.iter().enumerate() {
                let step_id = Some(step.id.as_ref());
                if !step_ids.insert(step.id.clone()) {
                    issues.push(issue(step_id, IssueKind::DuplicateStepId));
                }
                if step.index as usize != position {
                    issues.push(issue(
                        step_id,
                        IssueKind::IndexMismatch {
                            authored: step.index,
                            position,
                        },
                    ));
                }
                for choice in &step.choices {
                    if let Some(target) = &choice.target_event_id {
                        if !self.contains_event(target) {
                            issues.push(issue(
                                step_id,
                                IssueKind::DanglingChoiceTarget {
                                    choice_id: choice.id.to_string(),
                                    target: target.to_string(),
                                },
                            ));
                        }
                    }
                }
                if let Some(game) = step.mini_game() {
                    for target in [&game.win_event_id, &game.lose_event_id] {
                        if !self.contains_event(target) {
                            issues.push(issue(
                                step_id,
                                IssueKind::DanglingMiniGameTarget {
                                    game_id: game.id.to_string(),
                                    target: target.to_string(),
                                },
                            ));
                        }
                    }
                }
            }
        }
        issues
    }

    /// Event ids reachable from `start` through successors, choices and
    /// minigame outcomes.
    pub fn reachable_from<'a>(&'a self, start: &'a str) -> HashSet<&'a str> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([start]);
        while let Some(event_id) = queue.pop_front() {
            let Some(event) = self.get_event(event_id) else {
                continue;
            };
            if !seen.insert(event_id) {
                continue;
            }
            queue.extend(event.outgoing_targets().map(|target| target.as_ref()));
        }
        seen
    }
}
