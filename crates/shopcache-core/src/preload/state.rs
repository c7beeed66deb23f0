//! Preload run state and the reducer that folds step events into it.

use serde::{Deserialize, Serialize};

use super::steps::{LoadStep, StepStatus};
use crate::resource::ResourceKey;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum PreloadStatus {
    #[default]
    Idle,
    Loading,
    Complete,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Loaded,
    Failed,
}

impl From<StepOutcome> for StepStatus {
    fn from(outcome: StepOutcome) -> Self {
        match outcome {
            StepOutcome::Loaded => StepStatus::Complete,
            StepOutcome::Failed => StepStatus::Error,
        }
    }
}

/// Everything that can happen to a run.
#[derive(Debug, Clone, PartialEq)]
pub enum PreloadEvent {
    Started { steps: Vec<LoadStep> },
    StepStarted(ResourceKey),
    StepSettled { key: ResourceKey, outcome: StepOutcome },
    Finished,
    Failed { message: String },
}

/// `round(100 * completed / total)`, rounding halves up.
pub fn progress_for(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let completed = completed.min(total);
    ((200 * completed + total) / (2 * total)) as u8
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreloadState {
    pub status: PreloadStatus,
    pub progress: u8,
    pub error: Option<String>,
    pub steps: Vec<LoadStep>,
    completed: usize,
}

impl PreloadState {
    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn step(&self, key: ResourceKey) -> Option<&LoadStep> {
        self.steps.iter().find(|s| s.id == key)
    }

    pub fn all_settled(&self) -> bool {
        self.steps.iter().all(|s| s.status.is_terminal())
    }

    pub fn apply(&mut self, event: PreloadEvent) {
        match event {
            PreloadEvent::Started { steps } => {
                *self = PreloadState {
                    status: PreloadStatus::Loading,
                    steps,
                    ..PreloadState::default()
                };
            }
            PreloadEvent::StepStarted(key) => {
                if let Some(step) = self.step_mut(key) {
                    if step.status == StepStatus::Pending {
                        step.status = StepStatus::Loading;
                    }
                }
            }
            PreloadEvent::StepSettled { key, outcome } => {
                let Some(step) = self.step_mut(key) else {
                    return;
                };
                // A step counts toward progress exactly once
                if step.status.is_terminal() {
                    return;
                }
                step.status = outcome.into();
                self.completed += 1;
                self.progress = self
                    .progress
                    .max(progress_for(self.completed, self.steps.len()));
            }
            PreloadEvent::Finished => {
                self.status = PreloadStatus::Complete;
                self.progress = 100;
            }
            PreloadEvent::Failed { message } => {
                self.status = PreloadStatus::Error;
                self.error = Some(message);
            }
        }
    }

    fn step_mut(&mut self, key: ResourceKey) -> Option<&mut LoadStep> {
        self.steps.iter_mut().find(|s| s.id == key)
    }
}

/// What a shell renders: the run state plus the readiness gate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct PreloadSnapshot {
    pub status: PreloadStatus,
    pub progress: u8,
    pub error: Option<String>,
    pub steps: Vec<LoadStep>,
    pub is_preloaded: bool,
}

impl PreloadSnapshot {
    pub fn from_state(state: &PreloadState, is_preloaded: bool) -> Self {
        Self {
            status: state.status,
            progress: state.progress,
            error: state.error.clone(),
            steps: state.steps.clone(),
            is_preloaded,
        }
    }

    pub fn failed_steps(&self) -> impl Iterator<Item = &LoadStep> {
        self.steps.iter().filter(|s| s.status == StepStatus::Error)
    }
}
