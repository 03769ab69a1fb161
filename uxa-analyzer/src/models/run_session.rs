//! Analysis run state machine
//!
//! A run progresses through the pipeline stages in fixed order:
//! INIT → ASSESSMENT → LOCALIZATION → SYNTHESIS → INTERPRETATION → RECOMMENDATION → REPORT → DONE
//!
//! ABORTED (assessment failed) and CANCELLED (cooperative stop) are the other terminal states.

use crate::models::manifest::Stage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Analysis run state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunState {
    /// Input loaded, working directory created
    Init,
    /// Structured usability assessment
    Assessment,
    /// Bounding boxes for top-severity findings
    Localization,
    /// Heatmap density synthesis
    Synthesis,
    /// Strategic interpretation narrative
    Interpretation,
    /// Strategic recommendations narrative
    Recommendation,
    /// Report assembly
    Report,
    /// Every stage attempted
    Done,
    /// Fatal stage failure
    Aborted,
    /// Cancelled between stages
    Cancelled,
}

impl RunState {
    /// Whether no further transitions are expected
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Done | RunState::Aborted | RunState::Cancelled)
    }
}

impl From<Stage> for RunState {
    fn from(stage: Stage) -> Self {
        match stage {
            Stage::Assessment => RunState::Assessment,
            Stage::Localization => RunState::Localization,
            Stage::Synthesis => RunState::Synthesis,
            Stage::Interpretation => RunState::Interpretation,
            Stage::Recommendation => RunState::Recommendation,
            Stage::Report => RunState::Report,
        }
    }
}

/// State transition event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub run_id: String,
    pub old_state: RunState,
    pub new_state: RunState,
    pub transitioned_at: DateTime<Utc>,
}

/// Analysis run (in-memory state)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSession {
    /// Run identifier, also the working directory name
    pub run_id: String,

    /// Current state
    pub state: RunState,

    /// Every transition taken so far
    pub transitions: Vec<StateTransition>,

    /// Run start time
    pub started_at: DateTime<Utc>,

    /// Run end time (set on terminal states)
    pub ended_at: Option<DateTime<Utc>>,
}

impl RunSession {
    /// Create new run session in INIT
    pub fn new(run_id: String, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id,
            state: RunState::Init,
            transitions: Vec::new(),
            started_at,
            ended_at: None,
        }
    }

    /// Transition to new state
    pub fn transition_to(&mut self, new_state: RunState) -> StateTransition {
        let transition = StateTransition {
            run_id: self.run_id.clone(),
            old_state: self.state,
            new_state,
            transitioned_at: Utc::now(),
        };
        self.state = new_state;

        if new_state.is_terminal() {
            self.ended_at = Some(transition.transitioned_at);
        }

        self.transitions.push(transition.clone());
        transition
    }

    /// Check if session is terminal (finished)
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}
