//! Intake flow state machine
//!
//! Stage selection, questionnaire, result, payment and back to the result is a
//! linear flow with a few branch points. The allowed moves are listed in one
//! table so routing code can check them instead of redirecting ad hoc.

use crate::error::FlowError;
use crate::gate;
use crate::tier::Tier;
use serde::{Deserialize, Serialize};

/// Where the user is in the assessment flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowState {
    /// No stage chosen
    NeedsStage,
    /// Stage chosen, questionnaire pending
    NeedsForm,
    /// Result loaded, gate not evaluated yet
    HasResult,
    /// Paid sections hidden
    Locked,
    /// Paid sections visible
    Unlocked,
    /// Checkout in progress
    Paying,
    /// Backend does not know the assessment id
    NotFound,
}

/// States reachable from `from`
#[must_use]
pub fn allowed_transitions(from: FlowState) -> Vec<FlowState> {
    use FlowState::*;
    match from {
        NeedsStage => vec![NeedsForm],
        NeedsForm => vec![HasResult, NeedsStage],
        HasResult => vec![Locked, Unlocked, NotFound],
        Locked => vec![Paying, NeedsStage],
        // upgrade from basic_15 to expert_39
        Unlocked => vec![Paying, NeedsStage],
        Paying => vec![HasResult, Locked],
        NotFound => vec![NeedsStage],
    }
}

/// Check a single transition
pub fn validate_transition(from: FlowState, to: FlowState) -> Result<(), FlowError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(FlowError::IllegalTransition { from, to })
    }
}

/// Gate outcome as a flow state
#[must_use]
pub fn gate_state(required: Tier, unlocked: Tier) -> FlowState {
    if gate::is_visible(required, unlocked) {
        FlowState::Unlocked
    } else {
        FlowState::Locked
    }
}

/// Tracks the current state and rejects illegal moves
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flow {
    state: FlowState,
    history: Vec<FlowState>,
}

impl Flow {
    /// Start a flow; a stored stage skips stage selection
    #[must_use]
    pub fn start(has_stage: bool) -> Self {
        let state = if has_stage {
            FlowState::NeedsForm
        } else {
            FlowState::NeedsStage
        };
        Self {
            state,
            history: vec![state],
        }
    }

    /// Current state
    #[inline]
    #[must_use]
    pub fn state(&self) -> FlowState {
        self.state
    }

    /// Every state visited, in order
    #[must_use]
    pub fn history(&self) -> &[FlowState] {
        &self.history
    }

    /// Move to `to` if the table allows it
    pub fn advance(&mut self, to: FlowState) -> Result<FlowState, FlowError> {
        validate_transition(self.state, to)?;
        tracing::debug!("flow {:?} -> {:?}", self.state, to);
        self.state = to;
        self.history.push(to);
        Ok(to)
    }

    /// Resolve `HasResult` into `Locked` or `Unlocked`
    pub fn apply_gate(&mut self, required: Tier, unlocked: Tier) -> Result<FlowState, FlowError> {
        self.advance(gate_state(required, unlocked))
    }
}
