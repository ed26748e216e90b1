//! Error types for riskcheck core
//!
//! Core derivations are total, so only two things can fail here:
//! - loading or compiling an action rule table
//! - an intake flow transition that the flow does not allow

use crate::flow::FlowState;

/// Rule table errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RulesError {
    /// Table text could not be parsed
    #[error("invalid rule table: {0}")]
    Parse(String),

    /// Table file could not be read
    #[error("cannot read rule table {path}: {message}")]
    Io { path: String, message: String },

    /// A pattern is not a valid regex
    #[error("invalid pattern {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },
}

/// Intake flow errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FlowError {
    /// Transition not in the allowed table
    #[error("illegal flow transition: {from:?} -> {to:?}")]
    IllegalTransition { from: FlowState, to: FlowState },
}

/// A precondition the caller must satisfy by sending the user back to intake
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MissingPrecondition {
    /// No stage chosen yet
    #[error("no business stage selected")]
    Stage,

    /// No assessment id in the URL or either storage scope
    #[error("no assessment id available")]
    AssessmentId,

    /// No cached questionnaire input to resubmit
    #[error("no cached questionnaire input")]
    Input,

    /// No payment session id to verify
    #[error("no checkout session id")]
    CheckoutSession,
}

impl MissingPrecondition {
    /// Flow state the user should be sent back to
    #[must_use]
    pub fn redirect(&self) -> FlowState {
        match self {
            MissingPrecondition::Stage
            | MissingPrecondition::AssessmentId
            | MissingPrecondition::Input => FlowState::NeedsStage,
            MissingPrecondition::CheckoutSession => FlowState::HasResult,
        }
    }
}
