//! riskcheck core - assessment model and result derivations
//!
//! Everything here is synchronous and free of I/O:
//! - the assessment wire model and tier ordering
//! - the unlock gate and upsell cards
//! - action bucketing, reasons and enforcement narrative for the result page
//! - re-evaluation expiry
//! - the intake flow state machine
//!
//! # Example
//!
//! ```rust,ignore
//! use riskcheck_core::prelude::*;
//!
//! let result: AssessmentResult = serde_json::from_str(raw)?;
//! let ctx = ViewContext::new(Tier::None, chrono::Utc::now());
//! let view = ResultView::assemble(&result, &ctx, ActionRules::builtin());
//! assert_eq!(view.visible, result.required_tier() == Tier::None);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod error;
pub mod expiry;
pub mod flow;
pub mod gate;
pub mod intake;
pub mod labels;
pub mod rules;
pub mod tier;
pub mod types;
pub mod view;

pub use error::{FlowError, MissingPrecondition, RulesError};
pub use flow::{Flow, FlowState};
pub use gate::{PriceCard, LOCKED_DETAIL};
pub use intake::{IncomeBounds, Stage, UnknownStage};
pub use rules::{ActionRules, Bucket, RuleSpec, RuleTable};
pub use tier::Tier;
pub use types::{
    AssessmentInput, AssessmentRecord, AssessmentResult, CheckoutRequest, CheckoutSession, DecisionSummary,
    ExpertPack, Finding, Grade, InputEcho, PaymentStatus, RiskLevel, RiskStage, Severity,
};
pub use view::{ActionBuckets, EnforcementNarrative, FindingView, PaidSections, ResultView, ViewContext};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with riskcheck core
    pub use crate::{
        ActionRules, AssessmentInput, AssessmentRecord, AssessmentResult, Bucket, Finding, Flow, FlowState,
        ResultView, RiskLevel, Severity, Stage, Tier, ViewContext,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
