//! riskcheck client - result reconciliation against the compliance backend
//!
//! The backend is the authority on which tier an assessment has unlocked;
//! the client caches results and inputs locally and reconciles them on every
//! result page load:
//!
//! 1. read the cached assessment id, result and tier
//! 2. fetch the authoritative tier and creation time
//! 3. re-assess from the cached input
//! 4. store the fresh result
//!
//! Any failure after step 1 leaves the cached result in place and the page is
//! still rendered from it.
//!
//! # Example
//!
//! ```rust,ignore
//! use riskcheck_client::prelude::*;
//!
//! let config = ClientConfig::load(None)?;
//! let client = Client::from_config(&config, Scopes::in_memory())?;
//! match client.reconciler().load_page(None, chrono::Utc::now()).await? {
//!     ResultPage::Ready { view, .. } => println!("{}", view.title),
//!     other => println!("{other:?}"),
//! }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod intake;
pub mod payments;
pub mod reconcile;

pub use api::{AssessRequest, ComplianceBackend, HttpBackend};
pub use client::Client;
pub use config::ClientConfig;
pub use error::{ApiError, ClientError, ClientResult};
pub use intake::Intake;
pub use payments::{PaymentOutcome, Payments};
pub use reconcile::{Authority, CachedState, Reconciler, RefreshOutcome, ResultPage, StaleReason};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the riskcheck client
    pub use crate::{
        Client, ClientConfig, ClientError, ClientResult, Intake, PaymentOutcome, Payments, Reconciler, RefreshOutcome,
        ResultPage,
    };
    pub use riskcheck_core::prelude::*;
    pub use riskcheck_store::Scopes;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
