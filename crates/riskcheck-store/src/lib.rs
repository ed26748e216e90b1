//! riskcheck store - client-side state scopes
//!
//! Two scopes hold the pipeline's state: a short-lived one ([`SessionScope`],
//! or a [`FileScope`] under the temp dir for the CLI) and a durable one
//! ([`FileScope`]). [`Scopes`] gives typed access to both.
//!
//! # Example
//!
//! ```rust,ignore
//! use riskcheck_store::{FileScope, Scopes, SessionScope};
//! use std::sync::Arc;
//!
//! let scopes = Scopes::new(
//!     Arc::new(SessionScope::default()),
//!     Arc::new(FileScope::new("/var/lib/riskcheck/state.json")),
//! );
//! let id = scopes.resolve_assessment_id(None).await?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod error;
pub mod file;
pub mod keys;
pub mod memory;
pub mod repository;
pub mod scope;
pub mod session;

pub use error::{StoreError, StoreResult};
pub use file::FileScope;
pub use keys::StorageKey;
pub use memory::MemoryScope;
pub use repository::{AssessmentRepository, Scopes};
pub use scope::KeyValueScope;
pub use session::{SessionScope, DEFAULT_SESSION_IDLE};
