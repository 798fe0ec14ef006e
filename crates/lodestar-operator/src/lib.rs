//! # lodestar Operator
//!
//! Reconciliation engine for declarative `TrainingJob` objects: watches
//! desired state in the datastore and drives the remote managed
//! training-job API (create/describe/stop) toward it, continuously
//! reconciling drift and reporting observed status back.
//!
//! The engine is a library: an external dispatcher delivers one
//! invocation per object at a time and acts on the returned requeue
//! directive. A pass holds no state between invocations and always
//! re-describes the remote job before acting, so invocations may arrive
//! at arbitrary times with no ordering guarantees.
//!
//! ## Architecture
//!
//! ```text
//! dispatcher ──► TrainingJobReconciler ──► Outcome (requeue directive)
//!                     │
//!        ┌────────────┼──────────────┐
//!        ▼            ▼              ▼
//!    JobStore    TrainingJobApi  RegionResolver
//!   (datastore)  (remote jobs)   (per-region config)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use lodestar_core::ResourceKey;
//! use lodestar_operator::{OperatorConfig, PgJobStore, TrainingJobReconciler};
//! use lodestar_remote::{HttpApiProvider, StaticRegionResolver};
//!
//! let store = Arc::new(PgJobStore::new(pool));
//! let reconciler = TrainingJobReconciler::new(
//!     store,
//!     StaticRegionResolver::new(),
//!     HttpApiProvider,
//!     OperatorConfig::from_env()?,
//! );
//!
//! let outcome = reconciler.reconcile(&ResourceKey::new("team-a", "mnist")).await;
//! ```

pub mod compare;
pub mod config;
pub mod engine;
pub mod error;
pub mod finalizer;
pub mod object;
pub mod requeue;
pub mod status;
pub mod store;

// Re-exports for convenience
pub use compare::{drift_failure_message, spec_matches_description, FieldDifference, SpecComparison};
pub use config::{ConfigError, OperatorConfig, DEFAULT_FINALIZER};
pub use engine::TrainingJobReconciler;
pub use error::{ReconcileError, ReconcileResult};
pub use object::{ObjectMeta, OutputLocation, TrainingJob, TrainingJobSpec, TrainingJobStatus};
pub use requeue::{Directive, Outcome};
pub use status::{
    failed_status, initializing_status, log_url_for, model_artifact_path,
    status_from_description, StatusWriter, INITIALIZING_STATUS, MODEL_ARTIFACT_SUFFIX,
};
pub use store::memory::InMemoryJobStore;
pub use store::pg::PgJobStore;
pub use store::{JobStore, StoreError, StoreResult};
