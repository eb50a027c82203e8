//! ---
//! cs_section: "04-reconciliation"
//! cs_subsection: "module"
//! cs_type: "source"
//! cs_scope: "code"
//! cs_description: "Reconciliation controller for Pacemaker primitives."
//! cs_version: "v0.1.0"
//! cs_owner: "tbd"
//! ---
//! Reconciles Pacemaker primitives through the crm shell.
//!
//! Discovery, staging and flushing go through [`PrimitiveProvider`]; the
//! caller owns the [`StagedState`] for the duration of a run.

pub mod command;
pub mod errors;
pub mod manifest;
pub mod plan;
pub mod provider;
pub mod readiness;
pub mod staging;

pub use command::{
    CommandOutput, CommandRunner, CrmShell, Invocation, RecordedCall, RecordingCommandRunner,
    SystemCommandRunner, SHADOW_ENV,
};
pub use errors::{CommandError, ProviderError, Result};
pub use manifest::{Manifest, ManifestEntry};
pub use plan::{apply_plan, plan, DesiredPrimitive, Ensure, FieldChange, PlannedAction, ReconcilePlan};
pub use provider::PrimitiveProvider;
pub use readiness::{DcVersionGate, NoopGate, ReadinessGate};
pub use staging::{PrimitiveRequest, StagedPrimitive, StagedState};
