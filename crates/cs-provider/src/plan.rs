//! ---
//! cs_section: "04-reconciliation"
//! cs_subsection: "module"
//! cs_type: "source"
//! cs_scope: "code"
//! cs_description: "Deterministic diff of discovered against desired primitives."
//! cs_version: "v0.1.0"
//! cs_owner: "tbd"
//! ---
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use cs_cib::Primitive;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::command::CommandRunner;
use crate::errors::Result;
use crate::provider::PrimitiveProvider;
use crate::staging::{PrimitiveRequest, StagedState};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ensure {
    #[default]
    Present,
    Absent,
}

/// One entry of the desired state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DesiredPrimitive {
    Present(PrimitiveRequest),
    Absent(String),
}

impl DesiredPrimitive {
    pub fn name(&self) -> &str {
        match self {
            DesiredPrimitive::Present(request) => &request.name,
            DesiredPrimitive::Absent(name) => name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldChange {
    Agent,
    Parameters,
    Operations,
    Metadata,
    Promotable,
    PromotionMetadata,
}

impl fmt::Display for FieldChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FieldChange::Agent => "agent",
            FieldChange::Parameters => "parameters",
            FieldChange::Operations => "operations",
            FieldChange::Metadata => "metadata",
            FieldChange::Promotable => "promotable",
            FieldChange::PromotionMetadata => "promotion-metadata",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum PlannedAction {
    Create {
        primitive: Primitive,
        #[serde(skip_serializing_if = "Option::is_none")]
        shadow: Option<String>,
    },
    /// `primitive` is the discovered definition with the requested fields applied.
    Update {
        primitive: Primitive,
        #[serde(skip_serializing_if = "Option::is_none")]
        shadow: Option<String>,
        changes: Vec<FieldChange>,
    },
    /// Remove the `ms_<name>` wrapper ahead of any update of `name`.
    Demote { name: String },
    Destroy { name: String },
    Unchanged { name: String },
}

impl PlannedAction {
    pub fn name(&self) -> &str {
        match self {
            PlannedAction::Create { primitive, .. } | PlannedAction::Update { primitive, .. } => {
                &primitive.name
            }
            PlannedAction::Demote { name }
            | PlannedAction::Destroy { name }
            | PlannedAction::Unchanged { name } => name,
        }
    }

    pub fn is_noop(&self) -> bool {
        matches!(self, PlannedAction::Unchanged { .. })
    }
}

impl fmt::Display for PlannedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlannedAction::Create { primitive, .. } => {
                write!(f, "create {} ({})", primitive.name, primitive.agent)
            }
            PlannedAction::Update {
                primitive, changes, ..
            } => {
                let changes: Vec<String> = changes.iter().map(ToString::to_string).collect();
                write!(f, "update {} [{}]", primitive.name, changes.join(", "))
            }
            PlannedAction::Demote { name } => write!(f, "demote {name}"),
            PlannedAction::Destroy { name } => write!(f, "destroy {name}"),
            PlannedAction::Unchanged { name } => write!(f, "unchanged {name}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcilePlan {
    pub generated_at: DateTime<Utc>,
    pub actions: Vec<PlannedAction>,
}

impl ReconcilePlan {
    /// Actions that would contact the cluster.
    pub fn pending(&self) -> impl Iterator<Item = &PlannedAction> {
        self.actions.iter().filter(|action| !action.is_noop())
    }

    pub fn is_converged(&self) -> bool {
        self.pending().next().is_none()
    }
}

fn diff_fields(current: &Primitive, desired: &Primitive) -> Vec<FieldChange> {
    let mut changes = Vec::new();
    if current.agent != desired.agent {
        changes.push(FieldChange::Agent);
    }
    if current.parameters != desired.parameters {
        changes.push(FieldChange::Parameters);
    }
    if current.operations != desired.operations {
        changes.push(FieldChange::Operations);
    }
    if current.metadata != desired.metadata {
        changes.push(FieldChange::Metadata);
    }
    if current.promotable != desired.promotable {
        changes.push(FieldChange::Promotable);
    }
    if current.effective_promotion_metadata() != desired.effective_promotion_metadata() {
        changes.push(FieldChange::PromotionMetadata);
    }
    changes
}

/// Compare `discovered` against `desired`, one entry per desired name in
/// lexical order. Primitives the desired state does not mention are left alone.
pub fn plan(discovered: &[Primitive], desired: &[DesiredPrimitive]) -> ReconcilePlan {
    let current: BTreeMap<&str, &Primitive> = discovered
        .iter()
        .map(|primitive| (primitive.name.as_str(), primitive))
        .collect();
    let wanted: BTreeMap<&str, &DesiredPrimitive> =
        desired.iter().map(|entry| (entry.name(), entry)).collect();

    let mut actions = Vec::new();
    for (name, entry) in wanted {
        match (entry, current.get(name)) {
            (DesiredPrimitive::Present(request), None) => actions.push(PlannedAction::Create {
                primitive: request.to_primitive(),
                shadow: request.shadow.clone(),
            }),
            (DesiredPrimitive::Present(request), Some(existing)) => {
                let merged = request.merge_into(existing);
                let mut changes = diff_fields(existing, &merged);
                if existing.promotable && !merged.promotable {
                    actions.push(PlannedAction::Demote {
                        name: name.to_owned(),
                    });
                    changes.retain(|change| {
                        !matches!(change, FieldChange::Promotable | FieldChange::PromotionMetadata)
                    });
                    if changes.is_empty() {
                        continue;
                    }
                }
                if changes.is_empty() {
                    actions.push(PlannedAction::Unchanged {
                        name: name.to_owned(),
                    });
                } else {
                    actions.push(PlannedAction::Update {
                        primitive: merged,
                        shadow: request.shadow.clone(),
                        changes,
                    });
                }
            }
            (DesiredPrimitive::Absent(_), Some(_)) => actions.push(PlannedAction::Destroy {
                name: name.to_owned(),
            }),
            (DesiredPrimitive::Absent(_), None) => actions.push(PlannedAction::Unchanged {
                name: name.to_owned(),
            }),
        }
    }

    ReconcilePlan {
        generated_at: Utc::now(),
        actions,
    }
}

/// Execute `plan` in order, stopping at the first failure. Returns the
/// number of actions that contacted the cluster.
pub fn apply_plan<R: CommandRunner>(
    provider: &PrimitiveProvider<R>,
    state: &mut StagedState,
    plan: &ReconcilePlan,
) -> Result<usize> {
    let mut applied = 0;
    for action in plan.pending() {
        debug!(%action, "applying planned action");
        match action {
            PlannedAction::Create { primitive, shadow }
            | PlannedAction::Update {
                primitive, shadow, ..
            } => {
                let mut request = PrimitiveRequest::from(primitive.clone());
                request.shadow = shadow.clone();
                provider.create(state, request)?;
                provider.flush(state, &primitive.name)?;
            }
            PlannedAction::Demote { name } => provider.set_promotable(state, name, false)?,
            PlannedAction::Destroy { name } => provider.destroy(state, name)?,
            PlannedAction::Unchanged { .. } => continue,
        }
        applied += 1;
    }
    info!(applied, "reconcile plan applied");
    Ok(applied)
}
