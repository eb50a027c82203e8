//! ---
//! cs_section: "04-reconciliation"
//! cs_subsection: "module"
//! cs_type: "source"
//! cs_scope: "code"
//! cs_description: "Caller-owned staged state awaiting a flush."
//! cs_version: "v0.1.0"
//! cs_owner: "tbd"
//! ---
use std::collections::BTreeMap;

use cs_cib::{AttributeMap, OperationMap, Primitive, ResourceAgent};
use serde::{Deserialize, Serialize};

use crate::errors::{ProviderError, Result};

/// Desired values for one primitive. `None` fields are left as they are on the
/// cluster when merged over a discovered primitive, and empty on creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimitiveRequest {
    pub name: String,
    pub agent: ResourceAgent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<AttributeMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operations: Option<OperationMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<AttributeMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion_metadata: Option<AttributeMap>,
    /// Configuration shadow the update should be loaded into.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadow: Option<String>,
}

impl PrimitiveRequest {
    pub fn new(name: impl Into<String>, agent: ResourceAgent) -> Self {
        Self {
            name: name.into(),
            agent,
            parameters: None,
            operations: None,
            metadata: None,
            promotable: None,
            promotion_metadata: None,
            shadow: None,
        }
    }

    /// Reject requests lacking the fields that identify a primitive and its agent.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ProviderError::MissingField("name"));
        }
        if self.agent.class.trim().is_empty() {
            return Err(ProviderError::MissingField("class"));
        }
        if self.agent.agent_type.trim().is_empty() {
            return Err(ProviderError::MissingField("type"));
        }
        Ok(())
    }

    /// The primitive this request describes when nothing exists yet.
    pub fn to_primitive(&self) -> Primitive {
        self.merge_into(&Primitive::new(self.name.clone(), self.agent.clone()))
    }

    /// Overlay the requested fields on `base`, keeping whatever the request leaves unset.
    pub fn merge_into(&self, base: &Primitive) -> Primitive {
        let mut merged = base.clone();
        merged.name = self.name.clone();
        merged.agent = self.agent.clone();
        if let Some(parameters) = &self.parameters {
            merged.parameters = parameters.clone();
        }
        if let Some(operations) = &self.operations {
            merged.operations = operations.clone();
        }
        if let Some(metadata) = &self.metadata {
            merged.metadata = metadata.clone();
        }
        if let Some(promotable) = self.promotable {
            merged.promotable = promotable;
        }
        if let Some(promotion_metadata) = &self.promotion_metadata {
            merged.promotion_metadata = promotion_metadata.clone();
        }
        if !merged.promotable {
            merged.promotion_metadata.clear();
        }
        merged
    }
}

impl From<Primitive> for PrimitiveRequest {
    fn from(primitive: Primitive) -> Self {
        Self {
            name: primitive.name,
            agent: primitive.agent,
            parameters: Some(primitive.parameters),
            operations: Some(primitive.operations),
            metadata: Some(primitive.metadata),
            promotable: Some(primitive.promotable),
            promotion_metadata: Some(primitive.promotion_metadata),
            shadow: None,
        }
    }
}

/// A primitive held for the next flush, with the shadow it targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedPrimitive {
    primitive: Primitive,
    shadow: Option<String>,
    dirty: bool,
}

impl StagedPrimitive {
    /// Stage desired values; the next flush writes them.
    pub fn pending(primitive: Primitive, shadow: Option<String>) -> Self {
        let mut staged = Self {
            primitive,
            shadow,
            dirty: true,
        };
        staged.normalize();
        staged
    }

    /// Record what discovery reported; nothing is written until a setter changes it.
    pub fn discovered(primitive: Primitive) -> Self {
        Self {
            primitive,
            shadow: None,
            dirty: false,
        }
    }

    pub fn primitive(&self) -> &Primitive {
        &self.primitive
    }

    pub fn shadow(&self) -> Option<&str> {
        self.shadow.as_deref()
    }

    /// True when the staged values differ from what the cluster was last known to hold.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_agent(&mut self, agent: ResourceAgent) {
        self.primitive.agent = agent;
        self.dirty = true;
    }

    pub fn set_parameters(&mut self, parameters: AttributeMap) {
        self.primitive.parameters = parameters;
        self.dirty = true;
    }

    pub fn set_operations(&mut self, operations: OperationMap) {
        self.primitive.operations = operations;
        self.dirty = true;
    }

    pub fn set_metadata(&mut self, metadata: AttributeMap) {
        self.primitive.metadata = metadata;
        self.dirty = true;
    }

    pub fn set_promotion_metadata(&mut self, promotion_metadata: AttributeMap) {
        self.primitive.promotion_metadata = promotion_metadata;
        self.dirty = true;
        self.normalize();
    }

    pub fn set_shadow(&mut self, shadow: Option<String>) {
        self.shadow = shadow;
    }

    pub(crate) fn set_promotable(&mut self, promotable: bool) {
        self.primitive.promotable = promotable;
        self.dirty = true;
        self.normalize();
    }

    fn normalize(&mut self) {
        if !self.primitive.promotable {
            self.primitive.promotion_metadata.clear();
        }
    }
}

/// Everything one reconciliation run intends to write, keyed by primitive name.
///
/// Owned by the caller and lent mutably to each lifecycle operation, so a run
/// cannot flush the same primitive from two places at once.
#[derive(Debug, Clone, Default)]
pub struct StagedState {
    entries: BTreeMap<String, StagedPrimitive>,
}

impl StagedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the state with discovered primitives so later setters can update them.
    pub fn adopt_all(&mut self, primitives: impl IntoIterator<Item = Primitive>) {
        for primitive in primitives {
            self.adopt(primitive);
        }
    }

    pub fn adopt(&mut self, primitive: Primitive) {
        self.entries.insert(
            primitive.name.clone(),
            StagedPrimitive::discovered(primitive),
        );
    }

    pub fn stage(&mut self, staged: StagedPrimitive) {
        self.entries
            .insert(staged.primitive().name.clone(), staged);
    }

    pub fn get(&self, name: &str) -> Option<&StagedPrimitive> {
        self.entries.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut StagedPrimitive> {
        self.entries.get_mut(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<StagedPrimitive> {
        self.entries.remove(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Names with unflushed changes, in lexical order.
    pub fn dirty_names(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, staged)| staged.is_dirty())
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
