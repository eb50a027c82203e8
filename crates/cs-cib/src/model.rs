//! ---
//! cs_section: "02-cib-model"
//! cs_subsection: "module"
//! cs_type: "source"
//! cs_scope: "code"
//! cs_description: "In-memory model of cluster primitives and their attribute sets."
//! cs_version: "v0.1.0"
//! cs_owner: "tbd"
//! ---
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::CibError;

/// Open-ended attribute bag (`name=value`). Ordered lexically so rendering is reproducible.
pub type AttributeMap = BTreeMap<String, String>;

/// Operation name (`monitor`, `start`, ...) mapped to its attributes (`interval`, `timeout`, ...).
pub type OperationMap = BTreeMap<String, AttributeMap>;

/// Prefix of the master/slave wrapper generated for promotable primitives.
pub const PROMOTION_WRAPPER_PREFIX: &str = "ms_";

/// Name of the promotion wrapper owning `primitive`.
pub fn promotion_wrapper_name(primitive: &str) -> String {
    format!("{PROMOTION_WRAPPER_PREFIX}{primitive}")
}

/// The `class:[provider:]type` triple naming the agent that implements a primitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceAgent {
    pub class: String,
    pub provider: Option<String>,
    pub agent_type: String,
}

impl ResourceAgent {
    pub fn new(
        class: impl Into<String>,
        provider: Option<impl Into<String>>,
        agent_type: impl Into<String>,
    ) -> Self {
        Self {
            class: class.into(),
            provider: provider.map(Into::into),
            agent_type: agent_type.into(),
        }
    }
}

impl fmt::Display for ResourceAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.provider {
            Some(provider) => write!(f, "{}:{}:{}", self.class, provider, self.agent_type),
            None => write!(f, "{}:{}", self.class, self.agent_type),
        }
    }
}

impl FromStr for ResourceAgent {
    type Err = CibError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segments: Vec<&str> = s.split(':').collect();
        if segments.iter().any(|segment| segment.trim().is_empty()) {
            return Err(CibError::InvalidAgent(s.to_owned()));
        }
        match segments.as_slice() {
            [class, agent_type] => Ok(Self::new(*class, None::<String>, *agent_type)),
            [class, provider, agent_type] => Ok(Self::new(*class, Some(*provider), *agent_type)),
            _ => Err(CibError::InvalidAgent(s.to_owned())),
        }
    }
}

impl TryFrom<String> for ResourceAgent {
    type Error = CibError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ResourceAgent> for String {
    fn from(agent: ResourceAgent) -> Self {
        agent.to_string()
    }
}

/// One managed cluster resource as it appears in (or should appear in) the CIB.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Primitive {
    pub name: String,
    pub agent: ResourceAgent,
    #[serde(default)]
    pub parameters: AttributeMap,
    #[serde(default)]
    pub operations: OperationMap,
    #[serde(default)]
    pub metadata: AttributeMap,
    #[serde(default)]
    pub promotable: bool,
    /// Attributes of the `ms_<name>` wrapper. Only meaningful while `promotable` is set.
    #[serde(default)]
    pub promotion_metadata: AttributeMap,
}

impl Primitive {
    /// A primitive with empty attribute sets that is not promotable.
    pub fn new(name: impl Into<String>, agent: ResourceAgent) -> Self {
        Self {
            name: name.into(),
            agent,
            parameters: AttributeMap::new(),
            operations: OperationMap::new(),
            metadata: AttributeMap::new(),
            promotable: false,
            promotion_metadata: AttributeMap::new(),
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_operation<K, V>(
        mut self,
        name: impl Into<String>,
        attributes: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let attributes = attributes
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.operations.insert(name.into(), attributes);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Mark the primitive promotable and attach wrapper metadata.
    pub fn promoted(mut self, promotion_metadata: AttributeMap) -> Self {
        self.promotable = true;
        self.promotion_metadata = promotion_metadata;
        self
    }

    /// Name of the promotion wrapper this primitive would be wrapped in.
    pub fn wrapper_name(&self) -> String {
        promotion_wrapper_name(&self.name)
    }

    /// Promotion metadata as it takes effect: always empty for non-promotable primitives.
    pub fn effective_promotion_metadata(&self) -> Option<&AttributeMap> {
        self.promotable.then_some(&self.promotion_metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_display_omits_absent_provider() {
        let agent = ResourceAgent::new("stonith", None::<String>, "fence_ipmilan");
        assert_eq!(agent.to_string(), "stonith:fence_ipmilan");
        let agent = ResourceAgent::new("ocf", Some("heartbeat"), "IPaddr2");
        assert_eq!(agent.to_string(), "ocf:heartbeat:IPaddr2");
    }

    #[test]
    fn agent_parse_accepts_two_and_three_segments() {
        let agent: ResourceAgent = "lsb:nginx".parse().unwrap();
        assert_eq!(agent.provider, None);
        assert_eq!(agent.agent_type, "nginx");

        let agent: ResourceAgent = "ocf:pacemaker:Stateful".parse().unwrap();
        assert_eq!(agent.provider.as_deref(), Some("pacemaker"));
    }

    #[test]
    fn agent_parse_rejects_malformed_references() {
        for raw in ["ocf", "ocf::IPaddr2", "a:b:c:d", ""] {
            assert!(
                matches!(raw.parse::<ResourceAgent>(), Err(CibError::InvalidAgent(_))),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn promotion_metadata_hidden_when_not_promotable() {
        let mut primitive = Primitive::new("db", "ocf:heartbeat:pgsql".parse().unwrap());
        primitive
            .promotion_metadata
            .insert("notify".into(), "true".into());
        assert!(primitive.effective_promotion_metadata().is_none());
        primitive.promotable = true;
        assert_eq!(primitive.effective_promotion_metadata().unwrap().len(), 1);
        assert_eq!(primitive.wrapper_name(), "ms_db");
    }
}
