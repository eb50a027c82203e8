//! ---
//! cs_section: "04-reconciliation"
//! cs_subsection: "module"
//! cs_type: "source"
//! cs_scope: "code"
//! cs_description: "TOML manifest describing the desired primitives."
//! cs_version: "v0.1.0"
//! cs_owner: "tbd"
//! ---
//! Desired-state manifests.
//!
//! ```toml
//! [primitives.web1]
//! agent = "ocf:heartbeat:IPaddr2"
//! parameters = { ip = "10.0.0.5" }
//! operations.monitor = { interval = "10s" }
//!
//! [primitives.legacy]
//! ensure = "absent"
//! ```
//!
//! Attribute values are strings; entries keep the order they were written in.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use cs_cib::{AttributeMap, OperationMap, ResourceAgent};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::errors::{ProviderError, Result};
use crate::plan::{DesiredPrimitive, Ensure};
use crate::staging::PrimitiveRequest;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub primitives: IndexMap<String, ManifestEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestEntry {
    /// `class:[provider:]type`; alternative to the three fields below.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub agent_type: Option<String>,
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
    /// Configuration shadow to load this primitive into.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cib: Option<String>,
    #[serde(default)]
    pub ensure: Ensure,
}

impl ManifestEntry {
    fn resolve_agent(&self, name: &str) -> Result<ResourceAgent> {
        let invalid = |reason: String| ProviderError::Manifest {
            name: name.to_owned(),
            reason,
        };
        let split = self.class.is_some() || self.provider.is_some() || self.agent_type.is_some();
        match (&self.agent, split) {
            (Some(_), true) => Err(invalid(
                "set either `agent` or `class`/`provider`/`type`, not both".to_owned(),
            )),
            (Some(agent), false) => agent.parse().map_err(|err| invalid(format!("{err}"))),
            (None, _) => {
                let class = self
                    .class
                    .as_deref()
                    .ok_or_else(|| invalid("missing `agent` or `class`".to_owned()))?;
                let agent_type = self
                    .agent_type
                    .as_deref()
                    .ok_or_else(|| invalid("missing `type`".to_owned()))?;
                Ok(ResourceAgent::new(class, self.provider.as_deref(), agent_type))
            }
        }
    }

    fn to_request(&self, name: &str) -> Result<PrimitiveRequest> {
        let mut request = PrimitiveRequest::new(name, self.resolve_agent(name)?);
        request.parameters = self.parameters.clone();
        request.operations = self.operations.clone();
        request.metadata = self.metadata.clone();
        request.promotable = self.promotable;
        request.promotion_metadata = self.promotion_metadata.clone();
        request.shadow = self.cib.clone();
        request.validate()?;
        Ok(request)
    }
}

impl Manifest {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|err| ProviderError::Manifest {
            name: path.display().to_string(),
            reason: err.to_string(),
        })?;
        content.parse()
    }

    /// Resolve every entry into a desired primitive, in manifest order.
    pub fn desired(&self) -> Result<Vec<DesiredPrimitive>> {
        self.primitives
            .iter()
            .map(|(name, entry)| match entry.ensure {
                Ensure::Absent => Ok(DesiredPrimitive::Absent(name.clone())),
                Ensure::Present => entry.to_request(name).map(DesiredPrimitive::Present),
            })
            .collect()
    }
}

impl FromStr for Manifest {
    type Err = ProviderError;

    fn from_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"
[primitives.web1]
agent = "ocf:heartbeat:IPaddr2"
parameters = { ip = "10.0.0.5", cidr_netmask = "24" }
operations.monitor = { interval = "10s", timeout = "20s" }
cib = "staging"

[primitives.db]
class = "ocf"
provider = "linbit"
type = "drbd"
promotable = true
promotion_metadata = { notify = "true" }

[primitives.old]
ensure = "absent"
"#;

    #[test]
    fn parses_entries_in_written_order() {
        let manifest: Manifest = MANIFEST.parse().unwrap();
        let names: Vec<&str> = manifest.primitives.keys().map(String::as_str).collect();
        assert_eq!(names, ["web1", "db", "old"]);

        let desired = manifest.desired().unwrap();
        let DesiredPrimitive::Present(web1) = &desired[0] else {
            panic!("web1 should be present");
        };
        assert_eq!(web1.agent.to_string(), "ocf:heartbeat:IPaddr2");
        assert_eq!(web1.shadow.as_deref(), Some("staging"));
        assert_eq!(web1.operations.as_ref().unwrap()["monitor"]["timeout"], "20s");
        assert!(web1.metadata.is_none());

        let DesiredPrimitive::Present(db) = &desired[1] else {
            panic!("db should be present");
        };
        assert_eq!(db.agent.provider.as_deref(), Some("linbit"));
        assert!(db.to_primitive().promotable);
        assert_eq!(desired[2], DesiredPrimitive::Absent("old".into()));
    }

    #[test]
    fn rejects_conflicting_agent_forms() {
        let manifest: Manifest = r#"
[primitives.web1]
agent = "ocf:heartbeat:IPaddr2"
class = "ocf"
"#
        .parse()
        .unwrap();
        let err = manifest.desired().unwrap_err();
        assert!(matches!(err, ProviderError::Manifest { name, .. } if name == "web1"));
    }

    #[test]
    fn rejects_missing_type() {
        let manifest: Manifest = "[primitives.web1]\nclass = \"ocf\"\n".parse().unwrap();
        let err = manifest.desired().unwrap_err();
        assert!(err.to_string().contains("missing `type`"));
    }

    #[test]
    fn rejects_bad_agent_and_unknown_keys() {
        let manifest: Manifest = "[primitives.web1]\nagent = \"ocf::IPaddr2\"\n".parse().unwrap();
        assert!(manifest.desired().is_err());

        let err = "[primitives.web1]\nagnet = \"ocf:heartbeat:IPaddr2\"\n"
            .parse::<Manifest>()
            .unwrap_err();
        assert!(matches!(err, ProviderError::ManifestSyntax(_)));
    }
}
