//! ---
//! cs_section: "02-cib-model"
//! cs_subsection: "module"
//! cs_type: "source"
//! cs_scope: "code"
//! cs_description: "Error taxonomy for CIB parsing and agent references."
//! cs_version: "v0.1.0"
//! cs_owner: "tbd"
//! ---
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CibError>;

#[derive(Debug, Error)]
pub enum CibError {
    #[error("malformed configuration document: {0}")]
    Parse(#[from] roxmltree::Error),
    #[error("<{element}> {context} is missing mandatory attribute `{attribute}`")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
        context: String,
    },
    #[error("invalid resource agent reference `{0}`; expected class:[provider:]type")]
    InvalidAgent(String),
    #[error("primitive `{0}` is defined more than once")]
    DuplicatePrimitive(String),
}

impl CibError {
    /// True for errors raised by a structurally valid document whose entries fail validation.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CibError::MissingAttribute { .. } | CibError::DuplicatePrimitive(_)
        )
    }
}
