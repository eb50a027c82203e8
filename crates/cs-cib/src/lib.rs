//! ---
//! cs_section: "02-cib-model"
//! cs_subsection: "module"
//! cs_type: "source"
//! cs_scope: "code"
//! cs_description: "Primitive model, CIB parser and crm statement builder."
//! cs_version: "v0.1.0"
//! cs_owner: "tbd"
//! ---
//! Declarative view of Pacemaker primitives.
//!
//! [`parse_primitives`] turns a CIB document into [`Primitive`] values and
//! [`ConfigurationUpdate`] turns a desired [`Primitive`] back into crm shell
//! statements ready for `crm configure load update`.

pub mod errors;
pub mod model;
pub mod parser;
pub mod statement;

pub use errors::{CibError, Result};
pub use model::{
    promotion_wrapper_name, AttributeMap, OperationMap, Primitive, ResourceAgent,
    PROMOTION_WRAPPER_PREFIX,
};
pub use parser::parse_primitives;
pub use statement::{Clause, ConfigurationUpdate, Statement};
