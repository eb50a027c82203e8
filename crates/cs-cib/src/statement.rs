//! ---
//! cs_section: "02-cib-model"
//! cs_subsection: "module"
//! cs_type: "source"
//! cs_scope: "code"
//! cs_description: "Builds crm configuration statements from primitives."
//! cs_version: "v0.1.0"
//! cs_owner: "tbd"
//! ---
//! The crm shell parses a definition positionally, so clause order is fixed:
//! header, operations, parameters, metadata. A promotable primitive is followed
//! by a second `ms` statement on its own line wrapping it as `ms_<name>`.

use std::fmt;

use crate::model::{AttributeMap, Primitive, ResourceAgent};

/// A single clause of a configuration statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    /// `primitive <name> <class>:[<provider>:]<type>`
    Primitive { name: String, agent: ResourceAgent },
    /// `ms <wrapper> <primitive>`
    PromotionWrapper { wrapper: String, primitive: String },
    /// `op <name> k=v ...`
    Operation { name: String, attributes: AttributeMap },
    /// `params k=v ...`
    Parameters(AttributeMap),
    /// `meta k=v ...`
    Metadata(AttributeMap),
}

/// One line of the configuration language: a header clause followed by body clauses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    clauses: Vec<Clause>,
}

impl Statement {
    fn new(header: Clause) -> Self {
        Self {
            clauses: vec![header],
        }
    }

    fn push(&mut self, clause: Clause) {
        self.clauses.push(clause);
    }

    /// Append `clause` built from `attributes` only when there is something to say.
    fn push_non_empty(&mut self, attributes: &AttributeMap, clause: fn(AttributeMap) -> Clause) {
        if !attributes.is_empty() {
            self.push(clause(attributes.clone()));
        }
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }
}

/// The full text handed to `crm configure load update` for one primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationUpdate {
    statements: Vec<Statement>,
}

impl ConfigurationUpdate {
    /// Compose the statements defining `primitive` (and its wrapper when promotable).
    pub fn for_primitive(primitive: &Primitive) -> Self {
        let mut definition = Statement::new(Clause::Primitive {
            name: primitive.name.clone(),
            agent: primitive.agent.clone(),
        });
        for (name, attributes) in &primitive.operations {
            definition.push(Clause::Operation {
                name: name.clone(),
                attributes: attributes.clone(),
            });
        }
        definition.push_non_empty(&primitive.parameters, Clause::Parameters);
        definition.push_non_empty(&primitive.metadata, Clause::Metadata);

        let mut statements = vec![definition];
        if let Some(promotion_metadata) = primitive.effective_promotion_metadata() {
            let mut wrapper = Statement::new(Clause::PromotionWrapper {
                wrapper: primitive.wrapper_name(),
                primitive: primitive.name.clone(),
            });
            wrapper.push_non_empty(promotion_metadata, Clause::Metadata);
            statements.push(wrapper);
        }
        Self { statements }
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// Render the update as the crm shell expects it, one statement per line.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Clause::Primitive { name, agent } => write!(f, "primitive {name} {agent}"),
            Clause::PromotionWrapper { wrapper, primitive } => {
                write!(f, "ms {wrapper} {primitive}")
            }
            Clause::Operation { name, attributes } => {
                write!(f, "op {name}")?;
                write_pairs(f, attributes)
            }
            Clause::Parameters(attributes) => {
                f.write_str("params")?;
                write_pairs(f, attributes)
            }
            Clause::Metadata(attributes) => {
                f.write_str("meta")?;
                write_pairs(f, attributes)
            }
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, clause) in self.clauses.iter().enumerate() {
            if index > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{clause}")?;
        }
        Ok(())
    }
}

impl fmt::Display for ConfigurationUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for statement in &self.statements {
            writeln!(f, "{statement}")?;
        }
        Ok(())
    }
}

fn write_pairs(f: &mut fmt::Formatter<'_>, attributes: &AttributeMap) -> fmt::Result {
    for (key, value) in attributes {
        write!(f, " {key}={}", quote_value(value))?;
    }
    Ok(())
}

fn quote_value(value: &str) -> std::borrow::Cow<'_, str> {
    let needs_quotes = value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '\\'));
    if !needs_quotes {
        return value.into();
    }
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '\\') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted.into()
}
