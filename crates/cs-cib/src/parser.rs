//! ---
//! cs_section: "02-cib-model"
//! cs_subsection: "module"
//! cs_type: "source"
//! cs_scope: "code"
//! cs_description: "Extracts primitives from a CIB XML document."
//! cs_version: "v0.1.0"
//! cs_owner: "tbd"
//! ---
//! Discovery side of the model: `crm configure show xml` output in, primitives out.
//!
//! Any `<primitive>` element is picked up regardless of nesting depth (groups,
//! clones and master/slave sets included). A primitive whose direct parent is a
//! `<master>` element is reported promotable, and its promotion metadata is read
//! from the wrapper's own `<meta_attributes>`, never the primitive's.
//!
//! A primitive lacking `id`, `class` or `type` aborts the whole parse, as does
//! an `id` shared by two primitives.

use std::collections::BTreeSet;

use roxmltree::{Document, Node};
use tracing::debug;

use crate::errors::{CibError, Result};
use crate::model::{AttributeMap, OperationMap, Primitive, ResourceAgent};

const PRIMITIVE: &str = "primitive";
const PROMOTION_WRAPPER: &str = "master";
const INSTANCE_ATTRIBUTES: &str = "instance_attributes";
const META_ATTRIBUTES: &str = "meta_attributes";
const OPERATIONS: &str = "operations";

/// Parse every primitive found in `xml`, in document order.
pub fn parse_primitives(xml: &str) -> Result<Vec<Primitive>> {
    let document = Document::parse(xml)?;
    let primitives = document
        .descendants()
        .filter(|node| node.has_tag_name(PRIMITIVE))
        .map(primitive_from_node)
        .collect::<Result<Vec<_>>>()?;
    let mut seen = BTreeSet::new();
    for primitive in &primitives {
        if !seen.insert(primitive.name.as_str()) {
            return Err(CibError::DuplicatePrimitive(primitive.name.clone()));
        }
    }
    debug!(count = primitives.len(), "parsed primitives from configuration document");
    Ok(primitives)
}

fn primitive_from_node(node: Node<'_, '_>) -> Result<Primitive> {
    let name = required(node, PRIMITIVE, "id", || {
        format!("at byte {}", node.range().start)
    })?;
    let class = required(node, PRIMITIVE, "class", || format!("`{name}`"))?;
    let agent_type = required(node, PRIMITIVE, "type", || format!("`{name}`"))?;
    let agent = ResourceAgent::new(class, node.attribute("provider"), agent_type);

    let mut primitive = Primitive::new(name, agent);
    if let Some(set) = first_child(node, INSTANCE_ATTRIBUTES) {
        primitive.parameters = nvpairs(set);
    }
    if let Some(set) = first_child(node, META_ATTRIBUTES) {
        primitive.metadata = nvpairs(set);
    }
    if let Some(ops) = first_child(node, OPERATIONS) {
        primitive.operations = operations(ops, name)?;
    }

    if let Some(wrapper) = node
        .parent_element()
        .filter(|parent| parent.has_tag_name(PROMOTION_WRAPPER))
    {
        primitive.promotable = true;
        if let Some(set) = first_child(wrapper, META_ATTRIBUTES) {
            primitive.promotion_metadata = nvpairs(set);
        }
    }
    Ok(primitive)
}

fn required<'a>(
    node: Node<'a, '_>,
    element: &'static str,
    attribute: &'static str,
    context: impl FnOnce() -> String,
) -> Result<&'a str> {
    match node.attribute(attribute) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(CibError::MissingAttribute {
            element,
            attribute,
            context: context(),
        }),
    }
}

fn first_child<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|child| child.has_tag_name(tag))
}

fn nvpairs(set: Node<'_, '_>) -> AttributeMap {
    set.children()
        .filter(Node::is_element)
        .filter_map(|pair| {
            let name = pair.attribute("name")?;
            let value = pair.attribute("value").unwrap_or_default();
            Some((name.to_owned(), value.to_owned()))
        })
        .collect()
}

fn operations(ops: Node<'_, '_>, primitive: &str) -> Result<OperationMap> {
    let mut operations = OperationMap::new();
    for op in ops.children().filter(Node::is_element) {
        let name = required(op, "op", "name", || format!("of primitive `{primitive}`"))?;
        let attributes = op
            .attributes()
            .filter(|attr| !matches!(attr.name(), "id" | "name"))
            .map(|attr| (attr.name().to_owned(), attr.value().to_owned()))
            .collect();
        operations.insert(name.to_owned(), attributes);
    }
    Ok(operations)
}
