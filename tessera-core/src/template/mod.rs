//! Templates
//!
//! A [`Template`] is the compiled, shape-only form of a template's static
//! strings. It is built once per strings identity and shared by every render
//! of that shape.
//!
//! # How It Works
//!
//! 1. The static segments are joined with numbered markers
//!    (`\u{1}<index>\u{1}`) and parsed as markup once.
//!
//! 2. Each marker's syntactic position decides what kind of binding it is:
//!    element content becomes a child part, an attribute value becomes an
//!    attribute, property, boolean or event part depending on the name's
//!    sigil, and a lone marker among the attributes becomes an element part.
//!
//! 3. The result is a markup skeleton with binding attributes removed and a
//!    placeholder comment at every child binding, plus one
//!    [`PartDescriptor`] per binding site. Descriptors locate their node by a
//!    path of child indices, never by a live node reference.
//!
//! 4. [`TemplateInstance`] builds a fresh tree from the skeleton for each
//!    render site and resolves the paths to live parts.

mod cache;
mod instance;
mod parse;
mod strings;

use serde::Serialize;
use smallvec::SmallVec;

pub use cache::{cached_template_count, get_or_create_template};
pub use instance::TemplateInstance;
pub use strings::{split_holes, CallSite, StringsId, TemplateKind, TemplateResult, TemplateStrings};

use crate::dom::{Namespace, Node};
use crate::error::TemplateError;
use crate::part::PartKind;

/// Child indices leading from the skeleton roots to a node.
pub type NodePath = SmallVec<[usize; 8]>;

/// One node of a template skeleton.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkeletonNode {
    Element {
        name: String,
        namespace: Namespace,
        attributes: Vec<(String, String)>,
        children: Vec<SkeletonNode>,
    },
    Text(String),
    Comment(String),
}

impl SkeletonNode {
    /// Build a live copy of this node and its subtree.
    pub fn build(&self) -> Node {
        match self {
            SkeletonNode::Element {
                name,
                namespace,
                attributes,
                children,
            } => {
                let element = Node::element_ns(name, *namespace);
                for (key, value) in attributes {
                    element.set_attribute(key, value);
                }
                for child in children {
                    // A fresh element always accepts children.
                    let _ = element.append_child(&child.build());
                }
                element
            }
            SkeletonNode::Text(text) => Node::text(text),
            SkeletonNode::Comment(text) => Node::comment(text),
        }
    }
}

/// A binding site in a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PartDescriptor {
    /// Content inserted after the placeholder comment at `path`.
    Child { path: NodePath },
    /// Attribute value built from `strings` interleaved with one value per gap.
    Attribute {
        path: NodePath,
        name: String,
        strings: Vec<String>,
    },
    /// Property assigned from one value, or a string built like an attribute.
    Property {
        path: NodePath,
        name: String,
        strings: Vec<String>,
    },
    BooleanAttribute { path: NodePath, name: String },
    Event { path: NodePath, name: String },
    Element { path: NodePath },
}

impl PartDescriptor {
    pub fn kind(&self) -> PartKind {
        match self {
            PartDescriptor::Child { .. } => PartKind::Child,
            PartDescriptor::Attribute { .. } => PartKind::Attribute,
            PartDescriptor::Property { .. } => PartKind::Property,
            PartDescriptor::BooleanAttribute { .. } => PartKind::BooleanAttribute,
            PartDescriptor::Event { .. } => PartKind::Event,
            PartDescriptor::Element { .. } => PartKind::Element,
        }
    }

    pub fn path(&self) -> &[usize] {
        match self {
            PartDescriptor::Child { path }
            | PartDescriptor::Attribute { path, .. }
            | PartDescriptor::Property { path, .. }
            | PartDescriptor::BooleanAttribute { path, .. }
            | PartDescriptor::Event { path, .. }
            | PartDescriptor::Element { path } => path,
        }
    }

    /// How many dynamic values this site consumes.
    pub fn value_count(&self) -> usize {
        match self {
            PartDescriptor::Attribute { strings, .. } | PartDescriptor::Property { strings, .. } => {
                strings.len() - 1
            }
            _ => 1,
        }
    }
}

/// Compiled shape of a template.
#[derive(Debug)]
pub struct Template {
    kind: TemplateKind,
    skeleton: Vec<SkeletonNode>,
    parts: Vec<PartDescriptor>,
    value_count: usize,
}

impl Template {
    /// Parse a template's static segments.
    ///
    /// Prefer [`get_or_create_template`], which parses each strings identity
    /// only once.
    pub fn parse(strings: &TemplateStrings, kind: TemplateKind) -> Result<Self, TemplateError> {
        let parsed = parse::parse(strings.segments(), kind)?;
        Ok(Self {
            kind,
            skeleton: parsed.skeleton,
            parts: parsed.parts,
            value_count: strings.value_count(),
        })
    }

    pub fn kind(&self) -> TemplateKind {
        self.kind
    }

    pub fn skeleton(&self) -> &[SkeletonNode] {
        &self.skeleton
    }

    /// Binding sites in value order.
    pub fn parts(&self) -> &[PartDescriptor] {
        &self.parts
    }

    /// Number of dynamic values a result of this shape must carry.
    pub fn value_count(&self) -> usize {
        self.value_count
    }

    /// Build a fresh fragment holding a live copy of the skeleton.
    pub fn build_fragment(&self) -> Node {
        let fragment = Node::fragment();
        for node in &self.skeleton {
            let _ = fragment.append_child(&node.build());
        }
        fragment
    }
}

/// Follow `path` from the children of `root`.
pub(crate) fn resolve_path(root: &Node, path: &[usize]) -> Result<Node, TemplateError> {
    let mut current = root.clone();
    for &index in path {
        current = current
            .child(index)
            .ok_or_else(|| TemplateError::InvalidPath(path.to_vec()))?;
    }
    Ok(current)
}
