//! Error Types
//!
//! Three layers of failure exist in the engine:
//!
//! - [`TemplateError`]: the static shape of a template is malformed. These are
//!   raised synchronously on the first render of a shape and are never retried.
//! - [`DomError`]: a tree operation was asked to do something impossible, such
//!   as inserting a node into its own descendant.
//! - [`RenderError`]: everything a render call can fail with, wrapping the two
//!   above plus value/part mismatches and directive misuse.

use thiserror::Error;

use crate::part::PartKind;

/// A structural problem with a template's static segments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("template strings must not contain the reserved character U+0001")]
    ReservedCharacter,

    #[error("expected {expected} dynamic value(s) for this template, found {found}")]
    ValueCountMismatch { expected: usize, found: usize },

    #[error("binding found inside a tag name")]
    MarkerInTagName,

    #[error("binding found inside attribute name `{0}`")]
    MarkerInAttributeName(String),

    #[error("binding found inside a comment")]
    MarkerInComment,

    #[error("binding found inside a markup declaration")]
    MarkerInDeclaration,

    #[error("binding found inside raw text element <{0}>")]
    MarkerInRawText(String),

    #[error("`{0}` binding must be the entire attribute value")]
    PartialBinding(String),

    #[error("binding markers out of order: expected {expected}, found {found}")]
    MarkerOrder { expected: usize, found: usize },

    #[error("expected {expected} binding(s) in the parsed template, found {found}")]
    MarkerCount { expected: usize, found: usize },

    #[error("unterminated tag at byte {0}")]
    UnterminatedTag(usize),

    #[error("unterminated comment at byte {0}")]
    UnterminatedComment(usize),

    #[error("unterminated raw text element <{0}>")]
    UnterminatedRawText(String),

    #[error("closing tag </{found}> does not match open element <{expected}>")]
    MismatchedEndTag { expected: String, found: String },

    #[error("closing tag </{0}> has no open element")]
    StrayEndTag(String),

    #[error("element <{0}> is never closed")]
    UnclosedElement(String),

    #[error("template path {0:?} does not resolve to a node")]
    InvalidPath(Vec<usize>),
}

/// A tree operation that cannot be performed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    #[error("reference node is not a child of the parent")]
    NotAChild,

    #[error("a node cannot be inserted into itself or one of its descendants")]
    HierarchyRequest,

    #[error("{0} nodes cannot have children")]
    NotAContainer(&'static str),

    #[error("part anchor is not attached to a parent node")]
    Detached,
}

/// Any failure of a render or update call.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Dom(#[from] DomError),

    #[error("{part} part cannot render a value of type {value}")]
    UnsupportedValue { part: PartKind, value: &'static str },

    #[error("directive `{directive}` cannot be used in a {part} part")]
    DirectiveMisuse {
        directive: &'static str,
        part: PartKind,
    },

    #[error("directive `{0}` received arguments of an unexpected type")]
    DirectiveArguments(&'static str),

    #[error("a directive resolved to another directive; nested directives are not supported")]
    NestedDirective,

    #[error("duplicate key `{0}` in keyed list")]
    DuplicateKey(String),

    #[error("asynchronous directives require a running Tokio runtime")]
    NoRuntime,
}
