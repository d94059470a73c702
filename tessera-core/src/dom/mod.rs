//! Live Document Tree
//!
//! The engine renders into an in-process document model rather than a
//! browser. Nodes are shared handles: cloning a [`Node`] clones the handle,
//! not the subtree, and two handles compare equal only if they point at the
//! same node.
//!
//! # Locking
//!
//! Every node guards its own data with a mutex. Operations never hold two
//! node locks at once; anything that touches a parent and a child locks them
//! one after the other. Parents own their children, children only keep a weak
//! reference back to the parent.
//!
//! # Mutation Counting
//!
//! Every structural or data change increments a per-thread counter, readable
//! through [`mutation_count`]. Tests use it to check that re-committing an
//! unchanged value does not touch the tree.

mod event;
mod node;
mod serialize;

pub use event::{Event, EventCallback, EventListener, ListenerId, ListenerOptions};
pub use node::{mutation_count, Namespace, Node, NodeId, NodeType};
pub use serialize::strip_expression_markers;

/// Elements that never have children or a closing tag.
pub(crate) fn is_void_element(name: &str) -> bool {
    matches!(
        name,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

/// Elements whose content is kept as literal text.
pub(crate) fn is_raw_text_element(name: &str) -> bool {
    matches!(name, "script" | "style" | "textarea" | "title")
}
