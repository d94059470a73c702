//! Rendering into a container.
//!
//! [`render`] is the entry point. The first call for a container inserts a
//! marker comment and creates a [`RootPart`] that owns everything after it;
//! the part is stored on the container (or on the `render_before` anchor) so
//! later calls find it and update in place.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::dom::Node;
use crate::error::RenderError;
use crate::part::ChildPart;
use crate::template::Template;
use crate::value::Value;

/// Options for [`render`].
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Render before this child of the container instead of at its end.
    pub render_before: Option<Node>,
    /// Initial connection state of a newly created root part.
    pub is_connected: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            render_before: None,
            is_connected: true,
        }
    }
}

impl RenderOptions {
    pub fn render_before(mut self, node: &Node) -> Self {
        self.render_before = Some(node.clone());
        self
    }

    pub fn connected(mut self, connected: bool) -> Self {
        self.is_connected = connected;
        self
    }
}

/// The top-level child part of a container.
#[derive(Clone)]
pub struct RootPart {
    part: ChildPart,
}

impl RootPart {
    pub fn part(&self) -> &ChildPart {
        &self.part
    }

    /// Render `value` into this root, as a further [`render`] call would.
    pub fn set_value(&self, value: impl Into<Value>) -> Result<(), RenderError> {
        self.part.set_value(value.into())
    }

    /// Propagate a connection change to every part and directive below.
    pub fn set_connected(&self, connected: bool) {
        debug!(connected, "setting root connection state");
        self.part.set_connected(connected);
    }

    pub fn is_connected(&self) -> bool {
        self.part.is_connected()
    }

    /// Template of the instance currently rendered at the root, if any.
    pub fn template(&self) -> Option<Arc<Template>> {
        self.part.template()
    }

    /// Tear down everything rendered here, disposing every nested directive.
    /// The root stays usable; the next render starts from scratch.
    pub fn dispose(&self) {
        self.part.reset();
    }
}

impl std::fmt::Debug for RootPart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootPart")
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

/// Render `value` into `container`.
///
/// The first call creates the root part; later calls for the same container
/// (and `render_before` anchor) update it, reusing the rendered template
/// instance when the template is the same.
///
/// # Example
///
/// ```rust,ignore
/// let container = Node::element("div");
/// render(html!("<p>{}</p>", "hi"), &container, &RenderOptions::default())?;
/// assert_eq!(strip_expression_markers(&container.inner_html()), "<p>hi</p>");
/// ```
#[instrument(level = "debug", skip_all, fields(container = container.id().as_u64()))]
pub fn render(
    value: impl Into<Value>,
    container: &Node,
    options: &RenderOptions,
) -> Result<RootPart, RenderError> {
    let owner = options.render_before.as_ref().unwrap_or(container);
    let root = match owner.expando::<RootPart>() {
        Some(root) => root,
        None => {
            let marker = Node::comment("");
            container.insert_before(&marker, options.render_before.as_ref())?;
            let root = RootPart {
                part: ChildPart::new(marker, options.render_before.clone(), options.is_connected),
            };
            owner.set_expando(root.clone());
            debug!("created root part");
            root
        }
    };
    root.set_value(value)?;
    Ok(root)
}
