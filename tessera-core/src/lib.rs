//! Tessera Core
//!
//! This crate provides the template engine behind the Tessera templating
//! library. It implements:
//!
//! - Template analysis: static strings parsed once into a cached skeleton
//!   with typed binding sites
//! - Instantiation and part updates with per-site change detection
//! - A directive runtime, with async and keyed-list directives built in
//! - Message ids for localizing template text
//! - A small in-process document tree to render into
//!
//! # Architecture
//!
//! - `template`: strings identity, the analyzer, the template cache and
//!   template instances
//! - `part`: live binding sites and their commit rules
//! - `directive`: the directive trait, its lifecycle and shipped directives
//! - `dom`: nodes, attributes, properties and events
//! - `statics`: static values merged into template strings
//! - `msgid`: FNV-based message ids
//!
//! # Example
//!
//! ```rust,ignore
//! use tessera_core::{html, render, RenderOptions};
//! use tessera_core::dom::{strip_expression_markers, Node};
//!
//! fn greeting(name: &str) -> tessera_core::TemplateResult {
//!     html!("<p class=\"greeting\">Hello {}!</p>", name)
//! }
//!
//! let container = Node::element("div");
//! render(greeting("world"), &container, &RenderOptions::default())?;
//!
//! // Same call site, same template: only the text node changes.
//! render(greeting("there"), &container, &RenderOptions::default())?;
//! assert_eq!(
//!     strip_expression_markers(&container.inner_html()),
//!     "<p class=\"greeting\">Hello there!</p>"
//! );
//! ```

pub mod directive;
pub mod dom;
pub mod msgid;
pub mod part;
pub mod statics;
pub mod template;

mod error;
mod render;
mod value;

pub use directive::{
    async_append, async_append_with, async_replace, async_replace_with, repeat, AsyncSource,
    Directive, DirectivePart, DirectiveResult,
};
pub use error::{DomError, RenderError, TemplateError};
pub use msgid::{generate_msg_id, MessageId};
pub use render::{render, RenderOptions, RootPart};
pub use template::{TemplateKind, TemplateResult};
pub use value::Value;

/// Build an HTML [`TemplateResult`].
///
/// The literal is the template's static text with `{}` marking each hole;
/// `{{` and `}}` stand for literal braces. Every evaluation of the same
/// macro invocation shares one strings identity, so it compiles once.
///
/// ```rust,ignore
/// let row = html!("<li class={}>{}</li>", class, label);
/// ```
#[macro_export]
macro_rules! html {
    ($source:literal $(, $value:expr)* $(,)?) => {{
        static SITE: $crate::template::CallSite = $crate::template::CallSite::new($source);
        $crate::template::TemplateResult::new(
            $crate::template::TemplateKind::Html,
            SITE.strings().clone(),
            ::std::vec![$($crate::Value::from($value)),*],
        )
    }};
}

/// Build an SVG [`TemplateResult`]; see [`html!`].
#[macro_export]
macro_rules! svg {
    ($source:literal $(, $value:expr)* $(,)?) => {{
        static SITE: $crate::template::CallSite = $crate::template::CallSite::new($source);
        $crate::template::TemplateResult::new(
            $crate::template::TemplateKind::Svg,
            SITE.strings().clone(),
            ::std::vec![$($crate::Value::from($value)),*],
        )
    }};
}
