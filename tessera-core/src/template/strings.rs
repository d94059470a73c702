//! Template strings and results.
//!
//! A template's static segments carry an identity: every evaluation of the
//! same `html!` call site yields the same [`TemplateStrings`] handle, and
//! the template cache is keyed by that handle's [`StringsId`] rather than by
//! the text itself.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};

use crate::msgid::{generate_msg_id, MessageId};
use crate::value::Value;

/// Identity of one set of template strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StringsId(u64);

impl StringsId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Markup dialect of a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateKind {
    Html,
    Svg,
}

struct StringsInner {
    id: StringsId,
    segments: Box<[String]>,
}

/// The static segments of a template, with a stable identity.
///
/// Cloning shares the identity. Building a new value with
/// [`TemplateStrings::new`] always creates a fresh identity, even for
/// identical text.
#[derive(Clone)]
pub struct TemplateStrings(Arc<StringsInner>);

impl TemplateStrings {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            segments.push(String::new());
        }
        Self(Arc::new(StringsInner {
            id: StringsId::next(),
            segments: segments.into_boxed_slice(),
        }))
    }

    pub fn id(&self) -> StringsId {
        self.0.id
    }

    pub fn segments(&self) -> &[String] {
        &self.0.segments
    }

    /// Number of dynamic values these strings surround.
    pub fn value_count(&self) -> usize {
        self.0.segments.len() - 1
    }
}

impl PartialEq for TemplateStrings {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for TemplateStrings {}

impl fmt::Debug for TemplateStrings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateStrings")
            .field("id", &self.0.id)
            .field("segments", &self.0.segments)
            .finish()
    }
}

/// Per-call-site storage behind the `html!` and `svg!` macros.
///
/// The source literal is split into segments on first use and the resulting
/// [`TemplateStrings`] is reused for every later evaluation.
pub struct CallSite {
    source: &'static str,
    strings: OnceLock<TemplateStrings>,
}

impl CallSite {
    pub const fn new(source: &'static str) -> Self {
        Self {
            source,
            strings: OnceLock::new(),
        }
    }

    pub fn strings(&self) -> &TemplateStrings {
        self.strings
            .get_or_init(|| TemplateStrings::new(split_holes(self.source)))
    }
}

/// Split a macro literal at its `{}` holes. `{{` and `}}` stand for literal
/// braces.
pub fn split_holes(source: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    while let Some(ch) = chars.next() {
        match (ch, chars.peek()) {
            ('{', Some('{')) | ('}', Some('}')) => {
                chars.next();
                current.push(ch);
            }
            ('{', Some('}')) => {
                chars.next();
                segments.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    segments.push(current);
    segments
}

/// One evaluation of a template: its strings plus the values for its holes.
#[derive(Clone)]
pub struct TemplateResult {
    kind: TemplateKind,
    strings: TemplateStrings,
    values: Vec<Value>,
}

impl TemplateResult {
    pub fn new(kind: TemplateKind, strings: TemplateStrings, values: Vec<Value>) -> Self {
        Self {
            kind,
            strings,
            values,
        }
    }

    pub fn html(strings: TemplateStrings, values: Vec<Value>) -> Self {
        Self::new(TemplateKind::Html, strings, values)
    }

    pub fn svg(strings: TemplateStrings, values: Vec<Value>) -> Self {
        Self::new(TemplateKind::Svg, strings, values)
    }

    pub fn kind(&self) -> TemplateKind {
        self.kind
    }

    pub fn strings(&self) -> &TemplateStrings {
        &self.strings
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Localization id of this template's static text. Both dialects count
    /// as markup-tagged.
    pub fn message_id(&self) -> MessageId {
        generate_msg_id(self.strings.segments(), true)
    }
}

impl PartialEq for TemplateResult {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.strings == other.strings && self.values == other.values
    }
}

impl fmt::Debug for TemplateResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateResult")
            .field("kind", &self.kind)
            .field("strings", &self.strings.id())
            .field("values", &self.values)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_holes() {
        assert_eq!(split_holes("<p>{}</p>"), ["<p>", "</p>"]);
        assert_eq!(split_holes("{}{}"), ["", "", ""]);
        assert_eq!(split_holes("a {{b}} {}"), ["a {b} ", ""]);
        assert_eq!(split_holes("static"), ["static"]);
    }

    #[test]
    fn test_call_site_identity_is_stable() {
        static SITE: CallSite = CallSite::new("<b>{}</b>");

        let first = SITE.strings().clone();
        let second = SITE.strings().clone();

        assert_eq!(first, second);
        assert_eq!(first.value_count(), 1);
        assert_ne!(first, TemplateStrings::new(["<b>", "</b>"]));
    }

    #[test]
    fn test_message_id_ignores_values() {
        let strings = TemplateStrings::new(["Hello ", "!"]);
        let a = TemplateResult::html(strings.clone(), vec![Value::from("a")]);
        let b = TemplateResult::html(strings, vec![Value::from("b")]);

        assert_eq!(a.message_id(), b.message_id());
        assert_eq!(a.message_id().as_str(), "0h00ad08ebae1e0f74");
    }

    #[test]
    fn test_svg_message_id_is_markup_kind() {
        let strings = TemplateStrings::new(["Hello ", "!"]);

        let svg = TemplateResult::svg(strings.clone(), vec![Value::from("a")]);
        let html = TemplateResult::html(strings, vec![Value::from("a")]);

        assert_eq!(svg.message_id(), html.message_id());
        assert!(svg.message_id().as_str().starts_with("0h"));
    }
}
