//! Static values: text spliced into a template's strings before parsing.
//!
//! A binding can only stand for a value, never for markup structure such as
//! a tag name. [`with_static`] works around that by folding static
//! interpolations into the neighbouring segments, producing a template whose
//! strings already contain them.
//!
//! Merged strings are cached by their segments, so every call that merges to
//! the same segments yields the same [`TemplateStrings`] identity and hits the
//! template cache. Static text is trusted markup; never build it from user
//! input.

use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use tracing::trace;

use crate::error::TemplateError;
use crate::template::{TemplateKind, TemplateResult, TemplateStrings};
use crate::value::Value;

/// Text that is merged into template strings rather than bound.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StaticValue(Arc<str>);

impl StaticValue {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Mark `text` as static markup.
pub fn unsafe_static(text: impl AsRef<str>) -> StaticValue {
    StaticValue(Arc::from(text.as_ref()))
}

/// Build a static value from literal segments joined by other static values.
///
/// ```rust,ignore
/// let tag = literal(&["my-", ""], &[unsafe_static("button")]);
/// assert_eq!(tag.as_str(), "my-button");
/// ```
pub fn literal(strings: &[&str], statics: &[StaticValue]) -> StaticValue {
    let mut text = strings.first().copied().unwrap_or_default().to_owned();
    for (value, segment) in statics.iter().zip(strings.iter().skip(1)) {
        text.push_str(value.as_str());
        text.push_str(segment);
    }
    StaticValue(Arc::from(text))
}

/// One interpolation passed to [`with_static`].
#[derive(Debug, Clone)]
pub enum Interpolation {
    Static(StaticValue),
    Value(Value),
}

impl Interpolation {
    pub fn value(value: impl Into<Value>) -> Self {
        Interpolation::Value(value.into())
    }
}

impl From<StaticValue> for Interpolation {
    fn from(value: StaticValue) -> Self {
        Interpolation::Static(value)
    }
}

impl From<Value> for Interpolation {
    fn from(value: Value) -> Self {
        Interpolation::Value(value)
    }
}

static MERGED: OnceLock<DashMap<Vec<String>, TemplateStrings>> = OnceLock::new();

fn merged_strings() -> &'static DashMap<Vec<String>, TemplateStrings> {
    MERGED.get_or_init(DashMap::new)
}

/// Build a template result, merging static interpolations into `strings`.
///
/// Without any static interpolation the original strings identity is kept.
pub fn with_static(
    strings: &TemplateStrings,
    kind: TemplateKind,
    interpolations: Vec<Interpolation>,
) -> Result<TemplateResult, TemplateError> {
    let segments = strings.segments();
    if interpolations.len() != strings.value_count() {
        return Err(TemplateError::ValueCountMismatch {
            expected: strings.value_count(),
            found: interpolations.len(),
        });
    }

    let mut merged = Vec::with_capacity(segments.len());
    let mut values = Vec::with_capacity(interpolations.len());
    let mut current = segments.first().cloned().unwrap_or_default();
    let mut has_statics = false;
    for (interpolation, next) in interpolations.into_iter().zip(segments.iter().skip(1)) {
        match interpolation {
            Interpolation::Static(value) => {
                current.push_str(value.as_str());
                current.push_str(next);
                has_statics = true;
            }
            Interpolation::Value(value) => {
                merged.push(std::mem::replace(&mut current, next.clone()));
                values.push(value);
            }
        }
    }
    merged.push(current);

    if !has_statics {
        return Ok(TemplateResult::new(kind, strings.clone(), values));
    }

    let strings = match merged_strings().get(&merged) {
        Some(existing) => existing.clone(),
        None => {
            trace!(segments = merged.len(), "caching merged static strings");
            merged_strings()
                .entry(merged.clone())
                .or_insert_with(|| TemplateStrings::new(merged))
                .clone()
        }
    };
    Ok(TemplateResult::new(kind, strings, values))
}
