//! Process-wide template cache.
//!
//! Templates are keyed by strings identity and dialect. The cache only grows:
//! a long-lived process renders a bounded set of call sites, so nothing is
//! ever evicted.

use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use tracing::{debug, trace};

use super::{StringsId, Template, TemplateKind, TemplateStrings};
use crate::error::TemplateError;

type CacheKey = (StringsId, TemplateKind);

static TEMPLATES: OnceLock<DashMap<CacheKey, Arc<Template>>> = OnceLock::new();

fn templates() -> &'static DashMap<CacheKey, Arc<Template>> {
    TEMPLATES.get_or_init(DashMap::new)
}

/// Return the compiled template for `strings`, parsing it on first use.
///
/// Parse failures are not cached; the same error is raised on every call.
pub fn get_or_create_template(
    strings: &TemplateStrings,
    kind: TemplateKind,
) -> Result<Arc<Template>, TemplateError> {
    let key = (strings.id(), kind);
    if let Some(template) = templates().get(&key) {
        trace!(strings = ?key.0, "template cache hit");
        return Ok(template.clone());
    }

    let template = Arc::new(Template::parse(strings, kind)?);
    debug!(
        strings = ?key.0,
        ?kind,
        parts = template.parts().len(),
        "compiled template"
    );
    // Another thread may have raced us here; keep whichever landed first.
    let entry = templates().entry(key).or_insert(template);
    Ok(entry.value().clone())
}

/// Number of compiled templates held by the cache.
pub fn cached_template_count() -> usize {
    templates().len()
}
