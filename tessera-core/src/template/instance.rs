//! Template instances: one live copy of a template and its parts.

use std::sync::Arc;

use smallvec::SmallVec;
use tracing::{debug, instrument};

use super::{resolve_path, Template};
use crate::dom::Node;
use crate::error::{RenderError, TemplateError};
use crate::part::Part;
use crate::value::Value;

/// A rendered copy of a [`Template`] with its live parts in value order.
pub struct TemplateInstance {
    template: Arc<Template>,
    parts: Vec<Part>,
}

impl TemplateInstance {
    /// Build the skeleton and bind every part. Nothing is committed yet.
    ///
    /// Returns the instance and the fragment holding its nodes; the caller
    /// commits values and then moves the fragment into place.
    #[instrument(level = "debug", skip_all, fields(parts = template.parts().len()))]
    pub(crate) fn new(template: Arc<Template>, connected: bool) -> Result<(Self, Node), RenderError> {
        let fragment = template.build_fragment();

        // Resolve every path before creating parts: placeholder comments
        // shift once child parts start rendering.
        let nodes = template
            .parts()
            .iter()
            .map(|descriptor| resolve_path(&fragment, descriptor.path()))
            .collect::<Result<Vec<_>, _>>()?;

        let parts = template
            .parts()
            .iter()
            .zip(nodes)
            .map(|(descriptor, node)| Part::from_descriptor(descriptor, node, connected))
            .collect();

        debug!("instantiated template");
        Ok((Self { template, parts }, fragment))
    }

    pub fn template(&self) -> &Arc<Template> {
        &self.template
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Hand each part its share of `values`, in order.
    pub(crate) fn update(&self, values: Vec<Value>) -> Result<(), RenderError> {
        let expected: usize = self.parts.iter().map(Part::value_count).sum();
        if values.len() != expected {
            return Err(TemplateError::ValueCountMismatch {
                expected,
                found: values.len(),
            }
            .into());
        }

        let mut values = values.into_iter();
        for part in &self.parts {
            let share: SmallVec<[Value; 4]> = values.by_ref().take(part.value_count()).collect();
            part.set_values(share)?;
        }
        Ok(())
    }

    pub(crate) fn set_connected(&self, connected: bool) {
        for part in &self.parts {
            part.set_connected(connected);
        }
    }

    pub(crate) fn dispose(&self) {
        for part in &self.parts {
            part.dispose();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::part::PartKind;
    use crate::template::{get_or_create_template, TemplateKind, TemplateStrings};

    fn instance(segments: &[&str]) -> (TemplateInstance, Node) {
        let strings = TemplateStrings::new(segments.iter().copied());
        let template = get_or_create_template(&strings, TemplateKind::Html).unwrap();
        TemplateInstance::new(template, true).unwrap()
    }

    // ---- Tests

    #[test]
    fn test_parts_in_value_order() {
        let (instance, _fragment) = instance(&["<a href=", " ?hidden=", ">", "</a>"]);

        let kinds: Vec<_> = instance.parts().iter().map(Part::kind).collect();

        assert_eq!(
            kinds,
            vec![PartKind::Attribute, PartKind::BooleanAttribute, PartKind::Child]
        );
    }

    #[test]
    fn test_property_binding_is_its_own_part() {
        let (instance, _fragment) = instance(&["<input .value=", " title=", ">"]);

        assert!(matches!(instance.parts()[0], Part::Property(_)));
        assert!(matches!(instance.parts()[1], Part::Attribute(_)));
        assert_eq!(instance.parts()[0].kind(), PartKind::Property);
    }

    #[test]
    fn test_update_commits_into_fragment() {
        let (instance, fragment) = instance(&["<p class=\"a ", " b\">", "</p>"]);

        instance
            .update(vec!["x".into(), "hello".into()])
            .unwrap();

        assert_eq!(
            crate::dom::strip_expression_markers(&fragment.inner_html()),
            "<p class=\"a x b\">hello</p>"
        );
    }

    #[test]
    fn test_instances_do_not_share_nodes() {
        let (_, first) = instance(&["<i>", "</i>"]);
        let (_, second) = instance(&["<i>", "</i>"]);

        assert!(!first.first_child().unwrap().is_same_node(&second.first_child().unwrap()));
    }

    #[test]
    fn test_value_count_checked() {
        let (instance, _) = instance(&["<i>", "</i>"]);

        assert!(matches!(
            instance.update(vec![]),
            Err(RenderError::Template(TemplateError::ValueCountMismatch { .. }))
        ));
    }
}
