//! Markup serialization for inspection and tests.

use super::node::NodeKind;
use super::{is_raw_text_element, is_void_element, Node};

impl Node {
    /// Serialized markup of this node's children.
    pub fn inner_html(&self) -> String {
        let mut out = String::new();
        let raw = self
            .tag_name()
            .is_some_and(|name| is_raw_text_element(&name));
        for child in self.children() {
            write_node(&mut out, &child, raw);
        }
        out
    }

    /// Serialized markup of this node and its children.
    pub fn outer_html(&self) -> String {
        let mut out = String::new();
        write_node(&mut out, self, false);
        out
    }
}

/// Remove the empty comments used as part anchors.
pub fn strip_expression_markers(html: &str) -> String {
    html.replace("<!---->", "")
}

enum Snapshot {
    Element {
        name: String,
        attributes: Vec<(String, String)>,
    },
    Text(String),
    Comment(String),
    Fragment,
}

fn write_node(out: &mut String, node: &Node, raw_parent: bool) {
    // Copy out what we need so the lock is released before recursing.
    let (snapshot, children) = {
        let data = node.0.data.lock();
        let snapshot = match &data.kind {
            NodeKind::Element(element) => Snapshot::Element {
                name: element.name.clone(),
                attributes: element
                    .attributes
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            },
            NodeKind::Text(text) => Snapshot::Text(text.clone()),
            NodeKind::Comment(text) => Snapshot::Comment(text.clone()),
            NodeKind::Fragment => Snapshot::Fragment,
        };
        (snapshot, data.children.clone())
    };

    match snapshot {
        Snapshot::Text(text) if raw_parent => out.push_str(&text),
        Snapshot::Text(text) => escape_into(out, &text, false),
        Snapshot::Comment(text) => {
            out.push_str("<!--");
            out.push_str(&text);
            out.push_str("-->");
        }
        Snapshot::Fragment => {
            for child in &children {
                write_node(out, child, false);
            }
        }
        Snapshot::Element { name, attributes } => {
            out.push('<');
            out.push_str(&name);
            for (key, value) in &attributes {
                out.push(' ');
                out.push_str(key);
                out.push_str("=\"");
                escape_into(out, value, true);
                out.push('"');
            }
            out.push('>');
            if is_void_element(&name) {
                return;
            }
            let raw = is_raw_text_element(&name);
            for child in &children {
                write_node(out, child, raw);
            }
            out.push_str("</");
            out.push_str(&name);
            out.push('>');
        }
    }
}

fn escape_into(out: &mut String, text: &str, attribute: bool) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            '"' if attribute => out.push_str("&quot;"),
            '<' if !attribute => out.push_str("&lt;"),
            '>' if !attribute => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
}
