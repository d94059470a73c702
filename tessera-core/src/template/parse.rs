//! Template analyzer.
//!
//! A small markup tokenizer feeding a tree builder. The tokenizer only knows
//! markup syntax; the builder owns the open-element stack, namespaces and
//! everything about binding markers.
//!
//! Known limitations (intentional):
//! - No HTML5 error recovery: mismatched, stray or missing end tags fail.
//! - No implied end tags (`<p>` is not closed by a following `<p>`).
//! - Only a handful of character references are decoded.

use memchr::{memchr, memmem};
use smallvec::smallvec;

use super::{NodePath, PartDescriptor, SkeletonNode, TemplateKind};
use crate::dom::{is_raw_text_element, is_void_element, Namespace};
use crate::error::TemplateError;

/// Delimits binding markers in the joined template source.
pub(crate) const MARKER: char = '\u{1}';

const COMMENT_START: &str = "<!--";
const COMMENT_END: &[u8] = b"-->";

pub(super) struct Parsed {
    pub(super) skeleton: Vec<SkeletonNode>,
    pub(super) parts: Vec<PartDescriptor>,
}

pub(super) fn parse(segments: &[String], kind: TemplateKind) -> Result<Parsed, TemplateError> {
    if segments.iter().any(|segment| segment.contains(MARKER)) {
        return Err(TemplateError::ReservedCharacter);
    }
    let source = join_with_markers(segments);

    let mut tokenizer = Tokenizer::new(&source);
    let mut builder = Builder::new(kind, segments.len() - 1);
    while let Some(token) = tokenizer.next_token()? {
        if let Some(raw) = builder.push(token)? {
            let text = tokenizer.raw_text(&raw)?;
            builder.raw_text(&raw, text)?;
        }
    }
    builder.finish()
}

fn join_with_markers(segments: &[String]) -> String {
    let mut source = String::with_capacity(segments.iter().map(|s| s.len() + 4).sum());
    for (index, segment) in segments.iter().enumerate() {
        if index > 0 {
            source.push(MARKER);
            source.push_str(&(index - 1).to_string());
            source.push(MARKER);
        }
        source.push_str(segment);
    }
    source
}

/// Read the marker at the start of `input`, returning its index and the rest.
fn read_marker(input: &str) -> Result<(usize, &str), TemplateError> {
    let body = &input[MARKER.len_utf8()..];
    let end = body.find(MARKER).ok_or(TemplateError::ReservedCharacter)?;
    let index = body[..end]
        .parse()
        .map_err(|_| TemplateError::ReservedCharacter)?;
    Ok((index, &body[end + MARKER.len_utf8()..]))
}

/// Split an attribute value into static strings and the marker indices
/// between them. There is always one more string than index.
fn split_markers(value: &str) -> Result<(Vec<String>, Vec<usize>), TemplateError> {
    let mut strings = Vec::new();
    let mut indices = Vec::new();
    let mut rest = value;
    while let Some(at) = rest.find(MARKER) {
        strings.push(decode_entities(&rest[..at]));
        let (index, after) = read_marker(&rest[at..])?;
        indices.push(index);
        rest = after;
    }
    strings.push(decode_entities(rest));
    Ok((strings, indices))
}

fn is_lone_marker(name: &str) -> bool {
    matches!(read_marker(name), Ok((_, rest)) if rest.is_empty())
}

/// Decode the common named references and numeric references. Anything
/// unrecognized is kept as written.
pub(crate) fn decode_entities(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = String::with_capacity(input.len());
    let mut copied = 0;
    let mut search = 0;
    while let Some(rel) = memchr(b'&', &bytes[search..]) {
        let at = search + rel;
        search = at + 1;
        let Some(len) = memchr(b';', &bytes[at..(at + 12).min(bytes.len())]) else {
            continue;
        };
        let name = &input[at + 1..at + len];
        let decoded = match name {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some('\u{a0}'),
            _ => name.strip_prefix('#').and_then(|number| {
                let code = match number.strip_prefix(['x', 'X']) {
                    Some(hex) => u32::from_str_radix(hex, 16).ok(),
                    None => number.parse().ok(),
                };
                code.and_then(char::from_u32)
            }),
        };
        if let Some(ch) = decoded {
            out.push_str(&input[copied..at]);
            out.push(ch);
            copied = at + len + 1;
            search = copied;
        }
    }
    out.push_str(&input[copied..]);
    out
}

// ----------------------------------------------------------------------------
// Tokenizer
// ----------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq)]
struct RawAttribute<'a> {
    name: &'a str,
    value: Option<&'a str>,
}

#[derive(Debug, PartialEq, Eq)]
enum Token<'a> {
    Text(&'a str),
    Comment(&'a str),
    Declaration(&'a str),
    StartTag {
        name: &'a str,
        attributes: Vec<RawAttribute<'a>>,
        self_closing: bool,
    },
    EndTag(&'a str),
}

struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn bytes(&self) -> &'a [u8] {
        self.input.as_bytes()
    }

    /// Whether the `<` at `at` opens markup rather than being literal text.
    fn starts_markup(&self, at: usize) -> bool {
        let bytes = self.bytes();
        match bytes.get(at + 1) {
            Some(b'/') => bytes
                .get(at + 2)
                .is_some_and(|b| b.is_ascii_alphabetic() || *b == MARKER as u8),
            Some(b) => b.is_ascii_alphabetic() || matches!(*b, b'!' | b'?') || *b == MARKER as u8,
            None => false,
        }
    }

    fn skip_whitespace(&mut self) {
        let bytes = self.bytes();
        while self.pos < bytes.len() && bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn scan_until(&mut self, stop: impl Fn(u8) -> bool) -> &'a str {
        let bytes = self.bytes();
        let start = self.pos;
        while self.pos < bytes.len() && !stop(bytes[self.pos]) {
            self.pos += 1;
        }
        &self.input[start..self.pos]
    }

    fn next_token(&mut self) -> Result<Option<Token<'a>>, TemplateError> {
        let bytes = self.bytes();
        let start = self.pos;
        if start >= bytes.len() {
            return Ok(None);
        }

        if bytes[start] != b'<' || !self.starts_markup(start) {
            let mut search = start;
            let end = loop {
                match memchr(b'<', &bytes[search..]) {
                    Some(rel) if self.starts_markup(search + rel) && search + rel > start => {
                        break search + rel
                    }
                    Some(rel) => search += rel + 1,
                    None => break bytes.len(),
                }
            };
            self.pos = end;
            return Ok(Some(Token::Text(&self.input[start..end])));
        }

        if self.input[start..].starts_with(COMMENT_START) {
            let body_start = start + COMMENT_START.len();
            let end = memmem::find(&bytes[body_start..], COMMENT_END)
                .ok_or(TemplateError::UnterminatedComment(start))?;
            self.pos = body_start + end + COMMENT_END.len();
            return Ok(Some(Token::Comment(&self.input[body_start..body_start + end])));
        }

        if matches!(bytes[start + 1], b'!' | b'?') {
            let end = memchr(b'>', &bytes[start..]).ok_or(TemplateError::UnterminatedTag(start))?;
            self.pos = start + end + 1;
            return Ok(Some(Token::Declaration(&self.input[start + 2..start + end])));
        }

        if bytes[start + 1] == b'/' {
            self.pos = start + 2;
            let name = self.scan_until(|b| b.is_ascii_whitespace() || b == b'/' || b == b'>');
            let end = memchr(b'>', &bytes[self.pos..]).ok_or(TemplateError::UnterminatedTag(start))?;
            let rest = &self.input[self.pos..self.pos + end];
            if name.contains(MARKER) || rest.contains(MARKER) {
                return Err(TemplateError::MarkerInTagName);
            }
            self.pos += end + 1;
            return Ok(Some(Token::EndTag(name)));
        }

        self.pos = start + 1;
        let name = self.scan_until(|b| b.is_ascii_whitespace() || b == b'/' || b == b'>');
        if name.contains(MARKER) {
            return Err(TemplateError::MarkerInTagName);
        }

        let mut attributes = Vec::new();
        let mut self_closing = false;
        loop {
            self.skip_whitespace();
            match bytes.get(self.pos) {
                None => return Err(TemplateError::UnterminatedTag(start)),
                Some(b'>') => {
                    self.pos += 1;
                    break;
                }
                Some(b'/') => {
                    self.pos += 1;
                    if bytes.get(self.pos) == Some(&b'>') {
                        self_closing = true;
                        self.pos += 1;
                        break;
                    }
                    continue;
                }
                Some(_) => {}
            }

            let name = self.scan_until(|b| {
                b.is_ascii_whitespace() || b == b'/' || b == b'>' || b == b'='
            });
            if name.is_empty() {
                // A stray `=`; skip it like browsers do.
                self.pos += 1;
                continue;
            }
            self.skip_whitespace();
            let mut value = None;
            if bytes.get(self.pos) == Some(&b'=') {
                self.pos += 1;
                self.skip_whitespace();
                match bytes.get(self.pos) {
                    Some(&quote) if quote == b'"' || quote == b'\'' => {
                        let value_start = self.pos + 1;
                        let end = memchr(quote, &bytes[value_start..])
                            .ok_or(TemplateError::UnterminatedTag(start))?;
                        value = Some(&self.input[value_start..value_start + end]);
                        self.pos = value_start + end + 1;
                    }
                    _ => {
                        let value_start = self.pos;
                        while let Some(&b) = bytes.get(self.pos) {
                            let closes = b == b'/' && bytes.get(self.pos + 1) == Some(&b'>');
                            if b.is_ascii_whitespace() || b == b'>' || closes {
                                break;
                            }
                            self.pos += 1;
                        }
                        value = Some(&self.input[value_start..self.pos]);
                    }
                }
            }
            attributes.push(RawAttribute { name, value });
        }

        Ok(Some(Token::StartTag {
            name,
            attributes,
            self_closing,
        }))
    }

    /// Consume the literal content of a raw text element and its end tag.
    fn raw_text(&mut self, name: &str) -> Result<&'a str, TemplateError> {
        let bytes = self.bytes();
        let start = self.pos;
        let mut search = start;
        while let Some(rel) = memmem::find(&bytes[search..], b"</") {
            let at = search + rel;
            let name_end = at + 2 + name.len();
            if bytes.len() >= name_end && bytes[at + 2..name_end].eq_ignore_ascii_case(name.as_bytes()) {
                let mut close = name_end;
                while close < bytes.len() && bytes[close].is_ascii_whitespace() {
                    close += 1;
                }
                if bytes.get(close) == Some(&b'>') {
                    self.pos = close + 1;
                    return Ok(&self.input[start..at]);
                }
            }
            search = at + 2;
        }
        Err(TemplateError::UnterminatedRawText(name.to_owned()))
    }
}

// ----------------------------------------------------------------------------
// Tree builder
// ----------------------------------------------------------------------------

struct OpenElement {
    name: String,
    namespace: Namespace,
    attributes: Vec<(String, String)>,
    children: Vec<SkeletonNode>,
    path: NodePath,
}

impl OpenElement {
    fn into_node(self) -> SkeletonNode {
        SkeletonNode::Element {
            name: self.name,
            namespace: self.namespace,
            attributes: self.attributes,
            children: self.children,
        }
    }
}

struct Builder {
    dialect: TemplateKind,
    expected_markers: usize,
    next_marker: usize,
    roots: Vec<SkeletonNode>,
    open: Vec<OpenElement>,
    parts: Vec<PartDescriptor>,
}

impl Builder {
    fn new(dialect: TemplateKind, expected_markers: usize) -> Self {
        Self {
            dialect,
            expected_markers,
            next_marker: 0,
            roots: Vec::new(),
            open: Vec::new(),
            parts: Vec::new(),
        }
    }

    fn children_mut(&mut self) -> &mut Vec<SkeletonNode> {
        match self.open.last_mut() {
            Some(open) => &mut open.children,
            None => &mut self.roots,
        }
    }

    fn child_path(&self) -> NodePath {
        match self.open.last() {
            Some(open) => {
                let mut path = open.path.clone();
                path.push(open.children.len());
                path
            }
            None => smallvec![self.roots.len()],
        }
    }

    fn current_namespace(&self) -> Namespace {
        match (self.open.last(), self.dialect) {
            (Some(open), _) => open.namespace,
            (None, TemplateKind::Svg) => Namespace::Svg,
            (None, TemplateKind::Html) => Namespace::Html,
        }
    }

    fn take_marker(&mut self, index: usize) -> Result<(), TemplateError> {
        if index != self.next_marker {
            return Err(TemplateError::MarkerOrder {
                expected: self.next_marker,
                found: index,
            });
        }
        self.next_marker += 1;
        Ok(())
    }

    /// Returns the element name when raw text content must be read next.
    fn push(&mut self, token: Token<'_>) -> Result<Option<String>, TemplateError> {
        match token {
            Token::Text(text) => self.text(text)?,
            Token::Comment(body) => {
                if body.contains(MARKER) {
                    return Err(TemplateError::MarkerInComment);
                }
                self.children_mut()
                    .push(SkeletonNode::Comment(body.to_owned()));
            }
            Token::Declaration(body) => {
                if body.contains(MARKER) {
                    return Err(TemplateError::MarkerInDeclaration);
                }
            }
            Token::StartTag {
                name,
                attributes,
                self_closing,
            } => return self.start_tag(name, attributes, self_closing),
            Token::EndTag(name) => self.end_tag(name)?,
        }
        Ok(None)
    }

    fn push_text(&mut self, text: &str) {
        if !text.is_empty() {
            let decoded = decode_entities(text);
            self.children_mut().push(SkeletonNode::Text(decoded));
        }
    }

    fn text(&mut self, text: &str) -> Result<(), TemplateError> {
        let mut rest = text;
        while let Some(at) = rest.find(MARKER) {
            self.push_text(&rest[..at]);
            let (index, after) = read_marker(&rest[at..])?;
            self.take_marker(index)?;
            let path = self.child_path();
            self.children_mut().push(SkeletonNode::Comment(String::new()));
            self.parts.push(PartDescriptor::Child { path });
            rest = after;
        }
        self.push_text(rest);
        Ok(())
    }

    fn start_tag(
        &mut self,
        name: &str,
        attributes: Vec<RawAttribute<'_>>,
        self_closing: bool,
    ) -> Result<Option<String>, TemplateError> {
        let namespace = if name.eq_ignore_ascii_case("svg") {
            Namespace::Svg
        } else {
            self.current_namespace()
        };
        let name = match namespace {
            Namespace::Html => name.to_ascii_lowercase(),
            Namespace::Svg if name.eq_ignore_ascii_case("svg") => "svg".to_owned(),
            Namespace::Svg => name.to_owned(),
        };
        let path = self.child_path();

        let mut statics = Vec::new();
        for attribute in attributes {
            self.attribute(&path, namespace, attribute, &mut statics)?;
        }

        let element = OpenElement {
            name,
            namespace,
            attributes: statics,
            children: Vec::new(),
            path,
        };
        let closes = match namespace {
            Namespace::Html => is_void_element(&element.name),
            Namespace::Svg => self_closing,
        };
        if closes {
            let node = element.into_node();
            self.children_mut().push(node);
            return Ok(None);
        }
        let raw = (namespace == Namespace::Html && is_raw_text_element(&element.name))
            .then(|| element.name.clone());
        self.open.push(element);
        Ok(raw)
    }

    fn attribute(
        &mut self,
        path: &NodePath,
        namespace: Namespace,
        attribute: RawAttribute<'_>,
        statics: &mut Vec<(String, String)>,
    ) -> Result<(), TemplateError> {
        let normalize = |name: &str| match namespace {
            Namespace::Html => name.to_ascii_lowercase(),
            Namespace::Svg => name.to_owned(),
        };
        let RawAttribute { name, value } = attribute;

        if name.contains(MARKER) {
            if value.is_none() && is_lone_marker(name) {
                let (index, _) = read_marker(name)?;
                self.take_marker(index)?;
                self.parts.push(PartDescriptor::Element { path: path.clone() });
                return Ok(());
            }
            return Err(TemplateError::MarkerInAttributeName(
                name.replace(MARKER, ""),
            ));
        }

        let Some(value) = value else {
            statics.push((normalize(name), String::new()));
            return Ok(());
        };
        if !value.contains(MARKER) {
            statics.push((normalize(name), decode_entities(value)));
            return Ok(());
        }

        let (strings, indices) = split_markers(value)?;
        for index in indices {
            self.take_marker(index)?;
        }
        let whole_value = strings.len() == 2 && strings.iter().all(String::is_empty);
        let path = path.clone();
        let descriptor = match name.as_bytes()[0] {
            b'.' => PartDescriptor::Property {
                path,
                name: name[1..].to_owned(),
                strings,
            },
            b'?' if whole_value => PartDescriptor::BooleanAttribute {
                path,
                name: normalize(&name[1..]),
            },
            b'@' if whole_value => PartDescriptor::Event {
                path,
                name: name[1..].to_owned(),
            },
            b'?' | b'@' => return Err(TemplateError::PartialBinding(name.to_owned())),
            _ => PartDescriptor::Attribute {
                path,
                name: normalize(name),
                strings,
            },
        };
        self.parts.push(descriptor);
        Ok(())
    }

    fn end_tag(&mut self, name: &str) -> Result<(), TemplateError> {
        let Some(current) = self.open.last() else {
            if is_void_element(&name.to_ascii_lowercase()) {
                return Ok(());
            }
            return Err(TemplateError::StrayEndTag(name.to_owned()));
        };
        if !current.name.eq_ignore_ascii_case(name) {
            if current.namespace == Namespace::Html && is_void_element(&name.to_ascii_lowercase()) {
                return Ok(());
            }
            return Err(TemplateError::MismatchedEndTag {
                expected: current.name.clone(),
                found: name.to_owned(),
            });
        }
        if let Some(element) = self.open.pop() {
            let node = element.into_node();
            self.children_mut().push(node);
        }
        Ok(())
    }

    fn raw_text(&mut self, name: &str, text: &str) -> Result<(), TemplateError> {
        if text.contains(MARKER) {
            return Err(TemplateError::MarkerInRawText(name.to_owned()));
        }
        if !text.is_empty() {
            let text = match name {
                "textarea" | "title" => decode_entities(text),
                _ => text.to_owned(),
            };
            self.children_mut().push(SkeletonNode::Text(text));
        }
        self.end_tag(name)
    }

    fn finish(self) -> Result<Parsed, TemplateError> {
        if let Some(open) = self.open.last() {
            return Err(TemplateError::UnclosedElement(open.name.clone()));
        }
        if self.next_marker != self.expected_markers {
            return Err(TemplateError::MarkerCount {
                expected: self.expected_markers,
                found: self.next_marker,
            });
        }
        // A trailing top-level child part needs a node to insert before once
        // the fragment has been moved into a parent with later siblings.
        let mut roots = self.roots;
        let trailing_child = matches!(
            self.parts.last(),
            Some(PartDescriptor::Child { path }) if path.len() == 1 && path[0] + 1 == roots.len()
        );
        if trailing_child {
            roots.push(SkeletonNode::Comment(String::new()));
        }
        Ok(Parsed {
            skeleton: roots,
            parts: self.parts,
        })
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_html(segments: &[&str]) -> Result<Parsed, TemplateError> {
        let segments: Vec<String> = segments.iter().map(|s| s.to_string()).collect();
        parse(&segments, TemplateKind::Html)
    }

    fn element(node: &SkeletonNode) -> (&str, Namespace, &[(String, String)], &[SkeletonNode]) {
        match node {
            SkeletonNode::Element {
                name,
                namespace,
                attributes,
                children,
            } => (name, *namespace, attributes, children),
            other => panic!("expected element, got {other:?}"),
        }
    }

    #[test]
    fn test_tokenizer_basic_tokens() {
        let mut tokenizer = Tokenizer::new("<p class=a id='b' hidden>x &lt; y</p><!--c-->");
        let mut tokens = Vec::new();
        while let Some(token) = tokenizer.next_token().unwrap() {
            tokens.push(token);
        }

        assert_eq!(
            tokens,
            [
                Token::StartTag {
                    name: "p",
                    attributes: vec![
                        RawAttribute { name: "class", value: Some("a") },
                        RawAttribute { name: "id", value: Some("b") },
                        RawAttribute { name: "hidden", value: None },
                    ],
                    self_closing: false,
                },
                Token::Text("x &lt; y"),
                Token::EndTag("p"),
                Token::Comment("c"),
            ]
        );
    }

    #[test]
    fn test_lone_angle_bracket_is_text() {
        let parsed = parse_html(&["<p>1 < 2</p>"]).unwrap();
        let (_, _, _, children) = element(&parsed.skeleton[0]);

        assert_eq!(children, [SkeletonNode::Text("1 < 2".into())]);
    }

    #[test]
    fn test_child_markers_become_placeholder_comments() {
        let parsed = parse_html(&["<p>a", "b", "</p>"]).unwrap();
        let (_, _, _, children) = element(&parsed.skeleton[0]);

        assert_eq!(
            children,
            [
                SkeletonNode::Text("a".into()),
                SkeletonNode::Comment(String::new()),
                SkeletonNode::Text("b".into()),
                SkeletonNode::Comment(String::new()),
            ]
        );
        assert_eq!(parsed.parts[0], PartDescriptor::Child { path: smallvec![0, 1] });
        assert_eq!(parsed.parts[1], PartDescriptor::Child { path: smallvec![0, 3] });
    }

    #[test]
    fn test_binding_attributes_are_removed_from_skeleton() {
        let parsed = parse_html(&["<input type=checkbox ?checked=", " .value=\"", "\">"]).unwrap();
        let (name, _, attributes, _) = element(&parsed.skeleton[0]);

        assert_eq!(name, "input");
        assert_eq!(attributes, [("type".to_string(), "checkbox".to_string())]);
        assert_eq!(parsed.parts.len(), 2);
    }

    #[test]
    fn test_composite_attribute() {
        let parsed = parse_html(&["<div class=\"a ", " b ", "\"></div>"]).unwrap();

        assert_eq!(
            parsed.parts,
            [PartDescriptor::Attribute {
                path: smallvec![0],
                name: "class".into(),
                strings: vec!["a ".into(), " b ".into(), String::new()],
            }]
        );
    }

    #[test]
    fn test_names_lowercased_in_html_only() {
        let parsed = parse_html(&["<DIV Foo=", " .innerHTML=", " @myEvent=", "></DIV>"]).unwrap();
        let names: Vec<String> = parsed
            .parts
            .iter()
            .map(|part| match part {
                PartDescriptor::Attribute { name, .. }
                | PartDescriptor::Property { name, .. }
                | PartDescriptor::Event { name, .. } => name.clone(),
                other => panic!("unexpected {other:?}"),
            })
            .collect();

        assert_eq!(element(&parsed.skeleton[0]).0, "div");
        assert_eq!(names, ["foo", "innerHTML", "myEvent"]);
    }

    #[test]
    fn test_svg_namespace_and_case() {
        let parsed = parse_html(&["<svg viewBox=\"0 0 1 1\"><linearGradient/></svg>"]).unwrap();
        let (name, namespace, attributes, children) = element(&parsed.skeleton[0]);

        assert_eq!((name, namespace), ("svg", Namespace::Svg));
        assert_eq!(attributes[0].0, "viewBox");
        assert_eq!(element(&children[0]).0, "linearGradient");

        let segments = vec!["<rect width=".to_string(), "/>".to_string()];
        let parsed = parse(&segments, TemplateKind::Svg).unwrap();
        assert_eq!(element(&parsed.skeleton[0]).1, Namespace::Svg);
    }

    #[test]
    fn test_void_and_raw_text_elements() {
        let parsed = parse_html(&["<br><style>a < b { }</style><textarea>&amp;</textarea>"]).unwrap();

        assert_eq!(parsed.skeleton.len(), 3);
        assert_eq!(
            element(&parsed.skeleton[1]).3,
            [SkeletonNode::Text("a < b { }".into())]
        );
        assert_eq!(
            element(&parsed.skeleton[2]).3,
            [SkeletonNode::Text("&".into())]
        );
    }

    #[test]
    fn test_entity_decoding() {
        assert_eq!(decode_entities("a &amp; b &#65;&#x42; &bogus; &"), "a & b AB &bogus; &");
    }

    #[test]
    fn test_structure_errors() {
        assert_eq!(
            parse_html(&["<div>"]).err(),
            Some(TemplateError::UnclosedElement("div".into()))
        );
        assert_eq!(
            parse_html(&["<div></span>"]).err(),
            Some(TemplateError::MismatchedEndTag {
                expected: "div".into(),
                found: "span".into()
            })
        );
        assert_eq!(
            parse_html(&["</p>"]).err(),
            Some(TemplateError::StrayEndTag("p".into()))
        );
        assert_eq!(
            parse_html(&["<div"]).err(),
            Some(TemplateError::UnterminatedTag(0))
        );
        assert_eq!(
            parse_html(&["<!-- x"]).err(),
            Some(TemplateError::UnterminatedComment(0))
        );
        assert_eq!(
            parse_html(&["a\u{1}b"]).err(),
            Some(TemplateError::ReservedCharacter)
        );
    }

    #[test]
    fn test_marker_position_errors() {
        assert_eq!(
            parse_html(&["<", "></div>"]).err(),
            Some(TemplateError::MarkerInTagName)
        );
        assert_eq!(
            parse_html(&["<div a", "=1></div>"]).err(),
            Some(TemplateError::MarkerInAttributeName("a0".into()))
        );
        assert_eq!(
            parse_html(&["<!-- ", " -->"]).err(),
            Some(TemplateError::MarkerInComment)
        );
        assert_eq!(
            parse_html(&["<script>", "</script>"]).err(),
            Some(TemplateError::MarkerInRawText("script".into()))
        );
        assert_eq!(
            parse_html(&["<div ?a=\"x", "\"></div>"]).err(),
            Some(TemplateError::PartialBinding("?a".into()))
        );
        assert_eq!(
            parse_html(&["<div @click=\"", " ", "\"></div>"]).err(),
            Some(TemplateError::PartialBinding("@click".into()))
        );
    }
}
