//! Integration Tests for Rendering
//!
//! These tests drive `render` end to end: template caching, every part kind,
//! nested templates and lists, directives and their lifecycle.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use tessera_core::dom::{mutation_count, strip_expression_markers, EventListener, Namespace, Node};
use tessera_core::statics::{unsafe_static, with_static, Interpolation};
use tessera_core::template::{TemplateKind, TemplateStrings};
use tessera_core::{
    html, render, repeat, svg, Directive, DirectivePart, DirectiveResult, RenderError,
    RenderOptions, TemplateError, TemplateResult, Value,
};

fn options() -> RenderOptions {
    RenderOptions::default()
}

fn contents(container: &Node) -> String {
    strip_expression_markers(&container.inner_html())
}

fn counter(n: i64) -> TemplateResult {
    html!("<ul><li>{}</li></ul>", n)
}

/// Test that rendering the same call site twice reuses template and nodes.
#[test]
fn same_call_site_reuses_template_and_nodes() {
    let container = Node::element("div");

    let root = render(counter(1), &container, &options()).unwrap();
    let list = container.child(1).unwrap();
    let template = root.template().unwrap();

    render(counter(2), &container, &options()).unwrap();

    // No new skeleton was cloned for the second render
    assert!(container.child(1).unwrap().is_same_node(&list));
    assert!(Arc::ptr_eq(&template, &root.template().unwrap()));
    assert_eq!(contents(&container), "<ul><li>2</li></ul>");
}

/// Test that an unchanged re-render does not touch the tree.
#[test]
fn unchanged_render_is_idempotent() {
    let container = Node::element("div");
    let view = |label: &str| html!("<p title={}>{}</p>", label, label);

    render(view("same"), &container, &options()).unwrap();
    let before = mutation_count();
    render(view("same"), &container, &options()).unwrap();

    assert_eq!(mutation_count(), before);
}

/// Test that every binding kind commits to the right place.
#[test]
fn binding_kinds_commit() {
    let container = Node::element("div");
    let clicks = Arc::new(AtomicUsize::new(0));
    let seen = clicks.clone();
    let on_click = EventListener::new(move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    });

    let view = |disabled: bool, value: &str, listener: &EventListener| {
        html!(
            "<button class=\"btn {}\" ?disabled={} .value={} @click={}>go</button>",
            if disabled { "off" } else { "on" },
            disabled,
            value,
            listener.clone()
        )
    };

    render(view(true, "a", &on_click), &container, &options()).unwrap();
    let button = container.child(1).unwrap();
    assert_eq!(button.attribute("class").as_deref(), Some("btn off"));
    assert!(button.has_attribute("disabled"));
    assert_eq!(button.property("value"), Some(Value::from("a")));

    render(view(false, "b", &on_click), &container, &options()).unwrap();
    button.click();
    button.click();

    assert_eq!(button.attribute("class").as_deref(), Some("btn on"));
    assert!(!button.has_attribute("disabled"));
    assert_eq!(button.property("value"), Some(Value::from("b")));
    assert_eq!(clicks.load(Ordering::SeqCst), 2);
    assert_eq!(button.listener_count("click"), 1);
    // Binding attributes never reach the tree
    assert_eq!(
        contents(&container),
        "<button class=\"btn on\">go</button>"
    );
}

/// Test that nested templates and lists render and update.
#[test]
fn nested_templates_and_lists() {
    let container = Node::element("div");
    let item = |label: &str| html!("<li>{}</li>", label);
    let view = |labels: &[&str]| {
        let items: Vec<Value> = labels.iter().map(|label| item(label).into()).collect();
        html!("<ul>{}</ul>", items)
    };

    render(view(&["a", "b"]), &container, &options()).unwrap();
    assert_eq!(contents(&container), "<ul><li>a</li><li>b</li></ul>");

    render(view(&["a", "b", "c"]), &container, &options()).unwrap();
    assert_eq!(
        contents(&container),
        "<ul><li>a</li><li>b</li><li>c</li></ul>"
    );

    render(view(&[]), &container, &options()).unwrap();
    assert_eq!(contents(&container), "<ul></ul>");
}

/// Test that keyed lists keep item nodes across reorders.
#[test]
fn keyed_list_keeps_nodes() {
    let container = Node::element("div");
    let view = |ids: &[i64]| {
        html!(
            "<ol>{}</ol>",
            repeat(ids.to_vec(), |id, _| *id, |id, _| html!("<li>{}</li>", id))
        )
    };

    render(view(&[1, 2, 3]), &container, &options()).unwrap();
    let list = container.child(1).unwrap();
    let third = list
        .children()
        .into_iter()
        .find(|node| node.text_content() == "3")
        .unwrap();

    render(view(&[3, 1, 2]), &container, &options()).unwrap();

    assert_eq!(
        contents(&container),
        "<ol><li>3</li><li>1</li><li>2</li></ol>"
    );
    let moved = list
        .children()
        .into_iter()
        .find(|node| node.text_content() == "3")
        .unwrap();
    assert!(moved.is_same_node(&third));
}

/// Test that malformed templates fail on every render.
#[test]
fn malformed_template_is_an_error() {
    let container = Node::element("div");

    for _ in 0..2 {
        let result = render(html!("<div>{}", 1), &container, &options());
        assert!(matches!(
            result,
            Err(RenderError::Template(TemplateError::UnclosedElement(name))) if name == "div"
        ));
    }

    let result = render(html!("<!-- {} -->", 1), &container, &options());
    assert!(matches!(
        result,
        Err(RenderError::Template(TemplateError::MarkerInComment))
    ));
}

/// Test that the svg dialect creates SVG elements.
#[test]
fn svg_templates_use_svg_namespace() {
    let container = Node::element("div");

    render(
        html!("<svg>{}</svg>", svg!("<circle r={}/>", 4)),
        &container,
        &options(),
    )
    .unwrap();

    let circle = container.child(1).unwrap().child(1).unwrap();
    assert_eq!(circle.tag_name().as_deref(), Some("circle"));
    assert_eq!(circle.namespace(), Some(Namespace::Svg));
    assert_eq!(circle.attribute("r").as_deref(), Some("4"));
}

/// Test that static values change template shape.
#[test]
fn static_tag_names() {
    let container = Node::element("div");
    let strings = TemplateStrings::new(["<", ">", "</", ">"]);
    let view = |tag: &str, text: &str| {
        with_static(
            &strings,
            TemplateKind::Html,
            vec![
                unsafe_static(tag).into(),
                Interpolation::value(text),
                unsafe_static(tag).into(),
            ],
        )
        .unwrap()
    };

    render(view("h1", "title"), &container, &options()).unwrap();
    assert_eq!(contents(&container), "<h1>title</h1>");

    render(view("h2", "sub"), &container, &options()).unwrap();
    assert_eq!(contents(&container), "<h2>sub</h2>");
}

type Log = Arc<Mutex<Vec<&'static str>>>;

struct Recorder {
    log: Option<Log>,
}

impl Recorder {
    fn record(&self, event: &'static str) {
        if let Some(log) = &self.log {
            log.lock().push(event);
        }
    }
}

impl Directive for Recorder {
    type Args = Log;
    const NAME: &'static str = "recorder";

    fn create(_part: &DirectivePart<'_>) -> Result<Self, RenderError> {
        Ok(Recorder { log: None })
    }

    fn update(&mut self, _part: &mut DirectivePart<'_>, log: &Log) -> Result<Value, RenderError> {
        self.log = Some(log.clone());
        self.record("update");
        Ok(Value::from("recorder"))
    }

    fn disconnected(&mut self) {
        self.record("disconnected");
    }

    fn reconnected(&mut self) {
        self.record("reconnected");
    }

    fn dispose(&mut self) {
        self.record("dispose");
    }
}

fn recorder(log: &Log) -> DirectiveResult {
    DirectiveResult::new::<Recorder>(log.clone())
}

/// Test that connection changes and disposal reach nested directives.
#[test]
fn directive_lifecycle_reaches_nested_parts() {
    let container = Node::element("div");
    let log: Log = Arc::default();
    let view = |log: &Log| html!("<div>{}</div>", html!("<span>{}</span>", recorder(log)));

    let root = render(view(&log), &container, &options()).unwrap();
    render(view(&log), &container, &options()).unwrap();
    assert_eq!(contents(&container), "<div><span>recorder</span></div>");

    root.set_connected(false);
    root.set_connected(false);
    root.set_connected(true);
    root.dispose();

    assert_eq!(
        *log.lock(),
        vec!["update", "update", "disconnected", "reconnected", "dispose"]
    );
    assert_eq!(contents(&container), "");
}

/// Test that replacing a template disposes the directives inside it.
#[test]
fn template_change_disposes_directives() {
    let container = Node::element("div");
    let log: Log = Arc::default();

    render(html!("<b>{}</b>", recorder(&log)), &container, &options()).unwrap();
    render(html!("<i></i>"), &container, &options()).unwrap();

    assert_eq!(*log.lock(), vec!["update", "dispose"]);
}

/// Test that message ids follow the template's static text.
#[test]
fn message_id_of_template() {
    let greeting = |name: &str| html!("Hello {}!", name);

    assert_eq!(greeting("a").message_id().as_str(), "0h00ad08ebae1e0f74");
    assert_eq!(greeting("a").message_id(), greeting("b").message_id());
}
