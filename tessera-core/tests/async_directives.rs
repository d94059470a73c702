//! Integration Tests for Async Directives
//!
//! These tests push values through `AsyncSource` channels and check what
//! `async_replace` and `async_append` commit, including supersession,
//! disconnection and teardown.

use std::time::Duration;

use futures_util::stream;

use tessera_core::dom::{strip_expression_markers, Node};
use tessera_core::part::PartKind;
use tessera_core::{
    async_append, async_append_with, async_replace, async_replace_with, html, render,
    AsyncSource, RenderError, RenderOptions, Value,
};

fn options() -> RenderOptions {
    RenderOptions::default()
}

fn contents(container: &Node) -> String {
    strip_expression_markers(&container.inner_html())
}

/// Let spawned consumer tasks run until they are waiting again.
async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

/// Test that async_replace shows only the latest value.
#[tokio::test]
async fn async_replace_replaces_values() {
    let container = Node::element("div");
    let (sender, source) = AsyncSource::channel();

    render(html!("<div>{}</div>", async_replace(source)), &container, &options()).unwrap();
    assert_eq!(contents(&container), "<div></div>");

    sender.push("foo");
    settle().await;
    assert_eq!(contents(&container), "<div>foo</div>");

    sender.push("bar");
    settle().await;
    assert_eq!(contents(&container), "<div>bar</div>");
}

/// Test that async_append keeps every value in order.
#[tokio::test]
async fn async_append_concatenates_values() {
    let container = Node::element("div");
    let (sender, source) = AsyncSource::channel();

    render(html!("<div>{}</div>", async_append(source)), &container, &options()).unwrap();

    sender.push("foo");
    sender.push("bar");
    settle().await;

    assert_eq!(contents(&container), "<div>foobar</div>");
}

/// Test that async_append clears earlier content on the first new value.
#[tokio::test]
async fn async_append_clears_on_new_source() {
    let container = Node::element("div");
    let view = |source: AsyncSource| html!("<p>{}</p>", async_append(source));

    let (first, source) = AsyncSource::channel();
    render(view(source), &container, &options()).unwrap();
    first.push(1);
    first.push(2);
    settle().await;

    let (second, source) = AsyncSource::channel();
    render(view(source), &container, &options()).unwrap();
    // Old content stays until the new source yields
    assert_eq!(contents(&container), "<p>12</p>");

    second.push(3);
    settle().await;
    assert_eq!(contents(&container), "<p>3</p>");
}

/// Test that a superseded source can no longer commit.
#[tokio::test]
async fn superseded_source_is_ignored() {
    let container = Node::element("div");
    let view = |source: AsyncSource| html!("<div>{}</div>", async_replace(source));

    let (old, source) = AsyncSource::channel();
    render(view(source), &container, &options()).unwrap();
    let (new, source) = AsyncSource::channel();
    render(view(source), &container, &options()).unwrap();

    new.push("new");
    settle().await;
    old.push("old");
    settle().await;

    assert_eq!(contents(&container), "<div>new</div>");
    // The superseded consumer has dropped its stream
    assert!(!old.push("again"));
}

/// Test that re-rendering the same source does not restart it.
#[tokio::test]
async fn same_source_keeps_streaming() {
    let container = Node::element("div");
    let (sender, source) = AsyncSource::channel();
    let view = |source: &AsyncSource| html!("<div>{}</div>", async_replace(source.clone()));

    render(view(&source), &container, &options()).unwrap();
    sender.push("a");
    settle().await;
    render(view(&source), &container, &options()).unwrap();
    sender.push("b");
    settle().await;

    assert_eq!(contents(&container), "<div>b</div>");
}

/// Test that values are held while disconnected and committed on reconnect.
#[tokio::test]
async fn disconnected_parts_defer_commits() {
    let container = Node::element("div");
    let (sender, source) = AsyncSource::channel();

    let root = render(html!("<div>{}</div>", async_replace(source)), &container, &options()).unwrap();
    sender.push("first");
    settle().await;

    root.set_connected(false);
    sender.push("second");
    settle().await;
    assert_eq!(contents(&container), "<div>first</div>");

    root.set_connected(true);
    settle().await;
    assert_eq!(contents(&container), "<div>second</div>");
}

/// Test that the mapper sees each value with its index.
#[tokio::test]
async fn mapper_receives_index() {
    let container = Node::element("div");
    let (sender, source) = AsyncSource::channel();
    let label = |value: Value, index: usize| {
        Value::from(format!("{index}:{}", value.as_str().unwrap_or_default()))
    };

    let letters = AsyncSource::new(stream::iter(["x", "y"]));

    render(
        html!(
            "<p>{}</p><p>{}</p>",
            async_replace_with(source, label),
            async_append_with(letters, label)
        ),
        &container,
        &options(),
    )
    .unwrap();
    sender.push("a");
    sender.push("b");
    settle().await;

    assert_eq!(contents(&container), "<p>1:b</p><p>0:x1:y</p>");
}

/// Test that async values also drive attribute parts.
#[tokio::test]
async fn async_replace_in_attribute() {
    let container = Node::element("div");
    let (sender, source) = AsyncSource::channel();

    render(html!("<a title=\"{}\"></a>", async_replace(source)), &container, &options()).unwrap();
    sender.push("tip");
    settle().await;

    let link = container.child(1).unwrap();
    assert_eq!(link.attribute("title").as_deref(), Some("tip"));
}

/// Test that async_append is rejected outside child position.
#[tokio::test]
async fn async_append_requires_child_part() {
    let container = Node::element("div");
    let (_sender, source) = AsyncSource::channel();

    let result = render(html!("<a title={}></a>", async_append(source)), &container, &options());

    assert!(matches!(
        result,
        Err(RenderError::DirectiveMisuse {
            directive: "async_append",
            part: PartKind::Attribute
        })
    ));
}

/// Test that disposing the root stops consumption.
#[tokio::test]
async fn dispose_stops_consumers() {
    let container = Node::element("div");
    let (sender, source) = AsyncSource::channel();

    let root = render(html!("<div>{}</div>", async_replace(source)), &container, &options()).unwrap();
    root.dispose();
    settle().await;

    assert!(!sender.push("late"));
    assert_eq!(contents(&container), "");
}

/// Test that a failing source keeps the last good value.
#[tokio::test]
async fn failing_source_stops_quietly() {
    let container = Node::element("div");
    let source = AsyncSource::try_new(stream::iter(vec![Ok("good"), Err("broken"), Ok("never")]));

    render(html!("<div>{}</div>", async_replace(source)), &container, &options()).unwrap();
    settle().await;

    assert_eq!(contents(&container), "<div>good</div>");
}

/// Test that async directives need a runtime.
#[test]
fn async_directives_require_runtime() {
    let container = Node::element("div");
    let (_sender, source) = AsyncSource::channel();

    let result = render(html!("<div>{}</div>", async_replace(source)), &container, &options());

    assert!(matches!(result, Err(RenderError::NoRuntime)));
}

/// Test that async_append holds values while disconnected and adds them on
/// reconnect.
#[tokio::test]
async fn async_append_defers_while_disconnected() {
    let container = Node::element("div");
    let (sender, source) = AsyncSource::channel();

    let root = render(html!("<div>{}</div>", async_append(source)), &container, &options()).unwrap();
    sender.push(1);
    settle().await;

    root.set_connected(false);
    sender.push(2);
    settle().await;
    assert_eq!(contents(&container), "<div>1</div>");

    root.set_connected(true);
    settle().await;
    assert_eq!(contents(&container), "<div>12</div>");
}

/// Test that async_replace ends on the newest of the values that arrived
/// while disconnected.
#[tokio::test]
async fn async_replace_settles_on_latest_pending_value() {
    let container = Node::element("div");
    let (sender, source) = AsyncSource::channel();

    let root = render(html!("<div>{}</div>", async_replace(source)), &container, &options()).unwrap();
    sender.push("a");
    settle().await;

    root.set_connected(false);
    sender.push("b");
    sender.push("c");
    settle().await;
    assert_eq!(contents(&container), "<div>a</div>");

    root.set_connected(true);
    settle().await;
    assert_eq!(contents(&container), "<div>c</div>");
}

/// Test that a replaced source never commits when its consumer runs on
/// another worker thread.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn replaced_source_never_commits_across_threads() {
    let view = |source: AsyncSource| html!("<div>{}</div>", async_replace(source));

    for _ in 0..100 {
        let container = Node::element("div");
        let (old, source) = AsyncSource::channel();
        render(view(source), &container, &options()).unwrap();
        let (_new, source) = AsyncSource::channel();
        render(view(source), &container, &options()).unwrap();

        tokio::spawn(async move {
            old.push("old");
        })
        .await
        .unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert_eq!(contents(&container), "<div></div>");
    }
}

/// Test that async_replace keeps running in element position.
#[tokio::test]
async fn async_replace_in_element_part() {
    let container = Node::element("div");
    let (sender, source) = AsyncSource::channel();

    render(html!("<div {}></div>", async_replace(source)), &container, &options()).unwrap();
    sender.push(Value::Nothing);
    settle().await;

    // The consumer is still alive, so its stream still accepts values
    assert!(sender.push(Value::Null));
    assert_eq!(contents(&container), "<div></div>");
}
