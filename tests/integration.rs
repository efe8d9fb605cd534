// End-to-end API tests for stache.

use pretty_assertions::assert_eq;
use serde_json::json;
use stache::{parse, parse_with, render_str, render_str_with, ParseOptions, Partials, RenderError, Value};

#[test]
fn test_empty_template() {
    assert_eq!(render_str("", &json!({})).unwrap(), "");
}

#[test]
fn test_plain_text_passes_through() {
    assert_eq!(
        render_str("nothing to see", &json!({})).unwrap(),
        "nothing to see"
    );
}

#[test]
fn test_template_reuse_across_data() {
    let template = parse("Hi {{name}}").unwrap();
    assert_eq!(template.render(&json!({"name": "a"})).unwrap(), "Hi a");
    assert_eq!(template.render(&json!({"name": "b"})).unwrap(), "Hi b");
    assert_eq!(template.render(&json!({})).unwrap(), "Hi ");
}

#[test]
fn test_into_owned_outlives_the_source() {
    let source = String::from("Hello {{name}}!");
    let template = parse(&source).unwrap().into_owned();
    drop(source);
    assert_eq!(
        template.render(&json!({"name": "world"})).unwrap(),
        "Hello world!"
    );
}

#[test]
fn test_initial_delimiters_option() {
    let options = ParseOptions::new().with_delimiters("<%", "%>");
    let template = parse_with("<%greeting%>, <%name%>!", &options).unwrap();
    let data = json!({"greeting": "Hi", "name": "X"});
    assert_eq!(template.render(&data).unwrap(), "Hi, X!");
}

#[test]
fn test_writer_buffer_and_alloc_modes_agree() {
    let template = parse("{{#items}}<{{.}}>{{/items}}").unwrap();
    let data = json!({"items": ["a", "b", "c"]});

    let rendered = template.render(&data).unwrap();

    let mut sink = Vec::new();
    let written = template.render_to_writer(&data, &mut sink).unwrap();
    assert_eq!(written, rendered.len());
    assert_eq!(sink, rendered.as_bytes());

    let mut buffer = [0u8; 64];
    let length = template.render_to_buffer(&data, &mut buffer).unwrap();
    assert_eq!(&buffer[..length], rendered.as_bytes());
}

#[test]
fn test_buffer_too_small() {
    let template = parse("{{text}}").unwrap();
    let data = json!({"text": "does not fit"});
    let mut buffer = [0u8; 4];
    assert!(matches!(
        template.render_to_buffer(&data, &mut buffer),
        Err(RenderError::BufferTooSmall)
    ));
}

#[test]
fn test_partials_from_source() {
    let mut partials = Partials::new();
    partials.add_source("header", "== {{title}} ==").unwrap();
    let text = render_str_with("{{>header}}\nbody", &json!({"title": "T"}), &partials).unwrap();
    assert_eq!(text, "== T ==\nbody");
}

#[test]
fn test_partials_add_parsed_template() {
    let mut partials = Partials::new();
    partials.add("p", parse("({{.}})").unwrap());
    assert_eq!(partials.len(), 1);
    assert!(!partials.is_empty());
    let text = render_str_with("{{#xs}}{{>p}}{{/xs}}", &json!({"xs": [1, 2]}), &partials).unwrap();
    assert_eq!(text, "(1)(2)");
}

#[test]
fn test_missing_partial_is_empty_by_default() {
    let text = render_str("a{{>ghost}}b", &json!({})).unwrap();
    assert_eq!(text, "ab");
}

#[test]
fn test_strict_partials_fail_on_miss() {
    let partials = Partials::new().strict(true);
    let template = parse("{{>ghost}}").unwrap();
    assert!(matches!(
        template.render_with_partials(&json!({}), &partials),
        Err(RenderError::PartialNotFound(_))
    ));
}

#[test]
fn test_render_str_to_writer_counts_bytes() {
    let mut sink = Vec::new();
    let written = stache::render_str_to_writer(
        "{{a}}{{b}}",
        &json!({"a": "xy", "b": "z"}),
        &Partials::new(),
        &mut sink,
    )
    .unwrap();
    assert_eq!(written, 3);
    assert_eq!(sink, b"xyz");
}

#[test]
fn test_failing_writer_aborts_the_render() {
    struct FailingWriter;
    impl std::io::Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("sink closed"))
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    let template = parse("some text").unwrap();
    let result = template.render_to_writer(&json!({}), &mut FailingWriter);
    assert!(matches!(result, Err(RenderError::Io(_))));
}

#[test]
fn test_parse_error_positions() {
    let err = parse("ok line\n   {{unclosed").unwrap_err();
    assert_eq!(err.position(), (2, 4));
}

#[test]
fn test_capacity_hint_counts_static_text() {
    let template = parse("Hello {{name}}!").unwrap();
    assert_eq!(template.capacity_hint(), "Hello !".len());
    assert_eq!(template.source(), "Hello {{name}}!");
}

#[test]
fn test_value_tree_as_data() {
    let data: Value = [
        ("title".to_string(), Value::from("Home")),
        ("tags".to_string(), Value::from(vec!["a", "b"])),
        ("draft".to_string(), Value::from(false)),
    ]
    .into_iter()
    .collect();
    let text = render_str(
        "{{title}}: {{#tags}}#{{.}} {{/tags}}{{^draft}}(live){{/draft}}",
        &data,
    )
    .unwrap();
    assert_eq!(text, "Home: #a #b (live)");
}

#[test]
fn test_templates_are_shareable_across_threads() {
    let template = parse("{{n}}").unwrap().into_owned();
    let template = std::sync::Arc::new(template);
    let handles: Vec<_> = (0..4)
        .map(|n| {
            let template = std::sync::Arc::clone(&template);
            std::thread::spawn(move || template.render(&json!({ "n": n })).unwrap())
        })
        .collect();
    let mut outputs: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    outputs.sort();
    assert_eq!(outputs, ["0", "1", "2", "3"]);
}
