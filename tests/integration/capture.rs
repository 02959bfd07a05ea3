//! Buffer capture through `capture`, `h.capture`, `concat` and `captured`

use weft::{html_filter, render, RenderOptions, Variables};

fn run(template: &str) -> String {
    let options = RenderOptions::default().with_filter(html_filter());
    render(template, &Variables::new(), &options).unwrap()
}

#[test]
fn test_capture_moves_text_out_of_the_buffer() {
    let template = "a<% with capture(\"x\"): %><b><% %>c[<%= x %>]";
    assert_eq!(run(template), "ac[<b>]");
}

#[test]
fn test_h_capture_and_captured() {
    let template = "<% with h.capture('head'): %>title<% %><%=r h.captured('head') %>|<%=r captured('head') %>";
    assert_eq!(run(template), "title|title");
}

#[test]
fn test_nested_captures() {
    let template = "a<% with capture('outer'): %>b<% with capture('inner'): %>c<% %>d<% %>e|<%=r outer %>|<%=r inner %>";
    assert_eq!(run(template), "ae|bd|c");
}

#[test]
fn test_concat_writes_to_the_buffer() {
    let template = "<% concat('<i>') %><% with capture('x'): %><% concat('y') %><% %>-<%= x %>";
    assert_eq!(run(template), "<i>-y");
}

#[test]
fn test_capture_inside_loop() {
    let template = "<% for n in range(3): %><% with capture('last'): %><%= n %><% %><% end %><%= last %>";
    assert_eq!(run(template), "2");
}

#[test]
fn test_captured_missing_name_is_key_error() {
    let options = RenderOptions::default();
    let err = render("<%= captured('nope') %>", &Variables::new(), &options).unwrap_err();
    assert!(err.to_string().contains("KeyError"));
}
