//! Block inference: implicit openers, closers and continuation keywords

use weft::{render, RenderOptions, Value, Variables};

fn run(
    template: &str,
    pairs: &[(&str, Value)],
) -> String {
    let variables: Variables = pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
    render(template, &variables, &RenderOptions::default()).unwrap()
}

fn ints(values: &[i64]) -> Value {
    Value::list(values.iter().map(|&i| Value::Int(i)).collect())
}

#[test]
fn test_balanced_if() {
    let template = "<% if x: %>A<% end %>";
    assert_eq!(run(template, &[("x", Value::Bool(true))]), "A");
    assert_eq!(run(template, &[("x", Value::Bool(false))]), "");
}

#[test]
fn test_empty_tag_closes_block() {
    let template = "<% for i in xs: %><%= i %>,<% %>done";
    assert_eq!(run(template, &[("xs", ints(&[1, 2, 3]))]), "1,2,3,done");
}

#[test]
fn test_explicit_braces() {
    let template = "<% for i in xs {: %>[<%= i %>]<% :} %>";
    assert_eq!(run(template, &[("xs", ints(&[7, 8]))]), "[7][8]");
}

#[test]
fn test_if_elif_else() {
    let template = "<% if n > 1: %>many<% elif n == 1: %>one<% else: %>none<% end %>";
    assert_eq!(run(template, &[("n", Value::Int(5))]), "many");
    assert_eq!(run(template, &[("n", Value::Int(1))]), "one");
    assert_eq!(run(template, &[("n", Value::Int(0))]), "none");
}

#[test]
fn test_nested_loops() {
    let template = "<% for row in rows: %><% for cell in row: %><%= cell %><% end %>;<% end %>";
    let rows = Value::list(vec![ints(&[1, 2]), ints(&[3])]);
    assert_eq!(run(template, &[("rows", rows)]), "12;3;");
}

#[test]
fn test_try_except_finally() {
    let template = "<% try: %><%= 1 // d %><% except ZeroDivisionError as e: %>caught<% finally: %>!<% end %>";
    assert_eq!(run(template, &[("d", Value::Int(0))]), "caught!");
    assert_eq!(run(template, &[("d", Value::Int(1))]), "1!");
}

#[test]
fn test_except_lookup_error() {
    let template = "<% try: %><%= xs[9] %><% except LookupError: %>missing<% end %>";
    assert_eq!(run(template, &[("xs", ints(&[1]))]), "missing");
}

#[test]
fn test_while_break_continue() {
    let template = "<% i = 0 %><% while True: %><% i += 1 %><% if i == 2: %><% continue %><% end %><% if i > 4: %><% break %><% end %><%= i %><% end %>";
    assert_eq!(run(template, &[]), "134");
}

#[test]
fn test_for_unpacks_items() {
    let data: Value = serde_json::json!({"a": 1, "b": 2}).into();
    let template = "<% for k, v in data.items(): %><%= k %>=<%= v %>;<% end %>";
    assert_eq!(run(template, &[("data", data)]), "a=1;b=2;");
}

#[test]
fn test_dict_literal_colon_does_not_open() {
    let template = "<% d = {\"k\": \"v\"} %><%= d['k'] %>";
    assert_eq!(run(template, &[]), "v");
}

#[test]
fn test_else_inside_brace_block() {
    let template = "<% if x {: %>yes<% :} else {: %>no<% :} %>";
    assert_eq!(run(template, &[("x", Value::Bool(false))]), "no");
}
