//! End-to-end rendering through the public API

use proptest::prelude::*;
use weft::{html_filter, render, RenderOptions, Value, Variables};

fn vars(pairs: &[(&str, Value)]) -> Variables {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

fn html() -> RenderOptions {
    RenderOptions::default().with_filter(html_filter())
}

#[test]
fn test_escaped_and_raw_print() {
    let variables = vars(&[("v", Value::from("<b>"))]);
    assert_eq!(render("<%= v %>", &variables, &html()).unwrap(), "&lt;b&gt;");
    assert_eq!(render("<%=r v %>", &variables, &html()).unwrap(), "<b>");
    assert_eq!(render("<%= markup(v) %>", &variables, &html()).unwrap(), "<b>");
}

#[test]
fn test_no_filter_prints_text() {
    let variables = vars(&[("v", Value::from("<b>")), ("n", Value::Int(3))]);
    let out = render("<%= v %> x<%= n %>", &variables, &RenderOptions::default()).unwrap();
    assert_eq!(out, "<b> x3");
}

#[test]
fn test_htmlquote_is_not_escaped_twice() {
    let out = render("<%= htmlquote(\"a&b\") %>", &Variables::new(), &html()).unwrap();
    assert_eq!(out, "a&amp;b");
}

#[test]
fn test_escaped_delimiters() {
    let out = render("<%% literal %%> <%= '%>' %>", &Variables::new(), &RenderOptions::default()).unwrap();
    assert_eq!(out, "<% literal %> %>");
}

#[test]
fn test_quotes_and_backslashes_survive() {
    let text = "say \"hi\" \\ 'there' \"\"\"";
    assert_eq!(render(text, &Variables::new(), &RenderOptions::default()).unwrap(), text);
}

#[test]
fn test_expressions() {
    let variables = vars(&[
        ("names", Value::list(vec![Value::from("ann"), Value::from("bob")])),
        ("price", Value::Float(2.5)),
    ]);
    let template = "<%= ', '.join(names).title() %>|<%= '%s costs %.2f' % (names[0], price) %>|<%= len(names) * 10 // 3 %>";
    let out = render(template, &variables, &RenderOptions::default()).unwrap();
    assert_eq!(out, "Ann, Bob|ann costs 2.50|6");
}

#[test]
fn test_globals_are_shadowed_by_variables() {
    let options = RenderOptions::default()
        .with_global("title", "global")
        .with_global("site", "weft");
    let variables = vars(&[("title", Value::from("local"))]);
    let out = render("<%= title %>@<%= site %>", &variables, &options).unwrap();
    assert_eq!(out, "local@weft");
}

#[test]
fn test_dict_attribute_access() {
    let user: Value = serde_json::json!({"name": "ann", "tags": ["a", "b"]}).into();
    let variables = vars(&[("user", user)]);
    let out = render("<%= user.name %>:<%= user['tags'][-1] %>", &variables, &RenderOptions::default()).unwrap();
    assert_eq!(out, "ann:b");
}

#[test]
fn test_trim_markers() {
    let template = "<ul>\n  <%- for x in xs: -%>\n  <li><%= x %></li>\n  <%- end -%>\n</ul>";
    let variables = vars(&[("xs", Value::list(vec![Value::Int(1), Value::Int(2)]))]);
    let out = render(template, &variables, &RenderOptions::default()).unwrap();
    assert_eq!(out, "<ul>\n  <li>1</li>\n  <li>2</li>\n</ul>");
}

#[test]
fn test_multiline_statement_tag() {
    let template = "<%\ntotal = 0\nfor n in nums:\n  total += n\nend\n%>sum=<%= total %>";
    let variables = vars(&[("nums", Value::list(vec![Value::Int(4), Value::Int(5)]))]);
    let out = render(template, &variables, &RenderOptions::default()).unwrap();
    assert_eq!(out, "sum=9");
}

#[test]
fn test_statement_separators() {
    let out = render("<% a = 1; b = 2 %><%= a + b %>", &Variables::new(), &RenderOptions::default()).unwrap();
    assert_eq!(out, "3");
}

#[test]
fn test_latin1_bytes() {
    let source = weft::TemplateSource::from_bytes("page", b"caf\xE9 <%= 1 %>", weft::Encoding::Latin1).unwrap();
    let compiler = weft::Compiler::new(source, &RenderOptions::default());
    assert_eq!(compiler.render(&Variables::new()).unwrap(), "café 1");
}

#[test]
fn test_cp932_bytes() {
    let encoding: weft::Encoding = "cp932".parse().unwrap();
    let bytes = b"\x93\xFA\x96\x7B <%= 'ok' %>";
    let source = weft::TemplateSource::from_bytes("page", bytes, encoding).unwrap();
    let compiler = weft::Compiler::new(source, &RenderOptions::default());
    assert_eq!(compiler.render(&Variables::new()).unwrap(), "日本 ok");

    let euc_jp: weft::Encoding = "euc-jp".parse().unwrap();
    let source = weft::TemplateSource::from_bytes("page", b"\xC6\xFC\xCB\xDC", euc_jp).unwrap();
    assert_eq!(source.text(), "日本");
}

proptest! {
    #[test]
    fn prop_tag_free_text_renders_unchanged(text in "[^<%]{0,200}") {
        let out = render(&text, &Variables::new(), &RenderOptions::default()).unwrap();
        prop_assert_eq!(out, text);
    }

    #[test]
    fn prop_printed_strings_round_trip(word in "[a-zA-Z0-9 ]{0,40}") {
        let variables = vars(&[("w", Value::from(word.as_str()))]);
        let out = render("[<%= w %>]", &variables, &html()).unwrap();
        prop_assert_eq!(out, format!("[{}]", word));
    }
}
