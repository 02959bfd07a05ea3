//! Templates rendering other templates through the `renderer` global

use std::fs;
use std::path::Path;

use weft::{html_filter, Renderer, RendererOptions, TemplateError, Value, Variables};

fn renderer(dir: &Path) -> Renderer {
    Renderer::new(RendererOptions {
        template_dir: Some(dir.to_path_buf()),
        filter: Some(html_filter()),
        ..Default::default()
    })
}

#[test]
fn test_with_layout_wraps_rendered_output() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("layout.html"), "<body>\n<%= body %>\n</body>\n").unwrap();
    fs::write(
        dir.path().join("contents.html"),
        "<h1>layout test</h1>\n<div>body</div>\n<%= renderer.with_layout('layout.html') %>\n",
    )
    .unwrap();

    let out = renderer(dir.path()).render_file("contents.html", &Variables::new()).unwrap();
    assert_eq!(out, "<body>\n<h1>layout test</h1>\n<div>body</div>\n\n</body>\n\n");
}

#[test]
fn test_layout_sees_page_variables() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("layout.html"), "<title><%= title %></title><%= body %>").unwrap();
    fs::write(
        dir.path().join("page.html"),
        "<% title = 'Home & away' %><p><%= who %></p><%= renderer.with_layout('layout.html') %>",
    )
    .unwrap();

    let mut variables = Variables::new();
    variables.insert("who".to_string(), Value::from("<you>"));
    let out = renderer(dir.path()).render_file("page.html", &variables).unwrap();
    assert_eq!(out, "<title>Home &amp; away</title><p>&lt;you&gt;</p>");
}

#[test]
fn test_render_with_layout_from_rust() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("layout.html"), "[<%= body %>]").unwrap();
    fs::write(dir.path().join("page.html"), "<b><%= n %></b>").unwrap();

    let mut variables = Variables::new();
    variables.insert("n".to_string(), Value::Int(7));
    let out = renderer(dir.path())
        .render_with_layout("layout.html", "page.html", &variables)
        .unwrap();
    assert_eq!(out, "[<b>7</b>]");
}

#[test]
fn test_partials_render_with_their_own_variables() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("item.html"), "<li><%= name %></li>").unwrap();
    fs::write(
        dir.path().join("list.html"),
        "<ul><% for n in names: %><%= renderer.render('item.html', vars={'name': n}) %><% end %></ul>",
    )
    .unwrap();

    let mut variables = Variables::new();
    variables.insert("names".to_string(), Value::list(vec![Value::from("a"), Value::from("<b>")]));
    let out = renderer(dir.path()).render_file("list.html", &variables).unwrap();
    assert_eq!(out, "<ul><li>a</li><li>&lt;b&gt;</li></ul>");
}

#[test]
fn test_errors_in_inner_templates_reach_the_outer_render() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("broken.html"), "<%= missing %>").unwrap();
    fs::write(dir.path().join("page.html"), "<%= renderer.render('broken.html') %>").unwrap();

    let err = renderer(dir.path()).render_file("page.html", &Variables::new()).unwrap_err();
    match err {
        TemplateError::Runtime { kind, message, .. } => {
            assert_eq!(kind, weft::ExceptionKind::NameError);
            assert!(message.contains("name 'missing' is not defined"));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_self_rendering_template_stops() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("loop.html"), "x<%= renderer.render('loop.html') %>").unwrap();

    let err = renderer(dir.path()).render_file("loop.html", &Variables::new()).unwrap_err();
    assert!(err.to_string().contains("nested too deeply"));
}
