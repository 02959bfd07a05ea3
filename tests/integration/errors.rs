//! Structural and runtime failures

use weft::{render, ExceptionKind, RenderOptions, TemplateError, Variables};

fn fail(template: &str) -> TemplateError {
    render(template, &Variables::new(), &RenderOptions::default()).unwrap_err()
}

#[test]
fn test_unclosed_block_is_rejected() {
    let err = fail("<% if x: %>A");
    assert!(err.is_structural());
    assert!(err.to_string().contains("1 unclosed block"));
}

#[test]
fn test_stray_closer_is_rejected() {
    assert!(fail("A<% end %>").is_structural());
    assert!(fail("<% :} %>").is_structural());
    assert!(fail("<% else: %>x").is_structural());
}

#[test]
fn test_unterminated_tag() {
    let err = fail("line one\n<%= name");
    assert!(err.to_string().contains("unterminated tag opened at line 2"));
}

#[test]
fn test_script_syntax_error_is_structural() {
    let err = fail("ok\n<% x = = 1 %>");
    assert!(err.is_structural());
    assert!(err.context().unwrap().contains("x = = 1"));
}

#[test]
fn test_deeply_nested_expression_is_structural() {
    let depth = 300;
    let template = format!("<%= {}1{} %>", "(".repeat(depth), ")".repeat(depth));
    let err = fail(&template);
    assert!(err.is_structural());
    assert!(err.to_string().contains("nested too deeply"));
}

#[test]
fn test_break_outside_loop_is_structural() {
    assert!(fail("<% break %>").is_structural());
}

#[test]
fn test_runtime_error_maps_to_template_line() {
    let err = fail("one\ntwo\n<%= undefined_name %>\nfour");
    match err {
        TemplateError::Runtime {
            ref name,
            kind,
            line,
            template_line,
            ref window,
            ..
        } => {
            assert_eq!(name, "<string>");
            assert_eq!(kind, ExceptionKind::NameError);
            assert_eq!(template_line, Some(3));
            assert!(window.contains(&format!("{:04} : __buffer_append(__filter( undefined_name ))", line)));
        }
        ref other => panic!("unexpected {:?}", other),
    }
    assert!(err.to_string().contains("template line 3"));
}

#[test]
fn test_raise_from_template() {
    let err = fail("<% raise ValueError('bad input') %>");
    match err {
        TemplateError::Runtime { kind, message, .. } => {
            assert_eq!(kind, ExceptionKind::ValueError);
            assert_eq!(message, "bad input");
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_overflow_and_type_errors() {
    let err = fail("<%= 9223372036854775807 + 1 %>");
    assert!(matches!(err, TemplateError::Runtime { kind: ExceptionKind::OverflowError, .. }));
    let err = fail("<%= 'a' + 1 %>");
    assert!(matches!(err, TemplateError::Runtime { kind: ExceptionKind::TypeError, .. }));
}

#[test]
fn test_handled_error_does_not_escape() {
    let out = render(
        "<% try: %><% raise KeyError('k') %><% except Exception as e: %><%= e %><% end %>",
        &Variables::new(),
        &RenderOptions::default(),
    )
    .unwrap();
    assert_eq!(out, "k");
}
