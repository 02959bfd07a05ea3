//! Concurrent renders share programs but never namespaces

use std::fs;
use std::sync::Arc;
use std::thread;

use weft::{Renderer, RendererOptions, Value, Variables};

#[test]
fn test_parallel_renders_of_one_template() {
    let dir = tempfile::tempdir().unwrap();
    let page = dir.path().join("page.html");
    fs::write(&page, "<% total = 0 %><% for i in range(n): %><% total += i %><% end %><%= total %>").unwrap();

    let renderer = Arc::new(Renderer::new(RendererOptions::default()));
    let handles: Vec<_> = (0..8i64)
        .map(|n| {
            let renderer = Arc::clone(&renderer);
            let page = page.clone();
            thread::spawn(move || {
                let mut variables = Variables::new();
                variables.insert("n".to_string(), Value::Int(n));
                renderer.render_file(&page, &variables).unwrap()
            })
        })
        .collect();

    for (n, handle) in handles.into_iter().enumerate() {
        let n = n as i64;
        assert_eq!(handle.join().unwrap(), (n * (n - 1) / 2).to_string());
    }
    assert_eq!(renderer.cache().stats().misses, 1);
}

#[test]
fn test_shared_globals_across_threads() {
    let mut globals = Variables::new();
    globals.insert("greeting".to_string(), Value::from("hi"));
    let renderer = Arc::new(Renderer::new(RendererOptions {
        globals,
        ..Default::default()
    }));
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let renderer = Arc::clone(&renderer);
            thread::spawn(move || {
                let mut variables = Variables::new();
                variables.insert("i".to_string(), Value::Int(i));
                renderer.render_string("<%= greeting %> <%= i %>", &variables).unwrap()
            })
        })
        .collect();
    let outputs: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(outputs, vec!["hi 0", "hi 1", "hi 2", "hi 3"]);
}
