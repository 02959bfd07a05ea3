//! Artifact cache behavior seen through the renderer

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use weft::{ArtifactCache, FsStore, MemoryStore, Renderer, RendererOptions, Variables, FORMAT_VERSION};

fn write_template(
    path: &Path,
    text: &str,
    age: Duration,
) {
    fs::write(path, text).unwrap();
    let file = fs::File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() - age).unwrap();
}

fn renderer(dir: &Path) -> Renderer {
    Renderer::new(RendererOptions {
        cache_dir: Some(dir.to_path_buf()),
        ..Default::default()
    })
}

#[test]
fn test_second_renderer_loads_from_disk() {
    let templates = tempfile::tempdir().unwrap();
    let cache_dir = tempfile::tempdir().unwrap();
    let page = templates.path().join("page.html");
    write_template(&page, "<%= 6 * 7 %>", Duration::from_secs(3600));

    let first = renderer(cache_dir.path());
    assert_eq!(first.render_file(&page, &Variables::new()).unwrap(), "42");
    assert_eq!(first.cache().stats().misses, 1);

    let second = renderer(cache_dir.path());
    assert_eq!(second.render_file(&page, &Variables::new()).unwrap(), "42");
    assert_eq!(second.cache().stats().hits, 1);

    let stored = FsStore::new(cache_dir.path()).path_for(&page.display().to_string(), FORMAT_VERSION);
    let artifact: serde_json::Value = serde_json::from_slice(&fs::read(stored).unwrap()).unwrap();
    assert_eq!(artifact["format"], FORMAT_VERSION);
    assert!(artifact["program"]["source"].as_str().unwrap().contains("__buffer_append"));
}

#[test]
fn test_edited_template_is_recompiled() {
    let templates = tempfile::tempdir().unwrap();
    let cache_dir = tempfile::tempdir().unwrap();
    let page = templates.path().join("page.html");
    write_template(&page, "old", Duration::from_secs(3600));
    renderer(cache_dir.path()).render_file(&page, &Variables::new()).unwrap();

    fs::write(&page, "new").unwrap();
    let file = fs::File::options().write(true).open(&page).unwrap();
    file.set_modified(SystemTime::now() + Duration::from_secs(60)).unwrap();

    let fresh = renderer(cache_dir.path());
    assert_eq!(fresh.render_file(&page, &Variables::new()).unwrap(), "new");
    assert_eq!(fresh.cache().stats().hits, 0);
}

#[test]
fn test_other_format_version_misses() {
    let templates = tempfile::tempdir().unwrap();
    let page = templates.path().join("page.html");
    write_template(&page, "v", Duration::from_secs(3600));

    let store = Arc::new(MemoryStore::new());
    let old = Renderer::with_cache(RendererOptions::default(), ArtifactCache::with_format(store.clone(), "weft-0"));
    old.render_file(&page, &Variables::new()).unwrap();

    let current = Renderer::with_cache(RendererOptions::default(), ArtifactCache::new(store.clone()));
    current.render_file(&page, &Variables::new()).unwrap();
    assert_eq!(current.cache().stats().hits, 0);
    assert_eq!(store.len(), 2);

    let again = Renderer::with_cache(RendererOptions::default(), ArtifactCache::new(store));
    again.render_file(&page, &Variables::new()).unwrap();
    assert_eq!(again.cache().stats().hits, 1);
}
