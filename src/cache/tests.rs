//! Artifact cache tests

use std::time::{Duration, SystemTime};

use super::*;

fn source_at(
    identity: &str,
    text: &str,
    mtime: SystemTime,
) -> TemplateSource {
    TemplateSource::from_string(text).with_identity(identity).with_mtime(mtime)
}

fn an_hour_ago() -> SystemTime {
    SystemTime::now() - Duration::from_secs(3600)
}

#[test]
fn test_second_request_is_a_hit() {
    let store = Arc::new(MemoryStore::new());
    let cache = ArtifactCache::new(store.clone());
    let source = source_at("page", "<%= 1 %>", an_hour_ago());

    let first = cache.compile_or_load(&source).unwrap();
    let second = cache.compile_or_load(&source).unwrap();
    assert_eq!(*first, *second);
    assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1 });
    assert_eq!(store.len(), 1);
}

#[test]
fn test_newer_source_invalidates() {
    let store = Arc::new(MemoryStore::new());
    let cache = ArtifactCache::new(store.clone());
    cache.compile_or_load(&source_at("page", "old", an_hour_ago())).unwrap();

    let edited = source_at("page", "new", SystemTime::now() + Duration::from_secs(60));
    let program = cache.compile_or_load(&edited).unwrap();
    assert!(program.source.contains("new"));
    assert_eq!(cache.stats().misses, 2);
}

#[test]
fn test_format_mismatch_is_a_miss() {
    let store = Arc::new(MemoryStore::new());
    let source = source_at("page", "x", an_hour_ago());
    ArtifactCache::new(store.clone()).compile_or_load(&source).unwrap();

    // Same key, stale format tag inside the artifact
    let entry = store.load("page", FORMAT_VERSION).unwrap().unwrap();
    let mut artifact: serde_json::Value = serde_json::from_slice(&entry.artifact).unwrap();
    artifact["format"] = serde_json::Value::from("weft-0");
    store.insert(
        FORMAT_VERSION,
        CacheEntry {
            artifact: serde_json::to_vec(&artifact).unwrap(),
            ..entry
        },
    );

    let cache = ArtifactCache::new(store.clone());
    cache.compile_or_load(&source).unwrap();
    assert_eq!(cache.stats(), CacheStats { hits: 0, misses: 1 });
}

#[test]
fn test_garbage_entry_is_a_miss() {
    let store = Arc::new(MemoryStore::new());
    store.insert(
        FORMAT_VERSION,
        CacheEntry {
            identity: "page".to_string(),
            stored: SystemTime::now(),
            artifact: b"{ not json".to_vec(),
        },
    );
    let cache = ArtifactCache::new(store);
    let program = cache.compile_or_load(&source_at("page", "ok", an_hour_ago())).unwrap();
    assert!(program.source.contains("ok"));
    assert_eq!(cache.stats().hits, 0);
}

#[test]
fn test_anonymous_sources_are_not_stored() {
    let store = Arc::new(MemoryStore::new());
    let cache = ArtifactCache::new(store.clone());
    cache.compile_or_load(&TemplateSource::from_string("x")).unwrap();
    assert!(store.is_empty());
}

#[test]
fn test_structural_errors_are_not_stored() {
    let store = Arc::new(MemoryStore::new());
    let cache = ArtifactCache::new(store.clone());
    let err = cache.compile_or_load(&source_at("page", "<% if x: %>", an_hour_ago())).unwrap_err();
    assert!(err.is_structural());
    assert!(store.is_empty());
}

#[test]
fn test_fs_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let cache = ArtifactCache::in_dir(dir.path());
    let source = source_at("templates/page.html", "<%= 2 %>", an_hour_ago());

    let compiled = cache.compile_or_load(&source).unwrap();
    let path = FsStore::new(dir.path()).path_for("templates/page.html", FORMAT_VERSION);
    assert_eq!(
        path.file_name().unwrap().to_str().unwrap(),
        "templates_page.html_weft-1.json"
    );
    assert!(path.exists());

    let reloaded = ArtifactCache::in_dir(dir.path()).compile_or_load(&source).unwrap();
    assert_eq!(*compiled, *reloaded);
}

#[test]
fn test_unwritable_cache_still_compiles() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("file");
    std::fs::write(&blocker, b"").unwrap();
    // A regular file where the cache directory should be
    let cache = ArtifactCache::in_dir(&blocker);
    let program = cache.compile_or_load(&source_at("page", "ok", an_hour_ago())).unwrap();
    assert!(program.source.contains("ok"));
}
