//! Artifact cache
//!
//! Compiled programs are persisted as JSON next to a format tag and reused
//! while the stored copy is strictly newer than the template it came from.
//! Anything short of a fresh, decodable entry of the current format is a
//! miss; misses are logged, never reported.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::template::compiler::{compile_source, Program};
use crate::template::source::TemplateSource;

/// Tag stored with every artifact; bump it whenever `Program` changes shape
pub const FORMAT_VERSION: &str = "weft-1";

/// A stored artifact and when it was written
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub identity: String,
    pub stored: SystemTime,
    pub artifact: Vec<u8>,
}

/// Where encoded artifacts live
pub trait ArtifactStore: Send + Sync {
    /// The entry for `identity` written under `format`, if any
    fn load(
        &self,
        identity: &str,
        format: &str,
    ) -> io::Result<Option<CacheEntry>>;

    fn store(
        &self,
        identity: &str,
        format: &str,
        artifact: &[u8],
    ) -> io::Result<()>;
}

/// One JSON file per template in a cache directory
#[derive(Debug, Clone)]
pub struct FsStore {
    dir: PathBuf,
}

impl FsStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<sanitized identity>_<format>.json` inside the cache directory
    pub fn path_for(
        &self,
        identity: &str,
        format: &str,
    ) -> PathBuf {
        self.dir.join(format!("{}_{}.json", sanitize(identity), sanitize(format)))
    }
}

fn sanitize(identity: &str) -> String {
    identity
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

impl ArtifactStore for FsStore {
    fn load(
        &self,
        identity: &str,
        format: &str,
    ) -> io::Result<Option<CacheEntry>> {
        let path = self.path_for(identity, format);
        let stored = match fs::metadata(&path) {
            Ok(meta) => meta.modified()?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        let artifact = fs::read(&path)?;
        Ok(Some(CacheEntry {
            identity: identity.to_string(),
            stored,
            artifact,
        }))
    }

    fn store(
        &self,
        identity: &str,
        format: &str,
        artifact: &[u8],
    ) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let mut file = tempfile::NamedTempFile::new_in(&self.dir)?;
        file.write_all(artifact)?;
        file.flush()?;
        file.persist(self.path_for(identity, format)).map_err(|e| e.error)?;
        Ok(())
    }
}

/// Process-local store, mostly for tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<(String, String), CacheEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Put an entry in place directly, bypassing the cache
    pub fn insert(
        &self,
        format: &str,
        entry: CacheEntry,
    ) {
        self.entries.lock().insert((entry.identity.clone(), format.to_string()), entry);
    }
}

impl ArtifactStore for MemoryStore {
    fn load(
        &self,
        identity: &str,
        format: &str,
    ) -> io::Result<Option<CacheEntry>> {
        Ok(self.entries.lock().get(&(identity.to_string(), format.to_string())).cloned())
    }

    fn store(
        &self,
        identity: &str,
        format: &str,
        artifact: &[u8],
    ) -> io::Result<()> {
        let entry = CacheEntry {
            identity: identity.to_string(),
            stored: SystemTime::now(),
            artifact: artifact.to_vec(),
        };
        self.insert(format, entry);
        Ok(())
    }
}

#[derive(Serialize)]
struct ArtifactRef<'a> {
    format: &'a str,
    program: &'a Program,
}

#[derive(Deserialize)]
struct Artifact {
    format: String,
    program: Program,
}

/// Hit and miss counters of one cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
}

/// Compile-or-load front of an [`ArtifactStore`]
pub struct ArtifactCache {
    store: Option<Arc<dyn ArtifactStore>>,
    format: String,
    lock: Mutex<()>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl ArtifactCache {
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self::with_format(store, FORMAT_VERSION)
    }

    pub fn with_format(
        store: Arc<dyn ArtifactStore>,
        format: impl Into<String>,
    ) -> Self {
        Self {
            store: Some(store),
            format: format.into(),
            lock: Mutex::new(()),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// Filesystem cache rooted at `dir`
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(FsStore::new(dir)))
    }

    /// A cache that always compiles
    pub fn disabled() -> Self {
        Self {
            store: None,
            format: FORMAT_VERSION.to_string(),
            lock: Mutex::new(()),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// A fresh stored program for `source`, or a newly compiled (and stored) one
    pub fn compile_or_load(
        &self,
        source: &TemplateSource,
    ) -> Result<Arc<Program>> {
        let _guard = self.lock.lock();

        let keyed = match (&self.store, source.identity()) {
            (Some(store), Some(identity)) => Some((store, identity)),
            _ => None,
        };

        if let (Some((store, identity)), Some(mtime)) = (keyed, source.mtime()) {
            if let Some(program) = self.load_fresh(store.as_ref(), identity, mtime) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(identity, "cache hit");
                return Ok(Arc::new(program));
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let program = compile_source(source)?;

        if let Some((store, identity)) = keyed {
            let encoded = serde_json::to_vec(&ArtifactRef {
                format: &self.format,
                program: &program,
            });
            let written = encoded
                .map_err(io::Error::from)
                .and_then(|bytes| store.store(identity, &self.format, &bytes));
            match written {
                Ok(()) => tracing::debug!(identity, "cached compiled program"),
                Err(e) => tracing::warn!(identity, error = %e, "failed to write cache entry"),
            }
        }
        Ok(Arc::new(program))
    }

    fn load_fresh(
        &self,
        store: &dyn ArtifactStore,
        identity: &str,
        mtime: SystemTime,
    ) -> Option<Program> {
        let entry = match store.load(identity, &self.format) {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                tracing::debug!(identity, "cache miss: no entry");
                return None;
            }
            Err(e) => {
                tracing::debug!(identity, error = %e, "cache miss: unreadable entry");
                return None;
            }
        };
        if entry.stored <= mtime {
            tracing::debug!(identity, "cache miss: stale entry");
            return None;
        }
        let artifact: Artifact = match serde_json::from_slice(&entry.artifact) {
            Ok(artifact) => artifact,
            Err(e) => {
                tracing::debug!(identity, error = %e, "cache miss: undecodable entry");
                return None;
            }
        };
        if artifact.format != self.format {
            tracing::debug!(identity, found = %artifact.format, "cache miss: format mismatch");
            return None;
        }
        if artifact.program.name != identity {
            tracing::debug!(identity, "cache miss: entry belongs to another template");
            return None;
        }
        Some(artifact.program)
    }
}

#[cfg(test)]
mod tests;
