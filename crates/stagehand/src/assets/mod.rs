//! Asset loading
//!
//! Assets are queued with [`AssetLoader::add`] and fetched in one batch by
//! [`AssetLoader::load`]. A key that fails to load stays queued, so calling
//! `load` again retries exactly the failures; [`load_with_retry`] does that
//! under a [`RetryPolicy`].

use crate::foundation::retry::RetryPolicy;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Asset errors
#[derive(Error, Debug)]
pub enum AssetError {
    /// Reading the source failed
    #[error("Failed to read asset '{key}' from {path}: {source}")]
    Io {
        /// Asset key
        key: String,
        /// Resolved path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Key already queued or loaded
    #[error("Asset key '{0}' is already registered")]
    DuplicateKey(String),

    /// Keys must be non-empty
    #[error("Asset key cannot be empty")]
    EmptyKey,

    /// Some keys still failed after every attempt
    #[error("Assets failed to load: {}", .0.join(", "))]
    LoadFailed(Vec<String>),
}

/// Asset category, inferred from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    /// png, jpg, gif, webp
    Texture,
    /// obj, fbx, gltf, glb
    Model,
    /// ttf, otf, woff, fnt
    Font,
    /// WebAssembly module
    Wasm,
    /// wav, ogg, mp3
    Audio,
    /// json, ron, toml, txt, csv
    Data,
    /// Anything else, including in-memory sources
    Unknown,
}

impl AssetKind {
    /// Classify by extension (case-insensitive)
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "png" | "jpg" | "jpeg" | "gif" | "webp" => Self::Texture,
            "obj" | "fbx" | "gltf" | "glb" => Self::Model,
            "ttf" | "otf" | "woff" | "woff2" | "fnt" => Self::Font,
            "wasm" => Self::Wasm,
            "wav" | "ogg" | "mp3" => Self::Audio,
            "json" | "ron" | "toml" | "txt" | "csv" => Self::Data,
            _ => Self::Unknown,
        }
    }
}

/// Where an asset's bytes come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSource {
    /// File path, relative to the loader's base directory unless absolute
    Path(PathBuf),
    /// Bytes already in memory
    Bytes(Vec<u8>),
}

impl From<&str> for AssetSource {
    fn from(path: &str) -> Self {
        Self::Path(PathBuf::from(path))
    }
}

impl From<PathBuf> for AssetSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<Vec<u8>> for AssetSource {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

/// A loaded asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// Key it was registered under
    pub key: String,
    /// Category
    pub kind: AssetKind,
    /// Raw contents
    pub bytes: Vec<u8>,
}

impl Asset {
    /// Contents as UTF-8 text, if valid
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.bytes).ok()
    }
}

/// Per-key outcome of one `load` batch
#[derive(Debug, Default)]
pub struct LoadReport {
    results: Vec<(String, Result<(), AssetError>)>,
}

impl LoadReport {
    /// Record one key's result
    pub fn push(&mut self, key: impl Into<String>, result: Result<(), AssetError>) {
        self.results.push((key.into(), result));
    }

    /// Results in load order
    pub fn results(&self) -> impl Iterator<Item = (&str, &Result<(), AssetError>)> {
        self.results.iter().map(|(key, result)| (key.as_str(), result))
    }

    /// Keys that failed, with their errors
    pub fn failures(&self) -> impl Iterator<Item = (&str, &AssetError)> {
        self.results
            .iter()
            .filter_map(|(key, result)| result.as_ref().err().map(|err| (key.as_str(), err)))
    }

    /// Number of keys that loaded
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|(_, result)| result.is_ok()).count()
    }

    /// True when no key failed (including an empty batch)
    pub fn all_succeeded(&self) -> bool {
        self.failures().next().is_none()
    }

    /// Keys in the batch
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Whether the batch was empty
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Loader contract used by states and the engine
pub trait AssetLoader {
    /// Queue `source` under `key`
    fn add(&mut self, key: &str, source: AssetSource) -> Result<(), AssetError>;

    /// Load every queued key.
    ///
    /// `on_progress` receives the loaded fraction of the batch after each
    /// key, so it reaches 1.0 only when nothing failed. Failures are reported
    /// per key and stay queued.
    fn load(&mut self, on_progress: Option<&mut dyn FnMut(f32)>) -> LoadReport;

    /// A loaded asset
    fn get(&self, key: &str) -> Option<&Asset>;

    /// Drop a loaded or queued asset; returns whether anything was removed
    fn unload(&mut self, key: &str) -> bool;

    /// Whether `key` is loaded
    fn is_asset_loaded(&self, key: &str) -> bool;

    /// Keys still waiting to be loaded
    fn pending(&self) -> Vec<String>;
}

/// Loader that reads from the filesystem
#[derive(Debug)]
pub struct FileAssetLoader {
    base_dir: PathBuf,
    queue: Vec<(String, AssetSource)>,
    cache: HashMap<String, Asset>,
}

impl FileAssetLoader {
    /// Loader rooted at `base_dir`
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            queue: Vec::new(),
            cache: HashMap::new(),
        }
    }

    /// Directory relative paths resolve against
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn read(&self, key: &str, source: &AssetSource) -> Result<Asset, AssetError> {
        match source {
            AssetSource::Bytes(bytes) => Ok(Asset {
                key: key.to_string(),
                kind: AssetKind::Unknown,
                bytes: bytes.clone(),
            }),
            AssetSource::Path(path) => {
                let full = self.base_dir.join(path);
                let bytes = std::fs::read(&full).map_err(|source| AssetError::Io {
                    key: key.to_string(),
                    path: full.clone(),
                    source,
                })?;
                Ok(Asset {
                    key: key.to_string(),
                    kind: AssetKind::from_path(path),
                    bytes,
                })
            }
        }
    }
}

impl AssetLoader for FileAssetLoader {
    fn add(&mut self, key: &str, source: AssetSource) -> Result<(), AssetError> {
        if key.is_empty() {
            return Err(AssetError::EmptyKey);
        }
        if self.cache.contains_key(key) || self.queue.iter().any(|(k, _)| k == key) {
            return Err(AssetError::DuplicateKey(key.to_string()));
        }
        self.queue.push((key.to_string(), source));
        Ok(())
    }

    fn load(&mut self, mut on_progress: Option<&mut dyn FnMut(f32)>) -> LoadReport {
        let batch = std::mem::take(&mut self.queue);
        #[allow(clippy::cast_precision_loss)]
        let total = batch.len() as f32;
        let mut report = LoadReport::default();
        let mut loaded = 0.0_f32;

        for (key, source) in batch {
            match self.read(&key, &source) {
                Ok(asset) => {
                    log::debug!("Loaded asset '{key}' ({:?}, {} bytes)", asset.kind, asset.bytes.len());
                    self.cache.insert(key.clone(), asset);
                    report.push(key, Ok(()));
                    loaded += 1.0;
                }
                Err(err) => {
                    log::warn!("{err}");
                    report.push(key.clone(), Err(err));
                    self.queue.push((key, source));
                }
            }
            if let Some(progress) = on_progress.as_mut() {
                progress(loaded / total);
            }
        }
        report
    }

    fn get(&self, key: &str) -> Option<&Asset> {
        self.cache.get(key)
    }

    fn unload(&mut self, key: &str) -> bool {
        let queued = self.queue.len();
        self.queue.retain(|(k, _)| k != key);
        self.cache.remove(key).is_some() || queued != self.queue.len()
    }

    fn is_asset_loaded(&self, key: &str) -> bool {
        self.cache.contains_key(key)
    }

    fn pending(&self) -> Vec<String> {
        self.queue.iter().map(|(key, _)| key.clone()).collect()
    }
}

/// Load everything queued, retrying failed keys under `policy`.
///
/// Progress is the loaded fraction of the initial queue, so it never
/// decreases across attempts. Returns the number of keys loaded.
pub fn load_with_retry(
    loader: &mut dyn AssetLoader,
    policy: &RetryPolicy,
    mut on_progress: Option<&mut dyn FnMut(f32)>,
) -> Result<usize, AssetError> {
    let total = loader.pending().len();
    if total == 0 {
        if let Some(progress) = on_progress.as_mut() {
            progress(1.0);
        }
        return Ok(0);
    }

    let mut loaded = 0usize;
    policy.run(|attempt| {
        #[allow(clippy::cast_precision_loss)]
        let (base, batch, total) = (loaded as f32, loader.pending().len() as f32, total as f32);
        let mut report_progress = |fraction: f32| {
            if let Some(progress) = on_progress.as_mut() {
                progress(((base + fraction * batch) / total).min(1.0));
            }
        };
        let forward: &mut dyn FnMut(f32) = &mut report_progress;
        let report = loader.load(Some(forward));
        loaded += report.succeeded();
        if report.all_succeeded() {
            log::debug!("Asset batch finished on attempt {attempt}");
            Ok(loaded)
        } else {
            Err(AssetError::LoadFailed(loader.pending()))
        }
    })
}
