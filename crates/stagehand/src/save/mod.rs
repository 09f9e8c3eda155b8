//! Save data persistence
//!
//! The engine core persists nothing itself. Game code talks to a
//! [`SaveHandler`], which fans writes out to every registered [`Saver`] and
//! folds their loads back into one [`SaveData`] object.

use crate::core::config::SaveConfig;
use crate::foundation::retry::RetryPolicy;
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Persisted key/value data
pub type SaveData = serde_json::Map<String, Value>;

/// Folds per-saver load results into one object
pub type MergeFn = Box<dyn Fn(Vec<SaveData>) -> SaveData>;

/// Save errors
#[derive(Error, Debug)]
pub enum SaveError {
    /// Saving is currently gated off
    #[error("SaveHandler is not currently allowed to save")]
    NotAllowed,

    /// Filesystem failure
    #[error("Save file I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding or decoding failure
    #[error("Save data serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The stored document is not a JSON object
    #[error("Save file {0} does not contain a JSON object")]
    Corrupt(PathBuf),

    /// Every saver failed to load
    #[error("No saver could load data")]
    Unavailable,
}

/// One persistence backend
pub trait Saver {
    /// Name for logs
    fn name(&self) -> &str;

    /// Merge `data` into what is stored
    fn save(&mut self, data: &SaveData) -> Result<(), SaveError>;

    /// The stored values for `keys`, or everything when `keys` is `None`
    fn load(&mut self, keys: Option<&[String]>) -> Result<SaveData, SaveError>;

    /// Drop everything stored
    fn clear(&mut self) -> Result<(), SaveError>;
}

fn select(data: &SaveData, keys: Option<&[String]>) -> SaveData {
    match keys {
        None => data.clone(),
        Some(keys) => keys
            .iter()
            .filter_map(|key| data.get(key).map(|value| (key.clone(), value.clone())))
            .collect(),
    }
}

/// Keeps data for the lifetime of the process
#[derive(Debug, Default)]
pub struct MemorySaver {
    data: SaveData,
}

impl MemorySaver {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl Saver for MemorySaver {
    fn name(&self) -> &str {
        "memory"
    }

    fn save(&mut self, data: &SaveData) -> Result<(), SaveError> {
        self.data.extend(data.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(())
    }

    fn load(&mut self, keys: Option<&[String]>) -> Result<SaveData, SaveError> {
        Ok(select(&self.data, keys))
    }

    fn clear(&mut self) -> Result<(), SaveError> {
        self.data.clear();
        Ok(())
    }
}

/// Stores one JSON object in a file
#[derive(Debug, Clone)]
pub struct FileSaver {
    path: PathBuf,
}

impl FileSaver {
    /// Saver backed by `path`; the file is created on first save
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<SaveData, SaveError> {
        if !self.path.exists() {
            return Ok(SaveData::new());
        }
        let contents = std::fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(SaveData::new());
        }
        match serde_json::from_str(&contents)? {
            Value::Object(map) => Ok(map),
            _ => Err(SaveError::Corrupt(self.path.clone())),
        }
    }

    fn write(&self, data: &SaveData) -> Result<(), SaveError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(data)?)?;
        Ok(())
    }
}

impl Saver for FileSaver {
    fn name(&self) -> &str {
        "file"
    }

    fn save(&mut self, data: &SaveData) -> Result<(), SaveError> {
        let mut stored = self.read()?;
        stored.extend(data.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.write(&stored)
    }

    fn load(&mut self, keys: Option<&[String]>) -> Result<SaveData, SaveError> {
        Ok(select(&self.read()?, keys))
    }

    fn clear(&mut self) -> Result<(), SaveError> {
        self.write(&SaveData::new())
    }
}

/// Default merge: the first non-empty result, in saver order
pub fn first_non_empty(results: Vec<SaveData>) -> SaveData {
    results.into_iter().find(|data| !data.is_empty()).unwrap_or_default()
}

/// Fans saves out to several savers and merges their loads
pub struct SaveHandler {
    savers: Vec<Box<dyn Saver>>,
    merge: MergeFn,
    retry: RetryPolicy,
    allowed_to_save: bool,
}

impl std::fmt::Debug for SaveHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaveHandler")
            .field("savers", &self.savers.iter().map(|s| s.name()).collect::<Vec<_>>())
            .field("retry", &self.retry)
            .field("allowed_to_save", &self.allowed_to_save)
            .finish_non_exhaustive()
    }
}

impl SaveHandler {
    /// Handler without savers. Saving starts out disallowed.
    pub fn new(retry: RetryPolicy) -> Self {
        Self {
            savers: Vec::new(),
            merge: Box::new(first_non_empty),
            retry,
            allowed_to_save: false,
        }
    }

    /// File saver when a path is configured, memory saver otherwise
    pub fn from_config(config: &SaveConfig) -> Self {
        let saver: Box<dyn Saver> = match &config.path {
            Some(path) => Box::new(FileSaver::new(path)),
            None => Box::new(MemorySaver::new()),
        };
        Self::new(config.retry).with_saver(saver)
    }

    /// Builder: append a saver
    #[must_use]
    pub fn with_saver(mut self, saver: Box<dyn Saver>) -> Self {
        self.savers.push(saver);
        self
    }

    /// Builder: replace the merge function
    #[must_use]
    pub fn with_merge(mut self, merge: impl Fn(Vec<SaveData>) -> SaveData + 'static) -> Self {
        self.merge = Box::new(merge);
        self
    }

    /// Number of savers
    pub fn saver_count(&self) -> usize {
        self.savers.len()
    }

    /// Whether `save` is currently permitted
    pub fn allowed_to_save(&self) -> bool {
        self.allowed_to_save
    }

    /// Open or close the save gate
    pub fn set_allowed_to_save(&mut self, allowed: bool) {
        self.allowed_to_save = allowed;
        log::debug!("SaveHandler now {}allowed to save", if allowed { "" } else { "not " });
    }

    /// Write `data` to every saver.
    ///
    /// All savers are attempted; the first failure is returned.
    pub fn save(&mut self, data: &SaveData) -> Result<(), SaveError> {
        if !self.allowed_to_save {
            return Err(SaveError::NotAllowed);
        }
        let mut first_error = None;
        for saver in &mut self.savers {
            if let Err(err) = saver.save(data) {
                log::error!("Saver '{}' failed: {err}", saver.name());
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Load from every saver and merge.
    ///
    /// Failing savers are retried under the handler's policy. Savers that
    /// still fail contribute an empty object; if all of them fail the load
    /// is an error.
    pub fn load(&mut self, keys: Option<&[String]>) -> Result<SaveData, SaveError> {
        log::debug!("Loading save keys {keys:?}");
        let mut results: Vec<Option<SaveData>> = vec![None; self.savers.len()];
        let savers = &mut self.savers;

        let outcome = self.retry.run(|_| {
            let mut last_error = None;
            for (saver, slot) in savers.iter_mut().zip(results.iter_mut()) {
                if slot.is_some() {
                    continue;
                }
                match saver.load(keys) {
                    Ok(data) => *slot = Some(data),
                    Err(err) => last_error = Some(err),
                }
            }
            last_error.map_or(Ok(()), Err)
        });

        if let Err(err) = outcome {
            if results.iter().all(Option::is_none) {
                log::error!("Every saver failed to load: {err}");
                return Err(SaveError::Unavailable);
            }
            log::warn!("Some savers failed to load: {err}");
        }
        Ok((self.merge)(results.into_iter().map(Option::unwrap_or_default).collect()))
    }

    /// Clear every saver; the first failure is returned
    pub fn clear(&mut self) -> Result<(), SaveError> {
        let mut first_error = None;
        for saver in &mut self.savers {
            if let Err(err) = saver.clear() {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
