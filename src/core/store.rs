//! JSON-file persistence for characters, transcripts and the debug log.
//!
//! Each collection lives in its own file under a single data directory and is
//! rewritten atomically on every save.

use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::character::Character;
use crate::core::config::data::path_display;
use crate::core::message::Transcripts;

const CHARACTERS_FILE: &str = "characters.json";
const TRANSCRIPTS_FILE: &str = "chat-history.json";
const DEBUG_LOG_FILE: &str = "debug-log.json";

/// Errors raised by [`DataStore`].
#[derive(Debug)]
pub enum StoreError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    NoDataDir,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Read { path, source } => {
                write!(f, "Failed to read {}: {}", path_display(path), source)
            }
            StoreError::Parse { path, source } => {
                write!(f, "Failed to parse {}: {}", path_display(path), source)
            }
            StoreError::Write { path, source } => {
                write!(f, "Failed to write {}: {}", path_display(path), source)
            }
            StoreError::NoDataDir => write!(f, "Failed to determine data directory"),
        }
    }
}

impl StdError for StoreError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            StoreError::Read { source, .. } | StoreError::Write { source, .. } => Some(source),
            StoreError::Parse { source, .. } => Some(source),
            StoreError::NoDataDir => None,
        }
    }
}

/// Key-value style store backed by one JSON file per collection.
#[derive(Debug, Clone)]
pub struct DataStore {
    root: PathBuf,
}

impl DataStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store rooted at the platform data directory.
    pub fn open_default() -> Result<Self, StoreError> {
        let proj_dirs =
            ProjectDirs::from("org", "liunian", "liunian").ok_or(StoreError::NoDataDir)?;
        Ok(Self::new(proj_dirs.data_dir()))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn debug_log_path(&self) -> PathBuf {
        self.root.join(DEBUG_LOG_FILE)
    }

    pub fn load_characters(&self) -> Result<Vec<Character>, StoreError> {
        read_json(&self.root.join(CHARACTERS_FILE))
    }

    pub fn save_characters(&self, characters: &[Character]) -> Result<(), StoreError> {
        write_json(&self.root.join(CHARACTERS_FILE), &characters)
    }

    pub fn load_transcripts(&self) -> Result<Transcripts, StoreError> {
        read_json(&self.root.join(TRANSCRIPTS_FILE))
    }

    pub fn save_transcripts(&self, transcripts: &Transcripts) -> Result<(), StoreError> {
        write_json(&self.root.join(TRANSCRIPTS_FILE), transcripts)
    }
}

/// Missing files read as the collection's empty value.
pub(crate) fn read_json<T>(path: &Path) -> Result<T, StoreError>
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        return Ok(T::default());
    }
    let contents = fs::read_to_string(path).map_err(|source| StoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    if contents.trim().is_empty() {
        return Ok(T::default());
    }
    serde_json::from_str(&contents).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn write_json<T>(path: &Path, value: &T) -> Result<(), StoreError>
where
    T: Serialize + ?Sized,
{
    let write_err = |source: std::io::Error| StoreError::Write {
        path: path.to_path_buf(),
        source,
    };

    let parent = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(write_err)?;

    let contents = serde_json::to_vec_pretty(value).map_err(|err| write_err(err.into()))?;
    let mut temp_file = NamedTempFile::new_in(parent).map_err(write_err)?;
    temp_file.write_all(&contents).map_err(write_err)?;
    temp_file.as_file().sync_all().map_err(write_err)?;
    temp_file.persist(path).map_err(|err| write_err(err.error))?;

    debug!(path = %path.display(), bytes = contents.len(), "persisted");
    Ok(())
}
