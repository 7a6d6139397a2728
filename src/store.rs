//! Persistence of page layouts and action bindings.
//!
//! Two JSON documents live in the config directory:
//!
//! - `pages.json`: `{ page: { key: ButtonConfig } }`, must contain `main`
//! - `buttons.json`: `{ page: { key: { action, type } } }`
//!
//! Loading never fails: missing or corrupt files are replaced in memory by
//! defaults and the corrupt file is left on disk untouched. Inside a readable
//! file, invalid keys and entries are dropped one by one. Saving writes a
//! temp file next to the target and renames it into place.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::{DeckError, Result};
use crate::model::{Bindings, MAIN_PAGE, Pages, default_pages};

/// File name of the page layout document.
pub const PAGES_FILE: &str = "pages.json";

/// File name of the action binding document.
pub const BUTTONS_FILE: &str = "buttons.json";

/// Contents of both documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub pages: Pages,
    pub bindings: Bindings,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            pages: default_pages(),
            bindings: Bindings::new(),
        }
    }
}

/// Reads and writes the two documents in one directory.
#[derive(Debug, Clone)]
pub struct PersistenceStore {
    dir: PathBuf,
}

impl PersistenceStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the documents.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn pages_path(&self) -> PathBuf {
        self.dir.join(PAGES_FILE)
    }

    pub fn bindings_path(&self) -> PathBuf {
        self.dir.join(BUTTONS_FILE)
    }

    /// Create the config directory, logging instead of failing.
    pub fn ensure_dir(&self) {
        if let Err(e) = fs::create_dir_all(&self.dir) {
            warn!(dir = %self.dir.display(), error = %e, "Failed to create config directory");
        }
    }

    /// Load both documents, substituting defaults for anything unusable.
    ///
    /// Entries are decoded one at a time: a bad key or button drops only
    /// that entry, the rest of the document is kept.
    pub fn load(&self) -> Snapshot {
        let pages_path = self.pages_path();
        let pages = match read_document::<RawDocument>(&pages_path) {
            Some(raw) if raw.contains_key(MAIN_PAGE) => {
                let mut pages: Pages = decode_entries(&pages_path, raw);
                pages.entry(MAIN_PAGE.to_string()).or_default();
                info!(count = pages.len(), "Loaded pages from disk");
                pages
            }
            Some(_) => {
                warn!(
                    path = %pages_path.display(),
                    "Pages file has no '{MAIN_PAGE}' page, using defaults"
                );
                default_pages()
            }
            None => default_pages(),
        };

        let bindings_path = self.bindings_path();
        let bindings: Bindings = read_document::<RawDocument>(&bindings_path)
            .map(|raw| decode_entries(&bindings_path, raw))
            .unwrap_or_default();
        if !bindings.is_empty() {
            info!(pages = bindings.len(), "Loaded button actions from disk");
        }

        Snapshot { pages, bindings }
    }

    /// Persist both documents; failures are logged and swallowed.
    pub fn save(&self, pages: &Pages, bindings: &Bindings) {
        if let Err(e) = self.try_save(pages, bindings) {
            warn!(error = %e, "Failed to save state");
        }
    }

    /// Persist both documents, reporting the first failure.
    pub fn try_save(&self, pages: &Pages, bindings: &Bindings) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| persistence_error(&self.dir, &e))?;
        write_document(&self.pages_path(), pages)?;
        write_document(&self.bindings_path(), bindings)?;
        debug!(dir = %self.dir.display(), "State saved");
        Ok(())
    }
}

fn persistence_error(path: &Path, reason: &dyn std::fmt::Display) -> DeckError {
    DeckError::Persistence {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

/// Either document before its entries are decoded.
type RawDocument = BTreeMap<String, Value>;

/// Decode `{ page: { key: T } }` entry by entry, dropping what does not fit.
fn decode_entries<T: DeserializeOwned>(
    path: &Path,
    raw: RawDocument,
) -> BTreeMap<String, BTreeMap<u8, T>> {
    let mut decoded = BTreeMap::new();
    for (page, entries) in raw {
        let Value::Object(entries) = entries else {
            warn!(path = %path.display(), page = %page, "Skipping page that is not an object");
            continue;
        };

        let mut keys = BTreeMap::new();
        for (key, entry) in entries {
            let Ok(index) = key.parse::<u8>() else {
                warn!(path = %path.display(), page = %page, key = %key, "Skipping invalid key");
                continue;
            };
            match serde_json::from_value::<T>(entry) {
                Ok(value) => {
                    keys.insert(index, value);
                }
                Err(e) => warn!(
                    path = %path.display(),
                    page = %page,
                    key = index,
                    error = %e,
                    "Skipping invalid entry"
                ),
            }
        }
        decoded.insert(page, keys);
    }
    decoded
}

/// `None` when the file is missing or unreadable as `T`.
fn read_document<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "No saved file, using defaults");
            return None;
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read saved file");
            return None;
        }
    };

    match serde_json::from_str(&contents) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                "Saved file is malformed, using defaults"
            );
            None
        }
    }
}

fn write_document<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let json = serde_json::to_string_pretty(value).map_err(|e| persistence_error(path, &e))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| persistence_error(path, &e))?;
    let fill = |tmp: &mut NamedTempFile| -> io::Result<()> {
        tmp.write_all(json.as_bytes())?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()
    };
    fill(&mut tmp).map_err(|e| persistence_error(path, &e))?;
    tmp.persist(path)
        .map_err(|e| persistence_error(path, &e.error))?;
    Ok(())
}
