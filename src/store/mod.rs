//! Key-value persistence for the profile and link documents.
//!
//! Documents are JSON values under fixed keys. A missing key means "use the
//! default"; a present but unparsable value is reported as
//! [`StoreError::Malformed`] and left for the caller to decide on.

use std::collections::HashMap;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::models::profile::{LinkCollection, Profile};

pub const PROFILE_KEY: &str = "lumina_profile";
pub const LINKS_KEY: &str = "lumina_links";

const MAX_KEY_LEN: usize = 128;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage I/O error for key {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("stored value under {key} is malformed: {source}")]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode value for {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("storage lock poisoned")]
    Poisoned,
}

/// Raw string slots, one per key.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Process-local store. Cloning shares the underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slots: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let slots = self.slots.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(slots.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut slots = self.slots.lock().map_err(|_| StoreError::Poisoned)?;
        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut slots = self.slots.lock().map_err(|_| StoreError::Poisoned)?;
        slots.remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per slot inside a data directory.
///
/// Writes go to a sibling temp file which is then renamed over the target, so
/// a reader never observes a half-written document.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| StoreError::Io {
            key: root.display().to_string(),
            source,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        assert!(!key.is_empty(), "Storage key cannot be empty");
        assert!(key.len() <= MAX_KEY_LEN, "Storage key exceeds length bound");
        assert!(
            key.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'),
            "Storage key must be a plain identifier"
        );
        self.root.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key);
        let tmp_path = path.with_extension("json.tmp");
        let io_err = |source| StoreError::Io {
            key: key.to_string(),
            source,
        };

        let mut file = fs::File::create(&tmp_path).map_err(io_err)?;
        file.write_all(value.as_bytes()).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        drop(file);
        fs::rename(&tmp_path, &path).map_err(io_err)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }
}

/// Typed access to the two page documents.
#[derive(Clone)]
pub struct DocumentStore {
    backend: Arc<dyn KeyValueStore>,
}

impl DocumentStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    pub fn load_profile(&self) -> Result<Profile, StoreError> {
        Ok(self.load_document(PROFILE_KEY)?.unwrap_or_default())
    }

    pub fn save_profile(&self, profile: &Profile) -> Result<(), StoreError> {
        self.save_document(PROFILE_KEY, profile)
    }

    pub fn load_links(&self) -> Result<LinkCollection, StoreError> {
        Ok(self.load_document(LINKS_KEY)?.unwrap_or_default())
    }

    pub fn save_links(&self, links: &LinkCollection) -> Result<(), StoreError> {
        self.save_document(LINKS_KEY, links)
    }

    fn load_document<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let Some(raw) = self.backend.get(key)? else {
            debug!("No stored document under {key}");
            return Ok(None);
        };
        let value = serde_json::from_str(&raw).map_err(|source| StoreError::Malformed {
            key: key.to_string(),
            source,
        })?;
        Ok(Some(value))
    }

    fn save_document<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(value).map_err(|source| StoreError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.backend.set(key, &encoded)?;
        debug!("Persisted document {key} ({} bytes)", encoded.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::profile::SocialLink;

    fn memory_documents() -> (MemoryStore, DocumentStore) {
        let backend = MemoryStore::new();
        let documents = DocumentStore::new(Arc::new(backend.clone()));
        (backend, documents)
    }

    fn sample_links() -> LinkCollection {
        LinkCollection::new(vec![
            SocialLink {
                id: "z".to_string(),
                name: "ZED".to_string(),
                url: "not a url".to_string(),
                icon: "globe".to_string(),
                color: "#000".to_string(),
                visible: false,
            },
            SocialLink {
                id: "a".to_string(),
                name: "ALPHA".to_string(),
                url: "https://alpha.example".to_string(),
                icon: "github".to_string(),
                color: "#fff".to_string(),
                visible: true,
            },
        ])
    }

    #[test]
    fn empty_store_yields_defaults() {
        let (_, documents) = memory_documents();
        assert_eq!(documents.load_profile().unwrap(), Profile::default());
        assert_eq!(documents.load_links().unwrap(), LinkCollection::default());
    }

    #[test]
    fn profile_round_trips() {
        let (_, documents) = memory_documents();
        let profile = Profile {
            name: "Ada".to_string(),
            username: "ada_l".to_string(),
            bio: "ENGINES".to_string(),
            avatar: "https://img.example/ada.png".to_string(),
        };
        documents.save_profile(&profile).unwrap();
        assert_eq!(documents.load_profile().unwrap(), profile);
    }

    #[test]
    fn links_round_trip_with_order_and_visibility() {
        let (_, documents) = memory_documents();
        let links = sample_links();
        documents.save_links(&links).unwrap();
        let loaded = documents.load_links().unwrap();
        assert_eq!(loaded, links);
        assert_eq!(loaded.as_slice()[0].id, "z");
        assert!(!loaded.as_slice()[0].visible);
    }

    #[test]
    fn malformed_document_is_reported() {
        let (backend, documents) = memory_documents();
        backend.set(PROFILE_KEY, "{not json").unwrap();
        let err = documents.load_profile().unwrap_err();
        assert!(matches!(err, StoreError::Malformed { ref key, .. } if key == PROFILE_KEY));
    }

    #[test]
    fn file_store_round_trip_and_remove() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(temp_dir.path().join("data")).unwrap();
        assert_eq!(store.get("slot").unwrap(), None);

        store.set("slot", "\"first\"").unwrap();
        store.set("slot", "\"second\"").unwrap();
        assert_eq!(store.get("slot").unwrap().as_deref(), Some("\"second\""));
        assert!(!store.root().join("slot.json.tmp").exists());

        store.remove("slot").unwrap();
        store.remove("slot").unwrap();
        assert_eq!(store.get("slot").unwrap(), None);
    }

    #[test]
    fn file_documents_survive_reopen() {
        let temp_dir = tempfile::tempdir().unwrap();
        let links = sample_links();
        {
            let store = FileStore::open(temp_dir.path()).unwrap();
            DocumentStore::new(Arc::new(store)).save_links(&links).unwrap();
        }
        let reopened = DocumentStore::new(Arc::new(FileStore::open(temp_dir.path()).unwrap()));
        assert_eq!(reopened.load_links().unwrap(), links);
        assert_eq!(reopened.load_profile().unwrap(), Profile::default());
    }
}
