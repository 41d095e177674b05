// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::BTreeMap;
use std::fs::create_dir_all;
use std::fs::read_to_string;
use std::fs::write;
use std::path::Path;
use std::path::PathBuf;

use crate::error::Fallible;

pub const ACCESS_TOKEN: &str = "access_token";
pub const TOKEN_TYPE: &str = "token_type";
pub const USER_EMAIL: &str = "user_email";
pub const USER_NAME: &str = "user_name";
pub const USER_ID: &str = "user_id";

/// Every key the session owns. Logging out removes all of them.
pub const SESSION_KEYS: [&str; 5] = [ACCESS_TOKEN, TOKEN_TYPE, USER_EMAIL, USER_NAME, USER_ID];

/// A string-valued key-value store that survives restarts. Writes are
/// synchronous and the last write wins.
pub trait Storage {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&mut self, key: &str, value: &str) -> Fallible<()>;

    fn remove(&mut self, key: &str) -> Fallible<()>;
}

#[derive(Default)]
pub struct MemoryStorage {
    entries: BTreeMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Fallible<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Fallible<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Storage backed by a JSON object on disk. The whole file is rewritten on
/// every mutation.
pub struct FileStorage {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStorage {
    pub fn open(path: impl Into<PathBuf>) -> Fallible<Self> {
        let path: PathBuf = path.into();
        let entries = if path.exists() {
            log::debug!("Loading session from {}", path.display());
            let content = read_to_string(&path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            BTreeMap::new()
        };
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Fallible<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(&self.entries)?;
        write(&self.path, json)?;
        Ok(())
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Fallible<()> {
        self.entries.insert(key.to_string(), value.to_string());
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Fallible<()> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_memory_storage() -> Fallible<()> {
        let mut storage = MemoryStorage::new();
        assert_eq!(storage.get(ACCESS_TOKEN), None);
        storage.set(ACCESS_TOKEN, "abc")?;
        storage.set(ACCESS_TOKEN, "def")?;
        assert_eq!(storage.get(ACCESS_TOKEN), Some("def".to_string()));
        storage.remove(ACCESS_TOKEN)?;
        assert_eq!(storage.get(ACCESS_TOKEN), None);
        Ok(())
    }

    #[test]
    fn test_file_storage_survives_reopen() -> Fallible<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join("session.json");
        {
            let mut storage = FileStorage::open(&path)?;
            storage.set(ACCESS_TOKEN, "abc")?;
            storage.set(USER_EMAIL, "a@b.com")?;
        }
        let mut storage = FileStorage::open(&path)?;
        assert_eq!(storage.get(ACCESS_TOKEN), Some("abc".to_string()));
        assert_eq!(storage.get(USER_EMAIL), Some("a@b.com".to_string()));
        storage.remove(ACCESS_TOKEN)?;
        let storage = FileStorage::open(&path)?;
        assert_eq!(storage.get(ACCESS_TOKEN), None);
        assert_eq!(storage.get(USER_EMAIL), Some("a@b.com".to_string()));
        Ok(())
    }

    #[test]
    fn test_file_storage_missing_file_is_empty() -> Fallible<()> {
        let dir = tempdir()?;
        let storage = FileStorage::open(dir.path().join("session.json"))?;
        assert_eq!(storage.get(ACCESS_TOKEN), None);
        assert!(!storage.path().exists());
        Ok(())
    }

    #[test]
    fn test_file_storage_rejects_garbage() -> Fallible<()> {
        let dir = tempdir()?;
        let path = dir.path().join("session.json");
        write(&path, "not json")?;
        assert!(FileStorage::open(&path).is_err());
        Ok(())
    }
}
