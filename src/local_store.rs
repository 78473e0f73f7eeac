//! Keyed local slots, one JSON file per key.
//!
//! Stored shapes carry no version. A slot that no longer parses is treated as
//! absent and the caller's default takes over.

use serde::{de::DeserializeOwned, Serialize};
use std::{fs, io, path::PathBuf};

use crate::error::StorageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    Token,
    IsLoggedIn,
    IsAuthenticated,
    User,
    MeetingChecklist,
    MeetingSummary,
    DerivedTasks,
    NextMeeting,
    TaskList,
    Theme,
    Settings,
    TeamMembers,
}

impl StorageKey {
    pub const ALL: [StorageKey; 12] = [
        StorageKey::Token,
        StorageKey::IsLoggedIn,
        StorageKey::IsAuthenticated,
        StorageKey::User,
        StorageKey::MeetingChecklist,
        StorageKey::MeetingSummary,
        StorageKey::DerivedTasks,
        StorageKey::NextMeeting,
        StorageKey::TaskList,
        StorageKey::Theme,
        StorageKey::Settings,
        StorageKey::TeamMembers,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Token => "token",
            Self::IsLoggedIn => "isLoggedIn",
            Self::IsAuthenticated => "isAuthenticated",
            Self::User => "user",
            Self::MeetingChecklist => "meetingAnalysis-checklist",
            Self::MeetingSummary => "meetingAnalysis-summary",
            Self::DerivedTasks => "meetingAnalysis-derivedTasks",
            Self::NextMeeting => "meetingAnalysis-nextMeeting",
            Self::TaskList => "taskManagement-tasks",
            Self::Theme => "theme",
            Self::Settings => "settings",
            Self::TeamMembers => "team-members",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StorageError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    fn path(&self, key: StorageKey) -> PathBuf {
        self.dir.join(format!("{}.json", key.as_str()))
    }

    pub fn contains(&self, key: StorageKey) -> bool {
        self.path(key).exists()
    }

    /// Reads a slot. Missing or unreadable slots are `None`.
    pub fn load<T: DeserializeOwned>(&self, key: StorageKey) -> Option<T> {
        let path = self.path(key);
        let data = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return None,
            Err(err) => {
                tracing::warn!(key = key.as_str(), error = %err, "slot unreadable");
                return None;
            }
        };
        match serde_json::from_str(&data) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(key = key.as_str(), error = %err, "slot has an unexpected shape, ignoring it");
                None
            }
        }
    }

    pub fn load_or<T: DeserializeOwned>(&self, key: StorageKey, default: impl FnOnce() -> T) -> T {
        self.load(key).unwrap_or_else(default)
    }

    pub fn save<T: Serialize + ?Sized>(&self, key: StorageKey, value: &T) -> Result<(), StorageError> {
        let data = serde_json::to_string_pretty(value).map_err(|source| StorageError::Encode {
            key: key.as_str(),
            source,
        })?;
        let path = self.path(key);
        // Write-then-rename so a crash never leaves half a slot behind.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, data)
            .and_then(|()| fs::rename(&tmp, &path))
            .map_err(|source| StorageError::Io { path, source })?;
        tracing::trace!(key = key.as_str(), "slot saved");
        Ok(())
    }

    pub fn remove(&self, key: StorageKey) -> Result<(), StorageError> {
        let path = self.path(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }
}

/// A piece of editable state mirrored to a slot on every change.
#[derive(Debug)]
pub struct Mirror<T> {
    store: LocalStore,
    key: StorageKey,
    value: T,
}

impl<T: Serialize + DeserializeOwned> Mirror<T> {
    /// Rehydrates from the slot, or starts from `default` when there is none.
    pub fn hydrate(store: &LocalStore, key: StorageKey, default: impl FnOnce() -> T) -> Self {
        Self {
            store: store.clone(),
            key,
            value: store.load_or(key, default),
        }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    /// Applies `change` and persists the result.
    pub fn update<R>(&mut self, change: impl FnOnce(&mut T) -> R) -> Result<R, StorageError> {
        let out = change(&mut self.value);
        self.store.save(self.key, &self.value)?;
        Ok(out)
    }

    pub fn set(&mut self, value: T) -> Result<(), StorageError> {
        self.update(|slot| *slot = value)
    }
}
