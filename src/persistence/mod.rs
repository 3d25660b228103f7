use crate::preferences::StudentPreferences;
use crate::timetable::TimetableError;
use parking_lot::RwLock;
use serde_json::Error as SerdeJsonError;
use std::collections::HashMap;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("serialization error: {0}")]
    Serialization(#[from] SerdeJsonError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[cfg(feature = "sqlite")]
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid timetable: {0}")]
    Timetable(#[from] TimetableError),
    #[error("invalid data: {0}")]
    InvalidData(String),
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Per-user storage for [`StudentPreferences`].
///
/// `load_preferences` returns `Ok(None)` for a user who has never saved
/// anything; that is the normal first-visit case, not an error.
pub trait PreferenceStore {
    fn save_preferences(&self, user_id: &str, preferences: &StudentPreferences)
    -> PersistenceResult<()>;
    fn load_preferences(&self, user_id: &str) -> PersistenceResult<Option<StudentPreferences>>;
    fn delete_preferences(&self, user_id: &str) -> PersistenceResult<bool>;
}

/// Returns the trimmed id every store keys on, so `" bob"` and `"bob"` are
/// the same student everywhere.
pub(crate) fn normalize_user_id(user_id: &str) -> PersistenceResult<&str> {
    let trimmed = user_id.trim();
    if trimmed.is_empty() {
        return Err(PersistenceError::InvalidData("user id must not be empty".into()));
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        || trimmed.starts_with('.')
    {
        return Err(PersistenceError::InvalidData(format!(
            "user id '{user_id}' may only contain letters, digits, '-', '_' and '.'"
        )));
    }
    Ok(trimmed)
}

/// Rejects stored preferences that could not have been built through
/// [`StudentPreferences`]' own setters.
pub(crate) fn checked_preferences(
    preferences: StudentPreferences,
) -> PersistenceResult<StudentPreferences> {
    preferences
        .validate()
        .map_err(|err| PersistenceError::InvalidData(err.to_string()))?;
    Ok(preferences)
}

/// Process-local store, used by tests and by the HTTP server when no
/// database is configured.
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    entries: RwLock<HashMap<String, StudentPreferences>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn save_preferences(
        &self,
        user_id: &str,
        preferences: &StudentPreferences,
    ) -> PersistenceResult<()> {
        let user_id = normalize_user_id(user_id)?;
        self.entries
            .write()
            .insert(user_id.to_string(), preferences.clone());
        Ok(())
    }

    fn load_preferences(&self, user_id: &str) -> PersistenceResult<Option<StudentPreferences>> {
        let user_id = normalize_user_id(user_id)?;
        Ok(self.entries.read().get(user_id).cloned())
    }

    fn delete_preferences(&self, user_id: &str) -> PersistenceResult<bool> {
        let user_id = normalize_user_id(user_id)?;
        Ok(self.entries.write().remove(user_id).is_some())
    }
}

pub mod file;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use file::{
    JsonFilePreferenceStore, export_projection_to_csv, load_holidays_from_json,
    load_preferences_from_json, load_timetable_from_json, save_preferences_to_json,
};
