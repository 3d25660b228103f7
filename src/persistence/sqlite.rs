use super::{PersistenceResult, PreferenceStore, checked_preferences, normalize_user_id};
use crate::preferences::StudentPreferences;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::info;

/// Preferences keyed by user id, one JSON document per row.
pub struct SqlitePreferenceStore {
    connection: Mutex<Connection>,
}

impl SqlitePreferenceStore {
    pub fn new<P: AsRef<std::path::Path>>(path: P) -> PersistenceResult<Self> {
        let connection = Connection::open(path)?;
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    pub fn in_memory() -> PersistenceResult<Self> {
        let connection = Connection::open_in_memory()?;
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn initialize_schema(connection: &Connection) -> PersistenceResult<()> {
        let ddl = r#"
            CREATE TABLE IF NOT EXISTS student_preferences (
                user_id TEXT PRIMARY KEY,
                preferences_json TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        "#;
        connection.execute_batch(ddl)?;
        Ok(())
    }
}

impl PreferenceStore for SqlitePreferenceStore {
    fn save_preferences(
        &self,
        user_id: &str,
        preferences: &StudentPreferences,
    ) -> PersistenceResult<()> {
        let user_id = normalize_user_id(user_id)?;
        let json = serde_json::to_string(preferences)?;
        let mut conn = self.connection.lock();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO student_preferences (user_id, preferences_json, updated_at)
             VALUES (?1, ?2, CURRENT_TIMESTAMP)
             ON CONFLICT(user_id) DO UPDATE SET
                preferences_json = excluded.preferences_json,
                updated_at = CURRENT_TIMESTAMP",
            params![user_id, json],
        )?;
        tx.commit()?;
        info!(user_id, "preferences stored");
        Ok(())
    }

    fn load_preferences(&self, user_id: &str) -> PersistenceResult<Option<StudentPreferences>> {
        let user_id = normalize_user_id(user_id)?;
        let conn = self.connection.lock();
        let mut stmt =
            conn.prepare("SELECT preferences_json FROM student_preferences WHERE user_id = ?1")?;
        let json: Option<String> = stmt
            .query_row(params![user_id], |row| row.get(0))
            .optional()?;

        let Some(json) = json else {
            return Ok(None);
        };
        Ok(Some(checked_preferences(serde_json::from_str(&json)?)?))
    }

    fn delete_preferences(&self, user_id: &str) -> PersistenceResult<bool> {
        let user_id = normalize_user_id(user_id)?;
        let conn = self.connection.lock();
        let removed = conn.execute(
            "DELETE FROM student_preferences WHERE user_id = ?1",
            params![user_id],
        )?;
        Ok(removed > 0)
    }
}
