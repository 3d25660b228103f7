use super::{
    PersistenceError, PersistenceResult, PreferenceStore, checked_preferences, normalize_user_id,
};
use crate::calendar::Holiday;
use crate::preferences::StudentPreferences;
use crate::projector::ProjectionRecord;
use crate::timetable::Timetable;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::info;

pub fn load_timetable_from_json<P: AsRef<Path>>(path: P) -> PersistenceResult<Timetable> {
    let file = File::open(path.as_ref())?;
    let timetable: Timetable = serde_json::from_reader(file)?;
    timetable.validate()?;
    info!(path = %path.as_ref().display(), "timetable loaded");
    Ok(timetable)
}

/// Official holidays, in the same shape students use for their own entries.
pub fn load_holidays_from_json<P: AsRef<Path>>(path: P) -> PersistenceResult<Vec<Holiday>> {
    let file = File::open(path.as_ref())?;
    let holidays: Vec<Holiday> = serde_json::from_reader(file)?;
    if let Some(bad) = holidays.iter().find(|holiday| !holiday.is_well_formed()) {
        return Err(PersistenceError::InvalidData(format!(
            "holiday '{}' ends before it starts",
            bad.label()
        )));
    }
    info!(path = %path.as_ref().display(), count = holidays.len(), "official holidays loaded");
    Ok(holidays)
}

pub fn save_preferences_to_json<P: AsRef<Path>>(
    preferences: &StudentPreferences,
    path: P,
) -> PersistenceResult<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, preferences)?;
    Ok(())
}

pub fn load_preferences_from_json<P: AsRef<Path>>(path: P) -> PersistenceResult<StudentPreferences> {
    let file = File::open(path)?;
    let preferences: StudentPreferences = serde_json::from_reader(file)?;
    checked_preferences(preferences)
}

/// One `<user_id>.json` file per student inside a directory.
#[derive(Debug, Clone)]
pub struct JsonFilePreferenceStore {
    root: PathBuf,
}

impl JsonFilePreferenceStore {
    pub fn new<P: AsRef<Path>>(root: P) -> PersistenceResult<Self> {
        fs::create_dir_all(root.as_ref())?;
        Ok(Self {
            root: root.as_ref().to_path_buf(),
        })
    }

    fn path_for(&self, user_id: &str) -> PersistenceResult<PathBuf> {
        let user_id = normalize_user_id(user_id)?;
        Ok(self.root.join(format!("{user_id}.json")))
    }
}

impl PreferenceStore for JsonFilePreferenceStore {
    fn save_preferences(
        &self,
        user_id: &str,
        preferences: &StudentPreferences,
    ) -> PersistenceResult<()> {
        let path = self.path_for(user_id)?;
        save_preferences_to_json(preferences, &path)?;
        info!(user_id, path = %path.display(), "preferences saved");
        Ok(())
    }

    fn load_preferences(&self, user_id: &str) -> PersistenceResult<Option<StudentPreferences>> {
        let path = self.path_for(user_id)?;
        match load_preferences_from_json(&path) {
            Ok(preferences) => Ok(Some(preferences)),
            Err(PersistenceError::Io(err)) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn delete_preferences(&self, user_id: &str) -> PersistenceResult<bool> {
        let path = self.path_for(user_id)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ProjectionCsvRecord {
    subject: String,
    code: String,
    total_classes: i64,
    held_so_far: i64,
    attended: i64,
    classes_left: i64,
    can_bunk: i64,
    must_attend: i64,
    projected_percent: String,
    status: String,
}

impl ProjectionCsvRecord {
    fn from_record(record: &ProjectionRecord, desired_percent: f64) -> Self {
        Self {
            subject: record.subject_name.clone(),
            code: record.subject_code.clone(),
            total_classes: record.total_classes,
            held_so_far: record.classes_held_so_far,
            attended: record.classes_attended,
            classes_left: record.classes_left,
            can_bunk: record.bunkable_classes,
            must_attend: record.must_attend,
            projected_percent: format!("{:.1}", record.projected_attendance_percent),
            status: record.status(desired_percent).to_string(),
        }
    }
}

pub fn export_projection_to_csv<P: AsRef<Path>>(
    records: &[ProjectionRecord],
    desired_percent: f64,
    path: P,
) -> PersistenceResult<()> {
    let mut writer = csv::Writer::from_path(path.as_ref())?;
    for record in records {
        writer.serialize(ProjectionCsvRecord::from_record(record, desired_percent))?;
    }
    writer.flush()?;
    info!(path = %path.as_ref().display(), rows = records.len(), "projection exported");
    Ok(())
}
