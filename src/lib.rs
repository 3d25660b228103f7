pub mod calculations;
pub mod calendar;
pub mod config;
#[cfg(feature = "http_api")]
pub mod http_api;
pub mod persistence;
pub mod preferences;
pub mod projector;
pub mod report;
pub mod timetable;
pub mod validation;

pub use calculations::{AbsencePolicy, AttendanceInput, ClassCounter, classes_needed};
pub use calendar::{
    AbsenceSet, DateRange, Holiday, HolidaySet, HolidaySource, is_absent, is_holiday,
};
pub use config::{AppConfig, ConfigError};
#[cfg(feature = "sqlite")]
pub use persistence::sqlite::SqlitePreferenceStore;
pub use persistence::{
    JsonFilePreferenceStore, MemoryPreferenceStore, PersistenceError, PreferenceStore,
    export_projection_to_csv, load_holidays_from_json, load_preferences_from_json,
    load_timetable_from_json, save_preferences_to_json,
};
pub use preferences::{PreferenceError, StudentPreferences};
pub use projector::{
    AttendanceStatus, ProjectionRecord, ProjectionRequest, ProjectionSummary, Projector,
};
pub use timetable::{ClassesPerWeekday, SectionSummary, Subject, Timetable, TimetableError};
pub use validation::ProjectionError;
